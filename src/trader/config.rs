//! Validated risk settings
//!
//! Built once at startup from the TOML configuration. Any value that would
//! leave the exit policy undefined is a fatal `ConfigError`: the engine
//! refuses to start rather than run with a broken ladder.

use crate::config::{with_config, Config};
use crate::errors::ConfigError;
use crate::trader::exit::LadderPolicy;
use chrono::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ReentrySettings {
    pub enabled: bool,
    /// Required bounce above the exit price, percent
    pub confirm_pct: f64,
    pub max_per_token: u32,
    /// Observation window after the exit
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSettings {
    /// Negative percent from entry (-30 = exit at 0.70x)
    pub stop_loss_pct: f64,
    /// Retracement from peak, percent
    pub trailing_stop_pct: f64,
    pub trailing_require_profit: bool,
    pub ladder: LadderPolicy,
    pub reentry: ReentrySettings,
    /// Quotes older than this are discarded
    pub price_max_age: Duration,
    /// Pending decisions older than this are failed
    pub fill_timeout: Duration,
}

impl RiskSettings {
    /// Validate a full configuration into engine settings
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let trader = &config.trader;
        let monitor = &config.monitor;

        let parsed = LadderPolicy::parse(&trader.tp_ladder)?;
        let trailing_stop_pct = parsed.rest_trail_pct.unwrap_or(trader.trailing_stop_pct);

        if !(trader.stop_loss_pct > -100.0 && trader.stop_loss_pct < 0.0) {
            return Err(ConfigError::InvalidSetting {
                field: "trader.stop_loss_pct",
                reason: format!("{} must be in (-100, 0)", trader.stop_loss_pct),
            });
        }
        if !(trailing_stop_pct > 0.0 && trailing_stop_pct < 100.0) {
            return Err(ConfigError::InvalidSetting {
                field: "trader.trailing_stop_pct",
                reason: format!("{} must be in (0, 100)", trailing_stop_pct),
            });
        }
        if !trader.reentry_confirm_pct.is_finite() || trader.reentry_confirm_pct < 0.0 {
            return Err(ConfigError::InvalidSetting {
                field: "trader.reentry_confirm_pct",
                reason: format!("{} must be zero or positive", trader.reentry_confirm_pct),
            });
        }
        if trader.reentry_enabled && trader.reentry_window_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "trader.reentry_window_secs",
                reason: "must be positive when re-entry is enabled".to_string(),
            });
        }
        if monitor.fill_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "monitor.fill_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if monitor.price_max_age_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "monitor.price_max_age_secs",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            stop_loss_pct: trader.stop_loss_pct,
            trailing_stop_pct,
            trailing_require_profit: trader.trailing_require_profit,
            ladder: parsed.policy,
            reentry: ReentrySettings {
                enabled: trader.reentry_enabled,
                confirm_pct: trader.reentry_confirm_pct,
                max_per_token: trader.max_reentries_per_token,
                window: seconds_setting("trader.reentry_window_secs", trader.reentry_window_secs)?,
            },
            price_max_age: seconds_setting("monitor.price_max_age_secs", monitor.price_max_age_secs)?,
            fill_timeout: seconds_setting("monitor.fill_timeout_secs", monitor.fill_timeout_secs)?,
        })
    }

    /// Validate the process-wide configuration
    pub fn from_global_config() -> Result<Self, ConfigError> {
        with_config(Self::from_config)
    }
}

fn seconds_setting(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::InvalidSetting {
            field,
            reason: format!("{} seconds is out of range", secs),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RiskSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.stop_loss_pct, -30.0);
        assert_eq!(settings.trailing_stop_pct, 15.0);
        assert_eq!(settings.ladder.len(), 3);
        assert_eq!(settings.reentry.max_per_token, 1);
        assert_eq!(settings.reentry.window, Duration::minutes(10));
        assert_eq!(settings.fill_timeout, Duration::seconds(30));
    }

    #[test]
    fn test_rest_trail_overrides_trailing_pct() {
        let mut config = Config::default();
        config.trader.trailing_stop_pct = 15.0;
        config.trader.tp_ladder = "2x:50,rest:trail25".to_string();

        let settings = RiskSettings::from_config(&config).unwrap();
        assert_eq!(settings.trailing_stop_pct, 25.0);
    }

    #[test]
    fn test_invalid_ladder_is_fatal() {
        let mut config = Config::default();
        config.trader.tp_ladder = "2x:70,4x:40".to_string();
        assert!(matches!(
            RiskSettings::from_config(&config),
            Err(ConfigError::InvalidLadder(_))
        ));

        config.trader.tp_ladder = "5x:10,3x:10".to_string();
        assert!(RiskSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_invalid_settings_are_fatal() {
        let mut config = Config::default();
        config.trader.stop_loss_pct = 30.0;
        assert!(matches!(
            RiskSettings::from_config(&config),
            Err(ConfigError::InvalidSetting { field: "trader.stop_loss_pct", .. })
        ));

        let mut config = Config::default();
        config.trader.tp_ladder = "2x:50".to_string();
        config.trader.trailing_stop_pct = 0.0;
        assert!(RiskSettings::from_config(&config).is_err());

        let mut config = Config::default();
        config.monitor.fill_timeout_secs = 0;
        assert!(RiskSettings::from_config(&config).is_err());

        let mut config = Config::default();
        config.trader.reentry_window_secs = 1_000_000_000_000_000_000;
        assert!(matches!(
            RiskSettings::from_config(&config),
            Err(ConfigError::InvalidSetting { field: "trader.reentry_window_secs", .. })
        ));

        let mut config = Config::default();
        config.monitor.price_max_age_secs = u64::MAX;
        assert!(matches!(
            RiskSettings::from_config(&config),
            Err(ConfigError::InvalidSetting { field: "monitor.price_max_age_secs", .. })
        ));

        let mut config = Config::default();
        config.monitor.fill_timeout_secs = 10_000_000_000_000_000;
        assert!(matches!(
            RiskSettings::from_config(&config),
            Err(ConfigError::InvalidSetting { field: "monitor.fill_timeout_secs", .. })
        ));
    }

    #[test]
    fn test_global_config_defaults_validate() {
        let settings = RiskSettings::from_global_config().unwrap();
        assert_eq!(settings.fill_timeout, Duration::seconds(30));
    }
}
