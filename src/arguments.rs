//! Centralized argument handling for the launchsniper binaries
//!
//! Stores the process arguments once and exposes flag checks used by the
//! logger (per-module debug modes) and by `main` (config path, replay tape,
//! emergency exit).

use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Overrides the stored arguments (used by tests and tool binaries)
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value that follows a flag, if any
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Trader module debug mode (ladder, trailing, stop loss evaluation)
pub fn is_debug_trader_enabled() -> bool {
    has_arg("--debug-trader")
}

/// Positions module debug mode (ticks, fills, transitions)
pub fn is_debug_positions_enabled() -> bool {
    has_arg("--debug-positions")
}

/// Re-entry controller debug mode
pub fn is_debug_reentry_enabled() -> bool {
    has_arg("--debug-reentry")
}

/// Price monitor loop debug mode
pub fn is_debug_monitor_enabled() -> bool {
    has_arg("--debug-monitor")
}

/// Executor debug mode
pub fn is_debug_executor_enabled() -> bool {
    has_arg("--debug-executor")
}

/// Verbose mode - very detailed tracing for every tag
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Quiet mode - only warnings and errors on the console
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Emergency exit - sell every open position at the end of the replay
pub fn is_positions_sell_all_enabled() -> bool {
    has_arg("--positions-sell-all")
}

/// Config file override (`--config <path>`)
pub fn get_config_path() -> Option<String> {
    get_arg_value("--config")
}

/// Price tape to replay (`--replay <csv>`)
pub fn get_replay_path() -> Option<String> {
    get_arg_value("--replay")
}

pub mod patterns {
    use super::has_arg;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available flags and their descriptions
pub fn print_help() {
    println!("launchsniper - token launch sniper with laddered exits");
    println!();
    println!("USAGE:");
    println!("    launchsniper --replay <prices.csv> [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --config <path>           Config file (default: data/config.toml)");
    println!("    --replay <path>           CSV price tape (mint,price) replayed in dry-run");
    println!("    --positions-sell-all      Emergency-exit every open position after the replay");
    println!("    --help, -h                Show this help message");
    println!("    --quiet                   Only warnings and errors on the console");
    println!("    --verbose                 Very detailed tracing");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-trader            Exit policy evaluation");
    println!("    --debug-positions         Ticks, fills and transitions");
    println!("    --debug-reentry           Re-entry watches");
    println!("    --debug-monitor           Price polling loops");
    println!("    --debug-executor          Order execution");
    println!();
    println!("EXAMPLES:");
    println!("    launchsniper --replay tape.csv");
    println!("    launchsniper --replay tape.csv --config my.toml --debug-trader");
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_trader_enabled() {
        modes.push("trader");
    }
    if is_debug_positions_enabled() {
        modes.push("positions");
    }
    if is_debug_reentry_enabled() {
        modes.push("reentry");
    }
    if is_debug_monitor_enabled() {
        modes.push("monitor");
    }
    if is_debug_executor_enabled() {
        modes.push("executor");
    }
    if is_verbose_enabled() {
        modes.push("verbose");
    }

    modes
}

/// Prints the enabled debug modes at startup
pub fn print_debug_info() {
    let enabled_modes = get_enabled_debug_modes();
    if !enabled_modes.is_empty() {
        println!("Enabled debug modes: {:?}", enabled_modes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_lookup() {
        set_cmd_args(vec![
            "launchsniper".to_string(),
            "--replay".to_string(),
            "tape.csv".to_string(),
            "--debug-trader".to_string(),
        ]);

        assert_eq!(get_replay_path().as_deref(), Some("tape.csv"));
        assert!(is_debug_trader_enabled());
        assert!(!is_debug_reentry_enabled());
        assert_eq!(get_arg_value("--debug-trader"), None);
        assert_eq!(get_config_path(), None);
    }
}
