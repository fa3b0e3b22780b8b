use clap::Parser;
use launchsniper::config::{parse_config, Config, CONFIG_FILE_PATH};
use launchsniper::trader::exit::stop_loss_floor;
use launchsniper::trader::RiskSettings;
use std::path::PathBuf;

/// Validate exit settings and print the resulting schedule.
///
/// Reads the TOML config (or only a ladder string with --ladder) and runs the
/// same validation the engine runs at startup, so a bad ladder is caught
/// before a position is ever opened.
#[derive(Parser, Debug)]
#[command(name = "tool_ladder_check", about = "Validate and print the exit schedule")]
struct Args {
    /// Config file to validate
    #[arg(long, default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    /// Ladder text to check instead of the config's tp_ladder (e.g. "2x:25,4x:25,rest:trail15")
    #[arg(long)]
    ladder: Option<String>,

    /// Also dump the validated settings
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = if args.config.exists() {
        let contents = std::fs::read_to_string(&args.config)?;
        parse_config(&contents, &args.config.display().to_string())?
    } else {
        println!(
            "Config {} not found, checking defaults",
            args.config.display()
        );
        Config::default()
    };

    if let Some(ladder) = args.ladder {
        config.trader.tp_ladder = ladder;
    }

    let settings = match RiskSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("INVALID: {}", e);
            std::process::exit(1);
        }
    };

    println!("Ladder: {}", config.trader.tp_ladder);
    println!();
    println!("  rung  trigger   sell (orig)  sell (held)  held after");

    let mut remaining = 1.0;
    for (index, rung) in settings.ladder.rungs().iter().enumerate() {
        let of_held = rung.fraction / remaining;
        remaining -= rung.fraction;
        println!(
            "  {:>4}  {:>6.2}x  {:>10.1}%  {:>10.1}%  {:>9.1}%",
            index + 1,
            rung.multiple,
            rung.fraction * 100.0,
            of_held.min(1.0) * 100.0,
            remaining.max(0.0) * 100.0
        );
    }

    println!();
    if remaining > 1e-9 {
        println!(
            "Remainder {:.1}% exits on a {}% trailing stop from peak{}",
            remaining * 100.0,
            settings.trailing_stop_pct,
            match settings.ladder.last_multiple() {
                None => " (active from entry)".to_string(),
                Some(last) => format!(" once the {}x rung has filled", last),
            }
        );
    } else {
        println!("Ladder sells the whole position; trailing stop has nothing to protect");
    }
    println!(
        "Stop loss {}% (exit at {:.2}x) until a trailing floor sits above entry",
        settings.stop_loss_pct,
        stop_loss_floor(settings.stop_loss_pct)
    );
    if settings.reentry.enabled {
        println!(
            "Re-entry: up to {} per token, on a +{}% bounce within {}s of a profitable exit",
            settings.reentry.max_per_token,
            settings.reentry.confirm_pct,
            settings.reentry.window.num_seconds()
        );
    } else {
        println!("Re-entry disabled");
    }

    if args.verbose {
        println!();
        println!("{:#?}", settings);
    }

    println!();
    println!("OK");
    Ok(())
}
