//! `scs` – interactive shell for the sensing & control core.
//!
//! On start the binary:
//!
//! 1. installs tracing (see `scs_runtime::telemetry`);
//! 2. loads `~/.scs/config.toml`, writing the defaults on first run;
//! 3. boots a simulated robot and starts the perception and intake loops;
//! 4. drops into the slash-command REPL.
//!
//! Ctrl-C halts the intake rollers and ends the session.

mod config;
mod repl;
mod robot;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tracing::{error, warn};

use crate::config::Config;
use crate::robot::SimRobot;

fn main() {
    let _telemetry = scs_runtime::init_tracing("scs");

    print_banner();
    let cfg = load_config();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the tokio runtime");
            std::process::exit(1);
        }
    };

    let robot = runtime.block_on(SimRobot::boot(&cfg));
    println!(
        "  Simulated robot online · alliance {} · team {:?}",
        robot.intake.alliance_color().to_string().bold(),
        cfg.color.team_color
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    let intake = Arc::clone(&robot.intake);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – halting intake …".yellow().bold());
        intake.halt();
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());
    repl::run(&runtime, &robot, cfg.tune_distance, shutdown);

    runtime.block_on(robot.shutdown());
    println!("{}", "  ✓ Intake halted, loops stopped.".green());
}

fn load_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ____________ "#.bold().cyan());
    println!("{}", r#"  / __/ ___/ __/"#.bold().cyan());
    println!("{}", r#" _\ \/ /___\ \  "#.bold().cyan());
    println!("{}", r#"/___/\___/___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "SCS".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Sensing & control core · simulation shell");
    println!();
}
