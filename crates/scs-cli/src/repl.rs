//! REPL – interactive shell over the simulated robot.
//!
//! Slash-commands are parsed into [`Command`] and executed against a
//! [`SimRobot`]; async operations run on the caller's tokio runtime.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tokio::runtime::Runtime;

use crate::robot::{SimObject, SimRobot};

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Load,
    LongGoal,
    CenterGoal,
    Outtake,
    Halt,
    SetIntake { bottom: i32, upper: i32, mid: i32 },
    Alliance,
    Heading,
    Color,
    Decide { hint: bool },
    Tune { distance: Option<f64> },
    Gains,
    Status,
    Place(SimObject),
    Jam(bool),
    Turn { imu: f64, odom: f64 },
    Quit,
}

/// Parse one input line.  `Err` carries a message for the operator.
pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let cmd = match (head, args.as_slice()) {
        ("/help", []) => Command::Help,
        ("/load", []) => Command::Load,
        ("/long", []) => Command::LongGoal,
        ("/center", []) => Command::CenterGoal,
        ("/outtake", []) => Command::Outtake,
        ("/halt", []) => Command::Halt,
        ("/intake", [b, u, m]) => Command::SetIntake {
            bottom: speed(b)?,
            upper: speed(u)?,
            mid: speed(m)?,
        },
        ("/alliance", []) => Command::Alliance,
        ("/heading", []) => Command::Heading,
        ("/color", []) => Command::Color,
        ("/decide", []) => Command::Decide { hint: false },
        ("/decide", ["run"]) => Command::Decide { hint: true },
        ("/tune", []) => Command::Tune { distance: None },
        ("/tune", [d]) => Command::Tune {
            distance: Some(number(d)?),
        },
        ("/gains", []) => Command::Gains,
        ("/status", []) => Command::Status,
        ("/place", [what]) => Command::Place(
            SimObject::parse(what).ok_or_else(|| format!("unknown object '{what}'"))?,
        ),
        ("/jam", ["on"]) => Command::Jam(true),
        ("/jam", ["off"]) => Command::Jam(false),
        ("/turn", [imu, odom]) => Command::Turn {
            imu: number(imu)?,
            odom: number(odom)?,
        },
        ("/quit" | "/exit", []) => Command::Quit,
        (other, _) => return Err(format!("Unknown or malformed command '{other}'")),
    };
    Ok(cmd)
}

fn number(word: &str) -> Result<f64, String> {
    word.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{word}' is not a number"))
}

fn speed(word: &str) -> Result<i32, String> {
    match word.parse::<i32>() {
        Ok(v) if (-127..=127).contains(&v) => Ok(v),
        _ => Err(format!("'{word}' is not a speed in [-127, 127]")),
    }
}

/// Run the shell until `/quit`, EOF, or `shutdown` is set.
pub fn run(runtime: &Runtime, robot: &SimRobot, tune_distance: f64, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "scs>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(cmd) => execute(runtime, robot, tune_distance, cmd),
            Err(msg) => println!(
                "{} Type {} for available commands.",
                msg.red(),
                "/help".bold()
            ),
        }
    }
}

fn execute(runtime: &Runtime, robot: &SimRobot, tune_distance: f64, cmd: Command) {
    let intake = &robot.intake;
    match cmd {
        Command::Help => cmd_help(),
        Command::Load => intake.load(),
        Command::LongGoal => intake.long_goal(),
        Command::CenterGoal => intake.center_goal(),
        Command::Outtake => intake.outtake(),
        Command::Halt => intake.halt(),
        Command::SetIntake { bottom, upper, mid } => intake.set_intake(bottom, upper, mid),
        Command::Alliance => {
            let color = intake.cycle_alliance_color();
            println!("  alliance color: {}", color.to_string().bold());
        }
        Command::Heading => {
            let p = &robot.perception;
            println!(
                "  imu {:>7.2}°   odom {:>7.2}°   fused {}",
                p.imu_heading(),
                p.odom_heading(),
                format!("{:>7.2}°", p.fused_heading()).bold()
            );
        }
        Command::Color => {
            println!("  stable color: {:?}", robot.perception.stable_color());
        }
        Command::Decide { hint } => {
            let decision = robot.perception.decide(hint);
            println!("  {}", decision.as_str().bold());
        }
        Command::Tune { distance } => {
            let target = distance.unwrap_or(tune_distance);
            println!("  running trial over {target} …");
            let report = runtime.block_on(robot.tuner.auto_tune(target));
            println!(
                "  error {:+.3}  ({:?})  gains {} → {}",
                report.error,
                report.adjustment,
                report.previous,
                report.gains.to_string().bold()
            );
        }
        Command::Gains => println!("  kP kI kD = {}", robot.tuner.current_gains()),
        Command::Status => print_status(robot),
        Command::Place(object) => robot.place(object),
        Command::Jam(on) => robot.set_jammed(on),
        Command::Turn { imu, odom } => robot.turn(imu, odom),
        Command::Quit => {}
    }
}

fn print_status(robot: &SimRobot) {
    let s = robot.intake.status();
    let sp = s.setpoint;
    println!();
    println!("{}", "Intake".bold().underline());
    println!("  setpoint   : {} / {} / {}", sp.bottom, sp.upper, sp.mid);
    println!("  piston     : {:?}", robot.intake.piston_state());
    println!("  alliance   : {}", s.alliance);
    println!("  phase      : {:?}", s.phase);
    println!("  seen       : {}  detected {}  held {}", s.seen, s.detected, s.held);
    println!("  wrong      : {}", s.wrong_object);
    println!("  jammed     : {}  unjam pulses {}", s.jammed, s.unjam_pulses);
    println!("  rejections : {}", s.rejections);
    println!("{}", "Perception".bold().underline());
    println!(
        "  running    : {}",
        if robot.perception.is_running() { "yes".green() } else { "no".red() }
    );
    println!("  stable     : {:?}", robot.perception.stable_color());
    println!();
}

fn cmd_help() {
    println!();
    println!("{}", "SCS Commands".bold().underline());
    for (cmd, what) in [
        ("/load /long /center /outtake /halt", "intake modes"),
        ("/intake <b> <u> <m>", "raw roller speeds"),
        ("/alliance", "cycle alliance color red → blue → neutral"),
        ("/heading", "imu, odometric and fused heading"),
        ("/color  /decide [run]", "stable color and its action token"),
        ("/tune [distance]", "run one gain-tuning trial"),
        ("/gains", "current drive gains"),
        ("/status", "intake and perception snapshot"),
        ("/place red|blue|none", "sim: put an object at the sensor"),
        ("/jam on|off", "sim: stall the bottom roller"),
        ("/turn <imu> <odom>", "sim: set both headings"),
        ("/quit  /exit", "halt the intake and exit"),
    ] {
        println!("  {:<36} – {}", cmd.bold().cyan(), what);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_commands() {
        assert_eq!(parse("/load"), Ok(Command::Load));
        assert_eq!(parse("  /long  "), Ok(Command::LongGoal));
        assert_eq!(parse("/exit"), Ok(Command::Quit));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(
            parse("/intake 127 -127 0"),
            Ok(Command::SetIntake {
                bottom: 127,
                upper: -127,
                mid: 0
            })
        );
        assert_eq!(parse("/tune 36"), Ok(Command::Tune { distance: Some(36.0) }));
        assert_eq!(parse("/tune"), Ok(Command::Tune { distance: None }));
        assert_eq!(parse("/decide run"), Ok(Command::Decide { hint: true }));
        assert_eq!(parse("/place Blue"), Ok(Command::Place(SimObject::Blue)));
        assert_eq!(
            parse("/turn 350 10"),
            Ok(Command::Turn {
                imu: 350.0,
                odom: 10.0
            })
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("/intake 200 0 0").is_err());
        assert!(parse("/intake 1 2").is_err());
        assert!(parse("/tune far").is_err());
        assert!(parse("/tune NaN").is_err());
        assert!(parse("/place green").is_err());
        assert!(parse("/jam maybe").is_err());
        assert!(parse("/dance").is_err());
        assert!(parse("").is_err());
    }
}
