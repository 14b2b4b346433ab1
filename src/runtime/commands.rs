//! Line-oriented operator commands.

use std::io::BufRead;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::tracking::Rect;

use super::worker::TrackingRuntime;

/// A parsed operator command.
///
/// The wire vocabulary follows the camera operator's point of view:
/// `manual start` means the operator takes over (automatic tracking
/// pauses), `manual stop` hands control back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    SetTarget(Rect),
}

impl Command {
    pub fn apply(self, runtime: &TrackingRuntime) {
        match self {
            Command::Pause => runtime.pause(),
            Command::Resume => runtime.resume(),
            Command::SetTarget(bbox) => runtime.set_target(bbox),
        }
    }
}

/// Parse one command line.
///
/// Recognized forms:
///
/// * `manual start`
/// * `manual stop`
/// * `select target <x>,<y>,<w>,<h>` with the box in working-resolution
///   coordinates
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    match line {
        "manual start" => return Ok(Command::Pause),
        "manual stop" => return Ok(Command::Resume),
        _ => {}
    }
    if let Some(rest) = line.strip_prefix("select target ") {
        let fields: Vec<_> = rest.split(',').map(str::trim).collect();
        if let [x, y, w, h] = fields[..] {
            let parse = |s: &str| s.parse::<f32>().ok();
            if let (Some(x), Some(y), Some(w), Some(h)) = (parse(x), parse(y), parse(w), parse(h)) {
                return Ok(Command::SetTarget(Rect::new(x, y, w, h)));
            }
        }
    }
    Err(Error::UnknownCommand(line.to_string()))
}

/// Read commands line by line and apply them until the reader ends or
/// the runtime stops. Unrecognized lines are logged and skipped, never
/// fatal; only a broken reader ends the listener with an error.
pub fn run_command_listener<R: BufRead>(runtime: &TrackingRuntime, reader: R) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        if !runtime.is_running() {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                info!("command: {command:?}");
                command.apply(runtime);
            }
            Err(e) => warn!("{e}"),
        }
    }
    Ok(())
}
