use std::io::BufRead;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::{App, Flow};
use crate::error::AppResult;
use crate::input::{parse_command, CommandError};
use crate::ui::{MapCommand, MapSink, NoticeLevel};

const UI_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Line(String),
    Closed,
}

/// Reads lines on a background thread so the loop can keep pumping completions.
pub fn spawn_input<R>(input: R) -> mpsc::Receiver<ShellEvent>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(line) => {
                    if tx.send(ShellEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(?err, "failed to read input");
                    break;
                }
            }
        }
        let _ = tx.send(ShellEvent::Closed);
    });
    rx
}

/// Event loop: commands in arrival order, completions pumped every tick, and a
/// tracking request whenever the configured interval has elapsed.
pub fn run_shell(
    app: &mut App,
    events: &mpsc::Receiver<ShellEvent>,
    sink: &mut dyn MapSink,
) -> AppResult<()> {
    let mut last_tracking: Option<Instant> = None;
    loop {
        if app.is_signed_in()
            && last_tracking.map_or(true, |at| at.elapsed() >= app.tracking_interval())
        {
            app.tick_tracking();
            last_tracking = Some(Instant::now());
        }

        match events.recv_timeout(UI_TICK_INTERVAL) {
            Ok(ShellEvent::Line(line)) => {
                if handle_line(app, &line, sink) == Flow::Quit {
                    app.pump(sink);
                    return Ok(());
                }
            }
            Ok(ShellEvent::Closed) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                app.pump(sink);
                return Ok(());
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        app.pump(sink);
    }
}

fn handle_line(app: &mut App, line: &str, sink: &mut dyn MapSink) -> Flow {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(CommandError::Empty) => return Flow::Continue,
        Err(err) => {
            report(sink, err.to_string());
            return Flow::Continue;
        }
    };
    match app.dispatch(command, sink) {
        Ok(flow) => flow,
        Err(err) => {
            tracing::warn!(%err, "command failed");
            report(sink, err.to_string());
            Flow::Continue
        }
    }
}

fn report(sink: &mut dyn MapSink, message: String) {
    sink.submit(MapCommand::Notice {
        level: NoticeLevel::Error,
        message,
    });
}
