use thiserror::Error;

use crate::geometry::{GeoError, GeoPoint};
use crate::service::TimeFilter;
use crate::state::ToolMode;
use crate::theme::{BaseLayer, ThemeError, ThemeId};

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Coordinate(#[from] GeoError),
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineCommand {
    Show(Option<TimeFilter>),
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PinsCommand {
    List,
    Delete(String),
    View(String),
}

/// One line of the headless shell.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Tool(ToolMode),
    Click(GeoPoint),
    Reset,
    Layer(BaseLayer),
    Search(String),
    /// 1-based index into the last search results.
    Goto(usize),
    Pin(String),
    Cancel,
    Share(Option<String>),
    OpenLink(String),
    Track,
    Timeline(TimelineCommand),
    Pins(PinsCommand),
    Theme(ThemeId),
    Interval(u64),
    Login(String),
    Logout,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
tool measure|directions|add|findme|share|none
click <lat> <lng>
reset | cancel
layer theme|satellite|street
search <place> | goto <n>
pin <note>
share [name]
open <link>
track
timeline [today|yesterday|week|all|clear]
pins [delete <id>|view <id>]
theme <GTA5|RDR2|RDR|Cyberpunk2077>
interval <seconds>
login <username> | logout
status | help | quit";

fn rest_of<'a>(line: &'a str, verb: &str) -> &'a str {
    line[verb.len()..].trim()
}

fn required<'a>(value: &'a str, usage: &'static str) -> CommandResult<&'a str> {
    if value.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(value)
    }
}

fn parse_click(args: &str) -> CommandResult<ShellCommand> {
    const USAGE: &str = "click <lat> <lng>";
    let mut parts = args.split(|c: char| c.is_whitespace() || c == ',').filter(|p| !p.is_empty());
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CommandError::Usage(USAGE));
    };
    let lat = lat
        .parse::<f64>()
        .map_err(|_| CommandError::InvalidArgument(format!("invalid latitude: {lat}")))?;
    let lng = lng
        .parse::<f64>()
        .map_err(|_| CommandError::InvalidArgument(format!("invalid longitude: {lng}")))?;
    Ok(ShellCommand::Click(GeoPoint::new(lat, lng)?))
}

fn parse_timeline(args: &str) -> CommandResult<ShellCommand> {
    let command = match args {
        "" => TimelineCommand::Show(None),
        "clear" => TimelineCommand::Clear,
        filter => TimelineCommand::Show(Some(
            filter
                .parse()
                .map_err(|_| CommandError::InvalidArgument(format!("unknown filter: {filter}")))?,
        )),
    };
    Ok(ShellCommand::Timeline(command))
}

fn parse_pins(args: &str) -> CommandResult<ShellCommand> {
    const USAGE: &str = "pins [delete <id>|view <id>]";
    let mut parts = args.split_whitespace();
    let command = match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => PinsCommand::List,
        (Some("delete"), Some(id), None) => PinsCommand::Delete(id.to_string()),
        (Some("view"), Some(id), None) => PinsCommand::View(id.to_string()),
        _ => return Err(CommandError::Usage(USAGE)),
    };
    Ok(ShellCommand::Pins(command))
}

pub fn parse_command(line: &str) -> CommandResult<ShellCommand> {
    let line = line.trim();
    let verb = line.split_whitespace().next().ok_or(CommandError::Empty)?;
    let args = rest_of(line, verb);

    match verb.to_ascii_lowercase().as_str() {
        "tool" => required(args, "tool <mode>")?
            .parse()
            .map(ShellCommand::Tool)
            .map_err(CommandError::InvalidArgument),
        "click" => parse_click(args),
        "reset" => Ok(ShellCommand::Reset),
        "layer" => required(args, "layer theme|satellite|street")?
            .parse()
            .map(ShellCommand::Layer)
            .map_err(|err: ThemeError| CommandError::InvalidArgument(err.to_string())),
        "search" => Ok(ShellCommand::Search(
            required(args, "search <place>")?.to_string(),
        )),
        "goto" => {
            let index = required(args, "goto <n>")?;
            index
                .parse::<usize>()
                .ok()
                .filter(|&index| index > 0)
                .map(ShellCommand::Goto)
                .ok_or_else(|| CommandError::InvalidArgument(format!("invalid result number: {index}")))
        }
        "pin" => Ok(ShellCommand::Pin(required(args, "pin <note>")?.to_string())),
        "cancel" => Ok(ShellCommand::Cancel),
        "share" => Ok(ShellCommand::Share(
            (!args.is_empty()).then(|| args.to_string()),
        )),
        "open" => Ok(ShellCommand::OpenLink(required(args, "open <link>")?.to_string())),
        "track" => Ok(ShellCommand::Track),
        "timeline" => parse_timeline(&args.to_ascii_lowercase()),
        "pins" => parse_pins(args),
        "theme" => required(args, "theme <id>")?
            .parse()
            .map(ShellCommand::Theme)
            .map_err(|err: ThemeError| CommandError::InvalidArgument(err.to_string())),
        "interval" => {
            let secs = required(args, "interval <seconds>")?;
            secs.parse()
                .map(ShellCommand::Interval)
                .map_err(|_| CommandError::InvalidArgument(format!("invalid interval: {secs}")))
        }
        "login" => Ok(ShellCommand::Login(
            required(args, "login <username>")?.to_string(),
        )),
        "logout" => Ok(ShellCommand::Logout),
        "status" => Ok(ShellCommand::Status),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        _ => Err(CommandError::Unknown(verb.to_string())),
    }
}
