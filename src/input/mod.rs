mod command;

pub use command::{
    parse_command, CommandError, CommandResult, PinsCommand, ShellCommand, TimelineCommand, HELP,
};
