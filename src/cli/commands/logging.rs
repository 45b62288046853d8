use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Levels in verbosity order; the index is the `-v` count that selects them.
const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

/// `USERAUTH_LOG_LEVEL` takes either a count (0-5) or a level name.
fn parse_log_level(value: &str) -> Result<u8, String> {
    if let Ok(count) = value.parse::<u8>() {
        return if count <= 5 {
            Ok(count)
        } else {
            Err(format!("log level count {count} is out of range (0-5)"))
        };
    }

    let level: Level = value
        .parse()
        .map_err(|_| format!("unknown log level: {value}"))?;

    LEVELS
        .iter()
        .position(|candidate| *candidate == level)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level: {value}"))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("USERAUTH_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
