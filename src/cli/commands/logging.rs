//! `-v` / `WHISPER_LOG_LEVEL` handling.

use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

const ENV_LOG_LEVEL: &str = "WHISPER_LOG_LEVEL";
const MAX_VERBOSITY: u8 = 5;

/// Level names in verbosity order; the index is the `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_verbosity(raw: &str) -> Result<u8, String> {
    let raw = raw.trim();
    if let Ok(count) = raw.parse::<u8>() {
        if count <= MAX_VERBOSITY {
            return Ok(count);
        }
        return Err(format!("verbosity must be 0..={MAX_VERBOSITY}, got {count}"));
    }

    LEVEL_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(raw))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "unknown log level {raw:?}, expected a count or one of {}",
                LEVEL_NAMES.join(", ")
            )
        })
}

/// Accepts a count (`0..=5`) or a level name.
#[must_use]
pub fn verbosity_parser() -> ValueParser {
    ValueParser::from(parse_verbosity)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env(ENV_LOG_LEVEL)
            .global(true)
            .action(ArgAction::Count)
            .value_parser(verbosity_parser()),
    )
}

/// Tracing level selected on the command line; `None` keeps the default.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    level_for(matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0))
}

const fn level_for(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("test"))
    }

    #[test]
    fn counts_flags() {
        temp_env::with_var(ENV_LOG_LEVEL, None::<&str>, || {
            let matches = command().get_matches_from(vec!["test", "-vvv"]);
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
            assert_eq!(level(&matches), Some(Level::DEBUG));
        });
    }

    #[test]
    fn no_flag_keeps_default_level() {
        temp_env::with_var(ENV_LOG_LEVEL, None::<&str>, || {
            let matches = command().get_matches_from(vec!["test"]);
            assert_eq!(level(&matches), None);
        });
    }

    #[test]
    fn counts_and_names_parse() {
        assert_eq!(parse_verbosity("debug"), Ok(3));
        assert_eq!(parse_verbosity(" WARN "), Ok(1));
        assert_eq!(parse_verbosity("5"), Ok(5));
        assert!(parse_verbosity("6").is_err());
        assert!(parse_verbosity("loud").is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), None);
        assert_eq!(level_for(1), Some(Level::WARN));
        assert_eq!(level_for(3), Some(Level::DEBUG));
        assert_eq!(level_for(9), Some(Level::TRACE));
    }
}
