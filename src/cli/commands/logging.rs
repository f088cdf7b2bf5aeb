use crate::cli::telemetry::LogFormat;
use clap::{Arg, ArgMatches, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

#[derive(Debug)]
pub struct Options {
    pub format: LogFormat,
}

impl Options {
    /// Parse logging arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the log format is unknown.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let format = match matches.get_one::<String>(ARG_LOG_FORMAT) {
            Some(value) if !value.trim().is_empty() => LogFormat::parse(value)
                .ok_or_else(|| anyhow::anyhow!("invalid --{ARG_LOG_FORMAT}: {value}"))?,
            _ => LogFormat::default(),
        };
        Ok(Self { format })
    }
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("RESELLER_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output format: pretty or json")
                .env("RESELLER_LOG_FORMAT")
                .global(true)
                .default_value("pretty"),
        )
}
