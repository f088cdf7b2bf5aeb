use crate::config::{DeploymentMode, SessionConfig};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_MODE: &str = "mode";
pub const ARG_AUTH_PROTECTION: &str = "auth-protection";
pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_SESSION_DIR: &str = "session-dir";

/// Directory used when `--session-dir` is not given.
#[must_use]
pub fn default_session_dir() -> PathBuf {
    std::env::temp_dir().join(env!("CARGO_PKG_NAME"))
}

#[derive(Debug)]
pub struct Options {
    pub mode: DeploymentMode,
    pub session: SessionConfig,
    pub session_dir: PathBuf,
}

impl Options {
    /// Parse session arguments from matches. The guard toggle and the TTL are
    /// fail-safe: odd values fall back to defaults instead of erroring.
    ///
    /// # Errors
    /// Currently infallible; kept fallible like the other option groups.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get = |id: &str| matches.get_one::<String>(id).map(String::as_str);

        let mode = get(ARG_MODE).map_or(DeploymentMode::Development, DeploymentMode::parse);
        let session =
            SessionConfig::from_overrides(mode, get(ARG_AUTH_PROTECTION), get(ARG_SESSION_TTL));

        let session_dir = matches
            .get_one::<String>(ARG_SESSION_DIR)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(default_session_dir, PathBuf::from);

        Ok(Self {
            mode,
            session,
            session_dir,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MODE)
                .long(ARG_MODE)
                .help("Deployment mode: development or production")
                .env("RESELLER_MODE")
                .global(true)
                .default_value("development"),
        )
        .arg(
            Arg::new(ARG_AUTH_PROTECTION)
                .long(ARG_AUTH_PROTECTION)
                .help("Route guard toggle (true/false); unset follows the deployment mode")
                .env("RESELLER_AUTH_PROTECTION")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session lifetime in seconds when the token carries no expiry (default: 3600)")
                .env("RESELLER_SESSION_TTL_SECONDS")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SESSION_DIR)
                .long(ARG_SESSION_DIR)
                .help("Directory holding the persisted session")
                .env("RESELLER_SESSION_DIR")
                .global(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 4] = [
        "RESELLER_MODE",
        "RESELLER_AUTH_PROTECTION",
        "RESELLER_SESSION_TTL_SECONDS",
        "RESELLER_SESSION_DIR",
    ];

    fn parse(args: Vec<&str>) -> Option<Options> {
        let matches = with_args(Command::new("test")).get_matches_from(args);
        Options::parse(&matches).ok()
    }

    #[test]
    fn development_defaults() {
        temp_env::with_vars_unset(VARS, || {
            let options = parse(vec!["test"]);
            assert_eq!(
                options.as_ref().map(|o| o.mode),
                Some(DeploymentMode::Development)
            );
            assert_eq!(
                options.as_ref().map(|o| o.session),
                Some(SessionConfig {
                    ttl_seconds: 3600,
                    guard_enabled: false,
                })
            );
            assert_eq!(options.map(|o| o.session_dir), Some(default_session_dir()));
        });
    }

    #[test]
    fn production_keeps_guard_unless_explicitly_off() {
        temp_env::with_vars(
            [
                ("RESELLER_MODE", Some("production")),
                ("RESELLER_AUTH_PROTECTION", Some("maybe")),
                ("RESELLER_SESSION_TTL_SECONDS", Some("90.7")),
                ("RESELLER_SESSION_DIR", Some("/tmp/tab-1")),
            ],
            || {
                let options = parse(vec!["test"]);
                assert_eq!(
                    options.as_ref().map(|o| o.session),
                    Some(SessionConfig {
                        ttl_seconds: 90,
                        guard_enabled: true,
                    })
                );
                assert_eq!(
                    options.map(|o| o.session_dir),
                    Some(PathBuf::from("/tmp/tab-1"))
                );

                let options = parse(vec!["test", "--auth-protection", "false"]);
                assert_eq!(options.map(|o| o.session.guard_enabled), Some(false));
            },
        );
    }

    #[test]
    fn bad_ttl_falls_back() {
        temp_env::with_vars_unset(VARS, || {
            for raw in ["0", "-1", "abc", "0.5"] {
                let flag = format!("--session-ttl={raw}");
                let options = parse(vec!["test", flag.as_str()]);
                assert_eq!(options.map(|o| o.session.ttl_seconds), Some(3600), "{raw}");
            }
        });
    }
}
