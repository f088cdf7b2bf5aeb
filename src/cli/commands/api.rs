use crate::config::{
    ApiConfig, DEFAULT_API_URL, DEFAULT_INITIATE_PATH, DEFAULT_LOGIN_PATH, DEFAULT_REGISTER_PATH,
    DEFAULT_SEND_OTP_PATH, DEFAULT_TUNNEL_HEADER, DEFAULT_VERIFY_OTP_PATH, Endpoints,
    parse_tunnel_header,
};
use anyhow::Context;
use clap::{Arg, ArgMatches, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_TUNNEL_HEADER: &str = "tunnel-header";
pub const ARG_ENDPOINT_LOGIN: &str = "endpoint-login";
pub const ARG_ENDPOINT_SEND_OTP: &str = "endpoint-send-otp";
pub const ARG_ENDPOINT_VERIFY_OTP: &str = "endpoint-verify-otp";
pub const ARG_ENDPOINT_REGISTER: &str = "endpoint-register";
pub const ARG_ENDPOINT_INITIATE: &str = "endpoint-initiate";

#[derive(Debug)]
pub struct Options {
    pub api: ApiConfig,
}

impl Options {
    /// Parse API arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_API_URL)
            .map_or(DEFAULT_API_URL, String::as_str);

        // Empty endpoint overrides fall back to the defaults
        let defaults = Endpoints::default();
        let endpoint = |id: &str, default: String| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
        };
        let endpoints = Endpoints {
            login: endpoint(ARG_ENDPOINT_LOGIN, defaults.login),
            send_otp: endpoint(ARG_ENDPOINT_SEND_OTP, defaults.send_otp),
            verify_otp: endpoint(ARG_ENDPOINT_VERIFY_OTP, defaults.verify_otp),
            register: endpoint(ARG_ENDPOINT_REGISTER, defaults.register),
            initiate_register: endpoint(ARG_ENDPOINT_INITIATE, defaults.initiate_register),
        };

        // An empty value disables the header
        let tunnel_header = parse_tunnel_header(
            matches
                .get_one::<String>(ARG_TUNNEL_HEADER)
                .map_or(DEFAULT_TUNNEL_HEADER, String::as_str),
        );

        let api = ApiConfig::new(base_url)
            .with_context(|| format!("invalid --{ARG_API_URL}: {base_url}"))?
            .with_endpoints(endpoints)
            .with_tunnel_header(tunnel_header);

        Ok(Self { api })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the admin API")
                .env("RESELLER_API_URL")
                .global(true)
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_TUNNEL_HEADER)
                .long(ARG_TUNNEL_HEADER)
                .help("Extra request header as name=value; empty disables it")
                .env("RESELLER_TUNNEL_HEADER")
                .global(true)
                .default_value(DEFAULT_TUNNEL_HEADER),
        );
    with_endpoint_args(command)
}

fn with_endpoint_args(command: Command) -> Command {
    [
        (
            ARG_ENDPOINT_LOGIN,
            "RESELLER_ENDPOINT_LOGIN",
            "Login endpoint path",
            DEFAULT_LOGIN_PATH,
        ),
        (
            ARG_ENDPOINT_SEND_OTP,
            "RESELLER_ENDPOINT_SEND_OTP",
            "OTP send/resend endpoint path",
            DEFAULT_SEND_OTP_PATH,
        ),
        (
            ARG_ENDPOINT_VERIFY_OTP,
            "RESELLER_ENDPOINT_VERIFY_OTP",
            "OTP verification endpoint path",
            DEFAULT_VERIFY_OTP_PATH,
        ),
        (
            ARG_ENDPOINT_REGISTER,
            "RESELLER_ENDPOINT_REGISTER",
            "Registration endpoint path",
            DEFAULT_REGISTER_PATH,
        ),
        (
            ARG_ENDPOINT_INITIATE,
            "RESELLER_ENDPOINT_INITIATE",
            "Registration initiation endpoint path",
            DEFAULT_INITIATE_PATH,
        ),
    ]
    .into_iter()
    .fold(command, |command, (id, env, help, default)| {
        command.arg(
            Arg::new(id)
                .long(id)
                .help(help)
                .env(env)
                .global(true)
                .hide_short_help(true)
                .default_value(default),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: Vec<&str>) -> anyhow::Result<Options> {
        let matches = with_args(Command::new("test")).get_matches_from(args);
        Options::parse(&matches)
    }

    #[test]
    fn defaults() {
        temp_env::with_vars(
            [
                ("RESELLER_API_URL", None::<&str>),
                ("RESELLER_TUNNEL_HEADER", None),
                ("RESELLER_ENDPOINT_LOGIN", None),
            ],
            || {
                let options = parse(vec!["test"]).ok();
                let api = options.map(|o| o.api);
                assert_eq!(
                    api.as_ref().map(|a| a.base_url.as_str()),
                    Some("http://localhost:8080/")
                );
                assert_eq!(
                    api.as_ref().and_then(|a| a.tunnel_header.clone()),
                    Some(("ngrok-skip-browser-warning".to_string(), "true".to_string()))
                );
                assert_eq!(api.map(|a| a.endpoints), Some(Endpoints::default()));
            },
        );
    }

    #[test]
    fn env_overrides() {
        temp_env::with_vars(
            [
                ("RESELLER_API_URL", Some("https://api.example.com/v1/")),
                ("RESELLER_TUNNEL_HEADER", Some("")),
                ("RESELLER_ENDPOINT_LOGIN", Some("/v2/login")),
            ],
            || {
                let api = parse(vec!["test"]).ok().map(|o| o.api);
                assert_eq!(
                    api.as_ref().map(|a| a.base_url.as_str()),
                    Some("https://api.example.com/v1/")
                );
                assert_eq!(api.as_ref().and_then(|a| a.tunnel_header.clone()), None);
                assert_eq!(
                    api.map(|a| a.endpoints.login),
                    Some("/v2/login".to_string())
                );
            },
        );
    }

    #[test]
    fn rejects_non_http_url() {
        temp_env::with_vars([("RESELLER_API_URL", None::<&str>)], || {
            assert!(parse(vec!["test", "--api-url", "ftp://example.com"]).is_err());
            assert!(parse(vec!["test", "--api-url", "not a url"]).is_err());
        });
    }
}
