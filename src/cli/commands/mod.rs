pub mod api;
pub mod logging;
pub mod session;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const CMD_LOGIN: &str = "login";
pub const CMD_REGISTER: &str = "register";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_STATUS: &str = "status";
pub const CMD_OPEN: &str = "open";

pub const ARG_EMAIL: &str = "email";
pub const ARG_MOBILE: &str = "mobile";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_CONFIRM_PASSWORD: &str = "confirm-password";
pub const ARG_FIRST_NAME: &str = "first-name";
pub const ARG_LAST_NAME: &str = "last-name";
pub const ARG_BUSINESS_NAME: &str = "business-name";
pub const ARG_BUSINESS_TYPE: &str = "business-type";
pub const ARG_REGISTRATION_NO: &str = "registration-no";
pub const ARG_ACCEPT_TERMS: &str = "accept-terms";
pub const ARG_PATH: &str = "path";
pub const ARG_WATCH: &str = "watch";
pub const ARG_FETCH: &str = "fetch";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(login())
        .subcommand(register())
        .subcommand(Command::new(CMD_LOGOUT).about("Clear the stored session"))
        .subcommand(
            Command::new(CMD_STATUS).about("Show the stored session and when it expires"),
        )
        .subcommand(open());

    let command = api::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}

fn login() -> Command {
    Command::new(CMD_LOGIN)
        .about("Sign in: verify the OTP sent to your email, then exchange email and password")
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .short('e')
                .help("Account email")
                .env("RESELLER_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password; prompted for when missing")
                .env("RESELLER_PASSWORD")
                .hide_env_values(true),
        )
}

fn register() -> Command {
    let text = |id: &'static str, help: &'static str| Arg::new(id).long(id).help(help);

    Command::new(CMD_REGISTER)
        .about("Create an account: profile, email and mobile OTP, then password")
        .arg(text(ARG_FIRST_NAME, "First name"))
        .arg(text(ARG_LAST_NAME, "Last name"))
        .arg(text(ARG_BUSINESS_NAME, "Business name"))
        .arg(text(
            ARG_BUSINESS_TYPE,
            "Business type: public, private limited, llp or proprietor",
        ))
        .arg(text(ARG_EMAIL, "Business email"))
        .arg(text(ARG_MOBILE, "10-digit mobile number"))
        .arg(text(
            ARG_REGISTRATION_NO,
            "GST, MSME (Udyam) or Gumasta registration number",
        ))
        .arg(
            Arg::new(ARG_ACCEPT_TERMS)
                .long(ARG_ACCEPT_TERMS)
                .help("Accept the terms and conditions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            text(ARG_PASSWORD, "Password: 8-20 characters, 1 uppercase, 1 of !@#$%^&*")
                .env("RESELLER_PASSWORD")
                .hide_env_values(true),
        )
        .arg(text(ARG_CONFIRM_PASSWORD, "Repeat the password"))
}

fn open() -> Command {
    Command::new(CMD_OPEN)
        .about("Open a console page through the route guard")
        .arg(
            Arg::new(ARG_PATH)
                .help("Page location, e.g. /vendors")
                .required(true),
        )
        .arg(
            Arg::new(ARG_WATCH)
                .long(ARG_WATCH)
                .help("Stay on the page until the session expires")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_FETCH)
                .long(ARG_FETCH)
                .help("API path to GET with the session token once the page renders"),
        )
}
