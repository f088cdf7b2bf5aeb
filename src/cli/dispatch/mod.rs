//! Maps validated CLI arguments to an [`Action`].

use crate::auth::RegistrationDraft;
use crate::cli::{
    actions::{Action, login, open, register},
    commands::{self, api, session},
    globals::GlobalArgs,
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let api_opts = api::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches)?;
    let globals = GlobalArgs::new(api_opts.api, session_opts.session, session_opts.session_dir);

    let (name, sub) = matches
        .subcommand()
        .context("missing subcommand, see --help")?;

    match name {
        commands::CMD_LOGIN => {
            let email = sub
                .get_one::<String>(commands::ARG_EMAIL)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .context("missing required argument: --email")?;
            Ok(Action::Login(login::Args {
                globals,
                email,
                password: secret(sub, commands::ARG_PASSWORD),
            }))
        }
        commands::CMD_REGISTER => Ok(Action::Register(register::Args {
            globals,
            draft: draft(sub),
            password: secret(sub, commands::ARG_PASSWORD),
            confirm_password: secret(sub, commands::ARG_CONFIRM_PASSWORD),
        })),
        commands::CMD_LOGOUT => Ok(Action::Logout(globals)),
        commands::CMD_STATUS => Ok(Action::Status(globals)),
        commands::CMD_OPEN => {
            let path = sub
                .get_one::<String>(commands::ARG_PATH)
                .cloned()
                .context("missing required argument: <path>")?;
            Ok(Action::Open(open::Args {
                globals,
                path,
                watch: sub.get_flag(commands::ARG_WATCH),
                fetch: sub
                    .get_one::<String>(commands::ARG_FETCH)
                    .cloned()
                    .filter(|v| !v.trim().is_empty()),
            }))
        }
        other => anyhow::bail!("unknown subcommand: {other}"),
    }
}

fn secret(matches: &ArgMatches, id: &str) -> Option<SecretString> {
    matches
        .get_one::<String>(id)
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.as_str()))
}

// Missing fields stay empty so the draft reports every problem at once.
fn draft(matches: &ArgMatches) -> RegistrationDraft {
    let text = |id: &str| {
        matches
            .get_one::<String>(id)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    RegistrationDraft {
        first_name: text(commands::ARG_FIRST_NAME),
        last_name: text(commands::ARG_LAST_NAME),
        business_name: text(commands::ARG_BUSINESS_NAME),
        business_type: text(commands::ARG_BUSINESS_TYPE),
        email: text(commands::ARG_EMAIL),
        mobile: text(commands::ARG_MOBILE),
        registration_no: text(commands::ARG_REGISTRATION_NO),
        accepted_terms: matches.get_flag(commands::ARG_ACCEPT_TERMS),
    }
}
