use crate::{
    auth::{
        AuthApi, AuthError, ContactMethod, CredentialIssuer, ErrorKind, Field, OtpPurpose,
        otp::normalize_code_input,
    },
    cli::{actions::console::Console, globals::GlobalArgs},
    notify::{Notification, Notifications},
    routes,
    session::guard::RouteGuard,
};
use anyhow::{Result, bail};
use secrecy::SecretString;
use serde_json::Value;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
    pub password: Option<SecretString>,
}

/// What a line typed at the OTP prompt asks for.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CodeInput {
    Resend,
    Code(String),
}

pub(crate) fn parse_code_input(line: &str) -> CodeInput {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("r") {
        CodeInput::Resend
    } else {
        CodeInput::Code(normalize_code_input(line))
    }
}

/// Interactive sign-in. Rejections are printed and the user tries again;
/// only closing stdin ends the flow early.
///
/// # Errors
/// Returns an error if the API client cannot be built or stdin closes.
pub async fn execute(args: Args) -> Result<()> {
    let store = args.globals.session_store();
    let guard = RouteGuard::new(store.clone());
    if let Some(location) = guard.check_auth_page().location() {
        println!("Already signed in, redirecting to {location}");
        return Ok(());
    }

    let client = args.globals.api_client(store.clone())?;
    let mut issuer = CredentialIssuer::new(client, store);
    let mut console = Console::new(Notifications::new());

    let mut password = match args.password {
        Some(password) => password,
        None => ask_password(&mut console).await?,
    };

    if let Err(err) = send_code(&mut issuer, &console, &args.email).await {
        if is_fatal(&err) {
            bail!("{err}");
        }
    }

    loop {
        if !issuer.is_verified(ContactMethod::Email, &args.email, OtpPurpose::Login) {
            let Some(line) = console.ask("OTP (empty line or 'r' to resend)").await? else {
                bail!("input closed before sign-in completed");
            };

            let code = match parse_code_input(&line) {
                CodeInput::Resend => {
                    // Failures were already reported; the prompt stays open
                    let _ = send_code(&mut issuer, &console, &args.email).await;
                    continue;
                }
                CodeInput::Code(code) => code,
            };

            match issuer
                .verify_otp(ContactMethod::Email, &args.email, OtpPurpose::Login, &code)
                .await
            {
                Ok(ack) => console.notify(Notification::success(
                    "OTP Verified",
                    ack.message.unwrap_or_else(|| "OTP verified".to_string()),
                )),
                Err(err) => {
                    console.report("Verification Failed", &err);
                    continue;
                }
            }
        }

        match issuer.login(&args.email, &password).await {
            Ok(session) => {
                let name = session
                    .user
                    .get("email")
                    .and_then(Value::as_str)
                    .unwrap_or(args.email.as_str())
                    .to_string();
                console.notify(Notification::success("Signed In", format!("Welcome {name}")));
                println!("Redirecting to {}", routes::DASHBOARD);
                return Ok(());
            }
            Err(err) => {
                console.report("Login Failed", &err);
                // The OTP stays verified; the next attempt only needs the password
                if err.kind() == ErrorKind::Api || err.field() == Some(Field::Password) {
                    password = ask_password(&mut console).await?;
                } else if console.ask("Press Enter to retry").await?.is_none() {
                    bail!("input closed before sign-in completed");
                }
            }
        }
    }
}

async fn ask_password(console: &mut Console) -> Result<SecretString> {
    match console.ask("Password").await? {
        Some(line) => Ok(SecretString::from(line)),
        None => bail!("input closed"),
    }
}

async fn send_code<A: AuthApi>(
    issuer: &mut CredentialIssuer<A>,
    console: &Console,
    email: &str,
) -> Result<(), AuthError> {
    match issuer
        .request_otp(ContactMethod::Email, email, OtpPurpose::Login)
        .await
    {
        Ok(ack) => {
            console.notify(Notification::success(
                "OTP Sent",
                ack.message
                    .unwrap_or_else(|| format!("OTP sent to {}", email.trim())),
            ));
            Ok(())
        }
        Err(err) => {
            console.report("OTP Not Sent", &err);
            Err(err)
        }
    }
}

/// Whether the error leaves the login form usable. A malformed `--email`
/// can never succeed, so the action gives up on it.
pub(crate) fn is_fatal(err: &AuthError) -> bool {
    err.kind() == ErrorKind::Validation && err.field() == Some(Field::Email)
}
