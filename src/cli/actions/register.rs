use crate::{
    auth::{
        AuthApi, AuthError, ContactMethod, CredentialIssuer, ErrorKind, Field, RegistrationDraft,
        RegistrationStep, RegistrationWizard, issuer::PAIRED_SEND_FALLBACK,
        otp::normalize_code_input, registration::ContactState,
    },
    cli::{actions::console::Console, commands, globals::GlobalArgs},
    notify::{Notification, Notifications},
    session::guard::RouteGuard,
};
use anyhow::{Result, bail};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub draft: RegistrationDraft,
    pub password: Option<SecretString>,
    pub confirm_password: Option<SecretString>,
}

/// A line typed during the verification step.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WizardInput {
    Verify(ContactMethod, String),
    /// `None` resends both.
    Resend(Option<ContactMethod>),
    Unknown,
}

fn contact(word: &str) -> Option<ContactMethod> {
    match word.to_lowercase().as_str() {
        "e" | "email" => Some(ContactMethod::Email),
        "m" | "mobile" => Some(ContactMethod::Mobile),
        _ => None,
    }
}

pub(crate) fn parse_wizard_input(line: &str) -> WizardInput {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return WizardInput::Unknown;
    };

    if first.eq_ignore_ascii_case("resend") || first.eq_ignore_ascii_case("r") {
        return match words.next() {
            None => WizardInput::Resend(None),
            Some(word) if word.eq_ignore_ascii_case("both") => WizardInput::Resend(None),
            Some(word) => contact(word).map_or(WizardInput::Unknown, |m| WizardInput::Resend(Some(m))),
        };
    }

    match contact(first) {
        Some(method) => {
            let rest: String = words.collect();
            WizardInput::Verify(method, normalize_code_input(&rest))
        }
        None => WizardInput::Unknown,
    }
}

/// Command-line flag a field error refers to.
fn flag_for(field: Field) -> &'static str {
    match field {
        Field::FirstName => commands::ARG_FIRST_NAME,
        Field::LastName => commands::ARG_LAST_NAME,
        Field::BusinessName => commands::ARG_BUSINESS_NAME,
        Field::BusinessType => commands::ARG_BUSINESS_TYPE,
        Field::Terms => commands::ARG_ACCEPT_TERMS,
        Field::Email => commands::ARG_EMAIL,
        Field::Mobile => commands::ARG_MOBILE,
        Field::RegistrationNo => commands::ARG_REGISTRATION_NO,
        Field::Password => commands::ARG_PASSWORD,
        Field::Otp => "otp",
    }
}

fn describe(state: ContactState) -> &'static str {
    match state {
        ContactState::Unsent => "not sent",
        ContactState::Sent => "code sent",
        ContactState::Verified => "verified",
    }
}

/// Interactive sign-up wizard.
///
/// # Errors
/// Returns an error if the profile flags are invalid, the API client cannot
/// be built, or stdin closes before the account exists.
pub async fn execute(args: Args) -> Result<()> {
    let store = args.globals.session_store();
    let guard = RouteGuard::new(store.clone());
    if let Some(location) = guard.check_auth_page().location() {
        println!("Already signed in, redirecting to {location}");
        return Ok(());
    }

    let client = args.globals.api_client(store.clone())?;
    let mut wizard = RegistrationWizard::new(CredentialIssuer::new(client, store));
    let mut console = Console::new(Notifications::new());

    // 1. Profile
    loop {
        match wizard.submit_profile(&args.draft).await {
            Ok(ack) => {
                console.notify(Notification::success(
                    "OTP Sent",
                    ack.message
                        .unwrap_or_else(|| PAIRED_SEND_FALLBACK.to_string()),
                ));
                break;
            }
            Err(AuthError::Profile(errors)) => {
                for (field, message) in errors.iter() {
                    eprintln!("  --{}: {message}", flag_for(field));
                }
                bail!("registration details are incomplete");
            }
            Err(err) => {
                console.report("Registration Failed", &err);
                if console.ask("Press Enter to retry").await?.is_none() {
                    bail!("input closed before registration completed");
                }
            }
        }
    }

    // 2. Email and mobile verification, in any order
    println!("Enter 'email <code>' or 'mobile <code>'; 'resend [email|mobile|both]' asks for new codes");
    while let RegistrationStep::AwaitingOtpVerification { email, mobile } = wizard.step() {
        let label = format!("email: {}, mobile: {}", describe(email), describe(mobile));
        let Some(line) = console.ask(&label).await? else {
            bail!("input closed before registration completed");
        };
        verification_step(&mut wizard, &console, &line).await;
    }

    // 3. Password
    let mut password = args.password;
    let mut confirm = args.confirm_password;
    loop {
        let password_value = match password.take() {
            Some(value) => value,
            None => ask_secret(&mut console, "Password").await?,
        };
        let confirm_value = match confirm.take() {
            Some(value) => value,
            None => ask_secret(&mut console, "Confirm password").await?,
        };

        match wizard.submit_password(&password_value, &confirm_value).await {
            Ok(outcome) => {
                console.notify(Notification::success("Registration Successful", outcome.message));
                println!("Redirecting to {}", outcome.redirect_to);
                return Ok(());
            }
            Err(err) => {
                console.report("Registration Failed", &err);
                if err.kind() != ErrorKind::Validation {
                    // Keep the password the user already typed
                    password = Some(password_value);
                    confirm = Some(confirm_value);
                    if console.ask("Press Enter to retry").await?.is_none() {
                        bail!("input closed before registration completed");
                    }
                }
            }
        }
    }
}

async fn verification_step<A: AuthApi>(
    wizard: &mut RegistrationWizard<A>,
    console: &Console,
    line: &str,
) {
    match parse_wizard_input(line) {
        WizardInput::Verify(method, code) => match wizard.verify(method, &code).await {
            Ok(ack) => console.notify(Notification::success(
                "OTP Verified",
                ack.message
                    .unwrap_or_else(|| format!("{} verified", method.as_str().to_lowercase())),
            )),
            Err(err) => console.report("Verification Failed", &err),
        },
        WizardInput::Resend(Some(method)) => match wizard.resend(method).await {
            Ok(ack) => console.notify(Notification::success(
                "OTP Sent",
                ack.message.unwrap_or_else(|| {
                    format!("OTP sent to {}", method.as_str().to_lowercase())
                }),
            )),
            Err(err) => console.report("OTP Not Sent", &err),
        },
        WizardInput::Resend(None) => match wizard.resend_both().await {
            Ok(message) => console.notify(Notification::success("OTP Sent", message)),
            Err(err) => console.report("OTP Not Sent", &err),
        },
        WizardInput::Unknown => {
            eprintln!("Expected 'email <code>', 'mobile <code>' or 'resend [email|mobile|both]'");
        }
    }
}

async fn ask_secret(console: &mut Console, label: &str) -> Result<SecretString> {
    match console.ask(label).await? {
        Some(line) => Ok(SecretString::from(line)),
        None => bail!("input closed before registration completed"),
    }
}
