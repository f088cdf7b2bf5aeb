use crate::cli::actions::{Action, login, open, register, session};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::Register(args) => register::execute(args).await,
        Action::Logout(globals) => session::logout(&globals),
        Action::Status(globals) => session::status(&globals),
        Action::Open(args) => open::execute(args).await,
    }
}
