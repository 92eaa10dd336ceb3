//! Account and session commands

use crate::app::App;
use crate::error::{SheetbookError, SheetbookResult};

/// Use the given password, or prompt for one without echo
fn password_or_prompt(password: Option<String>, prompt: &str) -> SheetbookResult<String> {
    match password {
        Some(password) => Ok(password),
        None => rpassword::prompt_password(prompt)
            .map_err(|e| SheetbookError::Io(format!("Failed to read password: {}", e))),
    }
}

pub async fn handle_register(
    app: &App,
    username: &str,
    password: Option<String>,
) -> SheetbookResult<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let first = password_or_prompt(None, "Choose a password: ")?;
            let confirm = password_or_prompt(None, "Confirm password: ")?;
            if first != confirm {
                return Err(SheetbookError::Validation("Passwords do not match".into()));
            }
            first
        }
    };

    let session = app.auth().register(username, &password).await?;
    println!("Registered and logged in as {}.", session.username);
    Ok(())
}

pub async fn handle_login(app: &App, username: &str, password: Option<String>) -> SheetbookResult<()> {
    let password = password_or_prompt(password, "Password: ")?;
    let session = app.auth().login(username, &password).await?;
    println!("Logged in as {}.", session.username);
    Ok(())
}

pub async fn handle_logout(app: &App) -> SheetbookResult<()> {
    match app.auth().logout().await? {
        Some(session) => println!("Logged out {}.", session.username),
        None => println!("Not logged in."),
    }
    Ok(())
}

pub fn handle_whoami(app: &App) -> SheetbookResult<()> {
    match app.auth().current_user() {
        Some(session) => println!("{} ({})", session.username, session.user_id),
        None => println!("Not logged in."),
    }
    Ok(())
}
