use super::AppContext;
use anyhow::{Context, Result};
use colored::Colorize;
use discuss_core::session::Session;
use discuss_core::user::LoginPayload;

pub async fn whoami(context: &AppContext) {
    let session = context.session.bootstrap().await;
    print_session(&session);
}

pub async fn login(context: &AppContext, payload: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(payload).context("Login payload is not valid JSON")?;
    let payload = LoginPayload::from_value(value).context("Login payload is not a user object")?;

    context.session.initialize();
    let session = context.session.login(Some(payload)).await?;
    print_session(&session);
    Ok(())
}

pub async fn logout(context: &AppContext) {
    context.session.initialize();
    let session = context.session.logout().await;
    print_session(&session);
}

fn print_session(session: &Session) {
    match (&session.user, session.is_authenticated()) {
        (Some(user), true) => println!(
            "{} {} {}",
            "Signed in as".green(),
            user.username.bold(),
            format!("(id {})", user.id).dimmed()
        ),
        _ => println!("{} ({})", "Not signed in".yellow(), session.phase),
    }
}
