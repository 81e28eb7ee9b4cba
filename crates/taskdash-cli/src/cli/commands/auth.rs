//! Auth command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use taskdash_core::TaskClient;
use taskdash_core::config::paths;
use taskdash_core::session::storage::mask_token;
use taskdash_core::session::token;
use taskdash_core::session::{Credentials, Registration};

pub struct LoginArgs {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct RegisterArgs {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .with_context(|| format!("read {label} from stdin"))?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(client: &mut TaskClient, args: LoginArgs) -> Result<()> {
    if let Some(user) = client.session().current_user() {
        println!("Replacing existing session for {}.", user.display_name());
    }

    let email = match args.email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password")?,
    };

    let session = client
        .login(&Credentials::new(email.trim(), password))
        .await?;

    println!("✓ Welcome back, {}!", session.user.display_name());
    println!("  Session saved to: {}", paths::session_path().display());
    Ok(())
}

pub async fn register(client: &mut TaskClient, args: RegisterArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password")?,
    };

    let greeting = client
        .register(&Registration {
            name: args.name.trim().to_string(),
            email: args.email.trim().to_string(),
            password,
        })
        .await?;

    println!("✓ Registration successful! Welcome {greeting}!");
    println!("  Log in with `taskdash login` to start managing tasks.");
    Ok(())
}

pub fn logout(client: &mut TaskClient) {
    let had_session = client.session().is_authenticated();
    // Runs either way so leftovers on disk are cleared too.
    client.logout();

    if had_session {
        println!("✓ Logged out");
        println!(
            "  Session removed from: {}",
            paths::session_path().display()
        );
    } else {
        println!("Not logged in (no session found).");
    }
}

pub fn whoami(client: &mut TaskClient) -> Result<()> {
    let session = client
        .require_session()
        .context("Not logged in. Run `taskdash login` first")?;
    let user = &session.user;

    println!("{}", user.display_name());
    if let Some(email) = &user.email {
        println!("  email:   {email}");
    }
    if let Some(id) = &user.id {
        println!("  id:      {id}");
    }
    println!("  token:   {}", mask_token(&session.token));

    let expires = token::decode_claims(&session.token)
        .ok()
        .and_then(|claims| claims.exp)
        .and_then(|exp| DateTime::from_timestamp(exp, 0));
    match expires {
        Some(at) => println!(
            "  expires: {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("  expires: never"),
    }
    Ok(())
}

pub async fn health(client: &TaskClient) -> Result<()> {
    let base_url = client.api().base_url();
    if client.api().health_check().await {
        println!("✓ API is reachable at {base_url}");
        Ok(())
    } else {
        anyhow::bail!("API is not reachable at {base_url}")
    }
}
