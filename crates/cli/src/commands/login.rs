//! `polyfact login` / `polyfact logout`.

use std::io::Write;

use polyfact_client::{AuthClient, LoginInput, LoginOutcome, OAuthProvider, PolyfactClient};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandResult, load_config};
use crate::LoginMethod;

fn auth_client() -> Result<AuthClient, Box<dyn std::error::Error>> {
    let config = load_config()?;
    let client = PolyfactClient::from_config(&config)?;
    Ok(AuthClient::from_config(client, &config)?)
}

pub async fn run(
    method: LoginMethod,
    token: Option<String>,
    redirect_to: &str,
    callback: Option<String>,
) -> CommandResult {
    let auth = auth_client()?;

    let input = match method {
        LoginMethod::Github => LoginInput::Provider(OAuthProvider::Github),
        LoginMethod::Google => LoginInput::Provider(OAuthProvider::Google),
        LoginMethod::Firebase => LoginInput::Firebase {
            token: token.ok_or("`polyfact login firebase` needs --token")?,
        },
    };

    // A callback from an earlier browser round-trip completes the sign-in.
    if let Some(callback) = callback {
        return finish_browser_login(&auth, &callback).await;
    }

    match auth.login(input, redirect_to).await? {
        LoginOutcome::SignedIn => {
            println!("Signed in.");
            Ok(())
        }
        LoginOutcome::Redirect { url } => {
            println!("Open this URL in your browser to sign in:");
            println!();
            println!("  {url}");
            println!();
            print!("Then paste the URL you were sent back to: ");
            std::io::stdout().flush()?;

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let callback = lines
                .next_line()
                .await?
                .ok_or("No callback URL entered")?;
            finish_browser_login(&auth, callback.trim()).await
        }
    }
}

async fn finish_browser_login(auth: &AuthClient, callback: &str) -> CommandResult {
    if auth.init(Some(callback)).await? {
        println!("Signed in. The session is stored for later commands.");
        Ok(())
    } else {
        Err("The callback URL did not contain a session".into())
    }
}

pub async fn logout() -> CommandResult {
    let config = load_config()?;
    let client = PolyfactClient::from_config(&config)?;
    match AuthClient::from_config(client, &config) {
        Ok(auth) => auth.logout().await?,
        Err(_) => {
            // Without a project there is no session, only a possible file.
            let store = polyfact_core::FileSessionStore::new(config.session_path());
            polyfact_core::SessionStore::remove(&store, polyfact_core::REFRESH_TOKEN_KEY)
                .await?;
        }
    }
    println!("Signed out.");
    if config.has_token() {
        println!("Note: a token is still set through config or POLYFACT_TOKEN.");
    }
    Ok(())
}
