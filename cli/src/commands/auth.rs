//! Interactive OAuth login against the 37signals launchpad, plus the
//! non-interactive credential commands.
//!
//! Login runs a one-shot loopback HTTP listener for the redirect, exchanges
//! the authorization code through the shared auth manager, and discovers the
//! Basecamp 3 account id when none was given on the command line.

use basecamp_core::auth::{LAUNCHPAD_AUTHORIZATION_URL, LAUNCHPAD_AUTHORIZE_URL};
use basecamp_core::{AuthManager, Credential, OAuthConfig, TokenStore};
use serde_json::{json, Value};

type CliError = Box<dyn std::error::Error>;

pub async fn login(
    store: TokenStore,
    oauth: OAuthConfig,
    account_id: Option<&str>,
    user_agent: &str,
) -> Result<(), CliError> {
    if oauth.client_id.is_empty() || oauth.client_secret.is_empty() {
        return Err(
            "OAuth client credentials are required; set BASECAMP_CLIENT_ID and BASECAMP_CLIENT_SECRET"
                .into(),
        );
    }

    // One-shot callback server on a random loopback port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{port}/callback");
    let state = uuid::Uuid::now_v7().simple().to_string();

    let mut authorize_url = url::Url::parse(LAUNCHPAD_AUTHORIZE_URL)?;
    authorize_url
        .query_pairs_mut()
        .append_pair("type", "web_server")
        .append_pair("client_id", &oauth.client_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("state", &state);

    eprintln!("Opening browser for Basecamp authentication...");
    eprintln!("If the browser doesn't open, visit: {authorize_url}");
    let _ = open::that(authorize_url.as_str());

    let callback_result = tokio::select! {
        result = wait_for_callback(listener) => result,
        _ = tokio::time::sleep(std::time::Duration::from_secs(300)) => {
            return Err("Login timed out after 5 minutes.".into());
        }
    };
    let (code, received_state) = callback_result?;

    if received_state.as_deref() != Some(state.as_str()) {
        return Err("OAuth state mismatch; aborting login.".into());
    }

    let manager = AuthManager::new(store, oauth);
    let account = account_id.unwrap_or_default().to_string();
    let credential = manager.exchange_code(&code, &redirect_uri, &account).await?;

    let credential = if credential.account_id.is_empty() {
        let discovered = discover_account(&credential.access_token, user_agent).await?;
        let updated = Credential {
            account_id: discovered,
            ..credential
        };
        manager.store().write(&updated)?;
        updated
    } else {
        credential
    };

    let output = json!({
        "status": "authenticated",
        "account_id": credential.account_id,
        "expires_at": credential.expires_at,
        "credentials_path": manager.store().path().to_string_lossy()
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn wait_for_callback(
    listener: tokio::net::TcpListener,
) -> Result<(String, Option<String>), CliError> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (mut stream, _) = listener.accept().await?;
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    // Request line looks like: GET /callback?code=...&state=... HTTP/1.1
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("");
    let (code, state) = parse_callback(path)?;

    let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authenticated!</h1><p>You can close this tab.</p></body></html>";
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;

    Ok((code, state))
}

fn parse_callback(path: &str) -> Result<(String, Option<String>), CliError> {
    let url = url::Url::parse(&format!("http://localhost{path}"))
        .map_err(|e| format!("Failed to parse callback URL: {e}"))?;

    let code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
        .ok_or("No 'code' parameter in callback")?;

    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string());

    Ok((code, state))
}

/// Resolve the Basecamp 3 account id for a fresh token via the launchpad's
/// authorization endpoint.
async fn discover_account(access_token: &str, user_agent: &str) -> Result<String, CliError> {
    let response = reqwest::Client::new()
        .get(LAUNCHPAD_AUTHORIZATION_URL)
        .bearer_auth(access_token)
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("Account discovery failed with status {}", response.status()).into());
    }

    let body: Value = response.json().await?;
    let account_id = body
        .get("accounts")
        .and_then(Value::as_array)
        .and_then(|accounts| {
            accounts
                .iter()
                .find(|account| account.get("product").and_then(Value::as_str) == Some("bc3"))
        })
        .and_then(|account| account.get("id"))
        .and_then(Value::as_u64)
        .ok_or("This login has no Basecamp 3 account; pass --account-id explicitly")?;
    Ok(account_id.to_string())
}

pub fn status(store: &TokenStore) -> Result<(), CliError> {
    let output = match store.read()? {
        Some(credential) => json!({
            "status": "authenticated",
            "account_id": credential.account_id,
            "expires_at": credential.expires_at,
            "expired": credential.is_expired(),
            "has_refresh_token": credential.refresh_token.is_some(),
            "credentials_path": store.path().to_string_lossy()
        }),
        None => json!({
            "status": "unauthenticated",
            "message": "No stored credential. Run `bcq auth login` to connect an account.",
            "credentials_path": store.path().to_string_lossy()
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub async fn refresh(store: TokenStore, oauth: OAuthConfig) -> Result<(), CliError> {
    let manager = AuthManager::new(store, oauth);
    if !manager.ensure_authenticated().await? {
        return Err("No usable credential; run `bcq auth login` to re-authenticate.".into());
    }
    let credential = manager
        .current()?
        .ok_or("No usable credential; run `bcq auth login` to re-authenticate.")?;

    let output = json!({
        "status": "authenticated",
        "account_id": credential.account_id,
        "expires_at": credential.expires_at
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn logout(store: &TokenStore) -> Result<(), CliError> {
    store.clear()?;
    let output = json!({
        "status": "logged_out",
        "credentials_path": store.path().to_string_lossy()
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_callback;

    #[test]
    fn callback_path_yields_code_and_state() {
        let (code, state) = parse_callback("/callback?code=abc123&state=xyz").unwrap();
        assert_eq!(code, "abc123");
        assert_eq!(state.as_deref(), Some("xyz"));
    }

    #[test]
    fn callback_without_code_is_rejected() {
        assert!(parse_callback("/callback?error=access_denied").is_err());
    }

    #[test]
    fn callback_state_is_optional() {
        let (code, state) = parse_callback("/callback?code=abc123").unwrap();
        assert_eq!(code, "abc123");
        assert!(state.is_none());
    }
}
