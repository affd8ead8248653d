use basecamp_client::{AuthMode, BasecampClient};
use basecamp_core::{compact, AuthManager, OAuthConfig, TokenStore};
use serde_json::{json, Value};

type CliError = Box<dyn std::error::Error>;

pub async fn list(
    store: TokenStore,
    oauth: OAuthConfig,
    user_agent: &str,
    full: bool,
) -> Result<(), CliError> {
    let manager = AuthManager::new(store, oauth);
    if !manager.ensure_authenticated().await? {
        return Err("Not authenticated; run `bcq auth login` first.".into());
    }
    let credential = manager
        .current()?
        .ok_or("Not authenticated; run `bcq auth login` first.")?;

    let client = BasecampClient::new(
        &credential.account_id,
        user_agent,
        AuthMode::Bearer(credential.access_token.clone()),
    );
    let projects = client.get_projects().await?;
    let count = projects.len();
    let projects = if full {
        Value::Array(projects)
    } else {
        compact::compact_list(&Value::Array(projects), "project")
    };

    let output = json!({
        "status": "success",
        "projects": projects,
        "count": count
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
