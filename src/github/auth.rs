use std::process::Command;

use tracing::debug;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(
        "no GitHub token found: `gh auth token` failed ({gh}) and {env} is not set. \
         Run `gh auth login` or export {env}",
        env = TOKEN_ENV
    )]
    NoToken { gh: String },
}

/// Find a token, preferring the GitHub CLI over the environment.
pub fn resolve_token() -> Result<String, AuthError> {
    token_from(gh_token, |name| std::env::var(name).ok())
}

fn token_from(
    gh: impl FnOnce() -> Result<String, String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, AuthError> {
    let gh_failure = match gh() {
        Ok(token) => {
            debug!("using token from gh CLI");
            return Ok(token);
        }
        Err(reason) => reason,
    };

    match env(TOKEN_ENV).map(|t| t.trim().to_string()) {
        Some(token) if !token.is_empty() => {
            debug!("using token from {TOKEN_ENV}");
            Ok(token)
        }
        _ => Err(AuthError::NoToken { gh: gh_failure }),
    }
}

fn gh_token() -> Result<String, String> {
    let output = Command::new("gh")
        .args(["auth", "token", "--hostname", "github.com"])
        .output()
        .map_err(|e| e.to_string())?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stderr.trim().to_string());
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err("empty token".into());
    }
    Ok(token)
}
