use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::feed::{Post, Reply};

/// Maximum post/reply length in Unicode code points, enforced client-side
/// before dispatch.
pub const TEXT_LIMIT: usize = 140;

/// Failure kinds for collaborator calls. Callers surface these to the user;
/// nothing is retried automatically.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connection, TLS, timeout, bad body).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Missing or rejected access token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Content validation failed, client-side or server-side.
    #[error("invalid content: {0}")]
    Invalid(String),

    /// The addressed resource does not exist server-side.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error ({status}): {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
struct AuthorRequest<'a> {
    original_text: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Map a non-success response onto the error taxonomy.
async fn status_error(response: reqwest::Response, what: &str) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Unauthorized(format!("{} rejected ({})", what, status))
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(format!("{} target missing", what)),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Invalid(format!("{} rejected: {}", what, body))
        }
        _ => ApiError::Status { status, body },
    }
}

/// Reject empty and over-limit text before a request is issued. The limit is
/// counted in code points, matching the backend's validation.
fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Invalid("text must not be empty".to_string()));
    }
    let code_points = text.chars().count();
    if code_points > TEXT_LIMIT {
        return Err(ApiError::Invalid(format!(
            "text is {} code points, limit is {}",
            code_points, TEXT_LIMIT
        )));
    }
    Ok(())
}

fn require_token(token: Option<&str>) -> Result<&str, ApiError> {
    token.ok_or_else(|| ApiError::Unauthorized("login required".to_string()))
}

/// Fetch the initial timeline, posts with nested replies, newest first.
pub async fn fetch_timeline(client: &reqwest::Client, config: &Config) -> Result<Vec<Post>, ApiError> {
    let url = format!("{}/posts/timeline", config.api_base_url);
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(status_error(response, "timeline fetch").await);
    }

    let posts: Vec<Post> = response.json().await?;
    info!("Fetched timeline with {} posts", posts.len());
    Ok(posts)
}

/// Create a new post. Requires a session token and valid text.
pub async fn create_post(
    client: &reqwest::Client,
    config: &Config,
    text: &str,
    token: Option<&str>,
) -> Result<Post, ApiError> {
    validate_text(text)?;
    let token = require_token(token)?;

    let url = format!("{}/posts/", config.api_base_url);
    let response = client
        .post(&url)
        .bearer_auth(token)
        .json(&AuthorRequest { original_text: text })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(status_error(response, "post creation").await);
    }

    Ok(response.json().await?)
}

/// Create a reply under an existing post. Requires a session token and valid
/// text; fails with NotFound if the backend does not know the post.
pub async fn create_reply(
    client: &reqwest::Client,
    config: &Config,
    post_id: i64,
    text: &str,
    token: Option<&str>,
) -> Result<Reply, ApiError> {
    validate_text(text)?;
    let token = require_token(token)?;

    let url = format!("{}/posts/{}/replies", config.api_base_url, post_id);
    let response = client
        .post(&url)
        .bearer_auth(token)
        .json(&AuthorRequest { original_text: text })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(status_error(response, "reply creation").await);
    }

    Ok(response.json().await?)
}

/// Exchange username and password for an access token. The auth endpoint
/// expects a form-encoded body (OAuth2 password flow).
pub async fn login(
    client: &reqwest::Client,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<Token, ApiError> {
    let url = format!("{}/token", config.api_base_url);
    let response = client
        .post(&url)
        .form(&[("username", username), ("password", password)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(status_error(response, "login").await);
    }

    Ok(response.json().await?)
}

/// Register a new account.
pub async fn register(
    client: &reqwest::Client,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<UserAccount, ApiError> {
    let url = format!("{}/register", config.api_base_url);
    let response = client
        .post(&url)
        .json(&RegisterRequest { username, password })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(status_error(response, "registration").await);
    }

    Ok(response.json().await?)
}
