//! Sign-in against the remote's auth endpoint. The board is single-user but
//! still gated: without a live session the app shows the sign-in prompt and
//! loads nothing.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("error de red: {0}")]
    Http(#[from] reqwest::Error),
    #[error("credenciales inválidas o sesión vencida (HTTP {status}): {body}")]
    Unauthorised { status: u16, body: String },
}

/// The signed-in user, as the auth endpoint reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    /// Display name from the profile metadata, falling back to the email.
    pub name: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    user_metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    full_name: Option<String>,
}

impl UserPayload {
    fn into_session(self, access_token: &str) -> Session {
        let name = self
            .user_metadata
            .full_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.email.clone());
        Session {
            user_id: self.id,
            email: self.email,
            name,
            access_token: access_token.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    user: UserPayload,
}

/// Client for the auth endpoints.
pub struct SessionProvider {
    client: reqwest::Client,
    auth_url: String,
    api_key: String,
}

impl SessionProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        SessionProvider {
            client: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SessionError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SessionError::Unauthorised {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Exchange email and password for a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let url = format!("{}/token?grant_type=password", self.auth_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let payload: TokenPayload = Self::check(response).await?.json().await?;
        Ok(payload.user.into_session(&payload.access_token))
    }

    /// Validate a stored token and rehydrate the session behind it.
    pub async fn current_user(&self, access_token: &str) -> Result<Session, SessionError> {
        let url = format!("{}/user", self.auth_url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let payload: UserPayload = Self::check(response).await?.json().await?;
        Ok(payload.into_session(access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_profile_metadata() {
        let payload: UserPayload = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "bel@example.com",
            "user_metadata": { "full_name": "Bel R." }
        }))
        .unwrap();
        let session = payload.into_session("tok");
        assert_eq!(session.name, "Bel R.");
        assert_eq!(session.access_token, "tok");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let payload: UserPayload = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "bel@example.com",
            "user_metadata": {}
        }))
        .unwrap();
        assert_eq!(payload.into_session("t").name, "bel@example.com");

        let payload: UserPayload = serde_json::from_value(serde_json::json!({
            "id": "u2",
            "email": "x@example.com",
            "user_metadata": { "full_name": "" }
        }))
        .unwrap();
        assert_eq!(payload.into_session("t").name, "x@example.com");
    }

    #[test]
    fn unknown_metadata_keys_are_tolerated() {
        let payload: UserPayload = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "bel@example.com",
            "user_metadata": { "avatar_url": "https://x/y.png" }
        }))
        .unwrap();
        assert_eq!(payload.into_session("t").user_id, "u1");
    }
}
