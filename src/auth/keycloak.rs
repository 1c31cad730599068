//! OAuth2 password-grant supplier for Keycloak.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::client::build_http_client;

use super::{AuthError, CredentialSupplier, Credentials};

/// Token endpoint response. Expiry and refresh fields are ignored; the
/// token is resolved once, before the trigger request.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Path of the OpenID Connect token endpoint within a realm.
fn token_endpoint(base_url: &str, realm: &str) -> String {
    format!(
        "{}/realms/{realm}/protocol/openid-connect/token",
        base_url.trim_end_matches('/')
    )
}

/// Obtains a bearer token from Keycloak via the OAuth2 password grant.
#[derive(Debug, Clone)]
pub struct KeycloakSupplier {
    client: Client,
    base_url: String,
    realm: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

impl KeycloakSupplier {
    #[must_use]
    pub fn new(
        base_url: String,
        realm: String,
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            client: build_http_client(false),
            base_url,
            realm,
            client_id,
            client_secret,
            username,
            password,
        }
    }
}

#[async_trait]
impl CredentialSupplier for KeycloakSupplier {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        let url = token_endpoint(&self.base_url, &self.realm);
        let form = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        tracing::debug!(url = %url, realm = %self.realm, "Requesting access token");

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        token
            .access_token
            .map(Credentials::Bearer)
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_endpoint_joins_realm_path() {
        assert_eq!(
            token_endpoint("https://sso.example.com/", "platform"),
            "https://sso.example.com/realms/platform/protocol/openid-connect/token"
        );
    }

    #[test]
    fn token_response_parses_access_token() {
        let json = r#"{"access_token": "abc123", "expires_in": 300, "token_type": "Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn token_response_tolerates_missing_token() {
        let json = r#"{"error": "invalid_grant"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.access_token.is_none());
    }
}
