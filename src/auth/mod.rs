//! Credential suppliers for the Airflow API.
//!
//! Basic auth and Keycloak OAuth2 are alternate ways of obtaining the same
//! thing: credentials to attach to each Airflow request. The poller never
//! sees the difference.

mod keycloak;

pub use keycloak::*;

use async_trait::async_trait;
use thiserror::Error;

/// Resolved credentials attached to each Airflow request.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// Bearer token from an identity provider.
    Bearer(String),
}

/// Errors from credential resolution.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Identity provider rejected the request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Token request failed: {0}")]
    RequestFailed(String),
    #[error("Token response did not contain an access_token field")]
    MissingToken,
}

/// Trait for credential suppliers.
#[async_trait]
pub trait CredentialSupplier: Send + Sync {
    /// Resolve credentials for use against the Airflow API.
    async fn credentials(&self) -> Result<Credentials, AuthError>;
}

/// Static HTTP basic credentials.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    #[must_use]
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

#[async_trait]
impl CredentialSupplier for BasicCredentials {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        Ok(Credentials::Basic {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

/// Supplier enum for dispatch.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    Basic(BasicCredentials),
    Keycloak(KeycloakSupplier),
}

#[async_trait]
impl CredentialSupplier for AuthMethod {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        match self {
            Self::Basic(s) => s.credentials().await,
            Self::Keycloak(s) => s.credentials().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_supplier_returns_static_credentials() {
        let supplier = BasicCredentials::new("airflow".to_string(), "secret".to_string());
        let creds = supplier.credentials().await.unwrap();
        match creds {
            Credentials::Basic { username, password } => {
                assert_eq!(username, "airflow");
                assert_eq!(password, "secret");
            }
            Credentials::Bearer(_) => panic!("expected basic credentials"),
        }
    }

    #[tokio::test]
    async fn auth_method_dispatches_to_basic() {
        let method = AuthMethod::Basic(BasicCredentials::new("u".to_string(), "p".to_string()));
        let creds = method.credentials().await.unwrap();
        assert!(matches!(creds, Credentials::Basic { .. }));
    }
}
