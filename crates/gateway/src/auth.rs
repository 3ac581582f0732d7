//! Caller authentication. JWT/API-key verification itself is an external
//! collaborator (spec §1 "JWT signing/verifying" is explicitly out of
//! scope) — this module only defines the boundary, the same way
//! [`navigant_sessions::SessionPersistence`] defines the durable-store
//! boundary: a trait plus a permissive default implementation.

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::error::GatewayError;

/// The raw credential presented by a caller, regardless of transport.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub api_key: Option<String>,
    pub bearer: Option<String>,
}

impl Credential {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer.is_none()
    }

    /// Extracts `{api_key, bearer}` from `Authorization`/`X-Api-Key` HTTP
    /// headers (spec §6 REST surface; gRPC pulls the same values from
    /// request metadata via [`Self::from_grpc_metadata`]).
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        let api_key = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self { api_key, bearer }
    }

    #[must_use]
    pub fn from_grpc_metadata(metadata: &tonic::metadata::MetadataMap) -> Self {
        let bearer = metadata
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        let api_key = metadata
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self { api_key, bearer }
    }
}

/// A verified caller identity (spec §3 `Session.userId`/`roles`, surfaced
/// here before a session has necessarily been resolved).
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub roles: std::collections::HashSet<String>,
}

impl CallerIdentity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains("admin")
    }
}

/// Resolves a presented [`Credential`] into a [`CallerIdentity`]. The real
/// implementation (API-key lookup, JWT verification) lives outside this
/// crate's responsibility per spec §1; callers inject one at startup.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: &Credential) -> Result<CallerIdentity, GatewayError>;
}

/// Development/testing default: trusts whatever credential is presented and
/// maps it directly to a user id, granting `admin` to a configured key.
/// Never appropriate as a production authenticator — wire a real one via
/// the `authenticator` argument to [`crate::state::GatewayState::new`].
pub struct TrustingAuthenticator {
    pub admin_key: Option<String>,
}

#[async_trait]
impl Authenticator for TrustingAuthenticator {
    async fn authenticate(&self, credential: &Credential) -> Result<CallerIdentity, GatewayError> {
        let token = credential
            .bearer
            .as_deref()
            .or(credential.api_key.as_deref())
            .ok_or(GatewayError::Unauthenticated)?;

        let is_admin = self.admin_key.as_deref() == Some(token);
        let mut roles = std::collections::HashSet::new();
        if is_admin {
            roles.insert("admin".to_string());
        }
        Ok(CallerIdentity {
            user_id: token.to_string(),
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_credential_is_unauthenticated() {
        let auth = TrustingAuthenticator { admin_key: None };
        let err = auth.authenticate(&Credential::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated));
    }

    #[tokio::test]
    async fn admin_key_grants_admin_role() {
        let auth = TrustingAuthenticator {
            admin_key: Some("root-key".to_string()),
        };
        let identity = auth
            .authenticate(&Credential {
                api_key: Some("root-key".to_string()),
                bearer: None,
            })
            .await
            .unwrap();
        assert!(identity.is_admin());
    }
}
