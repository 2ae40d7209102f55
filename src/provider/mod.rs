//! Identity provider seam.
//!
//! The guard never inspects credentials itself: it hands them to an
//! [`IdentityProvider`] and only looks at whether an [`Identity`] came back.

pub mod remote;

pub use self::remote::RemoteIdentityProvider;

use crate::guard::SessionCredential;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Caller identity confirmed by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub is_operator: bool,
}

/// Failures talking to the identity provider.
///
/// The guard folds every variant into a single "not authenticated" outcome;
/// the variants only exist for logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("identity provider returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Verifies and ends sessions on behalf of the guard.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a credential into an identity.
    ///
    /// Returns `Ok(None)` when the provider answered but the session is not
    /// valid (missing, expired, revoked).
    ///
    /// # Errors
    /// Returns an error when the provider could not give an answer.
    async fn verify_session(
        &self,
        credential: &SessionCredential,
    ) -> Result<Option<Identity>, ProviderError>;

    /// End the session behind a credential.
    ///
    /// # Errors
    /// Returns an error when the provider could not be reached or refused.
    async fn end_session(&self, credential: &SessionCredential) -> Result<(), ProviderError>;
}
