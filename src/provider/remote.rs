//! HTTP identity provider.
//!
//! Asks an upstream identity service about the session, forwarding the
//! credential the same way the caller presented it:
//!
//! - `GET  {base}/v1/auth/session`: `200` with an identity body, `204` when
//!   there is no session.
//! - `POST {base}/v1/auth/logout`: any `2xx` ends the session.

use super::{Identity, IdentityProvider, ProviderError};
use crate::{
    APP_USER_AGENT,
    guard::{CredentialSource, SessionCredential},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, header::COOKIE};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const SESSION_ENDPOINT: &str = "v1/auth/session";
const LOGOUT_ENDPOINT: &str = "v1/auth/logout";

#[derive(Debug, Clone)]
pub struct RemoteIdentityProvider {
    client: Client,
    session_url: Url,
    logout_url: Url,
    cookie_name: String,
}

impl RemoteIdentityProvider {
    /// Build a provider rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be joined or the HTTP client cannot be built.
    pub fn new(
        base_url: &Url,
        cookie_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            session_url: endpoint_url(base_url, SESSION_ENDPOINT)?,
            logout_url: endpoint_url(base_url, LOGOUT_ENDPOINT)?,
            cookie_name: cookie_name.into(),
        })
    }

    #[must_use]
    pub fn session_url(&self) -> &Url {
        &self.session_url
    }

    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    fn with_credential(&self, request: RequestBuilder, credential: &SessionCredential) -> RequestBuilder {
        let token = credential.token().expose_secret();
        match credential.source() {
            CredentialSource::Bearer => request.bearer_auth(token),
            CredentialSource::Cookie => {
                request.header(COOKIE, format!("{}={token}", self.cookie_name))
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    #[instrument(skip_all, fields(url = %self.session_url, source = ?credential.source()))]
    async fn verify_session(
        &self,
        credential: &SessionCredential,
    ) -> Result<Option<Identity>, ProviderError> {
        let request = self.with_credential(self.client.get(self.session_url.clone()), credential);
        let response = request.send().await?;
        let status = response.status();

        debug!("identity provider answered {status}");

        match status {
            StatusCode::OK => response
                .json::<Identity>()
                .await
                .map(Some)
                .map_err(|err| ProviderError::InvalidResponse(err.to_string())),
            StatusCode::NO_CONTENT | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                Err(ProviderError::Unavailable(status.to_string()))
            }
            other => Err(ProviderError::UnexpectedStatus(other.as_u16())),
        }
    }

    #[instrument(skip_all, fields(url = %self.logout_url, source = ?credential.source()))]
    async fn end_session(&self, credential: &SessionCredential) -> Result<(), ProviderError> {
        let request = self.with_credential(self.client.post(self.logout_url.clone()), credential);
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(ProviderError::UnexpectedStatus(status.as_u16()))
        }
    }
}

/// Join `endpoint` under the base URL, keeping any path prefix of the base.
fn endpoint_url(base_url: &Url, endpoint: &str) -> Result<Url, ProviderError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(endpoint)
        .map_err(|err| ProviderError::InvalidResponse(format!("invalid endpoint {endpoint}: {err}")))
}
