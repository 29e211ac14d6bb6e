//! # Session Manager
//!
//! Authenticated gateway sessions keyed by credential.
//!
//! A [`Session`] pairs one long-lived credential with the short-lived API
//! token the gateway hands out at authentication time. The manager owns every
//! session, performs the bootstrap `deezer.getUserData` exchange, and routes
//! all gateway calls through [`SessionManager::gateway_call`], which handles
//! token invalidation with a single bounded re-authentication retry.
//!
//! Sessions are never evicted: a credential stays registered for the lifetime
//! of the manager, and its token is refreshed in place whenever the gateway
//! invalidates it.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use core_transport::{HttpClient, HttpRequest};

use crate::error::{Result, SessionError};
use crate::types::{GwEnvelope, UserData};

/// Gateway endpoint every method is POSTed to.
const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";

/// Bootstrap method that validates the credential and yields the API token.
const METHOD_USER_DATA: &str = "deezer.getUserData";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/79.0.3945.130 Safari/537.36";

/// One credential's authenticated gateway session.
#[derive(Debug)]
pub struct Session {
    credential: String,
    /// `None` until the first successful authentication.
    api_token: RwLock<Option<String>>,
}

impl Session {
    fn new(credential: String) -> Self {
        Self {
            credential,
            api_token: RwLock::new(None),
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub async fn is_authenticated(&self) -> bool {
        self.api_token.read().await.is_some()
    }
}

/// Owns all sessions and serializes token refresh per credential.
pub struct SessionManager {
    http: Arc<dyn HttpClient>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a credential and authenticates it right away.
    ///
    /// A rejected credential is not kept, so registration can be retried.
    ///
    /// # Errors
    ///
    /// [`SessionError::DuplicateCredential`] if the credential is already
    /// registered; [`SessionError::BadCredentials`] if the gateway answers
    /// the bootstrap with an anonymous profile.
    pub async fn register(&self, credential: &str) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(credential) {
                return Err(SessionError::DuplicateCredential);
            }
            let session = Arc::new(Session::new(credential.to_string()));
            sessions.insert(credential.to_string(), Arc::clone(&session));
            session
        };

        if let Err(err) = self.authenticate(&session).await {
            self.sessions.write().await.remove(credential);
            return Err(err);
        }
        info!("credential registered");
        Ok(())
    }

    pub async fn has_credential(&self, credential: &str) -> bool {
        self.sessions.read().await.contains_key(credential)
    }

    async fn session(&self, credential: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(credential)
            .cloned()
            .ok_or(SessionError::UnknownCredential)
    }

    /// Calls a gateway method on behalf of a registered credential and
    /// deserializes its `results` payload.
    ///
    /// If the gateway reports an invalidated token, re-authenticates once
    /// and retries the call; a second invalidation is terminal.
    #[instrument(skip(self, body), fields(method = method))]
    pub async fn gateway_call<T: DeserializeOwned>(
        &self,
        credential: &str,
        method: &str,
        body: Value,
    ) -> Result<T> {
        let session = self.session(credential).await?;

        let mut token = match *session.api_token.read().await {
            Some(ref token) => token.clone(),
            None => self.authenticate(&session).await?,
        };

        let mut reauthenticated = false;
        loop {
            let envelope: GwEnvelope<T> =
                self.call_raw(&session, method, &token, body.clone()).await?;

            if envelope.token_invalidated() {
                if reauthenticated {
                    warn!("token invalidated again after re-authentication");
                    return Err(SessionError::TokenInvalidated);
                }
                debug!("token invalidated, re-authenticating once");
                token = self.authenticate(&session).await?;
                reauthenticated = true;
                continue;
            }

            if envelope.has_error() {
                return Err(SessionError::Gateway {
                    method: method.to_string(),
                    message: envelope.error_message(),
                });
            }

            return envelope.results.ok_or_else(|| SessionError::Protocol {
                method: method.to_string(),
                reason: "missing results payload".to_string(),
            });
        }
    }

    /// Performs the bootstrap exchange and stores the fresh API token.
    #[instrument(skip_all)]
    async fn authenticate(&self, session: &Session) -> Result<String> {
        let envelope: GwEnvelope<UserData> = self
            .call_raw(session, METHOD_USER_DATA, "", Value::Object(Default::default()))
            .await?;

        if envelope.has_error() {
            return Err(SessionError::Gateway {
                method: METHOD_USER_DATA.to_string(),
                message: envelope.error_message(),
            });
        }

        let user_data = envelope.results.ok_or_else(|| SessionError::Protocol {
            method: METHOD_USER_DATA.to_string(),
            reason: "missing results payload".to_string(),
        })?;

        // An anonymous profile means the credential was silently rejected.
        if user_data.user.user_id == 0 {
            warn!("gateway answered with anonymous profile");
            return Err(SessionError::BadCredentials);
        }

        let token = user_data.check_form.ok_or_else(|| SessionError::Protocol {
            method: METHOD_USER_DATA.to_string(),
            reason: "missing checkForm token".to_string(),
        })?;

        *session.api_token.write().await = Some(token.clone());
        info!(user_id = user_data.user.user_id, "session authenticated");
        Ok(token)
    }

    async fn call_raw<T: DeserializeOwned>(
        &self,
        session: &Session,
        method: &str,
        api_token: &str,
        body: Value,
    ) -> Result<GwEnvelope<T>> {
        let url = gateway_url(method, api_token);
        let request = HttpRequest::post(url)
            .header("Cookie", format!("arl={}", session.credential))
            .header("User-Agent", USER_AGENT)
            .json(&body)?;

        let response = self.http.execute(request).await?;
        Ok(response.json()?)
    }
}

/// Builds the gateway URL with the per-call cache-busting nonce.
fn gateway_url(method: &str, api_token: &str) -> String {
    let cid: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let query = [
        ("api_version", "1.0"),
        ("api_token", api_token),
        ("input", "3"),
        ("method", method),
        ("cid", &cid.to_string()),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
    .collect::<Vec<_>>()
    .join("&");

    format!("{GATEWAY_URL}?{query}")
}
