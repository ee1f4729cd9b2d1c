use super::check_status;
use crate::api::models::{Credentials, UserSession};
use crate::api::{Broadcast, GatewayError, GatewayResult, IdentityProvider};
use crate::config::BackendConfig;
use crate::db::{load_json, save_json, KeyValueStore};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::LocalBoxFuture;
use futures_util::stream::LocalBoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_BASE: &str = "https://securetoken.googleapis.com/v1";
const SESSION_KEY: &str = "cuedesk.session";
/// Refresh this long before the token actually expires.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

fn expiry(expires_in: &str, now: DateTime<Utc>) -> GatewayResult<DateTime<Utc>> {
    let secs = expires_in
        .trim()
        .parse::<i64>()
        .map_err(|_| GatewayError::DataShape(format!("bad expiresIn `{expires_in}`")))?;
    Ok(now + Duration::seconds(secs - EXPIRY_SKEW_SECS))
}

fn session_from_sign_in(
    response: SignInResponse,
    now: DateTime<Utc>,
) -> GatewayResult<UserSession> {
    Ok(UserSession {
        expires_at: expiry(&response.expires_in, now)?,
        uid: response.local_id,
        display_name: response.display_name.filter(|name| !name.trim().is_empty()),
        email: response.email,
        id_token: response.id_token,
        refresh_token: response.refresh_token,
    })
}

struct AuthInner {
    http: reqwest::Client,
    config: Rc<BackendConfig>,
    kv: Rc<dyn KeyValueStore>,
    session: RefCell<Option<UserSession>>,
    changes: Broadcast<Option<UserSession>>,
}

/// Email/password identity with the session persisted locally.
#[derive(Clone)]
pub struct FirebaseAuth {
    inner: Rc<AuthInner>,
}

impl FirebaseAuth {
    pub fn new(
        http: reqwest::Client,
        config: Rc<BackendConfig>,
        kv: Rc<dyn KeyValueStore>,
    ) -> Self {
        let session = load_json::<UserSession>(kv.as_ref(), SESSION_KEY);
        if let Some(session) = &session {
            tracing::debug!(uid = %session.uid, "restored saved session");
        }
        Self {
            inner: Rc::new(AuthInner {
                http,
                config,
                kv,
                session: RefCell::new(session),
                changes: Broadcast::new(),
            }),
        }
    }

    fn store(&self, session: Option<UserSession>) {
        let saved = match &session {
            Some(session) => save_json(self.inner.kv.as_ref(), SESSION_KEY, session),
            None => self.inner.kv.remove(SESSION_KEY),
        };
        if let Err(err) = saved {
            tracing::warn!(%err, "session will not survive a reload");
        }
        *self.inner.session.borrow_mut() = session.clone();
        self.inner.changes.send(session);
    }

    /// A valid ID token for the signed-in user, refreshing it when expired.
    /// `None` when nobody is signed in.
    pub async fn id_token(&self) -> GatewayResult<Option<String>> {
        let Some(session) = self.inner.session.borrow().clone() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session.id_token));
        }
        let refreshed = self.refresh(&session).await?;
        Ok(Some(refreshed.id_token))
    }

    /// Like `id_token`, but signing in is mandatory.
    pub async fn require_token(&self) -> GatewayResult<String> {
        self.id_token()
            .await?
            .ok_or_else(|| GatewayError::Unauthenticated("sign in first".to_string()))
    }

    async fn refresh(&self, session: &UserSession) -> GatewayResult<UserSession> {
        tracing::debug!(uid = %session.uid, "refreshing id token");
        let url = format!("{SECURE_TOKEN_BASE}/token");
        let response = self
            .inner
            .http
            .post(&url)
            .query(&[("key", self.inner.config.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;
        let response = match check_status(response).await {
            Ok(response) => response,
            Err(GatewayError::Status { code: 400, message }) => {
                tracing::warn!(%message, "refresh token rejected, signing out");
                self.store(None);
                return Err(GatewayError::Unauthenticated(message));
            }
            Err(err) => return Err(err),
        };
        let body: RefreshResponse = response.json().await?;
        let refreshed = UserSession {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry(&body.expires_in, Utc::now())?,
            ..session.clone()
        };
        self.store(Some(refreshed.clone()));
        Ok(refreshed)
    }
}

impl IdentityProvider for FirebaseAuth {
    fn current_session(&self) -> Option<UserSession> {
        self.inner.session.borrow().clone()
    }

    fn session_changes(&self) -> LocalBoxStream<'static, Option<UserSession>> {
        self.inner
            .changes
            .subscribe(self.current_session())
            .boxed_local()
    }

    fn sign_in(&self, credentials: Credentials) -> LocalBoxFuture<'_, GatewayResult<UserSession>> {
        Box::pin(async move {
            let url = format!("{IDENTITY_TOOLKIT_BASE}/accounts:signInWithPassword");
            let response = self
                .inner
                .http
                .post(&url)
                .query(&[("key", self.inner.config.api_key.as_str())])
                .json(&SignInRequest {
                    email: credentials.email.trim(),
                    password: &credentials.password,
                    return_secure_token: true,
                })
                .send()
                .await?;
            let response = match check_status(response).await {
                Ok(response) => response,
                Err(GatewayError::Status { code: 400, message }) => {
                    return Err(GatewayError::Unauthenticated(message));
                }
                Err(err) => return Err(err),
            };
            let body: SignInResponse = response.json().await?;
            let session = session_from_sign_in(body, Utc::now())?;
            tracing::info!(uid = %session.uid, "signed in");
            self.store(Some(session.clone()));
            Ok(session)
        })
    }

    fn sign_out(&self) -> LocalBoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.store(None);
            tracing::info!("signed out");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKv;
    use chrono::TimeZone;

    fn auth(kv: Rc<MemoryKv>) -> FirebaseAuth {
        FirebaseAuth::new(
            reqwest::Client::new(),
            Rc::new(BackendConfig::new("k", "p", "b")),
            kv,
        )
    }

    #[test]
    fn sign_in_response_becomes_a_session() {
        let body: SignInResponse = serde_json::from_value(serde_json::json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "u1",
            "email": "ada@example.com",
            "displayName": "",
            "idToken": "id",
            "refreshToken": "refresh",
            "expiresIn": "3600",
            "registered": true
        }))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let session = session_from_sign_in(body, now).unwrap();
        assert_eq!(session.uid, "u1");
        assert_eq!(session.display_name, None);
        assert_eq!(session.author_label(), "ada@example.com");
        assert_eq!(session.expires_at, now + Duration::seconds(3600 - EXPIRY_SKEW_SECS));
    }

    #[test]
    fn sessions_survive_a_restart() {
        let kv = Rc::new(MemoryKv::new());
        let first = auth(kv.clone());
        let session = UserSession {
            uid: "u1".to_string(),
            display_name: Some("Ada".to_string()),
            email: None,
            id_token: "id".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        first.store(Some(session.clone()));

        let second = auth(kv.clone());
        assert_eq!(second.current_session(), Some(session));

        second.store(None);
        assert_eq!(auth(kv).current_session(), None);
    }

    #[tokio::test]
    async fn fresh_tokens_are_used_without_a_request() {
        let kv = Rc::new(MemoryKv::new());
        let auth = auth(kv);
        assert_eq!(auth.id_token().await, Ok(None));
        assert!(matches!(
            auth.require_token().await,
            Err(GatewayError::Unauthenticated(_))
        ));

        auth.store(Some(UserSession {
            uid: "u1".to_string(),
            display_name: None,
            email: None,
            id_token: "still-good".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        }));
        assert_eq!(auth.id_token().await, Ok(Some("still-good".to_string())));
    }
}
