//! Firebase over its REST APIs: Identity Toolkit for sign-in, Firestore for
//! the `cues` collection and Cloud Storage for uploads.

mod auth;
mod firestore;
mod storage;
pub mod values;

pub use auth::FirebaseAuth;
pub use firestore::Firestore;
pub use storage::CloudStorage;

use crate::api::{BackendMode, Gateway, GatewayError, GatewayResult};
use crate::config::BackendConfig;
use crate::db::KeyValueStore;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::rc::Rc;
use std::time::Duration;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Firestore REST has no push channel; subscriptions poll at this rate.
pub const POLL_INTERVAL: Duration = Duration::from_secs(4);

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Maps a non-success response to `GatewayError`, keeping the backend's own
/// message so it can be shown to the user verbatim.
async fn check_status(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => (
            if envelope.error.code == 0 {
                status.as_u16()
            } else {
                envelope.error.code
            },
            envelope.error.message,
        ),
        Err(_) => (status.as_u16(), text),
    };
    tracing::debug!(code, %message, "firebase request failed");
    if status.as_u16() == 404 {
        return Err(GatewayError::NotFound(message));
    }
    Err(GatewayError::Status { code, message })
}

#[cfg(target_arch = "wasm32")]
async fn sleep(duration: Duration) {
    gloo_timers::future::TimeoutFuture::new(duration.as_millis() as u32).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

pub struct FirebaseBackend {
    pub auth: FirebaseAuth,
    pub firestore: Firestore,
    pub storage: CloudStorage,
    project_id: String,
}

impl FirebaseBackend {
    pub fn new(config: BackendConfig, kv: Rc<dyn KeyValueStore>) -> Self {
        let project_id = config.project_id.clone();
        let config = Rc::new(config);
        let http = HTTP_CLIENT.clone();
        let auth = FirebaseAuth::new(http.clone(), config.clone(), kv);
        Self {
            firestore: Firestore::new(http.clone(), config.clone(), auth.clone()),
            storage: CloudStorage::new(http, config, auth.clone()),
            auth,
            project_id,
        }
    }

    pub fn into_gateway(self) -> Gateway {
        Gateway {
            identity: Rc::new(self.auth),
            cues: Rc::new(self.firestore),
            blobs: Rc::new(self.storage),
            mode: BackendMode::Firebase {
                project_id: self.project_id,
            },
        }
    }
}
