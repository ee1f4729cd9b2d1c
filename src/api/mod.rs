//! Remote data gateway: identity, cue documents and blob storage behind
//! injectable ports, plus the adapters that implement them.

pub mod firebase;
pub mod memory;
pub mod models;
mod watch;

pub use models::*;
pub use watch::Broadcast;

use crate::config::BackendConfig;
use crate::db::KeyValueStore;
use futures_util::future::LocalBoxFuture;
use futures_util::stream::LocalBoxStream;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("network request failed: {0}")]
    Network(String),
    #[error("backend returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("not signed in: {0}")]
    Unauthenticated(String),
    #[error("cue {0} does not exist")]
    NotFound(String),
    #[error("unexpected response shape: {0}")]
    DataShape(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::DataShape(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Sign-in state. Changes are pushed to every stream returned by
/// `session_changes`, starting with the current value.
pub trait IdentityProvider {
    fn current_session(&self) -> Option<UserSession>;
    fn session_changes(&self) -> LocalBoxStream<'static, Option<UserSession>>;
    fn sign_in(&self, credentials: Credentials) -> LocalBoxFuture<'_, GatewayResult<UserSession>>;
    fn sign_out(&self) -> LocalBoxFuture<'_, GatewayResult<()>>;
}

/// The `cues` document collection.
pub trait CueStore {
    /// Live subscription ordered by `created_at` descending. Every item is
    /// the complete matching set; dropping the stream cancels it.
    fn subscribe(&self) -> LocalBoxStream<'static, Vec<Cue>>;
    fn get<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, GatewayResult<Cue>>;
    fn create(&self, cue: NewCue) -> LocalBoxFuture<'_, GatewayResult<String>>;
    fn update<'a>(&'a self, id: &'a str, update: CueUpdate)
        -> LocalBoxFuture<'a, GatewayResult<()>>;
    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, GatewayResult<()>>;
    /// Server-side array union on the comment sequence.
    fn append_comment<'a>(
        &'a self,
        cue_id: &'a str,
        comment: Comment,
    ) -> LocalBoxFuture<'a, GatewayResult<()>>;
    /// Overwrites the whole comment sequence.
    fn replace_comments<'a>(
        &'a self,
        cue_id: &'a str,
        comments: Vec<Comment>,
    ) -> LocalBoxFuture<'a, GatewayResult<()>>;
}

pub trait BlobStore {
    /// Uploads `file` under `path` and returns a publicly fetchable URL.
    fn upload<'a>(&'a self, path: &'a str, file: FileUpload)
        -> LocalBoxFuture<'a, GatewayResult<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMode {
    Firebase { project_id: String },
    Demo,
}

/// Client context created once at startup and handed to the controller and
/// widget layers.
#[derive(Clone)]
pub struct Gateway {
    pub identity: Rc<dyn IdentityProvider>,
    pub cues: Rc<dyn CueStore>,
    pub blobs: Rc<dyn BlobStore>,
    pub mode: BackendMode,
}

impl Gateway {
    /// Connects to Firebase when a complete backend config is available,
    /// otherwise falls back to the in-memory demo backend.
    pub fn connect(config: Option<BackendConfig>, kv: Rc<dyn KeyValueStore>) -> Self {
        match config {
            Some(config) => {
                tracing::info!(project = %config.project_id, "using firebase backend");
                firebase::FirebaseBackend::new(config, kv).into_gateway()
            }
            None => {
                tracing::info!("no backend configured, using demo backend");
                memory::MemoryBackend::demo().into_gateway()
            }
        }
    }

    pub fn is_demo(&self) -> bool {
        self.mode == BackendMode::Demo
    }
}
