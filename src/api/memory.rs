//! In-process backend with real push subscriptions. Runs the demo mode and
//! stands in for Firebase in tests.

use super::*;
use crate::utils::slugify;
use base64::Engine;
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Default)]
struct State {
    cues: RefCell<HashMap<String, Cue>>,
    blobs: RefCell<HashMap<String, FileUpload>>,
    session: RefCell<Option<UserSession>>,
    next_id: Cell<u64>,
    /// Suspend once before every operation so concurrent calls interleave.
    #[cfg(test)]
    latency: Cell<bool>,
    snapshots: Broadcast<Vec<Cue>>,
    sessions: Broadcast<Option<UserSession>>,
    uploads: Cell<usize>,
}

impl State {
    async fn round_trip(&self) {
        #[cfg(test)]
        if self.latency.get() {
            tokio::task::yield_now().await;
        }
    }

    fn snapshot(&self) -> Vec<Cue> {
        let mut cues: Vec<Cue> = self.cues.borrow().values().cloned().collect();
        cues.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        cues
    }

    fn publish(&self) {
        self.snapshots.send(self.snapshot());
    }

    fn with_cue<T>(&self, id: &str, f: impl FnOnce(&mut Cue) -> T) -> GatewayResult<T> {
        let result = {
            let mut cues = self.cues.borrow_mut();
            let cue = cues
                .get_mut(id)
                .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
            f(cue)
        };
        self.publish();
        Ok(result)
    }
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Rc<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend used when no Firebase project is configured.
    pub fn demo() -> Self {
        let backend = Self::new();
        tracing::debug!("demo backend ready; any email and password signs in");
        backend
    }

    #[cfg(test)]
    pub fn with_latency(self, latency: bool) -> Self {
        self.state.latency.set(latency);
        self
    }

    pub fn into_gateway(self) -> Gateway {
        Gateway {
            identity: Rc::new(self.clone()),
            cues: Rc::new(self.clone()),
            blobs: Rc::new(self),
            mode: BackendMode::Demo,
        }
    }

    #[cfg(test)]
    pub fn upload_count(&self) -> usize {
        self.state.uploads.get()
    }

    #[cfg(test)]
    pub fn cue_count(&self) -> usize {
        self.state.cues.borrow().len()
    }

    #[cfg(test)]
    pub fn blob(&self, path: &str) -> Option<FileUpload> {
        self.state.blobs.borrow().get(path).cloned()
    }
}

impl IdentityProvider for MemoryBackend {
    fn current_session(&self) -> Option<UserSession> {
        self.state.session.borrow().clone()
    }

    fn session_changes(&self) -> LocalBoxStream<'static, Option<UserSession>> {
        self.state
            .sessions
            .subscribe(self.current_session())
            .boxed_local()
    }

    fn sign_in(&self, credentials: Credentials) -> LocalBoxFuture<'_, GatewayResult<UserSession>> {
        Box::pin(async move {
            self.state.round_trip().await;
            let email = credentials.email.trim().to_string();
            if email.is_empty() || credentials.password.is_empty() {
                return Err(GatewayError::Unauthenticated(
                    "INVALID_LOGIN_CREDENTIALS".to_string(),
                ));
            }
            let display_name = email.split('@').next().map(str::to_string);
            let session = UserSession {
                uid: format!("demo-{}", slugify(&email)),
                display_name,
                email: Some(email),
                id_token: String::new(),
                refresh_token: String::new(),
                expires_at: Utc::now() + Duration::days(365),
            };
            *self.state.session.borrow_mut() = Some(session.clone());
            self.state.sessions.send(Some(session.clone()));
            Ok(session)
        })
    }

    fn sign_out(&self) -> LocalBoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.state.session.borrow_mut().take();
            self.state.sessions.send(None);
            Ok(())
        })
    }
}

impl CueStore for MemoryBackend {
    fn subscribe(&self) -> LocalBoxStream<'static, Vec<Cue>> {
        self.state
            .snapshots
            .subscribe(self.state.snapshot())
            .boxed_local()
    }

    fn get<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, GatewayResult<Cue>> {
        Box::pin(async move {
            self.state.round_trip().await;
            self.state
                .cues
                .borrow()
                .get(id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound(id.to_string()))
        })
    }

    fn create(&self, cue: NewCue) -> LocalBoxFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            self.state.round_trip().await;
            let next = self.state.next_id.get() + 1;
            self.state.next_id.set(next);
            let id = format!("cue-{next:04}");
            self.state
                .cues
                .borrow_mut()
                .insert(id.clone(), cue.into_cue(id.clone()));
            self.state.publish();
            Ok(id)
        })
    }

    fn update<'a>(
        &'a self,
        id: &'a str,
        update: CueUpdate,
    ) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.state.round_trip().await;
            self.state.with_cue(id, |cue| update.apply_to(cue))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.state.round_trip().await;
            let removed = self.state.cues.borrow_mut().remove(id);
            if removed.is_none() {
                return Err(GatewayError::NotFound(id.to_string()));
            }
            self.state.publish();
            Ok(())
        })
    }

    fn append_comment<'a>(
        &'a self,
        cue_id: &'a str,
        comment: Comment,
    ) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.state.round_trip().await;
            self.state.with_cue(cue_id, |cue| {
                if !cue.comments.contains(&comment) {
                    cue.comments.push(comment);
                }
            })
        })
    }

    fn replace_comments<'a>(
        &'a self,
        cue_id: &'a str,
        comments: Vec<Comment>,
    ) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.state.round_trip().await;
            self.state.with_cue(cue_id, |cue| cue.comments = comments)
        })
    }
}

impl BlobStore for MemoryBackend {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        file: FileUpload,
    ) -> LocalBoxFuture<'a, GatewayResult<String>> {
        Box::pin(async move {
            self.state.round_trip().await;
            // Data URLs keep uploaded audio playable without any server.
            let url = format!(
                "data:{};base64,{}",
                file.content_type,
                base64::engine::general_purpose::STANDARD.encode(&file.bytes)
            );
            self.state.blobs.borrow_mut().insert(path.to_string(), file);
            self.state.uploads.set(self.state.uploads.get() + 1);
            Ok(url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_cue(title: &str, minute: u32) -> NewCue {
        use chrono::TimeZone;
        NewCue {
            title: title.to_string(),
            play: Production::JuliusCaesar,
            audio_url: "a".to_string(),
            pdf_url: "p".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 20, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn subscription_pushes_full_snapshots_newest_first() {
        let backend = MemoryBackend::new();
        let mut stream = backend.subscribe();
        assert_eq!(stream.next().await, Some(Vec::new()));

        backend.create(new_cue("early", 1)).await.unwrap();
        backend.create(new_cue("late", 30)).await.unwrap();

        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 1);
        let second = stream.next().await.unwrap();
        let titles: Vec<_> = second.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["late", "early"]);
    }

    #[tokio::test]
    async fn missing_cues_are_reported() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.delete("nope").await,
            Err(GatewayError::NotFound("nope".to_string()))
        );
        assert!(backend.get("nope").await.is_err());
    }

    #[tokio::test]
    async fn session_changes_are_pushed() {
        let backend = MemoryBackend::new();
        let mut changes = backend.session_changes();
        assert_eq!(changes.next().await, Some(None));

        let session = backend
            .sign_in(Credentials {
                email: "ada@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.uid, "demo-ada-example-com");
        assert_eq!(session.author_label(), "ada");
        assert_eq!(changes.next().await, Some(Some(session)));

        backend.sign_out().await.unwrap();
        assert_eq!(changes.next().await, Some(None));
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected() {
        let backend = MemoryBackend::new();
        let result = backend
            .sign_in(Credentials {
                email: " ".to_string(),
                password: "pw".to_string(),
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Unauthenticated(_))));
        assert_eq!(backend.current_session(), None);
    }

    #[tokio::test]
    async fn uploads_become_data_urls() {
        let backend = MemoryBackend::new();
        let url = backend
            .upload("audio/1-a.mp3", FileUpload::new("a.mp3", "audio/mpeg", vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(url, "data:audio/mpeg;base64,AQID");
        assert_eq!(backend.blob("audio/1-a.mp3").unwrap().bytes, vec![1, 2, 3]);
    }
}
