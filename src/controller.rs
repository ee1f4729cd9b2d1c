//! Cue and comment mutations: validation, upload orchestration and the
//! gateway calls behind the dashboard's forms.
//!
//! Nothing here touches the local cue list. The next subscription push is
//! the only thing that updates what the user sees.

use crate::api::*;
use crate::db::CommentWriteMode;
use crate::utils::object_file_name;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Give the cue a title.")]
    MissingTitle,
    #[error("Choose an audio file.")]
    MissingAudio,
    #[error("Choose a sheet music PDF.")]
    MissingSheetMusic,
    #[error("Write something before posting.")]
    EmptyComment,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Sign in to make changes.")]
    NotSignedIn,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Add/edit form contents. For edits, `None` files keep the stored URLs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CueForm {
    pub title: String,
    pub play: Production,
    pub audio: Option<FileUpload>,
    pub pdf: Option<FileUpload>,
}

/// `<folder>/<millis>-<original name>`
pub fn object_path(purpose: UploadPurpose, now: DateTime<Utc>, file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        purpose.folder(),
        now.timestamp_millis(),
        object_file_name(file_name)
    )
}

/// Every comment except `comment_id`, in their original order.
pub fn without_comment(comments: &[Comment], comment_id: &str) -> Vec<Comment> {
    comments
        .iter()
        .filter(|comment| comment.id != comment_id)
        .cloned()
        .collect()
}

fn validated_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    Ok(title.to_string())
}

#[derive(Clone)]
pub struct CueController {
    gateway: Gateway,
    comment_mode: CommentWriteMode,
}

impl CueController {
    pub fn new(gateway: Gateway, comment_mode: CommentWriteMode) -> Self {
        Self {
            gateway,
            comment_mode,
        }
    }

    fn require_session(&self) -> Result<UserSession, DashboardError> {
        self.gateway
            .identity
            .current_session()
            .ok_or(DashboardError::NotSignedIn)
    }

    async fn upload(
        &self,
        purpose: UploadPurpose,
        file: FileUpload,
        now: DateTime<Utc>,
    ) -> Result<String, DashboardError> {
        let path = object_path(purpose, now, &file.name);
        tracing::debug!(%path, bytes = file.bytes.len(), "uploading");
        Ok(self.gateway.blobs.upload(&path, file).await?)
    }

    pub async fn add_cue(&self, form: CueForm) -> Result<String, DashboardError> {
        self.add_cue_at(form, Utc::now()).await
    }

    /// Uploads both files, then creates the document. A failure part way
    /// leaves earlier uploads in place.
    pub async fn add_cue_at(
        &self,
        form: CueForm,
        now: DateTime<Utc>,
    ) -> Result<String, DashboardError> {
        let title = validated_title(&form.title)?;
        let audio = form.audio.ok_or(ValidationError::MissingAudio)?;
        let pdf = form.pdf.ok_or(ValidationError::MissingSheetMusic)?;
        self.require_session()?;

        let audio_url = self.upload(UploadPurpose::Audio, audio, now).await?;
        let pdf_url = self.upload(UploadPurpose::SheetMusic, pdf, now).await?;
        let id = self
            .gateway
            .cues
            .create(NewCue {
                title,
                play: form.play,
                audio_url,
                pdf_url,
                created_at: now,
            })
            .await?;
        tracing::info!(%id, "cue added");
        Ok(id)
    }

    /// Title and production are always written; URLs only for the slots a
    /// new file was picked for. Replaced blobs stay in storage.
    pub async fn edit_cue(&self, id: &str, form: CueForm) -> Result<(), DashboardError> {
        let title = validated_title(&form.title)?;
        self.require_session()?;

        let now = Utc::now();
        let audio_url = match form.audio {
            Some(file) => Some(self.upload(UploadPurpose::Audio, file, now).await?),
            None => None,
        };
        let pdf_url = match form.pdf {
            Some(file) => Some(self.upload(UploadPurpose::SheetMusic, file, now).await?),
            None => None,
        };
        self.gateway
            .cues
            .update(
                id,
                CueUpdate {
                    title,
                    play: form.play,
                    audio_url,
                    pdf_url,
                },
            )
            .await?;
        tracing::info!(%id, "cue edited");
        Ok(())
    }

    /// Deletes the document only; its audio and PDF stay in storage.
    /// Returns whether anything was deleted.
    pub async fn delete_cue(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<bool, DashboardError> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }
        self.require_session()?;
        self.gateway.cues.delete(id).await?;
        tracing::info!(%id, "cue deleted");
        Ok(true)
    }

    pub async fn add_comment(&self, cue_id: &str, text: &str) -> Result<Comment, DashboardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }
        let author = self.require_session()?;
        let comment = Comment::new(text, &author, Utc::now());

        match self.comment_mode {
            CommentWriteMode::AtomicAppend => {
                self.gateway
                    .cues
                    .append_comment(cue_id, comment.clone())
                    .await?;
            }
            CommentWriteMode::ReadModifyWrite => {
                let mut comments = self.gateway.cues.get(cue_id).await?.comments;
                comments.push(comment.clone());
                self.gateway.cues.replace_comments(cue_id, comments).await?;
            }
        }
        tracing::debug!(%cue_id, comment = %comment.id, "comment posted");
        Ok(comment)
    }

    /// Removes one comment by id and rewrites the remaining sequence.
    /// Returns whether the comment was found.
    pub async fn delete_comment(
        &self,
        cue_id: &str,
        comment_id: &str,
        confirmation: Confirmation,
    ) -> Result<bool, DashboardError> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }
        self.require_session()?;
        let comments = self.gateway.cues.get(cue_id).await?.comments;
        let remaining = without_comment(&comments, comment_id);
        if remaining.len() == comments.len() {
            return Ok(false);
        }
        self.gateway
            .cues
            .replace_comments(cue_id, remaining)
            .await?;
        tracing::debug!(%cue_id, %comment_id, "comment deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;
    use base64::Engine;
    use chrono::TimeZone;
    use futures_util::StreamExt;

    fn audio() -> FileUpload {
        FileUpload::new("storm.mp3", "audio/mpeg", vec![7, 7, 7])
    }

    fn pdf() -> FileUpload {
        FileUpload::new("storm.pdf", "application/pdf", vec![1])
    }

    fn full_form() -> CueForm {
        CueForm {
            title: "  Storm  ".to_string(),
            play: Production::AntonyAndCleopatra,
            audio: Some(audio()),
            pdf: Some(pdf()),
        }
    }

    async fn signed_in(backend: &MemoryBackend, mode: CommentWriteMode) -> CueController {
        backend
            .sign_in(Credentials {
                email: "ada@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();
        CueController::new(backend.clone().into_gateway(), mode)
    }

    fn data_url(file: &FileUpload) -> String {
        format!(
            "data:{};base64,{}",
            file.content_type,
            base64::engine::general_purpose::STANDARD.encode(&file.bytes)
        )
    }

    #[test]
    fn object_paths_are_folder_and_millis_prefixed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(
            object_path(UploadPurpose::SheetMusic, now, "Act I/storm.pdf"),
            format!("sheetmusic/{}-storm.pdf", now.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn added_cue_arrives_in_the_next_push_with_no_comments() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::AtomicAppend).await;
        let mut snapshots = backend.subscribe();
        assert_eq!(snapshots.next().await, Some(Vec::new()));

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let id = controller.add_cue_at(full_form(), now).await.unwrap();

        let pushed = snapshots.next().await.unwrap();
        assert_eq!(pushed.len(), 1);
        let cue = &pushed[0];
        assert_eq!(cue.id, id);
        assert_eq!(cue.title, "Storm");
        assert_eq!(cue.play, Production::AntonyAndCleopatra);
        assert_eq!(cue.created_at, now);
        assert!(cue.comments.is_empty());
        assert_eq!(cue.audio_url, data_url(&audio()));

        let millis = now.timestamp_millis();
        assert!(backend.blob(&format!("audio/{millis}-storm.mp3")).is_some());
        assert!(backend.blob(&format!("sheetmusic/{millis}-storm.pdf")).is_some());
    }

    #[tokio::test]
    async fn incomplete_forms_touch_nothing() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::AtomicAppend).await;

        let cases = [
            (
                CueForm {
                    title: " ".to_string(),
                    ..full_form()
                },
                ValidationError::MissingTitle,
            ),
            (
                CueForm {
                    audio: None,
                    ..full_form()
                },
                ValidationError::MissingAudio,
            ),
            (
                CueForm {
                    pdf: None,
                    ..full_form()
                },
                ValidationError::MissingSheetMusic,
            ),
        ];
        for (form, expected) in cases {
            assert_eq!(
                controller.add_cue(form).await,
                Err(DashboardError::Validation(expected))
            );
        }
        assert_eq!(backend.upload_count(), 0);
        assert_eq!(backend.cue_count(), 0);
    }

    #[tokio::test]
    async fn writes_require_a_session() {
        let backend = MemoryBackend::new();
        let controller = CueController::new(
            backend.clone().into_gateway(),
            CommentWriteMode::AtomicAppend,
        );
        assert_eq!(
            controller.add_cue(full_form()).await,
            Err(DashboardError::NotSignedIn)
        );
        assert_eq!(backend.upload_count(), 0);
    }

    #[tokio::test]
    async fn editing_replaces_only_supplied_files() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::AtomicAppend).await;
        let id = controller.add_cue(full_form()).await.unwrap();
        let original = backend.get(&id).await.unwrap();

        controller
            .edit_cue(
                &id,
                CueForm {
                    title: "Storm (revised)".to_string(),
                    play: Production::Both,
                    audio: None,
                    pdf: None,
                },
            )
            .await
            .unwrap();
        let edited = backend.get(&id).await.unwrap();
        assert_eq!(edited.title, "Storm (revised)");
        assert_eq!(edited.play, Production::Both);
        assert_eq!(edited.audio_url, original.audio_url);
        assert_eq!(edited.pdf_url, original.pdf_url);
        assert_eq!(edited.created_at, original.created_at);

        let new_audio = FileUpload::new("storm-v2.ogg", "audio/ogg", vec![9, 9]);
        controller
            .edit_cue(
                &id,
                CueForm {
                    title: "Storm (revised)".to_string(),
                    play: Production::Both,
                    audio: Some(new_audio.clone()),
                    pdf: None,
                },
            )
            .await
            .unwrap();
        let replaced = backend.get(&id).await.unwrap();
        assert_eq!(replaced.audio_url, data_url(&new_audio));
        assert_eq!(replaced.pdf_url, original.pdf_url);
        assert_eq!(backend.upload_count(), 3);
    }

    #[tokio::test]
    async fn delete_needs_confirmation() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::AtomicAppend).await;
        let id = controller.add_cue(full_form()).await.unwrap();

        assert_eq!(controller.delete_cue(&id, Confirmation::Declined).await, Ok(false));
        assert_eq!(backend.cue_count(), 1);
        assert_eq!(controller.delete_cue(&id, Confirmation::Confirmed).await, Ok(true));
        assert_eq!(backend.cue_count(), 0);
        // blobs are left behind
        assert_eq!(backend.upload_count(), 2);
    }

    #[tokio::test]
    async fn blank_comments_are_rejected() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::AtomicAppend).await;
        let id = controller.add_cue(full_form()).await.unwrap();
        assert_eq!(
            controller.add_comment(&id, "   ").await,
            Err(DashboardError::Validation(ValidationError::EmptyComment))
        );
        assert!(backend.get(&id).await.unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn deleting_a_comment_keeps_the_rest_in_order() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::ReadModifyWrite).await;
        let id = controller.add_cue(full_form()).await.unwrap();

        let first = controller.add_comment(&id, "first").await.unwrap();
        let second = controller.add_comment(&id, "second").await.unwrap();
        let third = controller.add_comment(&id, "third").await.unwrap();
        assert_eq!(first.username, "ada");

        assert_eq!(
            controller
                .delete_comment(&id, &second.id, Confirmation::Declined)
                .await,
            Ok(false)
        );
        assert_eq!(
            controller
                .delete_comment(&id, &second.id, Confirmation::Confirmed)
                .await,
            Ok(true)
        );
        assert_eq!(backend.get(&id).await.unwrap().comments, vec![first, third]);
        assert_eq!(
            controller
                .delete_comment(&id, &second.id, Confirmation::Confirmed)
                .await,
            Ok(false)
        );
    }

    #[tokio::test]
    async fn interleaved_read_modify_write_loses_a_comment() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::ReadModifyWrite).await;
        let id = controller.add_cue(full_form()).await.unwrap();
        backend.clone().with_latency(true);

        let (a, b) = futures_util::future::join(
            controller.add_comment(&id, "from client a"),
            controller.add_comment(&id, "from client b"),
        )
        .await;
        a.unwrap();
        b.unwrap();
        assert_eq!(backend.get(&id).await.unwrap().comments.len(), 1);
    }

    #[tokio::test]
    async fn interleaved_atomic_appends_keep_both_comments() {
        let backend = MemoryBackend::new();
        let controller = signed_in(&backend, CommentWriteMode::AtomicAppend).await;
        let id = controller.add_cue(full_form()).await.unwrap();
        backend.clone().with_latency(true);

        let (a, b) = futures_util::future::join(
            controller.add_comment(&id, "from client a"),
            controller.add_comment(&id, "from client b"),
        )
        .await;
        let comments = backend.get(&id).await.unwrap().comments;
        assert_eq!(comments.len(), 2);
        assert!(comments.contains(&a.unwrap()));
        assert!(comments.contains(&b.unwrap()));
    }
}
