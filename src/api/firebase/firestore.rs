use super::values::{self, Document, Fields};
use super::{check_status, sleep, FirebaseAuth, POLL_INTERVAL};
use crate::api::models::{Comment, Cue, CueUpdate, NewCue};
use crate::api::{CueStore, GatewayError, GatewayResult};
use crate::config::BackendConfig;
use futures_util::future::LocalBoxFuture;
use futures_util::stream::{self, LocalBoxStream};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::rc::Rc;
use std::time::Duration;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const COLLECTION: &str = "cues";

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

/// Decodes a `runQuery` response, skipping documents that do not look like
/// cues rather than failing the whole snapshot.
fn decode_query(items: Vec<RunQueryItem>) -> Vec<Cue> {
    items
        .into_iter()
        .filter_map(|item| item.document)
        .filter_map(|document| match values::decode_cue(&document) {
            Ok(cue) => Some(cue),
            Err(err) => {
                tracing::warn!(name = %document.name, %err, "skipping malformed cue");
                None
            }
        })
        .collect()
}

/// Repeatedly calls `fetch`, yielding a snapshot only when it differs from
/// the last one yielded. Failed polls are logged and skipped.
fn poll_snapshots<F>(fetch: F, interval: Duration) -> LocalBoxStream<'static, Vec<Cue>>
where
    F: FnMut() -> LocalBoxFuture<'static, GatewayResult<Vec<Cue>>> + 'static,
{
    stream::unfold((fetch, None::<Vec<Cue>>), move |(mut fetch, last)| async move {
        loop {
            if last.is_some() {
                sleep(interval).await;
            }
            match fetch().await {
                Ok(cues) if last.as_ref() != Some(&cues) => {
                    return Some((cues.clone(), (fetch, Some(cues))));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%err, "cue poll failed");
                    if last.is_none() {
                        // back off before retrying the first load
                        sleep(interval).await;
                    }
                }
            }
        }
    })
    .boxed_local()
}

#[derive(Clone)]
pub struct Firestore {
    http: reqwest::Client,
    config: Rc<BackendConfig>,
    auth: FirebaseAuth,
}

impl Firestore {
    pub fn new(http: reqwest::Client, config: Rc<BackendConfig>, auth: FirebaseAuth) -> Self {
        Self {
            http,
            config,
            auth,
        }
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.config.project_id)
    }

    fn documents_url(&self) -> String {
        format!("{FIRESTORE_BASE}/{}", self.database_path())
    }

    fn cue_name(&self, id: &str) -> String {
        format!("{}/{COLLECTION}/{id}", self.database_path())
    }

    fn cue_url(&self, id: &str) -> String {
        format!(
            "{}/{COLLECTION}/{}",
            self.documents_url(),
            urlencoding::encode(id)
        )
    }

    /// Adds the API key and, when signed in, the bearer token.
    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> GatewayResult<reqwest::RequestBuilder> {
        let request = request.query(&[("key", self.config.api_key.as_str())]);
        Ok(match self.auth.id_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    pub async fn list_cues(&self) -> GatewayResult<Vec<Cue>> {
        let body = json!({
            "structuredQuery": {
                "from": [{"collectionId": COLLECTION}],
                "orderBy": [{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}]
            }
        });
        let request = self
            .http
            .post(format!("{}:runQuery", self.documents_url()))
            .json(&body);
        let response = self.authorize(request).await?.send().await?;
        let items: Vec<RunQueryItem> = check_status(response).await?.json().await?;
        Ok(decode_query(items))
    }

    async fn patch(&self, id: &str, fields: Fields, mask: &[&str]) -> GatewayResult<()> {
        let mut params: Vec<(&str, &str)> = mask
            .iter()
            .map(|field| ("updateMask.fieldPaths", *field))
            .collect();
        params.push(("currentDocument.exists", "true"));
        let request = self
            .http
            .patch(self.cue_url(id))
            .query(&params)
            .json(&Document {
                name: String::new(),
                fields,
            });
        let response = self.authorize(request).await?.send().await?;
        check_status(response).await?;
        Ok(())
    }
}

impl CueStore for Firestore {
    fn subscribe(&self) -> LocalBoxStream<'static, Vec<Cue>> {
        let this = self.clone();
        poll_snapshots(
            move || {
                let this = this.clone();
                Box::pin(async move { this.list_cues().await })
            },
            POLL_INTERVAL,
        )
    }

    fn get<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, GatewayResult<Cue>> {
        Box::pin(async move {
            let request = self.http.get(self.cue_url(id));
            let response = self.authorize(request).await?.send().await?;
            let document: Document = match check_status(response).await {
                Ok(response) => response.json().await?,
                Err(GatewayError::NotFound(_)) => {
                    return Err(GatewayError::NotFound(id.to_string()));
                }
                Err(err) => return Err(err),
            };
            values::decode_cue(&document)
        })
    }

    fn create(&self, cue: NewCue) -> LocalBoxFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            let request = self
                .http
                .post(format!("{}/{COLLECTION}", self.documents_url()))
                .json(&Document {
                    name: String::new(),
                    fields: values::new_cue_fields(&cue),
                });
            let response = self.authorize(request).await?.send().await?;
            let document: Document = check_status(response).await?.json().await?;
            tracing::debug!(id = %document.id(), "cue created");
            Ok(document.id().to_string())
        })
    }

    fn update<'a>(
        &'a self,
        id: &'a str,
        update: CueUpdate,
    ) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let (fields, mask) = values::update_fields(&update);
            self.patch(id, fields, &mask).await
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let request = self.http.delete(self.cue_url(id));
            let response = self.authorize(request).await?.send().await?;
            check_status(response).await?;
            Ok(())
        })
    }

    fn append_comment<'a>(
        &'a self,
        cue_id: &'a str,
        comment: Comment,
    ) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let body = json!({
                "writes": [{
                    "transform": {
                        "document": self.cue_name(cue_id),
                        "fieldTransforms": [{
                            "fieldPath": "comments",
                            "appendMissingElements": {
                                "values": [values::comment_value(&comment)]
                            }
                        }]
                    },
                    "currentDocument": {"exists": true}
                }]
            });
            let request = self
                .http
                .post(format!("{}:commit", self.documents_url()))
                .json(&body);
            let response = self.authorize(request).await?.send().await?;
            check_status(response).await?;
            Ok(())
        })
    }

    fn replace_comments<'a>(
        &'a self,
        cue_id: &'a str,
        comments: Vec<Comment>,
    ) -> LocalBoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let mut fields = Fields::new();
            fields.insert("comments".to_string(), values::comments_value(&comments));
            self.patch(cue_id, fields, &["comments"]).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Production;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::VecDeque;

    fn cue(id: &str) -> Cue {
        Cue {
            id: id.to_string(),
            title: id.to_string(),
            play: Production::JuliusCaesar,
            audio_url: String::new(),
            pdf_url: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
            comments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn polling_emits_only_changed_snapshots() {
        let a = vec![cue("a")];
        let b = vec![cue("b"), cue("a")];
        let mut polls: VecDeque<GatewayResult<Vec<Cue>>> = VecDeque::from([
            Ok(a.clone()),
            Ok(a.clone()),
            Err(GatewayError::Network("connection reset".to_string())),
            Ok(a.clone()),
            Ok(b.clone()),
        ]);
        let fetch = move || -> LocalBoxFuture<'static, GatewayResult<Vec<Cue>>> {
            match polls.pop_front() {
                Some(result) => Box::pin(async move { result }),
                None => Box::pin(futures_util::future::pending()),
            }
        };

        let emitted: Vec<Vec<Cue>> = poll_snapshots(fetch, Duration::ZERO)
            .take(2)
            .collect()
            .await;
        assert_eq!(emitted, vec![a, b]);
    }

    #[test]
    fn run_query_results_skip_empty_and_malformed_rows() {
        let items: Vec<RunQueryItem> = serde_json::from_value(json!([
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/cues/b",
                    "fields": {
                        "title": {"stringValue": "Battle"},
                        "play": {"stringValue": "Both"},
                        "audioURL": {"stringValue": "a"},
                        "pdfURL": {"stringValue": "p"},
                        "createdAt": {"timestampValue": "2024-03-02T20:00:00Z"}
                    }
                },
                "readTime": "2024-03-02T21:00:00Z"
            },
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/cues/broken",
                    "fields": {"title": {"stringValue": "No play"}}
                },
                "readTime": "2024-03-02T21:00:00Z"
            },
            {"readTime": "2024-03-02T21:00:00Z"}
        ]))
        .unwrap();

        let cues = decode_query(items);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].id, "b");
        assert_eq!(cues[0].play, Production::Both);
        assert_eq!(cues[0].comments, Vec::new());
    }

    #[test]
    fn resource_names_are_built_from_the_project() {
        let config = Rc::new(BackendConfig::new("k", "stage", "b"));
        let kv: Rc<dyn crate::db::KeyValueStore> = Rc::new(crate::db::MemoryKv::new());
        let http = reqwest::Client::new();
        let auth = FirebaseAuth::new(http.clone(), config.clone(), kv);
        let firestore = Firestore::new(http, config, auth);

        assert_eq!(
            firestore.cue_name("x1"),
            "projects/stage/databases/(default)/documents/cues/x1"
        );
        assert_eq!(
            firestore.cue_url("x1"),
            "https://firestore.googleapis.com/v1/projects/stage/databases/(default)/documents/cues/x1"
        );
    }
}
