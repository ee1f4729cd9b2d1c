//! Firestore REST typed values and the mapping between cue documents and
//! the domain model.

use crate::api::models::*;
use crate::api::GatewayError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(Option<()>),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    /// Trailing path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::TimestampValue(value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::ArrayValue(ArrayValue { values })
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(value) => Some(value),
            _ => None,
        }
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampValue(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|value| value.with_timezone(&Utc)),
            _ => None,
        }
    }
}

fn required_string(fields: &Fields, name: &str) -> Result<String, GatewayError> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::DataShape(format!("missing string field `{name}`")))
}

fn optional_string(fields: &Fields, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

pub fn comment_value(comment: &Comment) -> Value {
    let mut fields = Fields::new();
    fields.insert("id".to_string(), Value::string(&comment.id));
    fields.insert("username".to_string(), Value::string(&comment.username));
    fields.insert("text".to_string(), Value::string(&comment.text));
    if let Some(author_id) = &comment.author_id {
        fields.insert("authorId".to_string(), Value::string(author_id));
    }
    if let Some(created_at) = comment.created_at {
        fields.insert("createdAt".to_string(), Value::timestamp(created_at));
    }
    Value::MapValue(MapValue { fields })
}

fn decode_comment(index: usize, value: &Value) -> Result<Comment, GatewayError> {
    match value {
        // The first dashboard draft stored comments as bare strings.
        Value::StringValue(text) => Ok(Comment {
            id: format!("legacy-{index}"),
            author_id: None,
            username: String::new(),
            text: text.clone(),
            created_at: None,
        }),
        Value::MapValue(map) => Ok(Comment {
            id: optional_string(&map.fields, "id").unwrap_or_else(|| format!("legacy-{index}")),
            author_id: optional_string(&map.fields, "authorId"),
            username: optional_string(&map.fields, "username").unwrap_or_default(),
            text: required_string(&map.fields, "text")?,
            created_at: map.fields.get("createdAt").and_then(Value::as_timestamp),
        }),
        other => Err(GatewayError::DataShape(format!(
            "unsupported comment value {other:?}"
        ))),
    }
}

pub fn comments_value(comments: &[Comment]) -> Value {
    Value::array(comments.iter().map(comment_value).collect())
}

pub fn new_cue_fields(cue: &NewCue) -> Fields {
    let mut fields = Fields::new();
    fields.insert("title".to_string(), Value::string(&cue.title));
    fields.insert("play".to_string(), Value::string(cue.play.label()));
    fields.insert("audioURL".to_string(), Value::string(&cue.audio_url));
    fields.insert("pdfURL".to_string(), Value::string(&cue.pdf_url));
    fields.insert("createdAt".to_string(), Value::timestamp(cue.created_at));
    fields.insert("comments".to_string(), Value::array(Vec::new()));
    fields
}

/// Fields to write plus the update mask naming them.
pub fn update_fields(update: &CueUpdate) -> (Fields, Vec<&'static str>) {
    let mut fields = Fields::new();
    let mut mask = vec!["title", "play"];
    fields.insert("title".to_string(), Value::string(&update.title));
    fields.insert("play".to_string(), Value::string(update.play.label()));
    if let Some(url) = &update.audio_url {
        fields.insert("audioURL".to_string(), Value::string(url));
        mask.push("audioURL");
    }
    if let Some(url) = &update.pdf_url {
        fields.insert("pdfURL".to_string(), Value::string(url));
        mask.push("pdfURL");
    }
    (fields, mask)
}

pub fn decode_cue(document: &Document) -> Result<Cue, GatewayError> {
    let fields = &document.fields;
    let play_label = required_string(fields, "play")?;
    let play = Production::from_label(&play_label)
        .ok_or_else(|| GatewayError::DataShape(format!("unknown production `{play_label}`")))?;
    let created_at = fields
        .get("createdAt")
        .and_then(Value::as_timestamp)
        .ok_or_else(|| GatewayError::DataShape("missing timestamp `createdAt`".to_string()))?;
    let comments = match fields.get("comments") {
        Some(Value::ArrayValue(array)) => array
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| decode_comment(index, value))
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    Ok(Cue {
        id: document.id().to_string(),
        title: required_string(fields, "title")?,
        play,
        audio_url: optional_string(fields, "audioURL").unwrap_or_default(),
        pdf_url: optional_string(fields, "pdfURL").unwrap_or_default(),
        created_at,
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn values_use_firestore_wire_names() {
        let value = Value::array(vec![Value::string("a"), Value::NullValue(None)]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"arrayValue": {"values": [{"stringValue": "a"}, {"nullValue": null}]}})
        );
        let timestamp = Value::timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap());
        assert_eq!(
            serde_json::to_value(&timestamp).unwrap(),
            json!({"timestampValue": "2024-03-01T20:00:00.000000Z"})
        );
    }

    #[test]
    fn decodes_a_first_draft_document_with_string_comments() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/cues/abc123",
            "fields": {
                "title": {"stringValue": "Storm"},
                "play": {"stringValue": "Julius Caesar"},
                "audioURL": {"stringValue": "https://x/a.mp3"},
                "pdfURL": {"stringValue": "https://x/a.pdf"},
                "createdAt": {"timestampValue": "2024-03-01T20:00:00.123456Z"},
                "comments": {"arrayValue": {"values": [{"stringValue": "louder"}]}}
            },
            "createTime": "2024-03-01T20:00:00.123456Z"
        }))
        .unwrap();

        let cue = decode_cue(&document).unwrap();
        assert_eq!(cue.id, "abc123");
        assert_eq!(cue.play, Production::JuliusCaesar);
        assert_eq!(cue.comments.len(), 1);
        assert_eq!(cue.comments[0].id, "legacy-0");
        assert_eq!(cue.comments[0].text, "louder");
        assert_eq!(cue.comments[0].author_id, None);
    }

    #[test]
    fn empty_arrays_and_missing_comments_decode_as_no_comments() {
        let mut fields = new_cue_fields(&NewCue {
            title: "Storm".to_string(),
            play: Production::Both,
            audio_url: "a".to_string(),
            pdf_url: "p".to_string(),
            created_at: Utc::now(),
        });
        let document: Document = serde_json::from_value(json!({
            "name": "cues/x",
            "fields": {"comments": {"arrayValue": {}}}
        }))
        .unwrap();
        assert_eq!(document.fields["comments"], Value::array(Vec::new()));

        fields.remove("comments");
        let cue = decode_cue(&Document {
            name: "cues/x".to_string(),
            fields,
        })
        .unwrap();
        assert!(cue.comments.is_empty());
        assert_eq!(cue.play, Production::Both);
    }

    #[test]
    fn structured_comments_keep_their_author() {
        let author = UserSession {
            uid: "u1".to_string(),
            display_name: Some("Ada".to_string()),
            email: None,
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: Utc::now(),
        };
        let comment = Comment::new("slower at bar 12", &author, Utc::now());
        let decoded = decode_comment(0, &comment_value(&comment)).unwrap();
        assert_eq!(decoded.id, comment.id);
        assert_eq!(decoded.author_id.as_deref(), Some("u1"));
        assert_eq!(decoded.username, "Ada");
    }

    #[test]
    fn unknown_productions_are_rejected() {
        let mut fields = new_cue_fields(&NewCue {
            title: "Storm".to_string(),
            play: Production::JuliusCaesar,
            audio_url: "a".to_string(),
            pdf_url: "p".to_string(),
            created_at: Utc::now(),
        });
        fields.insert("play".to_string(), Value::string("Hamlet"));
        let result = decode_cue(&Document {
            name: "cues/x".to_string(),
            fields,
        });
        assert!(matches!(result, Err(GatewayError::DataShape(_))));
    }

    #[test]
    fn update_mask_only_names_supplied_urls() {
        let (fields, mask) = update_fields(&CueUpdate {
            title: "Storm".to_string(),
            play: Production::AntonyAndCleopatra,
            audio_url: Some("new".to_string()),
            pdf_url: None,
        });
        assert_eq!(mask, ["title", "play", "audioURL"]);
        assert!(!fields.contains_key("pdfURL"));
    }
}
