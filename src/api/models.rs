use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage production a cue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Production {
    #[default]
    #[serde(rename = "Julius Caesar")]
    JuliusCaesar,
    #[serde(rename = "Antony and Cleopatra")]
    AntonyAndCleopatra,
    #[serde(rename = "Both")]
    Both,
}

impl Production {
    pub const ALL: [Production; 3] = [
        Production::JuliusCaesar,
        Production::AntonyAndCleopatra,
        Production::Both,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::JuliusCaesar => "Julius Caesar",
            Self::AntonyAndCleopatra => "Antony and Cleopatra",
            Self::Both => "Both",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|production| production.label() == label.trim())
    }

    /// Whether a cue tagged with `self` shows up under the given filter.
    /// A "Both" cue belongs to either production.
    pub fn matches_filter(self, filter: Production) -> bool {
        match filter {
            Self::Both => self == Self::Both,
            single => self == single || self == Self::Both,
        }
    }

    /// Productions a cue card renders a player section for.
    pub fn stage_sections(self) -> Vec<Production> {
        match self {
            Self::Both => vec![Self::JuliusCaesar, Self::AntonyAndCleopatra],
            single => vec![single],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: String,
    pub title: String,
    pub play: Production,
    pub audio_url: String,
    pub pdf_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Stable user id captured when the comment was posted. Missing on
    /// comments written before authorship was tracked by id.
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub username: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(text: impl Into<String>, author: &UserSession, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            author_id: Some(author.uid.clone()),
            username: author.author_label(),
            text: text.into(),
            created_at: Some(now),
        }
    }

    /// Display-only ownership check used to decide whether to offer the
    /// delete button. This is not an authorization boundary.
    pub fn is_owned_by(&self, session: &UserSession) -> bool {
        match self.author_id.as_deref() {
            Some(author_id) => author_id == session.uid,
            None => !self.username.is_empty() && self.username == session.author_label(),
        }
    }
}

/// An authenticated identity session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl UserSession {
    /// Name stamped on comments: display name, else email, else user id.
    pub fn author_label(&self) -> String {
        fn present(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|value| !value.is_empty())
        }
        present(self.display_name.as_deref())
            .or_else(|| present(self.email.as_deref()))
            .unwrap_or(&self.uid)
            .to_string()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// File picked in the browser, read fully into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Blob folder an upload is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    Audio,
    SheetMusic,
}

impl UploadPurpose {
    pub fn folder(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::SheetMusic => "sheetmusic",
        }
    }
}

/// Document written when a cue is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCue {
    pub title: String,
    pub play: Production,
    pub audio_url: String,
    pub pdf_url: String,
    pub created_at: DateTime<Utc>,
}

impl NewCue {
    pub fn into_cue(self, id: String) -> Cue {
        Cue {
            id,
            title: self.title,
            play: self.play,
            audio_url: self.audio_url,
            pdf_url: self.pdf_url,
            created_at: self.created_at,
            comments: Vec::new(),
        }
    }
}

/// Field-level update of a cue. `None` URLs leave the stored value alone.
#[derive(Debug, Clone, PartialEq)]
pub struct CueUpdate {
    pub title: String,
    pub play: Production,
    pub audio_url: Option<String>,
    pub pdf_url: Option<String>,
}

impl CueUpdate {
    pub fn apply_to(&self, cue: &mut Cue) {
        cue.title = self.title.clone();
        cue.play = self.play;
        if let Some(url) = &self.audio_url {
            cue.audio_url = url.clone();
        }
        if let Some(url) = &self.pdf_url {
            cue.pdf_url = url.clone();
        }
    }
}

/// Formats a playback offset as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_offset(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(uid: &str, name: Option<&str>, email: Option<&str>) -> UserSession {
        UserSession {
            uid: uid.to_string(),
            display_name: name.map(str::to_string),
            email: email.map(str::to_string),
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn production_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&Production::AntonyAndCleopatra).unwrap();
        assert_eq!(json, "\"Antony and Cleopatra\"");
        assert_eq!(
            Production::from_label("Julius Caesar"),
            Some(Production::JuliusCaesar)
        );
        assert_eq!(Production::from_label("Hamlet"), None);
    }

    #[test]
    fn both_matches_either_single_production_filter() {
        assert!(Production::Both.matches_filter(Production::JuliusCaesar));
        assert!(Production::Both.matches_filter(Production::AntonyAndCleopatra));
        assert!(!Production::JuliusCaesar.matches_filter(Production::AntonyAndCleopatra));
        assert!(!Production::JuliusCaesar.matches_filter(Production::Both));
        assert_eq!(Production::Both.stage_sections().len(), 2);
        assert_eq!(
            Production::JuliusCaesar.stage_sections(),
            vec![Production::JuliusCaesar]
        );
    }

    #[test]
    fn author_label_prefers_display_name_then_email() {
        assert_eq!(
            session("u1", Some("Ada"), Some("ada@example.com")).author_label(),
            "Ada"
        );
        assert_eq!(
            session("u1", Some("  "), Some("ada@example.com")).author_label(),
            "ada@example.com"
        );
        assert_eq!(
            session("u1", Some(""), Some("@example.com")).author_label(),
            "@example.com"
        );
        assert_eq!(session("u1", None, None).author_label(), "u1");
    }

    #[test]
    fn ownership_uses_author_id_and_falls_back_to_username() {
        let ada = session("u1", Some("Ada"), None);
        let impostor = session("u2", Some("Ada"), None);
        let now = Utc::now();

        let comment = Comment::new("nice tempo", &ada, now);
        assert!(comment.is_owned_by(&ada));
        assert!(!comment.is_owned_by(&impostor));

        let legacy = Comment {
            author_id: None,
            ..comment
        };
        assert!(legacy.is_owned_by(&impostor));
    }

    #[test]
    fn cue_update_keeps_urls_when_no_file_was_supplied() {
        let mut cue = NewCue {
            title: "Overture".to_string(),
            play: Production::JuliusCaesar,
            audio_url: "a1".to_string(),
            pdf_url: "p1".to_string(),
            created_at: Utc::now(),
        }
        .into_cue("c1".to_string());

        CueUpdate {
            title: "Overture II".to_string(),
            play: Production::Both,
            audio_url: None,
            pdf_url: Some("p2".to_string()),
        }
        .apply_to(&mut cue);

        assert_eq!(cue.title, "Overture II");
        assert_eq!(cue.play, Production::Both);
        assert_eq!(cue.audio_url, "a1");
        assert_eq!(cue.pdf_url, "p2");
    }

    #[test]
    fn offsets_format_as_clock_time() {
        assert_eq!(format_offset(0.0), "0:00");
        assert_eq!(format_offset(65.9), "1:05");
        assert_eq!(format_offset(3725.0), "1:02:05");
        assert_eq!(format_offset(f64::NAN), "0:00");
    }
}
