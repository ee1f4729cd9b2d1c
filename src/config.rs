//! Firebase project configuration: build-time environment first, then the
//! override saved from the settings page.

use crate::db::{load_json, save_json, KeyValueStore, KvError};
use serde::{Deserialize, Serialize};

const BACKEND_KEY: &str = "cuedesk.backend";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    pub api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
}

impl BackendConfig {
    pub fn new(
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        storage_bucket: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            project_id: project_id.into().trim().to_string(),
            storage_bucket: storage_bucket
                .into()
                .trim()
                .trim_start_matches("gs://")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Values baked in at build time via `CUEDESK_FIREBASE_*`.
    pub fn from_build_env() -> Option<Self> {
        let config = Self::new(
            option_env!("CUEDESK_FIREBASE_API_KEY").unwrap_or_default(),
            option_env!("CUEDESK_FIREBASE_PROJECT_ID").unwrap_or_default(),
            option_env!("CUEDESK_FIREBASE_STORAGE_BUCKET").unwrap_or_default(),
        );
        config.is_complete().then_some(config)
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.project_id.is_empty() && !self.storage_bucket.is_empty()
    }
}

pub fn load_backend_override(kv: &dyn KeyValueStore) -> Option<BackendConfig> {
    load_json::<BackendConfig>(kv, BACKEND_KEY).filter(BackendConfig::is_complete)
}

pub fn save_backend_override(
    kv: &dyn KeyValueStore,
    config: Option<&BackendConfig>,
) -> Result<(), KvError> {
    match config {
        Some(config) => save_json(kv, BACKEND_KEY, config),
        None => kv.remove(BACKEND_KEY),
    }
}

/// Effective backend: saved override, else build env, else none (demo mode).
pub fn resolve_backend(kv: &dyn KeyValueStore) -> Option<BackendConfig> {
    load_backend_override(kv).or_else(BackendConfig::from_build_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{KeyValueStore, MemoryKv};

    #[test]
    fn bucket_is_normalized() {
        let config = BackendConfig::new(" key ", "stage-cues", "gs://stage-cues.appspot.com/");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.storage_bucket, "stage-cues.appspot.com");
        assert!(config.is_complete());
    }

    #[test]
    fn saved_override_wins_and_incomplete_ones_are_ignored() {
        let kv = MemoryKv::new();
        let config = BackendConfig::new("k", "p", "b");
        save_backend_override(&kv, Some(&config)).unwrap();
        assert_eq!(load_backend_override(&kv), Some(config));

        save_backend_override(&kv, Some(&BackendConfig::new("k", "", "b"))).unwrap();
        assert_eq!(load_backend_override(&kv), None);

        save_backend_override(&kv, None).unwrap();
        assert_eq!(load_backend_override(&kv), None);
    }

    #[test]
    fn overrides_with_extra_fields_still_load() {
        let kv = MemoryKv::new();
        kv.set(
            BACKEND_KEY,
            r#"{"api_key":"k","project_id":"p","storage_bucket":"b","auth_domain":"p.firebaseapp.com"}"#,
        )
        .unwrap();
        assert_eq!(load_backend_override(&kv), Some(BackendConfig::new("k", "p", "b")));
    }
}
