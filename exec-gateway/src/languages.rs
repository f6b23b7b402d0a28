//! Language registry: platform language ids mapped to pinned remote runtimes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Error;

/// Remote execution parameters for one platform language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Identifier callers use, e.g. `cpp`
    pub language_id: String,
    /// Runtime name understood by the remote executor, e.g. `c++`
    pub runtime_name: String,
    /// Pinned runtime version
    pub runtime_version: String,
    /// Name given to the single submitted source file
    pub source_file_name: String,
    /// Memory ceiling for the run stage (MB)
    pub memory_ceiling_mb: u32,
}

impl LanguageProfile {
    pub fn new(
        language_id: &str,
        runtime_name: &str,
        runtime_version: &str,
        source_file_name: &str,
        memory_ceiling_mb: u32,
    ) -> Self {
        Self {
            language_id: language_id.to_string(),
            runtime_name: runtime_name.to_string(),
            runtime_version: runtime_version.to_string(),
            source_file_name: source_file_name.to_string(),
            memory_ceiling_mb,
        }
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        u64::from(self.memory_ceiling_mb) * 1024 * 1024
    }
}

/// Immutable lookup table built once at startup
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        let profiles = [
            LanguageProfile::new("python", "python", "3.10.0", "main.py", 128),
            LanguageProfile::new("javascript", "javascript", "18.15.0", "main.js", 128),
            LanguageProfile::new("java", "java", "15.0.2", "Main.java", 256),
            LanguageProfile::new("cpp", "c++", "10.2.0", "main.cpp", 128),
            LanguageProfile::new("c", "c", "10.2.0", "main.c", 128),
        ];

        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.language_id.clone(), p))
                .collect(),
        }
    }
}

impl LanguageRegistry {
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = LanguageProfile>,
    ) -> Result<Self, Error> {
        let mut map = HashMap::new();
        for profile in profiles {
            if profile.language_id.is_empty() {
                return Err(Error::Configuration("empty language id".to_string()));
            }
            if let Some(previous) = map.insert(profile.language_id.clone(), profile) {
                return Err(Error::Configuration(format!(
                    "duplicate language profile: {}",
                    previous.language_id
                )));
            }
        }

        Ok(Self { profiles: map })
    }

    pub fn resolve(&self, language_id: &str) -> Result<&LanguageProfile, Error> {
        self.profiles
            .get(language_id)
            .ok_or_else(|| Error::UnsupportedLanguage(language_id.to_string()))
    }

    pub fn supports(&self, language_id: &str) -> bool {
        self.profiles.contains_key(language_id)
    }

    /// Supported ids in sorted order
    pub fn language_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
