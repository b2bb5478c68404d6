//! Prompt Registry (C5): versioned, immutable prompt templates keyed by
//! `(agent_name, semver)`. Grounded on the teacher's `include_dir!` +
//! `minijinja-embed` pattern for embedding template assets
//! (`html-router`'s template loader) — prompts ship inside the binary
//! the same way, but content-addressed and exact-version-only rather
//! than reloadable at runtime.

use common::error::{AceError, AceResult};
use include_dir::{include_dir, Dir};
use semver::Version;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

static PROMPTS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/prompts");

/// One immutable, hash-addressed prompt load (spec.md §4.5, §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPrompt {
    pub id: String,
    pub version: Version,
    pub content: String,
    pub hash: String,
}

/// Built once at startup from embedded files laid out as
/// `prompts/<agent>/<semver>.md`. Loading by exact version never falls
/// back to another version (spec.md §4.5) — a miss is a hard error, not
/// a "closest available" heuristic.
pub struct PromptRegistry {
    prompts: HashMap<(String, Version), LoadedPrompt>,
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl PromptRegistry {
    /// Loads every embedded prompt file. Malformed filenames (not
    /// `<agent>/<semver>.md`) are a build-time programmer error, not a
    /// runtime one — they panic rather than silently dropping a prompt.
    #[must_use]
    pub fn load_embedded() -> Self {
        let mut prompts = HashMap::new();

        for agent_dir in PROMPTS_DIR.dirs() {
            let agent = agent_dir
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_else(|| panic!("prompt directory with no name: {agent_dir:?}"))
                .to_string();

            for file in agent_dir.files() {
                let stem = file
                    .path()
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_else(|| panic!("prompt file with no stem: {file:?}"));
                let version = Version::parse(stem)
                    .unwrap_or_else(|e| panic!("prompt {agent}/{stem} has invalid semver: {e}"));
                let content = file
                    .contents_utf8()
                    .unwrap_or_else(|| panic!("prompt {agent}/{stem} is not valid utf-8"))
                    .to_string();
                let hash = sha256_hex(&content);

                prompts.insert(
                    (agent.clone(), version.clone()),
                    LoadedPrompt {
                        id: agent.clone(),
                        version,
                        content,
                        hash,
                    },
                );
            }
        }

        PromptRegistry { prompts }
    }

    /// Loads `(agent_name, version)` exactly. Never substitutes a nearby
    /// version.
    pub fn load(&self, agent_name: &str, version: &str) -> AceResult<LoadedPrompt> {
        let parsed = Version::parse(version)
            .map_err(|e| AceError::Validation(format!("invalid prompt version `{version}`: {e}")))?;

        self.prompts
            .get(&(agent_name.to_string(), parsed))
            .cloned()
            .ok_or_else(|| {
                AceError::Validation(format!(
                    "no prompt `{agent_name}` at version `{version}` (exact-version lookup, no fallback)"
                ))
            })
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::load_embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_prompt_exactly() {
        let registry = PromptRegistry::load_embedded();
        let prompt = registry.load("narrator", "0.1.0").expect("narrator prompt");
        assert_eq!(prompt.id, "narrator");
        assert_eq!(prompt.hash.len(), 64);
        assert!(!prompt.content.is_empty());
    }

    #[test]
    fn exact_version_lookup_never_falls_back() {
        let registry = PromptRegistry::load_embedded();
        assert!(registry.load("narrator", "9.9.9").is_err());
        assert!(registry.load("nonexistent-agent", "0.1.0").is_err());
    }

    #[test]
    fn hash_is_stable_for_identical_content() {
        let registry = PromptRegistry::load_embedded();
        let a = registry.load("judge-faithfulness", "0.1.0").unwrap();
        let b = registry.load("judge-faithfulness", "0.1.0").unwrap();
        assert_eq!(a.hash, b.hash);
    }
}
