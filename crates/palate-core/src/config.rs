use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Resolved from `PALATE_OPENAI_API_KEY`, never from the config file.
    #[serde(skip)]
    pub api_key: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            max_tokens: 1000,
            temperature: 0.7,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Root directory of the local index. Deleting it and re-running
    /// ingestion is the documented reset procedure.
    pub path: String,
    /// When set, a remote Qdrant server is used instead of the local index.
    pub qdrant_url: Option<String>,
    pub collection: String,
    pub retrieve_limit: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "./palate_index".into(),
            qdrant_url: None,
            collection: "story".into(),
            retrieve_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: "corpus/story.md".into(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PALATE_OPENAI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Ok(v) = std::env::var("PALATE_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("PALATE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("PALATE_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("PALATE_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("PALATE_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.llm.temperature = t;
        }
        if let Ok(v) = std::env::var("PALATE_INDEX_PATH") {
            self.index.path = v;
        }
        if let Ok(v) = std::env::var("PALATE_QDRANT_URL") {
            self.index.qdrant_url = Some(v);
        }
        if let Ok(v) = std::env::var("PALATE_COLLECTION") {
            self.index.collection = v;
        }
        if let Ok(v) = std::env::var("PALATE_RETRIEVE_LIMIT")
            && let Ok(n) = v.parse::<u64>()
        {
            self.index.retrieve_limit = n;
        }
        if let Ok(v) = std::env::var("PALATE_CORPUS_PATH") {
            self.corpus.path = v;
        }
    }

    /// Check invariants the rest of the system relies on. The API key is
    /// deliberately not required here; its absence only fails the call that
    /// needs it.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.index.collection.trim().is_empty() {
            bail!("index.collection must not be empty");
        }
        if self.index.retrieve_limit == 0 {
            bail!("index.retrieve_limit must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            );
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load(Path::new("/does/not/exist.toml")).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
        assert_eq!(config.llm.max_tokens, 1000);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.index.collection, "story");
        assert_eq!(config.index.retrieve_limit, 5);
    }

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn toml_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nmodel = \"gpt-4o\"\n\n[index]\ncollection = \"tasting-notes\"\nretrieve_limit = 3"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.index.collection, "tasting-notes");
        assert_eq!(config.index.retrieve_limit, 3);
        // Untouched sections keep their defaults.
        assert_eq!(config.llm.max_tokens, 1000);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn api_key_not_readable_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\napi_key = \"sk-leaked\"").unwrap();
        // serde(skip): the key in the file is ignored, the secret stays
        // empty unless the env var is set.
        let config = Config::load(file.path()).unwrap();
        assert!(config.llm.api_key.is_empty());
    }

    #[test]
    fn empty_collection_fails_validation() {
        let mut config = Config::default();
        config.index.collection = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_retrieve_limit_fails_validation() {
        let mut config = Config::default();
        config.index.retrieve_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_fails_validation() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
