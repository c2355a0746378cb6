use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up when `AIKO_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "aiko.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// All aiko parameters. Every field has a default, so a config file only
/// needs to list what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AikoCfg {
    // character
    pub character_name: String,
    pub username: String,
    pub prompts_dir: PathBuf,
    pub default_personality: String,

    // conversation memory
    pub max_side_prompts: usize,
    pub max_context_turns: usize,

    // arbitration
    pub voice_message_expiration_secs: f64,
    pub chat_min_cooldown_secs: u64,
    pub chat_max_cooldown_secs: u64,
    pub chat_pool_capacity: usize,

    // frame of mind
    pub mood_change_threshold: i64,
    pub mood_levels: usize,
    pub irritability_threshold: i64,
    /// Mood level label ("-1", "0", "+2", ...) → personality identifier.
    pub mood_personalities: BTreeMap<String, String>,

    // completion
    pub completion_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,

    // spontaneous talking
    pub silence_min_secs: u64,
    pub silence_max_secs: u64,

    // consumer loop
    pub idle_poll_ms: u64,
}

impl Default for AikoCfg {
    fn default() -> Self {
        Self {
            character_name: "Aiko".into(),
            username: "Ulaidh".into(),
            prompts_dir: PathBuf::from("prompts"),
            default_personality: "AIKO".into(),
            max_side_prompts: 5,
            max_context_turns: 10,
            voice_message_expiration_secs: 10.0,
            chat_min_cooldown_secs: 2,
            chat_max_cooldown_secs: 6,
            chat_pool_capacity: 10,
            mood_change_threshold: 600,
            mood_levels: 5,
            irritability_threshold: 300,
            mood_personalities: BTreeMap::new(),
            completion_timeout_secs: 10,
            max_tokens: 256,
            temperature: 0.9,
            silence_min_secs: 180,
            silence_max_secs: 540,
            idle_poll_ms: 100,
        }
    }
}

impl AikoCfg {
    /// Load from `AIKO_CONFIG`, falling back to [`DEFAULT_CONFIG_PATH`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("AIKO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Load from a TOML file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let cfg: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "loaded config from file");
        Ok(cfg)
    }

    /// Reject values the core would otherwise misbehave on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mood_levels % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "mood_levels must be odd, got {}",
                self.mood_levels
            )));
        }
        if self.mood_change_threshold <= 0 {
            return Err(ConfigError::Invalid(
                "mood_change_threshold must be positive".into(),
            ));
        }
        if self.chat_min_cooldown_secs > self.chat_max_cooldown_secs {
            return Err(ConfigError::Invalid(format!(
                "chat_min_cooldown_secs ({}) exceeds chat_max_cooldown_secs ({})",
                self.chat_min_cooldown_secs, self.chat_max_cooldown_secs
            )));
        }
        if self.silence_min_secs > self.silence_max_secs {
            return Err(ConfigError::Invalid(format!(
                "silence_min_secs ({}) exceeds silence_max_secs ({})",
                self.silence_min_secs, self.silence_max_secs
            )));
        }
        if self.max_side_prompts == 0 || self.max_context_turns == 0 || self.chat_pool_capacity == 0 {
            return Err(ConfigError::Invalid("window capacities must be non-zero".into()));
        }
        if Duration::try_from_secs_f64(self.voice_message_expiration_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "voice_message_expiration_secs must be a non-negative number of seconds, got {}",
                self.voice_message_expiration_secs
            )));
        }
        if self.completion_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "completion_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn personalities_dir(&self) -> PathBuf {
        self.prompts_dir.join("personalities")
    }

    pub fn keywords_dir(&self) -> PathBuf {
        self.prompts_dir.join("keywords")
    }
}
