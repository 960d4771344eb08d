//! Engine configuration.
//!
//! Values are layered, highest priority first: command-line overrides,
//! `BF_*` environment variables, the `[engine]` table of `bf.toml` in the
//! user's config home, then built-in defaults.
//!
//! ```toml
//! [engine]
//! tape_size = 30000
//! pointer_policy = "clamp"   # or "wrap"
//! max_program_len = 65536
//! max_nesting = 65536
//! max_steps = 1000000
//! timeout_ms = 2000
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cross_xdg::BaseDirs;
use serde::Deserialize;
use tracing::debug;

use crate::linker::Limits;
use crate::tape::{PointerPolicy, DEFAULT_TAPE_CAPACITY};

/// File name looked up in the config home.
pub const CONFIG_FILE_NAME: &str = "bf.toml";

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "BF_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}' is not a non-negative integer")]
    InvalidNumber { key: &'static str, value: String },

    #[error("invalid pointer policy '{value}', must be 'clamp' or 'wrap'")]
    InvalidPolicy { value: String },

    #[error("tape size must be at least 1 cell")]
    ZeroTapeCapacity,
}

/// Everything an engine run needs to know besides the program itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub tape_capacity: usize,
    pub pointer_policy: PointerPolicy,
    pub limits: Limits,
    /// Step budget per run; `None` runs until the program halts.
    pub max_steps: Option<u64>,
    /// Wall-clock budget per run in milliseconds; `None` disables the watchdog.
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tape_capacity: DEFAULT_TAPE_CAPACITY,
            pointer_policy: PointerPolicy::Clamp,
            limits: Limits::default(),
            max_steps: None,
            timeout_ms: None,
        }
    }
}

/// Settings given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub tape_size: Option<usize>,
    pub pointer_policy: Option<PointerPolicy>,
    pub max_steps: Option<u64>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    engine: EngineSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineSection {
    tape_size: Option<usize>,
    pointer_policy: Option<PointerPolicy>,
    max_program_len: Option<usize>,
    max_nesting: Option<usize>,
    max_steps: Option<u64>,
    timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Resolve the full layered configuration for the process.
    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut cfg = match path {
            Some(p) => Self::load_from(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults layered with `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read { path: path.to_path_buf(), source });
            }
        };
        debug!(path = %path.display(), "loading config file");
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults layered with the `[engine]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(content)?;
        let section = file.engine;
        let mut cfg = Self::default();

        if let Some(v) = section.tape_size { cfg.tape_capacity = v; }
        if let Some(v) = section.pointer_policy { cfg.pointer_policy = v; }
        if let Some(v) = section.max_program_len { cfg.limits.max_program_len = v; }
        if let Some(v) = section.max_nesting { cfg.limits.max_nesting = v; }
        if section.max_steps.is_some() { cfg.max_steps = section.max_steps; }
        if section.timeout_ms.is_some() { cfg.timeout_ms = section.timeout_ms; }

        Ok(cfg)
    }

    /// Apply `BF_*` variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BF_TAPE_SIZE") {
            self.tape_capacity = parse_number("BF_TAPE_SIZE", &v)?;
        }
        if let Some(v) = lookup("BF_POINTER_POLICY") {
            self.pointer_policy = v
                .parse()
                .map_err(|_| ConfigError::InvalidPolicy { value: v.clone() })?;
        }
        if let Some(v) = lookup("BF_MAX_STEPS") {
            self.max_steps = Some(parse_number("BF_MAX_STEPS", &v)?);
        }
        if let Some(v) = lookup("BF_TIMEOUT_MS") {
            self.timeout_ms = Some(parse_number("BF_TIMEOUT_MS", &v)?);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = overrides.tape_size { self.tape_capacity = v; }
        if let Some(v) = overrides.pointer_policy { self.pointer_policy = v; }
        if overrides.max_steps.is_some() { self.max_steps = overrides.max_steps; }
        if overrides.timeout_ms.is_some() { self.timeout_ms = overrides.timeout_ms; }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tape_capacity == 0 {
            return Err(ConfigError::ZeroTapeCapacity);
        }
        Ok(())
    }
}

/// `<config home>/bf.toml`, e.g. `~/.config/bf.toml` on Linux and macOS.
pub fn default_config_path() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn engine_table_overrides_defaults() {
        let cfg = EngineConfig::from_toml_str(
            "[engine]\ntape_size = 64\npointer_policy = \"wrap\"\nmax_nesting = 8\nmax_steps = 100\n",
        )
        .unwrap();
        assert_eq!(cfg.tape_capacity, 64);
        assert_eq!(cfg.pointer_policy, PointerPolicy::Wrap);
        assert_eq!(cfg.limits.max_nesting, 8);
        assert_eq!(cfg.limits.max_program_len, crate::linker::DEFAULT_MAX_PROGRAM_LEN);
        assert_eq!(cfg.max_steps, Some(100));
        assert_eq!(cfg.timeout_ms, None);
    }

    #[test]
    fn unknown_engine_keys_are_rejected() {
        assert!(EngineConfig::from_toml_str("[engine]\ntape = 1\n").is_err());
    }

    #[test]
    fn env_beats_file_and_flags_beat_env() {
        let mut cfg = EngineConfig::from_toml_str("[engine]\nmax_steps = 10\n").unwrap();
        cfg.apply_env(env(&[("BF_MAX_STEPS", "20"), ("BF_POINTER_POLICY", "wrap")])).unwrap();
        assert_eq!(cfg.max_steps, Some(20));
        assert_eq!(cfg.pointer_policy, PointerPolicy::Wrap);

        cfg.apply_overrides(&Overrides { max_steps: Some(30), ..Overrides::default() });
        assert_eq!(cfg.max_steps, Some(30));
        assert_eq!(cfg.pointer_policy, PointerPolicy::Wrap);
    }

    #[test]
    fn malformed_env_values_are_errors() {
        let mut cfg = EngineConfig::default();
        assert!(matches!(
            cfg.apply_env(env(&[("BF_TIMEOUT_MS", "soon")])),
            Err(ConfigError::InvalidNumber { key: "BF_TIMEOUT_MS", .. })
        ));
        assert!(matches!(
            cfg.apply_env(env(&[("BF_POINTER_POLICY", "bounce")])),
            Err(ConfigError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn zero_tape_is_rejected() {
        let cfg = EngineConfig { tape_capacity: 0, ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroTapeCapacity)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bf.toml");
        fs::write(&path, "[engine\n").unwrap();
        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bf.toml"));
    }
}
