//! Persisted color preference for terminal output.
//!
//! Independent of the lookup machinery: it only decides whether
//! [`Panel`](crate::render::Panel) output carries ANSI colors.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Store key holding the color mode.
pub const COLOR_KEY: &str = "pypi-avail.color";

/// The user's color preference. Cycles `auto → always → never → auto`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Follow the environment.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

impl ColorMode {
    /// The mode after this one in the cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Auto => Self::Always,
            Self::Always => Self::Never,
            Self::Never => Self::Auto,
        }
    }

    /// Stored spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Always => "always",
            Self::Never => "never",
        }
    }

    /// Parse a stored spelling.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Whether to color, given the environment `Auto` defers to.
    #[must_use]
    pub fn resolve(self, env: &Environment) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                if env.no_color {
                    false
                } else if env.force_color {
                    true
                } else {
                    env.is_terminal
                }
            }
        }
    }

    /// Resolve against the current process environment and set `colored`'s
    /// global override accordingly. Returns whether color is on.
    ///
    /// `Auto` reads the environment again on every call, so long-running
    /// output should re-apply before each write.
    pub fn apply(self) -> bool {
        self.apply_with(&Environment::detect())
    }

    /// Like [`apply`](Self::apply), against an explicit environment.
    pub fn apply_with(self, env: &Environment) -> bool {
        let enabled = self.resolve(env);
        colored::control::set_override(enabled);
        debug!(mode = self.as_str(), enabled, "color preference applied");
        enabled
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signals [`ColorMode::Auto`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// `NO_COLOR` is set and non-empty.
    pub no_color: bool,
    /// `CLICOLOR_FORCE` is set and not `0`.
    pub force_color: bool,
    /// Stdout is a terminal.
    pub is_terminal: bool,
}

impl Environment {
    /// Read the signals from this process.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            no_color: std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
            force_color: std::env::var_os("CLICOLOR_FORCE").is_some_and(|v| v != "0"),
            is_terminal: io::stdout().is_terminal(),
        }
    }
}

/// Errors reading or writing a [`FileStore`].
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// The file could not be read or written.
    #[error("cannot access preferences at {path}: {source}")]
    Io {
        /// Preference file.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The file is not a JSON object of strings.
    #[error("cannot parse preferences at {path}: {source}")]
    Parse {
        /// Preference file.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

/// A small string key-value store.
pub trait PreferenceStore {
    /// Stored value for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: BTreeMap<String, String>,
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a JSON object on disk. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Use the file at `path`; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PreferenceError {
        PreferenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&text).map_err(|source| PreferenceError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let text = serde_json::to_string_pretty(&map).map_err(|source| PreferenceError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|e| self.io_error(e))
    }
}

/// The stored color mode; anything missing, unreadable or unrecognised is `Auto`.
pub fn load_color_mode<S: PreferenceStore + ?Sized>(store: &S) -> ColorMode {
    match store.get(COLOR_KEY) {
        Ok(Some(value)) => ColorMode::from_stored(&value).unwrap_or_else(|| {
            debug!(%value, "ignoring unrecognised color preference");
            ColorMode::Auto
        }),
        Ok(None) => ColorMode::Auto,
        Err(e) => {
            warn!(error = %e, "falling back to automatic color");
            ColorMode::Auto
        }
    }
}

/// Advance the stored color mode one step and persist it.
///
/// # Errors
///
/// Returns an error if the new mode cannot be stored.
pub fn cycle_color_mode<S: PreferenceStore + ?Sized>(store: &mut S) -> Result<ColorMode, PreferenceError> {
    let next = load_color_mode(store).next();
    store.set(COLOR_KEY, next.as_str())?;
    Ok(next)
}
