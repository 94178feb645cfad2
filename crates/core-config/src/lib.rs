//! Persisted preferences.
//!
//! Parses `gross.toml` (or an override path provided by the binary). Every
//! section and field is optional; unknown fields are ignored so older files
//! keep loading. A missing file, or one that fails to parse, yields defaults.
//! Other read failures are returned to the caller; `load_or_default` turns
//! them into defaults so storage problems never interrupt dictation.
//!
//! ```toml
//! [advance]
//! enabled = true
//! delay_ms = 1500
//! continuation_chars = ",."
//! continuation_words = ["a", "the", "with"]
//! learned_words = ["measuring"]
//!
//! [cassette]
//! format = "letter-number"
//!
//! [history]
//! capacity = 500
//! idle_ms = 1200
//! ```

use anyhow::{Context, Result};
use core_advance::{
    DEFAULT_CONTINUATION_CHARS, DEFAULT_CONTINUATION_WORDS, DEFAULT_DELAY_MS, HoldVocabulary,
    clamp_delay_ms,
};
use core_grammar::NumberingFormat;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};
use tracing::{debug, info, warn};

pub const CONFIG_FILE: &str = "gross.toml";
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;
pub const DEFAULT_IDLE_MS: u64 = 1200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancePrefs {
    pub enabled: bool,
    /// Raw value; clamped when applied (see [`Preferences::effective_delay_ms`]).
    pub delay_ms: u64,
    pub continuation_chars: String,
    pub continuation_words: Vec<String>,
    pub learned_words: Vec<String>,
}

impl Default for AdvancePrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_DELAY_MS,
            continuation_chars: DEFAULT_CONTINUATION_CHARS.iter().collect(),
            continuation_words: DEFAULT_CONTINUATION_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            learned_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CassettePrefs {
    pub format: NumberingFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryPrefs {
    pub capacity: usize,
    pub idle_ms: u64,
}

impl Default for HistoryPrefs {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            idle_ms: DEFAULT_IDLE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub advance: AdvancePrefs,
    pub cassette: CassettePrefs,
    pub history: HistoryPrefs,
}

impl Preferences {
    pub fn effective_delay_ms(&self) -> u64 {
        let clamped = clamp_delay_ms(self.advance.delay_ms);
        if clamped != self.advance.delay_ms {
            info!(target: "config", raw = self.advance.delay_ms, clamped, "advance_delay_clamped");
        }
        clamped
    }

    pub fn hold_vocabulary(&self) -> HoldVocabulary {
        HoldVocabulary::new(
            self.advance.continuation_chars.chars(),
            self.advance.continuation_words.iter().cloned(),
            self.advance.learned_words.iter().cloned(),
        )
    }

    /// Mirror the controller's learned set back into the persisted form.
    pub fn set_learned_words<'a>(&mut self, words: impl IntoIterator<Item = &'a String>) {
        self.advance.learned_words = words.into_iter().cloned().collect();
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing preferences")
    }
}

/// Best-effort config path: `gross.toml` in the working directory, then the
/// platform config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("gross").join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Preferences> {
    let path = path.unwrap_or_else(discover);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(target: "config", path = %path.display(), "preferences_missing_using_defaults");
            return Ok(Preferences::default());
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    match toml::from_str::<Preferences>(&content) {
        Ok(prefs) => Ok(prefs),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "preferences_parse_failed");
            Ok(Preferences::default())
        }
    }
}

/// Load/save hooks for preferences. The medium belongs to the implementor.
pub trait PreferenceStore {
    fn load(&self) -> Result<Preferences>;
    fn save(&mut self, prefs: &Preferences) -> Result<()>;
}

/// TOML file on disk.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn discovered() -> Self {
        Self::new(discover())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PreferenceStore for TomlFileStore {
    fn load(&self) -> Result<Preferences> {
        load_from(Some(self.path.clone()))
    }

    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&self.path, prefs.to_toml()?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        debug!(target: "config", path = %self.path.display(), "preferences_saved");
        Ok(())
    }
}

/// In-process store for tests and session-only hosts. `unavailable()`
/// simulates a medium that rejects writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    prefs: Option<Preferences>,
    reject_writes: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs: Some(prefs),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Option<&Preferences> {
        self.prefs.as_ref()
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<Preferences> {
        Ok(self.prefs.clone().unwrap_or_default())
    }

    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        if self.reject_writes {
            anyhow::bail!("preference storage unavailable");
        }
        self.prefs = Some(prefs.clone());
        self.saves += 1;
        Ok(())
    }
}

/// Load, falling back to defaults on any storage error.
pub fn load_or_default(store: &dyn PreferenceStore) -> Preferences {
    store.load().unwrap_or_else(|e| {
        warn!(target: "config", error = %e, "preferences_load_failed");
        Preferences::default()
    })
}

/// Save, logging and swallowing storage errors. Returns whether it persisted.
pub fn save_or_warn(store: &mut dyn PreferenceStore, prefs: &Preferences) -> bool {
    match store.save(prefs) {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "config", error = %e, "preferences_save_failed");
            false
        }
    }
}
