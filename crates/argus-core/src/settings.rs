//! Engine configuration as named sections of typed values.
//!
//! Engines read tuning knobs from a settings provider instead of taking
//! them as constructor arguments. The on-disk rendering is TOML: one
//! table per section, one key per parameter.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings file not found: {0}")]
    NotFound(String),
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// One configuration value.
///
/// Variant order matters for deserialization: untagged decoding tries
/// variants top to bottom, so `Rect` must precede `Size` (a rect table
/// carries every size field plus two more) and `Point2i` must precede
/// `Point2f`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Rect {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    Point2i {
        x: i64,
        y: i64,
    },
    Point2f {
        x: f64,
        y: f64,
    },
    Size {
        width: i64,
        height: i64,
    },
}

impl SettingsValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingsValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Strict: a stored `Int` is not a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingsValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingsValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// `(x, y, width, height)`.
    pub fn as_rect(&self) -> Option<(i64, i64, i64, i64)> {
        match self {
            SettingsValue::Rect { x, y, width, height } => Some((*x, *y, *width, *height)),
            _ => None,
        }
    }

    pub fn as_point2i(&self) -> Option<(i64, i64)> {
        match self {
            SettingsValue::Point2i { x, y } => Some((*x, *y)),
            _ => None,
        }
    }

    pub fn as_point2f(&self) -> Option<(f64, f64)> {
        match self {
            SettingsValue::Point2f { x, y } => Some((*x, *y)),
            _ => None,
        }
    }

    /// `(width, height)`.
    pub fn as_size(&self) -> Option<(i64, i64)> {
        match self {
            SettingsValue::Size { width, height } => Some((*width, *height)),
            _ => None,
        }
    }
}

impl From<bool> for SettingsValue {
    fn from(v: bool) -> Self {
        SettingsValue::Bool(v)
    }
}

impl From<i64> for SettingsValue {
    fn from(v: i64) -> Self {
        SettingsValue::Int(v)
    }
}

impl From<f64> for SettingsValue {
    fn from(v: f64) -> Self {
        SettingsValue::Float(v)
    }
}

impl From<&str> for SettingsValue {
    fn from(v: &str) -> Self {
        SettingsValue::Str(v.to_string())
    }
}

impl From<String> for SettingsValue {
    fn from(v: String) -> Self {
        SettingsValue::Str(v)
    }
}

/// Section -> key -> value store with typed, defaulting scalar reads.
///
/// Scalar reads are strict: a key stored as an `Int` does not satisfy
/// `float_of`, the fallback is returned instead. Engines that want
/// coercion must do it themselves. Compound values go through [`get`]
/// and the [`SettingsValue`] extractors.
///
/// [`get`]: SettingsProvider::get
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SettingsProvider {
    sections: BTreeMap<String, BTreeMap<String, SettingsValue>>,
}

impl SettingsProvider {
    /// Empty provider; every defaulting read returns its fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file. Fails fast when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        let provider = toml::from_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine settings");
        Ok(provider)
    }

    /// Write the current state as TOML.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<SettingsValue>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&SettingsValue> {
        self.sections.get(section)?.get(key)
    }

    pub fn remove(&mut self, section: &str, key: &str) -> Option<SettingsValue> {
        let sec = self.sections.get_mut(section)?;
        let removed = sec.remove(key);
        if sec.is_empty() {
            self.sections.remove(section);
        }
        removed
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, SettingsValue>)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self, section: &str) -> impl Iterator<Item = &str> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|sec| sec.keys().map(|k| k.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn bool_of(&self, section: &str, key: &str, fallback: bool) -> bool {
        self.get(section, key)
            .and_then(SettingsValue::as_bool)
            .unwrap_or(fallback)
    }

    pub fn int_of(&self, section: &str, key: &str, fallback: i64) -> i64 {
        self.get(section, key)
            .and_then(SettingsValue::as_int)
            .unwrap_or(fallback)
    }

    pub fn float_of(&self, section: &str, key: &str, fallback: f64) -> f64 {
        self.get(section, key)
            .and_then(SettingsValue::as_float)
            .unwrap_or(fallback)
    }

    pub fn str_of(&self, section: &str, key: &str, fallback: &str) -> String {
        self.get(section, key)
            .and_then(SettingsValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Merge another provider over this one; `other` wins on conflicts.
    pub fn merge(&mut self, other: &SettingsProvider) {
        for (section, params) in &other.sections {
            let target = self.sections.entry(section.clone()).or_default();
            for (key, value) in params {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut s = SettingsProvider::new();
        s.set("TrackEngine::Other", "detector-step", 7i64);
        assert_eq!(
            s.get("TrackEngine::Other", "detector-step"),
            Some(&SettingsValue::Int(7))
        );
    }

    #[test]
    fn test_scalar_reads_with_fallbacks() {
        let mut s = SettingsProvider::new();
        s.set("quality", "threshold", 0.5f64);
        s.set("quality", "enabled", true);
        s.set("quality", "mode", "strict");

        assert_eq!(s.float_of("quality", "threshold", 0.0), 0.5);
        assert!(s.bool_of("quality", "enabled", false));
        assert_eq!(s.str_of("quality", "mode", "lax"), "strict");
        assert_eq!(s.int_of("quality", "missing", 42), 42);
    }

    #[test]
    fn test_scalar_reads_are_strict() {
        let mut s = SettingsProvider::new();
        s.set("sec", "count", 3i64);
        // An Int does not satisfy a float read.
        assert_eq!(s.float_of("sec", "count", 9.0), 9.0);
        assert_eq!(s.int_of("sec", "count", 0), 3);
    }

    #[test]
    fn test_value_extractors_are_strict() {
        let v = SettingsValue::Int(3);
        assert_eq!(v.as_int(), Some(3));
        assert_eq!(v.as_float(), None);
        assert_eq!(v.as_bool(), None);

        let r = SettingsValue::Rect { x: 1, y: 2, width: 3, height: 4 };
        assert_eq!(r.as_rect(), Some((1, 2, 3, 4)));
        assert_eq!(r.as_size(), None);
    }

    #[test]
    fn test_parse_all_value_kinds() {
        let text = r#"
            [detector]
            enabled = true
            step = 7
            threshold = 0.85
            model = "front-v2"
            roi = { x = 10, y = 20, width = 320, height = 240 }
            anchor = { x = 4, y = 8 }
            offset = { x = 0.5, y = -1.5 }
            input = { width = 640, height = 480 }
        "#;
        let s: SettingsProvider = toml::from_str(text).unwrap();

        assert_eq!(s.get("detector", "enabled"), Some(&SettingsValue::Bool(true)));
        assert_eq!(s.get("detector", "step"), Some(&SettingsValue::Int(7)));
        assert_eq!(
            s.get("detector", "threshold"),
            Some(&SettingsValue::Float(0.85))
        );
        assert_eq!(
            s.get("detector", "model"),
            Some(&SettingsValue::Str("front-v2".to_string()))
        );
        assert_eq!(
            s.get("detector", "roi").and_then(SettingsValue::as_rect),
            Some((10, 20, 320, 240))
        );
        assert_eq!(
            s.get("detector", "anchor").and_then(SettingsValue::as_point2i),
            Some((4, 8))
        );
        assert_eq!(
            s.get("detector", "offset").and_then(SettingsValue::as_point2f),
            Some((0.5, -1.5))
        );
        assert_eq!(
            s.get("detector", "input").and_then(SettingsValue::as_size),
            Some((640, 480))
        );
    }

    #[test]
    fn test_rect_wins_over_size_for_full_tables() {
        // A table with all four rect fields must never decode as a size.
        let text = "[s]\nv = { x = 1, y = 2, width = 3, height = 4 }\n";
        let s: SettingsProvider = toml::from_str(text).unwrap();
        assert!(matches!(s.get("s", "v"), Some(SettingsValue::Rect { .. })));
    }

    #[test]
    fn test_int_point_wins_over_float_point() {
        let text = "[s]\nv = { x = 1, y = 2 }\n";
        let s: SettingsProvider = toml::from_str(text).unwrap();
        assert!(matches!(s.get("s", "v"), Some(SettingsValue::Point2i { .. })));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut s = SettingsProvider::new();
        s.set("detector", "step", 7i64);
        s.set("detector", "threshold", 0.85f64);
        s.set("liveness", "enabled", true);
        s.set("liveness", "offset", SettingsValue::Point2f { x: 0.5, y: -1.5 });
        s.save(&path).unwrap();

        let loaded = SettingsProvider::load(&path).unwrap();
        assert_eq!(loaded, s);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SettingsProvider::load(Path::new("/nonexistent/engine.toml"));
        assert!(matches!(result, Err(SettingsError::NotFound(_))));
    }

    #[test]
    fn test_load_unparsable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[detector\nstep = ").unwrap();
        assert!(matches!(
            SettingsProvider::load(&path),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_remove_drops_empty_section() {
        let mut s = SettingsProvider::new();
        s.set("sec", "a", 1i64);
        assert_eq!(s.remove("sec", "a"), Some(SettingsValue::Int(1)));
        assert!(s.is_empty());
    }

    #[test]
    fn test_keys_iteration() {
        let mut s = SettingsProvider::new();
        s.set("sec", "b", 2i64);
        s.set("sec", "a", 1i64);
        let keys: Vec<&str> = s.keys("sec").collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(s.keys("absent").count(), 0);
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = SettingsProvider::new();
        base.set("sec", "a", 1i64);
        base.set("sec", "b", 2i64);

        let mut over = SettingsProvider::new();
        over.set("sec", "b", 20i64);
        over.set("other", "c", 3i64);

        base.merge(&over);
        assert_eq!(base.int_of("sec", "a", 0), 1);
        assert_eq!(base.int_of("sec", "b", 0), 20);
        assert_eq!(base.int_of("other", "c", 0), 3);
    }
}
