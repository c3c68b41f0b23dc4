//! Setting values and the ordered settings map carried by test packages.
//!
//! A setting is a named configuration value attached to a package node. The
//! value side is a small tagged variant rather than a dynamic `Any` box, so a
//! typed read either matches the stored variant or fails at the call site
//! with [`SettingError::TypeMismatch`]. Insertion order is preserved because
//! it defines the attribute order of the persisted XML form.

use std::fmt;

use thiserror::Error;

/// Well-known setting keys shared between clients and engine modules.
pub mod keys {
    /// Directory the engine should use for run artefacts.
    pub const WORK_DIRECTORY: &str = "WorkDirectory";
    /// Trace level requested for the engine's internal logging.
    pub const INTERNAL_TRACE_LEVEL: &str = "InternalTraceLevel";
}

/// A single setting value.
///
/// Values restored from the XML form are always [`SettingValue::Str`]; the
/// round-trip is intentionally lossy for the other variants.
///
/// # Examples
///
/// ```
/// use testengine_api::SettingValue;
///
/// let value = SettingValue::from(30);
/// assert_eq!(value.to_string(), "30");
/// assert_eq!(value.kind(), "int");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// A text value; also the type of every value read back from XML.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
}

impl SettingValue {
    /// Returns the variant name used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Types that can be read back out of a stored [`SettingValue`].
///
/// Conversion is strict variant matching: an `Int` never parses out of a
/// `Str`, so values demoted to strings by an XML round-trip fail a typed
/// read rather than silently coercing.
pub trait FromSetting: Sized {
    /// Variant name expected by this type, used in mismatch diagnostics.
    const EXPECTED: &'static str;

    /// Attempts the conversion, returning `None` on a variant mismatch.
    fn from_setting(value: &SettingValue) -> Option<Self>;
}

impl FromSetting for String {
    const EXPECTED: &'static str = "string";

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromSetting for i64 {
    const EXPECTED: &'static str = "int";

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromSetting for i32 {
    const EXPECTED: &'static str = "int";

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(i) => Self::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromSetting for bool {
    const EXPECTED: &'static str = "bool";

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Error raised by typed setting access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    /// The stored value's variant does not match the requested type.
    #[error("setting `{name}` holds a {actual} value, not {expected}")]
    TypeMismatch {
        /// Name of the setting that was read.
        name: String,
        /// Variant the caller asked for.
        expected: &'static str,
        /// Variant actually stored.
        actual: &'static str,
    },
}

/// An insertion-ordered map of unique setting names to values.
///
/// Lookup ignores order; serialization does not, so replacing an existing
/// key keeps its original position.
///
/// # Examples
///
/// ```
/// use testengine_api::Settings;
///
/// let mut settings = Settings::new();
/// settings.insert("Timeout", 30);
/// settings.insert("Verbose", true);
/// settings.insert("Timeout", 60);
/// let names: Vec<&str> = settings.iter().map(|(name, _)| name).collect();
/// assert_eq!(names, ["Timeout", "Verbose"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, SettingValue)>,
}

impl Settings {
    /// Creates an empty settings map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Stores `value` under `name`, overwriting any previous value while
    /// keeping the key's original insertion position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SettingValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the stored value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Copies every entry of `other` into this map, overwriting collisions.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, value) in other.iter() {
            self.insert(name, value.clone());
        }
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of stored settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{FromSetting, SettingValue, Settings};

    #[test]
    fn insert_replaces_in_place() {
        let mut settings = Settings::new();
        settings.insert("A", 1);
        settings.insert("B", 2);
        settings.insert("A", 3);
        let entries: Vec<(&str, String)> = settings
            .iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        assert_eq!(
            entries,
            [("A", "3".to_owned()), ("B", "2".to_owned())]
        );
    }

    #[test]
    fn extend_from_overwrites_collisions() {
        let mut child = Settings::new();
        child.insert("Shared", "child");
        child.insert("Own", true);
        let mut parent = Settings::new();
        parent.insert("Shared", "parent");
        child.extend_from(&parent);
        assert_eq!(child.get("Shared"), Some(&SettingValue::from("parent")));
        assert_eq!(child.get("Own"), Some(&SettingValue::Bool(true)));
    }

    #[test]
    fn typed_reads_are_strict() {
        assert_eq!(i64::from_setting(&SettingValue::Int(7)), Some(7));
        assert_eq!(i64::from_setting(&SettingValue::from("7")), None);
        assert_eq!(bool::from_setting(&SettingValue::from("true")), None);
        assert_eq!(
            String::from_setting(&SettingValue::from("x")),
            Some("x".to_owned())
        );
    }

    #[test]
    fn display_matches_xml_conversion() {
        assert_eq!(SettingValue::from(true).to_string(), "true");
        assert_eq!(SettingValue::from(-4).to_string(), "-4");
        assert_eq!(SettingValue::from("plain").to_string(), "plain");
    }
}
