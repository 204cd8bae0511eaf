//! Normalized identifier keys.
//!
//! [`IdKey`] gives identifiers the NFC-normalized equality that §3/§4.4
//! require: two identifiers collide iff their NFC forms are equal, not iff
//! their raw UTF-8 bytes are equal.

use unicode_normalization::UnicodeNormalization;

/// NFC-normalizes an identifier string per §4.1/§8 (`NFC(NFC(s)) = NFC(s)`).
pub fn nfc(s: &str) -> String {
    s.nfc().collect()
}

/// An identifier key: the NFC form of an identifier string.
///
/// Two identifiers are the same `IdKey` iff their NFC forms are equal,
/// independent of the original (possibly non-normalized) spelling.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct IdKey(String);

impl IdKey {
    pub fn new(raw: &str) -> Self {
        IdKey(nfc(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// §4.4: an identifier is reserved if its NFC form starts with `gen_`
    /// or equals `cursive`.
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with("gen_") || self.0 == "cursive"
    }
}

impl std::fmt::Display for IdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdKey {
    fn from(raw: &str) -> Self {
        IdKey::new(raw)
    }
}

/// An ordered sequence of [`IdKey`]s identifying a module or type path.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Default)]
pub struct PathKey(pub Vec<IdKey>);

impl PathKey {
    pub fn new(components: Vec<IdKey>) -> Self {
        PathKey(components)
    }

    pub fn from_strs(components: &[&str]) -> Self {
        PathKey(components.iter().map(|c| IdKey::new(c)).collect())
    }

    /// §4.4: a path is reserved if any component is reserved.
    pub fn is_reserved(&self) -> bool {
        self.0.iter().any(IdKey::is_reserved)
    }

    pub fn head(&self) -> Option<&IdKey> {
        self.0.first()
    }

    pub fn tail(&self) -> PathKey {
        PathKey(self.0.iter().skip(1).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All but the final component — the owning module of a qualified
    /// value or type path.
    pub fn init(&self) -> PathKey {
        let len = self.0.len().saturating_sub(1);
        PathKey(self.0[..len].to_vec())
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        write!(f, "{}", parts.join("::"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idkey_nfc_idempotence() {
        // Combining ring above 'a' (U+00E5) vs 'a' + combining ring (U+0061 U+030A)
        let composed = "\u{00e5}";
        let decomposed = "a\u{030a}";
        assert_eq!(IdKey::new(composed), IdKey::new(decomposed));
        assert_eq!(nfc(&nfc(composed)), nfc(composed));
    }

    #[test]
    fn idkey_reserved_gen_prefix() {
        assert!(IdKey::new("gen_foo").is_reserved());
        assert!(!IdKey::new("generic").is_reserved());
    }

    #[test]
    fn idkey_reserved_cursive_literal() {
        assert!(IdKey::new("cursive").is_reserved());
        assert!(!IdKey::new("cursiveFoo").is_reserved());
    }

    #[test]
    fn pathkey_reserved_propagates_from_any_component() {
        let path = PathKey::from_strs(&["a", "gen_b", "c"]);
        assert!(path.is_reserved());
        let clean = PathKey::from_strs(&["a", "b", "c"]);
        assert!(!clean.is_reserved());
    }

    #[test]
    fn pathkey_display_joins_with_double_colon() {
        let path = PathKey::from_strs(&["a", "b", "c"]);
        assert_eq!(path.to_string(), "a::b::c");
    }

    #[test]
    fn pathkey_head_and_tail() {
        let path = PathKey::from_strs(&["a", "b", "c"]);
        assert_eq!(path.head().unwrap().as_str(), "a");
        assert_eq!(path.tail(), PathKey::from_strs(&["b", "c"]));
    }

    #[test]
    fn pathkey_init_drops_last_component() {
        let path = PathKey::from_strs(&["a", "b", "c"]);
        assert_eq!(path.init(), PathKey::from_strs(&["a", "b"]));
        assert_eq!(PathKey::from_strs(&["a"]).init(), PathKey::new(vec![]));
    }
}
