//! [`KeyId`]: the canonical identifier for a key chord. Always built in `shift+ctrl+alt+<key>`
//! order, lowercase, so two ids for the same chord are always `==` regardless of how each was
//! constructed.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(String);

impl KeyId {
    /// Builds an id from modifier flags and a lowercase base key name
    /// (`"c"`, `"enter"`, `"f1"`, ...). The only constructor `decode`
    /// itself uses, so decoded ids are always in canonical order by
    /// construction.
    pub fn build(modifiers: Modifiers, key: &str) -> Self {
        let mut parts = Vec::with_capacity(4);
        if modifiers.shift {
            parts.push("shift");
        }
        if modifiers.ctrl {
            parts.push("ctrl");
        }
        if modifiers.alt {
            parts.push("alt");
        }
        let key = key.to_lowercase();
        parts.push(key.as_str());
        KeyId(parts.join("+"))
    }

    /// Parses a user-facing binding string (extension keymaps, settings)
    /// into canonical form. Modifier tokens may appear in any order in the
    /// input; the result is always re-canonicalized, so `KeyId::parse`
    /// validates that every modifier token is recognized and that exactly
    /// one base key remains, rather than requiring the caller to already
    /// know the canonical order.
    pub fn parse(raw: &str) -> Result<Self, KeyIdError> {
        let raw = raw.trim().to_lowercase();
        if raw.is_empty() {
            return Err(KeyIdError::Empty);
        }
        let mut tokens: Vec<&str> = raw.split('+').collect();
        let key = tokens.pop().filter(|k| !k.is_empty()).ok_or_else(|| KeyIdError::MissingKey(raw.clone()))?;

        let mut modifiers = Modifiers::default();
        for token in tokens {
            match token {
                "shift" => modifiers.shift = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                other => return Err(KeyIdError::UnknownModifier(other.to_string())),
            }
        }
        Ok(KeyId::build(modifiers, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum KeyIdError {
    #[error("empty key binding")]
    Empty,
    #[error("binding {0:?} has no key after its modifiers")]
    MissingKey(String),
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
}
