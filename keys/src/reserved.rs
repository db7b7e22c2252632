//! Shortcuts the shell keeps for itself: extensions and user keymaps may bind anything else, but
//! never override these.

use std::sync::LazyLock;

use crate::key_id::KeyId;

const RESERVED_LITERALS: &[&str] = &[
    "ctrl+c",
    "ctrl+d",
    "ctrl+z",
    "ctrl+k",
    "ctrl+p",
    "ctrl+l",
    "ctrl+o",
    "ctrl+t",
    "ctrl+g",
    "shift+tab",
    "shift+ctrl+p",
    "alt+enter",
    "escape",
    "enter",
];

#[allow(clippy::expect_used)]
pub static RESERVED: LazyLock<Vec<KeyId>> = LazyLock::new(|| {
    RESERVED_LITERALS
        .iter()
        .map(|raw| KeyId::parse(raw).expect("reserved id literal is valid"))
        .collect()
});

pub fn is_reserved(id: &KeyId) -> bool {
    RESERVED.iter().any(|reserved| reserved == id)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn ctrl_c_is_reserved() {
        assert!(is_reserved(&KeyId::parse("ctrl+c").expect("parse")));
    }

    #[test]
    fn plain_letter_is_not_reserved() {
        assert!(!is_reserved(&KeyId::parse("a").expect("parse")));
    }

    #[test]
    fn reserved_set_is_internally_valid() {
        assert_eq!(RESERVED.len(), RESERVED_LITERALS.len());
    }
}
