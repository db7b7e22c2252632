//! Binding matching: a binding is a symbolic id or a list of them; `matches` tests canonical
//! equality after decode.

use crate::key_id::KeyId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Single(KeyId),
    AnyOf(Vec<KeyId>),
}

impl Binding {
    pub fn single(id: KeyId) -> Self {
        Binding::Single(id)
    }

    pub fn any_of(ids: impl IntoIterator<Item = KeyId>) -> Self {
        Binding::AnyOf(ids.into_iter().collect())
    }
}

/// `true` if the decoded `input` satisfies `binding`.
pub fn matches(input: &KeyId, binding: &Binding) -> bool {
    match binding {
        Binding::Single(id) => id == input,
        Binding::AnyOf(ids) => ids.iter().any(|id| id == input),
    }
}
