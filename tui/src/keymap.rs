//! Maps the reserved `KeyId`s (`kestrel_keys::RESERVED`) to named shell
//! actions. Anything not in this table falls through to an extension-registered shortcut
//! (`ExtensionRuntime::shortcut`) and finally to the focused component.

use kestrel_keys::{KeyId, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// First press aborts a running turn (or is a no-op if idle); two
    /// presses within 500ms exit the program.
    InterruptOrExit,
    /// Exits if the editor is empty; otherwise a no-op.
    ExitIfEmpty,
    Suspend,
    CommandPalette,
    SessionBrowser,
    ModelPicker,
    FullRedraw,
    NewSession,
    ToggleTreeOverview,
    ToggleHelp,
    CycleSteeringMode,
    InsertNewline,
    Cancel,
    Submit,
}

/// The fixed binding table. Built from `KeyId::build`, which is infallible,
/// so this never needs to handle a parse error at startup.
pub fn default_bindings() -> Vec<(KeyId, Action)> {
    let m = |ctrl: bool, shift: bool, alt: bool, key: &str| KeyId::build(Modifiers { shift, ctrl, alt }, key);
    vec![
        (m(true, false, false, "c"), Action::InterruptOrExit),
        (m(true, false, false, "d"), Action::ExitIfEmpty),
        (m(true, false, false, "z"), Action::Suspend),
        (m(true, false, false, "k"), Action::CommandPalette),
        (m(true, false, false, "p"), Action::SessionBrowser),
        (m(true, false, false, "l"), Action::FullRedraw),
        (m(true, false, false, "o"), Action::NewSession),
        (m(true, false, false, "t"), Action::ToggleTreeOverview),
        (m(true, false, false, "g"), Action::ToggleHelp),
        (m(true, true, false, "p"), Action::ModelPicker),
        (m(false, true, false, "tab"), Action::CycleSteeringMode),
        (m(false, false, true, "enter"), Action::InsertNewline),
        (m(false, false, false, "escape"), Action::Cancel),
        (m(false, false, false, "enter"), Action::Submit),
    ]
}

pub struct Keymap {
    bindings: Vec<(KeyId, Action)>,
}

impl Keymap {
    pub fn new() -> Self {
        Keymap { bindings: default_bindings() }
    }

    pub fn resolve(&self, id: &KeyId) -> Option<Action> {
        self.bindings.iter().find(|(bound, _)| bound == id).map(|(_, action)| *action)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ctrl_c_to_interrupt_or_exit() {
        let keymap = Keymap::new();
        let id = KeyId::build(Modifiers { shift: false, ctrl: true, alt: false }, "c");
        assert_eq!(keymap.resolve(&id), Some(Action::InterruptOrExit));
    }

    #[test]
    fn every_reserved_id_has_a_binding() {
        let keymap = Keymap::new();
        for id in kestrel_keys::RESERVED.iter() {
            assert!(keymap.resolve(id).is_some(), "no binding for reserved id {id}");
        }
    }

    #[test]
    fn unbound_key_resolves_to_none() {
        let keymap = Keymap::new();
        let id = KeyId::build(Modifiers::default(), "q");
        assert_eq!(keymap.resolve(&id), None);
    }
}
