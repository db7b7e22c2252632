//! Built-in `/command` dispatch. Checked before falling through to an extension-registered
//! [`kestrel_extensions::Command`], the same precedence the keymap gives reserved bindings over
//! extension shortcuts.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    Model,
    Sessions,
    Help,
    New,
    Tree,
    Compact,
}

pub fn parse_builtin(name: &str) -> Option<BuiltinCommand> {
    match name {
        "model" => Some(BuiltinCommand::Model),
        "sessions" => Some(BuiltinCommand::Sessions),
        "help" => Some(BuiltinCommand::Help),
        "new" => Some(BuiltinCommand::New),
        "tree" => Some(BuiltinCommand::Tree),
        "compact" => Some(BuiltinCommand::Compact),
        _ => None,
    }
}

/// Splits a `/command args...` line into its command name and argument
/// remainder. `line` is the text after the leading `/`.
pub fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_command_and_args() {
        assert_eq!(split_command("model claude-sonnet"), ("model", "claude-sonnet"));
    }

    #[test]
    fn command_without_args_has_empty_remainder() {
        assert_eq!(split_command("help"), ("help", ""));
    }

    #[test]
    fn unknown_name_is_not_a_builtin() {
        assert_eq!(parse_builtin("deploy"), None);
    }
}
