//! ANSI-aware width measurement. A hand-rolled scanner rather than a full terminal-emulator parser:
//! it only needs to (a) skip CSI/OSC escape sequences when measuring width and (b) split a styled
//! line at a target visible-width boundary while carrying escape sequences through untouched.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Removes CSI (`ESC [ ... final-byte`) and OSC (`ESC ] ... BEL-or-ST`)
/// escape sequences, leaving only the characters a terminal would actually
/// paint.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '\u{7}' {
                        break;
                    }
                    if next == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Visible width of `line`, ignoring embedded escape sequences.
pub fn visible_width(line: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(line).as_str())
}

/// Splits `line` at the first point its visible width would exceed
/// `target`, passing every escape sequence through into the prefix
/// unconditionally (sequences carry no width of their own). Returns
/// `(prefix, suffix)`.
#[allow(clippy::expect_used)]
pub fn split_at_visible_width(line: &str, target: usize) -> (String, String) {
    let mut prefix = String::new();
    let mut width_so_far = 0usize;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            prefix.push(c);
            match chars.peek() {
                Some('[') => {
                    prefix.push(chars.next().expect("peeked Some"));
                    while let Some(next) = chars.next() {
                        prefix.push(next);
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    prefix.push(chars.next().expect("peeked Some"));
                    while let Some(next) = chars.next() {
                        prefix.push(next);
                        if next == '\u{7}' {
                            break;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        let width = UnicodeWidthChar::width(c).unwrap_or(0);
        if width_so_far + width > target {
            // `c` doesn't fit in the remaining budget; it belongs to the suffix.
            let rest: String = std::iter::once(c).chain(chars).collect();
            return (prefix, rest);
        }
        prefix.push(c);
        width_so_far += width;
        if width_so_far == target {
            let rest: String = chars.collect();
            return (prefix, rest);
        }
    }
    (prefix, String::new())
}

/// Pads `s` with trailing spaces until its visible width reaches `target`.
/// A no-op if `s` is already at or past `target`.
pub fn pad_to_width(s: &str, target: usize) -> String {
    let current = visible_width(s);
    if current >= target {
        return s.to_string();
    }
    let mut out = s.to_string();
    out.push_str(&" ".repeat(target - current));
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn strips_csi_sequences() {
        assert_eq!(strip_ansi("\x1b[1mhello\x1b[0m"), "hello");
    }

    #[test]
    fn strips_osc_sequences_terminated_by_bel() {
        assert_eq!(strip_ansi("\x1b]0;title\x07rest"), "rest");
    }

    #[test]
    fn visible_width_ignores_styling() {
        assert_eq!(visible_width("\x1b[31mhi\x1b[0m"), 2);
    }

    #[test]
    fn visible_width_counts_wide_chars() {
        assert_eq!(visible_width("好"), 2);
    }

    #[test]
    fn split_respects_plain_text_boundary() {
        let (prefix, suffix) = split_at_visible_width("hello world", 5);
        assert_eq!(prefix, "hello");
        assert_eq!(suffix, " world");
    }

    #[test]
    fn split_carries_escape_sequences_into_prefix() {
        let (prefix, suffix) = split_at_visible_width("\x1b[1mhi\x1b[0m there", 2);
        assert_eq!(prefix, "\x1b[1mhi\x1b[0m");
        assert_eq!(suffix, " there");
    }

    #[test]
    fn pad_to_width_adds_trailing_spaces() {
        assert_eq!(pad_to_width("ab", 5), "ab   ");
        assert_eq!(pad_to_width("abcdef", 3), "abcdef");
    }
}
