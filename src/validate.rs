//! Input validation for user-entered text.

use std::sync::OnceLock;

use regex::Regex;

/// Event name length bounds, counted in characters.
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;

/// Why an event name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name must be at least {NAME_MIN_CHARS} characters")]
    TooShort,

    #[error("name must be at most {NAME_MAX_CHARS} characters")]
    TooLong,

    /// Offending characters, deduplicated in first-seen order.
    #[error("name contains unsupported characters: {}", format_chars(.0))]
    InvalidChars(Vec<char>),
}

fn format_chars(chars: &[char]) -> String {
    chars
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn disallowed_name_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^\u{4e00}-\u{9fff}A-Za-z0-9 _-]").expect("valid name charset regex")
    })
}

/// Validate an event name: 2–20 characters from {CJK ideographs, ASCII
/// letters, digits, space, underscore, hyphen}.
pub fn validate_event_name(name: &str) -> Result<(), NameError> {
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(NameError::TooShort);
    }
    if len > NAME_MAX_CHARS {
        return Err(NameError::TooLong);
    }

    let mut offending: Vec<char> = Vec::new();
    for m in disallowed_name_chars().find_iter(name) {
        for ch in m.as_str().chars() {
            if !offending.contains(&ch) {
                offending.push(ch);
            }
        }
    }
    if offending.is_empty() {
        Ok(())
    } else {
        Err(NameError::InvalidChars(offending))
    }
}

/// Normalize inbound free text: trim, collapse whitespace runs to a single
/// space, strip zero-width characters.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        match ch {
            '\u{200B}'..='\u{200D}' | '\u{FEFF}' => {}
            c if c.is_whitespace() => pending_space = true,
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    out
}
