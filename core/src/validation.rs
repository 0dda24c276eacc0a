//! Argument patterns for participant commands.

use std::sync::LazyLock;

use regex::Regex;

static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w{1,25}$").expect("answer pattern is valid"));

static NICKNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w{3,25}$").expect("nickname pattern is valid"));

/// 1 to 25 word characters (letters, digits, underscore).
pub fn is_valid_answer(value: &str) -> bool {
    ANSWER_RE.is_match(value)
}

/// 3 to 25 word characters.
pub fn is_valid_nickname(value: &str) -> bool {
    NICKNAME_RE.is_match(value)
}

/// Matches short event identifiers of a fixed width.
#[derive(Debug, Clone)]
pub struct EventIdPattern {
    re: Regex,
}

impl EventIdPattern {
    pub fn new(digits: u32) -> Self {
        Self {
            re: Regex::new(&format!(r"^\d{{{digits}}}$")).expect("event id pattern is valid"),
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.re.is_match(value)
    }
}

impl Default for EventIdPattern {
    fn default() -> Self {
        Self::new(4)
    }
}
