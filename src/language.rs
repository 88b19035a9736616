//! Per-turn reply language detection.
//!
//! The assistant answers in the language of the *current* turn, not of the
//! conversation: a user may switch between Arabic and English mid-session and
//! every prompt-construction step receives the tag detected for that turn.

use serde::{Deserialize, Serialize};

/// Reply language for one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Ar,
}

impl Lang {
    /// Tags a turn as Arabic when the text contains at least one character in
    /// the Arabic Unicode block, English otherwise.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text
            .chars()
            .any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
        {
            Lang::Ar
        } else {
            Lang::En
        }
    }

    /// Lowercase tag used in logs and serialized turn records.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ar => "ar",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_arabic_block() {
        assert_eq!(Lang::detect("أبحث عن شقة في القاهرة"), Lang::Ar);
        assert_eq!(Lang::detect("what are the market trends?"), Lang::En);
    }

    #[test]
    fn single_arabic_char_is_enough() {
        assert_eq!(Lang::detect("price of ش?"), Lang::Ar);
    }

    #[test]
    fn empty_and_symbols_default_to_english() {
        assert_eq!(Lang::detect(""), Lang::En);
        assert_eq!(Lang::detect("123 !?"), Lang::En);
    }
}
