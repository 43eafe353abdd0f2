//! Text normalization applied to extracted text before it becomes an element.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: &[(&str, &str)] = &[
    ("\u{FB00}", "ff"),
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    ("\u{FB05}", "st"),
    ("\u{FB06}", "st"),
];

/// Cleanup rules shared by every backend.
pub struct TextCleaner {
    hyphenation: Regex,
    inline_space: Regex,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            hyphenation: Regex::new(r"([A-Za-z])-[ \t]*\n[ \t]*([a-z])").expect("valid regex"),
            inline_space: Regex::new(r"[ \t\u{00A0}]+").expect("valid regex"),
        }
    }

    /// Shared instance.
    pub fn global() -> &'static TextCleaner {
        static CLEANER: OnceLock<TextCleaner> = OnceLock::new();
        CLEANER.get_or_init(TextCleaner::new)
    }

    /// Character-level cleanup: NFC, ligatures, private-use and replacement characters.
    pub fn normalize_chars(&self, text: &str) -> String {
        let mut result: String = text.nfc().collect();
        for (ligature, replacement) in LIGATURES {
            result = result.replace(ligature, replacement);
        }
        result
            .chars()
            .filter(|c| !is_private_use(*c) && *c != '\u{FFFD}' && (*c == '\n' || !c.is_control()))
            .collect()
    }

    /// Clean a multi-line text block.
    ///
    /// Lines are trimmed and blank lines dropped; words split across a line
    /// break with a hyphen are rejoined.
    pub fn clean_block(&self, text: &str) -> String {
        let text = self.normalize_chars(text);
        let text = self.hyphenation.replace_all(&text, "$1$2");
        text.lines()
            .map(|line| self.inline_space.replace_all(line.trim(), " ").to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clean a single-line value such as a table cell.
    pub fn clean_inline(&self, text: &str) -> String {
        let text = self.normalize_chars(text);
        self.inline_space
            .replace_all(&text.replace('\n', " "), " ")
            .trim()
            .to_string()
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_private_use(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

/// Count alphanumeric characters, the measure used for "non-trivial" text.
pub fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}
