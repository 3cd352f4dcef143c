//! Language definitions and detection

use serde::{Deserialize, Serialize};

/// Languages the assistant can converse in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ar")]
    Arabic,
}

impl Language {
    /// BCP-47-ish short tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Arabic => "ar",
        }
    }

    /// Parse a language tag, case-insensitive
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Some(Language::English),
            "ar" | "arabic" => Some(Language::Arabic),
            _ => None,
        }
    }

    /// Detect the language of a text by script
    ///
    /// Any Arabic-block character classifies the text as Arabic; pure Latin
    /// text is English. Everything else falls back to Arabic, matching the
    /// deployment's primary audience.
    pub fn detect(text: &str) -> Self {
        let has_arabic = text
            .chars()
            .any(|c| ('\u{0600}'..='\u{06FF}').contains(&c) || ('\u{0750}'..='\u{077F}').contains(&c));
        if has_arabic {
            return Language::Arabic;
        }

        let has_latin = text.chars().any(|c| c.is_ascii_alphabetic());
        if has_latin {
            Language::English
        } else {
            Language::Arabic
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-chunk language preference carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguagePreference {
    /// Let the transcriber detect the language
    #[default]
    Auto,
    /// Force a specific language
    Fixed(Language),
}

impl LanguagePreference {
    /// Parse the wire value ("auto" or a language tag)
    ///
    /// Unknown tags degrade to auto-detection rather than failing the chunk.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("auto") {
            return LanguagePreference::Auto;
        }
        match Language::from_tag(value) {
            Some(lang) => LanguagePreference::Fixed(lang),
            None => LanguagePreference::Auto,
        }
    }

    pub fn fixed(&self) -> Option<Language> {
        match self {
            LanguagePreference::Fixed(lang) => Some(*lang),
            LanguagePreference::Auto => None,
        }
    }
}
