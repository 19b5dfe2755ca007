use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A target language tag such as `fr`, `es` or `pt-BR`.
///
/// Accepted shape: a 2-3 letter primary subtag followed by optional
/// `-`-separated alphanumeric subtags of 1-8 characters. Tags compare
/// case-insensitively, so every subtag is folded to its canonical case:
/// a 2-letter region upper-case (`pt-br` → `pt-BR`), a 4-letter script
/// title-case (`zh-hant` → `zh-Hant`), everything else lower-case. After a
/// singleton (`x-...`) every subtag is lower-case. `_` is never valid, which
/// keeps `{video_id}_{lang}` file names unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid language code '{0}'")]
pub struct InvalidLanguageCode(pub String);

impl LanguageCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidLanguageCode> {
        let raw = raw.trim();
        let mut parts = raw.split('-');

        let primary = parts.next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidLanguageCode(raw.to_string()));
        }

        let mut normalized = primary.to_ascii_lowercase();
        let mut after_singleton = false;
        for subtag in parts {
            if !(1..=8).contains(&subtag.len()) || !subtag.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(InvalidLanguageCode(raw.to_string()));
            }
            normalized.push('-');
            normalized.push_str(&canonical_subtag(subtag, after_singleton));
            after_singleton |= subtag.len() == 1;
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonical_subtag(subtag: &str, after_singleton: bool) -> String {
    let alphabetic = subtag.chars().all(|c| c.is_ascii_alphabetic());
    match subtag.len() {
        _ if after_singleton || !alphabetic => subtag.to_ascii_lowercase(),
        2 => subtag.to_ascii_uppercase(),
        4 => {
            let (head, tail) = subtag.split_at(1);
            head.to_ascii_uppercase() + &tail.to_ascii_lowercase()
        }
        _ => subtag.to_ascii_lowercase(),
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LanguageCode {
    type Err = InvalidLanguageCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = InvalidLanguageCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fr", "fr")]
    #[case("ES", "es")]
    #[case("pt-BR", "pt-BR")]
    #[case(" de ", "de")]
    #[case("yue", "yue")]
    #[case("zh-Hant-TW", "zh-Hant-TW")]
    #[case("pt-br", "pt-BR")]
    #[case("PT-br", "pt-BR")]
    #[case("zh-hant", "zh-Hant")]
    #[case("ZH-HANT-tw", "zh-Hant-TW")]
    #[case("es-419", "es-419")]
    #[case("sl-ROZAJ", "sl-rozaj")]
    #[case("en-x-Custom-AB", "en-x-custom-ab")]
    fn parses_and_normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(LanguageCode::parse(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("pt-BR", "pt-br")]
    #[case("zh-Hant", "ZH-HANT")]
    #[case("fr", "FR")]
    fn case_variants_are_the_same_language(#[case] a: &str, #[case] b: &str) {
        assert_eq!(LanguageCode::parse(a).unwrap(), LanguageCode::parse(b).unwrap());
    }

    #[rstest]
    #[case::empty("")]
    #[case::one_letter("f")]
    #[case::too_long("fren")]
    #[case::underscore("pt_BR")]
    #[case::digit_primary("f1")]
    #[case::empty_subtag("en-")]
    #[case::path("../fr")]
    fn rejects_malformed(#[case] raw: &str) {
        assert!(LanguageCode::parse(raw).is_err());
    }
}
