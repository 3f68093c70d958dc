use crate::error::{ErrorKind, Result};
use crate::{Category, Singer, Software};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display names keyed by ISO 639-1 language code.
///
/// A `BTreeMap` rather than a `HashMap` so canonical snapshot bytes are
/// independent of the key order shard authors happened to write.
pub type NamesMap = BTreeMap<String, String>;

/// A catalog entry of either category.
///
/// Untagged: the two shapes are disambiguated by their required fields
/// (singers carry `owners`/`authors`/`variants`, softwares carry
/// `category`/`developers`), so shard JSON needs no discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Singer(Singer),
    Software(Software),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Singer(s) => &s.id,
            Record::Software(s) => &s.id,
        }
    }

    pub fn names(&self) -> &NamesMap {
        match self {
            Record::Singer(s) => &s.names,
            Record::Software(s) => &s.names,
        }
    }

    /// Which category's snapshot this record belongs in.
    pub fn category(&self) -> Category {
        match self {
            Record::Singer(_) => Category::Singers,
            Record::Software(_) => Category::Softwares,
        }
    }

    /// English name, else the first name in key order, else the id.
    pub fn display_name(&self) -> &str {
        let names = self.names();
        names
            .get("en")
            .or_else(|| names.values().next())
            .map(String::as_str)
            .unwrap_or_else(|| self.id())
    }

    /// Check the shape rules shard authors must follow.
    pub fn validate(&self) -> Result<()> {
        match self {
            Record::Singer(s) => s.validate(),
            Record::Software(s) => s.validate(),
        }
    }
}

/// Ids are globally unique, lowercase, and hyphenated: `[a-z0-9-]+`.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    let well_formed =
        !id.is_empty() && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        exn::bail!(ErrorKind::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Top-level records must be presentable to every reader, so an `en` entry
/// is mandatory.
pub(crate) fn require_english(id: &str, names: &NamesMap) -> Result<()> {
    match names.get("en") {
        Some(name) if !name.is_empty() => Ok(()),
        _ => exn::bail!(ErrorKind::MissingEnglishName(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alice")]
    #[case("alice-v2")]
    #[case("0x0")]
    fn test_valid_ids(#[case] id: &str) {
        assert!(validate_id(id).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("Alice")]
    #[case("alice v2")]
    #[case("ælice")]
    #[case("alice_v2")]
    fn test_invalid_ids(#[case] id: &str) {
        let err = validate_id(id).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidId(id.to_string()));
    }

    #[test]
    fn test_untagged_record_shapes() {
        let singer: Record = serde_json::from_str(
            r#"{
                "id": "alice",
                "names": { "en": "Alice" },
                "owners": ["someone"],
                "authors": ["someone"],
                "variants": [
                    { "id": "alice-cv", "names": { "en": "Alice CV" }, "file_url": null,
                      "download_page_url": "https://example.test/alice" }
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(singer, Record::Singer(_)));
        assert_eq!(singer.category(), Category::Singers);

        let software: Record = serde_json::from_str(
            r#"{
                "id": "openutau",
                "names": { "en": "OpenUtau" },
                "category": "host",
                "developers": ["stakira"]
            }"#,
        )
        .unwrap();
        assert!(matches!(software, Record::Software(_)));
        assert_eq!(software.category(), Category::Softwares);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut names = NamesMap::new();
        names.insert("ja".to_string(), "アリス".to_string());
        let record = Record::Singer(Singer {
            id: "alice".to_string(),
            names,
            owners: vec![],
            authors: vec![],
            homepage_url: None,
            profile_image_url: None,
            variants: vec![],
        });
        // No `en` entry: first value in key order wins.
        assert_eq!(record.display_name(), "アリス");
    }
}
