//! Flat watch-history records written before the structured item format.
//!
//! These records only identify a title by its name, release year and the
//! provider-local `media_id`. They are read once during reconciliation and are
//! never written back.

use std::fmt::{self, Display};

use crate::media_type::MediaType;

/// Release year as recorded by older clients.
///
/// Early builds stored a plain number, later ones a date (`"2009-05-01"`) or a
/// range for running shows (`"2009-2011"`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum LegacyYear {
    Number(i64),
    Text(String),
}

impl Display for LegacyYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegacyYear::Number(year) => write!(f, "{year}"),
            LegacyYear::Text(raw) => f.write_str(raw),
        }
    }
}

impl From<i64> for LegacyYear {
    fn from(year: i64) -> Self {
        LegacyYear::Number(year)
    }
}

impl From<&str> for LegacyYear {
    fn from(raw: &str) -> Self {
        LegacyYear::Text(raw.to_string())
    }
}

/// One flat watch-history entry.
///
/// Ids were written as numbers by some clients and as numeric strings by
/// others; both forms are read.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LegacyItem {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient::id"))]
    pub media_id: u64,
    pub media_type: MediaType,
    pub percentage: f64,
    pub progress: f64,
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::string_or_null")
    )]
    pub provider_id: String,
    pub title: String,
    pub year: LegacyYear,
    /// Season number (1-based) for series entries.
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            deserialize_with = "lenient::optional_number",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub season_id: Option<u32>,
    /// Episode number (1-based) within the season for series entries.
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            deserialize_with = "lenient::optional_number",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub episode_id: Option<u32>,
}

#[cfg(feature = "serde")]
mod lenient {
    use serde::Deserialize;
    use serde::de::{Deserializer, Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Integer(u64),
        Float(f64),
        Text(String),
    }

    impl NumberOrText {
        fn is_blank(&self) -> bool {
            matches!(self, NumberOrText::Text(raw) if raw.trim().is_empty())
        }

        fn into_u64<E: Error>(self) -> Result<u64, E> {
            match self {
                NumberOrText::Integer(value) => Ok(value),
                NumberOrText::Float(value)
                    if value >= 0.0
                        && value.fract() == 0.0
                        && value < u64::MAX as f64 =>
                {
                    Ok(value as u64)
                }
                NumberOrText::Float(value) => {
                    Err(E::custom(format!("invalid numeric id {value}")))
                }
                NumberOrText::Text(raw) => raw.trim().parse().map_err(|_| {
                    E::custom(format!("invalid numeric id {raw:?}"))
                }),
            }
        }
    }

    pub fn id<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        NumberOrText::deserialize(deserializer)?.into_u64()
    }

    /// Null, absent and blank values read as `None`.
    pub fn optional_number<'de, D>(
        deserializer: D,
    ) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<NumberOrText>::deserialize(deserializer)?
        else {
            return Ok(None);
        };
        if raw.is_blank() {
            return Ok(None);
        }

        let value = raw.into_u64()?;
        u32::try_from(value).map(Some).map_err(|_| {
            D::Error::custom(format!("number {value} is out of range"))
        })
    }

    pub fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}

impl LegacyItem {
    pub fn is_series(&self) -> bool {
        self.media_type == MediaType::Series
    }
}

/// Payload body of the legacy schema revision.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegacyData {
    #[cfg_attr(feature = "serde", serde(default))]
    pub items: Vec<LegacyItem>,
}

impl LegacyData {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries belonging to one title, in recorded order.
    pub fn entries_for(
        &self,
        media_id: u64,
    ) -> impl Iterator<Item = &LegacyItem> {
        self.items
            .iter()
            .filter(move |item| item.media_id == media_id)
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn year_accepts_numbers_and_strings() {
        let numeric: LegacyYear = serde_json::from_str("2009").unwrap();
        let dated: LegacyYear = serde_json::from_str("\"2009-05-01\"").unwrap();

        assert_eq!(numeric, LegacyYear::Number(2009));
        assert_eq!(dated.to_string(), "2009-05-01");
    }

    #[test]
    fn series_entry_deserializes_from_camel_case() {
        let json = r#"{
            "mediaId": 7,
            "mediaType": "series",
            "percentage": 12,
            "progress": 300,
            "providerId": "p",
            "title": "Show",
            "year": "2010-2014",
            "seasonId": 2,
            "episodeId": 5
        }"#;
        let item: LegacyItem = serde_json::from_str(json).unwrap();

        assert!(item.is_series());
        assert_eq!(item.season_id, Some(2));
        assert_eq!(item.episode_id, Some(5));
        assert_eq!(item.progress, 300.0);
    }

    #[test]
    fn ids_written_as_strings_are_read_as_numbers() {
        let json = r#"{
            "mediaId": "7",
            "mediaType": "series",
            "percentage": 12,
            "progress": 300,
            "providerId": null,
            "title": "Show",
            "year": 2010,
            "seasonId": "2",
            "episodeId": 3.0
        }"#;
        let item: LegacyItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.media_id, 7);
        assert_eq!(item.season_id, Some(2));
        assert_eq!(item.episode_id, Some(3));
        assert_eq!(item.provider_id, "");
    }

    #[test]
    fn blank_or_null_episode_reads_as_absent() {
        let json = r#"{
            "mediaId": 1,
            "mediaType": "movie",
            "percentage": 0,
            "progress": 0,
            "title": "Up",
            "year": "2009",
            "seasonId": null,
            "episodeId": ""
        }"#;
        let item: LegacyItem = serde_json::from_str(json).unwrap();

        assert!(!item.is_series());
        assert_eq!(item.season_id, None);
        assert_eq!(item.episode_id, None);
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        let json = r#"{
            "mediaId": "abc",
            "mediaType": "movie",
            "percentage": 0,
            "progress": 0,
            "title": "Up",
            "year": "2009"
        }"#;

        assert!(serde_json::from_str::<LegacyItem>(json).is_err());
    }
}
