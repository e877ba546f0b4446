use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Kind of title tracked by the progress store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaType {
    /// Movie media type
    Movie,
    /// Series media type
    Series,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "series" | "tv" | "show" => Ok(MediaType::Series),
            _ => Err(ModelError::UnknownMediaType(raw.to_string())),
        }
    }
}
