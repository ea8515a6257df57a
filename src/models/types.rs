use std::fmt;

use serde::de::value::StringDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum Grade {
    #[serde(rename = "Prathom 5")]
    Prathom5,
    #[serde(rename = "Prathom 6")]
    Prathom6,
}

impl Grade {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Prathom5 => "Prathom 5",
            Self::Prathom6 => "Prathom 6",
        }
    }

    /// Abbreviation used on printed reports.
    pub(crate) fn short_label(self) -> &'static str {
        match self {
            Self::Prathom5 => "ป.5",
            Self::Prathom6 => "ป.6",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum Room {
    #[serde(rename = "Room 1")]
    Room1,
    #[serde(rename = "Room 2")]
    Room2,
    #[serde(rename = "Room 3")]
    Room3,
    #[serde(rename = "Room 4")]
    Room4,
}

impl Room {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Room1 => "Room 1",
            Self::Room2 => "Room 2",
            Self::Room3 => "Room 3",
            Self::Room4 => "Room 4",
        }
    }

    pub(crate) fn number(self) -> u8 {
        match self {
            Self::Room1 => 1,
            Self::Room2 => 2,
            Self::Room3 => 3,
            Self::Room4 => 4,
        }
    }

    pub(crate) fn local_label(self) -> String {
        format!("ห้อง {}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum ActivityType {
    #[serde(rename = "Sports Day")]
    SportsDay,
    #[serde(rename = "Children Day")]
    ChildrenDay,
}

impl ActivityType {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::SportsDay => "Sports Day",
            Self::ChildrenDay => "Children Day",
        }
    }

    pub(crate) fn report_heading(self) -> &'static str {
        match self {
            Self::SportsDay => "กิจกรรมกีฬาสี 🏃",
            Self::ChildrenDay => "กิจกรรมวันเด็ก 🎈",
        }
    }

    /// What the reviewer is looking for in this activity's videos.
    pub(crate) fn review_focus(self) -> &'static str {
        match self {
            Self::SportsDay => "movement skills shown during the school sports day",
            Self::ChildrenDay => "creative expression in a children's day performance",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum ReviewStatus {
    #[default]
    Pending,
    Graded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum StatusFilter {
    #[default]
    All,
    Pending,
    Graded,
}

impl StatusFilter {
    pub(crate) fn admits(self, status: ReviewStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == ReviewStatus::Pending,
            Self::Graded => status == ReviewStatus::Graded,
        }
    }
}

/// A filter dimension that is either unrestricted (`"All"`) or pinned to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope<T> {
    All,
    Only(T),
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Scope<T> {
    pub(crate) fn admits(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

impl<T: Serialize> Serialize for Scope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("All"),
            Self::Only(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Scope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let value: StringDeserializer<D::Error> = trimmed.to_string().into_deserializer();
        T::deserialize(value).map(Self::Only)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
