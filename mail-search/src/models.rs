//! Wire types for the mail search endpoint
//!
//! Field names follow the JSON contract of `POST /api/mails/search`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// How free-text terms are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// Result ordering by date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Date comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
}

/// Date filter: compare mail dates against `date` (no filtering when `date` is unset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "operator")]
    pub comparator: Comparator,
}

impl DateFilter {
    pub fn new(date: Option<DateTime<Utc>>, comparator: Comparator) -> Self {
        Self { date, comparator }
    }
}

/// Request body sent to the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub query: String,
    #[serde(rename = "type")]
    pub combinator: Combinator,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "orderBy")]
    pub sort_order: SortOrder,
    #[serde(rename = "dateSearch")]
    pub date_search: Option<DateFilter>,
}

/// A single mail record. Every field is opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date: String,
}

/// `data` section of a search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailPage {
    #[serde(default)]
    pub mails: Option<Vec<Mail>>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Response envelope returned by the API
///
/// `status` mirrors the body field; callers should prefer the transport status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// Error message reported by the server, ignoring empty strings
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// The server emits numeric ids; older exports use strings.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

impl FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(format!("unknown combinator '{}' (expected AND or OR)", other)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{}' (expected asc or desc)", other)),
        }
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "gt" => Ok(Self::GreaterThan),
            ">=" | "ge" => Ok(Self::GreaterThanOrEqual),
            "<" | "lt" => Ok(Self::LessThan),
            "<=" | "le" => Ok(Self::LessThanOrEqual),
            other => Err(format!("unknown operator '{}'", other)),
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}
