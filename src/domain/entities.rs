//! Domain entities: organizational units as the hierarchy sees them

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Rendering of `created_at` / `updated_at` on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-unit context blob stored in the cache.
pub type UnitContext = BTreeMap<String, Value>;

/// Closed set of organizational unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    University,
    Faculty,
    School,
    Department,
    Institute,
    ResearchCenter,
    Laboratory,
    Program,
    Division,
    Office,
    Directorate,
}

impl UnitType {
    pub const ALL: [UnitType; 11] = [
        UnitType::University,
        UnitType::Faculty,
        UnitType::School,
        UnitType::Department,
        UnitType::Institute,
        UnitType::ResearchCenter,
        UnitType::Laboratory,
        UnitType::Program,
        UnitType::Division,
        UnitType::Office,
        UnitType::Directorate,
    ];

    /// Wire name, e.g. `RESEARCH_CENTER`.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::University => "UNIVERSITY",
            UnitType::Faculty => "FACULTY",
            UnitType::School => "SCHOOL",
            UnitType::Department => "DEPARTMENT",
            UnitType::Institute => "INSTITUTE",
            UnitType::ResearchCenter => "RESEARCH_CENTER",
            UnitType::Laboratory => "LABORATORY",
            UnitType::Program => "PROGRAM",
            UnitType::Division => "DIVISION",
            UnitType::Office => "OFFICE",
            UnitType::Directorate => "DIRECTORATE",
        }
    }

    pub fn is_academic(&self) -> bool {
        matches!(
            self,
            UnitType::Faculty
                | UnitType::School
                | UnitType::Department
                | UnitType::Institute
                | UnitType::ResearchCenter
                | UnitType::Laboratory
                | UnitType::Program
        )
    }

    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            UnitType::University | UnitType::Division | UnitType::Office | UnitType::Directorate
        )
    }

    /// Whether units of this kind can own teaching assignments.
    pub fn can_teach(&self) -> bool {
        matches!(
            self,
            UnitType::Faculty | UnitType::School | UnitType::Department | UnitType::Program
        )
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a unit type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUnitType(pub String);

impl fmt::Display for UnknownUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown unit type: {}", self.0)
    }
}

impl std::error::Error for UnknownUnitType {}

impl FromStr for UnitType {
    type Err = UnknownUnitType;

    /// Case-insensitive; accepts `-` in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        UnitType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownUnitType(s.to_string()))
    }
}

/// Read-only projection of an organizational unit.
///
/// The persistence layer owns the unit; the hierarchy only ever sees this
/// snapshot. Serializes to the snake_case field map consumed by responders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawUnit")]
pub struct UnitSnapshot {
    pub id: i64,
    pub name: String,
    pub unit_type: UnitType,
    pub parent_id: Option<i64>,
    pub parent_name: Option<String>,
    /// Materialized ancestry, e.g. `/1/4/12`
    pub hierarchy_path: String,
    pub level: u32,
    pub children_count: usize,
    pub is_active: bool,
    pub is_academic: bool,
    pub is_administrative: bool,
    pub is_teaching: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl UnitSnapshot {
    /// Active root-level unit; classification flags follow the unit type.
    pub fn new(id: i64, name: impl Into<String>, unit_type: UnitType) -> Self {
        Self {
            id,
            name: name.into(),
            unit_type,
            parent_id: None,
            parent_name: None,
            hierarchy_path: format!("/{id}"),
            level: 0,
            children_count: 0,
            is_active: true,
            is_academic: unit_type.is_academic(),
            is_administrative: unit_type.is_administrative(),
            is_teaching: unit_type.can_teach(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Attach to `parent`, deriving path and level from it.
    pub fn with_parent(mut self, parent: &UnitSnapshot) -> Self {
        self.parent_id = Some(parent.id);
        self.parent_name = Some(parent.name.clone());
        self.hierarchy_path = format!("{}/{}", parent.hierarchy_path, self.id);
        self.level = parent.level + 1;
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_timestamps(mut self, created_at: NaiveDateTime, updated_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self
    }

    /// Snake_case field map, timestamps formatted as `YYYY-MM-DD HH:MM:SS`.
    pub fn to_fields(&self) -> Map<String, Value> {
        let fmt_ts = |ts: &Option<NaiveDateTime>| match ts {
            Some(ts) => Value::String(ts.format(TIMESTAMP_FORMAT).to_string()),
            None => Value::Null,
        };

        let mut fields = Map::new();
        fields.insert("id".into(), json!(self.id));
        fields.insert("name".into(), json!(self.name));
        fields.insert("type".into(), json!(self.unit_type.as_str()));
        fields.insert("parent_id".into(), json!(self.parent_id));
        fields.insert("parent_name".into(), json!(self.parent_name));
        fields.insert("hierarchy_path".into(), json!(self.hierarchy_path));
        fields.insert("level".into(), json!(self.level));
        fields.insert("children_count".into(), json!(self.children_count));
        fields.insert("is_active".into(), json!(self.is_active));
        fields.insert("is_academic".into(), json!(self.is_academic));
        fields.insert("is_administrative".into(), json!(self.is_administrative));
        fields.insert("is_teaching".into(), json!(self.is_teaching));
        fields.insert("created_at".into(), fmt_ts(&self.created_at));
        fields.insert("updated_at".into(), fmt_ts(&self.updated_at));
        fields
    }
}

impl Serialize for UnitSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fields().serialize(serializer)
    }
}

impl fmt::Display for UnitSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] #{}", self.name, self.unit_type, self.id)
    }
}

/// Wire shape accepted on input. Classification flags are optional and
/// default from the unit type.
#[derive(Debug, Deserialize)]
struct RawUnit {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    unit_type: UnitType,
    #[serde(default)]
    parent_id: Option<i64>,
    #[serde(default)]
    parent_name: Option<String>,
    #[serde(default)]
    hierarchy_path: Option<String>,
    #[serde(default)]
    level: u32,
    #[serde(default)]
    children_count: usize,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    is_academic: Option<bool>,
    #[serde(default)]
    is_administrative: Option<bool>,
    #[serde(default)]
    is_teaching: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    updated_at: Option<NaiveDateTime>,
}

fn default_active() -> bool {
    true
}

impl From<RawUnit> for UnitSnapshot {
    fn from(raw: RawUnit) -> Self {
        Self {
            hierarchy_path: raw
                .hierarchy_path
                .unwrap_or_else(|| format!("/{}", raw.id)),
            id: raw.id,
            name: raw.name,
            unit_type: raw.unit_type,
            parent_id: raw.parent_id,
            parent_name: raw.parent_name,
            level: raw.level,
            children_count: raw.children_count,
            is_active: raw.is_active,
            is_academic: raw.is_academic.unwrap_or(raw.unit_type.is_academic()),
            is_administrative: raw
                .is_administrative
                .unwrap_or(raw.unit_type.is_administrative()),
            is_teaching: raw.is_teaching.unwrap_or(raw.unit_type.can_teach()),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

/// Parse a timestamp in `YYYY-MM-DD HH:MM:SS` or RFC 3339 form.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
    }
}
