use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Rating,
    Downloads,
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Rating => "rating",
            SortField::Downloads => "downloads",
            SortField::CreatedAt => "created_at",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "rating" => Some(Self::Rating),
            "downloads" => Some(Self::Downloads),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    /// Permissive parse: unknown values fall back to the default sort
    /// instead of failing the request.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::from_str).unwrap_or(Self::Rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::from_str).unwrap_or(Self::Desc)
    }
}

/// Filter/sort/pagination parameters for a catalog listing. Absent filters
/// are no-ops; present filters narrow the set with AND semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub min_rating: Option<f64>,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RuleQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            author: None,
            min_rating: None,
            sort: SortField::Rating,
            order: SortOrder::Desc,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl RuleQuery {
    /// Clamp a requested limit into `[1, MAX_LIMIT]`, defaulting when absent.
    pub fn clamp_limit(limit: Option<i64>) -> i64 {
        match limit {
            Some(value) if value > MAX_LIMIT => MAX_LIMIT,
            Some(value) if value >= 1 => value,
            Some(_) => DEFAULT_LIMIT,
            None => DEFAULT_LIMIT,
        }
    }

    pub fn clamp_offset(offset: Option<i64>) -> i64 {
        offset.filter(|value| *value >= 0).unwrap_or(0)
    }
}
