use std::{cmp::Ordering, str::FromStr};

use serde::{Deserialize, Deserializer, de};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{College, CollegeStatus},
};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

// --- Query Parameters ---

/// ListCollegesParams
///
/// Raw query parameters accepted by `GET /api/colleges`. Every member is optional;
/// `into_query` turns them into a typed `ListingQuery`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCollegesParams {
    /// Case-insensitive substring of the college name.
    pub search: Option<String>,
    /// Comma-separated list; a college matches if its location contains any entry.
    pub location: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_fees: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_fees: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_ranking: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_ranking: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_placement: Option<f64>,
    /// 1-based page number. Defaults to 1.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<u32>,
    /// Page size. Defaults to 10, capped at 100.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<u32>,
    /// Fields separated by commas or spaces; prefix with `-` for descending.
    /// Defaults to `-createdAt`.
    pub sort: Option<String>,
}

impl ListCollegesParams {
    /// into_query
    ///
    /// Builds the listing predicate. Each filter is independent and ANDed with the
    /// others; only the location list is an internal OR. The result is always
    /// restricted to published colleges.
    pub fn into_query(self) -> Result<ListingQuery, AppError> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }

        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse::<SortSpec>().map_err(AppError::Validation)?,
            None => SortSpec::default(),
        };

        let filter = CollegeFilter {
            status: Some(CollegeStatus::Published),
            ids: None,
            name_contains: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            location_any: self.location.as_deref().map(split_locations).unwrap_or_default(),
            fees: NumericRange::new(self.min_fees, self.max_fees),
            ranking: NumericRange::new(self.min_ranking, self.max_ranking),
            placement: NumericRange::new(self.min_placement, None),
        };

        Ok(ListingQuery {
            filter,
            sort,
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }
}

/// Reads a numeric query value, treating `?minFees=` the same as an absent parameter.
/// Anything else that is present must parse.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

fn split_locations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .map(str::to_string)
        .collect()
}

/// ListingQuery
///
/// A fully resolved listing request: what to match, how to order, which page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filter: CollegeFilter,
    pub sort: SortSpec,
    pub page: u32,
    pub limit: u32,
}

impl ListingQuery {
    /// Number of matching records to skip: `(page - 1) * limit`.
    pub fn skip(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

// --- Predicate ---

/// NumericRange
///
/// Optional inclusive bounds. An absent bound imposes no constraint, but a record whose
/// metric is unset never satisfies a present bound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> NumericRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: Option<T>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// CollegeFilter
///
/// The typed predicate understood by every `Repository` implementation. The Postgres
/// repository renders it to SQL; the in-memory repository evaluates `matches` directly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollegeFilter {
    pub status: Option<CollegeStatus>,
    pub ids: Option<Vec<Uuid>>,
    pub name_contains: Option<String>,
    /// Empty means no location constraint.
    pub location_any: Vec<String>,
    pub fees: NumericRange<f64>,
    pub ranking: NumericRange<i32>,
    pub placement: NumericRange<f64>,
}

impl CollegeFilter {
    /// Published colleges among `ids`. Used by the comparison endpoint.
    pub fn published_ids(ids: Vec<Uuid>) -> Self {
        Self {
            status: Some(CollegeStatus::Published),
            ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn matches(&self, college: &College) -> bool {
        if self.status.is_some_and(|status| college.status != status) {
            return false;
        }

        if let Some(ids) = &self.ids {
            if !ids.contains(&college.id) {
                return false;
            }
        }

        if let Some(needle) = &self.name_contains {
            if !contains_ignore_case(&college.name, needle) {
                return false;
            }
        }

        if !self.location_any.is_empty() {
            let Some(location) = college.location.as_deref() else {
                return false;
            };
            if !self
                .location_any
                .iter()
                .any(|needle| contains_ignore_case(location, needle))
            {
                return false;
            }
        }

        self.fees.contains(college.fees)
            && self.ranking.contains(college.ranking)
            && self.placement.contains(college.placement_percentage)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// --- Ordering ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Location,
    Ranking,
    Fees,
    PlacementPercentage,
    CreatedAt,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "location" => Some(Self::Location),
            "ranking" => Some(Self::Ranking),
            "fees" => Some(Self::Fees),
            "placementPercentage" => Some(Self::PlacementPercentage),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    /// SQL expression the Postgres repository orders by.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "LOWER(name)",
            Self::Location => "LOWER(location)",
            Self::Ranking => "ranking",
            Self::Fees => "fees",
            Self::PlacementPercentage => "placement_percentage",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    fn compare(&self, a: &College, b: &College) -> Ordering {
        let dir = self.direction;
        match self.field {
            SortField::Name => dir.apply(a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            SortField::Location => nulls_last(
                a.location.as_deref().map(str::to_lowercase),
                b.location.as_deref().map(str::to_lowercase),
                dir,
                |x, y| x.cmp(y),
            ),
            SortField::Ranking => nulls_last(a.ranking, b.ranking, dir, |x, y| x.cmp(y)),
            SortField::Fees => nulls_last(a.fees, b.fees, dir, |x, y| x.total_cmp(y)),
            SortField::PlacementPercentage => nulls_last(
                a.placement_percentage,
                b.placement_percentage,
                dir,
                |x, y| x.total_cmp(y),
            ),
            SortField::CreatedAt => dir.apply(a.created_at.cmp(&b.created_at)),
        }
    }
}

// Unset values sort after set ones in both directions, matching `NULLS LAST`.
fn nulls_last<T>(
    a: Option<T>,
    b: Option<T>,
    direction: SortDirection,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => direction.apply(cmp(&x, &y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// SortSpec
///
/// An ordered list of sort keys. Ordering is always completed with `id` ascending so
/// that the overall order is total and consecutive pages never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn compare(&self, a: &College, b: &College) -> Ordering {
        self.0
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

impl Default for SortSpec {
    /// Most recently created first.
    fn default() -> Self {
        Self(vec![SortKey {
            field: SortField::CreatedAt,
            direction: SortDirection::Descending,
        }])
    }
}

impl FromStr for SortSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut keys = Vec::new();

        for token in raw.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let (direction, name) = match token.strip_prefix('-') {
                Some(name) => (SortDirection::Descending, name),
                None => (SortDirection::Ascending, token.strip_prefix('+').unwrap_or(token)),
            };
            let field = SortField::parse(name)
                .ok_or_else(|| format!("Unsupported sort field '{name}'"))?;
            keys.push(SortKey { field, direction });
        }

        if keys.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(keys))
    }
}
