use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{College, Strongest},
    query::{CollegeFilter, SortSpec},
    repository::Repository,
};

pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 3;

/// Comparison
///
/// The compared colleges, in the order their ids were requested, and the per-metric winners.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub colleges: Vec<College>,
    pub strongest: Strongest,
}

/// parse_ids
///
/// Parses the comma-separated `ids` query value. The count is checked before the
/// entries are parsed, so `"a,b,c,d"` reports the count problem rather than a bad id.
pub fn parse_ids(raw: Option<&str>) -> AppResult<Vec<Uuid>> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Please provide college IDs".to_string()))?;

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();

    if !(MIN_COMPARE..=MAX_COMPARE).contains(&parts.len()) {
        return Err(AppError::InvalidRequest(format!(
            "You must compare between {MIN_COMPARE} and {MAX_COMPARE} colleges"
        )));
    }

    parts
        .into_iter()
        .map(|part| {
            Uuid::parse_str(part)
                .map_err(|_| AppError::InvalidRequest(format!("Invalid college ID '{part}'")))
        })
        .collect()
}

/// strongest
///
/// Picks the best college per metric: lowest ranking, lowest fees, highest placement
/// percentage. Colleges without the metric are skipped. On a tie the earlier college in
/// `colleges` wins, so callers control tie-breaking through the input order.
pub fn strongest(colleges: &[College]) -> Strongest {
    Strongest {
        ranking: best_by(colleges, |c| c.ranking.map(f64::from), Better::Lower),
        fees: best_by(colleges, |c| c.fees, Better::Lower),
        placement_percentage: best_by(colleges, |c| c.placement_percentage, Better::Higher),
    }
}

#[derive(Clone, Copy)]
enum Better {
    Lower,
    Higher,
}

fn best_by(
    colleges: &[College],
    metric: impl Fn(&College) -> Option<f64>,
    better: Better,
) -> Option<Uuid> {
    let mut best: Option<(Uuid, f64)> = None;

    for college in colleges {
        let Some(value) = metric(college) else {
            continue;
        };
        let improves = match (best, better) {
            (None, _) => true,
            // Strict comparison keeps the first occurrence on ties.
            (Some((_, current)), Better::Lower) => value < current,
            (Some((_, current)), Better::Higher) => value > current,
        };
        if improves {
            best = Some((college.id, value));
        }
    }

    best.map(|(id, _)| id)
}

/// Reorders fetched colleges to follow the requested id order.
fn in_requested_order(ids: &[Uuid], mut fetched: Vec<College>) -> Vec<College> {
    let mut ordered = Vec::with_capacity(fetched.len());
    for id in ids {
        if let Some(pos) = fetched.iter().position(|c| c.id == *id) {
            ordered.push(fetched.swap_remove(pos));
        }
    }
    ordered
}

/// compare_colleges
///
/// Fetches the published colleges among `ids` and computes the strongest value per metric.
/// Fails with `NotFound` when none of the ids resolve to a published college; a partial
/// match is compared as-is.
pub async fn compare_colleges(repo: &dyn Repository, ids: Vec<Uuid>) -> AppResult<Comparison> {
    let limit = i64::try_from(ids.len()).unwrap_or(i64::MAX);
    let filter = CollegeFilter::published_ids(ids.clone());

    let (fetched, _) = repo
        .query_colleges(&filter, &SortSpec::default(), 0, limit)
        .await?;

    if fetched.is_empty() {
        return Err(AppError::NotFound("Colleges not found".to_string()));
    }

    let colleges = in_requested_order(&ids, fetched);
    let strongest = strongest(&colleges);

    Ok(Comparison {
        colleges,
        strongest,
    })
}
