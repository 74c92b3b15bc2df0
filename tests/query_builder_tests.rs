use chrono::{Duration, Utc};
use college_directory::{
    AppError,
    models::{College, CollegeStatus},
    query::{
        CollegeFilter, ListCollegesParams, MAX_LIMIT, NumericRange, SortDirection, SortField,
        SortSpec,
    },
};
use uuid::Uuid;

fn college(name: &str) -> College {
    College {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        status: CollegeStatus::Published,
        ..Default::default()
    }
}

// --- Parameters -> Query ---

#[test]
fn test_defaults() {
    let query = ListCollegesParams::default().into_query().unwrap();

    assert_eq!(query.page, 1);
    assert_eq!(query.limit, 10);
    assert_eq!(query.skip(), 0);
    assert_eq!(query.sort, SortSpec::default());
    assert_eq!(query.filter.status, Some(CollegeStatus::Published));
}

#[test]
fn test_skip_and_limit_cap() {
    let query = ListCollegesParams {
        page: Some(3),
        limit: Some(500),
        ..Default::default()
    }
    .into_query()
    .unwrap();

    assert_eq!(query.limit, MAX_LIMIT);
    assert_eq!(query.skip(), 200);
}

#[test]
fn test_zero_page_or_limit_is_rejected() {
    let zero_page = ListCollegesParams {
        page: Some(0),
        ..Default::default()
    }
    .into_query();
    let zero_limit = ListCollegesParams {
        limit: Some(0),
        ..Default::default()
    }
    .into_query();

    assert!(matches!(zero_page, Err(AppError::Validation(_))));
    assert!(matches!(zero_limit, Err(AppError::Validation(_))));
}

#[test]
fn test_blank_search_and_locations_are_ignored() {
    let query = ListCollegesParams {
        search: Some("   ".to_string()),
        location: Some(" , Delhi ,, ".to_string()),
        ..Default::default()
    }
    .into_query()
    .unwrap();

    assert_eq!(query.filter.name_contains, None);
    assert_eq!(query.filter.location_any, vec!["Delhi".to_string()]);
}

// --- Predicate ---

#[test]
fn test_numeric_range_semantics() {
    let range = NumericRange::new(Some(1000.0), Some(5000.0));

    assert!(range.contains(Some(1000.0)));
    assert!(range.contains(Some(5000.0)));
    assert!(!range.contains(Some(999.99)));
    assert!(!range.contains(None));

    let open: NumericRange<f64> = NumericRange::new(None, None);
    assert!(open.is_unbounded());
    assert!(open.contains(None));
}

#[test]
fn test_filter_is_conjunction_with_location_disjunction() {
    let filter = ListCollegesParams {
        search: Some("tech".to_string()),
        location: Some("pune,bangalore".to_string()),
        min_ranking: Some(1),
        max_ranking: Some(50),
        min_placement: Some(80.0),
        ..Default::default()
    }
    .into_query()
    .unwrap()
    .filter;

    let mut hit = college("Pune Institute of Technology");
    hit.location = Some("Pune, Maharashtra".to_string());
    hit.ranking = Some(20);
    hit.placement_percentage = Some(85.0);
    assert!(filter.matches(&hit));

    let mut wrong_city = hit.clone();
    wrong_city.location = Some("Chennai".to_string());
    assert!(!filter.matches(&wrong_city));

    let mut no_city = hit.clone();
    no_city.location = None;
    assert!(!filter.matches(&no_city));

    let mut low_placement = hit.clone();
    low_placement.placement_percentage = Some(79.9);
    assert!(!filter.matches(&low_placement));

    let mut draft = hit.clone();
    draft.status = CollegeStatus::Draft;
    assert!(!filter.matches(&draft));

    let mut other_name = hit.clone();
    other_name.name = "Pune Arts College".to_string();
    assert!(!filter.matches(&other_name));
}

#[test]
fn test_published_ids_filter() {
    let a = college("A");
    let b = college("B");
    let filter = CollegeFilter::published_ids(vec![a.id]);

    assert!(filter.matches(&a));
    assert!(!filter.matches(&b));
}

// --- Ordering ---

#[test]
fn test_sort_parsing() {
    let order: SortSpec = "ranking,-fees placementPercentage".parse().unwrap();
    let keys: Vec<(SortField, SortDirection)> =
        order.keys().iter().map(|k| (k.field, k.direction)).collect();

    assert_eq!(
        keys,
        vec![
            (SortField::Ranking, SortDirection::Ascending),
            (SortField::Fees, SortDirection::Descending),
            (SortField::PlacementPercentage, SortDirection::Ascending),
        ]
    );

    assert_eq!("".parse::<SortSpec>().unwrap(), SortSpec::default());
    assert_eq!(
        "popularity".parse::<SortSpec>().unwrap_err(),
        "Unsupported sort field 'popularity'"
    );
}

#[test]
fn test_sort_puts_unset_values_last_in_both_directions() {
    let mut cheap = college("Cheap");
    cheap.fees = Some(100.0);
    let mut dear = college("Dear");
    dear.fees = Some(900.0);
    let unknown = college("Unknown");

    let ascending: SortSpec = "fees".parse().unwrap();
    let mut list = vec![unknown.clone(), dear.clone(), cheap.clone()];
    list.sort_by(|a, b| ascending.compare(a, b));
    let names: Vec<&str> = list.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Cheap", "Dear", "Unknown"]);

    let descending: SortSpec = "-fees".parse().unwrap();
    list.sort_by(|a, b| descending.compare(a, b));
    let names: Vec<&str> = list.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Dear", "Cheap", "Unknown"]);
}

#[test]
fn test_default_sort_is_newest_first_with_id_tiebreak() {
    let now = Utc::now();
    let mut older = college("Older");
    older.created_at = now - Duration::days(1);
    let mut newer = college("Newer");
    newer.created_at = now;
    let mut twin = college("Twin");
    twin.created_at = now;

    let order = SortSpec::default();
    let mut list = vec![older.clone(), twin.clone(), newer.clone()];
    list.sort_by(|a, b| order.compare(a, b));

    assert_eq!(list[2].name, "Older");
    // Equal timestamps fall back to id order.
    assert!(list[0].id < list[1].id);
}

#[test]
fn test_name_sort_ignores_case() {
    let order: SortSpec = "name".parse().unwrap();
    let mut list = vec![college("beta"), college("Alpha"), college("Gamma")];
    list.sort_by(|a, b| order.compare(a, b));

    let names: Vec<&str> = list.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);
}
