use crate::models::{College, CollegeStatus, CollegeUpdate, Course, NewCollege, User};
use crate::query::{CollegeFilter, NumericRange, SortSpec};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// RepositoryError
///
/// Failures surfaced by any `Repository` implementation. `Duplicate` names the unique
/// field that rejected the write (`"slug"` or `"email"`) so callers can decide whether the
/// condition is retryable.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// The sole owner of persisted state. Handlers and the slug/query/comparison components
/// only ever see this trait, never a concrete database handle, so tests substitute the
/// in-memory implementation below.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    // Fails with Duplicate("email") if the address is taken.
    async fn create_user(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    // --- Colleges ---
    // Fails with Duplicate("slug") if another college holds the slug.
    async fn create_college(&self, college: NewCollege) -> Result<College, RepositoryError>;
    // Lookups ignore status; visibility is the caller's decision.
    async fn find_college_by_slug(&self, slug: &str) -> Result<Option<College>, RepositoryError>;
    async fn find_college_by_id(&self, id: Uuid) -> Result<Option<College>, RepositoryError>;
    async fn update_college(&self, id: Uuid, update: CollegeUpdate) -> Result<College, RepositoryError>;
    async fn delete_college(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Returns one page of colleges matching `filter` ordered by `sort`, together with the
    /// total number of matches ignoring `skip`/`limit`.
    async fn query_colleges(
        &self,
        filter: &CollegeFilter,
        sort: &SortSpec,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<College>, i64), RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const COLLEGE_COLUMNS: &str = "id, name, slug, location, ranking, fees, placement_percentage, \
     courses, eligibility, image, status, description, website, created_at, updated_at";

/// CollegeRow
///
/// Raw `colleges` row. Courses live in a JSONB column and are unwrapped on conversion.
#[derive(Debug, FromRow)]
struct CollegeRow {
    id: Uuid,
    name: String,
    slug: String,
    location: Option<String>,
    ranking: Option<i32>,
    fees: Option<f64>,
    placement_percentage: Option<f64>,
    courses: Json<Vec<Course>>,
    eligibility: Option<String>,
    image: Option<String>,
    status: CollegeStatus,
    description: Option<String>,
    website: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CollegeRow> for College {
    fn from(row: CollegeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            location: row.location,
            ranking: row.ranking,
            fees: row.fees,
            placement_percentage: row.placement_percentage,
            courses: row.courses.0,
            eligibility: row.eligibility,
            image: row.image,
            status: row.status,
            description: row.description,
            website: row.website,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Uniqueness of `colleges.slug` and `users.email` is enforced by unique indexes
/// (see `migrations/`), which is what makes concurrent slug races detectable.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates a unique-index violation into `Duplicate(field)`; everything else is a
/// database failure.
fn map_write_error(err: sqlx::Error, field: &'static str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Duplicate(field);
        }
    }
    RepositoryError::Database(err)
}

/// Wraps `needle` for a literal, case-insensitive substring match under `ILIKE`.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_range<'a, T>(builder: &mut QueryBuilder<'a, Postgres>, column: &str, range: &NumericRange<T>)
where
    T: 'a + Copy + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres>,
{
    if let Some(min) = range.min {
        builder.push(format!(" AND {column} >= ")).push_bind(min);
    }
    if let Some(max) = range.max {
        builder.push(format!(" AND {column} <= ")).push_bind(max);
    }
}

/// push_filter
///
/// Renders a `CollegeFilter` as a WHERE clause using bound parameters only.
/// Column names come from fixed strings, never from request input.
fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &CollegeFilter) {
    builder.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }

    if let Some(ids) = &filter.ids {
        builder.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }

    if let Some(needle) = &filter.name_contains {
        builder.push(" AND name ILIKE ").push_bind(like_pattern(needle));
    }

    if !filter.location_any.is_empty() {
        builder.push(" AND (");
        {
            let mut any_location = builder.separated(" OR ");
            for location in &filter.location_any {
                any_location.push("location ILIKE ");
                any_location.push_bind_unseparated(like_pattern(location));
            }
        }
        builder.push(")");
    }

    push_range(builder, "fees", &filter.fees);
    push_range(builder, "ranking", &filter.ranking);
    push_range(builder, "placement_percentage", &filter.placement);
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, sort: &SortSpec) {
    builder.push(" ORDER BY ");
    for key in sort.keys() {
        builder.push(format!(
            "{} {} NULLS LAST, ",
            key.field.column(),
            key.direction.keyword()
        ));
    }
    builder.push("id ASC");
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// Inserts the credential record. The unique index on `email` turns a concurrent
    /// double registration into `Duplicate("email")`.
    async fn create_user(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, name, email, password_hash, role, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, name, email, password_hash, role, created_at"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "email"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_college
    ///
    /// Inserts a fully resolved college. Courses are written as a single JSONB value.
    async fn create_college(&self, college: NewCollege) -> Result<College, RepositoryError> {
        let query = format!(
            "INSERT INTO colleges (id, name, slug, location, ranking, fees, placement_percentage, \
             courses, eligibility, image, status, description, website, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW()) \
             RETURNING {COLLEGE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, CollegeRow>(&query)
            .bind(Uuid::new_v4())
            .bind(college.name)
            .bind(college.slug)
            .bind(college.location)
            .bind(college.ranking)
            .bind(college.fees)
            .bind(college.placement_percentage)
            .bind(Json(college.courses))
            .bind(college.eligibility)
            .bind(college.image)
            .bind(college.status)
            .bind(college.description)
            .bind(college.website)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "slug"))?;

        Ok(row.into())
    }

    async fn find_college_by_slug(&self, slug: &str) -> Result<Option<College>, RepositoryError> {
        let query = format!("SELECT {COLLEGE_COLUMNS} FROM colleges WHERE slug = $1");
        let row = sqlx::query_as::<_, CollegeRow>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(College::from))
    }

    async fn find_college_by_id(&self, id: Uuid) -> Result<Option<College>, RepositoryError> {
        let query = format!("SELECT {COLLEGE_COLUMNS} FROM colleges WHERE id = $1");
        let row = sqlx::query_as::<_, CollegeRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(College::from))
    }

    /// update_college
    ///
    /// Partial update using `COALESCE` so only provided fields change. The slug is never
    /// part of an update.
    async fn update_college(&self, id: Uuid, update: CollegeUpdate) -> Result<College, RepositoryError> {
        let fields = update.fields;
        let query = format!(
            "UPDATE colleges \
             SET name = COALESCE($2, name), \
                 location = COALESCE($3, location), \
                 ranking = COALESCE($4, ranking), \
                 fees = COALESCE($5, fees), \
                 placement_percentage = COALESCE($6, placement_percentage), \
                 courses = COALESCE($7, courses), \
                 eligibility = COALESCE($8, eligibility), \
                 image = COALESCE($9, image), \
                 status = COALESCE($10, status), \
                 description = COALESCE($11, description), \
                 website = COALESCE($12, website), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLLEGE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, CollegeRow>(&query)
            .bind(id)
            .bind(fields.name)
            .bind(fields.location)
            .bind(fields.ranking)
            .bind(fields.fees)
            .bind(fields.placement_percentage)
            .bind(fields.courses.map(Json))
            .bind(fields.eligibility)
            .bind(update.image)
            .bind(fields.status)
            .bind(fields.description)
            .bind(fields.website)
            .fetch_optional(&self.pool)
            .await?;

        row.map(College::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete_college(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM colleges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// query_colleges
    ///
    /// Builds the count and page queries from the same filter with `QueryBuilder`, so the
    /// reported total always agrees with the predicate used for the page.
    async fn query_colleges(
        &self,
        filter: &CollegeFilter,
        sort: &SortSpec,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<College>, i64), RepositoryError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM colleges");
        push_filter(&mut count_builder, filter);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLLEGE_COLUMNS} FROM colleges"));
        push_filter(&mut builder, filter);
        push_order(&mut builder, sort);
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(skip);

        let rows = builder
            .build_query_as::<CollegeRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(College::from).collect(), total))
    }
}

// --- In-Memory (tests and local development without a database) ---

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory. It enforces the same uniqueness rules
/// as the Postgres schema and evaluates `CollegeFilter`/`SortSpec` directly, so handler
/// tests observe the same behaviour without a database.
///
/// `created_at` is strictly increasing in insertion order, which keeps the default
/// newest-first ordering deterministic even when inserts share a clock tick.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<Vec<User>>,
    colleges: RwLock<Vec<College>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a college exactly as given, bypassing slug allocation. Test seeding only;
    /// the caller is responsible for slug uniqueness.
    pub async fn seed_college(&self, college: College) {
        self.colleges.write().await.push(college);
    }

    pub async fn college_count(&self) -> usize {
        self.colleges.read().await.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate("email"));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_college(&self, college: NewCollege) -> Result<College, RepositoryError> {
        let mut colleges = self.colleges.write().await;
        if colleges.iter().any(|c| c.slug == college.slug) {
            return Err(RepositoryError::Duplicate("slug"));
        }

        let mut now = Utc::now();
        if let Some(latest) = colleges.iter().map(|c| c.created_at).max() {
            if now <= latest {
                now = latest + Duration::microseconds(1);
            }
        }

        let created = College {
            id: Uuid::new_v4(),
            name: college.name,
            slug: college.slug,
            location: college.location,
            ranking: college.ranking,
            fees: college.fees,
            placement_percentage: college.placement_percentage,
            courses: college.courses,
            eligibility: college.eligibility,
            image: college.image,
            status: college.status,
            description: college.description,
            website: college.website,
            created_at: now,
            updated_at: now,
        };
        colleges.push(created.clone());
        Ok(created)
    }

    async fn find_college_by_slug(&self, slug: &str) -> Result<Option<College>, RepositoryError> {
        let colleges = self.colleges.read().await;
        Ok(colleges.iter().find(|c| c.slug == slug).cloned())
    }

    async fn find_college_by_id(&self, id: Uuid) -> Result<Option<College>, RepositoryError> {
        let colleges = self.colleges.read().await;
        Ok(colleges.iter().find(|c| c.id == id).cloned())
    }

    async fn update_college(&self, id: Uuid, update: CollegeUpdate) -> Result<College, RepositoryError> {
        let mut colleges = self.colleges.write().await;
        let college = colleges
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;

        let fields = update.fields;
        if let Some(name) = fields.name {
            college.name = name;
        }
        if fields.location.is_some() {
            college.location = fields.location;
        }
        if fields.ranking.is_some() {
            college.ranking = fields.ranking;
        }
        if fields.fees.is_some() {
            college.fees = fields.fees;
        }
        if fields.placement_percentage.is_some() {
            college.placement_percentage = fields.placement_percentage;
        }
        if let Some(courses) = fields.courses {
            college.courses = courses;
        }
        if fields.eligibility.is_some() {
            college.eligibility = fields.eligibility;
        }
        if update.image.is_some() {
            college.image = update.image;
        }
        if let Some(status) = fields.status {
            college.status = status;
        }
        if fields.description.is_some() {
            college.description = fields.description;
        }
        if fields.website.is_some() {
            college.website = fields.website;
        }
        college.updated_at = Utc::now();

        Ok(college.clone())
    }

    async fn delete_college(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut colleges = self.colleges.write().await;
        let before = colleges.len();
        colleges.retain(|c| c.id != id);
        if colleges.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn query_colleges(
        &self,
        filter: &CollegeFilter,
        sort: &SortSpec,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<College>, i64), RepositoryError> {
        let colleges = self.colleges.read().await;

        let mut matching: Vec<College> = colleges
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let skip = usize::try_from(skip.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        let page = matching.into_iter().skip(skip).take(limit).collect();
        Ok((page, total))
    }
}
