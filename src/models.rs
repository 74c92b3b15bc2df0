use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Enumerations (Mapped to Postgres enum types) ---

/// Role
///
/// The closed set of account roles. Authorization matches on this exhaustively,
/// so adding a variant forces every gate to decide what the new role may do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// CollegeStatus
///
/// Visibility of a college record. Only `Published` records are served on public read paths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "college_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CollegeStatus {
    #[default]
    Draft,
    Published,
}

// --- Core Application Schemas ---

/// User
///
/// The credential record stored in the `users` table. The password is only ever held
/// as an argon2 PHC string; this struct is never serialized to clients (see `UserProfile`).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    // Unique, stored lowercased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Course
///
/// One entry of a college's ordered course list. Persisted inside the college row as JSONB.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct Course {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[validate(
        custom(function = "finite", message = "must be a non-negative number"),
        range(min = 0.0, message = "must be a non-negative number")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,
}

/// College
///
/// The principal directory entity. Metric fields are optional: a college may be listed
/// before its ranking, fees or placement figures are known.
///
/// *Ordering semantics*: lower `ranking` and lower `fees` are better; higher
/// `placement_percentage` is better.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct College {
    pub id: Uuid,
    pub name: String,
    /// Unique across the collection; fixed at creation time.
    pub slug: String,
    pub location: Option<String>,
    pub ranking: Option<i32>,
    pub fees: Option<f64>,
    pub placement_percentage: Option<f64>,
    pub courses: Vec<Course>,
    pub eligibility: Option<String>,
    /// Durable URL returned by the object store.
    pub image: Option<String>,
    pub status: CollegeStatus,
    pub description: Option<String>,
    pub website: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewCollege
///
/// Fully resolved insert record: slug allocated, image uploaded, courses decoded.
#[derive(Debug, Clone, Default)]
pub struct NewCollege {
    pub name: String,
    pub slug: String,
    pub location: Option<String>,
    pub ranking: Option<i32>,
    pub fees: Option<f64>,
    pub placement_percentage: Option<f64>,
    pub courses: Vec<Course>,
    pub eligibility: Option<String>,
    pub image: Option<String>,
    pub status: CollegeStatus,
    pub description: Option<String>,
    pub website: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// CollegePayload
///
/// The writable college fields as decoded at the HTTP boundary, shared by create and
/// partial update. Every field is optional here; creation additionally requires `name`.
///
/// Over multipart the `courses` part arrives as a JSON-encoded string and is decoded into
/// `Vec<Course>` by the form extractor, so nothing past the boundary re-parses it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CollegePayload {
    #[validate(length(min = 1, message = "must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<i32>,
    #[validate(
        custom(function = "finite", message = "must be a non-negative number"),
        range(min = 0.0, message = "must be a non-negative number")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,
    #[validate(
        custom(function = "finite", message = "must be between 0 and 100"),
        range(min = 0.0, max = 100.0, message = "must be between 0 and 100")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_percentage: Option<f64>,
    #[validate(nested)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<Course>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CollegeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

// `range` lets NaN through, and a multipart form can spell it.
fn finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite"))
    }
}

/// CollegeUpdate
///
/// Partial update handed to the repository. `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default)]
pub struct CollegeUpdate {
    pub fields: CollegePayload,
    pub image: Option<String>,
}

/// RegisterRequest
///
/// Input payload for `POST /api/auth/register`. `role` defaults to `user` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// --- Response Schemas (Output) ---

/// UserProfile
///
/// Public view of a `User`, without the password digest.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// TokenResponse
///
/// Returned in the `data` member of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// Strongest
///
/// Per-metric winner of a comparison. A slot is `null` when no compared college has that
/// metric populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Strongest {
    pub ranking: Option<Uuid>,
    pub fees: Option<Uuid>,
    pub placement_percentage: Option<Uuid>,
}
