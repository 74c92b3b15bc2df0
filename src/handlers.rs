use crate::{
    AppState,
    auth::{self, AuthUser},
    compare,
    error::{AppError, AppResult},
    form::CollegeForm,
    models::{
        College, CollegePayload, CollegeStatus, CollegeUpdate, LoginRequest, NewCollege,
        RegisterRequest, TokenResponse, UserProfile,
    },
    query::ListCollegesParams,
    response::ApiResponse,
    slug,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

type JsonEnvelope<T> = (StatusCode, Json<ApiResponse<T>>);

// --- Filter Structs ---

/// CompareParams
///
/// Query parameters for `GET /api/colleges/compare`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompareParams {
    /// Comma-separated list of 2 or 3 college ids.
    pub ids: Option<String>,
}

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

fn parse_college_id(path: Result<Path<Uuid>, PathRejection>) -> AppResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::InvalidRequest("Invalid college ID".to_string()))
}

// Best-effort removal of an image whose record write failed.
async fn discard_upload(state: &AppState, key: Option<String>) {
    let Some(key) = key else { return };
    if let Err(e) = state.storage.remove(&key).await {
        tracing::warn!(%key, error = %e, "orphaned image left in storage");
    }
}

// --- Auth Handlers ---

/// register_user
///
/// [Public Route] Creates an account. The role defaults to `user` when omitted.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 409, description = "User already exists")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<JsonEnvelope<UserProfile>> {
    let Json(payload) = payload.map_err(bad_body)?;
    let user = auth::register(state.repo.as_ref(), payload).await?;

    Ok(ApiResponse::success(UserProfile::from(user))
        .with_message("User registered successfully")
        .with_status(StatusCode::CREATED))
}

/// login_user
///
/// [Public Route] Exchanges email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<JsonEnvelope<TokenResponse>> {
    let Json(payload) = payload.map_err(bad_body)?;
    let token = auth::login(state.repo.as_ref(), &state.config, payload).await?;
    Ok(ApiResponse::success(token).with_status(StatusCode::OK))
}

// --- Public College Handlers ---

/// list_colleges
///
/// [Public Route] Paginated, filtered listing of published colleges. `total` is the
/// number of matches ignoring pagination.
#[utoipa::path(
    get,
    path = "/api/colleges",
    params(ListCollegesParams),
    responses(
        (status = 200, description = "One page of published colleges", body = [College]),
        (status = 400, description = "Malformed filter, sort or page")
    )
)]
pub async fn list_colleges(
    State(state): State<AppState>,
    params: Result<Query<ListCollegesParams>, QueryRejection>,
) -> AppResult<JsonEnvelope<Vec<College>>> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let listing = params.into_query()?;

    let (colleges, total) = state
        .repo
        .query_colleges(&listing.filter, &listing.sort, listing.skip(), listing.limit())
        .await?;

    Ok(ApiResponse::success(colleges)
        .with_page(total, listing.page)
        .with_status(StatusCode::OK))
}

/// compare_colleges
///
/// [Public Route] Compares 2 or 3 published colleges and names the strongest per metric.
#[utoipa::path(
    get,
    path = "/api/colleges/compare",
    params(CompareParams),
    responses(
        (status = 200, description = "Comparison", body = [College]),
        (status = 400, description = "Missing ids or wrong count"),
        (status = 404, description = "None of the colleges exist")
    )
)]
pub async fn compare_colleges(
    State(state): State<AppState>,
    params: Result<Query<CompareParams>, QueryRejection>,
) -> AppResult<JsonEnvelope<Vec<College>>> {
    let Query(params) = params.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let ids = compare::parse_ids(params.ids.as_deref())?;

    let comparison = compare::compare_colleges(state.repo.as_ref(), ids).await?;
    let count = comparison.colleges.len();

    Ok(ApiResponse::success(comparison.colleges)
        .with_comparison(count, comparison.strongest)
        .with_status(StatusCode::OK))
}

/// get_college_by_slug
///
/// [Public Route] Fetches one college by slug. Drafts are reported as not found.
#[utoipa::path(
    get,
    path = "/api/colleges/{slug}",
    params(("slug" = String, Path, description = "College slug")),
    responses(
        (status = 200, description = "Found", body = College),
        (status = 404, description = "College not found")
    )
)]
pub async fn get_college_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<JsonEnvelope<College>> {
    let college = state
        .repo
        .find_college_by_slug(&slug)
        .await?
        .filter(|c| c.status == CollegeStatus::Published)
        .ok_or_else(AppError::college_not_found)?;

    Ok(ApiResponse::success(college).with_status(StatusCode::OK))
}

// --- Admin College Handlers ---

/// create_college
///
/// [Admin Route] Creates a college from a multipart or JSON form. The image, if any, is
/// uploaded before the record is written; the slug is allocated from the name.
///
/// If the insert then fails (slug retries exhausted, database error), the uploaded object
/// is removed again on a best-effort basis. A failed removal is logged and the insert
/// error is still what the client sees.
#[utoipa::path(
    post,
    path = "/api/colleges",
    request_body = CollegePayload,
    responses(
        (status = 201, description = "Created", body = College),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer" = []))
)]
pub async fn create_college(
    admin: AuthUser,
    State(state): State<AppState>,
    form: CollegeForm,
) -> AppResult<JsonEnvelope<College>> {
    let CollegeForm { fields, image } = form;

    let name = fields
        .name
        .ok_or_else(|| AppError::Validation("name is required".to_string()))?;

    let mut uploaded_key = None;
    let image_url = match image {
        Some(image) => {
            let key = image.object_key();
            let url = state
                .storage
                .upload(&key, &image.content_type, image.bytes)
                .await?;
            uploaded_key = Some(key);
            Some(url)
        }
        None => None,
    };

    let record = NewCollege {
        name,
        slug: String::new(),
        location: fields.location,
        ranking: fields.ranking,
        fees: fields.fees,
        placement_percentage: fields.placement_percentage,
        courses: fields.courses.unwrap_or_default(),
        eligibility: fields.eligibility,
        image: image_url,
        status: fields.status.unwrap_or_default(),
        description: fields.description,
        website: fields.website,
    };

    let college = match slug::create_with_unique_slug(state.repo.as_ref(), record).await {
        Ok(college) => college,
        Err(e) => {
            discard_upload(&state, uploaded_key).await;
            return Err(e.into());
        }
    };
    tracing::info!(college_id = %college.id, slug = %college.slug, admin_id = %admin.id, "college created");

    Ok(ApiResponse::success(college).with_status(StatusCode::CREATED))
}

/// update_college
///
/// [Admin Route] Partially updates a college. Omitted fields are left unchanged and the
/// slug never changes. A new image replaces the stored URL.
#[utoipa::path(
    put,
    path = "/api/colleges/{id}",
    params(("id" = Uuid, Path, description = "College ID")),
    request_body = CollegePayload,
    responses(
        (status = 200, description = "Updated", body = College),
        (status = 404, description = "College not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_college(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    form: CollegeForm,
) -> AppResult<JsonEnvelope<College>> {
    let id = parse_college_id(path)?;

    // Checked first so a missing college does not leave an orphaned upload behind.
    if state.repo.find_college_by_id(id).await?.is_none() {
        return Err(AppError::college_not_found());
    }

    let CollegeForm { fields, image } = form;
    let mut uploaded_key = None;
    let image_url = match image {
        Some(image) => {
            let key = image.object_key();
            let url = state
                .storage
                .upload(&key, &image.content_type, image.bytes)
                .await?;
            uploaded_key = Some(key);
            Some(url)
        }
        None => None,
    };

    let update = CollegeUpdate {
        fields,
        image: image_url,
    };
    let college = match state.repo.update_college(id, update).await {
        Ok(college) => college,
        Err(e) => {
            discard_upload(&state, uploaded_key).await;
            return Err(e.into());
        }
    };
    tracing::info!(college_id = %college.id, "college updated");

    Ok(ApiResponse::success(college).with_status(StatusCode::OK))
}

/// delete_college
///
/// [Admin Route] Removes a college.
#[utoipa::path(
    delete,
    path = "/api/colleges/{id}",
    params(("id" = Uuid, Path, description = "College ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "College not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_college(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<JsonEnvelope<()>> {
    let id = parse_college_id(path)?;
    state.repo.delete_college(id).await?;
    tracing::info!(college_id = %id, "college deleted");

    Ok(ApiResponse::message("College deleted successfully").with_status(StatusCode::OK))
}
