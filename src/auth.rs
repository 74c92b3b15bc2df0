use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{LoginRequest, RegisterRequest, Role, TokenResponse, User},
    repository::{Repository, RepositoryError},
};

const NO_TOKEN: &str = "Not authorized, no token";
const BAD_TOKEN: &str = "Token invalid or expired";

/// Claims
///
/// The payload signed into every bearer token. Tokens are self-contained: the gate trusts
/// `sub` and `role` once the signature and `exp` check out, without a database lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    pub role: Role,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

// --- Passwords ---

/// hash_password
///
/// Produces an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Upstream(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// Returns `false` both for a mismatch and for a stored digest that does not parse.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// Verified against when the email is unknown, so both failure paths pay for one argon2 run.
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("decoy-password").unwrap_or_default())
}

// --- Tokens ---

/// issue_token
///
/// Signs an HS256 token for `user_id`/`role` valid for `config.jwt_expiry_hours`.
/// Returns the token and its lifetime in seconds.
pub fn issue_token(user_id: Uuid, role: Role, config: &AppConfig) -> AppResult<(String, i64)> {
    let now = Utc::now();
    let lifetime = Duration::hours(config.jwt_expiry_hours);

    let claims = Claims {
        sub: user_id,
        role,
        iat: usize::try_from(now.timestamp()).unwrap_or_default(),
        exp: usize::try_from((now + lifetime).timestamp()).unwrap_or_default(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Upstream(format!("token signing failed: {e}")))?;

    Ok((token, lifetime.num_seconds()))
}

/// verify_token
///
/// Checks signature and expiry. Every failure kind (bad signature, malformed token,
/// expired) is reported the same way.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        AppError::Unauthenticated(BAD_TOKEN)
    })
}

// --- Credential Store ---

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// register
///
/// Creates an account. The password is stored only as an argon2 digest and the role
/// defaults to `user`. Fails with `DuplicateUser` if the email is already registered,
/// whether that is seen by the pre-check or by the unique index on a concurrent insert.
pub async fn register(repo: &dyn Repository, req: RegisterRequest) -> AppResult<User> {
    let req = RegisterRequest {
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        ..req
    };
    req.validate()?;

    let RegisterRequest {
        name,
        email,
        password,
        role,
    } = req;

    if repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::DuplicateUser);
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(&password)?,
        role: role.unwrap_or_default(),
        created_at: Utc::now(),
    };

    match repo.create_user(user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = ?user.role, "user registered");
            Ok(user)
        }
        Err(RepositoryError::Duplicate(_)) => Err(AppError::DuplicateUser),
        Err(e) => Err(e.into()),
    }
}

/// login
///
/// Exchanges credentials for a bearer token. Unknown email and wrong password both yield
/// `InvalidCredentials` after the same amount of hashing work.
pub async fn login(
    repo: &dyn Repository,
    config: &AppConfig,
    req: LoginRequest,
) -> AppResult<TokenResponse> {
    let email = normalize_email(&req.email);

    let Some(user) = repo.find_user_by_email(&email).await? else {
        verify_password(&req.password, decoy_hash());
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let (token, expires_in) = issue_token(user.id, user.role, config)?;
    tracing::info!(user_id = %user.id, "login succeeded");

    Ok(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in,
    })
}

// --- Access Control Gate ---

/// AuthUser
///
/// The verified identity of a request, decoded from its bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Extracts and verifies the `Authorization: Bearer <token>` header.
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> AppResult<Self> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthenticated(NO_TOKEN))?;

        let claims = verify_token(token, secret)?;
        Ok(Self {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// AuthUser Extractor Implementation
///
/// Reuses the identity attached by the `authenticate` middleware when present, and
/// otherwise verifies the header itself, so handlers can take `AuthUser` on any route.
///
/// Rejection: an `Unauthenticated` envelope (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }
        let config = AppConfig::from_ref(state);
        Self::from_headers(&parts.headers, &config.jwt_secret)
    }
}

/// authorize_admin
///
/// The authorization predicate. Matches the role exhaustively.
pub fn authorize_admin(user: &AuthUser) -> AppResult<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::User => Err(AppError::Forbidden),
    }
}

/// authenticate
///
/// First gate on protected routes: verifies the bearer token and attaches the decoded
/// `AuthUser` to the request extensions. Terminal 401 on failure.
pub async fn authenticate(
    State(config): State<AppConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = AuthUser::from_headers(request.headers(), &config.jwt_secret)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// require_admin
///
/// Second gate: requires the identity attached by `authenticate` to hold the admin role.
/// Must be layered inside `authenticate`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::Unauthenticated(NO_TOKEN))?;

    if let Err(e) = authorize_admin(user) {
        tracing::warn!(user_id = %user.id, "non-admin request to admin route");
        return Err(e);
    }

    Ok(next.run(request).await)
}
