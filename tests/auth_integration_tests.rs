use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, header, request::Parts},
};
use college_directory::{
    AppConfig, AppError, AppState, InMemoryRepository, MockStorageService,
    auth::{self, AuthUser, Claims},
    models::{LoginRequest, RegisterRequest, Role},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

// --- Helpers ---

fn test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

fn parts_with_auth(value: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/colleges");
    if let Some(value) = value {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap().into_parts().0
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn register_request(name: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role: None,
    }
}

// --- Passwords ---

#[test]
fn test_password_hash_round_trip() {
    let hash = auth::hash_password("correct horse").unwrap();

    assert!(hash.starts_with("$argon2"));
    assert!(auth::verify_password("correct horse", &hash));
    assert!(!auth::verify_password("battery staple", &hash));
}

#[test]
fn test_password_hashes_are_salted() {
    let first = auth::hash_password("same").unwrap();
    let second = auth::hash_password("same").unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_verify_against_garbage_digest_is_false() {
    assert!(!auth::verify_password("anything", "not-a-phc-string"));
}

// --- Tokens ---

#[test]
fn test_issue_and_verify_token() {
    let config = AppConfig::default();
    let user_id = Uuid::new_v4();

    let (token, expires_in) = auth::issue_token(user_id, Role::Admin, &config).unwrap();
    assert_eq!(expires_in, config.jwt_expiry_hours * 3600);

    let claims = auth::verify_token(&token, &config.jwt_secret).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, Role::Admin);
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let config = AppConfig::default();
    let (token, _) = auth::issue_token(Uuid::new_v4(), Role::User, &config).unwrap();

    let result = auth::verify_token(&token, "a-completely-different-secret");
    assert!(matches!(result, Err(AppError::Unauthenticated("Token invalid or expired"))));
}

#[test]
fn test_expired_token_is_rejected() {
    let config = AppConfig::default();
    let now = now_secs();
    let claims = Claims {
        sub: Uuid::new_v4(),
        role: Role::Admin,
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .unwrap();

    assert!(matches!(
        auth::verify_token(&token, &config.jwt_secret),
        Err(AppError::Unauthenticated(_))
    ));
}

// --- Extractor ---

#[tokio::test]
async fn test_extractor_accepts_valid_bearer() {
    let state = test_state();
    let user_id = Uuid::new_v4();
    let (token, _) = auth::issue_token(user_id, Role::User, &state.config).unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(user, AuthUser { id: user_id, role: Role::User });
}

#[tokio::test]
async fn test_extractor_missing_or_malformed_header() {
    let state = test_state();

    for header_value in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer "), Some("bearer abc")] {
        let mut parts = parts_with_auth(header_value);
        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(
            matches!(result, Err(AppError::Unauthenticated("Not authorized, no token"))),
            "{header_value:?}"
        );
    }
}

#[tokio::test]
async fn test_extractor_prefers_identity_from_middleware() {
    let state = test_state();
    let attached = AuthUser {
        id: Uuid::new_v4(),
        role: Role::Admin,
    };

    let mut parts = parts_with_auth(None);
    parts.extensions.insert(attached);

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user, attached);
}

#[test]
fn test_authorize_admin() {
    let admin = AuthUser {
        id: Uuid::new_v4(),
        role: Role::Admin,
    };
    let user = AuthUser {
        id: Uuid::new_v4(),
        role: Role::User,
    };

    assert!(auth::authorize_admin(&admin).is_ok());
    assert!(matches!(auth::authorize_admin(&user), Err(AppError::Forbidden)));
}

// --- Credential Store ---

#[tokio::test]
async fn test_register_ann_then_login() {
    let repo = InMemoryRepository::new();
    let config = AppConfig::default();

    let user = auth::register(&repo, register_request(" Ann ", "Ann@Example.COM", "hunter2"))
        .await
        .unwrap();
    assert_eq!(user.name, "Ann");
    assert_eq!(user.email, "ann@example.com");
    assert_eq!(user.role, Role::User);
    assert_ne!(user.password_hash, "hunter2");

    let token = auth::login(
        &repo,
        &config,
        LoginRequest {
            email: "ann@example.com".to_string(),
            password: "hunter2".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(token.token_type, "Bearer");
    let claims = auth::verify_token(&token.token, &config.jwt_secret).unwrap();
    assert_eq!(claims.sub, user.id);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let repo = InMemoryRepository::new();
    let config = AppConfig::default();
    auth::register(&repo, register_request("Ann", "ann@example.com", "hunter2"))
        .await
        .unwrap();

    let wrong_password = auth::login(
        &repo,
        &config,
        LoginRequest {
            email: "ann@example.com".to_string(),
            password: "hunter3".to_string(),
        },
    )
    .await;
    let unknown_email = auth::login(
        &repo,
        &config,
        LoginRequest {
            email: "bob@example.com".to_string(),
            password: "hunter2".to_string(),
        },
    )
    .await;

    assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_register_duplicate_email_ignores_case() {
    let repo = InMemoryRepository::new();
    auth::register(&repo, register_request("Ann", "ann@example.com", "pw"))
        .await
        .unwrap();

    let result = auth::register(&repo, register_request("Other Ann", "ANN@example.com", "pw")).await;
    assert!(matches!(result, Err(AppError::DuplicateUser)));
}

#[tokio::test]
async fn test_register_validates_input() {
    let repo = InMemoryRepository::new();

    for request in [
        register_request("   ", "ann@example.com", "pw"),
        register_request("Ann", "not-an-email", "pw"),
        register_request("Ann", "ann@", "pw"),
        register_request("Ann", "ann@example.com", ""),
    ] {
        let result = auth::register(&repo, request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

#[tokio::test]
async fn test_register_honours_requested_role() {
    let repo = InMemoryRepository::new();
    let mut request = register_request("Root", "root@example.com", "pw");
    request.role = Some(Role::Admin);

    let user = auth::register(&repo, request).await.unwrap();
    assert_eq!(user.role, Role::Admin);
}
