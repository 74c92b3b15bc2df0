use std::env;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
// 5 MiB; covers the image part plus the text fields of a college form.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled
/// into handlers and extractors through `FromRef<AppState>`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and which secrets are mandatory.
    pub env: Env,
    // Postgres connection string. `None` (local only) runs on the in-memory repository.
    pub db_url: Option<String>,
    // Shared HS256 secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // Lifetime of issued tokens.
    pub jwt_expiry_hours: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Request body cap for the multipart college forms.
    pub max_upload_bytes: usize,
    // S3-compatible storage endpoint URL (MinIO in local).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    // The bucket used for college images.
    pub s3_bucket: String,
    // Public base URL under which uploaded objects are served.
    pub s3_public_url: String,
}

/// Env
///
/// Defines the runtime context: local development (MinIO, in-memory fallback, pretty logs)
/// or production (all secrets mandatory, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// A non-panicking configuration for tests. No database URL, so callers pair it with
    /// the in-memory repository.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_expiry_hours: DEFAULT_JWT_EXPIRY_HOURS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "colleges-test".to_string(),
            s3_public_url: "http://localhost:9000".to_string(),
        }
    }
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            panic!("FATAL: {name} has an invalid value '{raw}'");
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables at startup, failing fast.
    ///
    /// # Panics
    /// Panics if a variable required in production is missing, or if a numeric variable
    /// does not parse. The service must not start with an incomplete or insecure
    /// configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_expiry_hours = parsed_or("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS);
        let max_upload_bytes = parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                jwt_expiry_hours,
                bind_addr,
                max_upload_bytes,
                // Local storage (MinIO) uses known default credentials.
                s3_endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
                s3_region: "us-east-1".to_string(),
                s3_key: "admin".to_string(),
                s3_secret: "password".to_string(),
                s3_bucket: env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "colleges".to_string()),
                s3_public_url: env::var("S3_PUBLIC_URL")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            },
            Env::Production => {
                let s3_endpoint =
                    env::var("S3_ENDPOINT").expect("FATAL: S3_ENDPOINT required in prod");
                Self {
                    env: Env::Production,
                    db_url: Some(
                        env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                    ),
                    jwt_secret: env::var("JWT_SECRET")
                        .expect("FATAL: JWT_SECRET must be set in production."),
                    jwt_expiry_hours,
                    bind_addr,
                    max_upload_bytes,
                    s3_public_url: env::var("S3_PUBLIC_URL").unwrap_or_else(|_| s3_endpoint.clone()),
                    s3_endpoint,
                    s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                    s3_key: env::var("S3_ACCESS_KEY")
                        .expect("FATAL: S3_ACCESS_KEY required in prod"),
                    s3_secret: env::var("S3_SECRET_KEY")
                        .expect("FATAL: S3_SECRET_KEY required in prod"),
                    s3_bucket: env::var("S3_BUCKET_NAME")
                        .unwrap_or_else(|_| "colleges".to_string()),
                }
            }
        }
    }
}
