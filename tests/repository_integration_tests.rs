use chrono::Utc;
use college_directory::{
    models::{CollegePayload, CollegeStatus, CollegeUpdate, Course, NewCollege, Role, User},
    query::{CollegeFilter, ListCollegesParams, SortSpec},
    repository::{PostgresRepository, Repository, RepositoryError},
    slug::create_with_unique_slug,
};
use sqlx::PgPool;
use uuid::Uuid;

// These tests need a disposable Postgres database:
//   DATABASE_URL=postgres://... cargo test -- --ignored

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// Names carry a per-test marker so runs against a shared database do not collide.
fn marker() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn published(name: String) -> NewCollege {
    NewCollege {
        name,
        status: CollegeStatus::Published,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_email_is_unique() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = format!("{}@example.com", marker());

    let user = User {
        id: Uuid::new_v4(),
        name: "Ann".to_string(),
        email: email.clone(),
        password_hash: "$argon2id$placeholder".to_string(),
        role: Role::Admin,
        created_at: Utc::now(),
    };
    repo.create_user(user.clone()).await.unwrap();

    let found = repo.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.role, Role::Admin);

    let again = repo
        .create_user(User {
            id: Uuid::new_v4(),
            ..user
        })
        .await;
    assert!(matches!(again, Err(RepositoryError::Duplicate("email"))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_college_round_trip_with_courses() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let name = format!("Round Trip {}", marker());

    let mut record = published(name.clone());
    record.ranking = Some(7);
    record.fees = Some(1234.5);
    record.courses = vec![Course {
        name: "B.Sc".to_string(),
        duration: Some("3 years".to_string()),
        fees: None,
    }];

    let created = create_with_unique_slug(&repo, record).await.unwrap();
    let fetched = repo.find_college_by_slug(&created.slug).await.unwrap().unwrap();

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.courses, created.courses);
    assert_eq!(fetched.fees, Some(1234.5));

    repo.delete_college(created.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_slug_unique_index_reports_duplicate() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let slug = format!("dup-{}", marker());

    let first = repo
        .create_college(NewCollege {
            name: "Dup".to_string(),
            slug: slug.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
    let second = repo
        .create_college(NewCollege {
            name: "Dup".to_string(),
            slug,
            ..Default::default()
        })
        .await;

    assert!(matches!(second, Err(RepositoryError::Duplicate("slug"))));
    repo.delete_college(first.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_update_keeps_unsupplied_fields() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let mut record = published(format!("Partial {}", marker()));
    record.location = Some("Kochi".to_string());
    let created = create_with_unique_slug(&repo, record).await.unwrap();

    let updated = repo
        .update_college(
            created.id,
            CollegeUpdate {
                fields: CollegePayload {
                    fees: Some(4000.0),
                    ..Default::default()
                },
                image: Some("http://cdn/x.png".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.fees, Some(4000.0));
    assert_eq!(updated.location.as_deref(), Some("Kochi"));
    assert_eq!(updated.slug, created.slug);
    assert_eq!(updated.image.as_deref(), Some("http://cdn/x.png"));

    repo.delete_college(created.id).await.unwrap();
    assert!(matches!(
        repo.delete_college(created.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_query_filters_and_counts() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let tag = marker();

    let mut ids = Vec::new();
    for (i, location) in ["Delhi", "Mumbai", "Chennai"].iter().enumerate() {
        let mut record = published(format!("{tag} College {i}"));
        record.location = Some(location.to_string());
        record.fees = Some(1000.0 * (i as f64 + 1.0));
        ids.push(create_with_unique_slug(&repo, record).await.unwrap().id);
    }

    let query = ListCollegesParams {
        search: Some(tag.clone()),
        location: Some("delhi,chennai".to_string()),
        max_fees: Some(2500.0),
        limit: Some(1),
        ..Default::default()
    }
    .into_query()
    .unwrap();

    let (page, total) = repo
        .query_colleges(&query.filter, &query.sort, query.skip(), query.limit())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, ids[0]);

    // Comparison-style fetch by id.
    let (found, _) = repo
        .query_colleges(
            &CollegeFilter::published_ids(ids.clone()),
            &SortSpec::default(),
            0,
            3,
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 3);

    for id in ids {
        repo.delete_college(id).await.unwrap();
    }
}
