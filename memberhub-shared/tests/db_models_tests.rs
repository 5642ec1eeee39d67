//! Integration tests for the model layer
//!
//! These tests require a running PostgreSQL database and are skipped when
//! `DATABASE_URL` is not set. Each test creates its own users and events and
//! removes them afterwards.

use memberhub_shared::auth::authorization::{article_list_filter, Principal};
use memberhub_shared::category::ArticleCategory;
use memberhub_shared::db::migrations::{ensure_database_exists, run_migrations};
use memberhub_shared::db::pool::{create_pool, DatabaseConfig};
use memberhub_shared::models::article::{Article, ArticleQuery, Visibility};
use memberhub_shared::models::event::{CreateEvent, Event, EventCategory, EventStatus};
use memberhub_shared::models::registration::{EventRegistration, RegistrationError};
use memberhub_shared::models::user::{CreateUser, Role, User, UserStatus};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };

    ensure_database_exists(&url).await.expect("ensure database");
    let pool = create_pool(DatabaseConfig::new(url)).await.expect("create pool");
    run_migrations(&pool).await.expect("run migrations");
    Some(pool)
}

async fn create_user(pool: &PgPool, role: Role) -> User {
    User::create_with_status(
        pool,
        CreateUser {
            email: format!("model-{}@example.com", Uuid::new_v4()),
            password_hash: "not-a-real-hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
            role,
        },
        UserStatus::Approved,
    )
    .await
    .expect("create user")
}

async fn create_event(pool: &PgPool, created_by: Uuid, max_participants: Option<i32>) -> Event {
    Event::create(
        pool,
        CreateEvent {
            title: "Randonnée".to_string(),
            description: "Boucle de 12 km".to_string(),
            location: Some("Parking de la mairie".to_string()),
            category: EventCategory::Activite,
            starts_at: chrono::Utc::now() + chrono::Duration::days(30),
            ends_at: None,
            is_member_only: false,
            max_participants,
            status: EventStatus::Published,
            created_by,
        },
    )
    .await
    .expect("create event")
}

#[tokio::test]
async fn test_capacity_is_enforced() {
    let Some(pool) = test_pool().await else { return };
    let admin = create_user(&pool, Role::Admin).await;
    let event = create_event(&pool, admin.id, Some(2)).await;

    let mut users = Vec::new();
    for _ in 0..3 {
        users.push(create_user(&pool, Role::Member).await);
    }

    EventRegistration::register(&pool, event.id, users[0].id).await.expect("first");
    EventRegistration::register(&pool, event.id, users[1].id).await.expect("second");

    let third = EventRegistration::register(&pool, event.id, users[2].id).await;
    assert!(matches!(
        third,
        Err(RegistrationError::CapacityExceeded { max_participants: 2 })
    ));

    let refreshed = Event::find_by_id(&pool, event.id).await.unwrap().unwrap();
    assert_eq!(refreshed.participants_count, 2);
    assert_eq!(refreshed.remaining_places(), Some(0));

    // Cancelling frees a place
    EventRegistration::cancel(&pool, event.id, users[0].id).await.expect("cancel");
    EventRegistration::register(&pool, event.id, users[2].id).await.expect("after cancel");
    assert_eq!(EventRegistration::count_active(&pool, event.id).await.unwrap(), 2);

    Event::delete(&pool, event.id).await.unwrap();
    for user in users.iter().chain([&admin]) {
        User::delete(&pool, user.id).await.unwrap();
    }
}

#[tokio::test]
async fn test_concurrent_registrations_never_exceed_capacity() {
    let Some(pool) = test_pool().await else { return };
    let admin = create_user(&pool, Role::Admin).await;
    let event = create_event(&pool, admin.id, Some(3)).await;

    let mut users = Vec::new();
    for _ in 0..10 {
        users.push(create_user(&pool, Role::Retraite).await);
    }

    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let pool = pool.clone();
            let (event_id, user_id) = (event.id, user.id);
            tokio::spawn(async move { EventRegistration::register(&pool, event_id, user_id).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => accepted += 1,
            Err(RegistrationError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(EventRegistration::count_active(&pool, event.id).await.unwrap(), 3);

    Event::delete(&pool, event.id).await.unwrap();
    for user in users.iter().chain([&admin]) {
        User::delete(&pool, user.id).await.unwrap();
    }
}

#[tokio::test]
async fn test_duplicate_registration_and_cancel() {
    let Some(pool) = test_pool().await else { return };
    let admin = create_user(&pool, Role::Admin).await;
    let member = create_user(&pool, Role::Member).await;
    let event = create_event(&pool, admin.id, None).await;

    EventRegistration::register(&pool, event.id, member.id).await.expect("register");
    assert!(EventRegistration::is_registered(&pool, event.id, member.id).await.unwrap());

    let again = EventRegistration::register(&pool, event.id, member.id).await;
    assert!(matches!(again, Err(RegistrationError::DuplicateRegistration)));

    EventRegistration::cancel(&pool, event.id, member.id).await.expect("cancel");
    assert!(!EventRegistration::is_registered(&pool, event.id, member.id).await.unwrap());

    let cancel_again = EventRegistration::cancel(&pool, event.id, member.id).await;
    assert!(matches!(cancel_again, Err(RegistrationError::NotRegistered)));

    // Re-registering after a cancellation is allowed
    EventRegistration::register(&pool, event.id, member.id).await.expect("re-register");
    let mine = EventRegistration::list_for_user(&pool, member.id).await.unwrap();
    assert!(mine.iter().any(|r| r.event_id == event.id));

    let unknown = EventRegistration::register(&pool, Uuid::new_v4(), member.id).await;
    assert!(matches!(unknown, Err(RegistrationError::EventNotFound)));

    Event::delete(&pool, event.id).await.unwrap();
    User::delete(&pool, member.id).await.unwrap();
    User::delete(&pool, admin.id).await.unwrap();
}

#[tokio::test]
async fn test_registration_requires_published_event() {
    let Some(pool) = test_pool().await else { return };
    let admin = create_user(&pool, Role::Admin).await;
    let member = create_user(&pool, Role::Member).await;
    let event = create_event(&pool, admin.id, None).await;

    for status in ["draft", "cancelled"] {
        sqlx::query("UPDATE events SET status = $2::event_status WHERE id = $1")
            .bind(event.id)
            .bind(status)
            .execute(&pool)
            .await
            .expect("set event status");

        let result = EventRegistration::register(&pool, event.id, member.id).await;
        assert!(matches!(result, Err(RegistrationError::EventClosed)), "status {status}");
    }
    assert_eq!(EventRegistration::count_active(&pool, event.id).await.unwrap(), 0);

    Event::delete(&pool, event.id).await.unwrap();
    User::delete(&pool, member.id).await.unwrap();
    User::delete(&pool, admin.id).await.unwrap();
}

#[tokio::test]
async fn test_category_filter_includes_legacy_rows() {
    let Some(pool) = test_pool().await else { return };
    let author = create_user(&pool, Role::Member).await;

    let mut ids = Vec::new();
    for label in ["prestations", "avantages", "activites", "voyages"] {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO articles (title, content, category, visibility, status, author_id, published_at)
             VALUES ($1, 'contenu', $2, 'public', 'published', $3, NOW())
             RETURNING id",
        )
        .bind(format!("Article {label}"))
        .bind(label)
        .bind(author.id)
        .fetch_one(&pool)
        .await
        .expect("insert article");
        ids.push((label, id));
    }

    let query = ArticleQuery {
        category: Some(ArticleCategory::Prestations),
        author_id: Some(author.id),
        ..Default::default()
    };
    let filter = article_list_filter(&Principal::Anonymous);
    let found: Vec<Uuid> = Article::list(&pool, &filter, &query)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();

    for (label, id) in &ids {
        assert_eq!(found.contains(id), *label != "voyages", "label {label}");
    }
    assert_eq!(Article::count(&pool, &filter, &query).await.unwrap(), 3);

    // Legacy rows read back under their canonical category
    let legacy = Article::find_by_id(&pool, ids[1].1).await.unwrap().unwrap();
    assert_eq!(legacy.canonical_category(), Some(ArticleCategory::Prestations));
    assert_eq!(legacy.visibility, Visibility::Public);

    for (_, id) in ids {
        Article::delete(&pool, id).await.unwrap();
    }
    User::delete(&pool, author.id).await.unwrap();
}

#[tokio::test]
async fn test_email_lookup_is_case_insensitive_and_unique() {
    let Some(pool) = test_pool().await else { return };
    let user = create_user(&pool, Role::Member).await;

    let found = User::find_by_email(&pool, &user.email.to_uppercase()).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    let duplicate = User::create(
        &pool,
        CreateUser {
            email: user.email.to_uppercase(),
            password_hash: "x".to_string(),
            first_name: "Autre".to_string(),
            last_name: "Personne".to_string(),
            phone: None,
            role: Role::Member,
        },
    )
    .await;
    assert!(duplicate.is_err());

    User::delete(&pool, user.id).await.unwrap();
}
