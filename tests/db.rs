//! 需要真实 PostgreSQL 的用例，设置 DATABASE_URL 后运行：
//! `cargo test --test db -- --ignored`
use backend::{
    error::AppError,
    models::{ConnectionStatus, OpportunityKind, UserRole},
    routes::{
        connection::Connection,
        message::{Message, MessageListQuery},
        opportunity::{CreateOpportunityRequest, Opportunity, UpdateOpportunityRequest},
        review::{CreateReviewRequest, Review},
        session::{CreateSessionRequest, Session},
        user::User,
    },
};
use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

async fn user(pool: &PgPool, name: &str, role: UserRole) -> User {
    let email = format!("{}-{}@example.com", name, Uuid::new_v4());
    User::create(pool, &email, name, "not-a-real-hash", role)
        .await
        .unwrap()
}

async fn pair(pool: &PgPool) -> (User, User) {
    (
        user(pool, "ada", UserRole::Mentee).await,
        user(pool, "grace", UserRole::Mentor).await,
    )
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn second_open_connection_for_same_pair_conflicts(pool: PgPool) {
    let (mentee, mentor) = pair(&pool).await;
    Connection::create(&pool, mentee.user_id, mentor.user_id, "hi")
        .await
        .unwrap();

    let err = Connection::create(&pool, mentee.user_id, mentor.user_id, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn closed_connection_frees_the_pair(pool: PgPool) {
    let (mentee, mentor) = pair(&pool).await;
    let first = Connection::create(&pool, mentee.user_id, mentor.user_id, "")
        .await
        .unwrap();
    assert!(
        Connection::transition(
            &pool,
            first.connection_id,
            ConnectionStatus::Pending,
            ConnectionStatus::Rejected,
        )
        .await
        .unwrap()
    );

    assert!(
        Connection::create(&pool, mentee.user_id, mentor.user_id, "")
            .await
            .is_ok()
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn connection_lifecycle_and_stale_transition(pool: PgPool) {
    let (mentee, mentor) = pair(&pool).await;
    let connection = Connection::create(&pool, mentee.user_id, mentor.user_id, "")
        .await
        .unwrap();
    assert_eq!(connection.status, ConnectionStatus::Pending);
    assert_eq!(connection.mentor_name, "grace");

    let id = connection.connection_id;
    assert!(
        Connection::transition(&pool, id, ConnectionStatus::Pending, ConnectionStatus::Active)
            .await
            .unwrap()
    );
    // 第二个并发的接受请求看到的仍是旧状态
    assert!(
        !Connection::transition(&pool, id, ConnectionStatus::Pending, ConnectionStatus::Active)
            .await
            .unwrap()
    );
    assert!(
        Connection::transition(&pool, id, ConnectionStatus::Active, ConnectionStatus::Ended)
            .await
            .unwrap()
    );

    let stored = Connection::find_for_participant(&pool, id, mentee.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ConnectionStatus::Ended);
    assert!(
        Connection::find_for_participant(&pool, id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none()
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn unknown_mentor_maps_to_validation(pool: PgPool) {
    let mentee = user(&pool, "ada", UserRole::Mentee).await;
    let err = Connection::create(&pool, mentee.user_id, Uuid::new_v4(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_maps_to_conflict(pool: PgPool) {
    let email = "dup@example.com";
    User::create(&pool, email, "a", "hash", UserRole::Mentee)
        .await
        .unwrap();
    let err = User::create(&pool, email, "b", "hash", UserRole::Mentee)
        .await
        .unwrap_err();
    assert!(matches!(AppError::from(err), AppError::Conflict(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn second_review_of_a_session_conflicts(pool: PgPool) {
    let (mentee, mentor) = pair(&pool).await;
    let connection = Connection::create(&pool, mentee.user_id, mentor.user_id, "")
        .await
        .unwrap();
    let session = Session::create(
        &pool,
        mentee.user_id,
        &CreateSessionRequest {
            connection_id: connection.connection_id,
            scheduled_at: Utc::now() + Duration::days(1),
            duration_minutes: 30,
            topic: "Career".into(),
            meeting_url: None,
        },
    )
    .await
    .unwrap();

    let req = CreateReviewRequest {
        session_id: session.session_id,
        rating: 5,
        comment: "great".into(),
    };
    let review = Review::create(&pool, mentee.user_id, mentor.user_id, &req)
        .await
        .unwrap();
    assert_eq!(review.reviewer_name, "ada");

    let err = Review::create(&pool, mentee.user_id, mentor.user_id, &req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn message_cursor_pages_through_equal_timestamps(pool: PgPool) {
    let (mentee, mentor) = pair(&pool).await;
    let connection = Connection::create(&pool, mentee.user_id, mentor.user_id, "")
        .await
        .unwrap();

    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    for body in ["a", "b", "c", "d", "e"] {
        sqlx::query(
            r#"
            INSERT INTO messages (message_id, connection_id, sender_id, recipient_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(connection.connection_id)
        .bind(mentee.user_id)
        .bind(mentor.user_id)
        .bind(body)
        .bind(at)
        .execute(&pool)
        .await
        .unwrap();
    }

    let mut seen = Vec::new();
    let mut query = MessageListQuery {
        before: None,
        before_id: None,
        limit: Some(2),
    };
    loop {
        let page = Message::list(&pool, connection.connection_id, &query)
            .await
            .unwrap();
        let Some(last) = page.last() else { break };
        query.before = Some(last.created_at);
        query.before_id = Some(last.message_id);
        seen.extend(page.iter().map(|m| m.message_id));
    }

    assert_eq!(seen.len(), 5);
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn opportunity_update_clears_optional_fields(pool: PgPool) {
    let poster = user(&pool, "grace", UserRole::Mentor).await;
    let opportunity = Opportunity::create(
        &pool,
        poster.user_id,
        CreateOpportunityRequest {
            title: "Rust Intern".into(),
            description: String::new(),
            kind: OpportunityKind::Internship,
            organization: "Ferris Inc".into(),
            location: "Remote".into(),
            tags: "rust".into(),
            apply_url: Some("https://jobs.example.com/1".into()),
            deadline: Some(Utc::now() + Duration::days(30)),
        },
    )
    .await
    .unwrap();

    let update = UpdateOpportunityRequest {
        apply_url: Some(String::new()),
        clear_deadline: true,
        ..Default::default()
    }
    .validated()
    .unwrap();
    let updated = Opportunity::update(&pool, opportunity.opportunity_id, update)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.apply_url, None);
    assert_eq!(updated.deadline, None);
    assert_eq!(updated.title, "Rust Intern");
}
