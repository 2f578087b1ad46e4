// tests/postgres_tests.rs

//! Round-trips against a real PostgreSQL. Skipped unless DATABASE_URL is set.

use std::sync::Arc;

use remediation::{
    error::AppError,
    models::{
        attempt::AttemptState,
        recommendation::RecommendationSource,
        review::{FinishOptions, SubmittedAnswer},
    },
    services::{Engine, EngineSettings},
    store::{AttemptStore, PgStore},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

async fn connect() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

struct Seeded {
    quiz_id: Uuid,
    questions: Vec<(Uuid, Uuid, Uuid)>,
}

/// Two one-point questions on one topic objective with three resources.
async fn seed(pool: &PgPool) -> Seeded {
    let quiz_id = Uuid::new_v4();
    let topic_id = Uuid::new_v4();

    sqlx::query("INSERT INTO topic_objectives (id, code, description) VALUES ($1, 'PG-1', 'Joins')")
        .bind(topic_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO quizzes (id, course_id, title) VALUES ($1, $2, 'SQL basics')")
        .bind(quiz_id)
        .bind(Uuid::new_v4())
        .execute(pool)
        .await
        .unwrap();

    let mut questions = Vec::new();
    for position in 0..2 {
        let (question_id, correct, wrong) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        sqlx::query(
            "INSERT INTO questions (id, quiz_id, text, points, topic_objective_id, position) \
             VALUES ($1, $2, 'Which join keeps unmatched rows?', 1, $3, $4)",
        )
        .bind(question_id)
        .bind(quiz_id)
        .bind(topic_id)
        .bind(position)
        .execute(pool)
        .await
        .unwrap();

        for (option_id, text, is_correct) in [(correct, "LEFT JOIN", true), (wrong, "INNER JOIN", false)] {
            sqlx::query("INSERT INTO options (id, question_id, text, is_correct) VALUES ($1, $2, $3, $4)")
                .bind(option_id)
                .bind(question_id)
                .bind(text)
                .bind(is_correct)
                .execute(pool)
                .await
                .unwrap();
        }
        questions.push((question_id, correct, wrong));
    }

    for (order, mandatory, duration) in [(2, false, Some(5)), (1, true, None), (1, true, Some(15))] {
        sqlx::query(
            "INSERT INTO resources \
             (id, topic_objective_id, title, type, url, duration_minutes, is_mandatory, display_order) \
             VALUES ($1, $2, 'Join guide', 'reading', 'https://example.org', $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(topic_id)
        .bind(duration)
        .bind(mandatory)
        .bind(order)
        .execute(pool)
        .await
        .unwrap();
    }

    Seeded { quiz_id, questions }
}

#[tokio::test]
async fn finish_round_trip() {
    let Some(pool) = connect().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let seeded = seed(&pool).await;
    let store = Arc::new(PgStore::new(pool));
    let engine = Engine::new(store.clone(), store.clone(), store.clone(), None, EngineSettings::default());
    let learner = Uuid::new_v4();

    let attempt = engine.start_attempt(learner, seeded.quiz_id).await.unwrap();
    assert!(matches!(
        engine.start_attempt(learner, seeded.quiz_id).await,
        Err(AppError::Conflict(_))
    ));

    let (q0, _, q0_wrong) = seeded.questions[0];
    let (q1, q1_correct, _) = seeded.questions[1];
    let answers = vec![
        SubmittedAnswer {
            question_id: q0,
            option_id: Some(q0_wrong),
            time_seconds: Some(30),
        },
        SubmittedAnswer {
            question_id: q1,
            option_id: Some(q1_correct),
            time_seconds: None,
        },
    ];

    let review = engine
        .finish_attempt(attempt.id, learner, &answers, FinishOptions::default())
        .await
        .unwrap();
    assert_eq!(review.attempt.percent, 50.0);
    assert_eq!(review.questions[0].selected_option.as_ref().unwrap().text, "INNER JOIN");

    // mandatory first, then the shorter duration, unknown duration after it
    let durations: Vec<Option<i32>> = review.questions[0]
        .recommendations
        .iter()
        .map(|r| r.duration_minutes)
        .collect();
    assert_eq!(durations, vec![Some(15), None, Some(5)]);

    let stored = store.recommendations(attempt.id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(
        stored
            .iter()
            .all(|s| s.recommendation.source == RecommendationSource::RuleBased)
    );

    let graded = store.attempt(attempt.id).await.unwrap().unwrap();
    assert_eq!(graded.state, AttemptState::Graded);
    assert_eq!(graded.score_total, Some(1.0));

    // The guarded update lets only one finisher through
    assert!(matches!(
        engine
            .finish_attempt(attempt.id, learner, &answers, FinishOptions::default())
            .await,
        Err(AppError::InvalidState(_))
    ));

    let rebuilt = engine.attempt_result(attempt.id, learner).await.unwrap();
    assert_eq!(rebuilt, review);

    // A personalized write over an existing row updates it in place
    let mut personalized = stored[2].recommendation.clone();
    personalized.rank = 1;
    personalized.why_text = Some("Short and on point.".to_string());
    personalized.source = RecommendationSource::LlmPersonalized;
    assert_eq!(store.save_recommendations(&[personalized.clone()]).await.unwrap(), 1);

    // while a rule-based write over it is dropped
    let mut rule_based = personalized.clone();
    rule_based.source = RecommendationSource::RuleBased;
    rule_based.why_text = None;
    assert_eq!(store.save_recommendations(&[rule_based]).await.unwrap(), 0);

    let after = store.recommendations(attempt.id).await.unwrap();
    assert_eq!(after.len(), 3);
    let updated = after
        .iter()
        .find(|s| s.recommendation.resource_id == personalized.resource_id)
        .unwrap();
    assert_eq!(updated.recommendation, personalized);
}
