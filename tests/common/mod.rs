// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use remediation::{
    config::{Config, DEFAULT_JWT_EXPIRATION_SECS, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL},
    error::ExternalError,
    llm::TextGenerator,
    models::{
        attempt::Quiz,
        profile::{CourseProfile, LearningProfile},
        question::{Question, QuestionOption, TopicObjective},
        resource::Resource,
    },
    routes,
    services::{Engine, EngineSettings, policy::RecommendationPolicy},
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test_secret_for_integration_tests";

pub const ANALYSIS: &str = "You confused the loop bound with the loop body.";
pub const WHY: &str = "A short beginner video that fits your weekly time.";

/// Answers error-analysis and why-text prompts independently.
/// `None` makes that kind of call fail, as does any prompt mentioning
/// the topic set with `failing_on_topic`.
pub struct ScriptedGenerator {
    analysis: Option<String>,
    why: Option<String>,
    failing_topic: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(analysis: Option<&str>, why: Option<&str>) -> Self {
        Self {
            analysis: analysis.map(str::to_string),
            why: why.map(str::to_string),
            failing_topic: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn working() -> Self {
        Self::new(Some(ANALYSIS), Some(WHY))
    }

    pub fn failing_on_topic(mut self, topic_description: &str) -> Self {
        self.failing_topic = Some(topic_description.to_string());
        self
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let on_failing_topic = self
            .failing_topic
            .as_deref()
            .is_some_and(|topic| prompt.contains(topic));
        let answer = if on_failing_topic {
            &None
        } else if prompt.starts_with("Write a short analysis") {
            &self.analysis
        } else {
            &self.why
        };
        answer.clone().ok_or(ExternalError::Api {
            status: 500,
            message: "scripted failure".to_string(),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        rust_log: "error".to_string(),
        llm_api_key: None,
        llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
        llm_model: DEFAULT_LLM_MODEL.to_string(),
        llm_timeout_secs: 5,
        llm_concurrency: 4,
        recommendation_limit: 3,
        personalized_recommendation_limit: 3,
        recommendation_policy_path: None,
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
}

/// Spawns the app on a random port, backed by an in-memory store.
pub async fn spawn_app(generator: Option<Arc<dyn TextGenerator>>) -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());

    let engine = Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        generator,
        EngineSettings::from_config(&config, RecommendationPolicy::default()),
    );
    let state = AppState {
        engine: Arc::new(engine),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
    }
}

impl TestApp {
    pub fn token(&self, learner_id: Uuid) -> String {
        sign_jwt(learner_id, "student", TEST_SECRET, DEFAULT_JWT_EXPIRATION_SECS).expect("Failed to sign token")
    }

    pub async fn get(&self, path: &str, learner_id: Uuid) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(self.token(learner_id))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, learner_id: Uuid, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(self.token(learner_id))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Starts an attempt and returns its id.
    pub async fn start(&self, quiz_id: Uuid, learner_id: Uuid) -> Uuid {
        let response = self
            .post(&format!("/api/quizzes/{}/attempts", quiz_id), learner_id, serde_json::json!({}))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: serde_json::Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn finish(&self, attempt_id: Uuid, learner_id: Uuid, answers: serde_json::Value) -> reqwest::Response {
        self.post(
            &format!("/api/attempts/{}/finish", attempt_id),
            learner_id,
            serde_json::json!({ "answers": answers }),
        )
        .await
    }
}

pub struct SeededQuestion {
    pub id: Uuid,
    pub correct: Uuid,
    pub wrong: Uuid,
}

pub struct SeededQuiz {
    pub quiz: Quiz,
    pub topic_objective: TopicObjective,
    pub questions: Vec<SeededQuestion>,
    pub resources: Vec<Resource>,
}

/// One-point questions sharing one topic objective.
/// Resource 0 is mandatory; the others are optional, in display order.
pub fn seed_quiz(store: &MemoryStore, question_count: usize, resource_count: usize) -> SeededQuiz {
    let quiz = Quiz {
        id: Uuid::new_v4(),
        course_id: Uuid::new_v4(),
        title: "Control flow".to_string(),
        attempt_limit: None,
        is_active: true,
    };
    store.add_quiz(quiz.clone());

    let topic_objective = TopicObjective {
        id: Uuid::new_v4(),
        code: Some("CF-1".to_string()),
        description: "Loop termination".to_string(),
    };
    store.add_topic_objective(topic_objective.clone());

    let questions = (0..question_count)
        .map(|i| {
            let seeded = SeededQuestion {
                id: Uuid::new_v4(),
                correct: Uuid::new_v4(),
                wrong: Uuid::new_v4(),
            };
            store.add_question(Question {
                id: seeded.id,
                quiz_id: quiz.id,
                text: format!("Question {}", i + 1),
                points: 1.0,
                topic_objective_id: topic_objective.id,
                explanation: Some(format!("Explanation {}", i + 1)),
                position: i as i32,
            });
            store.add_option(QuestionOption {
                id: seeded.correct,
                question_id: seeded.id,
                text: "Right".to_string(),
                is_correct: true,
            });
            store.add_option(QuestionOption {
                id: seeded.wrong,
                question_id: seeded.id,
                text: "Wrong".to_string(),
                is_correct: false,
            });
            seeded
        })
        .collect();

    let resources = (0..resource_count)
        .map(|i| {
            let resource = Resource {
                id: Uuid::new_v4(),
                topic_objective_id: topic_objective.id,
                title: format!("Resource {}", i),
                resource_type: if i % 2 == 0 { "video" } else { "exercise" }.to_string(),
                url: format!("https://learn.example.org/{}", i),
                duration_minutes: Some(10 * (i as i32 + 1)),
                difficulty: Some("beginner".to_string()),
                is_mandatory: i == 0,
                display_order: i as i32,
            };
            store.add_resource(resource.clone());
            resource
        })
        .collect();

    SeededQuiz {
        quiz,
        topic_objective,
        questions,
        resources,
    }
}

/// Adds one one-point question on a fresh topic objective, with its own
/// optional resources, after the quiz's existing questions.
pub fn seed_topic_question(
    store: &MemoryStore,
    quiz_id: Uuid,
    description: &str,
    position: i32,
    resource_count: usize,
) -> (TopicObjective, SeededQuestion, Vec<Resource>) {
    let topic_objective = TopicObjective {
        id: Uuid::new_v4(),
        code: None,
        description: description.to_string(),
    };
    store.add_topic_objective(topic_objective.clone());

    let seeded = SeededQuestion {
        id: Uuid::new_v4(),
        correct: Uuid::new_v4(),
        wrong: Uuid::new_v4(),
    };
    store.add_question(Question {
        id: seeded.id,
        quiz_id,
        text: format!("Question on {}", description),
        points: 1.0,
        topic_objective_id: topic_objective.id,
        explanation: None,
        position,
    });
    for (id, is_correct) in [(seeded.correct, true), (seeded.wrong, false)] {
        store.add_option(QuestionOption {
            id,
            question_id: seeded.id,
            text: if is_correct { "Right" } else { "Wrong" }.to_string(),
            is_correct,
        });
    }

    let resources = (0..resource_count)
        .map(|i| {
            let resource = Resource {
                id: Uuid::new_v4(),
                topic_objective_id: topic_objective.id,
                title: format!("{} resource {}", description, i),
                resource_type: "reading".to_string(),
                url: format!("https://learn.example.org/extra/{}", i),
                duration_minutes: Some(15),
                difficulty: Some("beginner".to_string()),
                is_mandatory: false,
                display_order: i as i32,
            };
            store.add_resource(resource.clone());
            resource
        })
        .collect();

    (topic_objective, seeded, resources)
}

/// Gives the learner both profiles for the quiz's course.
pub fn seed_profiles(store: &MemoryStore, learner_id: Uuid, course_id: Uuid) {
    store.set_learning_profile(
        learner_id,
        LearningProfile {
            preferred_modalities: vec!["video".to_string()],
            interests: vec!["algorithms".to_string()],
            career: None,
        },
    );
    store.set_course_profile(
        learner_id,
        course_id,
        CourseProfile {
            prereq_level: Some("beginner".to_string()),
            weekly_time: Some("h3_6".to_string()),
            goals: Vec::new(),
        },
    );
}
