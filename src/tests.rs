//! Integration tests for the dinner-picker backend and client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::client::{ApiClient, ClientError};
use crate::config::{ClientConfig, Config, LogFormat};
use crate::db::{init_database, seed_demo_data, Repository};
use crate::models::{NewGroup, NewProposal, NewSession, SessionStatus, VotingSession};
use crate::store::DinnerPicker;
use crate::{create_router, AppState};

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
});

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    /// A server over a database holding the demo data.
    async fn new() -> Self {
        Self::with_seed(true).await
    }

    async fn with_seed(seed: bool) -> Self {
        Lazy::force(&TRACING);

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        if seed {
            seed_demo_data(&repo).await.expect("Failed to seed");
        }

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Text,
            seed_demo_data: seed,
            acting_user_id: 1,
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig::with_base_url(&self.base_url)
    }

    fn api(&self) -> ApiClient {
        ApiClient::new(&self.client_config()).unwrap()
    }

    fn picker(&self) -> DinnerPicker {
        DinnerPicker::new(self.client_config()).unwrap()
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Id of the seeded "Friday Team Lunch" session.
    async fn work_session_id(&self) -> i64 {
        let (_, groups) = self.get_json("/api/groups/user/1").await;
        let work = groups["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["name"] == "Work Team")
            .unwrap()
            .clone();
        work["votingSessions"][0]["id"].as_i64().unwrap()
    }
}

// ==================== RAW HTTP CONTRACT ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    let (status, body) = fixture.get_json("/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "UP");
}

#[tokio::test]
async fn test_seeded_user_groups() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/groups/user/1").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 3);

    let groups = body["data"].as_array().unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"Work Team"));
    assert!(names.contains(&"Weekend Squad"));
    assert!(names.contains(&"Family Dinners"));

    let work = groups.iter().find(|g| g["name"] == "Work Team").unwrap();
    assert_eq!(work["emojiIcon"], "💼");
    assert_eq!(work["colorTheme"], "#667eea");
    assert_eq!(work["members"][0]["name"], "Alex Johnson");
    assert_eq!(work["members"][0]["isAdmin"], true);
    assert_eq!(work["votingSessions"][0]["title"], "Friday Team Lunch");

    let (status, body) = fixture.get_json("/api/groups/user/0").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid user ID");
}

#[tokio::test]
async fn test_group_sessions_bare_array_newest_first() {
    let fixture = TestFixture::new().await;
    let session_id = fixture.work_session_id().await;

    let (_, session) = fixture.get_json(&format!("/api/sessions/{}", session_id)).await;
    let group_id = session["groupId"].as_i64().unwrap();
    assert_eq!(session["group"]["name"], "Work Team");
    assert!(session["deadline"].is_string());

    let (status, created) = fixture
        .post_json(
            "/api/sessions",
            json!({ "title": "Monday Breakfast", "groupId": group_id }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(created["success"], true);
    assert_eq!(created["session"]["title"], "Monday Breakfast");
    assert_eq!(created["session"]["locked"], false);

    let (status, sessions) = fixture
        .get_json(&format!("/api/sessions/group/{}", group_id))
        .await;
    assert_eq!(status, 200);
    let titles: Vec<&str> = sessions
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Monday Breakfast", "Friday Team Lunch"]);
}

#[tokio::test]
async fn test_session_options_ordered_by_votes() {
    let fixture = TestFixture::new().await;
    let session_id = fixture.work_session_id().await;

    let (status, body) = fixture
        .get_json(&format!("/api/sessions/{}/options", session_id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["name"], "Taco Fiesta");
    assert_eq!(body["data"][0]["votes"], 5);
    assert_eq!(body["data"][0]["priceRange"], "$");
    assert_eq!(body["data"][1]["name"], "Pasta Paradise");
    assert_eq!(body["data"][1]["votes"], 3);

    let (status, _) = fixture.get_json("/api/sessions/9999/options").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_create_group_and_validation() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json(
            "/api/groups",
            json!({ "name": "  Book Club ", "description": "Monthly", "emojiIcon": "📚", "colorTheme": "#123456" }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Group created successfully");
    assert_eq!(body["group"]["name"], "Book Club");
    assert_eq!(body["group"]["members"][0]["id"], 1);

    let (status, body) = fixture
        .post_json("/api/groups", json!({ "name": " ", "colorTheme": "blue" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"]["name"], "Group name is required");
    assert_eq!(body["errors"]["colorTheme"], "Color theme must be a hex color");

    let (status, body) = fixture
        .post_json("/api/groups", json!({ "name": "x".repeat(51) }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Group name must be less than 50 characters");
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/groups"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_vote_clamps_at_zero() {
    let fixture = TestFixture::new().await;
    let session_id = fixture.work_session_id().await;

    let (status, created) = fixture
        .post_json(
            "/api/options",
            json!({ "name": "Curry House", "link": "https://curry.example", "votingSessionId": session_id }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(created["message"], "Option added successfully");
    assert_eq!(created["option"]["votes"], 0);
    let option_id = created["option"]["id"].as_i64().unwrap();

    let (status, body) = fixture
        .post_json(&format!("/api/options/{}/vote", option_id), json!({ "delta": -1 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["votes"], 0);

    let (_, body) = fixture
        .post_json(&format!("/api/options/{}/vote", option_id), json!({ "delta": 1 }))
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["votes"], 1);

    let (status, body) = fixture
        .post_json("/api/options/9999/vote", json!({ "delta": 1 }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_vote_count_saturates() {
    let fixture = TestFixture::new().await;
    let session_id = fixture.work_session_id().await;

    let (_, created) = fixture
        .post_json(
            "/api/options",
            json!({ "name": "Burger Barn", "link": "https://burger.example", "votingSessionId": session_id }),
        )
        .await;
    let option_id = created["option"]["id"].as_i64().unwrap();

    let vote_url = format!("/api/options/{}/vote", option_id);

    for _ in 0..2 {
        let (status, _) = fixture.post_json(&vote_url, json!({ "delta": 2_000_000_000 })).await;
        assert_eq!(status, 200);
    }
    let (_, body) = fixture.post_json(&vote_url, json!({ "delta": 2_000_000_000 })).await;
    assert_eq!(body["data"]["votes"], u32::MAX);

    let (_, body) = fixture.post_json(&vote_url, json!({ "delta": -1 })).await;
    assert_eq!(body["data"]["votes"], u32::MAX - 1);
}

#[tokio::test]
async fn test_add_option_validation() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json(
            "/api/options",
            json!({ "name": "", "link": "ftp://x.com", "votingSessionId": 1 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["errors"]["name"], "Restaurant name is required");
    assert_eq!(body["errors"]["link"], "Link must start with http:// or https://");

    let (status, _) = fixture
        .post_json(
            "/api/options",
            json!({ "name": "Ghost Kitchen", "link": "https://ghost.example", "votingSessionId": 9999 }),
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_locked_session_rejects_writes() {
    let fixture = TestFixture::new().await;
    let session_id = fixture.work_session_id().await;

    let (status, _) = fixture
        .post_json(&format!("/api/sessions/{}/lock", session_id), json!({}))
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post_json(&format!("/api/sessions/{}/lock", session_id), json!({ "locked": true }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["session"]["locked"], true);
    let option_id = body["session"]["options"][0]["id"].as_i64().unwrap();

    let (status, body) = fixture
        .post_json(&format!("/api/options/{}/vote", option_id), json!({ "delta": 1 }))
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "Session is locked");

    let (status, _) = fixture
        .post_json(
            "/api/options",
            json!({ "name": "Late Entry", "link": "https://late.example", "votingSessionId": session_id }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = fixture
        .post_json(&format!("/api/sessions/{}/lock", session_id), json!({ "locked": false }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["session"]["locked"], false);

    let (status, _) = fixture
        .post_json("/api/sessions/9999/lock", json!({ "locked": true }))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_expired_session_rejects_votes() {
    let fixture = TestFixture::new().await;
    let deadline = Utc::now() + chrono::Duration::milliseconds(600);

    let (_, created) = fixture
        .post_json(
            "/api/sessions",
            json!({ "title": "Quick Poll", "groupId": 1, "deadline": deadline }),
        )
        .await;
    let session_id = created["session"]["id"].as_i64().unwrap();

    let (status, option) = fixture
        .post_json(
            "/api/options",
            json!({ "name": "Noodle Bar", "link": "https://noodles.example", "votingSessionId": session_id }),
        )
        .await;
    assert_eq!(status, 201);
    let option_id = option["option"]["id"].as_i64().unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;

    let (status, body) = fixture
        .post_json(&format!("/api/options/{}/vote", option_id), json!({ "delta": 1 }))
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "Voting deadline has passed");
}

#[tokio::test]
async fn test_revision_increments_on_write() {
    let fixture = TestFixture::with_seed(false).await;

    let (_, before) = fixture.get_json("/api/revision").await;
    let before = before["data"]["revisionId"].as_i64().unwrap();

    let (status, _) = fixture
        .post_json("/api/groups", json!({ "name": "Night Owls" }))
        .await;
    assert_eq!(status, 201);

    let (_, after) = fixture.get_json("/api/revision").await;
    assert!(after["data"]["revisionId"].as_i64().unwrap() > before);
}

#[tokio::test]
async fn test_delete_group() {
    let fixture = TestFixture::new().await;

    let (_, created) = fixture
        .post_json("/api/groups", json!({ "name": "Short Lived" }))
        .await;
    let id = created["group"]["id"].as_i64().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/groups/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let (status, body) = fixture.get_json(&format!("/api/groups/{}", id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Group not found");
}

// ==================== CLIENT ====================

#[tokio::test]
async fn test_client_normalizes_every_shape() {
    let fixture = TestFixture::new().await;
    let api = fixture.api();

    api.health().await.unwrap();

    let groups = api.user_groups(1).await.unwrap();
    assert_eq!(groups.len(), 3);

    let work = groups.iter().find(|g| g.name == "Work Team").unwrap();
    let sessions = api.group_sessions(work.id).await.unwrap();
    assert_eq!(sessions[0].title, "Friday Team Lunch");

    let session = api.get_session(sessions[0].id).await.unwrap();
    assert_eq!(session.options.len(), 2);
    assert_eq!(session.group.as_ref().unwrap().name, "Work Team");

    let options = api.session_options(session.id).await.unwrap();
    assert_eq!(options[0].name, "Taco Fiesta");

    let group = api.create_group(&NewGroup::new("Lunch Crew")).await.unwrap();
    assert_eq!(group.name, "Lunch Crew");

    let option = api
        .add_option(&NewProposal {
            name: "Falafel Stand".to_string(),
            link: "https://falafel.example".to_string(),
            price_range: Some("$".to_string()),
            voting_session_id: session.id,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(option.votes, 0);

    let voted = api.vote(option.id, 1).await.unwrap();
    assert_eq!(voted.votes, 1);

    let locked = api.lock_session(session.id, true).await.unwrap();
    assert!(locked.locked);
}

#[tokio::test]
async fn test_client_maps_server_errors() {
    let fixture = TestFixture::new().await;
    let api = fixture.api();

    let err = api.get_group(9999).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Group not found");
    assert!(!err.is_retryable());

    let session_id = fixture.work_session_id().await;
    api.lock_session(session_id, true).await.unwrap();
    let options = api.session_options(session_id).await.unwrap();

    let err = api.vote(options[0].id, 1).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.to_string(), "Session is locked");
}

#[tokio::test]
async fn test_client_validates_before_sending() {
    // Nothing listens here; a request would fail with a network error.
    let api = ApiClient::new(&ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap();

    let err = api.create_group(&NewGroup::new("   ")).await.unwrap_err();
    match err {
        ClientError::Validation(errors) => {
            assert_eq!(errors.get("name"), Some("Group name is required"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let err = api
        .add_option(&NewProposal {
            name: String::new(),
            link: "ftp://x.com".to_string(),
            voting_session_id: 1,
            ..Default::default()
        })
        .await
        .unwrap_err();
    match err {
        ClientError::Validation(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation error, got {:?}", other),
    }

    let err = api
        .create_session(&NewSession {
            title: "Late".to_string(),
            group_id: 1,
            deadline: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn test_client_network_error() {
    let api = ApiClient::new(&ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap();

    let err = api.list_groups().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert!(err.is_retryable());
}

// ==================== DINNER PICKER FACADE ====================

#[tokio::test]
async fn test_picker_home_stats_and_recent_wins() {
    let fixture = TestFixture::new().await;
    let picker = fixture.picker();

    let groups = picker.load_user_groups().await.unwrap();
    assert_eq!(groups.len(), 3);

    let stats = picker.home_stats().await;
    assert_eq!(stats.group_count, 3);
    assert_eq!(stats.active_sessions, 2);
    assert_eq!(stats.completed_sessions, 0);
    assert_eq!(stats.weekly_wins, 0);
    assert!(picker.recent_wins().await.is_empty());

    let session_id = fixture.work_session_id().await;
    picker.set_locked(session_id, true).await.unwrap();
    picker.load_user_groups().await.unwrap();

    let stats = picker.home_stats().await;
    assert_eq!(stats.completed_sessions, 1);
    assert_eq!(stats.weekly_wins, 1);

    let wins = picker.recent_wins().await;
    assert_eq!(wins.len(), 1);
    assert_eq!(wins[0].winner.name, "Taco Fiesta");
    assert_eq!(wins[0].total_votes, 8);
    assert_eq!(wins[0].win_percentage, 63);
    assert_eq!(wins[0].group.name, "Work Team");
}

#[tokio::test]
async fn test_picker_vote_updates_store_and_gates_repeats() {
    let fixture = TestFixture::new().await;
    let picker = fixture.picker();
    let session_id = fixture.work_session_id().await;

    let session = picker.refresh_session(session_id).await.unwrap();
    let pasta = session
        .options
        .iter()
        .find(|o| o.name == "Pasta Paradise")
        .unwrap()
        .id;

    let updated = picker.vote(pasta, 1).await.unwrap();
    assert_eq!(updated.votes, 4);

    // Still cooling down from the first vote.
    let err = picker.vote(pasta, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::StateConflict(_)));

    let snapshot = picker.session_snapshot(session_id).await.unwrap();
    assert!(!snapshot.stale);
    assert_eq!(snapshot.status, SessionStatus::Active);
    assert_eq!(snapshot.tally.total_votes, 9);
    assert_eq!(snapshot.tally.ranked[0].proposal.name, "Taco Fiesta");
    assert_eq!(snapshot.tally.percentages, vec![56, 44]);

    tokio::time::sleep(picker.config().vote_cooldown + Duration::from_millis(100)).await;
    let updated = picker.vote(pasta, -1).await.unwrap();
    assert_eq!(updated.votes, 3);
}

#[tokio::test]
async fn test_picker_rejects_downvote_at_zero_and_closed_sessions() {
    let fixture = TestFixture::new().await;
    let picker = fixture.picker();
    let session_id = fixture.work_session_id().await;

    let option = picker
        .add_option(&NewProposal {
            name: "Salad Bar".to_string(),
            link: "https://salad.example".to_string(),
            voting_session_id: session_id,
            ..Default::default()
        })
        .await
        .unwrap();

    let err = picker.vote(option.id, -1).await.unwrap_err();
    assert!(matches!(err, ClientError::StateConflict(_)));

    let session = picker.set_locked(session_id, true).await.unwrap();
    assert!(session.locked);
    assert_eq!(session.options.len(), 3);

    let err = picker.vote(option.id, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::StateConflict(_)));

    let err = picker
        .add_option(&NewProposal {
            name: "Too Late".to_string(),
            link: "https://late.example".to_string(),
            voting_session_id: session_id,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::StateConflict(_)));

    let snapshot = picker.session_snapshot(session_id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert!(snapshot.voting_closed);
    assert_eq!(snapshot.tally.winner().unwrap().proposal.name, "Taco Fiesta");
}

/// Accepts connections on an ephemeral port and counts them.
async fn counting_listener() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    (base_url, connections)
}

#[tokio::test]
async fn test_picker_local_rejections_stay_offline() {
    let (base_url, connections) = counting_listener().await;
    let picker = DinnerPicker::new(ClientConfig::with_base_url(&base_url)).unwrap();

    let session: VotingSession = serde_json::from_value(json!({
        "id": 5,
        "title": "Lunch",
        "groupId": 1,
        "createdAt": "2024-03-01T12:00:00",
        "options": [{
            "id": 11,
            "name": "Noodle Bar",
            "link": "https://noodles.example",
            "votes": 0,
            "votingSessionId": 5,
            "createdAt": "2024-03-01T12:00:00"
        }]
    }))
    .unwrap();
    picker.store().write().await.put_session(session);

    let err = picker
        .add_option(&NewProposal {
            name: String::new(),
            link: "ftp://x.com".to_string(),
            voting_session_id: 5,
            ..Default::default()
        })
        .await
        .unwrap_err();
    match err {
        ClientError::Validation(errors) => {
            assert!(errors.get("name").is_some());
            assert!(errors.get("link").is_some());
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let err = picker.vote(11, 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = picker.vote(11, -1).await.unwrap_err();
    assert!(matches!(err, ClientError::StateConflict(_)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 0);
    assert!(!picker.store().read().await.is_stale(5));
}

#[tokio::test]
async fn test_picker_create_flow() {
    let fixture = TestFixture::with_seed(false).await;
    let picker = fixture.picker();

    let group = picker.create_group(&NewGroup::new("Game Night")).await.unwrap();
    let session = picker
        .create_session(&NewSession {
            title: "Pizza Friday".to_string(),
            group_id: group.id,
            deadline: Some(Utc::now() + chrono::Duration::days(1)),
            ..Default::default()
        })
        .await
        .unwrap();

    let sessions = picker.load_group_sessions(group.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session.id);
    assert_eq!(sessions[0].status(Utc::now()), SessionStatus::Active);

    let loaded = picker.load_group(group.id).await.unwrap();
    assert_eq!(loaded.voting_sessions.len(), 1);
}

#[tokio::test]
async fn test_session_watcher_publishes_and_stops() {
    let fixture = TestFixture::new().await;
    let picker = fixture.picker();
    let session_id = fixture.work_session_id().await;

    let watcher = picker.watch_session(session_id);
    let mut rx = watcher.subscribe();

    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.is_some()))
        .await
        .expect("first snapshot")
        .unwrap();
    let first = watcher.latest().unwrap();
    assert_eq!(first.session.title, "Friday Team Lunch");
    assert_eq!(first.tally.total_votes, 8);

    // Someone else votes; a manual refresh picks it up.
    let option_id = first.tally.ranked[0].proposal.id;
    let (status, _) = fixture
        .post_json(&format!("/api/options/{}/vote", option_id), json!({ "delta": 1 }))
        .await;
    assert_eq!(status, 200);

    watcher.refresh();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.as_ref().is_some_and(|s| s.tally.total_votes == 9)),
    )
    .await
    .expect("refreshed snapshot")
    .unwrap();

    assert!(watcher.is_running());
    watcher.stop().await;
}

#[tokio::test]
async fn test_dropping_session_watcher_cancels_polling() {
    let fixture = TestFixture::new().await;
    let picker = fixture.picker();
    let session_id = fixture.work_session_id().await;

    let watcher = picker.watch_session(session_id);
    let mut rx = watcher.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.is_some()))
        .await
        .expect("first snapshot")
        .unwrap();

    drop(watcher);

    // The sender lives in the task, so the channel closes once it exits.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok(), "watcher task still running after drop");
}
