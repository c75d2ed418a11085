//! HTTP flow tests driving the router in-process

use ascent::api::{create_app, AppState};
use ascent::config::ApiConfig;
use ascent::games::{RandomSource, RoundEngine, ScriptedSource, VrfRandomSource};
use ascent::session_store::SessionLimits;
use ascent::{Amount, SessionStore};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SESSION: &str = "x-session-id";

fn state_with(source: Arc<dyn RandomSource>, limits: SessionLimits) -> Arc<AppState> {
    let engine = Arc::new(RoundEngine::new(0.01, source).unwrap());
    let store = SessionStore::new(engine, Amount::from_minor(100_000), 20).with_limits(limits);
    Arc::new(AppState::new(store))
}

fn app_with(source: Arc<dyn RandomSource>) -> Router {
    let state = state_with(source, SessionLimits::default());
    create_app(state, &ApiConfig::default())
}

fn scripted_app(draws: &[f64]) -> Router {
    app_with(Arc::new(ScriptedSource::new(draws.iter().copied())))
}

struct Reply {
    status: StatusCode,
    session: Option<String>,
    request_id: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    session: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = session {
        builder = builder.header(SESSION, id);
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let status = response.status();
    let session = header(SESSION);
    let request_id = header("x-request-id");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();

    Reply {
        status,
        session,
        request_id,
        body,
    }
}

async fn send_raw(app: &Router, uri: &str, session: Option<&str>, body: &'static str) -> Reply {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION, id);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    Reply {
        status,
        session: None,
        request_id: None,
        body,
    }
}

async fn open_session(app: &Router) -> String {
    let reply = send(app, Method::POST, "/api/session", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.json()["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_carries_request_id() {
    let app = scripted_app(&[]);
    let reply = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "Running");
    assert!(reply.request_id.is_some());
}

#[tokio::test]
async fn test_round_cashed_out_over_http() {
    let app = scripted_app(&[0.604]);
    let id = open_session(&app).await;

    let started = send(&app, Method::POST, "/api/crash/start", Some(id.as_str()), Some(json!({"bet": 100.0}))).await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.session.as_deref(), Some(id.as_str()));
    let body = started.json();
    assert_eq!(body["balance"].as_f64(), Some(900.0));
    assert_eq!(body["status"], "active");
    assert!(body.get("crash_point").is_none());

    let cashed = send(&app, Method::POST, "/api/crash/cashout", Some(id.as_str()), Some(json!({"multiplier": 2.0}))).await;
    assert_eq!(cashed.status, StatusCode::OK);
    let body = cashed.json();
    assert_eq!(body["winnings"].as_f64(), Some(200.0));
    assert_eq!(body["balance"].as_f64(), Some(1100.0));

    let balance = send(&app, Method::GET, "/api/balance", Some(id.as_str()), None).await.json();
    assert_eq!(balance["balance"].as_f64(), Some(1100.0));
    assert_eq!(balance["status"], "idle");
}

#[tokio::test]
async fn test_bust_then_forfeit_reveals_round() {
    let app = scripted_app(&[0.604]);
    let id = open_session(&app).await;
    send(&app, Method::POST, "/api/crash/start", Some(id.as_str()), Some(json!({"bet": 100.0}))).await;

    let busted = send(&app, Method::POST, "/api/crash/cashout", Some(id.as_str()), Some(json!({"multiplier": 2.5}))).await;
    assert_eq!(busted.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = busted.json();
    assert_eq!(body["error"]["code"], "BUSTED_OR_INVALID");
    assert!(body["request_id"].is_string());

    let balance = send(&app, Method::GET, "/api/balance", Some(id.as_str()), None).await.json();
    assert_eq!(balance["balance"].as_f64(), Some(900.0));
    assert_eq!(balance["status"], "active");

    let forfeited = send(&app, Method::POST, "/api/crash/forfeit", Some(id.as_str()), None).await;
    assert_eq!(forfeited.status, StatusCode::OK);
    let body = forfeited.json();
    assert_eq!(body["balance"].as_f64(), Some(900.0));
    assert_eq!(body["round"]["crash_point"].as_f64(), Some(2.5));
    assert_eq!(body["round"]["resolution"]["type"], "forfeited");

    let history = send(&app, Method::GET, "/api/history", Some(id.as_str()), None).await.json();
    assert_eq!(history["rounds"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_rejections_map_to_status_codes() {
    let app = scripted_app(&[0.9, 0.9]);
    let id = open_session(&app).await;

    let cases = [
        ("/api/crash/start", json!({"bet": 0.0}), StatusCode::BAD_REQUEST, "INVALID_BET"),
        ("/api/crash/start", json!({"bet": -5.0}), StatusCode::BAD_REQUEST, "INVALID_BET"),
        ("/api/crash/start", json!({"bet": 5000.0}), StatusCode::BAD_REQUEST, "INVALID_BET"),
        ("/api/crash/cashout", json!({"multiplier": 1.5}), StatusCode::CONFLICT, "NO_ACTIVE_ROUND"),
    ];
    for (uri, payload, status, code) in cases {
        let reply = send(&app, Method::POST, uri, Some(id.as_str()), Some(payload)).await;
        assert_eq!(reply.status, status, "{}", uri);
        assert_eq!(reply.json()["error"]["code"], code);
    }

    let forfeit = send(&app, Method::POST, "/api/crash/forfeit", Some(id.as_str()), None).await;
    assert_eq!(forfeit.status, StatusCode::CONFLICT);

    send(&app, Method::POST, "/api/crash/start", Some(id.as_str()), Some(json!({"bet": 10.0}))).await;
    let again = send(&app, Method::POST, "/api/crash/start", Some(id.as_str()), Some(json!({"bet": 10.0}))).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.json()["error"]["code"], "ROUND_IN_PROGRESS");

    let balance = send(&app, Method::GET, "/api/balance", Some(id.as_str()), None).await.json();
    assert_eq!(balance["balance"].as_f64(), Some(990.0));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = scripted_app(&[]);

    let created = send(&app, Method::POST, "/api/session", None, None).await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.session.clone().expect("session header");
    assert_eq!(created.json()["balance"].as_f64(), Some(1000.0));

    let unknown = send(&app, Method::GET, "/api/balance", Some("nope"), None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.json()["error"]["code"], "SESSION_NOT_FOUND");

    let ended = send(&app, Method::DELETE, "/api/session", Some(id.as_str()), None).await;
    assert_eq!(ended.status, StatusCode::OK);

    let gone = send(&app, Method::GET, "/api/balance", Some(id.as_str()), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let missing = send(&app, Method::DELETE, "/api/session", None, None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fairness_and_metrics() {
    let app = app_with(Arc::new(VrfRandomSource::new_random()));
    let id = open_session(&app).await;
    send(&app, Method::POST, "/api/crash/start", Some(id.as_str()), Some(json!({"bet": 1.0}))).await;
    send(&app, Method::POST, "/api/crash/forfeit", Some(id.as_str()), None).await;

    let fairness = send(&app, Method::GET, "/api/fairness", None, None).await.json();
    assert_eq!(fairness["house_edge"].as_f64(), Some(0.01));
    assert_eq!(fairness["source"], "vrf");
    assert_eq!(fairness["public_key"].as_str().map(str::len), Some(64));

    let metrics = send(&app, Method::GET, "/metrics", None, None).await;
    assert_eq!(metrics.status, StatusCode::OK);
    let text = String::from_utf8(metrics.body).unwrap();
    assert!(text.contains("ascent_rounds_started_total 1"));
    assert!(text.contains("ascent_rounds_forfeited_total 1"));
    assert!(text.contains("ascent_sessions_active 1"));
}

#[tokio::test]
async fn test_headerless_reads_do_not_open_sessions() {
    let state = state_with(Arc::new(ScriptedSource::new([0.9])), SessionLimits::default());
    let app = create_app(state.clone(), &ApiConfig::default());

    let reads = [
        (Method::GET, "/api/balance", None),
        (Method::GET, "/api/history", None),
        (Method::GET, "/api/session", None),
        (Method::POST, "/api/crash/forfeit", None),
        (Method::POST, "/api/crash/cashout", Some(json!({"multiplier": 1.5}))),
    ];
    for (method, uri, body) in reads {
        let reply = send(&app, method, uri, None, body).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(reply.json()["error"]["code"], "SESSION_REQUIRED");
        assert!(reply.session.is_none());
    }
    assert!(state.sessions.is_empty());

    // Starting a round is the one play action that may open a session
    let started = send(&app, Method::POST, "/api/crash/start", None, Some(json!({"bet": 10.0}))).await;
    assert_eq!(started.status, StatusCode::OK);
    let id = started.session.expect("session header");
    assert_eq!(state.sessions.len(), 1);

    let balance = send(&app, Method::GET, "/api/balance", Some(id.as_str()), None).await.json();
    assert_eq!(balance["balance"].as_f64(), Some(990.0));

    let metrics = send(&app, Method::GET, "/metrics", None, None).await;
    assert!(String::from_utf8(metrics.body).unwrap().contains("ascent_sessions_active 1"));
}

#[tokio::test]
async fn test_idle_session_expires_over_http() {
    let limits = SessionLimits {
        idle_ttl: Duration::from_millis(30),
        max_sessions: 100,
    };
    let state = state_with(Arc::new(ScriptedSource::new([])), limits);
    let app = create_app(state.clone(), &ApiConfig::default());

    let stale = open_session(&app).await;
    let _other = open_session(&app).await;
    assert_eq!(state.sessions.len(), 2);

    tokio::time::sleep(Duration::from_millis(80)).await;

    let gone = send(&app, Method::GET, "/api/balance", Some(stale.as_str()), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(state.sessions.evict_expired(), 1);
    assert!(state.sessions.is_empty());

    let metrics = send(&app, Method::GET, "/metrics", None, None).await;
    assert!(String::from_utf8(metrics.body).unwrap().contains("ascent_sessions_active 0"));
}

#[tokio::test]
async fn test_malformed_body_is_structured_bad_request() {
    let app = scripted_app(&[0.9]);
    let id = open_session(&app).await;

    let bodies = [
        ("/api/crash/start", r#"{"bet":"abc"}"#),
        ("/api/crash/start", "{not json"),
        ("/api/crash/cashout", r#"{"multiplier":null}"#),
    ];
    for (uri, body) in bodies {
        let reply = send_raw(&app, uri, Some(id.as_str()), body).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{} {}", uri, body);
        let json = reply.json();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert!(json["request_id"].is_string());
        assert!(!json["error"]["message"].as_str().unwrap_or_default().is_empty());
    }

    let balance = send(&app, Method::GET, "/api/balance", Some(id.as_str()), None).await.json();
    assert_eq!(balance["balance"].as_f64(), Some(1000.0));
    assert_eq!(balance["status"], "idle");
}
