use super::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::Bit;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct FakeSimulator {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeSimulator {
    fn record(&self, path: &str, body: Value) {
        self.requests
            .lock()
            .expect("requests lock")
            .push((path.to_string(), body));
    }

    fn recorded(&self) -> Vec<(String, Value)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn ground_state_json() -> Value {
    json!({
        "vector": {
            "00": {"real": 1.0, "imag": 0.0},
            "01": {"real": 0.0, "imag": 0.0},
            "10": {"real": 0.0, "imag": 0.0},
            "11": {"real": 0.0, "imag": 0.0}
        },
        "collapsed": {"Q1": false, "Q2": false},
        "last_measurement": {"Q1": null, "Q2": null}
    })
}

async fn new_session(State(sim): State<FakeSimulator>) -> Json<Value> {
    sim.record("/session/new", Value::Null);
    Json(json!({"session_id": "sess-1", "state": ground_state_json()}))
}

async fn fetch_state(
    State(sim): State<FakeSimulator>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sim.record("/state", json!(session_id));
    if session_id != "sess-1" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Session not found"})),
        ));
    }
    Ok(Json(json!({"state": ground_state_json()})))
}

async fn apply_gate(State(sim): State<FakeSimulator>, Json(body): Json<Value>) -> Json<Value> {
    sim.record("/gate/apply", body);
    Json(json!({"state": ground_state_json()}))
}

async fn measure(State(sim): State<FakeSimulator>, Json(body): Json<Value>) -> Json<Value> {
    sim.record("/measure", body);
    let mut state = ground_state_json();
    state["collapsed"] = json!({"Q1": true, "Q2": true});
    state["last_measurement"] = json!({"Q1": 1, "Q2": 0});
    Json(json!({"outcome": {"Q1": 1, "Q2": 0}, "state": state}))
}

async fn reset(State(sim): State<FakeSimulator>, Json(body): Json<Value>) -> Json<Value> {
    sim.record("/reset", body);
    Json(json!({"state": ground_state_json()}))
}

async fn hard_reset(State(sim): State<FakeSimulator>, Json(body): Json<Value>) -> Json<Value> {
    sim.record("/reset/hard", body);
    Json(json!({"state": ground_state_json()}))
}

async fn trials(
    State(sim): State<FakeSimulator>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sim.record("/trials", body.clone());
    if body["n"].as_u64().unwrap_or(0) == 0 {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Number of trials must be positive"})),
        ));
    }
    Ok(Json(json!({
        "counts": {"00": 6, "11": 4},
        "freqs": {"00": 0.6, "11": 0.4}
    })))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn slow_state() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"state": ground_state_json()}))
}

async fn garbage() -> &'static str {
    "not json"
}

async fn spawn_fake_simulator() -> (String, FakeSimulator) {
    let sim = FakeSimulator::default();
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/session/new", post(new_session))
        .route("/api/state/:session_id", get(fetch_state))
        .route("/api/gate/apply", post(apply_gate))
        .route("/api/measure", post(measure))
        .route("/api/reset", post(reset))
        .route("/api/reset/hard", post(hard_reset))
        .route("/api/trials", post(trials))
        .with_state(sim.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api/"), sim)
}

fn api_for(base: &str) -> HttpSimulatorApi {
    HttpSimulatorApi::new(&PlaygroundSettings::with_api_base(base)).expect("client")
}

#[tokio::test]
async fn round_trips_every_endpoint_with_wire_bodies() {
    let (base, sim) = spawn_fake_simulator().await;
    let api = api_for(&base);

    assert_eq!(api.health().await.expect("health").status, "ok");

    let session = api.new_session().await.expect("new session");
    assert_eq!(session.session_id.as_str(), "sess-1");
    assert_eq!(session.state, shared::protocol::QuantumState::ground());

    let id = session.session_id;
    api.fetch_state(&id).await.expect("fetch");
    api.apply_gate(&id, GateKind::Cnot).await.expect("gate");
    let measured = api.measure(&id, MeasureScope::Both).await.expect("measure");
    assert_eq!(measured.outcome.q1, Some(Bit::One));
    assert_eq!(measured.outcome.q2, Some(Bit::Zero));
    assert!(measured.state.collapsed.q1);
    api.reset_qubit(&id, QubitId::Q2).await.expect("reset");
    api.hard_reset(&id).await.expect("hard reset");
    let trials = api
        .run_trials(&id, MeasureScope::Q1, 10)
        .await
        .expect("trials");
    assert_eq!(trials.counts.get("00"), Some(&6));
    assert_eq!(trials.freqs.get("11"), Some(&0.4));

    let recorded = sim.recorded();
    let bodies: Vec<_> = recorded
        .iter()
        .map(|(path, body)| (path.as_str(), body.clone()))
        .collect();
    assert_eq!(
        bodies,
        vec![
            ("/session/new", Value::Null),
            ("/state", json!("sess-1")),
            ("/gate/apply", json!({"session_id": "sess-1", "gate": "CNOT"})),
            ("/measure", json!({"session_id": "sess-1", "qubit": "BOTH"})),
            ("/reset", json!({"session_id": "sess-1", "qubit": "Q2"})),
            ("/reset/hard", json!({"session_id": "sess-1"})),
            ("/trials", json!({"session_id": "sess-1", "qubit": "Q1", "n": 10})),
        ]
    );
}

#[tokio::test]
async fn non_success_status_keeps_server_detail() {
    let (base, _sim) = spawn_fake_simulator().await;
    let api = api_for(&base);

    let err = api
        .fetch_state(&SessionId("missing".into()))
        .await
        .expect_err("unknown session");
    match err {
        TransportError::Status { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail.as_deref(), Some("Session not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn session_id_is_sent_as_one_encoded_path_segment() {
    let (base, sim) = spawn_fake_simulator().await;
    let api = api_for(&base);

    let err = api
        .fetch_state(&SessionId("odd/id?x=1".into()))
        .await
        .expect_err("unknown session");
    assert!(
        matches!(err, TransportError::Status { status: 404, .. }),
        "{err:?}"
    );
    // The whole id reached the `:session_id` route intact.
    assert_eq!(sim.recorded(), vec![("/state".to_string(), json!("odd/id?x=1"))]);
}

#[test]
fn endpoint_percent_encodes_segments() {
    let api = api_for("http://127.0.0.1:8000/api/");
    let url = api.endpoint(&["state", "a/b?c#d"]).expect("endpoint");
    assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/state/a%2Fb%3Fc%23d");

    let rootless = api_for("http://127.0.0.1:8000");
    let url = rootless.endpoint(&["health"]).expect("endpoint");
    assert_eq!(url.as_str(), "http://127.0.0.1:8000/health");
}

#[tokio::test]
async fn server_rejection_of_out_of_range_trials_is_a_status_error() {
    let (base, _sim) = spawn_fake_simulator().await;
    let api = api_for(&base);

    let err = api
        .run_trials(&SessionId("sess-1".into()), MeasureScope::Both, 0)
        .await
        .expect_err("rejected");
    assert!(matches!(err, TransportError::Status { status: 500, .. }));
}

#[tokio::test]
async fn unreachable_simulator_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = api_for(&format!("http://{addr}/api"));
    let err = api.new_session().await.expect_err("nothing listening");
    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn slow_response_times_out_as_network_error() {
    let app = Router::new().route("/api/state/:session_id", get(slow_state));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let settings = PlaygroundSettings {
        api_base: format!("http://{addr}/api"),
        request_timeout: Duration::from_millis(200),
        ..PlaygroundSettings::default()
    };
    let api = HttpSimulatorApi::new(&settings).expect("client");
    let err = api
        .fetch_state(&SessionId("sess-1".into()))
        .await
        .expect_err("timed out");
    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let app = Router::new().route("/api/session/new", post(garbage));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let api = api_for(&format!("http://{addr}/api"));
    let err = api.new_session().await.expect_err("garbage body");
    assert!(matches!(err, TransportError::Decode(_)), "{err:?}");
}

#[test]
fn invalid_base_url_is_rejected_at_construction() {
    let err = HttpSimulatorApi::new(&PlaygroundSettings::with_api_base("not a url"))
        .expect_err("invalid base");
    assert!(matches!(err, TransportError::InvalidBaseUrl(_)));
}
