use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use trip_planner::{
    config::{AppConfig, LlmConfig, PlannerMode, ToolsConfig},
    db::{init_pool, run_migrations},
    routes::create_router,
    services::{
        llm::{ChatResponse, ScriptedLlmClient},
        planner::TripPlanner,
        tools::ToolExecutor,
    },
    state::AppState,
};

struct TestApp {
    router: Router,
    script: ScriptedLlmClient,
    _dir: TempDir,
}

impl TestApp {
    async fn new(mode: PlannerMode) -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("routes.sqlite");
        let config = AppConfig {
            database_url: format!("sqlite://{}?mode=rwc", db_path.to_string_lossy()),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "routes-test-cookie-secret".into(),
            log_file: None,
            planner_mode: mode,
            agent_max_iterations: 3,
            llm: LlmConfig {
                api_key: String::new(),
                base_url: "http://127.0.0.1:9".into(),
                model: "test-model".into(),
                timeout: Duration::from_secs(1),
            },
            tools: ToolsConfig {
                nps_api_key: String::new(),
                nps_base_url: "http://127.0.0.1:9".into(),
                wikipedia_base_url: "http://127.0.0.1:9".into(),
            },
        };

        let db = init_pool(&config.database_url).await.unwrap();
        run_migrations(&db).await.unwrap();

        let script = ScriptedLlmClient::default();
        let planner = TripPlanner::new(
            Arc::new(script.clone()),
            mode,
            ToolExecutor::new(),
            config.agent_max_iterations,
        );
        let router = create_router(AppState::new(config, db, planner));
        Self {
            router,
            script,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn signup(&self, username: &str, password: &str) -> String {
        let body = format!("username={username}&password={password}&password_confirm={password}");
        let response = self.send(form_post("/signup", None, body)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/plan_trip");
        session_cookie(&response)
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn form_post(uri: &str, cookie: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn session_cookie(response: &Response) -> String {
    let raw = response.headers()[header::SET_COOKIE].to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn trip_json() -> Value {
    json!({
        "trip_name": "Utah loop",
        "location": "Zion National Park",
        "trip_start": "2024-05-01",
        "trip_end": "2024-05-02",
        "num_days": 2,
        "traveling_with": "Partner",
        "lodging": "Campsite",
        "adventure": "Hiking",
        "itinerary": [
            {"day": 1, "date": "2024-05-01", "morning": "Angels Landing",
             "afternoon": "Riverside Walk", "evening": "Stargazing"},
            {"day": "2", "date": "2024-05-02", "morning": "Canyon Overlook",
             "afternoon": "Kolob Canyons", "evening": "Drive home"}
        ]
    })
}

const TRIP_FORM: &str = "location-search=Zion+National+Park&trip-start=2024-05-01\
&trip-end=2024-05-02&trip-name=Utah+loop&traveling-with=Partner&lodging=Campsite\
&adventure=Hiking&adventure=Stargazing";

#[tokio::test]
async fn health_and_landing_are_public() {
    let app = TestApp::new(PlannerMode::Direct).await;

    let health = app.send(get("/health", None)).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_text(health).await, "OK");

    let landing = app.send(get("/", None)).await;
    assert_eq!(landing.status(), StatusCode::OK);
    let body = body_text(landing).await;
    assert!(body.contains("Get started"));
    assert!(!body.contains("Signed in as"));
}

#[tokio::test]
async fn planner_requires_a_session() {
    let app = TestApp::new(PlannerMode::Direct).await;

    let response = app.send(get("/plan_trip", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = app
        .send(form_post("/view_trip", None, TRIP_FORM.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.script.requests().is_empty());
}

#[tokio::test]
async fn signup_login_and_logout() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;

    let page = app.send(get("/plan_trip", Some(&cookie))).await;
    assert_eq!(page.status(), StatusCode::OK);
    let body = body_text(page).await;
    assert!(body.contains("name=\"location-search\""));
    assert!(body.contains("Signed in as ranger"));

    let logout = app.send(get("/logout", Some(&cookie))).await;
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&logout), "/");

    let stale = app.send(get("/plan_trip", Some(&cookie))).await;
    assert_eq!(stale.status(), StatusCode::SEE_OTHER);

    let wrong = app
        .send(form_post("/login", None, "username=ranger&password=nope".into()))
        .await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(wrong).await.contains("Invalid username or password"));

    let login = app
        .send(form_post("/login", None, "username=ranger&password=smokey".into()))
        .await;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&login), "/plan_trip");
}

#[tokio::test]
async fn signup_rejects_mismatched_and_duplicate_accounts() {
    let app = TestApp::new(PlannerMode::Direct).await;

    let mismatch = app
        .send(form_post(
            "/signup",
            None,
            "username=ranger&password=smokey&password_confirm=smokie".into(),
        ))
        .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(mismatch).await.contains("do not match"));

    app.signup("ranger", "smokey").await;
    let duplicate = app
        .send(form_post(
            "/signup",
            None,
            "username=ranger&password=smokey&password_confirm=smokey".into(),
        ))
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(duplicate).await.contains("already taken"));
}

#[tokio::test]
async fn missing_fields_rerender_the_form() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;

    let response = app
        .send(form_post(
            "/view_trip",
            Some(&cookie),
            "trip-name=Somewhere&adventure=Hiking".into(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Please fill in: destination, start date, end date."));
    assert!(body.contains("value=\"Somewhere\""));
    assert!(app.script.requests().is_empty());
}

#[tokio::test]
async fn view_trip_renders_the_itinerary() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;
    app.script.push(ChatResponse::text(trip_json().to_string()));

    let response = app
        .send(form_post("/view_trip", Some(&cookie), TRIP_FORM.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Angels Landing"));
    assert!(body.contains("Kolob Canyons"));
    assert!(body.contains("action=\"/download_pdf\""));
    assert!(body.contains("Signed in as ranger"));

    let requests = app.script.requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].messages.last().unwrap().content;
    assert!(prompt.contains("Hiking, Stargazing"));
}

#[tokio::test]
async fn create_trip_is_an_alias_for_view_trip() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;
    app.script.push(ChatResponse::text(trip_json().to_string()));

    let response = app
        .send(form_post("/create_trip", Some(&cookie), TRIP_FORM.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unusable_model_answer_shows_an_error_page() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;
    app.script.push(ChatResponse::text("I'd rather not."));

    let response = app
        .send(form_post("/view_trip", Some(&cookie), TRIP_FORM.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_text(response).await;
    assert!(body.contains("build an itinerary for this trip"));
    assert!(body.contains("Signed in as ranger"));
}

#[tokio::test]
async fn download_pdf_returns_an_attachment() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;

    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("itinerary", &trip_json().to_string())
        .finish();
    let response = app
        .send(form_post("/download_pdf", Some(&cookie), body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"utah-loop.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn download_pdf_rejects_a_broken_itinerary() {
    let app = TestApp::new(PlannerMode::Direct).await;
    let cookie = app.signup("ranger", "smokey").await;

    let mut trip = trip_json();
    trip["num_days"] = json!(5);
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("itinerary", &trip.to_string())
        .finish();
    let response = app
        .send(form_post("/download_pdf", Some(&cookie), body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
