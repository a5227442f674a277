use super::*;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    routing::post,
    Form, Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{error::TransportError, transport::PASSWORD_RESET_PATH};

#[derive(Debug, Clone)]
struct CapturedPost {
    path: String,
    csrf_header: Option<String>,
    cookie: Option<String>,
    form: Vec<(String, String)>,
}

#[derive(Clone)]
struct CaptureState {
    posts: Arc<Mutex<Vec<CapturedPost>>>,
    reply: Arc<Mutex<(StatusCode, Value)>>,
}

impl CaptureState {
    async fn reply_with(&self, status: StatusCode, body: Value) {
        *self.reply.lock().await = (status, body);
    }

    async fn posts(&self) -> Vec<CapturedPost> {
        self.posts.lock().await.clone()
    }
}

async fn capture_post(
    State(state): State<CaptureState>,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    state.posts.lock().await.push(CapturedPost {
        path: uri.path().to_string(),
        csrf_header: header("x-csrftoken"),
        cookie: header("cookie"),
        form,
    });
    let (status, body) = state.reply.lock().await.clone();
    (status, Json(body))
}

async fn spawn_validation_server() -> anyhow::Result<(String, CaptureState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = CaptureState {
        posts: Arc::new(Mutex::new(Vec::new())),
        reply: Arc::new(Mutex::new((StatusCode::OK, json!({ "success": true })))),
    };
    let app = Router::new()
        .route(
            "/api/validate/:reservation_type/:step/",
            post(capture_post),
        )
        .route(PASSWORD_RESET_PATH, post(capture_post))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn validate_step_posts_form_with_csrf_token() {
    let (server_url, server) = spawn_validation_server().await.expect("spawn server");
    server
        .reply_with(
            StatusCode::OK,
            json!({ "success": true, "customer_id": 41, "price_data": null }),
        )
        .await;
    let transport = HttpTransport::new(Url::parse(&server_url).expect("url"))
        .with_csrf_token("tok-123");

    let params = pairs(&[
        ("out_date", "06/01/2026"),
        ("email", "ada@example.com"),
        ("reservationType", "rental"),
        ("step", "details"),
    ]);
    let response = transport
        .validate_step(ReservationType::Rental, Step::Details, &params)
        .await
        .expect("response");

    assert!(response.success);
    assert_eq!(
        response.customer_id(),
        Some(shared::domain::CustomerId(41))
    );
    let posts = server.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].path, "/api/validate/rental/details/");
    assert_eq!(posts[0].csrf_header.as_deref(), Some("tok-123"));
    assert_eq!(posts[0].cookie.as_deref(), Some("csrftoken=tok-123"));
    assert_eq!(posts[0].form, params);
}

#[tokio::test]
async fn error_status_is_a_transport_error() {
    let (server_url, server) = spawn_validation_server().await.expect("spawn server");
    server
        .reply_with(StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": "boom" }))
        .await;
    let transport = HttpTransport::new(Url::parse(&server_url).expect("url"));

    let err = transport
        .validate_step(ReservationType::Joyride, Step::Payment, &[])
        .await
        .expect_err("500 must fail");

    match err {
        TransportError::Status { status, endpoint } => {
            assert_eq!(status, 500);
            assert!(endpoint.ends_with("/api/validate/joyride/payment/"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn body_that_is_not_a_step_response_fails_to_decode() {
    let (server_url, server) = spawn_validation_server().await.expect("spawn server");
    server.reply_with(StatusCode::OK, json!("maintenance")).await;
    let transport = HttpTransport::new(Url::parse(&server_url).expect("url"));

    let err = transport
        .validate_step(ReservationType::Gift, Step::Payment, &[])
        .await
        .expect_err("string body must fail");

    assert!(matches!(err, TransportError::Decode { .. }));
}

#[tokio::test]
async fn password_reset_posts_the_email() {
    let (server_url, server) = spawn_validation_server().await.expect("spawn server");
    server
        .reply_with(StatusCode::OK, json!({ "success": false, "error": "Unknown email." }))
        .await;
    let transport = HttpTransport::new(Url::parse(&server_url).expect("url"));

    let response = transport
        .request_password_reset("ada@example.com")
        .await
        .expect("response");

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Unknown email."));
    let posts = server.posts().await;
    assert_eq!(posts[0].path, PASSWORD_RESET_PATH);
    assert_eq!(posts[0].form, pairs(&[("email", "ada@example.com")]));
    assert_eq!(posts[0].csrf_header, None);
}

#[tokio::test]
async fn controller_redirects_through_http_transport() {
    let (server_url, server) = spawn_validation_server().await.expect("spawn server");
    server
        .reply_with(
            StatusCode::OK,
            json!({
                "success": true,
                "reservation_type": "joyride",
                "customer_site_url": "/customer/reservations/r-1/"
            }),
        )
        .await;
    let settings = ClientSettings {
        server_url: server_url.clone(),
        csrf_token: Some("tok-9".into()),
        request_timeout_secs: Some(5),
        ..ClientSettings::default()
    };
    let controller = WizardController::from_settings(
        &settings,
        RecordingView::new(),
        ReservationType::Joyride,
    )
    .expect("controller");

    let draft: ReservationDraft = [("cc_number", "4242 4242 4242 4242")].into_iter().collect();
    let outcome = controller
        .submit_step(ReservationType::Joyride, Step::Payment, &draft)
        .await;

    assert_eq!(
        outcome,
        StepOutcome::Redirected {
            step: Step::Payment,
            url: format!("{server_url}/customer/reservations/r-1/")
        }
    );
    let posts = server.posts().await;
    assert_eq!(posts[0].path, "/api/validate/joyride/payment/");
    assert_eq!(posts[0].csrf_header.as_deref(), Some("tok-9"));
    assert!(posts[0]
        .form
        .contains(&("method".to_string(), "joyride".to_string())));
    let view = controller.into_view();
    assert_eq!(
        view.snapshot.location,
        Some(format!("{server_url}/customer/reservations/r-1/"))
    );
}
