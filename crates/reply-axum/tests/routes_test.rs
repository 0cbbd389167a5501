//! End-to-end tests: adapted handlers mounted on an axum router.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use reply_axum::{CsrfTokens, HttpNext, HttpRequest, HttpResponse, Routes};
use reply_core::{
    BoxError, Cookie, HandlerResult, Locals, Next as _, Redirect, Response as _, adapt,
};

type Next = HttpNext<BoxError>;

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> axum::response::Response {
    app.oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// An error handler that records what it was given and answers 418.
fn spy() -> (
    Arc<Mutex<Vec<String>>>,
    impl Fn(BoxError, &HttpRequest, &HttpResponse) -> reply_core::Result<()>
    + Send
    + Sync
    + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = move |err: BoxError, req: &HttpRequest, res: &HttpResponse| {
        sink.lock()
            .unwrap()
            .push(format!("{} {}", req.path(), err));
        res.status(418)?;
        res.send(None)
    };
    (seen, handler)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_and_body_reach_the_client() {
    let app = Routes::<BoxError>::new()
        .all(
            "/",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Ok::<_, BoxError>(HandlerResult::new().status(302).body("hello world"))
            }),
        )
        .into_router();

    let resp = send(app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp.headers().get(header::LOCATION).is_none());
    assert_eq!(body_text(resp).await, "hello world");
}

#[tokio::test]
async fn handler_errors_go_to_the_error_handler() {
    let (seen, errors) = spy();
    let app = Routes::<BoxError>::new()
        .get(
            "/error",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Err::<HandlerResult, BoxError>("error".into())
            }),
        )
        .error_handler(errors)
        .into_router();

    let resp = send(app, get("/error")).await;
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(*seen.lock().unwrap(), vec!["/error error".to_string()]);
}

#[tokio::test]
async fn default_error_handler_answers_json_500() {
    let app = Routes::<BoxError>::new()
        .get(
            "/boom",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Err::<HandlerResult, BoxError>("disk on fire".into())
            }),
        )
        .into_router();

    let resp = send(app, get("/boom")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({ "error": "disk on fire" }));
}

#[tokio::test]
async fn headers_and_cookies_are_applied() {
    let app = Routes::<BoxError>::new()
        .get(
            "/session",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Ok::<_, BoxError>(
                    HandlerResult::new()
                        .header("X-Powered-By", "reply")
                        .cookie(Cookie::new("rememberme", 1))
                        .cookie(Cookie::new("theme", "dark"))
                        .body(json!({ "ok": true })),
                )
            }),
        )
        .into_router();

    let resp = send(app, get("/session")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-powered-by"], "reply");
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let cookies: Vec<_> = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies, vec!["rememberme=1; Path=/", "theme=dark; Path=/"]);
    assert_eq!(body_json(resp).await, json!({ "ok": true }));
}

#[tokio::test]
async fn redirect_ignores_the_status_code() {
    let app = Routes::<BoxError>::new()
        .get(
            "/old",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Ok::<_, BoxError>(
                    HandlerResult::new()
                        .status(500)
                        .redirect(Redirect::with_status(301, "/new")),
                )
            }),
        )
        .into_router();

    let resp = send(app, get("/old")).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.headers()[header::LOCATION], "/new");
}

#[tokio::test]
async fn render_receives_a_verifiable_csrf_token() {
    let tokens = CsrfTokens::new(b"test-secret".to_vec());
    let app = Routes::<BoxError>::new()
        .get(
            "/form",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Ok::<_, BoxError>(
                    HandlerResult::new()
                        .render("form")
                        .local("title", "Sign up")
                        .csrf(),
                )
            }),
        )
        .views(|view: &str, locals: &Locals| -> Result<String, BoxError> {
            let title = locals["title"].as_str().unwrap_or_default();
            let csrf = locals["csrf"].as_str().unwrap_or_default();
            Ok(format!("{view}|{title}|{csrf}"))
        })
        .csrf(tokens.clone())
        .into_router();

    let resp = send(app, get("/form")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let body = body_text(resp).await;
    let parts: Vec<&str> = body.split('|').collect();
    assert_eq!(parts[..2], ["form", "Sign up"]);
    tokens.verify(parts[2]).expect("issued token should verify");
}

#[tokio::test]
async fn a_response_sent_by_the_handler_is_kept() {
    let (seen, errors) = spy();
    let app = Routes::<BoxError>::new()
        .post(
            "/direct",
            adapt(|_req: HttpRequest, res: HttpResponse, _next: Next, _: ()| async move {
                res.status(201)?;
                res.send(Some(json!({ "sent": "by handler" })))?;
                Ok::<_, BoxError>(HandlerResult::new())
            }),
        )
        .error_handler(errors)
        .into_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/direct")
        .body(Body::empty())
        .unwrap();
    let resp = send(app, request).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await, json!({ "sent": "by handler" }));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn collaborator_failures_become_500() {
    let (seen, errors) = spy();
    let app = Routes::<BoxError>::new()
        .get(
            "/view",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Ok::<_, BoxError>(HandlerResult::new().render("missing"))
            }),
        )
        .error_handler(errors)
        .into_router();

    let resp = send(app, get("/view")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(resp).await, "Internal Server Error");
    assert!(
        seen.lock().unwrap().is_empty(),
        "collaborator failures never reach the error handler"
    );
}

#[tokio::test]
async fn next_called_after_a_response_does_not_run_the_error_handler() {
    let (seen, errors) = spy();
    let app = Routes::<BoxError>::new()
        .get(
            "/both",
            adapt(|_req: HttpRequest, _res: HttpResponse, next: Next, _: ()| async move {
                next.call(BoxError::from("skipped"));
                Ok::<_, BoxError>(HandlerResult::new().body("sent"))
            }),
        )
        .error_handler(errors)
        .into_router();

    let resp = send(app, get("/both")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "sent");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = Routes::<BoxError>::new()
        .post(
            "/echo",
            adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
                Ok::<_, BoxError>(HandlerResult::new())
            }),
        )
        .body_limit(8)
        .into_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(Body::from("x".repeat(64)))
        .unwrap();
    let resp = send(app, request).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn handlers_read_the_json_body() {
    let app = Routes::<BoxError>::new()
        .post(
            "/echo",
            adapt(|req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async move {
                let value: Value = req.json()?;
                Ok::<_, BoxError>(
                    HandlerResult::new()
                        .status(201)
                        .body(json!({ "path": req.path(), "echo": value })),
                )
            }),
        )
        .into_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"tobi"}"#))
        .unwrap();
    let resp = send(app, request).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(resp).await,
        json!({ "path": "/echo", "echo": { "name": "tobi" } })
    );
}

#[tokio::test]
async fn method_routes_reject_other_methods() {
    let routes = Routes::<BoxError>::new().get(
        "/only-get",
        adapt(|_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()| async {
            Ok::<_, BoxError>(HandlerResult::new())
        }),
    );
    assert_eq!(routes.len(), 1);
    assert!(format!("{routes:?}").contains("/only-get"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/only-get")
        .body(Body::empty())
        .unwrap();
    let resp = send(routes.into_router(), request).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
