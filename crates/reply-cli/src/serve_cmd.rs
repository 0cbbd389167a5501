use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;

use reply_axum::{
    CSRF_FIELD, CsrfError, CsrfTokens, HttpNext, HttpRequest, HttpResponse, Routes,
};
use reply_core::{
    Adapter, AdapterConfig, BoxError, Cookie, CookieOptions, HandlerResult, Locals, Redirect,
    Response as _, SameSite,
};

use crate::config::ReplyConfig;

type Next = HttpNext<BoxError>;
type Outcome = std::result::Result<HandlerResult, BoxError>;

const VISITS_MAX_AGE_MS: u64 = 15 * 60 * 1000;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(adapter: AdapterConfig, csrf: Option<CsrfTokens>) -> Router {
    let adapter = Adapter::with_config(adapter);
    let mut routes = Routes::<BoxError>::new()
        .get("/", adapter.adapt(index))
        .all("/redirect", adapter.adapt(redirect))
        .get("/session", adapter.adapt(session))
        .post("/echo", adapter.adapt(echo))
        .get("/form", adapter.adapt(show_form))
        .post("/form", adapter.adapt(submit_form))
        .all("/error", adapter.adapt(fail))
        .error_handler(handle_error)
        .views(render_view);
    if let Some(tokens) = csrf {
        routes = routes.csrf(tokens);
    }
    tracing::debug!(?routes, "demo routes");
    routes.into_router().layer(CorsLayer::permissive())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: ReplyConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    if config.csrf.is_none() {
        tracing::warn!("no CSRF secret configured; /form cannot issue tokens");
    }
    let app = build_router(config.adapter, config.csrf);
    tracing::info!("reply serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("reply serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    let html = "<!DOCTYPE html>\
<html><head><title>reply</title></head><body>\
<h1>reply</h1>\
<ul>\
<li><a href=\"/redirect\">/redirect</a></li>\
<li><a href=\"/session\">/session</a></li>\
<li><a href=\"/form\">/form</a></li>\
<li><a href=\"/error\">/error</a></li>\
</ul>\
<p>POST JSON to <code>/echo</code> to get it back.</p>\
</body></html>";
    Ok(HandlerResult::new().body(html))
}

async fn redirect(_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    Ok(HandlerResult::new().redirect(Redirect::to("/")))
}

async fn session(req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    let visits = req
        .cookie("visits")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    let options = CookieOptions {
        max_age: Some(VISITS_MAX_AGE_MS),
        http_only: true,
        same_site: Some(SameSite::Lax),
        ..CookieOptions::default()
    };
    Ok(HandlerResult::new()
        .header("Cache-Control", "no-store")
        .cookie(Cookie::new("visits", visits).options(options))
        .body(json!({ "visits": visits })))
}

async fn echo(req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    let value: serde_json::Value = req.json()?;
    Ok(HandlerResult::new().status(201).body(value))
}

async fn show_form(_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    Ok(HandlerResult::new()
        .render("form")
        .local("title", "Sign up")
        .csrf())
}

async fn submit_form(req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    req.verify_csrf()?;
    Ok(HandlerResult::new().redirect(Redirect::with_status(303, "/")))
}

async fn fail(_req: HttpRequest, _res: HttpResponse, _next: Next, _: ()) -> Outcome {
    Err("something broke".into())
}

// ---------------------------------------------------------------------------
// Errors and views
// ---------------------------------------------------------------------------

fn handle_error(err: BoxError, req: &HttpRequest, res: &HttpResponse) -> reply_core::Result<()> {
    let status = if err.downcast_ref::<CsrfError>().is_some() {
        403
    } else if err.downcast_ref::<serde_json::Error>().is_some() {
        400
    } else {
        500
    };
    tracing::warn!(
        method = %req.method(),
        path = req.path(),
        status,
        error = %err,
        "request failed"
    );
    res.status(status)?;
    res.send(Some(json!({ "error": err.to_string() })))
}

fn render_view(view: &str, locals: &Locals) -> std::result::Result<String, BoxError> {
    let local = |key: &str| locals.get(key).and_then(|v| v.as_str()).unwrap_or_default();
    match view {
        "form" => Ok(format!(
            "<!DOCTYPE html>\
<html><head><title>{title}</title></head><body>\
<h1>{title}</h1>\
<form method=\"post\" action=\"/form\">\
<input type=\"hidden\" name=\"{field}\" value=\"{csrf}\">\
<input name=\"email\" type=\"email\">\
<button type=\"submit\">Send</button>\
</form>\
</body></html>",
            title = local("title"),
            field = CSRF_FIELD,
            csrf = local("csrf"),
        )),
        other => Err(format!("unknown view: {other}").into()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
