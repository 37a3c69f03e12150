//! Router tests against a live authority loop

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use warzone::app::{AppState, Authority, StatusBoard};
use warzone::config::Config;
use warzone::geom::{Cuboid, Location};
use warzone::host::memory::MemoryWorld;
use warzone::http::build_router;
use warzone::util::time::SystemClock;
use warzone::War;

fn config(data_dir: PathBuf, console_rate_limit: u32) -> Config {
    Config {
        server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        log_level: "info".into(),
        data_dir,
        tick_rate: 100,
        console_rate_limit,
    }
}

/// Router over a war holding one zone named `arena`
async fn app(dir: &tempfile::TempDir, console_rate_limit: u32) -> Router {
    let mut war = War::open(dir.path(), Box::new(MemoryWorld::new()), Box::new(SystemClock)).unwrap();
    war.create_zone(
        "arena",
        &Cuboid::new(
            &Location::new(0.0, 0.0, 0.0, "world"),
            &Location::new(9.0, 9.0, 9.0, "world"),
        ),
    )
    .unwrap();

    let status = Arc::new(StatusBoard::new());
    let (authority, console) = Authority::new(war, 100, status.clone());
    tokio::spawn(authority.run());
    // first publish happens before the first tick
    while status.ticks() == 0 {
        tokio::task::yield_now().await;
    }

    build_router(AppState::new(
        config(dir.path().to_path_buf(), console_rate_limit),
        console,
        status,
    ))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn console(command: &str) -> Request<Body> {
    Request::post("/console")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "command": command }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_zone_count() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(&dir, 5).await;

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["zones"], 1);
    assert_eq!(body["active_matches"], 0);
}

#[tokio::test]
async fn zone_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(&dir, 5).await;

    let response = router
        .clone()
        .oneshot(Request::get("/zones/Arena").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "arena");
    assert_eq!(body["size"], "10x10x10");
    assert!(body["round"].is_null());

    let missing = router
        .oneshot(Request::get("/zones/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn console_runs_commands() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(&dir, 5).await;

    let response = router.oneshot(console("zonecfg arena maxrounds 3")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["output"][0], "Warzone arena: maxrounds set to 3.");
}

#[tokio::test]
async fn console_is_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(&dir, 1).await;

    let first = tokio_test::assert_ok!(router.clone().oneshot(console("warzone")).await);
    assert_eq!(first.status(), StatusCode::OK);

    let second = router.oneshot(console("warzone")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn empty_console_command_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(&dir, 5).await;

    let response = router.oneshot(console("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
