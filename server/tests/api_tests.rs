use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use cuimap_server::{build_app, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> axum::Router {
    build_app(AppState::new(4, 1).expect("state"))
}

#[tokio::test]
async fn health_is_ok() {
    let res = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn articles_rejects_malformed_body() {
    let req = Request::post("/annotate/articles")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"articles": "not a list"}"#))
        .unwrap();
    let res = app().oneshot(req).await.unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn articles_rejects_empty_list() {
    let req = Request::post("/annotate/articles")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"articles": []}"#))
        .unwrap();
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["message"].as_str().unwrap().contains("articles"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let res = app()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
