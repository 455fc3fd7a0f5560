//! Integration tests for the catalog HTTP API
//!
//! Each test builds the router over a fresh in-memory database holding the
//! bundled sample catalog and one admin account.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use cinelog_common::auth::hash_password;
use cinelog_common::db::{connect_in_memory, users};
use cinelog_common::reconcile::integrity_violations;
use cinelog_common::seed;
use cinelog_web::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

const USERNAME: &str = "admin";
const PASSWORD: &str = "secret";

/// Test helper: in-memory catalog with the sample data and an admin
async fn setup() -> (Router, SqlitePool) {
    let pool = connect_in_memory().await.unwrap();
    let hash = hash_password(PASSWORD);
    users::insert_user(&pool, Some("Admin"), Some(USERNAME), Some(&hash))
        .await
        .unwrap();
    seed::forge(&pool, &seed::bundled().unwrap()).await.unwrap();

    let app = build_router(AppState::new(pool.clone(), 3600));
    (app, pool)
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

/// Log in and return the `name=value` cookie pair
async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/login",
            None,
            Some(json!({"username": USERNAME, "password": PASSWORD})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a cookie")
        .to_str()
        .unwrap()
        .to_string();
    set_cookie.split(';').next().unwrap().to_string()
}

// =============================================================================
// Public pages
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup().await;
    let (status, body) = call(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cinelog");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_index_lists_catalog() {
    let (app, _) = setup().await;
    let (status, body) = call(&app, request("GET", "/api/index", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "Admin");
    assert_eq!(body["movies"].as_array().unwrap().len(), 18);
    assert_eq!(body["actors"].as_array().unwrap().len(), 41);
}

#[tokio::test]
async fn test_ui_is_served() {
    let (app, _) = setup().await;
    let response = app
        .clone()
        .oneshot(request("GET", "/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("GET", "/static/app.js", None, None))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/javascript"
    );
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _) = setup().await;
    let (status, body) = call(&app, request("GET", "/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_movie_detail_and_missing_movie() {
    let (app, _) = setup().await;

    let (status, body) = call(&app, request("GET", "/api/movies/1001", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movie"]["title"], "战狼2");
    assert_eq!(body["actors"][0]["name"], "吴京");
    assert_eq!(body["directors"][0]["name"], "吴京");

    let (status, _) = call(&app, request("GET", "/api/movies/999999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_movies_and_actors() {
    let (app, _) = setup().await;

    let (status, body) = call(
        &app,
        request("GET", "/api/movies/search?search_query=%E9%80%9F%E5%BA%A6", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // 速度与激情8 and 速度与激情9
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert!(body[0]["actors"].is_array());

    let (_, body) = call(&app, request("GET", "/api/movies/search", None, None)).await;
    assert_eq!(body.as_array().unwrap().len(), 18);

    let (_, body) = call(
        &app,
        request("GET", "/api/movies/search?search_query=%25", None, None),
    )
    .await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = call(
        &app,
        request("GET", "/api/actors/search?search_query=%E5%90%B4%E4%BA%AC", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["actor"]["name"], "吴京");
    let titles: Vec<&str> = body[0]["directed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"战狼2"));
}

#[tokio::test]
async fn test_boxplot_endpoints() {
    let (app, _) = setup().await;

    let (status, body) = call(&app, request("GET", "/api/analytics/boxplot", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let boxes = body.as_array().unwrap();
    assert_eq!(boxes.len(), 6);
    let counted: u64 = boxes
        .iter()
        .map(|b| b["stats"]["count"].as_u64().unwrap())
        .sum();
    assert_eq!(counted, 18);

    let response = app
        .oneshot(request("GET", "/analytics/boxplot.svg", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
}

// =============================================================================
// Login and sessions
// =============================================================================

#[tokio::test]
async fn test_protected_routes_need_login() {
    let (app, _) = setup().await;

    let (status, body) = call(
        &app,
        request("POST", "/api/movies", None, Some(json!({"title": "x", "year": "2020"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, request("DELETE", "/api/movies/1001", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        request(
            "GET",
            "/api/movies/1001/analysis",
            Some("cinelog_session=00000000000000000000000000000000"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures() {
    let (app, _) = setup().await;

    let (status, body) = call(
        &app,
        request("POST", "/api/login", None, Some(json!({"username": "", "password": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid input.");

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({"username": USERNAME, "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid username or password.");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (app, _) = setup().await;

    let (_, body) = call(&app, request("GET", "/api/session", None, None)).await;
    assert_eq!(body["authenticated"], false);

    let cookie = login(&app).await;
    let (_, body) = call(&app, request("GET", "/api/session", Some(&cookie), None)).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], USERNAME);

    let (status, body) = call(&app, request("POST", "/api/logout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Goodbye.");

    let (status, _) = call(&app, request("POST", "/api/logout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settings_change_display_name() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/settings",
            Some(&cookie),
            Some(json!({"name": "x".repeat(21)})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        request("POST", "/api/settings", Some(&cookie), Some(json!({"name": "Buyan"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Settings updated.");

    let (_, body) = call(&app, request("GET", "/api/index", None, None)).await;
    assert_eq!(body["user"], "Buyan");
}

// =============================================================================
// Movie editing and cast reconciliation
// =============================================================================

#[tokio::test]
async fn test_create_movie_with_shared_actor_director() {
    let (app, pool) = setup().await;
    let cookie = login(&app).await;

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/movies",
            Some(&cookie),
            Some(json!({
                "title": "新电影",
                "year": "2022",
                "country": "中国",
                "genre": "剧情",
                "box_office": "",
                "actor": "新导演",
                "director": "新导演",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Item created.");
    assert_eq!(body["movie"]["movie"]["box_office"], Value::Null);
    assert_eq!(body["movie"]["actors"][0]["id"], body["movie"]["directors"][0]["id"]);
    assert_eq!(body["reconcile"]["created"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/movies",
            Some(&cookie),
            Some(json!({"title": "新电影", "year": "2022"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "The movie has already existed!");

    assert_eq!(integrity_violations(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_movie_rejects_invalid_input() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    for payload in [
        json!({"title": "", "year": "2020"}),
        json!({"title": "x", "year": ""}),
        json!({"title": "x", "year": "20201"}),
        json!({"title": "x".repeat(61), "year": "2020"}),
        json!({"title": "x", "year": "2020", "genre": "g".repeat(61)}),
        json!({"title": "x", "year": "inf"}),
        json!({"title": "x", "year": "NaN"}),
        json!({"title": "x", "year": "2020", "actor": "a".repeat(61)}),
        json!({"title": "x", "year": "2020", "director": "d".repeat(500)}),
    ] {
        let (status, body) =
            call(&app, request("POST", "/api/movies", Some(&cookie), Some(payload))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid input.");
    }
}

#[tokio::test]
async fn test_overlong_cast_names_are_rejected() {
    let (app, pool) = setup().await;
    let cookie = login(&app).await;
    let actors_before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actors")
        .fetch_one(&pool)
        .await
        .unwrap();

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/movies",
            Some(&cookie),
            Some(json!({"title": "长名字", "year": "2022", "actor": "x".repeat(500)})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid input.");

    let (status, _) = call(
        &app,
        request(
            "PUT",
            "/api/movies/1009",
            Some(&cookie),
            Some(json!({
                "title": "速度与激情8",
                "year": "2017",
                "cast": {
                    "actors": [{"current_actor_id": null, "name": "y".repeat(61)}],
                    "directors": []
                }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let actors_after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actors")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(actors_after, actors_before);

    let titles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies WHERE title = '长名字'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(titles, 0);
}

#[tokio::test]
async fn test_edit_cast_reuses_existing_actor() {
    let (app, pool) = setup().await;
    let cookie = login(&app).await;

    let (_, before) = call(&app, request("GET", "/api/movies/1009", None, None)).await;
    let lead_id = before["actors"][0]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        request(
            "PUT",
            "/api/movies/1009",
            Some(&cookie),
            Some(json!({
                "title": "速度与激情8",
                "year": "2017",
                "country": "美国",
                "genre": "动作",
                "box_office": 26.7,
                "cast": {
                    "actors": [
                        {"current_actor_id": lead_id, "name": "吴京"},
                        {"current_actor_id": null, "name": ""}
                    ],
                    "directors": []
                }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item updated.");
    assert_eq!(body["notices"][0], "The actor has already existed!");

    let names: Vec<&str> = body["movie"]["actors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"吴京"));
    assert!(!body["movie"]["actors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["id"].as_i64() == Some(lead_id)));

    assert_eq!(integrity_violations(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_unknown_movie_is_404() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    let (status, _) = call(
        &app,
        request(
            "PUT",
            "/api/movies/424242",
            Some(&cookie),
            Some(json!({"title": "x", "year": "2020"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_movie_removes_relations() {
    let (app, pool) = setup().await;
    let cookie = login(&app).await;

    let (status, body) = call(&app, request("DELETE", "/api/movies/1001", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item deleted.");

    let (status, _) = call(&app, request("GET", "/api/movies/1001", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM relations WHERE movie_id = 1001")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let (status, _) = call(&app, request("DELETE", "/api/movies/1001", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Actors
// =============================================================================

#[tokio::test]
async fn test_actor_create_edit_delete() {
    let (app, pool) = setup().await;
    let cookie = login(&app).await;

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/actors",
            Some(&cookie),
            Some(json!({"name": "张译", "gender": "男", "country": "中国"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["actor"]["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/actors",
            Some(&cookie),
            Some(json!({"name": "张译", "gender": "", "country": "中国"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        request(
            "PUT",
            &format!("/api/actors/{}", id),
            Some(&cookie),
            Some(json!({"name": "张译", "gender": "男", "country": "中国香港"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actor"]["country"], "中国香港");

    let (status, body) = call(&app, request("GET", &format!("/api/actors/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["acted"].as_array().unwrap().is_empty());

    let (status, _) = call(
        &app,
        request("DELETE", &format!("/api/actors/{}", id), Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, request("GET", &format!("/api/actors/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(integrity_violations(&pool).await.unwrap(), 0);
}

// =============================================================================
// Per-movie analytics
// =============================================================================

#[tokio::test]
async fn test_genre_rank() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    // War movies: 30.10, 36.50, 53.48, 56.84
    let (status, body) = call(
        &app,
        request("GET", "/api/movies/1001/analysis", Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rank"], 100.0);

    let (_, body) = call(
        &app,
        request("GET", "/api/movies/1005/analysis", Some(&cookie), None),
    )
    .await;
    assert_eq!(body["rank"], 50.0);
}

#[tokio::test]
async fn test_prediction() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    let (status, body) = call(
        &app,
        request("GET", "/api/movies/1018/prediction", Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted"].as_f64().unwrap().is_finite());
    assert_eq!(body["recorded"], 13.92);
    assert_eq!(body["training_rows"], 18);
    assert_eq!(body["notice"], "This movie already has a box office record");

    let (status, _) = call(
        &app,
        request("GET", "/api/movies/999999/prediction", Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_backed_catalog_survives_new_router() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cinelog.db");

    let pool = cinelog_common::db::init_database(&db_path).await.unwrap();
    seed::forge(&pool, &seed::bundled().unwrap()).await.unwrap();
    pool.close().await;

    let pool = cinelog_common::db::init_database(&db_path).await.unwrap();
    let app = build_router(AppState::new(pool, 60));
    let (status, body) = call(&app, request("GET", "/api/index", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "Buyan Sun");
    assert_eq!(body["movies"].as_array().unwrap().len(), 18);
}
