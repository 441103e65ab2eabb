use axum::http::StatusCode;
use coinfolio::api;
use coinfolio::config::Config;
use coinfolio::db::init_db;
use coinfolio::domain::{Decimal, PriceSource};
use coinfolio::providers::{MockProvider, PriceProvider};
use coinfolio::resolver::{PriceResolver, ResolverOptions};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(coinfolio::Repository::new(pool));

    let providers: Vec<Arc<dyn PriceProvider>> = vec![Arc::new(MockProvider::succeeding(
        PriceSource::Primary,
        Decimal::from_i64(100),
    ))];
    let resolver = Arc::new(PriceResolver::new(providers, ResolverOptions::default()));

    let mut env = HashMap::new();
    env.insert("DATABASE_PATH".to_string(), db_path);
    let config = Config::from_env_map(env).unwrap();

    let app = api::create_router(api::AppState::new(repo, resolver, config));
    TestApp {
        app,
        _temp: temp_dir,
    }
}

async fn request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_create_infers_type_from_sign() {
    let test_app = setup_test_app().await;

    let (status, created) = request(
        test_app.app.clone(),
        "POST",
        "/v1/transactions",
        Some(json!({
            "user": "alice",
            "asset": "btc",
            "quantity": -0.5,
            "price": 42000,
            "timeMs": 1_700_000_000_000i64
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["txnType"], "sell");
    assert_eq!(created["asset"], "BTC");
    assert!(created["id"].is_string());
}

#[tokio::test]
async fn test_list_returns_recomputed_transactions() {
    let test_app = setup_test_app().await;

    request(
        test_app.app.clone(),
        "POST",
        "/v1/transactions",
        Some(json!({
            "user": "alice",
            "asset": "BTC",
            "quantity": 1,
            "price": 30000,
            "timeMs": 1000
        })),
    )
    .await;

    let (status, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/transactions?user=alice",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_update_transaction() {
    let test_app = setup_test_app().await;

    let (_, created) = request(
        test_app.app.clone(),
        "POST",
        "/v1/transactions",
        Some(json!({
            "user": "alice",
            "asset": "ETH",
            "quantity": 2,
            "price": 3000,
            "timeMs": 1000
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = request(
        test_app.app.clone(),
        "PUT",
        &format!("/v1/transactions/{}", id),
        Some(json!({"price": 3500})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], json!(3500.0));
    // Fields not in the request keep their values.
    assert_eq!(updated["quantity"], json!(2.0));
}

#[tokio::test]
async fn test_update_unknown_id_is_404() {
    let test_app = setup_test_app().await;
    let (status, _) = request(
        test_app.app.clone(),
        "PUT",
        "/v1/transactions/no-such-id",
        Some(json!({"price": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_ungrouped_transaction() {
    let test_app = setup_test_app().await;

    let (_, created) = request(
        test_app.app.clone(),
        "POST",
        "/v1/transactions",
        Some(json!({
            "user": "alice",
            "asset": "ETH",
            "quantity": 2,
            "price": 3000,
            "timeMs": 1000
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = request(
        test_app.app.clone(),
        "DELETE",
        &format!("/v1/transactions/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = request(
        test_app.app.clone(),
        "GET",
        "/v1/transactions?user=alice",
        None,
    )
    .await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_delete_grouped_transaction_rejected_until_unlinked() {
    let test_app = setup_test_app().await;

    let (_, out) = request(
        test_app.app.clone(),
        "POST",
        "/v1/transactions",
        Some(json!({
            "user": "alice", "asset": "BTC", "quantity": -1,
            "price": 40000, "timeMs": 1000
        })),
    )
    .await;
    let (_, incoming) = request(
        test_app.app.clone(),
        "POST",
        "/v1/transactions",
        Some(json!({
            "user": "alice", "asset": "ETH", "quantity": 20,
            "price": 2100, "timeMs": 2000
        })),
    )
    .await;
    let out_id = out["id"].as_str().unwrap();
    let in_id = incoming["id"].as_str().unwrap();

    let (status, _) = request(
        test_app.app.clone(),
        "POST",
        "/v1/groups",
        Some(json!({
            "user": "alice",
            "description": "BTC into ETH",
            "members": [
                {"transactionId": out_id, "role": "out"},
                {"transactionId": in_id, "role": "in"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Grouped: delete must be rejected.
    let (status, body) = request(
        test_app.app.clone(),
        "DELETE",
        &format!("/v1/transactions/{}", out_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("unlink"));

    // Unlink clears the group and reclassifies by sign.
    let (status, unlinked) = request(
        test_app.app.clone(),
        "POST",
        &format!("/v1/transactions/{}/unlink", out_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unlinked["txnType"], "sell");
    assert!(unlinked["restructureGroup"].is_null());

    // Now deletable.
    let (status, _) = request(
        test_app.app.clone(),
        "DELETE",
        &format!("/v1/transactions/{}", out_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_csv_import() {
    let test_app = setup_test_app().await;

    let csv = "asset,quantity,price,time_ms,type\n\
               BTC,1,30000,1000,\n\
               ETH,-2,3000,2000,sell\n\
               SOL,10,150,3000,exclude\n";

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/transactions/import?user=alice")
        .header("content-type", "text/csv")
        .body(axum::body::Body::from(csv))
        .unwrap();
    let resp = test_app.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["imported"], json!(3));

    let (_, listed) = request(
        test_app.app.clone(),
        "GET",
        "/v1/transactions?user=alice",
        None,
    )
    .await;
    let transactions = listed["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0]["txnType"], "buy");
    assert_eq!(transactions[2]["txnType"], "exclude");
}

#[tokio::test]
async fn test_csv_import_rejects_malformed_row_atomically() {
    let test_app = setup_test_app().await;

    let csv = "asset,quantity,price,time_ms,type\n\
               BTC,1,30000,1000,\n\
               ETH,not-a-number,3000,2000,\n";

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/transactions/import?user=alice")
        .header("content-type", "text/csv")
        .body(axum::body::Body::from(csv))
        .unwrap();
    let resp = test_app.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (_, listed) = request(
        test_app.app.clone(),
        "GET",
        "/v1/transactions?user=alice",
        None,
    )
    .await;
    assert_eq!(listed["transactions"].as_array().unwrap().len(), 0);
}
