use sea_orm::EntityTrait;
use serde_json::json;

use storefront_server::entity::product;

use crate::common::{TestApp, routes};

fn product_body() -> serde_json::Value {
    json!({
        "name": "Preset Pack",
        "description": "Twelve presets",
        "price_in_cents": 1999,
        "file_key": "products/1111-presets.zip",
        "image_key": "products/2222-cover.png",
    })
}

#[tokio::test]
async fn admin_creates_product() {
    let app = TestApp::spawn().await;

    let res = app
        .post_with_token(routes::PRODUCTS, &product_body(), &app.admin_token("admin_1"))
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["name"], "Preset Pack");
    assert_eq!(res.body["is_available"], true);
    assert!(res.body["archived_at"].is_null());

    let id = res.body["id"].as_i64().unwrap() as i32;
    let stored = product::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.file_key, "products/1111-presets.zip");
    assert_eq!(stored.price_in_cents, 1999);
}

#[tokio::test]
async fn rejects_invalid_products() {
    let app = TestApp::spawn().await;
    let token = app.admin_token("admin_1");

    let mut negative = product_body();
    negative["price_in_cents"] = json!(-1);
    let mut blank = product_body();
    blank["name"] = json!("  ");
    let mut traversal = product_body();
    traversal["file_key"] = json!("../secrets.zip");

    for body in [negative, blank, traversal] {
        let res = app.post_with_token(routes::PRODUCTS, &body, &token).await;
        assert_eq!(res.status, 400, "body {body} gave {}", res.text);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn customers_cannot_manage_products() {
    let app = TestApp::spawn().await;
    let id = app.create_product("Pack", 1000, "products/pack.zip").await;
    let token = app.token("alice");

    let res = app.post_with_token(routes::PRODUCTS, &product_body(), &token).await;
    assert_eq!(res.status, 403);

    let res = app.delete_with_token(&routes::product(id), &token).await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn archive_keeps_row_and_orders() {
    let app = TestApp::spawn().await;
    let id = app.create_product("Pack", 1000, "products/pack.zip").await;
    app.create_order("alice", id, "pi_1", 1000).await;
    let token = app.admin_token("admin_1");

    let res = app.delete_with_token(&routes::product(id), &token).await;
    assert_eq!(res.status, 204);

    let stored = product::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_available);
    assert!(stored.archived_at.is_some());
    assert_eq!(app.order_count().await, 1);

    // Archiving twice is a no-op.
    let res = app.delete_with_token(&routes::product(id), &token).await;
    assert_eq!(res.status, 204);

    let res = app.delete_with_token(&routes::product(9999), &token).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::HEALTH).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "ok");
}
