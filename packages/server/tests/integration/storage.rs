use serde_json::json;

use crate::common::{TestApp, routes};

async fn upload_target(app: &TestApp) -> String {
    let res = app
        .post_with_token(
            routes::UPLOAD_URL,
            &json!({ "fileName": "presets.zip", "fileType": "application/zip" }),
            &app.admin_token("admin_1"),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    res.body["signedUrl"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn put_requires_signed_content_type() {
    let app = TestApp::spawn().await;
    let url = upload_target(&app).await;

    let res = app.put_bytes(&url, "text/html", b"<script>".to_vec()).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.code(), "PERMISSION_DENIED");
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let app = TestApp::spawn().await;
    let url = upload_target(&app).await;

    let (prefix, signature) = url.rsplit_once("signature=").unwrap();
    let flipped = if signature.starts_with('0') { "1" } else { "0" };
    let tampered = format!("{prefix}signature={flipped}{}", &signature[1..]);

    let res = app
        .put_bytes(&tampered, "application/zip", b"data".to_vec())
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn upload_url_cannot_be_used_to_download() {
    let app = TestApp::spawn().await;
    let url = upload_target(&app).await;

    let res = app.get_without_token(&url).await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn upload_url_is_bound_to_its_key() {
    let app = TestApp::spawn().await;
    let url = upload_target(&app).await;

    let other = url.replacen("-presets.zip", "-other.zip", 1);
    let res = app.put_bytes(&other, "application/zip", b"data".to_vec()).await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn unsigned_requests_are_rejected() {
    let app = TestApp::spawn().await;
    app.put_object("products/presets.zip", "application/zip", b"secret")
        .await;

    let res = app
        .get_without_token("/api/v1/storage/products/presets.zip")
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let app = TestApp::spawn_with(|c| c.storage.max_object_size = 16).await;
    let url = upload_target(&app).await;
    let limit = app.config.storage.max_object_size as usize;

    let res = app
        .put_bytes(&url, "application/zip", vec![0u8; limit + 1])
        .await;
    assert_eq!(res.status, 413);
}
