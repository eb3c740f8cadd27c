use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, PaginatorTrait, Set};
use serde_json::json;
use uuid::Uuid;

use storefront_server::entity::{download_verification, order, product};
use storefront_server::fulfillment::{DownloadGrants, Resolution};

use crate::common::{TestApp, checkout_event, routes};

const ARCHIVE: &[u8] = b"PK\x03\x04 not really a zip";

async fn order_model(app: &TestApp, order_id: Uuid) -> order::Model {
    order::Entity::find_by_id(order_id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("order should exist")
}

/// A product with a stored file and a paid order for `user_id`.
async fn purchased(app: &TestApp, user_id: &str) -> (i32, Uuid) {
    let product_id = app
        .create_product("Preset Pack", 1999, "products/presets.zip")
        .await;
    app.put_object("products/presets.zip", "application/zip", ARCHIVE)
        .await;
    let order_id = app
        .create_order(user_id, product_id, &format!("pi_{user_id}"), 1999)
        .await;
    (product_id, order_id)
}

mod request {
    use super::*;

    #[tokio::test]
    async fn owner_is_redirected_to_resolver() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;

        let res = app
            .post_with_token(
                &routes::order_download(&order_id.to_string()),
                &json!({}),
                &app.token("alice"),
            )
            .await;
        assert_eq!(res.status, 303);
        assert!(res.location().starts_with("/api/v1/download/"));

        let count = download_verification::Entity::find()
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn each_request_issues_a_new_verification() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let token = app.token("alice");

        let first = app.issue_verification(order_id, &token).await;
        let second = app.issue_verification(order_id, &token).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn other_users_order_looks_missing() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;

        let res = app
            .post_with_token(
                &routes::order_download(&order_id.to_string()),
                &json!({}),
                &app.token("mallory"),
            )
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
        assert_eq!(res.body["message"], "Order not found or access denied");

        let count = download_verification::Entity::find()
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn unknown_and_malformed_order_ids_are_not_found() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        let unknown = app
            .post_with_token(
                &routes::order_download(&Uuid::new_v4().to_string()),
                &json!({}),
                &token,
            )
            .await;
        assert_eq!(unknown.status, 404);

        let malformed = app
            .post_with_token(&routes::order_download("not-a-uuid"), &json!({}), &token)
            .await;
        assert_eq!(malformed.status, 404);
        assert_eq!(malformed.body["message"], unknown.body["message"]);
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;

        let res = app
            .post_without_token(&routes::order_download(&order_id.to_string()), &json!({}))
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_MISSING");

        let res = app
            .post_with_token(
                &routes::order_download(&order_id.to_string()),
                &json!({}),
                "not-a-jwt",
            )
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }
}

mod resolve {
    use super::*;

    #[tokio::test]
    async fn full_flow_delivers_file_with_product_name() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let verification = app.issue_verification(order_id, &app.token("alice")).await;

        let res = app
            .get_without_token(&routes::download_for(verification))
            .await;
        assert_eq!(res.status, 302, "{}", res.text);
        assert_eq!(res.header("cache-control"), Some("no-store"));

        let signed_url = res.location().to_string();
        assert!(signed_url.starts_with(&app.url("/api/v1/storage/products/presets.zip")));

        let file = app
            .client
            .get(&signed_url)
            .send()
            .await
            .expect("Failed to fetch signed URL");
        assert_eq!(file.status(), 200);
        assert_eq!(
            file.headers()
                .get("content-disposition")
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"Preset Pack.zip\"")
        );
        assert_eq!(file.bytes().await.unwrap().as_ref(), ARCHIVE);
    }

    #[tokio::test]
    async fn link_is_reusable_until_expiry_by_default() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let verification = app.issue_verification(order_id, &app.token("alice")).await;

        for _ in 0..2 {
            let res = app
                .get_without_token(&routes::download_for(verification))
                .await;
            assert_eq!(res.status, 302);
        }
    }

    #[tokio::test]
    async fn unknown_verification_is_invalid() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&routes::download_for(Uuid::new_v4()))
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "INVALID_LINK");
        assert_eq!(res.body["message"], "Invalid link");

        let res = app.get_without_token(&routes::download("garbage")).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "INVALID_LINK");
    }

    #[tokio::test]
    async fn expired_verification_is_gone() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let order = order_model(&app, order_id).await;
        let verification = DownloadGrants::new(&app.db)
            .issue(&order, Duration::hours(1), Utc::now() - Duration::hours(2))
            .await
            .unwrap();

        let res = app
            .get_without_token(&routes::download_for(verification.id))
            .await;
        assert_eq!(res.status, 410);
        assert_eq!(res.code(), "LINK_EXPIRED");
        assert_eq!(res.body["message"], "Link expired");
    }

    #[tokio::test]
    async fn single_use_links_are_consumed() {
        let app = TestApp::spawn_with(|c| c.fulfillment.single_use_links = true).await;
        let (_, order_id) = purchased(&app, "alice").await;
        let verification = app.issue_verification(order_id, &app.token("alice")).await;

        let first = app
            .get_without_token(&routes::download_for(verification))
            .await;
        assert_eq!(first.status, 302);

        let second = app
            .get_without_token(&routes::download_for(verification))
            .await;
        assert_eq!(second.status, 403);
        assert_eq!(second.code(), "INVALID_LINK");
    }

    #[tokio::test]
    async fn archived_product_stays_downloadable() {
        let app = TestApp::spawn().await;
        let (product_id, order_id) = purchased(&app, "alice").await;

        let res = app
            .delete_with_token(&routes::product(product_id), &app.admin_token("admin"))
            .await;
        assert_eq!(res.status, 204);

        let verification = app.issue_verification(order_id, &app.token("alice")).await;
        let res = app
            .get_without_token(&routes::download_for(verification))
            .await;
        assert_eq!(res.status, 302);
    }

    #[tokio::test]
    async fn resolves_current_file_of_product() {
        let app = TestApp::spawn().await;
        let (product_id, order_id) = purchased(&app, "alice").await;
        let verification = app.issue_verification(order_id, &app.token("alice")).await;

        let mut active = product::Entity::find_by_id(product_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        active.file_key = Set("products/presets-v2.zip".to_string());
        active.update(&app.db).await.unwrap();

        let res = app
            .get_without_token(&routes::download_for(verification))
            .await;
        assert_eq!(res.status, 302);
        assert!(res.location().contains("/products/presets-v2.zip?"));
    }
}

mod sweep {
    use super::*;

    #[tokio::test]
    async fn keeps_recently_expired_verifications() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let order = order_model(&app, order_id).await;

        let grants = DownloadGrants::new(&app.db);
        let now = Utc::now();
        let ancient = grants
            .issue(&order, Duration::hours(1), now - Duration::days(10))
            .await
            .unwrap();
        let recent = grants
            .issue(&order, Duration::hours(1), now - Duration::hours(2))
            .await
            .unwrap();
        let fresh = grants.issue(&order, Duration::hours(1), now).await.unwrap();

        assert_eq!(grants.sweep_expired(now, Duration::days(7)).await.unwrap(), 1);

        let mut remaining: Vec<Uuid> = download_verification::Entity::find()
            .all(&app.db)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        remaining.sort();
        let mut expected = vec![recent.id, fresh.id];
        expected.sort();
        assert_eq!(remaining, expected);

        assert_eq!(
            grants.resolve(ancient.id, now, false).await.unwrap(),
            Resolution::Invalid
        );
        assert_eq!(
            grants.resolve(recent.id, now, false).await.unwrap(),
            Resolution::Expired
        );
        let res = app
            .get_without_token(&routes::download_for(recent.id))
            .await;
        assert_eq!(res.status, 410);
    }

    #[tokio::test]
    async fn zero_retention_removes_every_expired_verification() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let order = order_model(&app, order_id).await;

        let grants = DownloadGrants::new(&app.db);
        let now = Utc::now();
        grants
            .issue(&order, Duration::hours(1), now - Duration::hours(2))
            .await
            .unwrap();
        let fresh = grants.issue(&order, Duration::hours(1), now).await.unwrap();

        assert_eq!(grants.sweep_expired(now, Duration::zero()).await.unwrap(), 1);
        assert_eq!(
            download_verification::Entity::find()
                .count(&app.db)
                .await
                .unwrap(),
            1
        );
        assert!(matches!(
            grants.resolve(fresh.id, now, false).await.unwrap(),
            Resolution::Granted { .. }
        ));
    }
}

mod ttl {
    use super::*;

    #[tokio::test]
    async fn issued_verification_expires_in_the_future() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let before = Utc::now();
        let id = app.issue_verification(order_id, &app.token("alice")).await;

        let verification = download_verification::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(verification.expires_at > before);
        assert!(verification.expires_at <= Utc::now() + Duration::hours(24));
    }

    #[tokio::test]
    async fn out_of_range_ttl_fails_without_issuing() {
        for ttl_secs in [0, 10_000_000_000_000_000] {
            let app =
                TestApp::spawn_with(|c| c.fulfillment.verification_ttl_secs = ttl_secs).await;
            let (_, order_id) = purchased(&app, "alice").await;

            let res = app
                .post_with_token(
                    &routes::order_download(&order_id.to_string()),
                    &json!({}),
                    &app.token("alice"),
                )
                .await;
            assert_eq!(res.status, 500, "ttl {ttl_secs}: {}", res.text);
            assert_eq!(res.code(), "INTERNAL_ERROR");

            let count = download_verification::Entity::find()
                .count(&app.db)
                .await
                .unwrap();
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn non_positive_ttl_is_refused_by_issue() {
        let app = TestApp::spawn().await;
        let (_, order_id) = purchased(&app, "alice").await;
        let order = order_model(&app, order_id).await;

        let grants = DownloadGrants::new(&app.db);
        assert!(grants.issue(&order, Duration::zero(), Utc::now()).await.is_err());
        assert!(grants.issue(&order, Duration::seconds(-5), Utc::now()).await.is_err());
    }
}

mod round_trip {
    use super::*;

    #[tokio::test]
    async fn uploaded_file_is_delivered_to_buyer() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token("admin_1");
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let grant = app
            .post_with_token(
                routes::UPLOAD_URL,
                &json!({ "fileName": "course.zip", "fileType": "application/zip" }),
                &admin,
            )
            .await;
        assert_eq!(grant.status, 200, "{}", grant.text);
        let file_key = grant.body["fileKey"].as_str().unwrap().to_string();
        let put = app
            .put_bytes(
                grant.body["signedUrl"].as_str().unwrap(),
                "application/zip",
                payload.clone(),
            )
            .await;
        assert_eq!(put.status, 200, "{}", put.text);

        let created = app
            .post_with_token(
                routes::PRODUCTS,
                &json!({
                    "name": "Video Course",
                    "price_in_cents": 4900,
                    "file_key": file_key,
                    "image_key": "products/cover.png",
                }),
                &admin,
            )
            .await;
        assert_eq!(created.status, 201, "{}", created.text);
        let product_id = created.body["id"].as_i64().unwrap() as i32;

        let ack = app
            .send_webhook(&checkout_event("buyer", product_id, 4900, "pi_round_trip"))
            .await;
        assert_eq!(ack.status, 200, "{}", ack.text);
        assert_eq!(ack.body["outcome"], "fulfilled");
        let order_id = ack.body["order_id"].as_str().unwrap().to_string();

        let issued = app
            .post_with_token(&routes::order_download(&order_id), &json!({}), &app.token("buyer"))
            .await;
        assert_eq!(issued.status, 303, "{}", issued.text);

        let resolved = app.get_without_token(issued.location()).await;
        assert_eq!(resolved.status, 302, "{}", resolved.text);

        let file = app
            .client
            .get(resolved.location())
            .send()
            .await
            .expect("Failed to fetch signed URL");
        assert_eq!(file.status(), 200);
        assert_eq!(
            file.headers()
                .get("content-disposition")
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"Video Course.zip\"")
        );
        assert_eq!(file.bytes().await.unwrap().as_ref(), payload.as_slice());
    }
}
