use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use common::storage::filesystem::FilesystemObjectStore;
use common::storage::{ObjectKey, ObjectStore, UrlSigner};
use common::{FilesystemStoreConfig, StorageBackend, StorageConfig};
use storefront_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, FulfillmentConfig, ServerConfig,
    StripeConfig,
};
use storefront_server::entity::{order, product};
use storefront_server::payments::stripe::signature_header;
use storefront_server::state::AppState;
use storefront_server::utils::jwt;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const SIGNING_SECRET: &str = "local-storage-signing-secret";

pub mod routes {
    use uuid::Uuid;

    pub const WEBHOOK: &str = "/api/v1/webhooks/stripe";
    pub const ORDERS: &str = "/api/v1/orders";
    pub const PRODUCTS: &str = "/api/v1/products";
    pub const UPLOAD_URL: &str = "/api/v1/products/upload-url";
    pub const ADMIN_ORDERS: &str = "/api/v1/admin/orders";
    pub const ADMIN_SALES: &str = "/api/v1/admin/sales";
    pub const HEALTH: &str = "/api/health";

    pub fn order_download(order_id: &str) -> String {
        format!("/api/v1/orders/{order_id}/download")
    }

    pub fn download(verification_id: &str) -> String {
        format!("/api/v1/download/{verification_id}")
    }

    pub fn download_for(verification_id: Uuid) -> String {
        download(&verification_id.to_string())
    }

    pub fn product(id: i32) -> String {
        format!("/api/v1/products/{id}")
    }

    pub fn image(key: &str) -> String {
        format!("/api/images/{key}")
    }
}

/// A running test server backed by a temporary SQLite database and a
/// temporary filesystem object store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub store: Arc<FilesystemObjectStore>,
    pub config: Arc<AppConfig>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> &str {
        self.header("location")
            .unwrap_or_else(|| panic!("expected a Location header, got {}: {}", self.status, self.text))
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with configuration tweaks applied before the server starts.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let public_base_url = format!("http://{addr}/api/v1/storage");

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url.clone(),
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
                admin_role: "admin".to_string(),
            },
            stripe: StripeConfig {
                webhook_secret: WEBHOOK_SECRET.to_string(),
                signature_tolerance_secs: 300,
            },
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                max_object_size: 1024 * 1024,
                filesystem: Some(FilesystemStoreConfig {
                    root: dir.path().join("objects"),
                    public_base_url: public_base_url.clone(),
                    signing_secret: SIGNING_SECRET.to_string(),
                }),
                ..StorageConfig::default()
            },
            fulfillment: FulfillmentConfig::default(),
        };
        configure(&mut app_config);

        let db = storefront_server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");
        storefront_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let signer = UrlSigner::new(SIGNING_SECRET, &public_base_url).unwrap();
        let store = Arc::new(
            FilesystemObjectStore::new(
                dir.path().join("objects"),
                app_config.storage.max_object_size,
                signer,
            )
            .await
            .expect("Failed to create object store"),
        );

        let config = Arc::new(app_config);
        let state = AppState {
            db: db.clone(),
            store: store.clone(),
            local_store: Some(store.clone()),
            config: config.clone(),
        };

        let app = storefront_server::build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            client,
            db,
            store,
            config,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") {
            path.to_string()
        } else {
            format!("http://{}{}", self.addr, path)
        }
    }

    /// Bearer token for a regular customer.
    pub fn token(&self, user_id: &str) -> String {
        jwt::sign(JWT_SECRET, user_id, None, chrono::Duration::hours(1)).unwrap()
    }

    /// Bearer token carrying the admin role.
    pub fn admin_token(&self, user_id: &str) -> String {
        jwt::sign(JWT_SECRET, user_id, Some("admin"), chrono::Duration::hours(1)).unwrap()
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// PUT raw bytes to an absolute or relative URL.
    pub async fn put_bytes(&self, url: &str, content_type: &str, bytes: Vec<u8>) -> TestResponse {
        let res = self
            .client
            .put(self.url(url))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    /// Deliver a raw webhook body with an explicit `Stripe-Signature` header.
    pub async fn send_webhook_raw(&self, body: Vec<u8>, signature: Option<&str>) -> TestResponse {
        let mut req = self
            .client
            .post(self.url(routes::WEBHOOK))
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(signature) = signature {
            req = req.header("Stripe-Signature", signature);
        }
        let res = req.send().await.expect("Failed to send webhook");

        TestResponse::from_response(res).await
    }

    /// Deliver a correctly signed webhook event.
    pub async fn send_webhook(&self, event: &Value) -> TestResponse {
        let body = serde_json::to_vec(event).unwrap();
        let header = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), &body);
        self.send_webhook_raw(body, Some(&header)).await
    }

    /// Insert a product directly and return its `id`.
    pub async fn create_product(&self, name: &str, price_in_cents: i64, file_key: &str) -> i32 {
        product::ActiveModel {
            name: Set(name.to_string()),
            description: Set(format!("{name} description")),
            price_in_cents: Set(price_in_cents),
            file_key: Set(file_key.to_string()),
            image_key: Set(format!("images/{name}.png")),
            is_available: Set(true),
            created_at: Set(Utc::now()),
            archived_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to create product")
        .id
    }

    /// Write an object straight into the backing store.
    pub async fn put_object(&self, key: &str, content_type: &str, data: &[u8]) {
        let key = ObjectKey::parse(key).unwrap();
        self.store
            .put(&key, content_type, data)
            .await
            .expect("Failed to store object");
    }

    /// Record a paid order through the webhook and return its id.
    pub async fn create_order(
        &self,
        user_id: &str,
        product_id: i32,
        payment_intent_id: &str,
        amount_total: i64,
    ) -> Uuid {
        let res = self
            .send_webhook(&checkout_event(
                user_id,
                product_id,
                amount_total,
                payment_intent_id,
            ))
            .await;
        assert_eq!(res.status, 200, "webhook failed: {}", res.text);
        assert_eq!(res.body["outcome"], "fulfilled");
        Uuid::parse_str(res.body["order_id"].as_str().unwrap()).unwrap()
    }

    /// Ask for a download of `order_id` and return the verification id.
    pub async fn issue_verification(&self, order_id: Uuid, token: &str) -> Uuid {
        let res = self
            .post_with_token(&routes::order_download(&order_id.to_string()), &json!({}), token)
            .await;
        assert_eq!(res.status, 303, "download request failed: {}", res.text);
        let location = res.location();
        let id = location
            .strip_prefix("/api/v1/download/")
            .unwrap_or_else(|| panic!("unexpected Location {location}"));
        Uuid::parse_str(id).unwrap()
    }

    pub async fn order_count(&self) -> u64 {
        order::Entity::find().count(&self.db).await.unwrap()
    }
}

/// A `checkout.session.completed` event for a paid session.
pub fn checkout_event(
    user_id: &str,
    product_id: i32,
    amount_total: i64,
    payment_intent_id: &str,
) -> Value {
    json!({
        "id": format!("evt_{payment_intent_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": format!("cs_{payment_intent_id}"),
                "object": "checkout.session",
                "payment_status": "paid",
                "amount_total": amount_total,
                "currency": "usd",
                "payment_intent": payment_intent_id,
                "metadata": {
                    "userId": user_id,
                    "productId": product_id.to_string(),
                },
            }
        }
    })
}
