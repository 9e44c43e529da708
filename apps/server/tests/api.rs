//! Black-box tests of the JSON API over an in-memory database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use comptoir_core::parcel::{ParcelStatus, TrackingEvent};
use comptoir_core::Role;
use comptoir_db::{Database, DbConfig, UserRecord};
use comptoir_parcel::{ColissimoAccount, ParcelError, ParcelResult, TrackingClient};
use comptoir_server::config::ServerConfig;
use comptoir_server::password::hash_password;
use comptoir_server::state::AppState;
use comptoir_server::{bootstrap_admin, build_app};
use serde_json::{json, Value};
use tower::ServiceExt;

const KNOWN_PARCEL: &str = "6A12345678901";
const PASSWORD: &str = "motdepasse1";

/// Knows a single parcel; everything else is unknown to the carrier.
#[derive(Default)]
struct FakeTracker {
    calls: AtomicUsize,
}

#[async_trait]
impl TrackingClient for FakeTracker {
    async fn track(
        &self,
        account: &ColissimoAccount,
        tracking_number: &str,
    ) -> ParcelResult<ParcelStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if account.password != "colis-secret" {
            return Err(ParcelError::AuthFailed);
        }
        if tracking_number != KNOWN_PARCEL {
            return Err(ParcelError::NotFound(tracking_number.to_string()));
        }
        Ok(ParcelStatus {
            tracking_number: KNOWN_PARCEL.to_string(),
            event: Some(TrackingEvent {
                code: "LIVCFM".to_string(),
                date: Some("2026-03-02T10:15:00".to_string()),
                label: "Votre colis est livré".to_string(),
                site: Some("Lyon".to_string()),
            }),
            recipient_city: Some("Lyon".to_string()),
            recipient_zip_code: Some("69001".to_string()),
            recipient_country_code: Some("FR".to_string()),
        })
    }
}

struct TestApp {
    app: Router,
    db: Database,
    tracker: Arc<FakeTracker>,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        let tracker = Arc::new(FakeTracker::default());

        for (name, email, role) in [
            ("Alice Admin", "admin@comptoir.test", Role::Admin),
            ("Marc Manager", "manager@comptoir.test", Role::Manager),
            ("Chloé Caisse", "caisse@comptoir.test", Role::Cashier),
        ] {
            db.users()
                .create(&UserRecord {
                    name: name.to_string(),
                    email: email.to_string(),
                    role,
                    is_active: true,
                    password_hash: Some(hash_password(PASSWORD).unwrap()),
                })
                .await
                .unwrap();
        }

        let state = AppState::new(db.clone(), config, tracker.clone());
        TestApp {
            app: build_app(state),
            db,
            tracker,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the `Cookie` header value.
    async fn login(&self, email: &str) -> String {
        let response = self
            .send(json_request("POST", "/api/auth/login", None, json!({
                "email": email,
                "password": PASSWORD,
            })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn get(&self, uri: &str, cookie: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        read(self.send(request).await).await
    }

    async fn post(&self, uri: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        read(self.send(json_request("POST", uri, Some(cookie), body)).await).await
    }

    async fn create_product(&self, cookie: &str, reference: &str, stock: i64) -> String {
        let (status, body) = self
            .post("/api/products", cookie, json!({
                "reference": reference,
                "name": format!("Article {reference}"),
                "purchase_price_cents": 500,
                "sale_price_cents": 1200,
                "stock": stock,
                "min_stock": 1,
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = read(app.send(request).await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn requests_without_session_are_rejected() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/products")
        .body(Body::empty())
        .unwrap();
    let (status, body) = read(app.send(request).await).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
    assert!(body["message"].is_string());

    let (status, _) = app.get("/api/products", "comptoir_session=forged.token.value").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request("POST", "/api/auth/login", None, json!({
            "email": "admin@comptoir.test",
            "password": PASSWORD,
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("comptoir_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=28800"));

    let (_, body) = read(response).await;
    assert_eq!(body["role"], "admin");
    assert!(body.get("password_hash").is_none());

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let (status, me) = app.get("/api/auth/me", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "admin@comptoir.test");

    let (status, history) = app.get("/api/audit?entity_type=user", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["action"], "login");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = read(
        app.send(json_request("POST", "/api/auth/login", None, json!({
            "email": "admin@comptoir.test",
            "password": "pas-le-bon",
        })))
        .await,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Email ou mot de passe incorrect");
}

#[tokio::test]
async fn deactivated_user_loses_session() {
    let app = TestApp::new().await;
    let cookie = app.login("caisse@comptoir.test").await;

    let cashier = app
        .db
        .users()
        .find_by_email("caisse@comptoir.test")
        .await
        .unwrap()
        .unwrap();
    app.db
        .users()
        .update(&cashier.id, &UserRecord {
            name: cashier.name.clone(),
            email: cashier.email.clone(),
            role: Role::Cashier,
            is_active: false,
            password_hash: None,
        })
        .await
        .unwrap();

    let (status, _) = app.get("/api/auth/me", &cookie).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cashier_is_limited_to_the_counter() {
    let app = TestApp::new().await;
    let cookie = app.login("caisse@comptoir.test").await;

    let (status, body) = app.get("/api/supplies", &cookie).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app.get("/api/reports/dashboard", &cookie).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/products", &cookie, json!({
            "reference": "REF-1",
            "name": "Article",
            "purchase_price_cents": 100,
            "sale_price_cents": 200,
        }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/products", &cookie).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn manager_cannot_manage_users() {
    let app = TestApp::new().await;
    let cookie = app.login("manager@comptoir.test").await;

    let (status, _) = app.get("/api/users", &cookie).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/supplies", &cookie).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sale_cannot_exceed_stock() {
    let app = TestApp::new().await;
    let admin = app.login("admin@comptoir.test").await;
    let product = app.create_product(&admin, "REF-SALE", 2).await;

    let cashier = app.login("caisse@comptoir.test").await;
    let (status, body) = app
        .post("/api/sales", &cashier, json!({
            "lines": [{ "product_id": product, "quantity": 3 }],
            "payment_method": "card",
        }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "business_rule");

    let (status, sale) = app
        .post("/api/sales", &cashier, json!({
            "lines": [{ "product_id": product, "quantity": 2 }],
            "payment_method": "cash",
            "tendered_cents": 3000,
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["total_cents"], 2400);
    assert_eq!(sale["change_cents"], 600);

    let (_, stored) = app.get(&format!("/api/products/{product}"), &admin).await;
    assert_eq!(stored["stock"], 0);

    let sale_id = sale["id"].as_str().unwrap();
    let (status, invoice) = app.get(&format!("/api/sales/{sale_id}/invoice"), &cashier).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["total_ttc_cents"], 2400);
    assert_eq!(invoice["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn return_cannot_exceed_its_sale() {
    let app = TestApp::new().await;
    let admin = app.login("admin@comptoir.test").await;
    let product = app.create_product(&admin, "REF-RET", 5).await;

    let (status, sale) = app
        .post("/api/sales", &admin, json!({
            "lines": [{ "product_id": product, "quantity": 1 }],
            "payment_method": "card",
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");

    let (status, body) = app
        .post("/api/returns", &admin, json!({
            "tracking_number": KNOWN_PARCEL,
            "product_id": product,
            "sale_id": sale["id"],
            "quantity": 50,
        }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "business_rule");

    let (_, stored) = app.get(&format!("/api/products/{product}"), &admin).await;
    assert_eq!(stored["stock"], 4);
}

#[tokio::test]
async fn history_failure_does_not_undo_the_action() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;

    sqlx::query("DROP TABLE historique_actions")
        .execute(app.db.pool())
        .await
        .unwrap();

    let product = app.create_product(&cookie, "REF-HIST", 3).await;
    let (status, stored) = app.get(&format!("/api/products/{product}"), &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["stock"], 3);
}

#[tokio::test]
async fn unknown_entity_is_not_found() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;

    let (status, body) = app.get("/api/clients/does-not-exist", &cookie).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn credential_password_is_never_returned() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;

    let (status, credential) = app
        .post("/api/colissimo/credentials", &cookie, json!({
            "label": "Boutique",
            "contract_number": "123456",
            "password": "colis-secret",
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{credential}");
    assert!(credential.get("password").is_none());
    assert!(credential.get("encrypted_password").is_none());

    let stored = app.db.credentials().get_active().await.unwrap().unwrap();
    assert_ne!(stored.encrypted_password, "colis-secret");

    let (status, _) = app
        .post("/api/colissimo/credentials", &cookie, json!({
            "label": "Sans mot de passe",
            "contract_number": "654321",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tracking_number_search_returns_at_most_one_parcel() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;

    let (status, _) = app
        .get(&format!("/api/colissimo/parcels/search?q={KNOWN_PARCEL}"), &cookie)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post("/api/colissimo/credentials", &cookie, json!({
        "label": "Boutique",
        "contract_number": "123456",
        "password": "colis-secret",
    }))
    .await;

    let (status, found) = app
        .get(&format!("/api/colissimo/parcels/search?q={KNOWN_PARCEL}"), &cookie)
        .await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["recipient_city"], "Lyon");

    let (status, missing) = app
        .get("/api/colissimo/parcels/search?q=8Z99999999999", &cookie)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(missing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn parcel_list_tracks_known_returns() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;
    let product = app.create_product(&cookie, "REF-RET", 0).await;

    for tracking in [KNOWN_PARCEL, "8Z99999999999"] {
        let (status, body) = app
            .post("/api/returns", &cookie, json!({
                "tracking_number": tracking,
                "product_id": product,
                "quantity": 1,
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    // No account yet: listed but untracked, the carrier is not called.
    let (status, parcels) = app.get("/api/colissimo/parcels", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parcels.as_array().unwrap().len(), 2);
    assert_eq!(app.tracker.calls.load(Ordering::SeqCst), 0);

    app.post("/api/colissimo/credentials", &cookie, json!({
        "label": "Boutique",
        "contract_number": "123456",
        "password": "colis-secret",
    }))
    .await;

    let (status, parcels) = app.get("/api/colissimo/parcels", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    let parcels = parcels.as_array().unwrap();
    assert_eq!(parcels.len(), 2);
    let tracked = parcels
        .iter()
        .find(|p| p["tracking_number"] == KNOWN_PARCEL)
        .unwrap();
    assert_eq!(tracked["event"]["code"], "LIVCFM");
    let untracked = parcels
        .iter()
        .find(|p| p["tracking_number"] == "8Z99999999999")
        .unwrap();
    assert!(untracked["event"].is_null());

    let (status, filtered) = app.get("/api/colissimo/parcels/search?q=lyon", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_colissimo_account_fails_the_listing() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;
    let product = app.create_product(&cookie, "REF-AUTH", 0).await;

    app.post("/api/returns", &cookie, json!({
        "tracking_number": KNOWN_PARCEL,
        "product_id": product,
        "quantity": 1,
        "restock": false,
    }))
    .await;
    app.post("/api/colissimo/credentials", &cookie, json!({
        "label": "Boutique",
        "contract_number": "123456",
        "password": "mauvais",
    }))
    .await;

    let (status, body) = app.get("/api/colissimo/parcels", &cookie).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "colissimo_auth_failed");
}

#[tokio::test]
async fn last_administrator_cannot_be_deleted() {
    let app = TestApp::new().await;
    let cookie = app.login("admin@comptoir.test").await;
    let (_, me) = app.get("/api/auth/me", &cookie).await;
    let id = me["id"].as_str().unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/users/{id}"))
        .header(COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, body) = read(app.send(request).await).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn monthly_revenue_lists_twelve_months() {
    let app = TestApp::new().await;
    let cookie = app.login("manager@comptoir.test").await;

    let (status, body) = app.get("/api/reports/monthly-revenue?year=2026", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    let months = body.as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[0]["month"], 1);
}

#[tokio::test]
async fn bootstrap_creates_admin_only_once() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = ServerConfig::from_lookup(|key| match key {
        "COMPTOIR_ADMIN_EMAIL" => Some("patron@comptoir.test".to_string()),
        "COMPTOIR_ADMIN_PASSWORD" => Some("patron-secret".to_string()),
        _ => None,
    })
    .unwrap();

    assert!(bootstrap_admin(&db, &config).await.unwrap());
    assert!(!bootstrap_admin(&db, &config).await.unwrap());
    assert_eq!(db.users().count().await.unwrap(), 1);
}
