//! # Routes
//!
//! ```text
//! /health                                   GET
//! /api/auth/login                           POST
//! /api/auth/logout                          POST
//! /api/auth/me                              GET
//! /api/subsidiaries                         GET  POST
//! /api/subsidiaries/{id}                    GET  PUT
//! /api/subsidiaries/{id}/status             PATCH
//! /api/subsidiaries/{id}/users              GET  POST
//! /api/subsidiaries/{id}/inventory          GET  POST
//! /api/subsidiaries/{id}/sales              GET  POST
//! /api/users/{id}                           PUT  DELETE
//! /api/inventory/{id}                       PUT  DELETE
//! /api/sales                                GET
//! /api/activity-logs?subsidiaryId=          GET
//! /api/reports/{kind}?window=&format=       GET
//! ```

mod activity;
mod auth;
mod health;
mod inventory;
mod reports;
mod sales;
mod subsidiaries;
mod users;

use axum::routing::{get, patch, post, put};
use axum::Router;
use tracing::warn;

use hq_core::NewActivity;
use hq_db::Database;

use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/subsidiaries", get(subsidiaries::list).post(subsidiaries::create))
        .route("/subsidiaries/{id}", get(subsidiaries::get).put(subsidiaries::update))
        .route("/subsidiaries/{id}/status", patch(subsidiaries::set_status))
        .route("/subsidiaries/{id}/users", get(users::list).post(users::create))
        .route("/subsidiaries/{id}/inventory", get(inventory::list).post(inventory::create))
        .route("/subsidiaries/{id}/sales", get(sales::list).post(sales::create))
        .route("/users/{id}", put(users::update).delete(users::delete))
        .route("/inventory/{id}", put(inventory::update).delete(inventory::delete))
        .route("/sales", get(sales::list_all))
        .route("/activity-logs", get(activity::list))
        .route("/reports/{kind}", get(reports::report))
}

/// Records an activity entry. A failed write is logged and does not fail
/// the request that caused it.
pub(crate) async fn audit(db: &Database, entry: NewActivity) {
    let action = entry.action.clone();
    if let Err(e) = db.activity().record(entry).await {
        warn!(%action, error = %e, "Failed to record activity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::{HeaderName, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use hq_db::{ensure_default_admin, ConnectionSlot, DbConfig, MemorySessionStore};

    use crate::config::ApiConfig;

    const ADMIN_PASSWORD: &str = "admin-password";

    fn app_with(slot: ConnectionSlot) -> Router {
        let state = AppState::new(
            slot,
            Arc::new(MemorySessionStore::new()),
            ApiConfig::for_tests(),
        );
        router(state)
    }

    async fn app() -> Router {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        ensure_default_admin(&db, ADMIN_PASSWORD).await.unwrap();
        app_with(ConnectionSlot::ready_with(db))
    }

    struct Reply {
        status: StatusCode,
        cookie: Option<String>,
        content_type: Option<String>,
        body: Vec<u8>,
    }

    impl Reply {
        fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }

        fn text(&self) -> String {
            String::from_utf8(self.body.clone()).unwrap()
        }
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let cookie = header(SET_COOKIE);
        let content_type = header(CONTENT_TYPE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();

        Reply {
            status,
            cookie,
            content_type,
            body,
        }
    }

    /// Logs in and returns the `Cookie` header value for later requests.
    async fn login(app: &Router, username: &str, password: &str) -> String {
        let reply = send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.text());

        let set_cookie = reply.cookie.unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn create_subsidiary(app: &Router, admin: &str, name: &str, tax_id: &str) -> i64 {
        let reply = send(
            app,
            Method::POST,
            "/api/subsidiaries",
            Some(admin),
            Some(json!({
                "name": name,
                "taxId": tax_id,
                "email": "ops@acme.example",
                "phoneNumber": "+1 555 0100",
            })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.json()["id"].as_i64().unwrap()
    }

    /// Creates a staff member in the subsidiary and logs them in.
    async fn staff_session(app: &Router, admin: &str, subsidiary_id: i64, username: &str) -> String {
        let reply = send(
            app,
            Method::POST,
            &format!("/api/subsidiaries/{subsidiary_id}/users"),
            Some(admin),
            Some(json!({ "username": username, "password": "staff-password", "role": "staff" })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());

        login(app, username, "staff-password").await
    }

    #[tokio::test]
    async fn test_health_follows_connection_slot() {
        let slot = ConnectionSlot::new();
        let app = app_with(slot.clone());

        let reply = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(reply.json()["database"], false);

        slot.install(Database::connect(DbConfig::in_memory()).await.unwrap());

        let reply = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["status"], "ok");
    }

    #[tokio::test]
    async fn test_requests_before_connect_are_unavailable() {
        let app = app_with(ConnectionSlot::new());

        let reply = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(reply.json()["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_login_logout_and_me() {
        let app = app().await;

        let reply = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.json()["code"], "INVALID_CREDENTIALS");

        let cookie = login(&app, "admin", ADMIN_PASSWORD).await;
        assert!(cookie.starts_with("hq_session="));

        let reply = send(&app, Method::GET, "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        let me = reply.json();
        assert_eq!(me["username"], "admin");
        assert_eq!(me["role"], "mhc_admin");
        assert!(me.get("passwordHash").is_none());

        let reply = send(&app, Method::POST, "/api/auth/logout", Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert!(reply.cookie.unwrap().contains("Max-Age=0"));

        let reply = send(&app, Method::GET, "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_are_rejected() {
        let app = app().await;

        let reply = send(&app, Method::GET, "/api/subsidiaries", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.json()["code"], "UNAUTHENTICATED");

        let reply = send(
            &app,
            Method::GET,
            "/api/subsidiaries",
            Some("hq_session=not-a-session"),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_tax_id_conflicts() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;

        let first = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;

        let reply = send(
            &app,
            Method::POST,
            "/api/subsidiaries",
            Some(&admin),
            Some(json!({
                "name": "Acme South",
                "taxId": "TX-1",
                "email": "ops@south.example",
                "phoneNumber": "+1 555 0101",
            })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.json()["code"], "CONFLICT");

        let reply = send(&app, Method::GET, "/api/subsidiaries", Some(&admin), None).await;
        let list = reply.json();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], first);
        assert_eq!(list[0]["name"], "Acme North");
    }

    #[tokio::test]
    async fn test_empty_name_is_a_validation_error() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;

        let reply = send(
            &app,
            Method::POST,
            "/api/subsidiaries",
            Some(&admin),
            Some(json!({
                "name": "  ",
                "taxId": "TX-9",
                "email": "ops@acme.example",
                "phoneNumber": "+1 555 0100",
            })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json()["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_cross_subsidiary_access_is_forbidden() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;
        let north = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;
        let south = create_subsidiary(&app, &admin, "Acme South", "TX-2").await;
        let staff = staff_session(&app, &admin, north, "nora").await;

        let own = format!("/api/subsidiaries/{north}/inventory");
        let other = format!("/api/subsidiaries/{south}/inventory");

        assert_eq!(send(&app, Method::GET, &own, Some(&staff), None).await.status, StatusCode::OK);

        let reply = send(&app, Method::GET, &other, Some(&staff), None).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.json()["code"], "FORBIDDEN");

        let reply = send(&app, Method::GET, "/api/subsidiaries", Some(&staff), None).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);

        let reply = send(
            &app,
            Method::GET,
            &format!("/api/activity-logs?subsidiaryId={south}"),
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);

        // The MHC admin reads any subsidiary but does not write stock.
        assert_eq!(send(&app, Method::GET, &other, Some(&admin), None).await.status, StatusCode::OK);
        let reply = send(
            &app,
            Method::POST,
            &other,
            Some(&admin),
            Some(json!({ "name": "Widget", "quantity": 1, "costPriceCents": 1, "salePriceCents": 2 })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_sale_decrements_stock_and_rejects_oversell() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;
        let north = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;
        let staff = staff_session(&app, &admin, north, "nora").await;

        let reply = send(
            &app,
            Method::POST,
            &format!("/api/subsidiaries/{north}/inventory"),
            Some(&staff),
            Some(json!({ "name": "Widget", "quantity": 10, "costPriceCents": 300, "salePriceCents": 500 })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let item_id = reply.json()["id"].as_i64().unwrap();

        let sales = format!("/api/subsidiaries/{north}/sales");
        let reply = send(
            &app,
            Method::POST,
            &sales,
            Some(&staff),
            Some(json!({ "itemId": item_id, "quantity": 3 })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        let sale = reply.json();
        assert_eq!(sale["quantity"], 3);
        assert_eq!(sale["salePriceCents"], 500);

        let reply = send(
            &app,
            Method::POST,
            &sales,
            Some(&staff),
            Some(json!({ "itemId": item_id, "quantity": 8 })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.json()["code"], "INSUFFICIENT_STOCK");

        let reply = send(
            &app,
            Method::GET,
            &format!("/api/subsidiaries/{north}/inventory"),
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(reply.json()[0]["quantity"], 7);

        let reply = send(&app, Method::GET, &sales, Some(&staff), None).await;
        assert_eq!(reply.json().as_array().unwrap().len(), 1);

        let reply = send(&app, Method::GET, "/api/sales", Some(&admin), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_amounts_are_rejected_before_storage() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;
        let north = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;
        let staff = staff_session(&app, &admin, north, "nora").await;
        let inventory = format!("/api/subsidiaries/{north}/inventory");

        let reply = send(
            &app,
            Method::POST,
            &inventory,
            Some(&staff),
            Some(json!({
                "name": "Ingot",
                "quantity": 10_000_000_000_i64,
                "costPriceCents": 10_000_000_000_i64,
                "salePriceCents": 10_000_000_000_i64,
            })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json()["code"], "VALIDATION_ERROR");

        let reply = send(
            &app,
            Method::POST,
            &inventory,
            Some(&staff),
            Some(json!({ "name": "Ingot", "quantity": 5, "costPriceCents": 100, "salePriceCents": 200 })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let item_id = reply.json()["id"].as_i64().unwrap();

        let reply = send(
            &app,
            Method::POST,
            &format!("/api/subsidiaries/{north}/sales"),
            Some(&staff),
            Some(json!({ "itemId": item_id, "quantity": 10_000_000_000_i64 })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let reply = send(&app, Method::GET, &inventory, Some(&staff), None).await;
        assert_eq!(reply.json()[0]["quantity"], 5);
        let reply = send(&app, Method::GET, "/api/sales", Some(&admin), None).await;
        assert!(reply.json().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reports_render_csv_and_json() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;
        let north = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;
        let staff = staff_session(&app, &admin, north, "nora").await;

        let reply = send(
            &app,
            Method::POST,
            &format!("/api/subsidiaries/{north}/inventory"),
            Some(&staff),
            Some(json!({ "name": "Widget", "quantity": 10, "costPriceCents": 300, "salePriceCents": 500 })),
        )
        .await;
        let item_id = reply.json()["id"].as_i64().unwrap();
        send(
            &app,
            Method::POST,
            &format!("/api/subsidiaries/{north}/sales"),
            Some(&staff),
            Some(json!({ "itemId": item_id, "quantity": 3 })),
        )
        .await;

        // Trailing windows end at "now", exclusive.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let reply = send(&app, Method::GET, "/api/reports/sales?format=csv", Some(&staff), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.content_type.as_deref().is_some_and(|t| t.starts_with("text/csv")));
        let text = reply.text();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,subsidiaryId,itemId,userId,quantity,salePrice,total,createdAt")
        );
        assert!(lines.next().unwrap().contains(",5.00,15.00,"));

        let reply = send(
            &app,
            Method::GET,
            "/api/reports/inventory?window=year",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()[0]["stockValue"], "35.00");

        let reply = send(&app, Method::GET, "/api/reports/sales?window=decade", Some(&admin), None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let reply = send(&app, Method::GET, "/api/reports/payroll", Some(&admin), None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inactive_subsidiary_members_are_locked_out() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;
        let north = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;
        let staff = staff_session(&app, &admin, north, "nora").await;

        let reply = send(
            &app,
            Method::PATCH,
            &format!("/api/subsidiaries/{north}/status"),
            Some(&admin),
            Some(json!({ "status": false })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["status"], false);

        let reply = send(&app, Method::GET, "/api/auth/me", Some(&staff), None).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);

        let reply = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "nora", "password": "staff-password" })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_activity_is_recorded() {
        let app = app().await;
        let admin = login(&app, "admin", ADMIN_PASSWORD).await;
        let north = create_subsidiary(&app, &admin, "Acme North", "TX-1").await;

        let reply = send(
            &app,
            Method::GET,
            &format!("/api/activity-logs?subsidiaryId={north}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        let entries = reply.json();
        let actions: Vec<&str> = entries
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["action"].as_str())
            .collect();
        assert_eq!(actions, vec!["subsidiary_created"]);

        let reply = send(&app, Method::GET, "/api/activity-logs", Some(&admin), None).await;
        assert!(reply.json().as_array().unwrap().len() >= 2);
    }
}
