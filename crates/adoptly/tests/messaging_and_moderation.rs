use std::sync::Arc;

use adoptly::config::{AdminBootstrap, AdoptionConfig, SecurityConfig};
use adoptly::marketplace::messages::{MessageId, MessageRepository};
use adoptly::marketplace::users::{Registration, User};
use adoptly::marketplace::{marketplace_router, Marketplace};
use adoptly::store::MemoryStore;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

struct Harness {
    router: Router,
    app: Arc<Marketplace<MemoryStore>>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let app = Arc::new(Marketplace::new(
            store.clone(),
            &SecurityConfig::development(),
            AdoptionConfig::default(),
        ));
        Self {
            router: marketplace_router(app.clone()),
            app,
            store,
        }
    }

    fn user(&self, username: &str) -> (User, String) {
        let user = self
            .app
            .users
            .register(
                Registration {
                    username: username.to_string(),
                    email: format!("{username}@example.org"),
                    password: "a-long-enough-password".to_string(),
                    full_name: None,
                },
                Utc::now(),
            )
            .expect("registered");
        let token = self.token(&user);
        (user, token)
    }

    fn admin(&self) -> (User, String) {
        let user = self
            .app
            .users
            .bootstrap_admin(
                &AdminBootstrap {
                    email: "admin@example.org".to_string(),
                    username: "site_admin".to_string(),
                    password: "a-long-enough-password".to_string(),
                },
                Utc::now(),
            )
            .expect("admin bootstrapped");
        let token = self.token(&user);
        (user, token)
    }

    fn token(&self, user: &User) -> String {
        self.app
            .tokens
            .issue(&user.id, user.role, Utc::now())
            .expect("token issued")
            .token
    }

    async fn send(&self, method: &str, uri: &str, token: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes")
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn messages_are_encrypted_at_rest_and_marked_read() {
    let harness = Harness::new();
    let (alice, alice_token) = harness.user("alice");
    let (bob, bob_token) = harness.user("bob");

    let sent = harness
        .send(
            "POST",
            "/api/v1/messages",
            &alice_token,
            Some(json!({ "receiverId": bob.id, "body": "Is Pepper still available?" })),
        )
        .await;
    assert_eq!(sent.status(), StatusCode::CREATED);
    let view = json_body(sent).await["data"].clone();
    assert_eq!(view["body"], "Is Pepper still available?");
    assert_eq!(view["read"], false);

    let id = MessageId(view["id"].as_str().expect("message id").to_string());
    let stored = harness
        .store
        .fetch_message(&id)
        .expect("store readable")
        .expect("message stored");
    assert!(!stored.ciphertext.contains("Pepper"));
    assert!(!stored.iv.is_empty());

    let inbox = json_body(
        harness
            .send("GET", "/api/v1/conversations", &bob_token, None)
            .await,
    )
    .await;
    assert_eq!(inbox["data"][0]["partner"]["username"], "alice");
    assert_eq!(inbox["data"][0]["unread"], 1);

    let thread = harness
        .send(
            "GET",
            &format!("/api/v1/conversations/{}", alice.id),
            &bob_token,
            None,
        )
        .await;
    assert_eq!(thread.status(), StatusCode::OK);
    let thread = json_body(thread).await;
    assert_eq!(thread["data"]["items"][0]["body"], "Is Pepper still available?");
    assert_eq!(thread["data"]["items"][0]["read"], true);

    let to_self = harness
        .send(
            "POST",
            "/api/v1/messages",
            &alice_token,
            Some(json!({ "receiverId": alice.id, "body": "note to self" })),
        )
        .await;
    assert_eq!(to_self.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_flow_into_the_admin_queue() {
    let harness = Harness::new();
    let (_, admin_token) = harness.admin();
    let (spammer, _) = harness.user("spammer");
    let (_, reporter_token) = harness.user("reporter");

    let filed = harness
        .send(
            "POST",
            "/api/v1/reports/users",
            &reporter_token,
            Some(json!({ "reportedUserId": spammer.id, "reason": "spam listings" })),
        )
        .await;
    assert_eq!(filed.status(), StatusCode::CREATED);
    let report = json_body(filed).await["data"].clone();
    assert_eq!(report["kind"], "user");
    assert_eq!(report["reportedUserId"], spammer.id.0.as_str());
    assert_eq!(report["status"], "pending");

    let duplicate = harness
        .send(
            "POST",
            "/api/v1/reports/users",
            &reporter_token,
            Some(json!({ "reportedUserId": spammer.id, "reason": "again" })),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let queue = json_body(
        harness
            .send(
                "GET",
                "/api/v1/admin/reports?kind=user&status=pending",
                &admin_token,
                None,
            )
            .await,
    )
    .await;
    assert_eq!(queue["data"]["total"], 1);

    let resolved = harness
        .send(
            "PATCH",
            &format!("/api/v1/admin/reports/{}", report["id"].as_str().expect("id")),
            &admin_token,
            Some(json!({ "status": "resolved", "note": "account suspended" })),
        )
        .await;
    assert_eq!(resolved.status(), StatusCode::OK);
    let resolved = json_body(resolved).await;
    assert_eq!(resolved["data"]["status"], "resolved");
    assert!(resolved["data"]["resolvedAt"].is_string());

    let suspended = harness
        .send(
            "POST",
            &format!("/api/v1/admin/users/{}/suspend", spammer.id),
            &admin_token,
            Some(json!({ "days": 7 })),
        )
        .await;
    assert_eq!(suspended.status(), StatusCode::OK);
    assert!(json_body(suspended).await["data"]["suspendedUntil"].is_string());

    let dashboard = json_body(
        harness
            .send("GET", "/api/v1/admin/dashboard", &admin_token, None)
            .await,
    )
    .await;
    assert_eq!(dashboard["data"]["users"]["total"], 3);
    assert_eq!(dashboard["data"]["users"]["suspended"], 1);
    assert_eq!(dashboard["data"]["openReports"]["users"], 0);
}

#[tokio::test]
async fn admins_cannot_be_banned() {
    let harness = Harness::new();
    let (admin, admin_token) = harness.admin();
    let (_, user_token) = harness.user("regular");

    let by_user = harness
        .send(
            "POST",
            &format!("/api/v1/admin/users/{}/ban", admin.id),
            &user_token,
            Some(json!({})),
        )
        .await;
    assert_eq!(by_user.status(), StatusCode::FORBIDDEN);

    let self_ban = harness
        .send(
            "POST",
            &format!("/api/v1/admin/users/{}/ban", admin.id),
            &admin_token,
            Some(json!({ "reason": "oops" })),
        )
        .await;
    assert_eq!(self_ban.status(), StatusCode::BAD_REQUEST);
}
