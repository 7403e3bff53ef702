use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use orgdesk_api::app::{build_app, AppServices};
use orgdesk_auth::{AuthConfig, PasswordConfig};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let auth = AuthConfig {
            password: PasswordConfig::fast(),
            ..AuthConfig::with_secret(jwt_secret)
        };
        let app = build_app(AppServices::in_memory(&auth));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    /// Register and return the session token.
    async fn token_for(&self, email: &str) -> String {
        let (status, body) = self.register(email, "Password123").await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_org(&self, token: &str, name: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url("/api/organizations"))
            .bearer_auth(token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, user_id: i64, issued_at: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = json!({
        "sub": user_id.to_string(),
        "email": "someone@example.com",
        "iat": issued_at.timestamp(),
        "exp": (issued_at + ttl).timestamp(),
        "jti": "test",
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn decode_sub(jwt_secret: &str, token: &str) -> String {
    let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);
    let data = jsonwebtoken::decode::<Value>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .expect("token should decode");
    data.claims["sub"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn("test-secret").await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn acme_scenario() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;

    let (status, alice) = srv.register("alice@example.com", "Password123").await;
    assert_eq!(status, StatusCode::CREATED);
    let alice_token = alice["token"].as_str().unwrap().to_string();
    let alice_id = alice["user"]["id"].as_i64().unwrap();
    assert_eq!(decode_sub(secret, &alice_token), alice_id.to_string());
    assert!(alice["user"].get("password_hash").is_none());

    let (status, acme) = srv.create_org(&alice_token, "Acme").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(acme["organization"]["role"], "admin");
    let acme_id = acme["organization"]["id"].as_i64().unwrap();

    let (status, bob) = srv.register("bob@example.com", "Secure456").await;
    assert_eq!(status, StatusCode::CREATED);
    let bob_token = bob["token"].as_str().unwrap().to_string();

    let res = srv
        .client
        .post(srv.url(&format!("/api/organizations/{acme_id}/switch")))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (status, listed) = srv.get(&alice_token, "/api/organizations").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = listed["organizations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Acme"]);

    let (status, listed) = srv.get(&bob_token, "/api/organizations").await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed["organizations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn registration_errors_map_to_status_codes() {
    let srv = TestServer::spawn("test-secret").await;

    let (status, body) = srv.register("user@com", "Password123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_email");

    let (status, body) = srv.register("alice@example.com", "password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "weak_password");

    srv.token_for("alice@example.com").await;
    let (status, body) = srv.register("alice@example.com", "Password456").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email_exists");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv
        .client
        .post(srv.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let srv = TestServer::spawn("test-secret").await;
    srv.token_for("alice@example.com").await;

    let login = |email: &'static str, password: &'static str| {
        srv.client
            .post(srv.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
    };

    let ok = login("alice@example.com", "Password123").await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let wrong = login("alice@example.com", "Password999").await.unwrap();
    let unknown = login("nobody@example.com", "Password123").await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let wrong: Value = wrong.json().await.unwrap();
    let unknown: Value = unknown.json().await.unwrap();
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn protected_endpoints_require_valid_token() {
    let secret = "test-secret";
    let srv = TestServer::spawn(secret).await;
    srv.token_for("alice@example.com").await;

    let res = srv.client.get(srv.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(secret, 1, Utc::now() - ChronoDuration::hours(25), ChronoDuration::hours(24));
    let (status, _) = srv.get(&expired, "/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = mint_jwt("other-secret", 1, Utc::now(), ChronoDuration::hours(1));
    let (status, _) = srv.get(&foreign, "/api/organizations").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let valid = mint_jwt(secret, 1, Utc::now(), ChronoDuration::hours(1));
    let (status, me) = srv.get(&valid, "/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "alice@example.com");
    assert!(me["organizations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn member_management_over_http() {
    let srv = TestServer::spawn("test-secret").await;
    let alice = srv.token_for("alice@example.com").await;
    let bob = srv.token_for("bob@example.com").await;

    let (_, acme) = srv.create_org(&alice, "Acme").await;
    let acme_id = acme["organization"]["id"].as_i64().unwrap();
    let members_url = srv.url(&format!("/api/organizations/{acme_id}/members"));

    // Bob is not a member yet.
    let (status, _) = srv.get(&bob, &format!("/api/organizations/{acme_id}/members")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let res = srv
        .client
        .post(&members_url)
        .bearer_auth(&alice)
        .json(&json!({ "email": "bob@example.com", "role": "member" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let bob_membership: Value = res.json().await.unwrap();
    let bob_membership_id = bob_membership["membership"]["id"].as_i64().unwrap();

    // Members may switch in but not manage.
    let (status, body) = srv.get(&bob, &format!("/api/organizations/{acme_id}/members")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "admin_required");

    let (status, members) = srv.get(&alice, &format!("/api/organizations/{acme_id}/members")).await;
    assert_eq!(status, StatusCode::OK);
    let members = members["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let alice_membership_id = members[0]["id"].as_i64().unwrap();
    assert_eq!(members[0]["email"], "alice@example.com");

    let res = srv
        .client
        .put(srv.url(&format!("/api/organizations/{acme_id}/members/{bob_membership_id}")))
        .bearer_auth(&alice)
        .json(&json!({ "role": "owner" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .delete(srv.url(&format!("/api/organizations/{acme_id}/members/{alice_membership_id}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "last_admin");

    let res = srv
        .client
        .put(srv.url(&format!("/api/organizations/{acme_id}/members/{bob_membership_id}")))
        .bearer_auth(&alice)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["membership"]["role"], "admin");

    let res = srv
        .client
        .delete(srv.url(&format!("/api/organizations/{acme_id}/members/{alice_membership_id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn memberships_from_other_organizations_are_not_found() {
    let srv = TestServer::spawn("test-secret").await;
    let alice = srv.token_for("alice@example.com").await;
    let bob = srv.token_for("bob@example.com").await;

    let (_, acme) = srv.create_org(&alice, "Acme").await;
    let acme_id = acme["organization"]["id"].as_i64().unwrap();
    let (_, globex) = srv.create_org(&bob, "Globex").await;
    let globex_id = globex["organization"]["id"].as_i64().unwrap();

    let (_, globex_members) = srv.get(&bob, &format!("/api/organizations/{globex_id}/members")).await;
    let bob_membership_id = globex_members["members"][0]["id"].as_i64().unwrap();

    let res = srv
        .client
        .delete(srv.url(&format!("/api/organizations/{acme_id}/members/{bob_membership_id}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Nonexistent organizations look exactly like foreign ones.
    let res = srv
        .client
        .post(srv.url("/api/organizations/424242/switch"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn organization_names_conflict() {
    let srv = TestServer::spawn("test-secret").await;
    let alice = srv.token_for("alice@example.com").await;

    let (status, body) = srv.create_org(&alice, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_name");

    srv.create_org(&alice, "Acme").await;
    let (status, body) = srv.create_org(&alice, "Acme").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "name_exists");
}

#[tokio::test]
async fn billing_details_round_trip() {
    let srv = TestServer::spawn("test-secret").await;
    let alice = srv.token_for("alice@example.com").await;
    let (_, acme) = srv.create_org(&alice, "Acme").await;
    let acme_id = acme["organization"]["id"].as_i64().unwrap();
    assert!(acme["organization"]["billing_details"].is_null());

    let res = srv
        .client
        .put(srv.url(&format!("/api/organizations/{acme_id}/billing")))
        .bearer_auth(&alice)
        .json(&json!({ "billing_details": { "plan": "pro" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["organization"]["billing_details"]["plan"], "pro");
}
