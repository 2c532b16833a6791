use friendcode_accounts::auth::{PasswordHasher, TokenCodec, MIN_COST};
use friendcode_accounts::configuration::JwtSettings;
use friendcode_accounts::startup::run;
use friendcode_accounts::store::{InMemoryUserStore, UserStore};
use friendcode_accounts::telemetry::try_init_test_telemetry;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub codec: TokenCodec,
    pub client: reqwest::Client,
}

fn spawn_app() -> TestApp {
    try_init_test_telemetry();

    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryUserStore::new(
        PasswordHasher::new(MIN_COST).expect("valid bcrypt cost"),
    ));
    let codec = TokenCodec::new(&JwtSettings {
        secret: "integration-test-secret-0123456789".to_string(),
        token_ttl_seconds: 604800,
        issuer: "test".to_string(),
    });

    let server = run(listener, store.clone(), codec.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        codec,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn register(&self, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/users", &self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register_user(&self, account: &str, email: &str, password: &str) -> Value {
        let response = self
            .register(json!({ "account": account, "email": email, "password": password }))
            .await;
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn login(&self, account: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/users/login", &self.address))
            .json(&json!({ "account": account, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login_token(&self, account: &str, password: &str) -> String {
        let response = self.login(account, password).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn me(&self, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/users/me", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn logout(&self, token: &str) -> reqwest::Response {
        self.client
            .delete(&format!("{}/users/logout", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn extend(&self, token: &str) -> reqwest::Response {
        self.client
            .patch(&format!("{}/users/extend", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn update_me(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(&format!("{}/users/me", &self.address))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn add_friend(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(&format!("{}/users/friends", &self.address))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("error body is JSON");
    body["code"].as_str().unwrap_or_default().to_string()
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_with_public_profile() {
    let app = spawn_app();

    let body = app.register_user("alice01", "a@x.com", "secret1").await;

    assert_eq!(body["account"], "alice01");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], 0);
    assert_eq!(body["status"], "resting");
    assert!(body["friend_code"].as_str().unwrap().starts_with("alice01#"));
    assert!(body.get("credential_hash").is_none());
    assert!(body.get("active_tokens").is_none());

    let stored = app.store.find_by_account("alice01").await.unwrap();
    assert_ne!(stored.credential_hash, "secret1");
    assert!(stored.active_tokens.is_empty());
}

#[tokio::test]
async fn register_returns_400_for_invalid_fields() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({ "account": "abc", "email": "a@x.com", "password": "secret1" }), "account"),
        (json!({ "account": "alice_01", "email": "a@x.com", "password": "secret1" }), "account"),
        (json!({ "account": "alice01", "email": "not-an-email", "password": "secret1" }), "email"),
        (json!({ "account": "alice01", "email": "a@x.com", "password": "short" }), "password"),
        (
            json!({ "account": "alice01", "email": "a@x.com", "password": "p".repeat(21) }),
            "password",
        ),
        (json!({ "email": "a@x.com", "password": "secret1" }), "account"),
    ];

    for (body, field) in test_cases {
        let response = app.register(body.clone()).await;
        assert_eq!(400, response.status().as_u16(), "payload {} should be rejected", body);

        let error: Value = response.json().await.unwrap();
        assert_eq!(error["code"], "VALIDATION_ERROR");
        assert!(
            error["message"].as_str().unwrap().contains(field),
            "message {} should name {}",
            error["message"],
            field
        );
    }
    assert_eq!(app.store.user_count().await, 0);
}

#[tokio::test]
async fn register_returns_409_for_duplicate_account_or_email() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;

    let same_account = app
        .register(json!({ "account": "alice01", "email": "other@x.com", "password": "secret1" }))
        .await;
    assert_eq!(409, same_account.status().as_u16());
    let error: Value = same_account.json().await.unwrap();
    assert_eq!(error["code"], "DUPLICATE_ENTRY");
    assert!(error["message"].as_str().unwrap().contains("account"));

    let same_email = app
        .register(json!({ "account": "bobby01", "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(409, same_email.status().as_u16());
    let error: Value = same_email.json().await.unwrap();
    assert!(error["message"].as_str().unwrap().contains("email"));

    assert_eq!(app.store.user_count().await, 1);
}

// --- Login ---

#[tokio::test]
async fn login_returns_400_when_credentials_missing() {
    let app = spawn_app();

    let response = app
        .client
        .post(&format!("{}/users/login", &app.address))
        .json(&json!({ "account": "alice01" }))
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
    assert_eq!(error_code(response).await, "MISSING_CREDENTIALS");
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;

    let unknown = app.login("nobody01", "secret1").await;
    assert_eq!(401, unknown.status().as_u16());
    let unknown: Value = unknown.json().await.unwrap();

    let wrong = app.login("alice01", "wrong1").await;
    assert_eq!(401, wrong.status().as_u16());
    let wrong: Value = wrong.json().await.unwrap();

    assert_eq!(unknown["code"], wrong["code"]);
    assert_eq!(unknown["message"], wrong["message"]);
}

#[tokio::test]
async fn login_appends_token_to_active_sessions() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;

    let response = app.login("alice01", "secret1").await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 604800);
    assert_eq!(body["user"]["account"], "alice01");

    let token = body["token"].as_str().unwrap();
    let stored = app.store.find_by_account("alice01").await.unwrap();
    assert_eq!(stored.active_tokens, vec![token.to_string()]);

    let me = app.me(token).await;
    assert_eq!(200, me.status().as_u16());
    let me: Value = me.json().await.unwrap();
    assert_eq!(me["account"], "alice01");
}

// --- Bearer authentication ---

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let app = spawn_app();
    let user = app.register_user("alice01", "a@x.com", "secret1").await;
    let user_id = user["id"].as_str().unwrap().parse().unwrap();

    let no_header = app
        .client
        .get(&format!("{}/users/me", &app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, no_header.status().as_u16());
    assert_eq!(error_code(no_header).await, "MISSING_TOKEN");

    let garbage = app.me("garbage").await;
    assert_eq!(401, garbage.status().as_u16());
    assert_eq!(error_code(garbage).await, "TOKEN_INVALID");

    let expired = app.codec.issue(user_id, chrono::Duration::seconds(-60)).unwrap();
    let response = app.me(&expired).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_EXPIRED");

    let forged = TokenCodec::new(&JwtSettings {
        secret: "some-other-secret".to_string(),
        token_ttl_seconds: 60,
        issuer: "test".to_string(),
    })
    .issue_session(user_id)
    .unwrap();
    let response = app.me(&forged).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

// --- Logout / extend ---

#[tokio::test]
async fn logout_revokes_only_the_presented_token() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;
    let phone = app.login_token("alice01", "secret1").await;
    let laptop = app.login_token("alice01", "secret1").await;

    let response = app.logout(&phone).await;
    assert_eq!(200, response.status().as_u16());

    // Signature and expiry still check out; the session list decides.
    assert!(app.codec.verify(&phone).is_ok());
    let response = app.me(&phone).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_REVOKED");

    assert_eq!(200, app.me(&laptop).await.status().as_u16());
    let stored = app.store.find_by_account("alice01").await.unwrap();
    assert_eq!(stored.active_tokens, vec![laptop]);
}

#[tokio::test]
async fn extend_swaps_token_without_growing_session_list() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;
    let old = app.login_token("alice01", "secret1").await;

    let response = app.extend(&old).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let new = body["token"].as_str().unwrap().to_string();
    assert_ne!(old, new);

    let stored = app.store.find_by_account("alice01").await.unwrap();
    assert_eq!(stored.active_tokens, vec![new.clone()]);

    assert_eq!(401, app.me(&old).await.status().as_u16());
    assert_eq!(200, app.me(&new).await.status().as_u16());
}

#[tokio::test]
async fn full_session_lifecycle() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;

    assert_eq!(401, app.login("alice01", "wrong").await.status().as_u16());

    let t1 = app.login_token("alice01", "secret1").await;
    let response = app.extend(&t1).await;
    let t2 = response.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(
        app.store.find_by_account("alice01").await.unwrap().active_tokens,
        vec![t2.clone()]
    );

    assert_eq!(200, app.logout(&t2).await.status().as_u16());
    assert!(app
        .store
        .find_by_account("alice01")
        .await
        .unwrap()
        .active_tokens
        .is_empty());
    assert_eq!(401, app.me(&t2).await.status().as_u16());
}

// --- Profile ---

#[tokio::test]
async fn profile_update_changes_fields_and_password() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;
    let token = app.login_token("alice01", "secret1").await;

    let response = app
        .update_me(
            &token,
            json!({ "status": "studying", "final_goal": "ship it", "password": "secret2" }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "studying");
    assert_eq!(body["final_goal"], "ship it");

    // Password change leaves existing sessions alone
    assert_eq!(200, app.me(&token).await.status().as_u16());
    assert_eq!(401, app.login("alice01", "secret1").await.status().as_u16());
    assert_eq!(200, app.login("alice01", "secret2").await.status().as_u16());
}

#[tokio::test]
async fn profile_update_rejects_taken_email_and_bad_values() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;
    app.register_user("bobby01", "b@x.com", "secret1").await;
    let token = app.login_token("alice01", "secret1").await;

    let response = app.update_me(&token, json!({ "email": "b@x.com" })).await;
    assert_eq!(409, response.status().as_u16());
    assert_eq!(error_code(response).await, "DUPLICATE_ENTRY");

    let response = app.update_me(&token, json!({ "cookie_num": -1 })).await;
    assert_eq!(400, response.status().as_u16());

    let stored = app.store.find_by_account("alice01").await.unwrap();
    assert_eq!(stored.email, "a@x.com");
    assert_eq!(stored.profile.cookie_num, 0);
}

// --- Friends ---

#[tokio::test]
async fn add_friend_once_then_conflict() {
    let app = spawn_app();
    app.register_user("alice01", "a@x.com", "secret1").await;
    let bob = app.register_user("bobby01", "b@x.com", "secret1").await;
    let code = bob["friend_code"].as_str().unwrap();
    let token = app.login_token("alice01", "secret1").await;

    let response = app
        .add_friend(&token, json!({ "friend_code": code, "poked": true }))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["friends"][0]["friend_code"], code);
    assert_eq!(body["friends"][0]["poked"], true);

    let response = app.add_friend(&token, json!({ "friend_code": code })).await;
    assert_eq!(409, response.status().as_u16());
    assert_eq!(error_code(response).await, "FRIEND_ALREADY_ADDED");

    let stored = app.store.find_by_account("alice01").await.unwrap();
    assert_eq!(stored.friends.len(), 1);
}

#[tokio::test]
async fn add_friend_rejects_unknown_and_own_code() {
    let app = spawn_app();
    let alice = app.register_user("alice01", "a@x.com", "secret1").await;
    let token = app.login_token("alice01", "secret1").await;

    let response = app
        .add_friend(&token, json!({ "friend_code": "nobody99#0000" }))
        .await;
    assert_eq!(404, response.status().as_u16());

    let own = alice["friend_code"].as_str().unwrap();
    let response = app.add_friend(&token, json!({ "friend_code": own })).await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn add_friend_requires_active_session() {
    let app = spawn_app();

    let response = app
        .client
        .patch(&format!("{}/users/friends", &app.address))
        .json(&json!({ "friend_code": "bobby01#1234" }))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}
