use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use carehub_api::app::{AppServices, build_app};
use carehub_auth::{Hs256JwtVerifier, JwtClaims, PermissionPolicy, PrincipalId};
use carehub_core::{OrganizationId, PartitionId};
use carehub_events::{InMemoryEventBus, LifecycleEvent};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let bus: Arc<InMemoryEventBus<LifecycleEvent>> = Arc::new(InMemoryEventBus::new());
        let services = AppServices::in_memory(
            Arc::new(Hs256JwtVerifier::from_secret(SECRET.as_bytes())),
            Arc::new(PermissionPolicy::builtin()),
            bus,
            Duration::from_secs(5),
        );

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn encode(claims: &JwtClaims) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn claims(role: &str, org: Option<OrganizationId>) -> JwtClaims {
    let now = Utc::now();
    JwtClaims {
        sub: PrincipalId::new().to_string(),
        role: role.to_string(),
        org_id: org.map(|id| id.to_string()),
        org_schema: org.map(|id| PartitionId::for_organization(id).as_str().to_string()),
        org_scope: None,
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
        nbf: None,
        iat: Some(now.timestamp()),
    }
}

fn mint(role: &str, org: Option<OrganizationId>) -> String {
    encode(&claims(role, org))
}

async fn provision(client: &reqwest::Client, srv: &TestServer, name: &str) -> OrganizationId {
    let res = client
        .post(srv.url("/organizations"))
        .bearer_auth(mint("super_admin", None))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn create_patient(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    name: &str,
) -> String {
    let res = client
        .post(srv.url("/patients"))
        .bearer_auth(token)
        .json(&json!({ "full_name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn patient_names(client: &reqwest::Client, srv: &TestServer, token: &str) -> Vec<String> {
    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["full_name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/organizations", "/users", "/patients"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn whoami_reflects_the_credential() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org = OrganizationId::new();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint("nurse", Some(org)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "nurse");
    assert_eq!(body["organization_id"].as_str().unwrap(), org.to_string());
}

#[tokio::test]
async fn tampered_or_expired_tokens_are_unauthenticated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org = provision(&client, &srv, "Org A").await;

    let mut expired = claims("nurse", Some(org));
    expired.exp = (Utc::now() - ChronoDuration::hours(1)).timestamp();
    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(encode(&expired))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims("nurse", Some(org)),
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();
    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenants_only_see_their_own_partition() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let org_b = provision(&client, &srv, "Org B").await;

    create_patient(&client, &srv, &mint("org_admin", Some(org_a)), "Alice").await;
    create_patient(&client, &srv, &mint("org_admin", Some(org_b)), "Bob").await;

    assert_eq!(
        patient_names(&client, &srv, &mint("nurse", Some(org_a))).await,
        vec!["Alice".to_string()]
    );
    assert_eq!(
        patient_names(&client, &srv, &mint("nurse", Some(org_b))).await,
        vec!["Bob".to_string()]
    );
}

#[tokio::test]
async fn cross_tenant_denial_does_not_reveal_existence() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let org_b = provision(&client, &srv, "Org B").await;
    let nurse_a = mint("nurse", Some(org_a));

    let mut bodies = Vec::new();
    for target in [org_b.to_string(), OrganizationId::new().to_string(), "garbage".to_string()] {
        let res = client
            .get(srv.url("/patients"))
            .bearer_auth(&nurse_a)
            .header("X-Organization-Id", &target)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{target}");
        bodies.push(res.text().await.unwrap());
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));

    // Path-based targeting is refused the same way.
    let res = client
        .get(srv.url(&format!("/organizations/{}", org_b)))
        .bearer_auth(&nurse_a)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), bodies[0]);
}

#[tokio::test]
async fn missing_capability_is_the_same_forbidden() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(mint("nurse", Some(org_a)))
        .json(&json!({ "email": "x@a.test", "display_name": "X", "role": "nurse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "forbidden", "message": "forbidden" }));
}

#[tokio::test]
async fn super_admin_can_target_any_organization() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    provision(&client, &srv, "Org B").await;
    create_patient(&client, &srv, &mint("org_admin", Some(org_a)), "Alice").await;

    let super_token = mint("super_admin", None);

    let res = client
        .get(srv.url("/organizations"))
        .bearer_auth(&super_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(&super_token)
        .header("X-Organization-Id", org_a.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"][0]["full_name"], "Alice");

    // Without a target the super role has no tenant partition.
    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(&super_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn org_admin_lists_only_its_home_organization() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    provision(&client, &srv, "Org B").await;

    let res = client
        .get(srv.url("/organizations"))
        .bearer_auth(mint("org_admin", Some(org_a)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_str().unwrap(), org_a.to_string());
    assert_eq!(items[0]["name"], "Org A");
}

#[tokio::test]
async fn super_admin_unknown_organization_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url(&format!("/organizations/{}", OrganizationId::new())))
        .bearer_auth(mint("super_admin", None))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn soft_deleted_organization_locks_out_its_members() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let super_token = mint("super_admin", None);

    let res = client
        .delete(srv.url(&format!("/organizations/{}", org_a)))
        .bearer_auth(&super_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(mint("nurse", Some(org_a)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url(&format!("/organizations/{}", org_a)))
        .bearer_auth(&super_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conflicting_organization_sources_are_refused() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let org_b = provision(&client, &srv, "Org B").await;
    let body = json!({ "full_name": "Eve", "organization_id": org_b.to_string() });

    let res = client
        .post(srv.url("/patients"))
        .bearer_auth(mint("super_admin", None))
        .header("X-Organization-Id", org_a.to_string())
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Anonymous callers still learn nothing beyond "authenticate first".
    let res = client
        .post(srv.url("/patients"))
        .header("X-Organization-Id", org_a.to_string())
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_partition_must_match_the_registry() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let org_b = provision(&client, &srv, "Org B").await;

    let mut forged = claims("nurse", Some(org_a));
    forged.org_schema = Some(PartitionId::for_organization(org_b).as_str().to_string());

    let res = client
        .get(srv.url("/patients"))
        .bearer_auth(encode(&forged))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn org_admin_manages_users_in_own_organization() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let admin = mint("org_admin", Some(org_a));

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "doc@a.test", "display_name": "Doc", "role": "doctor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/users/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .delete(srv.url(&format!("/users/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patient_lookup_is_confined_to_the_partition() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let org_a = provision(&client, &srv, "Org A").await;
    let org_b = provision(&client, &srv, "Org B").await;

    let alice = create_patient(&client, &srv, &mint("org_admin", Some(org_a)), "Alice").await;

    let res = client
        .get(srv.url(&format!("/patients/{}", alice)))
        .bearer_auth(mint("doctor", Some(org_a)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Same id from the other tenant's partition: simply absent there.
    let res = client
        .get(srv.url(&format!("/patients/{}", alice)))
        .bearer_auth(mint("doctor", Some(org_b)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
