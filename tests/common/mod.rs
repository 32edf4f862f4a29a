#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use chanakya_session::config::ClientConfig;
use chanakya_session::gateway::AuthGateway;
use chanakya_session::guard::Bootstrapper;
use chanakya_session::session::{AuthController, OnboardingController, SessionStore, TokenStore};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "Secret123";
pub const ADMIN_EMAIL: &str = "root@b.com";
pub const INVITED_EMAIL: &str = "invited@b.com";
pub const CODE: &str = "123456";
pub const INVITE: &str = "INV-42";

/// Tokens the stub treats specially on `/api/auth/me`.
pub const GONE_TOKEN: &str = "gone";
pub const SLOW_TOKEN: &str = "slow";

#[derive(Default)]
pub struct StubState {
    pub sessions: HashMap<String, Value>,
    pub issued: usize,
    pub me_calls: usize,
    pub logouts: usize,
    pub access_request: Option<Value>,
    pub used_invites: HashSet<String>,
    pub last_bearer: HashMap<String, Option<String>>,
}

#[derive(Clone, Default)]
pub struct Stub(Arc<Mutex<StubState>>);

impl Stub {
    pub fn with<T>(&self, f: impl FnOnce(&mut StubState) -> T) -> T {
        let mut state = self.0.lock().expect("stub state poisoned");
        f(&mut state)
    }
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub stub: Stub,
}

impl TestServer {
    async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let stub = Stub::default();

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .context("failed to bind stub backend")?;
        let app = router(stub.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, stub })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("stub backend did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Client config against this server with a short timeout.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_base_url(&self.base_url);
        config.api.request_timeout_secs = 1;
        config
    }

    pub fn gateway(&self) -> AuthGateway {
        AuthGateway::new(&self.config().api).expect("gateway builds")
    }

    /// Make `token` a live session for `user`.
    pub fn seed_session(&self, token: &str, user: Value) {
        self.stub.with(|s| s.sessions.insert(token.to_string(), user));
    }

    pub fn is_live(&self, token: &str) -> bool {
        self.stub.with(|s| s.sessions.contains_key(token))
    }

    pub fn me_calls(&self) -> usize {
        self.stub.with(|s| s.me_calls)
    }

    pub fn logouts(&self) -> usize {
        self.stub.with(|s| s.logouts)
    }

    pub fn bearer_seen(&self, path: &str) -> Option<Option<String>> {
        self.stub.with(|s| s.last_bearer.get(path).cloned())
    }
}

/// Each test gets its own backend on its own runtime.
pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// A client wired the way the CLI wires it, around the given token store.
pub struct Harness {
    pub store: Arc<SessionStore>,
    pub auth: AuthController,
    pub onboarding: OnboardingController,
    pub bootstrapper: Bootstrapper,
}

pub fn harness(server: &TestServer, tokens: Arc<dyn TokenStore>) -> Harness {
    let config = server.config();
    let gateway = Arc::new(server.gateway());
    let store = Arc::new(SessionStore::new(tokens));
    Harness {
        auth: AuthController::new(gateway.clone(), store.clone(), config.validation.clone()),
        onboarding: OnboardingController::new(gateway.clone(), store.clone(), config.validation.clone()),
        bootstrapper: Bootstrapper::new(gateway, store.clone()),
        store,
    }
}

pub fn user_json(id: &str, email: &str, role: &str, status: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "name": "Asha Rao",
        "role": role,
        "status": status,
        "tenantId": "tenant-1",
        "createdAt": "2024-04-01T10:00:00Z"
    })
}

fn known_user(email: &str) -> Option<Value> {
    match email {
        EMAIL => Some(user_json("u1", EMAIL, "CLIENT_USER", "ACTIVE")),
        ADMIN_EMAIL => Some(user_json("u0", ADMIN_EMAIL, "SYSTEM_ADMIN", "ACTIVE")),
        INVITED_EMAIL => Some(user_json("u2", INVITED_EMAIL, "CLIENT_USER", "INVITED")),
        _ => None,
    }
}

fn router(stub: Stub) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/verify-email", post(verify_email))
        .route("/api/auth/resend-verification", post(ack))
        .route("/api/auth/forgot-password", post(ack))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/access-requests", post(submit_access_request))
        .route("/api/access-requests/mine", get(my_access_request))
        .route("/api/invitations/validate", get(validate_invitation))
        .route("/api/invitations/activate", post(activate_invitation))
        .route("/api/profile/complete", put(complete_profile))
        .with_state(stub)
}

fn fail(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "success": false, "code": code, "message": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn record_bearer(stub: &Stub, path: &str, headers: &HeaderMap) -> Option<String> {
    let token = bearer(headers);
    stub.with(|s| s.last_bearer.insert(path.to_string(), token.clone()));
    token
}

/// Resolve the bearer to a live session user or answer 401.
fn session_user(stub: &Stub, token: Option<&str>) -> Result<Value, Response> {
    token
        .and_then(|t| stub.with(|s| s.sessions.get(t).cloned()))
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "NotAuthorizedException", "Invalid or expired token"))
}

fn issue(stub: &Stub, user: Value) -> Value {
    let token = stub.with(|s| {
        s.issued += 1;
        let token = format!("t{}", s.issued);
        s.sessions.insert(token.clone(), user.clone());
        token
    });
    json!({
        "accessToken": token,
        "refreshToken": "r-1",
        "expiresIn": 3600,
        "user": user
    })
}

async fn login(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record_bearer(&stub, "login", &headers);
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    match known_user(email) {
        None => fail(StatusCode::NOT_FOUND, "UserNotFoundException", "User does not exist."),
        Some(_) if password != PASSWORD => {
            fail(StatusCode::UNAUTHORIZED, "NotAuthorizedException", "Incorrect username or password.")
        }
        Some(user) => Json(issue(&stub, user)).into_response(),
    }
}

async fn signup(Json(body): Json<Value>) -> Response {
    if body["email"].as_str().and_then(known_user).is_some() {
        return fail(StatusCode::CONFLICT, "UsernameExistsException", "User already exists");
    }
    if body["inviteToken"].as_str() != Some(INVITE) {
        return fail(StatusCode::BAD_REQUEST, "InvalidInvitationCode", "Bad invite");
    }
    Json(json!({ "success": true, "message": "Account created. Check your email" })).into_response()
}

async fn verify_email(Json(body): Json<Value>) -> Response {
    let by_code = body["code"].as_str() == Some(CODE);
    let by_link = body["token"].as_str().is_some_and(|t| !t.is_empty());
    if by_code || by_link {
        return Json(json!({ "success": true, "message": "Email verified", "pendingApproval": by_code }))
            .into_response();
    }
    fail(StatusCode::BAD_REQUEST, "CodeMismatchException", "Invalid code provided")
}

async fn ack(State(stub): State<Stub>, headers: HeaderMap, Json(_body): Json<Value>) -> Response {
    record_bearer(&stub, "ack", &headers);
    Json(json!({ "success": true, "message": "Code sent" })).into_response()
}

async fn reset_password(Json(body): Json<Value>) -> Response {
    if body["code"].as_str() != Some(CODE) {
        return fail(StatusCode::BAD_REQUEST, "ExpiredCodeException", "Code expired");
    }
    if body["newPassword"].as_str().is_none() {
        return fail(StatusCode::BAD_REQUEST, "InvalidParameterException", "newPassword missing");
    }
    Json(json!({ "success": true, "message": "Password updated" })).into_response()
}

async fn refresh(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    let token = record_bearer(&stub, "refresh", &headers);
    match session_user(&stub, token.as_deref()) {
        Ok(user) => {
            if let Some(old) = token {
                stub.with(|s| s.sessions.remove(&old));
            }
            Json(issue(&stub, user)).into_response()
        }
        Err(resp) => resp,
    }
}

async fn me(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    let token = record_bearer(&stub, "me", &headers);
    stub.with(|s| s.me_calls += 1);

    match token.as_deref() {
        Some(GONE_TOKEN) => return fail(StatusCode::GONE, "SessionExpired", "Session no longer exists"),
        Some(SLOW_TOKEN) => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            return Json(user_json("u1", EMAIL, "CLIENT_USER", "ACTIVE")).into_response();
        }
        _ => {}
    }
    match session_user(&stub, token.as_deref()) {
        // Wrapped the way some deployments answer.
        Ok(user) => Json(json!({ "success": true, "data": user })).into_response(),
        Err(resp) => resp,
    }
}

async fn logout(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    let token = record_bearer(&stub, "logout", &headers);
    if let Err(resp) = session_user(&stub, token.as_deref()) {
        return resp;
    }
    stub.with(|s| {
        s.logouts += 1;
        if let Some(t) = &token {
            s.sessions.remove(t);
        }
    });
    StatusCode::NO_CONTENT.into_response()
}

async fn submit_access_request(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let token = record_bearer(&stub, "access-requests", &headers);
    if let Err(resp) = session_user(&stub, token.as_deref()) {
        return resp;
    }
    if stub.with(|s| s.access_request.is_some()) {
        return fail(StatusCode::CONFLICT, "AccessRequestPending", "Pending request exists");
    }
    let request = json!({
        "id": "ar-1",
        "accessType": body["accessType"],
        "reason": body["reason"],
        "status": "pending",
        "createdAt": "2024-04-02T09:30:00Z"
    });
    stub.with(|s| s.access_request = Some(request));
    Json(json!({ "success": true, "message": "Request submitted" })).into_response()
}

async fn my_access_request(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    let token = record_bearer(&stub, "access-requests/mine", &headers);
    if let Err(resp) = session_user(&stub, token.as_deref()) {
        return resp;
    }
    match stub.with(|s| s.access_request.clone()) {
        Some(request) => Json(json!({ "success": true, "data": request })).into_response(),
        None => fail(StatusCode::NOT_FOUND, "NotFound", "No access request"),
    }
}

async fn validate_invitation(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    record_bearer(&stub, "invitations/validate", &headers);
    let valid = query.get("code").map(String::as_str) == Some(INVITE)
        && !stub.with(|s| s.used_invites.contains(INVITE));
    Json(json!({ "valid": valid, "organizationName": "Sharma & Co", "role": "CLIENT_ADMIN" })).into_response()
}

async fn activate_invitation(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let token = record_bearer(&stub, "invitations/activate", &headers);
    if let Err(resp) = session_user(&stub, token.as_deref()) {
        return resp;
    }
    let code = body["code"].as_str().unwrap_or_default().to_string();
    if code != INVITE {
        return fail(StatusCode::BAD_REQUEST, "InvalidInvitationCode", "Unknown code");
    }
    if !stub.with(|s| s.used_invites.insert(code)) {
        return fail(StatusCode::FORBIDDEN, "InvitationAlreadyUsed", "Already used");
    }
    Json(json!({ "status": "activated", "message": "Welcome aboard", "organizationName": "Sharma & Co" }))
        .into_response()
}

async fn complete_profile(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let token = record_bearer(&stub, "profile/complete", &headers);
    if let Err(resp) = session_user(&stub, token.as_deref()) {
        return resp;
    }
    if body["address"]["pinCode"].as_str().map(str::len) != Some(6) {
        return fail(StatusCode::BAD_REQUEST, "ValidationError", "Bad PIN code");
    }
    Json(json!({ "success": true, "message": "Profile saved" })).into_response()
}
