#![allow(dead_code)]

use std::sync::Arc;

use grant_portal::auth::{CredentialPair, MemoryStore, Role, Session};
use grant_portal::config::ClientOptions;
use grant_portal::notify::Recorder;
use grant_portal::Portal;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DEMO_EMAIL: &str = "staff@example.org";
pub const DEMO_PASSWORD: &str = "Secret123!";
pub const ACCESS_TOKEN: &str = "test_access_token";
pub const REFRESH_TOKEN: &str = "test_refresh_token";

/// A portal wired to a mock backend, with every collaborator observable
pub struct Harness {
    pub server: MockServer,
    pub portal: Portal,
    pub store: Arc<MemoryStore>,
    pub recorder: Recorder,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(|options| options, MemoryStore::new()).await
    }

    pub async fn start_with(
        configure: impl FnOnce(ClientOptions) -> ClientOptions,
        store: MemoryStore,
    ) -> Self {
        let server = MockServer::start().await;
        let options = configure(ClientOptions::default().with_base_url(&server.uri()));
        let store = Arc::new(store);
        let recorder = Recorder::new();

        let portal = Portal::builder(options)
            .store(store.clone())
            .notifier(Arc::new(recorder.clone()))
            .navigator(Arc::new(recorder.clone()))
            .build()
            .unwrap();

        Self {
            server,
            portal,
            store,
            recorder,
        }
    }

    /// Sign in as the demo staff member through the login endpoint
    pub async fn login(&self) -> Session {
        mount_login(&self.server).await;
        self.portal
            .auth()
            .login(DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap()
    }

    /// Install a session without going through the backend
    pub fn establish(&self, credentials: CredentialPair) -> Session {
        let session = demo_session();
        self.portal
            .sessions()
            .establish_session(session.clone(), credentials)
            .unwrap();
        session
    }
}

pub fn demo_user() -> Value {
    json!({
        "id": 42,
        "email": DEMO_EMAIL,
        "firstName": "Marie",
        "lastName": "Dupont",
        "role": { "name": "intervener" },
        "organizationId": 7,
        "organizationName": "French Embassy - Ottawa"
    })
}

pub fn demo_session() -> Session {
    Session {
        id: "42".into(),
        name: "Marie Dupont".into(),
        email: DEMO_EMAIL.into(),
        role: Role::StaffMember,
        organization_id: "7".into(),
        organization_name: "French Embassy - Ottawa".into(),
    }
}

pub fn demo_credentials() -> CredentialPair {
    CredentialPair::new(ACCESS_TOKEN.into(), REFRESH_TOKEN.into(), Some(3600))
}

/// Wrap a payload the way the backend does
pub fn envelope(data: Value) -> Value {
    json!({
        "success": true,
        "message": "OK",
        "data": data,
        "timestamp": "2025-01-15T10:00:00"
    })
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "login": DEMO_EMAIL, "password": DEMO_PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "accessToken": ACCESS_TOKEN,
            "refreshToken": REFRESH_TOKEN,
            "expiresIn": 3600,
            "user": demo_user()
        }))))
        .mount(server)
        .await;
}

pub fn project(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "name": "Clean water",
        "description": "Wells for rural schools",
        "submissionDate": "2025-01-15",
        "status": status,
        "totalBudget": 25000.0,
        "startDate": "2025-03-01",
        "locationId": 3,
        "intervenerId": 42,
        "isDeleted": false
    })
}

/// A one-page listing around `content`
pub fn page(content: Value) -> Value {
    let count = content.as_array().map_or(0, Vec::len);
    json!({
        "content": content,
        "page": 0,
        "size": 20,
        "totalElements": count,
        "totalPages": 1,
        "first": true,
        "last": true,
        "hasNext": false,
        "hasPrevious": false
    })
}

pub fn application(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "projectId": 12,
        "userId": 9,
        "status": status,
        "title": "Wells for Kolda",
        "budget": 1200.0,
        "currentStep": 1,
        "documentsSubmitted": []
    })
}
