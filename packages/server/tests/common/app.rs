//! Router-level test app over in-process stubs.
//!
//! Requests go straight through the axum router with `oneshot`; no socket,
//! no database, no provider.

use std::sync::Arc;
use std::time::Duration;

use auth_core::domains::auth::CredentialAuthority;
use auth_core::domains::identity::IdentityStore;
use auth_core::kernel::test_dependencies::{test_authority, StubGateway};
use auth_core::kernel::BaseIdentityBackend;
use auth_core::server::middleware::ServiceKey;
use auth_core::server::{build_app, App, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SERVICE_KEY: &str = "test-service-key";

pub const TEST_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TestApp {
    app: App,
    pub gateway: Arc<StubGateway>,
    pub authority: Arc<CredentialAuthority>,
}

impl TestApp {
    pub fn new(gateway: StubGateway, backend: Arc<dyn BaseIdentityBackend>) -> Self {
        Self::with_service_key(gateway, backend, Some(TEST_SERVICE_KEY))
    }

    pub fn with_service_key(
        gateway: StubGateway,
        backend: Arc<dyn BaseIdentityBackend>,
        service_key: Option<&str>,
    ) -> Self {
        Self::configured(gateway, backend, service_key, TEST_REQUEST_TIMEOUT)
    }

    pub fn configured(
        gateway: StubGateway,
        backend: Arc<dyn BaseIdentityBackend>,
        service_key: Option<&str>,
        request_timeout: Duration,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let authority = Arc::new(test_authority(gateway.clone(), 42));
        let store = Arc::new(IdentityStore::new(backend));
        let app = build_app(
            AppState::new(authority.clone(), store),
            service_key.map(ServiceKey::new),
            request_timeout,
        );

        Self {
            app,
            gateway,
            authority,
        }
    }

    /// GET returning the full response.
    pub async fn send(&self, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// GET returning status and raw body text.
    pub async fn get_raw(&self, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, String) {
        let response = self.send(uri, headers).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// GET returning status and the JSON body.
    pub async fn get_with_headers(&self, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let (status, body) = self.get_raw(uri, headers).await;
        let json = serde_json::from_str(&body)
            .unwrap_or_else(|e| panic!("non-JSON body from {}: {} ({})", uri, body, e));
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.get_with_headers(uri, &[]).await
    }

    /// Run authenticate + signIn for a phone and return `(uuid, token)`.
    pub async fn sign_in(&self, phone: &str, code: &str) -> (String, String) {
        let phone = phone.replace('+', "%2B").replace(' ', "%20");
        let (status, _) = self
            .get(&format!("/public/v1/authenticate?phone={}", phone))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .get(&format!("/public/v1/signIn?phone={}&code={}", phone, code))
            .await;
        assert_eq!(status, StatusCode::OK, "signIn failed: {}", body);

        (
            body["data"]["uuid"].as_str().unwrap().to_string(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }
}
