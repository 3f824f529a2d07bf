#![allow(dead_code)]

use interview_service::dtos::{ApiRequest, ApiResponse, Claims, GroupsClaim};
use interview_service::handlers;
use interview_service::models::{AttributeValue, Item, PRIMARY_KEY};
use interview_service::services::providers::{MockTextProvider, TextProvider};
use interview_service::services::{
    DocumentStore, GroupPolicy, IdentityProvider, InMemoryDocumentStore,
    InMemoryIdentityProvider, InMemoryMetricsSink, Metrics,
};
use interview_service::startup::{AppState, Application};
use serde_json::Value;
use std::sync::Arc;

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<dyn DocumentStore>,
    pub sink: Arc<InMemoryMetricsSink>,
}

pub struct HarnessBuilder {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn TextProvider>,
    identity: Arc<dyn IdentityProvider>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            store: Arc::new(InMemoryDocumentStore::default()),
            provider: Arc::new(MockTextProvider::new()),
            identity: Arc::new(InMemoryIdentityProvider::new()),
        }
    }
}

impl HarnessBuilder {
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn TextProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn build(self) -> TestHarness {
        let sink = Arc::new(InMemoryMetricsSink::new());
        let metrics = Metrics::new(sink.clone(), "RoleReady");
        let state = AppState::new(
            self.store.clone(),
            Arc::new(GroupPolicy::default()),
            metrics,
            self.provider,
            self.identity,
        );
        TestHarness {
            state,
            store: self.store,
            sink,
        }
    }
}

impl TestHarness {
    pub fn new() -> Self {
        HarnessBuilder::default().build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub async fn send(&self, request: ApiRequest) -> ApiResponse {
        handlers::dispatch(&self.state, request).await
    }
}

pub fn admin_claims() -> Claims {
    Claims::new("admin-1").with_groups(GroupsClaim::Single("Admin,Users".to_string()))
}

pub fn user_claims() -> Claims {
    Claims::new("user-1").with_groups(GroupsClaim::Single("Users".to_string()))
}

pub fn as_admin(request: ApiRequest) -> ApiRequest {
    request.with_claims(admin_claims())
}

pub fn question_item(id: &str, text: &str, category: &str, difficulty: &str) -> Item {
    let mut item = Item::new();
    item.insert(PRIMARY_KEY.to_string(), AttributeValue::string(id));
    item.insert("question_text".to_string(), AttributeValue::string(text));
    item.insert("category".to_string(), AttributeValue::string(category));
    item.insert("difficulty".to_string(), AttributeValue::string(difficulty));
    item
}

pub fn body(response: &ApiResponse) -> Value {
    response.json_body()
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub harness_sink: Arc<InMemoryMetricsSink>,
}

impl TestApp {
    /// Serve an in-memory application on a random port.
    pub async fn spawn() -> Self {
        let harness = TestHarness::new();
        let application = Application::with_state(harness.state.clone(), 0)
            .await
            .expect("Failed to build application");
        let port = application.port();
        tokio::spawn(application.run_until_stopped());

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            harness_sink: harness.sink,
        }
    }
}
