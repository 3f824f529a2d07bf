mod common;

use async_trait::async_trait;
use common::{as_admin, body, question_item, TestHarness};
use interview_service::dtos::ApiRequest;
use interview_service::models::{AttributeValue, Item};
use interview_service::services::{DocumentStore, InMemoryDocumentStore, ScanPage};
use serde_json::json;
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn create_returns_201_with_fresh_id_and_echoes_fields() {
    let harness = TestHarness::new();
    let payload = json!({
        "question_text": "What is the OSI model?",
        "category": "Networking",
        "difficulty": "Easy",
        "reference_answer": "Seven layers"
    });

    let first = harness
        .send(as_admin(ApiRequest::new("POST", "/questions").with_body(&payload)))
        .await;
    let second = harness
        .send(as_admin(ApiRequest::new("POST", "/questions").with_body(&payload)))
        .await;

    assert_eq!(first.status_code, 201);
    let created = body(&first);
    assert_eq!(created["question_text"], "What is the OSI model?");
    assert_eq!(created["category"], "Networking");
    assert_eq!(created["difficulty"], "Easy");
    assert_eq!(created["reference_answer"], "Seven layers");
    assert!(created["created_at"].is_string());

    let first_id = created["id"].as_str().unwrap().to_string();
    let second_id = body(&second)["id"].as_str().unwrap().to_string();
    assert!(!first_id.is_empty());
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn create_without_reference_answer_defaults_to_empty() {
    let harness = TestHarness::new();
    let response = harness
        .send(as_admin(ApiRequest::new("POST", "/questions").with_body(&json!({
            "question_text": "What is DNS?",
            "category": "Networking",
            "difficulty": "Easy"
        }))))
        .await;

    assert_eq!(response.status_code, 201);
    assert_eq!(body(&response)["reference_answer"], "");
}

#[tokio::test]
async fn create_missing_category_is_400() {
    let harness = TestHarness::new();
    let response = harness
        .send(as_admin(ApiRequest::new("POST", "/questions").with_body(&json!({
            "question_text": "What is DNS?",
            "difficulty": "Easy"
        }))))
        .await;

    assert_eq!(response.status_code, 400);
    let error = body(&response)["error"].as_str().unwrap().to_string();
    assert!(error.contains("Missing required field: category"));
}

#[tokio::test]
async fn create_with_malformed_json_is_400() {
    let harness = TestHarness::new();
    let response = harness
        .send(as_admin(
            ApiRequest::new("POST", "/questions").with_raw_body("{\"question_text\": "),
        ))
        .await;

    assert_eq!(response.status_code, 400);
    assert!(body(&response)["error"].is_string());
}

#[tokio::test]
async fn get_missing_question_is_404() {
    let harness = TestHarness::new();
    let response = harness
        .send(ApiRequest::new("GET", "/questions/does-not-exist"))
        .await;

    assert_eq!(response.status_code, 404);
    assert_eq!(body(&response), json!({ "error": "Not found" }));
    assert_eq!(harness.sink.named("QuestionNotFound").len(), 1);
}

#[tokio::test]
async fn get_returns_set_attribute_as_list() {
    let mut item = question_item("q-1", "Explain subnetting", "Networking", "Medium");
    item.insert(
        "tags".to_string(),
        AttributeValue::string_set(["Networking", "Fundamentals"]),
    );
    let store = Arc::new(InMemoryDocumentStore::with_items(10, [item]));
    let harness = TestHarness::builder().store(store).build();

    let response = harness.send(ApiRequest::new("GET", "/questions/q-1")).await;

    assert_eq!(response.status_code, 200);
    let question = body(&response);
    assert_eq!(question["question_text"], "Explain subnetting");

    let tags: HashSet<String> = question["tags"]
        .as_array()
        .expect("tags should be a list")
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect();
    let expected: HashSet<String> = ["Networking", "Fundamentals"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(tags, expected);

    let viewed = harness.sink.named("QuestionViewed");
    assert_eq!(viewed.len(), 1);
    assert_eq!(viewed[0].dimension("Category"), Some("Networking"));
}

#[tokio::test]
async fn list_combines_every_page() {
    let items: Vec<Item> = (0..5)
        .map(|i| question_item(&format!("q-{}", i), "text", "AWS", "Easy"))
        .collect();
    // Two items per page forces three round trips.
    let store = Arc::new(InMemoryDocumentStore::with_items(2, items));
    let harness = TestHarness::builder().store(store).build();

    let response = harness.send(ApiRequest::new("GET", "/questions")).await;

    assert_eq!(response.status_code, 200);
    let questions = body(&response);
    let ids: Vec<String> = questions
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap().to_string())
        .collect();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(unique.len(), 5);

    let retrieved = harness.sink.named("QuestionsRetrieved");
    assert_eq!(retrieved.len(), 1);
    assert_eq!(retrieved[0].value, 5.0);

    let latency = harness.sink.named("APILatency");
    assert_eq!(latency.len(), 1);
    assert_eq!(latency[0].dimension("Operation"), Some("list_questions"));
}

#[tokio::test]
async fn update_changes_only_supplied_field() {
    let store = Arc::new(InMemoryDocumentStore::with_items(
        10,
        [question_item("q-1", "Old text", "Networking", "Easy")],
    ));
    let harness = TestHarness::builder().store(store).build();

    let response = harness
        .send(as_admin(
            ApiRequest::new("PUT", "/questions/q-1")
                .with_body(&json!({ "question_text": "New text" })),
        ))
        .await;

    assert_eq!(response.status_code, 200);
    let updated = body(&response);
    assert_eq!(updated["question_text"], "New text");
    assert_eq!(updated["category"], "Networking");
    assert_eq!(updated["difficulty"], "Easy");

    let fetched = harness.send(ApiRequest::new("GET", "/questions/q-1")).await;
    assert_eq!(body(&fetched)["question_text"], "New text");
}

#[tokio::test]
async fn update_missing_question_is_404() {
    let harness = TestHarness::new();
    let response = harness
        .send(as_admin(
            ApiRequest::new("PUT", "/questions/missing")
                .with_body(&json!({ "question_text": "New text" })),
        ))
        .await;

    assert_eq!(response.status_code, 404);
}

#[tokio::test]
async fn update_without_updatable_fields_is_400() {
    let store = Arc::new(InMemoryDocumentStore::with_items(
        10,
        [question_item("q-1", "Text", "Networking", "Easy")],
    ));
    let harness = TestHarness::builder().store(store).build();

    let response = harness
        .send(as_admin(
            ApiRequest::new("PUT", "/questions/q-1").with_body(&json!({ "colour": "blue" })),
        ))
        .await;

    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn delete_missing_question_is_204() {
    let harness = TestHarness::new();
    let response = harness
        .send(as_admin(ApiRequest::new("DELETE", "/questions/never-existed")))
        .await;

    assert_eq!(response.status_code, 204);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn delete_removes_question() {
    let store = Arc::new(InMemoryDocumentStore::with_items(
        10,
        [question_item("q-1", "Text", "Networking", "Easy")],
    ));
    let harness = TestHarness::builder().store(store).build();

    let response = harness
        .send(as_admin(ApiRequest::new("DELETE", "/questions/q-1")))
        .await;
    assert_eq!(response.status_code, 204);

    let fetched = harness.send(ApiRequest::new("GET", "/questions/q-1")).await;
    assert_eq!(fetched.status_code, 404);
}

#[tokio::test]
async fn unmatched_routes_return_greeting() {
    let harness = TestHarness::new();
    for (method, path) in [
        ("GET", "/"),
        ("PATCH", "/questions"),
        ("POST", "/questions/q-1"),
        ("GET", "/unknown/path"),
    ] {
        let response = harness.send(ApiRequest::new(method, path)).await;
        assert_eq!(response.status_code, 200, "{} {}", method, path);
        assert_eq!(body(&response), json!({ "message": "Hello from Lambda!" }));
    }
}

#[tokio::test]
async fn every_response_carries_cors_header() {
    let harness = TestHarness::new();
    for request in [
        ApiRequest::new("GET", "/questions"),
        ApiRequest::new("GET", "/questions/missing"),
        ApiRequest::new("POST", "/questions"),
        ApiRequest::new("GET", "/"),
    ] {
        let response = harness.send(request).await;
        assert_eq!(
            response.headers.get("Access-Control-Allow-Origin").map(String::as_str),
            Some("*")
        );
    }
}

struct BrokenStore;

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn scan(&self, _start: Option<&str>) -> Result<ScanPage, AppError> {
        Err(AppError::dependency(anyhow::anyhow!(
            "ProvisionedThroughputExceeded"
        )))
    }
    async fn get_item(&self, _id: &str) -> Result<Option<Item>, AppError> {
        Err(AppError::dependency(anyhow::anyhow!("connection refused")))
    }
    async fn put_item(&self, _item: Item) -> Result<(), AppError> {
        Err(AppError::dependency(anyhow::anyhow!("connection refused")))
    }
    async fn update_item(&self, _id: &str, _changes: Item) -> Result<(), AppError> {
        Err(AppError::dependency(anyhow::anyhow!("connection refused")))
    }
    async fn delete_item(&self, _id: &str) -> Result<(), AppError> {
        Err(AppError::dependency(anyhow::anyhow!("connection refused")))
    }
    async fn batch_put(&self, _items: Vec<Item>) -> Result<Vec<Item>, AppError> {
        Err(AppError::dependency(anyhow::anyhow!("connection refused")))
    }
    async fn health_check(&self) -> Result<(), AppError> {
        Err(AppError::dependency(anyhow::anyhow!("connection refused")))
    }
}

#[tokio::test]
async fn backend_failure_during_list_is_500() {
    let harness = TestHarness::builder().store(Arc::new(BrokenStore)).build();

    let response = harness.send(ApiRequest::new("GET", "/questions")).await;

    assert_eq!(response.status_code, 500);
    let error = body(&response)["error"].as_str().unwrap().to_string();
    assert!(error.contains("ProvisionedThroughputExceeded"));
}

struct PanickingStore;

#[async_trait]
impl DocumentStore for PanickingStore {
    async fn scan(&self, _start: Option<&str>) -> Result<ScanPage, AppError> {
        panic!("scan exploded");
    }
    async fn get_item(&self, _id: &str) -> Result<Option<Item>, AppError> {
        panic!("get exploded");
    }
    async fn put_item(&self, _item: Item) -> Result<(), AppError> {
        Ok(())
    }
    async fn update_item(&self, _id: &str, _changes: Item) -> Result<(), AppError> {
        Ok(())
    }
    async fn delete_item(&self, _id: &str) -> Result<(), AppError> {
        Ok(())
    }
    async fn batch_put(&self, items: Vec<Item>) -> Result<Vec<Item>, AppError> {
        Ok(items)
    }
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[tokio::test]
async fn panic_in_backend_becomes_500() {
    let harness = TestHarness::builder()
        .store(Arc::new(PanickingStore))
        .build();

    let response = harness.send(ApiRequest::new("GET", "/questions/q-1")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(body(&response)["error"], "get exploded");
}

#[tokio::test]
async fn metrics_failure_does_not_affect_response() {
    let store = Arc::new(InMemoryDocumentStore::with_items(
        10,
        [question_item("q-1", "Text", "Networking", "Easy")],
    ));
    let harness = TestHarness::builder().store(store).build();
    harness.sink.set_failing(true);

    let list = harness.send(ApiRequest::new("GET", "/questions")).await;
    let get = harness.send(ApiRequest::new("GET", "/questions/q-1")).await;
    let missing = harness.send(ApiRequest::new("GET", "/questions/nope")).await;

    assert_eq!(list.status_code, 200);
    assert_eq!(get.status_code, 200);
    assert_eq!(missing.status_code, 404);
    assert!(harness.sink.records().is_empty());
}

#[tokio::test]
async fn legacy_records_are_served_as_stored() {
    let mut legacy = question_item("q-legacy", "Old question", "AWS", "Easy");
    legacy.insert(
        "created_at".to_string(),
        AttributeValue::string("2024-01-15 10:30:00"),
    );
    legacy.insert("difficulty".to_string(), AttributeValue::int(3));
    let store = Arc::new(InMemoryDocumentStore::with_items(
        10,
        [legacy, question_item("q-new", "New question", "AWS", "Hard")],
    ));
    let harness = TestHarness::builder().store(store).build();

    let list = harness.send(ApiRequest::new("GET", "/questions")).await;
    assert_eq!(list.status_code, 200);
    assert_eq!(body(&list).as_array().map(Vec::len), Some(2));

    let fetched = harness
        .send(ApiRequest::new("GET", "/questions/q-legacy"))
        .await;
    assert_eq!(fetched.status_code, 200);
    let record = body(&fetched);
    assert_eq!(record["created_at"], "2024-01-15 10:30:00");
    assert_eq!(record["difficulty"], 3);
    assert_eq!(record["question_text"], "Old question");
}
