use super::store::DocumentStore;
use crate::models::{NewQuestion, Question, QuestionPatch};
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;

/// Question records over a document store.
///
/// Every read path goes through [`Question::from_item`], which turns
/// set-typed attributes into ordered lists.
#[derive(Clone)]
pub struct QuestionRepository {
    store: Arc<dyn DocumentStore>,
}

impl QuestionRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Every question in the table, following continuation tokens until the
    /// scan is exhausted.
    pub async fn list_all(&self) -> Result<Vec<Question>, AppError> {
        let mut questions = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut start_key: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.store.scan(start_key.as_deref()).await?;
            pages += 1;
            for item in page.items {
                // One unreadable record must not hide the rest of the bank.
                match Question::from_item(item) {
                    Ok(question) => questions.push(question),
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable question record"),
                }
            }

            match page.last_evaluated_key {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(AppError::dependency(anyhow::anyhow!(
                            "Document store repeated continuation token {}",
                            token
                        )));
                    }
                    start_key = Some(token);
                }
                None => break,
            }
        }

        tracing::debug!(count = questions.len(), pages, "Scanned questions");
        Ok(questions)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Question>, AppError> {
        match self.store.get_item(id).await? {
            Some(item) => Ok(Some(Question::from_item(item)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, input: NewQuestion) -> Result<Question, AppError> {
        input.validate()?;
        let question = input.into_question();
        self.store.put_item(question.to_item()?).await?;
        tracing::info!(question_id = %question.id, category = %question.category_name(), "Question created");
        Ok(question)
    }

    /// Apply a partial patch and return the record as stored afterwards.
    pub async fn update(&self, id: &str, patch: QuestionPatch) -> Result<Question, AppError> {
        if self.store.get_item(id).await?.is_none() {
            return Err(AppError::not_found());
        }
        patch.validate()?;

        self.store.update_item(id, patch.to_changes()).await?;

        // Re-read so the caller sees what the store actually holds.
        let question = self.get(id).await?.ok_or_else(AppError::not_found)?;
        tracing::info!(question_id = %id, "Question updated");
        Ok(question)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.store.delete_item(id).await?;
        tracing::info!(question_id = %id, "Question deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::{AttributeValue, Item, PRIMARY_KEY};
    use crate::services::store::{InMemoryDocumentStore, ScanPage};
    use async_trait::async_trait;
    use serde_json::json;

    fn stored(id: &str, category: &str) -> Item {
        let mut item = Item::new();
        item.insert(PRIMARY_KEY.to_string(), AttributeValue::string(id));
        item.insert("question_text".to_string(), AttributeValue::string("q"));
        item.insert("category".to_string(), AttributeValue::string(category));
        item.insert("difficulty".to_string(), AttributeValue::string("Easy"));
        item
    }

    fn repository(page_size: usize, items: Vec<Item>) -> QuestionRepository {
        QuestionRepository::new(Arc::new(InMemoryDocumentStore::with_items(page_size, items)))
    }

    #[tokio::test]
    async fn test_list_all_concatenates_pages() {
        let items = (0..5).map(|i| stored(&format!("q-{}", i), "AWS")).collect();
        let repo = repository(2, items);

        let questions = repo.list_all().await.unwrap();
        let ids: HashSet<_> = questions.iter().map(|q| q.id.clone()).collect();
        assert_eq!(questions.len(), 5);
        assert_eq!(ids.len(), 5);
    }

    struct LoopingStore;

    #[async_trait]
    impl DocumentStore for LoopingStore {
        async fn scan(&self, _start: Option<&str>) -> Result<ScanPage, AppError> {
            Ok(ScanPage {
                items: vec![],
                last_evaluated_key: Some("same".to_string()),
            })
        }
        async fn get_item(&self, _id: &str) -> Result<Option<Item>, AppError> {
            Ok(None)
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
    async fn test_repeated_token_stops_the_scan() {
        let repo = QuestionRepository::new(Arc::new(LoopingStore));
        let err = repo.list_all().await.unwrap_err();
        assert_eq!(err.kind(), "DependencyError");
    }

    /// Serves a fixed single page, as a table written by other tools might.
    struct FixedPageStore(Vec<Item>);

    #[async_trait]
    impl DocumentStore for FixedPageStore {
        async fn scan(&self, _start: Option<&str>) -> Result<ScanPage, AppError> {
            Ok(ScanPage {
                items: self.0.clone(),
                last_evaluated_key: None,
            })
        }
        async fn get_item(&self, _id: &str) -> Result<Option<Item>, AppError> {
            Ok(None)
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
    async fn test_unreadable_record_is_skipped() {
        let mut numeric_key = stored("ignored", "AWS");
        numeric_key.insert(PRIMARY_KEY.to_string(), AttributeValue::int(7));
        let repo = QuestionRepository::new(Arc::new(FixedPageStore(vec![
            numeric_key,
            stored("q-1", "AWS"),
        ])));

        let questions = repo.list_all().await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q-1");
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = repository(10, vec![]);
        let input: NewQuestion = serde_json::from_value(json!({
            "question_text": "What is a VPC?",
            "category": "AWS",
            "difficulty": "Medium"
        }))
        .unwrap();

        let created = repo.create(input).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.question_text.as_deref(), Some("What is a VPC?"));
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found_before_validation() {
        let repo = repository(10, vec![]);
        let err = repo
            .update("missing", QuestionPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_untouched_fields() {
        let repo = repository(10, vec![stored("q-1", "AWS")]);
        let patch: QuestionPatch = serde_json::from_value(json!({"difficulty": "Hard"})).unwrap();

        let updated = repo.update("q-1", patch).await.unwrap();
        assert_eq!(updated.difficulty.as_deref(), Some("Hard"));
        assert_eq!(updated.category.as_deref(), Some("AWS"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let repo = repository(10, vec![]);
        repo.delete("missing").await.unwrap();
    }
}
