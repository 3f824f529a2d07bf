use super::item::{item_from_json, item_to_json, AttributeValue, Item, PRIMARY_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_core::error::AppError;
use uuid::Uuid;

/// Fields a question must carry at creation, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 3] = ["question_text", "category", "difficulty"];

/// Fields that may be changed by an update.
pub const UPDATABLE_FIELDS: [&str; 4] = [
    "question_text",
    "category",
    "difficulty",
    "reference_answer",
];

/// Attribute stored with the native string-set type.
pub const TAGS_FIELD: &str = "tags";

/// An interview question as seen on the wire.
///
/// A typed field is `None` when the stored record lacks it or holds a value
/// of another type; such values stay in `extra` under their own name, so a
/// record always reads back as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Any other stored attributes, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Reconstruct a question from its stored form. Only a missing or
    /// non-string primary key is an error.
    pub fn from_item(item: Item) -> Result<Self, AppError> {
        let mut attributes = item_to_json(item);

        let id = match attributes.remove(PRIMARY_KEY) {
            Some(Value::String(id)) => id,
            other => {
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "Malformed question record: primary key is {}",
                    other.map_or_else(|| "missing".to_string(), |v| v.to_string())
                )))
            }
        };

        let created_at = take_if(&mut attributes, "created_at", |v| {
            v.as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        });
        let tags = take_if(&mut attributes, TAGS_FIELD, |v| {
            v.as_array()?
                .iter()
                .map(|t| t.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or_default();

        Ok(Self {
            id,
            question_text: take_text(&mut attributes, "question_text"),
            category: take_text(&mut attributes, "category"),
            difficulty: take_text(&mut attributes, "difficulty"),
            reference_answer: take_text(&mut attributes, "reference_answer"),
            created_at,
            tags,
            extra: attributes,
        })
    }

    /// Category for metric dimensions; empty when not stored as text.
    pub fn category_name(&self) -> &str {
        self.category.as_deref().unwrap_or_default()
    }

    /// Storage form. Tags are written as a string set.
    pub fn to_item(&self) -> Result<Item, AppError> {
        let value = serde_json::to_value(self).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to serialize question: {}", e))
        })?;
        let Value::Object(object) = value else {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Question did not serialize to an object"
            )));
        };

        let mut item = item_from_json(object);
        if !self.tags.is_empty() {
            item.insert(
                TAGS_FIELD.to_string(),
                AttributeValue::string_set(self.tags.iter().cloned()),
            );
        }
        Ok(item)
    }
}

/// Remove `name` when `convert` accepts its value; otherwise leave it in place.
fn take_if<T>(
    attributes: &mut Map<String, Value>,
    name: &str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let converted = attributes.get(name).and_then(convert)?;
    attributes.remove(name);
    Some(converted)
}

fn take_text(attributes: &mut Map<String, Value>, name: &str) -> Option<String> {
    take_if(attributes, name, |v| v.as_str().map(str::to_string))
}

/// Payload of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewQuestion {
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub reference_answer: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewQuestion {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "question_text" => self.question_text.as_deref(),
            "category" => self.category.as_deref(),
            "difficulty" => self.difficulty.as_deref(),
            "reference_answer" => self.reference_answer.as_deref(),
            _ => None,
        }
    }

    /// Every required field must be present and non-blank.
    pub fn validate(&self) -> Result<(), AppError> {
        for name in REQUIRED_FIELDS {
            if self.field(name).map_or(true, |v| v.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "Missing required field: {}",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Assign identity and creation time. Call after `validate`.
    pub fn into_question(self) -> Question {
        let mut extra = self.extra;
        // Server-assigned attributes can't be supplied by the caller.
        extra.remove("id");
        extra.remove("created_at");

        Question {
            id: Uuid::new_v4().to_string(),
            question_text: self.question_text,
            category: self.category,
            difficulty: self.difficulty,
            reference_answer: Some(self.reference_answer.unwrap_or_default()),
            created_at: Some(Utc::now()),
            tags: self.tags.unwrap_or_default(),
            extra,
        }
    }
}

/// Payload of an update request. Unrecognized fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub reference_answer: Option<String>,
}

impl QuestionPatch {
    fn fields(&self) -> [(&'static str, Option<&String>); 4] {
        [
            ("question_text", self.question_text.as_ref()),
            ("category", self.category.as_ref()),
            ("difficulty", self.difficulty.as_ref()),
            ("reference_answer", self.reference_answer.as_ref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.is_empty() {
            return Err(AppError::validation(format!(
                "No updatable fields provided. Expected one of: {}",
                UPDATABLE_FIELDS.join(", ")
            )));
        }

        for (name, value) in self.fields() {
            let required = REQUIRED_FIELDS.contains(&name);
            if required && value.is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "Field cannot be blank: {}",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The supplied fields as a partial item.
    pub fn to_changes(&self) -> Item {
        self.fields()
            .into_iter()
            .filter_map(|(name, value)| {
                value.map(|v| (name.to_string(), AttributeValue::string(v.clone())))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_question(body: Value) -> NewQuestion {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_missing_category_is_reported() {
        let input = new_question(json!({
            "question_text": "What is DNS?",
            "difficulty": "Easy"
        }));
        let err = input.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: category");
    }

    #[test]
    fn test_blank_required_field_counts_as_missing() {
        let input = new_question(json!({
            "question_text": "   ",
            "category": "Networking",
            "difficulty": "Easy"
        }));
        let err = input.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: question_text");
    }

    #[test]
    fn test_into_question_assigns_identity() {
        let input = new_question(json!({
            "question_text": "What is DNS?",
            "category": "Networking",
            "difficulty": "Easy",
            "id": "caller-chosen",
            "source": "book"
        }));
        input.validate().unwrap();
        let question = input.into_question();

        assert_ne!(question.id, "caller-chosen");
        assert!(question.created_at.is_some());
        assert_eq!(question.reference_answer.as_deref(), Some(""));
        assert_eq!(question.extra.get("source"), Some(&json!("book")));
        assert!(!question.extra.contains_key("id"));
    }

    #[test]
    fn test_tags_are_stored_as_set() {
        let mut question = new_question(json!({
            "question_text": "q",
            "category": "c",
            "difficulty": "d",
            "tags": ["b", "a", "b"]
        }))
        .into_question();
        question.id = "q-1".to_string();

        let item = question.to_item().unwrap();
        assert_eq!(
            item.get(TAGS_FIELD),
            Some(&AttributeValue::string_set(["a", "b"]))
        );

        let read_back = Question::from_item(item).unwrap();
        assert_eq!(read_back.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_from_item_keeps_unknown_attributes() {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::string("1"));
        item.insert("title".to_string(), AttributeValue::string("Legacy"));

        let question = Question::from_item(item).unwrap();
        assert_eq!(question.id, "1");
        assert_eq!(question.extra.get("title"), Some(&json!("Legacy")));
    }

    #[test]
    fn test_from_item_keeps_mistyped_attributes_as_stored() {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::string("q-legacy"));
        item.insert("question_text".to_string(), AttributeValue::string("Old"));
        item.insert("difficulty".to_string(), AttributeValue::int(3));
        item.insert(
            "created_at".to_string(),
            AttributeValue::string("2024-01-15 10:30:00"),
        );

        let question = Question::from_item(item).unwrap();
        assert_eq!(question.question_text.as_deref(), Some("Old"));
        assert_eq!(question.difficulty, None);
        assert_eq!(question.created_at, None);

        let wire = serde_json::to_value(&question).unwrap();
        assert_eq!(wire["difficulty"], json!(3));
        assert_eq!(wire["created_at"], json!("2024-01-15 10:30:00"));
        assert_eq!(wire["question_text"], json!("Old"));
    }

    #[test]
    fn test_from_item_parses_rfc3339_created_at() {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::string("q-1"));
        item.insert(
            "created_at".to_string(),
            AttributeValue::string("2024-01-15T10:30:00Z"),
        );

        let question = Question::from_item(item).unwrap();
        assert!(question.created_at.is_some());
        assert!(!question.extra.contains_key("created_at"));
    }

    #[test]
    fn test_from_item_requires_string_key() {
        let mut item = Item::new();
        item.insert("question_text".to_string(), AttributeValue::string("q"));
        assert!(Question::from_item(item).is_err());
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let patch: QuestionPatch = serde_json::from_value(json!({"unrelated": 1})).unwrap();
        assert!(patch.is_empty());
        assert!(matches!(
            patch.validate(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_patch_changes_only_supplied_fields() {
        let patch: QuestionPatch =
            serde_json::from_value(json!({"question_text": "New text"})).unwrap();
        patch.validate().unwrap();

        let changes = patch.to_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.get("question_text"),
            Some(&AttributeValue::string("New text"))
        );
    }

    #[test]
    fn test_patch_may_clear_reference_answer() {
        let patch: QuestionPatch =
            serde_json::from_value(json!({"reference_answer": ""})).unwrap();
        assert!(patch.validate().is_ok());
    }
}
