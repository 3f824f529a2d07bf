use super::store::{require_key, DocumentStore, ScanPage};
use crate::models::item::{AttributeValue, Item, PRIMARY_KEY};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOptions, IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

/// Mongo's primary key field; items expose it as `id`.
const MONGO_KEY: &str = "_id";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

/// Document store backed by one MongoDB collection.
pub struct MongoDocumentStore {
    db: MongoDb,
    collection: Collection<Document>,
    page_size: usize,
}

impl MongoDocumentStore {
    pub fn new(db: MongoDb, collection: &str, page_size: usize) -> Self {
        let collection = db.collection(collection);
        Self {
            db,
            collection,
            page_size: page_size.max(1),
        }
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!(
            collection = %self.collection.name(),
            "Creating MongoDB indexes for interview-service"
        );

        // Category lookups back the per-category question views.
        let category_index = IndexModel::builder()
            .keys(doc! { "category": 1 })
            .options(
                IndexOptions::builder()
                    .name("category_lookup".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_index(category_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create category index: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on questions.category");

        Ok(())
    }
}

impl MongoDocumentStore {
    /// Documents written by other tools may carry ObjectId or numeric
    /// `_id`s. Scans cannot page across BSON types, so they are excluded
    /// and reported here.
    async fn warn_on_foreign_keys(&self) {
        match self
            .collection
            .count_documents(doc! { MONGO_KEY: { "$not": { "$type": "string" } } }, None)
            .await
        {
            Ok(0) => {}
            Ok(count) => tracing::warn!(
                collection = %self.collection.name(),
                count,
                "Documents with non-string _id are excluded from scans"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to count non-string _id documents"),
        }
    }
}

/// Only string keys take part in a scan, so the continuation token (the
/// last `_id` of a page) always orders against every remaining key.
fn scan_filter(exclusive_start_key: Option<&str>) -> Document {
    match exclusive_start_key {
        Some(key) => doc! { MONGO_KEY: { "$type": "string", "$gt": key } },
        None => doc! { MONGO_KEY: { "$type": "string" } },
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn scan(&self, exclusive_start_key: Option<&str>) -> Result<ScanPage, AppError> {
        if exclusive_start_key.is_none() {
            self.warn_on_foreign_keys().await;
        }
        let filter = scan_filter(exclusive_start_key);
        let options = FindOptions::builder()
            .sort(doc! { MONGO_KEY: 1 })
            .limit(self.page_size as i64)
            .build();

        let documents: Vec<Document> = self
            .collection
            .find(filter, options)
            .await?
            .try_collect()
            .await?;

        let items: Vec<Item> = documents.into_iter().map(document_to_item).collect();

        // A short page means the collection is exhausted.
        let last_evaluated_key = if items.len() == self.page_size {
            items
                .last()
                .and_then(|item| item.get(PRIMARY_KEY))
                .and_then(AttributeValue::as_str)
                .map(str::to_string)
        } else {
            None
        };

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, AppError> {
        let document = self
            .collection
            .find_one(doc! { MONGO_KEY: id }, None)
            .await?;
        Ok(document.map(document_to_item))
    }

    async fn put_item(&self, item: Item) -> Result<(), AppError> {
        let key = require_key(&item)?;
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! { MONGO_KEY: key.as_str() }, item_to_document(item), options)
            .await?;
        Ok(())
    }

    async fn update_item(&self, id: &str, changes: Item) -> Result<(), AppError> {
        let mut set = item_to_document(changes);
        set.remove(MONGO_KEY);

        let result = self
            .collection
            .update_one(doc! { MONGO_KEY: id }, doc! { "$set": set }, None)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<(), AppError> {
        self.collection
            .delete_one(doc! { MONGO_KEY: id }, None)
            .await?;
        Ok(())
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<Vec<Item>, AppError> {
        let mut unprocessed = Vec::new();
        for item in items {
            let Ok(key) = require_key(&item) else {
                unprocessed.push(item);
                continue;
            };
            let options = ReplaceOptions::builder().upsert(true).build();
            if let Err(e) = self
                .collection
                .replace_one(
                    doc! { MONGO_KEY: key.as_str() },
                    item_to_document(item.clone()),
                    options,
                )
                .await
            {
                tracing::warn!(item_id = %key, error = %e, "Batch write left item unprocessed");
                unprocessed.push(item);
            }
        }
        Ok(unprocessed)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }
}

/// Mongo has no set type, so string sets are written as arrays.
pub fn attribute_to_bson(value: AttributeValue) -> Bson {
    match value {
        AttributeValue::S(s) => Bson::String(s),
        AttributeValue::N(n) => match n.as_i64() {
            Some(i) => Bson::Int64(i),
            None => Bson::Double(n.as_f64().unwrap_or_default()),
        },
        AttributeValue::Bool(b) => Bson::Boolean(b),
        AttributeValue::Null => Bson::Null,
        AttributeValue::Ss(set) => Bson::Array(set.into_iter().map(Bson::String).collect()),
        AttributeValue::L(list) => Bson::Array(list.into_iter().map(attribute_to_bson).collect()),
        AttributeValue::M(map) => Bson::Document(
            map.into_iter()
                .map(|(k, v)| (k, attribute_to_bson(v)))
                .collect(),
        ),
    }
}

pub fn bson_to_attribute(value: Bson) -> AttributeValue {
    match value {
        Bson::String(s) => AttributeValue::S(s),
        Bson::Int32(n) => AttributeValue::int(n.into()),
        Bson::Int64(n) => AttributeValue::int(n),
        Bson::Double(n) => AttributeValue::float(n),
        Bson::Boolean(b) => AttributeValue::Bool(b),
        Bson::Null | Bson::Undefined => AttributeValue::Null,
        Bson::Array(values) => {
            AttributeValue::L(values.into_iter().map(bson_to_attribute).collect())
        }
        Bson::Document(document) => AttributeValue::M(
            document
                .into_iter()
                .map(|(k, v)| (k, bson_to_attribute(v)))
                .collect(),
        ),
        Bson::ObjectId(oid) => AttributeValue::S(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => AttributeValue::S(s),
            Err(_) => AttributeValue::int(dt.timestamp_millis()),
        },
        other => AttributeValue::S(other.to_string()),
    }
}

pub fn item_to_document(item: Item) -> Document {
    item.into_iter()
        .map(|(name, value)| {
            let field = if name == PRIMARY_KEY {
                MONGO_KEY.to_string()
            } else {
                name
            };
            (field, attribute_to_bson(value))
        })
        .collect()
}

pub fn document_to_item(document: Document) -> Item {
    document
        .into_iter()
        .map(|(field, value)| {
            let name = if field == MONGO_KEY {
                PRIMARY_KEY.to_string()
            } else {
                field
            };
            (name, bson_to_attribute(value))
        })
        .collect()
}
