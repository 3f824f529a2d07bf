pub mod database;
pub mod identity;
pub mod metrics;
pub mod policy;
pub mod providers;
pub mod repository;
pub mod store;
pub mod transfer;

pub use database::{MongoDb, MongoDocumentStore};
pub use identity::{
    AuthServiceIdentityProvider, CreatedUser, IdentityError, IdentityProvider,
    InMemoryIdentityProvider,
};
pub use metrics::{
    get_metrics, init_metrics, InMemoryMetricsSink, MetricDatum, MetricUnit, Metrics,
    MetricsSink, PrometheusSink,
};
pub use policy::{AccessPolicy, CallerIdentity, Denial, GroupPolicy};
pub use repository::QuestionRepository;
pub use store::{DocumentStore, InMemoryDocumentStore, ScanPage};
pub use transfer::{transfer_items, TransferPolicy, TransferReport};
