pub mod metrics;
pub mod request_id;

pub use metrics::{RouteTemplate, UNMATCHED_ROUTE, metrics_middleware};
pub use request_id::request_id_middleware;
