pub mod envelope;
pub mod evaluation;
pub mod signup;

pub use envelope::{ApiRequest, ApiResponse, Claims, GroupsClaim};
pub use evaluation::{EvaluationRequest, Feedback};
pub use signup::{SignupRequest, SignupResponse};
