pub mod evaluation;
pub mod health;
pub mod questions;
pub mod signup;

pub use evaluation::EvaluationHandler;
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use questions::{QuestionsHandler, Route, FALLBACK_MESSAGE};
pub use signup::SignupHandler;

use crate::dtos::{ApiRequest, ApiResponse};
use crate::middleware::ForwardedClaims;
use crate::startup::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use service_core::middleware::RouteTemplate;
use service_core::observability::request_id_or_new;
use std::collections::BTreeMap;

pub const ANSWERS_PATH: &str = "/answers";
pub const SIGNUP_PATH: &str = "/signup";

/// Metric label for the handler that owns an envelope's route.
pub fn route_template(request: &ApiRequest) -> &'static str {
    let is_post = request.http_method.eq_ignore_ascii_case("POST");
    match request.path.as_str() {
        ANSWERS_PATH if is_post => ANSWERS_PATH,
        SIGNUP_PATH if is_post => SIGNUP_PATH,
        path => Route::resolve(&request.http_method, path).template(),
    }
}

/// Send an envelope to the handler that owns its route.
pub async fn dispatch(state: &AppState, request: ApiRequest) -> ApiResponse {
    let is_post = request.http_method.eq_ignore_ascii_case("POST");
    match request.path.as_str() {
        ANSWERS_PATH if is_post => state.evaluation.handle(request).await,
        SIGNUP_PATH if is_post => state.signup.handle(request).await,
        _ => state.questions.handle(request).await,
    }
}

/// Adapts a plain HTTP request into an envelope and answers with the
/// envelope's response.
pub async fn envelope_handler(
    State(state): State<AppState>,
    ForwardedClaims(claims): ForwardedClaims,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request_id = request_id_or_new(&headers);

    let mut request = ApiRequest::new(method.as_str(), uri.path())
        .with_request_id(request_id);
    request.headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect::<BTreeMap<_, _>>();
    if !body.is_empty() {
        request = request.with_raw_body(body);
    }
    if let Some(claims) = claims {
        request = request.with_claims(claims);
    }

    let template = route_template(&request);
    let mut response = dispatch(&state, request).await.into_response();
    response.extensions_mut().insert(RouteTemplate(template));
    response
}
