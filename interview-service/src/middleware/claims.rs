use crate::dtos::{Claims, GroupsClaim};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_GROUPS_HEADER: &str = "X-User-Groups";

/// Identity claims forwarded by the upstream authorizer.
///
/// `X-User-ID` becomes the subject and `X-User-Groups` the group claim,
/// exactly as the authorizer sent it. Requests without `X-User-ID` carry no
/// claims; an absent identity is never a rejection here, the access policy
/// decides what it may do.
#[derive(Debug, Clone, Default)]
pub struct ForwardedClaims(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for ForwardedClaims
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let Some(user_id) = header(USER_ID_HEADER).filter(|v| !v.is_empty()) else {
            return Ok(ForwardedClaims(None));
        };

        tracing::Span::current().record("user_id", user_id.as_str());

        let mut claims = Claims::new(user_id);
        claims.groups = header(USER_GROUPS_HEADER).map(GroupsClaim::Single);
        Ok(ForwardedClaims(Some(claims)))
    }
}
