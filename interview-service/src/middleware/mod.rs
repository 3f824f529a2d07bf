pub mod claims;

pub use claims::{ForwardedClaims, USER_GROUPS_HEADER, USER_ID_HEADER};
