//! Outbound request types

mod method;
mod spec;

pub use method::HttpMethod;
pub use spec::{ApiRequest, JSON_CONTENT_TYPE, RequestOptions, endpoint_url};
