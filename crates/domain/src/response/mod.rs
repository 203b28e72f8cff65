//! Backend response types

mod envelope;
mod spec;

pub use envelope::{
    ApiErrorBody, ApiErrorDetail, DataEnvelope, GENERIC_ERROR_MESSAGE, GLOBAL_FIELD, Issue,
};
pub use spec::{ApiResponse, StatusCode};
