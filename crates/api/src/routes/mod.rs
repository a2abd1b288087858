pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use crate::error::ApiError;

/// Parses a UUID path segment.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}
