//! Wire format for the C9 Generation Queue payload.

use serde::{Deserialize, Serialize};
use shared::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMessage {
    pub certificate_id: i64,
    pub tenant_schema: String,
    pub is_preview: bool,
}

impl GenerationMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, AppError> {
        serde_json::to_vec(self).map_err(|e| AppError::internal(format!("failed to encode queue message: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(bytes).map_err(|e| AppError::internal(format!("failed to decode queue message: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_bytes() {
        let msg = GenerationMessage { certificate_id: 42, tenant_schema: "acme".into(), is_preview: true };
        let bytes = msg.to_bytes().unwrap();
        let decoded = GenerationMessage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.certificate_id, 42);
        assert_eq!(decoded.tenant_schema, "acme");
        assert!(decoded.is_preview);
    }

    #[test]
    fn rejects_malformed_bytes() {
        assert!(GenerationMessage::from_bytes(b"not json").is_err());
    }
}
