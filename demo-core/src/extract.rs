//! Lenient JSON body extraction.
//!
//! The demo frontends post loosely shaped JSON and sometimes nothing at all.
//! `Payload<T>` ignores the content type, treats an empty body as `{}` and
//! turns decoding failures into a 400 `ApiError` instead of axum's plain-text
//! rejection.

use crate::error::ApiError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

/// JSON request body. Request types should use `#[serde(default)]` for
/// optional fields.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<T: DeserializeOwned> Payload<T> {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ApiError> {
        let body = if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            &b"{}"[..]
        } else {
            bytes
        };
        serde_json::from_slice(body)
            .map(Payload)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Body {
        symbol: Option<String>,
        quantity: u32,
    }

    #[test]
    fn test_empty_body_is_default() {
        let Payload(body) = Payload::<Body>::from_bytes(b"  \n").unwrap();
        assert!(body.symbol.is_none());
        assert_eq!(body.quantity, 0);
    }

    #[test]
    fn test_fields_are_decoded() {
        let Payload(body) =
            Payload::<Body>::from_bytes(br#"{"symbol": "AAPL", "quantity": 5}"#).unwrap();
        assert_eq!(body.symbol.as_deref(), Some("AAPL"));
        assert_eq!(body.quantity, 5);
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = Payload::<Body>::from_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
