use base64::{Engine as _, engine::general_purpose};

use crate::errors::AppError;

pub fn encode_no_pad(bytes: &[u8]) -> String {
    general_purpose::STANDARD_NO_PAD.encode(bytes)
}

pub fn decode_no_pad(encoded: &[u8]) -> Result<Vec<u8>, AppError> {
    Ok(general_purpose::STANDARD_NO_PAD.decode::<&[u8]>(encoded)?)
}

/// API Gateway delivers binary-flagged bodies padded, key material is stored without padding.
pub fn decode_body(encoded: &str) -> Result<String, AppError> {
    let bytes = general_purpose::STANDARD.decode(encoded.trim())?;

    String::from_utf8(bytes).map_err(|_| AppError::RequestFormatError("Invalid request body".to_string()))
}
