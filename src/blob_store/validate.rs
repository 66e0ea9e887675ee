/// Upload payload unwrapping and size enforcement
use crate::error::{VaultError, VaultResult};
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

/// Upload ceiling applied to decoded bytes (10MB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Standard alphabet, padding optional
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Strip a `data:<mime>;base64,` prefix if present
pub fn strip_data_uri(payload: &str) -> &str {
    let trimmed = payload.trim_start();
    if trimmed.starts_with("data:") {
        match trimmed.find(',') {
            Some(comma) => &trimmed[comma + 1..],
            None => trimmed,
        }
    } else {
        trimmed
    }
}

/// Decode the transport string form of an upload into raw bytes
///
/// ASCII whitespace inside the base64 body is ignored.
pub fn decode_payload(payload: &str) -> VaultResult<Vec<u8>> {
    let body = strip_data_uri(payload);

    let compact: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if compact.is_empty() {
        return Err(VaultError::MissingInput("Upload data is empty".to_string()));
    }

    PAYLOAD_ENGINE
        .decode(&compact)
        .map_err(|e| VaultError::InvalidImage(format!("Payload is not valid base64: {}", e)))
}

/// Enforce the upload ceiling on decoded bytes
pub fn validate_size(data: &[u8], max: usize) -> VaultResult<()> {
    if data.len() > max {
        return Err(VaultError::PayloadTooLarge {
            size: data.len(),
            max,
        });
    }
    Ok(())
}

/// Length of the base64 text for `decoded` bytes, used to size the HTTP body limit
pub fn encoded_len(decoded: usize) -> usize {
    decoded.div_ceil(3) * 4
}
