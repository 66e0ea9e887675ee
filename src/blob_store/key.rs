/// Retrieval key parsing
///
/// A key is accepted only when it is exactly `^[0-9a-f]+\.<ext>$` for the
/// server's fixed extension. This is the only gate between a request path and
/// the filesystem, so nothing else is normalized or decoded here.
use crate::{
    blob_store::{Digest, ObjectKey, OutputFormat},
    error::{VaultError, VaultResult},
};

/// Parse a raw path segment into an object key
pub fn parse_key(raw: &str, format: OutputFormat) -> VaultResult<ObjectKey> {
    let invalid = || VaultError::InvalidKey(format!("Malformed filename: {}", truncate(raw)));

    let hex = raw
        .strip_suffix(format.extension())
        .and_then(|rest| rest.strip_suffix('.'))
        .ok_or_else(invalid)?;

    let digest = Digest::from_hex(hex).ok_or_else(invalid)?;

    Ok(ObjectKey::new(digest, format))
}

/// Keep hostile input out of log lines and error bodies at a bounded size
fn truncate(raw: &str) -> String {
    const MAX: usize = 80;
    if raw.len() <= MAX {
        raw.to_string()
    } else {
        let mut end = MAX;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw[..end])
    }
}
