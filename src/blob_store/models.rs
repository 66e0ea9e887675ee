/// Blob storage data models
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Content digest of a stored blob
///
/// Lowercase hex SHA-256 of the canonical bytes. Digests produced by
/// [`Digest::of`] are always 64 characters; digests parsed from retrieval keys
/// only carry the weaker guarantee of being non-empty lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Length of a SHA-256 digest rendered as hex
    pub const HEX_LEN: usize = 64;

    /// Compute the digest of canonical bytes
    pub fn of(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Accept a hex string taken from a retrieval key
    ///
    /// Returns `None` unless the input is one or more `[0-9a-f]` characters.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if !hex.is_empty() && hex.bytes().all(is_lower_hex) {
            Some(Self(hex.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

/// Canonical output profile for one server instance
///
/// Bundles the transform target, file extension and content type so the
/// store never handles them separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless WebP re-encode
    #[default]
    WebP,
    /// PNG re-validation and re-serialization
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::WebP => "webp",
            OutputFormat::Png => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::WebP => "image/webp",
            OutputFormat::Png => "image/png",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::WebP => image::ImageFormat::WebP,
            OutputFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::WebP),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("Unsupported output format: {}", other)),
        }
    }
}

/// Address of a stored object: `{digest}.{extension}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub digest: Digest,
    pub format: OutputFormat,
}

impl ObjectKey {
    pub fn new(digest: Digest, format: OutputFormat) -> Self {
        Self { digest, format }
    }

    /// File name within the flat store directory
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.digest, self.format.extension())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.digest, self.format.extension())
    }
}

/// Upload request body
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    /// Base64 payload, optionally prefixed with `data:<mime>;base64,`
    pub data: Option<String>,
}

/// Upload response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub hash: String,
}

/// Result of a successful ingestion
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: ObjectKey,
    pub size: usize,
    /// True when an identical object was already present
    pub deduplicated: bool,
}

/// Blob content read back from the store
#[derive(Debug, Clone)]
pub struct FetchedBlob {
    pub key: ObjectKey,
    pub data: Vec<u8>,
}

impl FetchedBlob {
    pub fn content_type(&self) -> &'static str {
        self.key.format.content_type()
    }
}
