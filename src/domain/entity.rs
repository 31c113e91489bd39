use std::borrow::Cow;
use std::collections::HashMap;

use futures::stream::BoxStream;

/// How the requested pool filename is turned into a lookup key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilenameNormalization {
    /// The lookup key is the decoded filename, tilde included.
    #[default]
    Preserve,
    /// Every `~` is replaced by a `.` before looking up.
    TildeToDot,
}

impl FilenameNormalization {
    pub fn apply<'a>(&self, filename: &'a str) -> Cow<'a, str> {
        match self {
            Self::Preserve => Cow::Borrowed(filename),
            Self::TildeToDot if filename.contains('~') => Cow::Owned(filename.replace('~', ".")),
            Self::TildeToDot => Cow::Borrowed(filename),
        }
    }
}

/// Strategy used to go from a pool filename to a release asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Look the filename up in the release map, then fetch the release by tag.
    #[default]
    Mapping,
    /// Look for an asset with the same name in the latest release.
    Direct,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resolution mode {0:?}, expected \"mapping\" or \"direct\"")]
pub struct UnknownResolutionMode(String);

impl std::str::FromStr for ResolutionMode {
    type Err = UnknownResolutionMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mapping" => Ok(Self::Mapping),
            "direct" => Ok(Self::Direct),
            other => Err(UnknownResolutionMode(other.to_string())),
        }
    }
}

/// A request for a `.deb` file somewhere under `/pool/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolRequest {
    /// Decoded last segment of the path, as requested by the client.
    pub filename: String,
    /// Key used against the release map and the release assets.
    pub lookup_key: String,
}

impl PoolRequest {
    /// Build a request from the raw, still percent-encoded, request path.
    ///
    /// Only the last segment is decoded, so an encoded `/` stays part of the
    /// filename. Returns `None` when that segment is not a `.deb` file or does
    /// not decode to UTF-8.
    pub fn parse(path: &str, normalization: FilenameNormalization) -> Option<Self> {
        let raw = path.rsplit('/').next()?;
        if !raw.ends_with(".deb") {
            return None;
        }
        let filename = percent_encoding::percent_decode_str(raw)
            .decode_utf8()
            .ok()?;
        if filename == ".deb" {
            return None;
        }
        Some(Self {
            lookup_key: normalization.apply(&filename).into_owned(),
            filename: filename.into_owned(),
        })
    }
}

/// Entry of the release map, produced by the publishing pipeline.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMapEntry {
    /// Tag of the release holding the asset
    pub release: String,
    /// Name of the asset in that release
    pub original_asset_name: String,
    #[serde(default)]
    pub pool_path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ReleaseMap {
    #[serde(default)]
    pub packages: HashMap<String, ReleaseMapEntry>,
}

impl ReleaseMap {
    pub fn entry(&self, filename: &str) -> Option<&ReleaseMapEntry> {
        self.packages.get(filename)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub download_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    pub assets: Vec<Asset>,
}

impl Release {
    /// First asset with the exact given name, in upstream order.
    pub fn find_asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    pub fn asset_names(&self) -> Vec<&str> {
        self.assets.iter().map(|asset| asset.name.as_str()).collect()
    }
}

pub type ByteStream = BoxStream<'static, std::io::Result<bytes::Bytes>>;

/// Body of an upstream asset, along with what is needed to forward it.
pub struct AssetDownload {
    pub status: http::StatusCode,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for AssetDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetDownload")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// A resolved package, ready to be streamed back under `filename`.
#[derive(Debug)]
pub struct PackageDownload {
    pub filename: String,
    pub download: AssetDownload,
}

/// Every way a pool request can fail.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    NotFound(Cow<'static, str>),
    #[error("{reason} ({status})")]
    Upstream {
        status: http::StatusCode,
        reason: Cow<'static, str>,
    },
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    #[inline]
    pub fn not_found(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(reason.into())
    }

    #[inline]
    pub fn upstream(status: http::StatusCode, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Upstream {
            status,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }

    pub fn release_map_unavailable() -> Self {
        Self::upstream(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "Release map not found",
        )
    }

    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::NotFound(_) => http::StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => *status,
            Self::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain text returned to the client.
    pub fn message(&self) -> Cow<'static, str> {
        match self {
            Self::NotFound(reason) => reason.clone(),
            Self::Upstream { reason, .. } => reason.clone(),
            Self::Internal(detail) => Cow::Owned(format!("Internal Server Error: {detail}")),
        }
    }
}
