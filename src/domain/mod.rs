pub mod entity;
pub mod prelude;

use entity::{
    Asset, FilenameNormalization, PackageDownload, PoolRequest, ProxyError, ResolutionMode,
};

pub struct Config {
    pub(crate) mode: ResolutionMode,
    pub(crate) tilde_to_dot: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            mode: crate::with_env_as_or("RESOLUTION_MODE", ResolutionMode::default())?,
            tilde_to_dot: crate::with_env_as_or("POOL_TILDE_TO_DOT", false)?,
        })
    }

    pub fn build<RS, RM>(
        self,
        release_source: RS,
        release_map_source: RM,
    ) -> PoolProxyService<RS, RM> {
        PoolProxyService {
            mode: self.mode,
            normalization: if self.tilde_to_dot {
                FilenameNormalization::TildeToDot
            } else {
                FilenameNormalization::Preserve
            },
            release_source,
            release_map_source,
        }
    }
}

/// Resolves pool filenames against GitHub releases, either directly through
/// the latest release or through the release map.
#[derive(Clone, Debug)]
pub struct PoolProxyService<RS, RM> {
    mode: ResolutionMode,
    normalization: FilenameNormalization,
    release_source: RS,
    release_map_source: RM,
}

impl<RS, RM> PoolProxyService<RS, RM>
where
    RS: prelude::ReleaseSource,
    RM: prelude::ReleaseMapSource,
{
    #[tracing::instrument(skip_all, fields(filename = request.lookup_key))]
    async fn resolve_direct(&self, request: &PoolRequest) -> Result<Asset, ProxyError> {
        let release = self.release_source.latest_release().await?;
        tracing::debug!(release = release.tag_name, "looking up latest release");
        let found = release
            .assets
            .iter()
            .find(|asset| asset.name == request.lookup_key && asset.name.ends_with(".deb"));
        match found {
            Some(asset) => Ok(asset.clone()),
            None => {
                tracing::warn!(
                    release = release.tag_name,
                    available = ?release.asset_names(),
                    "package not found in latest release",
                );
                Err(ProxyError::not_found("Package not found in latest release"))
            }
        }
    }

    #[tracing::instrument(skip_all, fields(filename = request.lookup_key))]
    async fn resolve_mapping(&self, request: &PoolRequest) -> Result<Asset, ProxyError> {
        let map = self.release_map_source.release_map().await?;
        let Some(entry) = map.entry(&request.lookup_key) else {
            tracing::warn!(
                entries = map.packages.len(),
                "package not found in release map"
            );
            tracing::debug!(
                available = ?map.packages.keys().collect::<Vec<_>>(),
                "release map content"
            );
            return Err(ProxyError::not_found("Package not found in release map"));
        };
        tracing::info!(
            release = entry.release,
            asset = entry.original_asset_name,
            pool_path = entry.pool_path.as_deref(),
            "found release map entry"
        );

        let release = self.release_source.release_by_tag(&entry.release).await?;
        match release.find_asset(&entry.original_asset_name) {
            Some(asset) => Ok(asset.clone()),
            None => {
                tracing::warn!(
                    release = release.tag_name,
                    asset = entry.original_asset_name,
                    available = ?release.asset_names(),
                    "asset not found in release",
                );
                Err(ProxyError::not_found("Package not found in release"))
            }
        }
    }
}

impl<RS, RM> prelude::PackageResolver for PoolProxyService<RS, RM>
where
    RS: prelude::ReleaseSource,
    RM: prelude::ReleaseMapSource,
{
    fn normalization(&self) -> FilenameNormalization {
        self.normalization
    }

    #[tracing::instrument(skip_all, fields(filename = request.filename, mode = ?self.mode))]
    async fn resolve(&self, request: &PoolRequest) -> Result<PackageDownload, ProxyError> {
        let asset = match self.mode {
            ResolutionMode::Direct => self.resolve_direct(request).await?,
            ResolutionMode::Mapping => self.resolve_mapping(request).await?,
        };
        tracing::info!(asset = asset.name, url = asset.download_url, "proxying package");
        let download = self.release_source.download(&asset).await?;
        Ok(PackageDownload {
            filename: request.filename.clone(),
            download,
        })
    }
}
