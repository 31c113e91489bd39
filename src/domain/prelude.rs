use super::entity::*;

/// Where releases and their assets come from (e.g., GitHub Releases).
pub trait ReleaseSource: Send + Sync + 'static {
    /// Fetch the latest published release of the configured repository.
    fn latest_release(&self) -> impl Future<Output = Result<Release, ProxyError>> + Send;

    /// Fetch a release by its tag name.
    fn release_by_tag(&self, tag: &str)
    -> impl Future<Output = Result<Release, ProxyError>> + Send;

    /// Start downloading an asset, without buffering its body.
    fn download(&self, asset: &Asset)
    -> impl Future<Output = Result<AssetDownload, ProxyError>> + Send;
}

#[cfg(test)]
mockall::mock! {
    pub ReleaseSource {}

    impl Clone for ReleaseSource {
        fn clone(&self) -> Self;
    }

    impl ReleaseSource for ReleaseSource {
        fn latest_release(&self) -> impl Future<Output = Result<Release, ProxyError>> + Send;
        fn release_by_tag(&self, tag: &str) -> impl Future<Output = Result<Release, ProxyError>> + Send;
        fn download(&self, asset: &Asset) -> impl Future<Output = Result<AssetDownload, ProxyError>> + Send;
    }
}

/// Provides the document translating pool filenames into release assets.
pub trait ReleaseMapSource: Send + Sync + 'static {
    fn release_map(&self) -> impl Future<Output = Result<ReleaseMap, ProxyError>> + Send;
}

#[cfg(test)]
mockall::mock! {
    pub ReleaseMapSource {}

    impl Clone for ReleaseMapSource {
        fn clone(&self) -> Self;
    }

    impl ReleaseMapSource for ReleaseMapSource {
        fn release_map(&self) -> impl Future<Output = Result<ReleaseMap, ProxyError>> + Send;
    }
}

/// Turns a pool request into a package body.
pub trait PackageResolver: Send + Sync + 'static {
    /// How the pool filenames are normalized before lookup.
    fn normalization(&self) -> FilenameNormalization;

    /// Resolve the request and start downloading the matching asset.
    fn resolve(
        &self,
        request: &PoolRequest,
    ) -> impl Future<Output = Result<PackageDownload, ProxyError>> + Send;
}

#[cfg(test)]
mockall::mock! {
    pub PackageResolver {}

    impl Clone for PackageResolver {
        fn clone(&self) -> Self;
    }

    impl PackageResolver for PackageResolver {
        fn normalization(&self) -> FilenameNormalization;
        fn resolve(
            &self,
            request: &PoolRequest,
        ) -> impl Future<Output = Result<PackageDownload, ProxyError>> + Send;
    }
}
