use futures::StreamExt;

use crate::adapter_github::entity::ReleaseSelector;
use crate::domain::entity::{Asset, AssetDownload, ProxyError, Release};

impl crate::domain::prelude::ReleaseSource for super::Client {
    #[tracing::instrument(skip(self), fields(repository = %self.repository))]
    async fn latest_release(&self) -> Result<Release, ProxyError> {
        let release = self.fetch_release(ReleaseSelector::Latest).await?;
        Ok(release.into())
    }

    #[tracing::instrument(skip(self), fields(repository = %self.repository))]
    async fn release_by_tag(&self, tag: &str) -> Result<Release, ProxyError> {
        let release = self.fetch_release(ReleaseSelector::Tag(tag)).await?;
        Ok(release.into())
    }

    #[tracing::instrument(skip_all, fields(asset = asset.name))]
    async fn download(&self, asset: &Asset) -> Result<AssetDownload, ProxyError> {
        let res = self
            .download
            .get(&asset.download_url)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "unable to request asset");
                ProxyError::internal(err)
            })?;
        let status = res.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "unable to download asset");
            return Err(ProxyError::upstream(
                http::StatusCode::BAD_GATEWAY,
                "Failed to fetch package",
            ));
        }
        let content_length = res.content_length();
        tracing::debug!(?content_length, "streaming asset");
        Ok(AssetDownload {
            status,
            content_length,
            body: res
                .bytes_stream()
                .map(|item| item.map_err(std::io::Error::other))
                .boxed(),
        })
    }
}
