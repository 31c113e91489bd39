use crate::adapter_github::entity::{Release, ReleaseSelector};
use crate::domain::entity::ProxyError;

impl crate::adapter_github::Client {
    fn release_url(&self, selector: ReleaseSelector<'_>) -> Result<reqwest::Url, ProxyError> {
        let mut url = reqwest::Url::clone(&self.base_url);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ProxyError::internal("invalid github base url"))?;
            segments.pop_if_empty().extend([
                "repos",
                self.repository.owner.as_str(),
                self.repository.name.as_str(),
                "releases",
            ]);
            match selector {
                ReleaseSelector::Latest => segments.push("latest"),
                ReleaseSelector::Tag(tag) => segments.extend(["tags", tag]),
            };
        }
        Ok(url)
    }

    /// Fetch a single release, forwarding the upstream status when it fails.
    pub(crate) async fn fetch_release(
        &self,
        selector: ReleaseSelector<'_>,
    ) -> Result<Release, ProxyError> {
        let url = self.release_url(selector)?;
        let res = self.api.get(url).send().await.map_err(|err| {
            tracing::error!(error = ?err, "unable to request release");
            ProxyError::internal(err)
        })?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body, "unable to fetch release");
            return Err(ProxyError::upstream(status, "Release not found"));
        }
        res.json().await.map_err(|err| {
            tracing::error!(error = ?err, "unable to read release");
            ProxyError::internal(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::adapter_github::entity::{ReleaseSelector, Repository};

    fn client(base_url: &str) -> crate::adapter_github::Client {
        crate::adapter_github::Client {
            base_url: Arc::new(reqwest::Url::parse(base_url).unwrap()),
            repository: Arc::new(Repository::new("owner", "repo")),
            api: reqwest_middleware::ClientWithMiddleware::from(reqwest::Client::new()),
            download: reqwest_middleware::ClientWithMiddleware::from(reqwest::Client::new()),
        }
    }

    #[test]
    fn should_build_latest_release_url() {
        let url = client("https://api.github.com")
            .release_url(ReleaseSelector::Latest)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/owner/repo/releases/latest"
        );
    }

    #[test]
    fn should_build_tagged_release_url_under_base_path() {
        let url = client("https://github.example.com/api/v3/")
            .release_url(ReleaseSelector::Tag("v1.0~rc1"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.example.com/api/v3/repos/owner/repo/releases/tags/v1.0~rc1"
        );
    }
}
