use axum::body::Body;
use axum::extract::{OriginalUri, State};
use axum::http::header;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::adapter_http_server::ServerState;
use crate::domain::entity::{PackageDownload, PoolRequest};
use crate::domain::prelude::PackageResolver;

const DEB_CONTENT_TYPE: &str = "application/vnd.debian.binary-package";
const CACHE_POLICY: &str = "public, max-age=3600";

/// `attr-char` from RFC 5987, everything else gets percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

fn content_disposition(filename: &str) -> Option<HeaderValue> {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    let value = if filename.is_ascii() {
        format!("attachment; filename=\"{escaped}\"")
    } else {
        let fallback: String = escaped
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        let encoded = utf8_percent_encode(filename, ATTR_CHAR);
        format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
    };
    HeaderValue::from_str(&value).ok()
}

/// Streams a `.deb` file from the release asset it resolves to.
///
/// The upstream headers are dropped, only the status and the length are kept.
pub async fn handler<PR>(
    State(state): State<ServerState<PR>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, super::ApiError>
where
    PR: PackageResolver + Clone,
{
    let Some(request) = PoolRequest::parse(uri.path(), state.resolver.normalization()) else {
        return Err(super::ApiError::not_found("Not Found"));
    };
    // Control characters cannot be sent back in a header.
    let Some(disposition) = content_disposition(&request.filename) else {
        tracing::warn!(filename = request.filename, "invalid pool filename");
        return Err(super::ApiError::not_found("Not Found"));
    };

    let PackageDownload { filename, download } =
        state.resolver.resolve(&request).await.map_err(|err| {
            tracing::error!(error = %err, filename = request.filename, "unable to proxy package");
            super::ApiError::from(err)
        })?;
    tracing::info!(
        filename,
        status = download.status.as_u16(),
        content_length = download.content_length,
        "streaming package"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(DEB_CONTENT_TYPE),
    );
    if let Some(length) = download.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_POLICY));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    let mut response = Response::new(Body::from_stream(download.body));
    *response.status_mut() = download.status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use axum::extract::{OriginalUri, State};
    use axum::http::{StatusCode, Uri};
    use futures::StreamExt;

    use crate::adapter_http_server::ServerState;
    use crate::domain::entity::{
        AssetDownload, FilenameNormalization, PackageDownload, PoolRequest, ProxyError,
    };
    use crate::domain::prelude::MockPackageResolver;

    const POOL_PATH: &str = "/pool/main/n/noraneko-alpha/noraneko-alpha_0.2.0-build1_amd64.deb";

    fn package(filename: &str, content: &'static [u8]) -> PackageDownload {
        PackageDownload {
            filename: filename.to_string(),
            download: AssetDownload {
                status: StatusCode::OK,
                content_length: Some(content.len() as u64),
                body: futures::stream::iter([Ok(bytes::Bytes::from_static(content))]).boxed(),
            },
        }
    }

    fn resolver(
        normalization: FilenameNormalization,
        result: Result<PackageDownload, ProxyError>,
    ) -> MockPackageResolver {
        let mut resolver = MockPackageResolver::new();
        resolver.expect_normalization().return_const(normalization);
        resolver
            .expect_resolve()
            .once()
            .return_once(move |_| Box::pin(async move { result }));
        resolver
    }

    #[tokio::test]
    async fn should_stream_package_under_requested_name() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_normalization()
            .return_const(FilenameNormalization::Preserve);
        resolver
            .expect_resolve()
            .withf(|req: &PoolRequest| req.filename == "noraneko-alpha_0.2.0-build1_amd64.deb")
            .once()
            .return_once(|req| {
                let res = package(&req.filename, b"debian-binary");
                Box::pin(async move { Ok(res) })
            });

        let res = super::handler(
            State(ServerState { resolver }),
            OriginalUri(Uri::from_static(POOL_PATH)),
        )
        .await
        .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert_eq!(headers.len(), 4);
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/vnd.debian.binary-package"
        );
        assert_eq!(headers.get("content-length").unwrap(), "13");
        assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=3600");
        assert_eq!(
            headers.get("content-disposition").unwrap(),
            "attachment; filename=\"noraneko-alpha_0.2.0-build1_amd64.deb\""
        );
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "debian-binary");
    }

    #[tokio::test]
    async fn should_keep_tilde_in_attachment_name() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_normalization()
            .return_const(FilenameNormalization::TildeToDot);
        resolver
            .expect_resolve()
            .withf(|req: &PoolRequest| req.lookup_key == "pkg_1.0.beta1_amd64.deb")
            .once()
            .return_once(|req| {
                let res = package(&req.filename, b"");
                Box::pin(async move { Ok(res) })
            });

        let res = super::handler(
            State(ServerState { resolver }),
            OriginalUri(Uri::from_static("/pool/main/p/pkg/pkg_1.0~beta1_amd64.deb")),
        )
        .await
        .unwrap();

        assert_eq!(
            res.headers().get("content-disposition").unwrap(),
            "attachment; filename=\"pkg_1.0~beta1_amd64.deb\""
        );
    }

    #[tokio::test]
    async fn should_skip_resolution_for_non_deb_files() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_normalization()
            .return_const(FilenameNormalization::Preserve);
        resolver.expect_resolve().never();

        let err = super::handler(
            State(ServerState { resolver }),
            OriginalUri(Uri::from_static("/pool/main/n/noraneko/Packages")),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Not Found");
    }

    #[tokio::test]
    async fn should_map_resolution_errors_to_status() {
        let cases = [
            (
                ProxyError::not_found("Package not found in release map"),
                StatusCode::NOT_FOUND,
                "Package not found in release map",
            ),
            (
                ProxyError::release_map_unavailable(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Release map not found",
            ),
            (
                ProxyError::upstream(StatusCode::BAD_GATEWAY, "Failed to fetch package"),
                StatusCode::BAD_GATEWAY,
                "Failed to fetch package",
            ),
            (
                ProxyError::upstream(StatusCode::FORBIDDEN, "Release not found"),
                StatusCode::FORBIDDEN,
                "Release not found",
            ),
            (
                ProxyError::internal("connection reset"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error: connection reset",
            ),
        ];
        for (error, status, message) in cases {
            let resolver = resolver(FilenameNormalization::Preserve, Err(error));

            let err = super::handler(
                State(ServerState { resolver }),
                OriginalUri(Uri::from_static(POOL_PATH)),
            )
            .await
            .unwrap_err();

            assert_eq!(err.status_code, status);
            assert_eq!(err.message, message);
        }
    }

    #[tokio::test]
    async fn should_answer_not_found_when_filename_is_not_utf8() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_normalization()
            .return_const(FilenameNormalization::Preserve);
        resolver.expect_resolve().never();

        let err = super::handler(
            State(ServerState { resolver }),
            OriginalUri(Uri::from_static("/pool/main/%FF.deb")),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Not Found");
    }

    #[tokio::test]
    async fn should_keep_encoded_slash_in_requested_filename() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_normalization()
            .return_const(FilenameNormalization::Preserve);
        resolver
            .expect_resolve()
            .withf(|req: &PoolRequest| req.lookup_key == "evil/noraneko.deb")
            .once()
            .return_once(|_| {
                Box::pin(async {
                    Err(ProxyError::not_found("Package not found in release map"))
                })
            });

        let err = super::handler(
            State(ServerState { resolver }),
            OriginalUri(Uri::from_static("/pool/main/evil%2Fnoraneko.deb")),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_serve_utf8_filename_with_extended_parameter() {
        let mut resolver = MockPackageResolver::new();
        resolver
            .expect_normalization()
            .return_const(FilenameNormalization::Preserve);
        resolver
            .expect_resolve()
            .withf(|req: &PoolRequest| req.filename == "paquet-é_1.0_amd64.deb")
            .once()
            .return_once(|req| {
                let res = package(&req.filename, b"");
                Box::pin(async move { Ok(res) })
            });

        let res = super::handler(
            State(ServerState { resolver }),
            OriginalUri(Uri::from_static("/pool/main/p/paquet/paquet-%C3%A9_1.0_amd64.deb")),
        )
        .await
        .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get("content-disposition").unwrap(),
            "attachment; filename=\"paquet-__1.0_amd64.deb\"; filename*=UTF-8''paquet-%C3%A9_1.0_amd64.deb"
        );
    }

    #[test]
    fn should_escape_quotes_in_content_disposition() {
        let value = super::content_disposition("we\"ird.deb").unwrap();
        assert_eq!(value, "attachment; filename=\"we\\\"ird.deb\"");
        assert!(super::content_disposition("line\nbreak.deb").is_none());
    }
}
