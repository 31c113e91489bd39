use opentelemetry_semantic_conventions::attribute as semconv;
use reqwest::Request;
use reqwest_middleware::Middleware;
use tracing::Instrument;

/// Opens a `http.client.request` span around every outgoing request.
#[derive(Clone, Debug)]
pub struct TracingMiddleware {
    peer_service: &'static str,
}

impl TracingMiddleware {
    pub fn new(peer_service: &'static str) -> Self {
        Self { peer_service }
    }
}

#[async_trait::async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let span_name = format!("{} {}", req.method(), req.url().path());
        let span = tracing::info_span!(
            "http.client.request",
            error.type = tracing::field::Empty,
            error.message = tracing::field::Empty,
            http.request.method = %req.method(),
            http.response.status_code = tracing::field::Empty,
            network.peer.address = tracing::field::Empty,
            network.peer.port = tracing::field::Empty,
            network.protocol.name = "http",
            network.protocol.version = ?req.version(),
            otel.kind = "client",
            otel.name = span_name,
            otel.status_code = tracing::field::Empty,
            otel.status_description = tracing::field::Empty,
            peer.service = self.peer_service,
            server.address = tracing::field::Empty,
            server.port = tracing::field::Empty,
            url.path = req.url().path(),
            url.scheme = req.url().scheme(),
        );
        if let Some(host) = req.url().host_str() {
            span.record(semconv::SERVER_ADDRESS, host);
            span.record(semconv::NETWORK_PEER_ADDRESS, host);
        }
        if let Some(port) = req.url().port_or_known_default() {
            span.record(semconv::SERVER_PORT, port);
            span.record(semconv::NETWORK_PEER_PORT, port);
        }

        next.run(req, extensions)
            .instrument(span.clone())
            .await
            .inspect(|res| {
                let status = res.status();
                if status.is_server_error() || status.is_client_error() {
                    span.record(
                        semconv::ERROR_TYPE,
                        if status.is_server_error() {
                            "server"
                        } else {
                            "client"
                        },
                    );
                    span.record(semconv::OTEL_STATUS_CODE, "ERROR");
                    if let Some(msg) = status.canonical_reason() {
                        span.record(semconv::OTEL_STATUS_DESCRIPTION, msg);
                    }
                } else {
                    span.record(semconv::OTEL_STATUS_CODE, "OK");
                }
                span.record(semconv::HTTP_RESPONSE_STATUS_CODE, status.as_u16());
            })
            .inspect_err(|err| {
                span.record(semconv::OTEL_STATUS_CODE, "ERROR");
                span.record(semconv::OTEL_STATUS_DESCRIPTION, err.to_string());
                span.record("error.message", err.to_string());
                span.record(semconv::ERROR_TYPE, "network");
            })
    }
}
