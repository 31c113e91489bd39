use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnBodyChunk, MakeSpan, OnEos, OnFailure, OnRequest, OnResponse, TraceLayer},
};

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    SpanCreator,
    EventBuilder,
    EventBuilder,
    DefaultOnBodyChunk,
    EventBuilder,
    EventBuilder,
>;

pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(SpanCreator)
        .on_request(EventBuilder)
        .on_response(EventBuilder)
        .on_eos(EventBuilder)
        .on_failure(EventBuilder)
}

#[derive(Clone, Copy, Debug)]
pub struct SpanCreator;

impl<B> MakeSpan<B> for SpanCreator {
    fn make_span(&mut self, req: &http::Request<B>) -> tracing::Span {
        let uri = req.uri();
        let span_name = format!("{} {}", req.method(), uri.path());
        tracing::info_span!(
            parent: None,
            "http.server.request",
            "error.type" = tracing::field::Empty,
            "exception.message" = tracing::field::Empty,
            "http.request.method" = %req.method(),
            "http.response.status_code" = tracing::field::Empty,
            "network.protocol.version" = ?req.version(),
            "otel.kind" = "server",
            "otel.name" = span_name,
            "otel.status_code" = tracing::field::Empty,
            "url.path" = uri.path(),
            "user_agent.original" = req
                .headers()
                .get(http::header::USER_AGENT)
                .and_then(|value| value.to_str().ok()),
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EventBuilder;

impl<B> OnRequest<B> for EventBuilder {
    fn on_request(&mut self, _req: &http::Request<B>, _span: &tracing::Span) {
        tracing::debug!("request started");
    }
}

impl<B> OnResponse<B> for EventBuilder {
    fn on_response(
        self,
        res: &http::Response<B>,
        latency: std::time::Duration,
        span: &tracing::Span,
    ) {
        let status = res.status();
        span.record("http.response.status_code", status.as_u16());
        if status.is_client_error() {
            span.record("error.type", "client");
        }

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "request processed"
        );
    }
}

impl<F> OnFailure<F> for EventBuilder
where
    F: std::fmt::Display,
{
    fn on_failure(
        &mut self,
        failure_classification: F,
        latency: std::time::Duration,
        span: &tracing::Span,
    ) {
        span.record("error.type", "server");
        span.record("exception.message", failure_classification.to_string());
        span.record("otel.status_code", "error");

        tracing::warn!(
            error = %failure_classification,
            latency_ms = latency.as_millis(),
            "response failed",
        );
    }
}

impl OnEos for EventBuilder {
    fn on_eos(
        self,
        _trailers: Option<&http::HeaderMap>,
        stream_duration: std::time::Duration,
        _span: &tracing::Span,
    ) {
        // Package bodies are streamed, this is when the transfer is over.
        tracing::debug!(
            stream_duration_ms = stream_duration.as_millis(),
            "end of stream",
        );
    }
}
