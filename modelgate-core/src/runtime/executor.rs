//! ExecutionPipeline implementation.
//!
//! Wraps a single provider invocation with the ordered lifecycle events and
//! uniform error handling. The pipeline never retries and never falls back to
//! another model; it reports and returns.

use crate::error::ModelError;
use crate::event::{ExecutionMetadata, ExecutionStatus, LogSink, ModelEvent, TracingSink};
use crate::provider::ModelProvider;
use crate::types::*;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// System-level instruction template reported in every `system` event.
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "\
You are an assistant operating behind a model gateway.
Follow the caller's instructions exactly and answer in the requested format.
When a structured result is requested, return only data that matches the schema.";

/// Lifecycle-logging execution pipeline.
///
/// Holds no per-call state, so a single pipeline can serve any number of
/// concurrent executions against the same or different providers.
///
/// # Example
///
/// ```ignore
/// let pipeline = ExecutionPipeline::new(Arc::new(TracingSink::new()));
/// let text = pipeline.execute_text("openai", provider.as_ref(), "What is Rust?").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionPipeline {
    sink: Arc<dyn LogSink>,
    system_template: Arc<str>,
}

impl Default for ExecutionPipeline {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink::new()))
    }
}

impl ExecutionPipeline {
    /// Create a pipeline reporting to `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            system_template: Arc::from(DEFAULT_SYSTEM_TEMPLATE),
        }
    }

    /// Replace the system template reported in `system` events
    pub fn with_system_template(mut self, template: impl AsRef<str>) -> Self {
        self.system_template = Arc::from(template.as_ref());
        self
    }

    pub fn system_template(&self) -> &str {
        &self.system_template
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Run free-text generation against `provider`.
    ///
    /// An empty string from the provider is reported as
    /// [`ModelError::EmptyResponse`].
    pub async fn execute_text<R>(
        &self,
        model_id: &str,
        provider: &dyn ModelProvider,
        request: R,
    ) -> Result<String, ModelError>
    where
        R: IntoGenerationRequest,
    {
        let execution_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "model_execution",
            model = model_id,
            %execution_id,
            operation = "get_text"
        );

        self.run_text(execution_id, model_id, provider, request)
            .instrument(span)
            .await
    }

    /// Run structured generation against `provider`.
    ///
    /// The schema is forwarded untouched and the provider's value is returned
    /// as-is; only a JSON `null` is treated as [`ModelError::EmptyResponse`].
    pub async fn execute_object<R>(
        &self,
        model_id: &str,
        provider: &dyn ModelProvider,
        request: R,
        schema: OutputSchema,
    ) -> Result<serde_json::Value, ModelError>
    where
        R: IntoGenerationRequest,
    {
        let execution_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "model_execution",
            model = model_id,
            %execution_id,
            operation = "get_object"
        );

        self.run_object(execution_id, model_id, provider, request, schema)
            .instrument(span)
            .await
    }

    async fn run_text<R: IntoGenerationRequest>(
        &self,
        execution_id: Uuid,
        model_id: &str,
        provider: &dyn ModelProvider,
        request: R,
    ) -> Result<String, ModelError> {
        let request = self.validate(execution_id, model_id, request)?;
        self.log_request(execution_id, model_id, &request);

        let config = request.config().cloned();
        let result = match provider.get_text(request).await {
            Ok(text) if text.is_empty() => Err(ModelError::empty_response("get_text")),
            other => other,
        };

        self.settle(execution_id, model_id, config, result, |text| {
            serde_json::Value::String(text.clone())
        })
    }

    async fn run_object<R: IntoGenerationRequest>(
        &self,
        execution_id: Uuid,
        model_id: &str,
        provider: &dyn ModelProvider,
        request: R,
        schema: OutputSchema,
    ) -> Result<serde_json::Value, ModelError> {
        let request = self.validate(execution_id, model_id, request)?;
        self.log_request(execution_id, model_id, &request);

        let config = request.config().cloned();
        let structured = StructuredGenerationRequest { request, schema };
        let result = match provider.get_object(structured).await {
            Ok(serde_json::Value::Null) => Err(ModelError::empty_response("get_object")),
            other => other,
        };

        self.settle(execution_id, model_id, config, result, Clone::clone)
    }

    /// Convert the request before any event is emitted.
    fn validate<R: IntoGenerationRequest>(
        &self,
        execution_id: Uuid,
        model_id: &str,
        request: R,
    ) -> Result<GenerationRequest, ModelError> {
        request.into_generation_request().map_err(|err| {
            self.log_error(execution_id, model_id, &err);
            err
        })
    }

    fn log_request(&self, execution_id: Uuid, model_id: &str, request: &GenerationRequest) {
        let config = request.config().cloned();

        self.sink.record(&ModelEvent::System {
            execution_id,
            model: model_id.to_string(),
            system_template: self.system_template.to_string(),
            config: config.clone(),
        });

        self.sink.record(&ModelEvent::Prompt {
            execution_id,
            model: model_id.to_string(),
            payload: request.payload(),
            config,
        });
    }

    fn settle<T>(
        &self,
        execution_id: Uuid,
        model_id: &str,
        config: Option<RequestConfig>,
        result: Result<T, ModelError>,
        to_value: impl FnOnce(&T) -> serde_json::Value,
    ) -> Result<T, ModelError> {
        match &result {
            Ok(value) => self.sink.record(&ModelEvent::Response {
                execution_id,
                model: model_id.to_string(),
                response: to_value(value),
                execution_metadata: ExecutionMetadata {
                    timestamp: chrono::Utc::now(),
                    config,
                },
            }),
            Err(err) => self.log_error(execution_id, model_id, err),
        }
        result
    }

    fn log_error(&self, execution_id: Uuid, model_id: &str, err: &ModelError) {
        self.sink.record(&ModelEvent::Error {
            execution_id,
            model: model_id.to_string(),
            error: err.to_string(),
            status: ExecutionStatus::Failed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, MemorySink};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning canned results and counting invocations
    #[derive(Debug)]
    struct StubProvider {
        info: ProviderInfo,
        text: Result<String, String>,
        object: Result<serde_json::Value, String>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(text: Result<&str, &str>, object: Result<serde_json::Value, &str>) -> Self {
            Self {
                info: ProviderInfo::new("stub", "Stub", "canned responses"),
                text: text.map(str::to_string).map_err(str::to_string),
                object: object.map_err(str::to_string),
                calls: AtomicUsize::new(0),
            }
        }

        fn text(text: &str) -> Self {
            Self::new(Ok(text), Ok(json!({})))
        }

        fn object(object: serde_json::Value) -> Self {
            Self::new(Ok("unused"), Ok(object))
        }

        fn failing(msg: &str) -> Self {
            Self::new(Err(msg), Err(msg))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelProvider for StubProvider {
        fn info(&self) -> &ProviderInfo {
            &self.info
        }

        async fn get_text(&self, _request: GenerationRequest) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text.clone().map_err(ModelError::provider)
        }

        async fn get_object(
            &self,
            _request: StructuredGenerationRequest,
        ) -> Result<serde_json::Value, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.object.clone().map_err(ModelError::provider)
        }
    }

    fn pipeline() -> (ExecutionPipeline, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (ExecutionPipeline::new(sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_success_emits_system_prompt_response() {
        let (pipeline, sink) = pipeline();
        let provider = StubProvider::text("hello there");

        let text = pipeline
            .execute_text("p1", &provider, "hi")
            .await
            .unwrap();

        assert_eq!(text, "hello there");
        assert_eq!(
            sink.kinds(),
            vec![EventKind::System, EventKind::Prompt, EventKind::Response]
        );

        let events = sink.events();
        assert!(events.iter().all(|e| e.model() == "p1"));
        assert!(events
            .iter()
            .all(|e| e.execution_id() == events[0].execution_id()));
        match &events[2] {
            ModelEvent::Response { response, .. } => assert_eq!(response, &json!("hello there")),
            other => panic!("Expected response event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_emits_system_prompt_error() {
        let (pipeline, sink) = pipeline();
        let provider = StubProvider::failing("rate limited");

        let err = pipeline
            .execute_text("p1", &provider, "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::Provider(ref msg) if msg == "rate limited"));
        assert_eq!(
            sink.kinds(),
            vec![EventKind::System, EventKind::Prompt, EventKind::Error]
        );
        match &sink.events()[2] {
            ModelEvent::Error { error, status, .. } => {
                assert_eq!(error, "Provider error: rate limited");
                assert_eq!(*status, ExecutionStatus::Failed);
            }
            other => panic!("Expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_empty_response() {
        let (pipeline, sink) = pipeline();
        let provider = StubProvider::text("");

        let err = pipeline
            .execute_text("p1", &provider, GenerationRequest::prompt("hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::EmptyResponse(_)));
        let errors: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.kind() == EventKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ModelEvent::Error { model, error, .. } => {
                assert_eq!(model, "p1");
                assert!(!error.is_empty());
            }
            other => panic!("Expected error event, got {:?}", other),
        }
        assert!(!sink.kinds().contains(&EventKind::Response));
    }

    #[tokio::test]
    async fn test_malformed_request_never_reaches_provider() {
        let (pipeline, sink) = pipeline();
        let provider = StubProvider::text("unused");

        let err = pipeline
            .execute_text("p1", &provider, GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::MalformedRequest(_)));
        assert_eq!(provider.calls(), 0);
        assert_eq!(sink.kinds(), vec![EventKind::Error]);
    }

    #[tokio::test]
    async fn test_malformed_object_request() {
        let (pipeline, sink) = pipeline();
        let provider = StubProvider::object(json!({ "a": 1 }));
        let params = GenerationParams {
            prompt: Some("hi".to_string()),
            messages: Some(vec![ChatMessage::user("hi")]),
            ..Default::default()
        };

        let err = pipeline
            .execute_object("p1", &provider, params, OutputSchema::new("x", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::MalformedRequest(_)));
        assert_eq!(provider.calls(), 0);
        assert!(!sink
            .kinds()
            .iter()
            .any(|k| matches!(k, EventKind::System | EventKind::Prompt)));
    }

    #[tokio::test]
    async fn test_object_is_returned_unchanged() {
        let objects = [
            json!({ "name": "Ada", "age": 36 }),
            json!([1, 2, 3]),
            json!({ "nested": { "list": [{ "x": null }] } }),
            json!(false),
            json!(0),
            json!(""),
        ];

        for object in objects {
            let (pipeline, sink) = pipeline();
            let provider = StubProvider::object(object.clone());
            let schema = OutputSchema::new("any", json!({}));

            let result = pipeline
                .execute_object("p1", &provider, "describe", schema)
                .await
                .unwrap();

            assert_eq!(result, object);
            assert_eq!(
                sink.kinds(),
                vec![EventKind::System, EventKind::Prompt, EventKind::Response]
            );
        }
    }

    #[tokio::test]
    async fn test_null_object_is_empty_response() {
        let (pipeline, sink) = pipeline();
        let provider = StubProvider::object(serde_json::Value::Null);

        let err = pipeline
            .execute_object("p1", &provider, "hi", OutputSchema::new("x", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::EmptyResponse(ref op) if op == "get_object"));
        assert_eq!(
            sink.kinds(),
            vec![EventKind::System, EventKind::Prompt, EventKind::Error]
        );
    }

    #[tokio::test]
    async fn test_events_carry_payload_and_config() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = ExecutionPipeline::new(sink.clone()).with_system_template("be terse");
        let provider = StubProvider::text("ok");
        let config = RequestConfig::new()
            .with_temperature(0.2)
            .with_stop_sequences(["\n"]);
        let request = GenerationRequest::messages(vec![ChatMessage::user("hi")])
            .with_config(config.clone());

        pipeline.execute_text("p1", &provider, request).await.unwrap();

        let events = sink.events();
        match &events[0] {
            ModelEvent::System {
                system_template,
                config: c,
                ..
            } => {
                assert_eq!(system_template, "be terse");
                assert_eq!(c.as_ref(), Some(&config));
            }
            other => panic!("Expected system event, got {:?}", other),
        }
        match &events[1] {
            ModelEvent::Prompt { payload, .. } => assert_eq!(
                payload,
                &RequestPayload::Messages {
                    messages: vec![ChatMessage::user("hi")]
                }
            ),
            other => panic!("Expected prompt event, got {:?}", other),
        }
        match &events[2] {
            ModelEvent::Response {
                execution_metadata, ..
            } => assert_eq!(execution_metadata.config.as_ref(), Some(&config)),
            other => panic!("Expected response event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_executions_do_not_interleave_per_call() {
        let (pipeline, sink) = pipeline();
        let ok = StubProvider::text("ok");
        let bad = StubProvider::failing("nope");

        let calls = (0..8).map(|i| {
            let pipeline = &pipeline;
            let provider: &dyn ModelProvider = if i % 2 == 0 { &ok } else { &bad };
            async move { pipeline.execute_text("p1", provider, "hi").await }
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
        assert_eq!(sink.events().len(), 24);

        let mut ids: Vec<_> = sink.events().iter().map(ModelEvent::execution_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        for id in ids {
            let kinds: Vec<_> = sink.events_for(id).iter().map(ModelEvent::kind).collect();
            assert_eq!(kinds.len(), 3);
            assert_eq!(kinds[0], EventKind::System);
            assert_eq!(kinds[1], EventKind::Prompt);
            assert!(matches!(kinds[2], EventKind::Response | EventKind::Error));
        }
    }
}
