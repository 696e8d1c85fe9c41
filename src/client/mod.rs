//! The client core: chat and embedding calls over both execution paths
//!
//! An [`LlmClient`] is built once (configuration, providers and transports are
//! resolved at construction) and then serves any number of independent calls.
//! Every outbound request runs under the same [`RetryPolicy`]. Once the retry
//! budget is spent the failure is logged with the model id and, depending on
//! [`FailureMode`], either absorbed into `Ok(None)` or returned as
//! [`LlmError::Exhausted`].
//!
//! `Ok(None)` also means "no content": empty choices, a null message, or zero
//! embedding vectors.

use crate::chat::{validate_messages, ChatOptions, ChatRequest, Message};
use crate::config::{FailureMode, LlmConfig};
use crate::embedding::{self, EmbedOptions, Embedding, EmbeddingInput, EmbeddingRequest};
use crate::error::{LlmError, Result, TransportError};
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::transport::{provider, TransportPair};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resilient chat and embedding client
#[derive(Clone)]
pub struct LlmClient {
    config: Arc<LlmConfig>,
    model: String,
    chat: TransportPair,
    embeddings: TransportPair,
    retry: RetryPolicy,
}

impl LlmClient {
    /// Validate the configuration and build HTTP transports for it
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;

        let proxy_url = config.proxy_url.as_deref();
        let chat = TransportPair::http(provider::from_config(&config)?, proxy_url)?;

        let embeddings = match &config.embedding_service {
            Some(service) => {
                info!(
                    endpoint = %service.endpoint,
                    deployment = %service.deployment,
                    "Using dedicated embedding service"
                );
                TransportPair::http(provider::embedding_service(service)?, proxy_url)?
            }
            None => chat.clone(),
        };

        Ok(Self::assemble(config, chat, embeddings))
    }

    /// Resolve configuration from the environment and build a client
    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env()?)
    }

    /// Build a client over caller-supplied transports
    pub fn with_transports(
        config: LlmConfig,
        chat: TransportPair,
        embeddings: TransportPair,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, chat, embeddings))
    }

    fn assemble(config: LlmConfig, chat: TransportPair, embeddings: TransportPair) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);

        info!(
            backend = ?config.backend,
            model = %config.model,
            embedding_model = %config.embedding_model,
            max_attempts = retry.max_attempts(),
            "Initialized LLM client"
        );

        Self {
            model: config.model.clone(),
            config: Arc::new(config),
            chat,
            embeddings,
            retry,
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// A client sharing these transports but defaulting to another model
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// The configured cheap model, or this client when none is set
    pub fn cheap(&self) -> Self {
        match &self.config.cheap_model {
            Some(model) => self.for_model(model.clone()),
            None => self.clone(),
        }
    }

    /// Default chat model
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn timeout(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or_else(|| self.config.request_timeout())
    }

    /// Blocking chat completion returning the first candidate's text
    pub fn respond(&self, messages: &[Message], options: &ChatOptions) -> Result<Option<String>> {
        validate_messages(messages)?;

        let request = ChatRequest::new(&self.model, messages, options);
        let timeout = self.timeout(options.timeout);
        let transport = &self.chat.blocking;
        let req = &request;

        match self.retry.run_blocking(move |_| transport.send_chat(req, timeout)) {
            Ok(response) => Ok(response.first_text()),
            Err(exhausted) => self.give_up("chat", &request.model, exhausted),
        }
    }

    /// Non-blocking chat completion returning the first candidate's text
    pub async fn respond_async(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<Option<String>> {
        validate_messages(messages)?;

        let request = ChatRequest::new(&self.model, messages, options);
        let timeout = self.timeout(options.timeout);
        let transport = &self.chat.non_blocking;
        let req = &request;

        match self.retry.run(move |_| transport.send_chat(req, timeout)).await {
            Ok(response) => Ok(response.first_text()),
            Err(exhausted) => {
                // Keeps callers that re-invoke on `None` from spinning
                tokio::time::sleep(self.config.retry.failure_pause()).await;
                self.give_up("chat", &request.model, exhausted)
            }
        }
    }

    /// Blocking embedding of one text or a batch, chunked by [`embedding::MAX_BATCH_SIZE`]
    pub fn embed(
        &self,
        input: impl Into<EmbeddingInput>,
        options: &EmbedOptions,
    ) -> Result<Option<Embedding>> {
        let (model, requests) = self.plan_embedding(input.into(), options);
        let timeout = self.timeout(options.timeout);
        let transport = &self.embeddings.blocking;

        let mut vectors = Vec::new();
        for request in &requests {
            match self.retry.run_blocking(move |_| transport.send_embedding(request, timeout)) {
                Ok(response) => vectors.extend(checked_vectors(request, response.into_vectors())),
                Err(exhausted) => return self.give_up("embedding", &model, exhausted),
            }
        }

        Ok(Embedding::from_vectors(vectors))
    }

    /// Non-blocking embedding with the same chunking and cardinality rules as [`Self::embed`]
    pub async fn embed_async(
        &self,
        input: impl Into<EmbeddingInput>,
        options: &EmbedOptions,
    ) -> Result<Option<Embedding>> {
        let (model, requests) = self.plan_embedding(input.into(), options);
        let timeout = self.timeout(options.timeout);
        let transport = &self.embeddings.non_blocking;

        let mut vectors = Vec::new();
        for request in &requests {
            match self.retry.run(move |_| transport.send_embedding(request, timeout)).await {
                Ok(response) => vectors.extend(checked_vectors(request, response.into_vectors())),
                Err(exhausted) => return self.give_up("embedding", &model, exhausted),
            }
        }

        Ok(Embedding::from_vectors(vectors))
    }

    /// Cosine similarity of two vectors
    pub fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> Result<f64> {
        embedding::cosine_similarity(a, b)
    }

    fn plan_embedding(
        &self,
        input: EmbeddingInput,
        options: &EmbedOptions,
    ) -> (String, Vec<EmbeddingRequest>) {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.embedding_model.clone());
        let texts = input.len();
        let requests = embedding::plan_requests(input, &model);

        if requests.len() > 1 {
            debug!(texts, chunks = requests.len(), "Splitting embedding batch");
        }

        (model, requests)
    }

    fn give_up<T>(
        &self,
        operation: &str,
        model: &str,
        exhausted: RetryExhausted<TransportError>,
    ) -> Result<Option<T>> {
        error!(
            model,
            attempts = exhausted.attempts,
            error = %exhausted.last_error,
            "get {} {} response failed: {}",
            model,
            operation,
            exhausted.last_error
        );

        match self.config.retry.on_exhausted {
            FailureMode::Absorb => Ok(None),
            FailureMode::Propagate => Err(LlmError::Exhausted {
                model: model.to_string(),
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            }),
        }
    }
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("backend", &self.config.backend)
            .field("model", &self.model)
            .field("embedding_model", &self.config.embedding_model)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn checked_vectors(request: &EmbeddingRequest, vectors: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    if vectors.len() != request.input.len() {
        warn!(
            expected = request.input.len(),
            received = vectors.len(),
            "Embedding response size does not match request"
        );
    }
    vectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatResponse, Choice, ResponseMessage, Role};
    use crate::embedding::{EmbeddingData, EmbeddingResponse};
    use crate::transport::{AsyncTransport, BlockingTransport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts ERROR events and retry INFO events
    #[derive(Clone, Default)]
    struct LogCounter {
        errors: Arc<AtomicU32>,
        retries: Arc<AtomicU32>,
    }

    impl LogCounter {
        fn errors(&self) -> u32 {
            self.errors.load(Ordering::SeqCst)
        }

        fn retries(&self) -> u32 {
            self.retries.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: Subscriber> Layer<S> for LogCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let level = *event.metadata().level();
            if level == Level::ERROR {
                self.errors.fetch_add(1, Ordering::SeqCst);
            } else if level == Level::INFO {
                let mut visitor = MessageVisitor::default();
                event.record(&mut visitor);
                if visitor.0.starts_with("Retrying API call") {
                    self.retries.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    fn counted<T>(f: impl FnOnce() -> T) -> (T, LogCounter) {
        let counter = LogCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, counter)
    }

    /// Fails the first `failures` calls, then answers deterministically
    #[derive(Default)]
    struct MockTransport {
        failures: AtomicU32,
        calls: AtomicU32,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl MockTransport {
        fn failing(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicU32::new(failures),
                ..Self::default()
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }

        fn attempt(&self) -> std::result::Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(TransportError::Api {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn chat(&self, request: &ChatRequest) -> std::result::Result<ChatResponse, TransportError> {
            self.attempt()?;
            let choices = (0..request.n.max(1))
                .map(|i| Choice {
                    index: i as usize,
                    message: ResponseMessage {
                        role: Role::Assistant,
                        content: Some(format!("{}:{}", request.model, i)),
                    },
                    finish_reason: Some("stop".to_string()),
                })
                .collect();
            Ok(ChatResponse { choices, model: Some(request.model.clone()), usage: None })
        }

        fn embedding(
            &self,
            request: &EmbeddingRequest,
        ) -> std::result::Result<EmbeddingResponse, TransportError> {
            self.attempt()?;
            let texts = match &request.input {
                EmbeddingInput::Single(text) => vec![text.clone()],
                EmbeddingInput::Batch(texts) => texts.clone(),
            };
            self.batches.lock().unwrap().push(texts.clone());
            let data = texts
                .iter()
                .enumerate()
                .map(|(index, text)| EmbeddingData {
                    embedding: fake_vector(text),
                    index,
                    object: "embedding".to_string(),
                })
                .collect();
            Ok(EmbeddingResponse { data, model: Some(request.model.clone()), usage: None })
        }
    }

    fn fake_vector(text: &str) -> Vec<f32> {
        vec![text.len() as f32, text.bytes().map(f32::from).sum(), 1.0]
    }

    impl BlockingTransport for MockTransport {
        fn send_chat(
            &self,
            request: &ChatRequest,
            _: Duration,
        ) -> std::result::Result<ChatResponse, TransportError> {
            self.chat(request)
        }

        fn send_embedding(
            &self,
            request: &EmbeddingRequest,
            _: Duration,
        ) -> std::result::Result<EmbeddingResponse, TransportError> {
            self.embedding(request)
        }
    }

    #[async_trait]
    impl AsyncTransport for MockTransport {
        async fn send_chat(
            &self,
            request: &ChatRequest,
            _: Duration,
        ) -> std::result::Result<ChatResponse, TransportError> {
            self.chat(request)
        }

        async fn send_embedding(
            &self,
            request: &EmbeddingRequest,
            _: Duration,
        ) -> std::result::Result<EmbeddingResponse, TransportError> {
            self.embedding(request)
        }
    }

    fn test_config() -> LlmConfig {
        let mut config = LlmConfig::openai("sk-test");
        config.model = "test-model".to_string();
        config.cheap_model = Some("cheap-model".to_string());
        config.retry.wait_secs = 0;
        config.retry.failure_pause_ms = 0;
        config
    }

    fn client_with(mock: Arc<MockTransport>, config: LlmConfig) -> (LlmClient, Arc<AtomicU32>) {
        let retries = Arc::new(AtomicU32::new(0));
        let counter = retries.clone();
        let policy = RetryPolicy::from_config(&config.retry).with_on_retry(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let pair = TransportPair::shared(mock);
        let client = LlmClient::with_transports(config, pair.clone(), pair)
            .unwrap()
            .with_retry_policy(policy);
        (client, retries)
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("idea number {}", i)).collect()
    }

    #[test]
    fn test_respond_returns_first_candidate() {
        let mock = MockTransport::failing(0);
        let (client, retries) = client_with(mock.clone(), test_config());

        let text = client
            .respond(&[Message::user("hi")], &ChatOptions::new().with_n(3))
            .unwrap();

        assert_eq!(text.as_deref(), Some("test-model:0"));
        assert_eq!(mock.calls(), 1);
        assert_eq!(retries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_respond_retries_k_times_then_succeeds() {
        let mock = MockTransport::failing(4);
        let (client, retries) = client_with(mock.clone(), test_config());

        let text = client.respond(&[Message::user("hi")], &ChatOptions::new()).unwrap();

        assert_eq!(text.as_deref(), Some("test-model:0"));
        assert_eq!(mock.calls(), 5);
        assert_eq!(retries.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_respond_absorbs_exhaustion() {
        let mock = MockTransport::failing(u32::MAX);
        let (client, _) = client_with(mock.clone(), test_config());

        let text = client.respond(&[Message::user("hi")], &ChatOptions::new()).unwrap();

        assert_eq!(text, None);
        assert_eq!(mock.calls(), 10);
    }

    #[test]
    fn test_respond_propagates_when_configured() {
        let mut config = test_config();
        config.retry.on_exhausted = FailureMode::Propagate;
        let mock = MockTransport::failing(u32::MAX);
        let (client, _) = client_with(mock, config);

        let err = client
            .respond(&[Message::user("hi")], &ChatOptions::new().with_model("other"))
            .unwrap_err();

        match err {
            LlmError::Exhausted { model, attempts, .. } => {
                assert_eq!(model, "other");
                assert_eq!(attempts, 10);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_respond_rejects_empty_messages_without_calling() {
        let mock = MockTransport::failing(0);
        let (client, _) = client_with(mock.clone(), test_config());

        assert!(matches!(
            client.respond(&[], &ChatOptions::new()),
            Err(LlmError::InvalidInput(_))
        ));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn test_cheap_client_shares_transport() {
        let mock = MockTransport::failing(0);
        let (client, _) = client_with(mock.clone(), test_config());

        let cheap = client.cheap();
        let text = cheap.respond(&[Message::user("hi")], &ChatOptions::new()).unwrap();

        assert_eq!(cheap.model(), "cheap-model");
        assert_eq!(client.model(), "test-model");
        assert_eq!(text.as_deref(), Some("cheap-model:0"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_respond_async_matches_blocking() {
        let mock = MockTransport::failing(2);
        let (client, retries) = client_with(mock.clone(), test_config());

        let text = client
            .respond_async(&[Message::user("hi")], &ChatOptions::new())
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("test-model:0"));
        assert_eq!(mock.calls(), 3);
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_respond_async_pauses_before_giving_up() {
        let mut config = test_config();
        config.retry.max_attempts = 2;
        config.retry.failure_pause_ms = 100;
        let mock = MockTransport::failing(u32::MAX);
        let (client, _) = client_with(mock.clone(), config);
        let started = tokio::time::Instant::now();

        let text = client
            .respond_async(&[Message::user("hi")], &ChatOptions::new())
            .await
            .unwrap();

        assert_eq!(text, None);
        assert_eq!(mock.calls(), 2);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_embed_cardinality() {
        let mock = MockTransport::failing(0);
        let (client, _) = client_with(mock.clone(), test_config());
        let options = EmbedOptions::new();

        assert_eq!(client.embed(texts(0), &options).unwrap(), None);
        assert_eq!(mock.calls(), 0);

        assert_eq!(
            client.embed("solo", &options).unwrap(),
            Some(Embedding::Single(fake_vector("solo")))
        );
        assert_eq!(
            client.embed(texts(1), &options).unwrap(),
            Some(Embedding::Single(fake_vector("idea number 0")))
        );

        for n in [2, 10, 11, 25] {
            match client.embed(texts(n), &options).unwrap() {
                Some(Embedding::Batch(vectors)) => {
                    let expected: Vec<Vec<f32>> = texts(n).iter().map(|t| fake_vector(t)).collect();
                    assert_eq!(vectors, expected);
                }
                other => panic!("expected {} vectors, got {:?}", n, other),
            }
        }
    }

    #[test]
    fn test_embed_chunks_in_order() {
        let mock = MockTransport::failing(0);
        let (client, _) = client_with(mock.clone(), test_config());

        let embedding = client.embed(texts(23), &EmbedOptions::new()).unwrap().unwrap();

        assert_eq!(mock.batch_sizes(), vec![10, 10, 3]);
        assert_eq!(mock.batches.lock().unwrap().concat(), texts(23));
        assert_eq!(embedding.len(), 23);
    }

    #[test]
    fn test_embed_retries_per_chunk() {
        let mock = MockTransport::failing(1);
        let (client, retries) = client_with(mock.clone(), test_config());

        let embedding = client.embed(texts(15), &EmbedOptions::new()).unwrap().unwrap();

        assert_eq!(embedding.len(), 15);
        assert_eq!(mock.batch_sizes(), vec![10, 5]);
        assert_eq!(mock.calls(), 3);
        assert_eq!(retries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_embed_async_chunks_like_blocking() {
        let mock = MockTransport::failing(0);
        let (client, _) = client_with(mock.clone(), test_config());

        let embedding = client.embed_async(texts(25), &EmbedOptions::new()).await.unwrap().unwrap();

        assert_eq!(mock.batch_sizes(), vec![10, 10, 5]);
        assert_eq!(embedding.into_vectors().len(), 25);
    }

    #[tokio::test]
    async fn test_embed_async_absorbs_exhaustion() {
        let mock = MockTransport::failing(u32::MAX);
        let (client, _) = client_with(mock.clone(), test_config());

        assert_eq!(client.embed_async("text", &EmbedOptions::new()).await.unwrap(), None);
        assert_eq!(mock.calls(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_async_calls() {
        let mock = MockTransport::failing(0);
        let (client, _) = client_with(mock.clone(), test_config());
        let messages = [Message::user("hi")];
        let options = ChatOptions::new();

        let calls = (0..5).map(|_| client.respond_async(&messages, &options));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));
        assert_eq!(mock.calls(), 5);
    }

    #[test]
    fn test_construction_fails_fast_for_azure_without_key() {
        let mock = MockTransport::failing(0);
        let pair = TransportPair::shared(mock.clone());

        let config = LlmConfig::azure("https://res.openai.azure.com", "");
        let err = LlmClient::with_transports(config, pair.clone(), pair).unwrap_err();

        assert!(matches!(err, LlmError::Config(_)));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn test_cosine_similarity_delegates() {
        let (client, _) = client_with(MockTransport::failing(0), test_config());

        assert!((client.cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exhausted_call_logs_each_retry_and_one_error() {
        let mock = MockTransport::failing(u32::MAX);
        let (client, _) = client_with(mock.clone(), test_config());

        let (text, logs) = counted(|| client.respond(&[Message::user("hi")], &ChatOptions::new()));

        assert_eq!(text.unwrap(), None);
        assert_eq!(mock.calls(), 10);
        assert_eq!(logs.retries(), 9);
        assert_eq!(logs.errors(), 1);
    }

    #[test]
    fn test_recovered_call_logs_k_retries_and_no_error() {
        let mock = MockTransport::failing(4);
        let (client, _) = client_with(mock.clone(), test_config());

        let (embedding, logs) = counted(|| client.embed("text", &EmbedOptions::new()));

        assert!(embedding.unwrap().is_some());
        assert_eq!(logs.retries(), 4);
        assert_eq!(logs.errors(), 0);
    }

    #[tokio::test]
    async fn test_async_exhaustion_logs_one_error() {
        let mock = MockTransport::failing(u32::MAX);
        let (client, _) = client_with(mock.clone(), test_config());
        let logs = LogCounter::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));

        let text = client.respond_async(&[Message::user("hi")], &ChatOptions::new()).await;

        assert_eq!(text.unwrap(), None);
        assert_eq!(logs.retries(), 9);
        assert_eq!(logs.errors(), 1);
    }
}
