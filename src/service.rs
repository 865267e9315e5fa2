//! The completion service: one request in, final text out.
//!
//! [`CompletionService`] is the seam between the pipeline and whatever model
//! backend runs a stage. [`LlmCompletionService`] implements it over
//! `edgequake-llm` providers. When a stage offers tools it runs the tool loop
//! itself: ask the model, execute any tool calls it makes, feed the results
//! back, and repeat until the model answers without calling a tool. From the
//! pipeline's point of view the loop is invisible; the stage only sees the
//! final text.
//!
//! The service performs no retries. Each request is bounded by the client
//! timeout (`api_timeout_secs`).

use crate::config::ArticleConfig;
use crate::error::{ArticleError, ServiceError};
use crate::tools::ToolSet;
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, LLMProvider, ProviderFactory, ToolChoice, ToolDefinition,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the service needs to run one stage on one payload.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Stage name, for logs.
    pub stage: &'a str,
    pub model: &'a str,
    pub instructions: &'a str,
    /// Sent as the single user message.
    pub message: &'a str,
    pub tools: &'a ToolSet,
}

/// Runs a completion and returns the final message content.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ServiceError>;
}

/// [`CompletionService`] backed by `edgequake-llm` providers, one per model.
pub struct LlmCompletionService {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
    temperature: f32,
    max_tokens: usize,
    max_tool_rounds: usize,
    timeout: Duration,
}

impl std::fmt::Debug for LlmCompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut models: Vec<&String> = self.providers.keys().collect();
        models.sort();
        f.debug_struct("LlmCompletionService")
            .field("models", &models)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmCompletionService {
    pub fn new(temperature: f32, max_tokens: usize, max_tool_rounds: usize, timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            temperature,
            max_tokens,
            max_tool_rounds,
            timeout,
        }
    }

    /// Register the provider that serves `model`.
    pub fn with_provider(mut self, model: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        self.providers.insert(model.into(), provider);
        self
    }

    /// Build a provider for every model in `models`.
    ///
    /// Runs at startup, so a missing API key or unknown provider surfaces as
    /// a configuration error before any content is fetched. Providers are
    /// built without a network round trip, so a model id the endpoint does
    /// not serve is only caught here if the caller listed models first
    /// ([`crate::ModelCatalog::ensure_model_available`]).
    pub fn from_config<'a>(
        config: &ArticleConfig,
        models: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ArticleError> {
        let mut service = Self::new(
            config.temperature,
            config.max_tokens,
            config.max_tool_rounds,
            Duration::from_secs(config.api_timeout_secs),
        );
        for model in models {
            if service.providers.contains_key(model) {
                continue;
            }
            let provider = resolve_provider(config, model)?;
            info!("Provider ready for model '{}'", model);
            service.providers.insert(model.to_string(), provider);
        }
        Ok(service)
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    /// Bound a provider call by the client timeout and map its error.
    async fn timed<T, E, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, E>> + Send,
        E: Display,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ServiceError::Timeout {
                secs: self.timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(ServiceError::Api {
                message: e.to_string(),
            }),
            Ok(Ok(v)) => Ok(v),
        }
    }

    async fn complete_with_tools(
        &self,
        provider: &Arc<dyn LLMProvider>,
        mut messages: Vec<ChatMessage>,
        request: CompletionRequest<'_>,
    ) -> Result<String, ServiceError> {
        let definitions: Vec<ToolDefinition> = request
            .tools
            .iter()
            .map(|t| ToolDefinition::function(t.name(), t.description(), t.parameters()))
            .collect();
        let options = self.options();

        let mut rounds = 0usize;
        loop {
            let response = self
                .timed(provider.chat_with_tools(
                    &messages,
                    &definitions,
                    Some(ToolChoice::auto()),
                    Some(&options),
                ))
                .await?;

            debug!(
                "{}: {} input tokens, {} output tokens, {} tool calls",
                request.stage,
                response.prompt_tokens,
                response.completion_tokens,
                response.tool_calls.len()
            );

            if response.tool_calls.is_empty() {
                return Ok(response.content);
            }
            if rounds >= self.max_tool_rounds {
                return Err(ServiceError::ToolRoundsExceeded { rounds });
            }
            rounds += 1;

            messages.push(ChatMessage::assistant_with_tools(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let result = request
                    .tools
                    .invoke(&call.function.name, &call.function.arguments)
                    .await;
                let output = tool_reply(request.stage, result)?;
                messages.push(ChatMessage::tool_result(call.id.clone(), output));
            }
        }
    }
}

/// The tool message for one call. An unknown tool aborts the stage; any
/// other tool failure goes back to the model so it can adjust its arguments.
fn tool_reply(stage: &str, result: Result<String, ServiceError>) -> Result<String, ServiceError> {
    match result {
        Ok(text) => Ok(text),
        Err(e @ ServiceError::UnknownTool { .. }) => Err(e),
        Err(e) => {
            warn!("{}: {}", stage, e);
            Ok(format!("error: {e}"))
        }
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ServiceError> {
        let provider = self
            .providers
            .get(request.model)
            .ok_or_else(|| ServiceError::ModelNotConfigured {
                model: request.model.to_string(),
            })?;

        let messages = vec![
            ChatMessage::system(request.instructions),
            ChatMessage::user(request.message),
        ];

        if request.tools.is_empty() {
            let response = self
                .timed(provider.chat(&messages, Some(&self.options())))
                .await?;
            debug!(
                "{}: {} input tokens, {} output tokens",
                request.stage, response.prompt_tokens, response.completion_tokens
            );
            return Ok(response.content);
        }

        self.complete_with_tools(provider, messages, request).await
    }
}

// ── Provider resolution ──────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ArticleError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ArticleError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the provider for `model`, from most to least specific:
///
/// 1. pre-built `config.provider`
/// 2. `config.provider_name`
/// 3. `EDGEQUAKE_LLM_PROVIDER`
/// 4. `OPENAI_API_KEY` → openai
/// 5. `ProviderFactory::from_env()` auto-detection
pub fn resolve_provider(
    config: &ArticleConfig,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ArticleError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let Ok(prov) = std::env::var("EDGEQUAKE_LLM_PROVIDER") {
        if !prov.is_empty() {
            return create_provider(&prov, model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ArticleError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use edgequake_llm::providers::MockAgentProvider;
    use edgequake_llm::{FunctionCall, ToolCall};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> LlmCompletionService {
        LlmCompletionService::new(0.3, 512, 2, Duration::from_millis(20))
    }

    /// Counts its calls; answers "42" or fails with a tool error.
    struct Lookup {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Lookup {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Tool for Lookup {
        fn name(&self) -> &str {
            "lookup"
        }
        fn description(&self) -> &str {
            "Look a fact up."
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn call(&self, _args: Value) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ServiceError::ToolFailed {
                    name: "lookup".into(),
                    detail: "backend down".into(),
                });
            }
            Ok("42".into())
        }
    }

    fn tool_call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: "{}".into(),
            },
        }
    }

    async fn run_with_tools(
        provider: &MockAgentProvider,
        tools: &ToolSet,
    ) -> Result<String, ServiceError> {
        LlmCompletionService::new(0.3, 512, 2, Duration::from_secs(5))
            .with_provider("mock-agent", Arc::new(provider.clone()))
            .complete(CompletionRequest {
                stage: "PDF Assistant",
                model: "mock-agent",
                instructions: "analyse",
                message: "text",
                tools,
            })
            .await
    }

    #[tokio::test]
    async fn tool_round_then_final_answer() {
        let lookup = Lookup::new(false);
        let tools = ToolSet::new().with(lookup.clone());
        let provider = MockAgentProvider::new();
        provider.add_tool_response_sync("", vec![tool_call("c1", "lookup")]);
        provider.add_response_sync("final");

        let out = run_with_tools(&provider, &tools).await.unwrap();

        assert_eq!(out, "final");
        assert_eq!(lookup.calls(), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_aborts_the_stage() {
        let lookup = Lookup::new(false);
        let tools = ToolSet::new().with(lookup.clone());
        let provider = MockAgentProvider::new();
        provider.add_tool_response_sync("", vec![tool_call("c1", "nope")]);
        provider.add_response_sync("never reached");

        let err = run_with_tools(&provider, &tools).await.unwrap_err();

        assert!(matches!(err, ServiceError::UnknownTool { ref name } if name == "nope"));
        assert_eq!(lookup.calls(), 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_rounds_are_capped() {
        let lookup = Lookup::new(false);
        let tools = ToolSet::new().with(lookup.clone());
        let provider = MockAgentProvider::new();
        for i in 0..3 {
            provider.add_tool_response_sync("", vec![tool_call(&format!("c{i}"), "lookup")]);
        }

        let err = run_with_tools(&provider, &tools).await.unwrap_err();

        assert!(matches!(err, ServiceError::ToolRoundsExceeded { rounds: 2 }));
        assert_eq!(lookup.calls(), 2);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_tool_is_reported_to_the_model() {
        let lookup = Lookup::new(true);
        let tools = ToolSet::new().with(lookup.clone());
        let provider = MockAgentProvider::new();
        provider.add_tool_response_sync("", vec![tool_call("c1", "lookup")]);
        provider.add_response_sync("answered without the tool");

        let out = run_with_tools(&provider, &tools).await.unwrap();

        assert_eq!(out, "answered without the tool");
        assert_eq!(lookup.calls(), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn tool_failures_become_error_replies() {
        let reply = tool_reply(
            "PDF Assistant",
            Err(ServiceError::ToolFailed {
                name: "lookup".into(),
                detail: "backend down".into(),
            }),
        )
        .unwrap();
        assert_eq!(reply, "error: Tool 'lookup' failed: backend down");

        assert_eq!(tool_reply("x", Ok("42".into())).unwrap(), "42");
        assert!(matches!(
            tool_reply("x", Err(ServiceError::UnknownTool { name: "nope".into() })),
            Err(ServiceError::UnknownTool { .. })
        ));
    }

    #[test]
    fn options_carry_temperature_and_max_tokens() {
        let opts = service().options();
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(512));
    }

    #[tokio::test]
    async fn unknown_model_is_reported() {
        let tools = ToolSet::new();
        let err = service()
            .complete(CompletionRequest {
                stage: "Writer Assistant",
                model: "nope-1",
                instructions: "write",
                message: "text",
                tools: &tools,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotConfigured { model } if model == "nope-1"));
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let err = service()
            .timed(std::future::pending::<Result<(), String>>())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Timeout { .. }));
    }

    #[tokio::test]
    async fn provider_errors_become_api_errors() {
        let err = service()
            .timed(async { Err::<(), _>("429 Too Many Requests") })
            .await
            .unwrap_err();
        match err {
            ServiceError::Api { message } => assert!(message.contains("429")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn debug_lists_models() {
        let dbg = format!("{:?}", service());
        assert!(dbg.contains("LlmCompletionService"));
        assert!(dbg.contains("max_tool_rounds: 2"));
    }
}
