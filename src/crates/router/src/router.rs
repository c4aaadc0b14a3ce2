//! The routing orchestrator.
//!
//! A route runs resolve, validate, fetch, chunk, render, dispatch, aggregate
//! and assemble, in that order. Resolve and validate never touch the network,
//! so unknown names and bad configs cost nothing. Fetch and dispatch errors
//! end the route; nothing is retried here.

use crate::aggregator::ResultAggregator;
use crate::chunking::{ChunkingConfig, ChunkingEngine};
use crate::config::{RouterConfig, RouterFile};
use crate::error::{Result, RouterError, Stage};
use crate::registry::{BindingEntry, DataSourceBinding, Registry, RuleDefinition};
use crate::response::{RouteContext, RouteResponse, Usage};
use datasource::{SourceKind, StoreConfig};
use futures::stream::{self, StreamExt};
use llm::{ModelConfig, ModelProvider, SegmentResult};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Providers that can be built from an API key, with their key variables.
const KEYED_PROVIDERS: [(&str, &[&str], &str); 3] = [
    ("openai", &["openai"], "OPENAI_API_KEY"),
    ("anthropic", &["anthropic", "claude"], "ANTHROPIC_API_KEY"),
    ("gemini", &["gemini", "google"], "GEMINI_API_KEY"),
];

/// Routes queries from registered data sources through registered rules.
pub struct Router {
    config: RouterConfig,
    bindings: Registry<BindingEntry>,
    rules: Registry<RuleDefinition>,
    providers: Registry<dyn ModelProvider>,
    chunker: ChunkingEngine,
    aggregator: ResultAggregator,
}

impl Router {
    /// Create a router, building a provider for every API key found in the
    /// config or the environment.
    pub fn new(config: RouterConfig) -> Result<Self> {
        let router = Self::without_providers(config)?;

        for (name, aliases, env_var) in KEYED_PROVIDERS {
            let from_config = aliases.iter().find_map(|alias| {
                router
                    .config
                    .api_keys
                    .get(*alias)
                    .filter(|key| !key.trim().is_empty())
                    .cloned()
            });
            let key = from_config.or_else(|| {
                std::env::var(env_var)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            });

            if let Some(key) = key {
                let provider = llm::create_provider(name, &key)
                    .map_err(|e| RouterError::InvalidConfig(format!("provider {}: {}", name, e)))?;
                for alias in aliases.iter() {
                    router.providers.register(*alias, provider.clone());
                }
                debug!(provider = name, "model provider configured");
            }
        }

        Ok(router)
    }

    /// Create a router with no model providers; register them explicitly.
    pub fn without_providers(config: RouterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bindings: Registry::new("binding"),
            rules: Registry::new("rule"),
            providers: Registry::new("provider"),
            chunker: ChunkingEngine::default(),
            aggregator: ResultAggregator::new(),
        })
    }

    /// Create a router from a loaded file and register its bindings and rules.
    pub fn from_file(file: RouterFile) -> Result<Self> {
        let router = Self::new(file.router)?;
        for binding in file.bindings {
            router.register_binding(binding.label, binding.source_kind, binding.store_config);
        }
        for rule in file.rules {
            router.register_rule(rule.name, rule.model_config, rule.chunking_config)?;
        }
        info!(
            bindings = router.bindings.len(),
            rules = router.rules.len(),
            providers = router.providers.len(),
            "router loaded"
        );
        Ok(router)
    }

    /// Replace the chunking engine, e.g. to force the fixed-ratio estimator.
    pub fn with_chunking_engine(mut self, chunker: ChunkingEngine) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register a data source binding, replacing any binding with the same
    /// label. The store config is checked against `source_kind` when routed.
    /// A connected adapter of the replaced binding is closed in the
    /// background.
    pub fn register_binding(
        &self,
        label: impl Into<String>,
        source_kind: SourceKind,
        store_config: StoreConfig,
    ) {
        let label = label.into();
        debug!(binding = %label, kind = %source_kind, "registering binding");
        let entry = BindingEntry::new(DataSourceBinding {
            label: label.clone(),
            source_kind,
            store_config,
        });
        if let Some(displaced) = self.bindings.register(label, Arc::new(entry)) {
            close_in_background(displaced);
        }
    }

    /// Register a rule, replacing any rule with the same name. Without a
    /// chunking config the router defaults apply.
    pub fn register_rule(
        &self,
        name: impl Into<String>,
        model_config: ModelConfig,
        chunking_config: Option<ChunkingConfig>,
    ) -> Result<()> {
        let name = name.into();
        let chunking_config = chunking_config.unwrap_or_else(|| self.config.default_chunking());
        chunking_config.validate()?;

        debug!(rule = %name, provider = %model_config.provider, model = %model_config.model, "registering rule");
        self.rules.register(
            name.clone(),
            Arc::new(RuleDefinition {
                name,
                model_config,
                chunking_config,
            }),
        );
        Ok(())
    }

    /// Register a model provider under `name` (matched case-insensitively
    /// against `ModelConfig::provider`).
    pub fn register_provider(&self, name: impl Into<String>, provider: Arc<dyn ModelProvider>) {
        let name = name.into().to_lowercase();
        debug!(provider = %name, "registering model provider");
        self.providers.register(name, provider);
    }

    pub fn bindings(&self) -> Vec<DataSourceBinding> {
        self.bindings
            .entries()
            .into_iter()
            .map(|(_, entry)| entry.binding.clone())
            .collect()
    }

    pub fn rules(&self) -> Vec<RuleDefinition> {
        self.rules
            .entries()
            .into_iter()
            .map(|(_, rule)| (*rule).clone())
            .collect()
    }

    pub fn providers(&self) -> Vec<String> {
        self.providers.names()
    }

    /// Remove a binding and close its adapter if it was connected.
    pub async fn remove_binding(&self, label: &str) -> Option<DataSourceBinding> {
        let entry = self.bindings.remove(label)?;
        close_entry(&entry).await;
        Some(entry.binding.clone())
    }

    pub fn remove_rule(&self, name: &str) -> Option<RuleDefinition> {
        self.rules.remove(name).map(|rule| (*rule).clone())
    }

    /// Close every connected adapter. Bindings stay registered and reconnect
    /// on their next route.
    pub async fn close(&self) {
        for (label, entry) in self.bindings.entries() {
            if !entry.source.initialized() {
                continue;
            }
            let fresh = Arc::new(BindingEntry::new(entry.binding.clone()));
            // A label re-registered or removed meanwhile already closed its
            // old adapter.
            if self.bindings.replace_if_current(&label, &entry, fresh) {
                close_entry(&entry).await;
            }
        }
    }

    /// Route `query` from a binding through a rule.
    pub async fn route(
        &self,
        binding_label: &str,
        query: &str,
        rule_name: &str,
        metadata: Option<Value>,
    ) -> Result<RouteResponse> {
        self.route_with_cancel(
            binding_label,
            query,
            rule_name,
            metadata,
            CancellationToken::new(),
        )
        .await
    }

    /// Route with a cancellation token that interrupts fetch and dispatch.
    pub async fn route_with_cancel(
        &self,
        binding_label: &str,
        query: &str,
        rule_name: &str,
        metadata: Option<Value>,
        cancel: CancellationToken,
    ) -> Result<RouteResponse> {
        // Resolve
        let entry = self.bindings.get(binding_label)?;
        let rule = self.rules.get(rule_name)?;
        let provider = self.resolve_provider(&rule.model_config)?;

        // Validate
        let binding = &entry.binding;
        binding
            .store_config
            .validate_for(binding.source_kind)
            .map_err(|e| RouterError::InvalidConfig(e.to_string()))?;
        rule.chunking_config.validate()?;

        // Fetch
        let text = self.fetch(&entry, query, &cancel).await?;

        // Chunk and render
        let segments = self.chunker.chunk(&text, &rule.chunking_config)?;
        let prompts: Vec<String> = segments
            .iter()
            .map(|segment| self.config.render_prompt(segment))
            .collect();

        // Dispatch
        let system_prompt = self.config.effective_system_prompt(&rule.model_config);
        let results = self
            .dispatch(provider, &rule.model_config, prompts, system_prompt, &cancel)
            .await?;

        // Aggregate and assemble
        let aggregation = rule.chunking_config.aggregation;
        let result = self.aggregator.aggregate(&results, aggregation);
        let response = RouteResponse::assemble(
            RouteContext {
                binding_label,
                rule_name,
                model: &rule.model_config.model,
                provider: &rule.model_config.provider,
                aggregation,
                request_metadata: metadata,
            },
            result,
            results,
        );

        info!(
            binding = binding_label,
            rule = rule_name,
            segments = response.metadata.segment_count,
            tokens = response.metadata.total_tokens,
            cost_usd = response.metadata.total_cost_usd,
            latency_ms = response.metadata.total_latency_ms,
            "route completed"
        );
        Ok(response)
    }

    fn resolve_provider(&self, model_config: &ModelConfig) -> Result<Arc<dyn ModelProvider>> {
        self.providers.get(&model_config.provider.to_lowercase())
    }

    async fn fetch(
        &self,
        entry: &BindingEntry,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let binding = &entry.binding;
        let fetch = async {
            let source = entry
                .source
                .get_or_try_init(|| datasource::connect(binding.source_kind, &binding.store_config))
                .await
                .map_err(|e| {
                    if e.is_config_error() {
                        RouterError::InvalidConfig(e.to_string())
                    } else {
                        RouterError::SourceFetchFailed {
                            binding: binding.label.clone(),
                            source: e,
                        }
                    }
                })?;

            source
                .fetch(query)
                .await
                .map_err(|e| RouterError::SourceFetchFailed {
                    binding: binding.label.clone(),
                    source: e,
                })
        };

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RouterError::Cancelled { stage: Stage::Fetch }),
            text = fetch => text?,
        };

        debug!(binding = %binding.label, chars = text.len(), "content fetched");
        Ok(text)
    }

    /// Call the provider once per prompt, at most `max_concurrency` at a
    /// time, and return results in prompt order.
    ///
    /// The first failure drops the stream, which cancels queued and
    /// in-flight calls.
    async fn dispatch(
        &self,
        provider: Arc<dyn ModelProvider>,
        model_config: &ModelConfig,
        prompts: Vec<String>,
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SegmentResult>> {
        let total = prompts.len();
        let limit = self.config.max_concurrency.max(1);
        debug!(segments = total, concurrency = limit, provider = provider.name(), "dispatching segments");

        let mut calls = stream::iter(prompts.into_iter().enumerate())
            .map(|(index, prompt)| {
                let provider = provider.clone();
                async move {
                    let result = provider
                        .call(&prompt, model_config, Some(system_prompt))
                        .await;
                    (index, result)
                }
            })
            .buffer_unordered(limit);

        let mut slots: Vec<Option<SegmentResult>> = (0..total).map(|_| None).collect();
        let mut spent = Usage::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log_partial_spend(&spent, total, "route cancelled");
                    return Err(RouterError::Cancelled { stage: Stage::Dispatch });
                }
                next = calls.next() => next,
            };

            match next {
                Some((index, Ok(result))) => {
                    debug!(
                        segment = index,
                        tokens = result.tokens_used,
                        latency_ms = result.latency_ms,
                        "segment completed"
                    );
                    spent.add(&result);
                    slots[index] = Some(result);
                }
                Some((index, Err(source))) => {
                    warn!(segment = index, error = %source, "model call failed");
                    log_partial_spend(&spent, total, "model call failed");
                    return Err(RouterError::ModelCallFailed {
                        segment: index,
                        source,
                    });
                }
                None => break,
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Completed calls are billed even though the route produced no response.
fn log_partial_spend(spent: &Usage, total: usize, reason: &str) {
    if spent.segments == 0 {
        return;
    }
    warn!(
        completed = spent.segments,
        total,
        tokens = spent.tokens,
        cost_usd = spent.cost_usd,
        "{}; partial spend not returned",
        reason
    );
}

async fn close_entry(entry: &BindingEntry) {
    if let Some(source) = entry.source.get() {
        if let Err(e) = source.close().await {
            warn!(binding = %entry.binding.label, error = %e, "failed to close data source");
        }
    }
}

fn close_in_background(entry: Arc<BindingEntry>) {
    if !entry.source.initialized() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { close_entry(&entry).await });
        }
        Err(_) => warn!(
            binding = %entry.binding.label,
            "no async runtime; replaced data source left open"
        ),
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("bindings", &self.bindings.names())
            .field("rules", &self.rules.names())
            .field("providers", &self.providers.names())
            .finish()
    }
}
