//! The management server facade
//!
//! [`Server`] ties the model, the store, the optional device hook, the change
//! bus and the subscription registry together behind the four RPCs.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{GnmiError, GnmiResult};
use crate::events::ChangeEmitter;
use crate::get::execute_get;
use crate::hook::ConfigHook;
use crate::model::{ConfigRoot, Model};
use crate::read::ReadResolver;
use crate::set::execute_set;
use crate::store::ConfigStore;
use crate::subscribe::{self, spawn_broadcaster, SubscribeStream, SubscriptionRegistry};
use crate::types::{
    CapabilityResponse, Encoding, GetRequest, GetResponse, ModelData, SetRequest, SetResponse,
    SubscriptionList,
};

pub const GNMI_VERSION: &str = "0.7.0";

pub const SUPPORTED_ENCODINGS: [Encoding; 2] = [Encoding::Json, Encoding::JsonIetf];

pub struct Server {
    model: Arc<Model>,
    store: Arc<ConfigStore>,
    hook: Option<Arc<dyn ConfigHook>>,
    emitter: ChangeEmitter,
    registry: Arc<SubscriptionRegistry>,
    resolver: ReadResolver,
    config: EngineConfig,
}

impl Server {
    /// Build a server around `initial` and start its broadcaster task.
    /// Must be called from within a tokio runtime.
    pub fn new(model: Model, initial: ConfigRoot, config: EngineConfig) -> Self {
        let model = Arc::new(model);
        let store = Arc::new(ConfigStore::new(initial));
        let resolver = ReadResolver::new(model.clone(), store.clone());
        let registry = Arc::new(SubscriptionRegistry::new());
        let (emitter, events) = ChangeEmitter::new();
        spawn_broadcaster(events, registry.clone(), resolver.clone());
        info!(
            models = model.model_data().len(),
            buffer = config.subscription_buffer,
            "gnmi server ready"
        );
        Self {
            model,
            store,
            hook: None,
            emitter,
            registry,
            resolver,
            config,
        }
    }

    /// Attach the device hook run by every Set.
    pub fn with_hook(mut self, hook: Arc<dyn ConfigHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The current authoritative configuration.
    pub async fn config(&self) -> Arc<ConfigRoot> {
        self.store.snapshot().await
    }

    /// Paths that currently have STREAM subscribers.
    pub fn registered_paths(&self) -> Vec<String> {
        self.registry.paths()
    }

    /// (emitted, dropped) change events so far.
    pub fn change_stats(&self) -> (u64, u64) {
        self.emitter.stats()
    }

    pub fn capabilities(&self) -> CapabilityResponse {
        CapabilityResponse {
            supported_models: self.model.model_data().to_vec(),
            supported_encodings: SUPPORTED_ENCODINGS.to_vec(),
            gnmi_version: self.config.gnmi_version.clone(),
        }
    }

    pub async fn get(&self, req: &GetRequest) -> GnmiResult<GetResponse> {
        self.check_encoding_and_models(req.encoding, &req.use_models)?;
        let root = self.store.snapshot().await;
        execute_get(&self.model, &root, req)
    }

    pub async fn set(&self, req: &SetRequest) -> GnmiResult<SetResponse> {
        execute_set(
            &self.model,
            &self.store,
            self.hook.as_deref(),
            &self.emitter,
            req,
        )
        .await
    }

    pub async fn subscribe(&self, list: &SubscriptionList) -> GnmiResult<SubscribeStream> {
        self.check_encoding_and_models(list.encoding, &list.use_models)?;
        Ok(subscribe::start(
            list,
            self.resolver.clone(),
            self.registry.clone(),
            self.config.subscription_buffer,
        )
        .await)
    }

    fn check_encoding_and_models(
        &self,
        encoding: Encoding,
        models: &[ModelData],
    ) -> GnmiResult<()> {
        if !SUPPORTED_ENCODINGS.contains(&encoding) {
            return Err(GnmiError::invalid_argument(format!(
                "unsupported encoding: {encoding:?}"
            )));
        }
        for model in models {
            if !self.model.supports(model) {
                debug!(model = %model.name, "requested model is not supported");
                return Err(GnmiError::invalid_argument(format!(
                    "unsupported model: {} {} {}",
                    model.name, model.organization, model.version
                )));
            }
        }
        Ok(())
    }
}
