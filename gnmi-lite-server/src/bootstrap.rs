//! Building a server from configuration files

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use gnmi_lite_core::{ConfigRoot, Model, Server};
use tracing::info;

use crate::config::ServerConfig;
use crate::hook::LoggingHook;

pub fn load_model(path: &Path) -> anyhow::Result<Model> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading model file {}", path.display()))?;
    let model = Model::from_json(&content)
        .with_context(|| format!("loading model from {}", path.display()))?;
    info!(
        path = %path.display(),
        models = model.model_data().len(),
        enums = model.enums().len(),
        "model loaded"
    );
    Ok(model)
}

/// Initial configuration, or an empty one when no file is configured.
pub fn load_initial_config(model: &Model, path: Option<&Path>) -> anyhow::Result<ConfigRoot> {
    let Some(path) = path else {
        return Ok(model.empty_root());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("reading initial config {}", path.display()))?;
    let root = model
        .new_root(&bytes)
        .with_context(|| format!("validating initial config {}", path.display()))?;
    info!(path = %path.display(), top_level_fields = root.len(), "initial config loaded");
    Ok(root)
}

/// Load everything `config` names and start a server with the logging hook.
pub fn build_server(config: &ServerConfig) -> anyhow::Result<Server> {
    let model = load_model(&config.model_path)?;
    let initial = load_initial_config(&model, config.initial_config.as_deref())?;
    Ok(Server::new(model, initial, config.engine.clone()).with_hook(Arc::new(LoggingHook::new())))
}
