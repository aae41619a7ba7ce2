use crate::error::ReloadError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// settings for a reload session, every field may be omitted from the json
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// the runtime's core namespace, never invalidated
    pub root_namespace: String,
    /// prefix under which the host loader writes script urls
    pub base_path: String,
    /// file name of the loader's own dependency manifest
    pub deps_manifest: String,
    /// namespaces constructed once when a session starts
    pub bootstrap_namespaces: Vec<String>,
    /// receive timeout of the event loop in milliseconds
    pub idle_tick_ms: u64,
    /// CSP nonce for created scripts when the host does not report one
    pub script_nonce: Option<String>,
    pub defer_scripts: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            root_namespace: "cljs.core".to_string(),
            base_path: String::new(),
            deps_manifest: "deps.js".to_string(),
            bootstrap_namespaces: vec!["cljs.user".to_string()],
            idle_tick_ms: 50,
            script_nonce: None,
            defer_scripts: false,
        }
    }
}

impl ReloadConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ReloadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReloadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(json.as_str())
    }
}
