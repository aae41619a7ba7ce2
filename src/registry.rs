//! The dependency bookkeeping of the host loader
//!
//! name to path and path to requires are static once the manifest is loaded, the loaded and written
//! marks are what a reload clears so the loader treats a path as never seen

use crate::config::ReloadConfig;
use crate::error::ReloadError;
use crate::namespace::{Namespace, ScriptPath};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub type SharedRegistry = Rc<RefCell<Registry>>;

/// read/invalidate accessor over the loader's tables
pub trait RegistryView {
    /// the namespace which may never be invalidated
    fn root_namespace(&self) -> &Namespace;
    fn path_for(&self, namespace: &Namespace) -> Option<&ScriptPath>;
    /// the namespaces a path requires, empty for unknown paths
    fn requires_of(&self, path: &ScriptPath) -> &[Namespace];
    fn is_loaded(&self, path: &ScriptPath) -> bool;
    fn is_written(&self, path: &ScriptPath) -> bool;
    /// forget the loaded and written marks of a path, returns true if a mark was removed
    fn clear_marks(&mut self, path: &ScriptPath) -> bool;
}

/// one `addDependency` entry of the loader's manifest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepEntry {
    pub path: String,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepsManifest {
    #[serde(default)]
    pub dependencies: Vec<DepEntry>,
}

impl DepsManifest {
    pub fn from_json_str(json: &str) -> Result<Self, ReloadError> {
        Ok(serde_json::from_str(json)?)
    }
}

pub struct Registry {
    root: Namespace,
    base_path: String,
    name_to_path: HashMap<Namespace, ScriptPath>,
    requires: HashMap<ScriptPath, Vec<Namespace>>,
    loaded: HashSet<ScriptPath>,
    // keyed by resolved url, i.e. base_path + path
    written: HashSet<ScriptPath>,
    provided: HashSet<Namespace>,
}

impl Registry {
    pub fn new(root: Namespace, base_path: &str) -> Self {
        Self {
            root,
            base_path: base_path.to_string(),
            name_to_path: HashMap::new(),
            requires: HashMap::new(),
            loaded: HashSet::new(),
            written: HashSet::new(),
            provided: HashSet::new(),
        }
    }

    pub fn from_manifest(config: &ReloadConfig, manifest: &DepsManifest) -> Self {
        let mut registry = Self::new(
            Namespace::new(config.root_namespace.as_str()),
            config.base_path.as_str(),
        );
        for entry in &manifest.dependencies {
            let provides: Vec<&str> = entry.provides.iter().map(|s| s.as_str()).collect();
            let requires: Vec<&str> = entry.requires.iter().map(|s| s.as_str()).collect();
            registry.add_dependency(entry.path.as_str(), &provides, &requires);
        }
        registry
    }

    /// register a path, the namespaces it provides and the namespaces it requires
    pub fn add_dependency(&mut self, path: &str, provides: &[&str], requires: &[&str]) {
        let path = ScriptPath::new(path);
        for ns in provides {
            let ns = Namespace::new(ns);
            if let Some(prev) = self.name_to_path.insert(ns.clone(), path.clone()) {
                if prev != path {
                    log::warn!("{} was provided by {}, now by {}", ns, prev, path);
                }
            }
        }
        self.requires
            .insert(path, requires.iter().map(|r| Namespace::new(r)).collect());
    }

    pub fn resolve_url(&self, path: &ScriptPath) -> ScriptPath {
        if self.base_path.is_empty() {
            path.clone()
        } else {
            ScriptPath::from(format!("{}{}", self.base_path, path))
        }
    }

    pub fn mark_written(&mut self, path: &ScriptPath) {
        log::trace!("Registry::mark_written {}", path);
        let url = self.resolve_url(path);
        self.written.insert(url);
    }

    pub fn mark_loaded(&mut self, path: &ScriptPath) {
        log::trace!("Registry::mark_loaded {}", path);
        self.loaded.insert(path.clone());
    }

    /// mark every known path as written and loaded, the state of a fully rendered page
    pub fn mark_all_loaded(&mut self) {
        let paths: Vec<ScriptPath> = self.requires.keys().cloned().collect();
        for path in paths {
            self.mark_written(&path);
            self.mark_loaded(&path);
        }
    }

    /// construct a namespace, providing it again is tolerated
    pub fn provide(&mut self, namespace: &Namespace) {
        if !self.provided.insert(namespace.clone()) {
            log::trace!("{} provided again", namespace);
        }
    }

    pub fn is_provided(&self, namespace: &Namespace) -> bool {
        self.provided.contains(namespace)
    }

    pub fn len(&self) -> usize {
        self.requires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requires.is_empty()
    }
}

impl RegistryView for Registry {
    fn root_namespace(&self) -> &Namespace {
        &self.root
    }

    fn path_for(&self, namespace: &Namespace) -> Option<&ScriptPath> {
        self.name_to_path.get(namespace)
    }

    fn requires_of(&self, path: &ScriptPath) -> &[Namespace] {
        self.requires.get(path).map(|r| r.as_slice()).unwrap_or(&[])
    }

    fn is_loaded(&self, path: &ScriptPath) -> bool {
        self.loaded.contains(path)
    }

    fn is_written(&self, path: &ScriptPath) -> bool {
        self.written.contains(path) || self.written.contains(&self.resolve_url(path))
    }

    fn clear_marks(&mut self, path: &ScriptPath) -> bool {
        let url = self.resolve_url(path);
        let was_loaded = self.loaded.remove(path);
        let was_written = self.written.remove(path);
        let was_written_url = self.written.remove(&url);
        was_loaded || was_written || was_written_url
    }
}

#[cfg(test)]
pub mod tests {
    use crate::config::ReloadConfig;
    use crate::namespace::{Namespace, ScriptPath};
    use crate::registry::{DepsManifest, Registry, RegistryView};

    #[test]
    fn test_manifest() {
        let manifest = DepsManifest::from_json_str(
            r#"{"dependencies": [
                {"path": "cljs/core.js", "provides": ["cljs.core"]},
                {"path": "app/core.js", "provides": ["app.core"], "requires": ["cljs.core", "app.util"]},
                {"path": "app/util.js", "provides": ["app.util"], "requires": ["cljs.core"]}
            ]}"#,
        )
        .expect("manifest parse failed");
        let registry = Registry::from_manifest(&ReloadConfig::default(), &manifest);

        assert_eq!(registry.len(), 3);
        let path = registry
            .path_for(&Namespace::from("app.core"))
            .expect("no path")
            .clone();
        assert_eq!(path.as_str(), "app/core.js");
        assert_eq!(
            registry.requires_of(&path),
            &[Namespace::from("cljs.core"), Namespace::from("app.util")]
        );
        assert!(registry
            .requires_of(&ScriptPath::from("nope.js"))
            .is_empty());
        assert_eq!(registry.root_namespace().as_str(), "cljs.core");
    }

    #[test]
    fn test_marks_with_base_path() {
        let mut registry = Registry::new(Namespace::from("cljs.core"), "/out/");
        registry.add_dependency("a.js", &["a"], &[]);
        let path = ScriptPath::from("a.js");

        registry.mark_written(&path);
        registry.mark_loaded(&path);
        assert!(registry.is_written(&path));
        assert!(registry.is_written(&ScriptPath::from("/out/a.js")));
        assert!(registry.is_loaded(&path));

        assert!(registry.clear_marks(&path));
        assert!(!registry.is_written(&path));
        assert!(!registry.is_loaded(&path));
        // clearing is idempotent
        assert!(!registry.clear_marks(&path));
    }

    #[test]
    fn test_provide_twice() {
        let mut registry = Registry::new(Namespace::from("cljs.core"), "");
        let ns = Namespace::from("cljs.user");
        assert!(!registry.is_provided(&ns));
        registry.provide(&ns);
        registry.provide(&ns);
        assert!(registry.is_provided(&ns));
    }

    #[test]
    fn test_last_provider_wins() {
        let manifest = DepsManifest::from_json_str(
            r#"{"dependencies": [
                {"path": "old/util.js", "provides": ["app.util"]},
                {"path": "new/util.js", "provides": ["app.util", "app.extra"], "requires": ["cljs.core"]}
            ]}"#,
        )
        .expect("manifest parse failed");
        let registry = Registry::from_manifest(&ReloadConfig::default(), &manifest);

        let util = registry
            .path_for(&Namespace::from("app.util"))
            .expect("no path");
        assert_eq!(util.as_str(), "new/util.js");
        assert_eq!(
            registry.path_for(&Namespace::from("app.extra")),
            Some(&ScriptPath::from("new/util.js"))
        );
        // the replaced path keeps its own entry
        assert_eq!(registry.len(), 2);
        assert!(registry
            .requires_of(&ScriptPath::from("old/util.js"))
            .is_empty());
    }
}
