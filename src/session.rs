use crate::config::ReloadConfig;
use crate::error::ReloadError;
use crate::load_queue::ScriptLoader;
use crate::namespace::Namespace;
use crate::registry::{Registry, RegistryView, SharedRegistry};
use crate::require::{DebugLoader, ReloadArg, ReloadContext, RequireInterceptor, RequireOutcome};
use crate::script::{ElementOptions, ScriptHost, TransportHook};
use futures::executor::LocalSpawner;
use std::cell::RefCell;
use std::rc::Rc;

/// one connected development session: the registry, the script loader and the intercepted require
///
/// a session is not Send, it lives on the thread which delivers the host's completion signals
pub struct ReloadSession {
    config: ReloadConfig,
    registry: SharedRegistry,
    scripts: ScriptLoader,
    require: RequireInterceptor<DebugLoader>,
    ctx: ReloadContext,
}

impl ReloadSession {
    pub fn new(
        config: ReloadConfig,
        registry: Registry,
        host: Rc<dyn ScriptHost>,
        spawner: LocalSpawner,
    ) -> Self {
        let registry = Rc::new(RefCell::new(registry));
        let scripts = ScriptLoader::new(
            registry.clone(),
            host,
            spawner,
            config.deps_manifest.as_str(),
        );
        scripts.set_element_options(ElementOptions {
            nonce: config.script_nonce.clone(),
            defer: config.defer_scripts,
        });
        let require = RequireInterceptor::new(
            DebugLoader::new(registry.clone(), scripts.clone()),
            registry.clone(),
        );
        let session = Self {
            config,
            registry,
            scripts,
            require,
            ctx: ReloadContext::new(),
        };
        session.bootstrap();
        session
    }

    fn bootstrap(&self) {
        let registry = &mut *self.registry.borrow_mut();
        for ns in &self.config.bootstrap_namespaces {
            log::debug!("ReloadSession: providing {}", ns);
            registry.provide(&Namespace::new(ns.as_str()));
        }
    }

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn scripts(&self) -> &ScriptLoader {
        &self.scripts
    }

    pub fn is_reload_all(&self) -> bool {
        self.ctx.is_reload_all()
    }

    /// require a namespace, invalidating it first when reload asks for it
    pub fn require(
        &mut self,
        namespace: &str,
        reload: ReloadArg,
    ) -> Result<RequireOutcome, ReloadError> {
        let namespace = Namespace::new(namespace);
        self.require.require(&mut self.ctx, &namespace, reload)
    }

    /// load source text pushed by the development session
    pub fn eval_source(&self, namespace: &str, source: String) -> Result<(), ReloadError> {
        let namespace = Namespace::new(namespace);
        let path = {
            let registry = &mut *self.registry.borrow_mut();
            registry.provide(&namespace);
            registry.path_for(&namespace).cloned()
        };
        let path = path.unwrap_or_else(|| format!("{}.js", namespace).into());
        self.scripts.enqueue_load(path, Some(source))?;
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.scripts.is_loading()
    }

    pub fn set_after_load_hook<H: FnOnce() + 'static>(&self, hook: H) {
        self.scripts.set_after_load_hook(hook);
    }

    pub fn set_transport_hook(&self, hook: Option<Rc<dyn TransportHook>>) {
        self.scripts.set_transport_hook(hook);
    }
}
