//! The Send facade of a reload session
//!
//! the ReloadSession itself is not Send, it lives in a thread_local of an EventLoop worker thread.
//! ReloadRuntime owns that EventLoop and moves every call onto it.

use crate::config::ReloadConfig;
use crate::error::ReloadError;
use crate::eventloop::EventLoop;
use crate::registry::{DepsManifest, Registry};
use crate::require::{ReloadArg, RequireOutcome};
use crate::resolvable_future::ResolvableFuture;
use crate::script::{ScriptHost, TransportHook};
use crate::session::ReloadSession;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

thread_local! {
    static SESSION: RefCell<Option<ReloadSession>> = RefCell::new(None);
}

pub struct ReloadRuntime {
    event_loop: EventLoop,
}

impl ReloadRuntime {
    /// start an event loop and create the session on it
    ///
    /// the host is constructed on the worker thread by host_factory
    pub fn new<F>(
        config: ReloadConfig,
        manifest: DepsManifest,
        host_factory: F,
    ) -> Result<Self, ReloadError>
    where
        F: FnOnce() -> Rc<dyn ScriptHost> + Send + 'static,
    {
        let event_loop = EventLoop::new(Duration::from_millis(config.idle_tick_ms));
        event_loop.exe(move || -> Result<(), ReloadError> {
            let spawner = EventLoop::local_spawner().ok_or(ReloadError::SessionUnavailable)?;
            let mut registry = Registry::from_manifest(&config, &manifest);
            // the page was rendered with everything in the manifest
            registry.mark_all_loaded();
            let session = ReloadSession::new(config, registry, host_factory(), spawner);
            SESSION.with(|rc| rc.borrow_mut().replace(session));
            Ok(())
        })??;
        log::debug!("ReloadRuntime started");
        Ok(Self { event_loop })
    }

    /// run a consumer against the session on the loop thread and block until it is done
    pub fn exe<R, C>(&self, consumer: C) -> Result<R, ReloadError>
    where
        R: Send + 'static,
        C: FnOnce(&mut ReloadSession) -> R + Send + 'static,
    {
        self.event_loop.exe(move || {
            SESSION.with(|rc| {
                let session = &mut *rc.borrow_mut();
                session
                    .as_mut()
                    .map(consumer)
                    .ok_or(ReloadError::SessionUnavailable)
            })
        })?
    }

    pub fn require(
        &self,
        namespace: &str,
        reload: ReloadArg,
    ) -> Result<RequireOutcome, ReloadError> {
        let namespace = namespace.to_string();
        self.exe(move |session| session.require(namespace.as_str(), reload))?
    }

    pub fn eval_source(&self, namespace: &str, source: String) -> Result<(), ReloadError> {
        let namespace = namespace.to_string();
        self.exe(move |session| session.eval_source(namespace.as_str(), source))?
    }

    pub fn is_loading(&self) -> Result<bool, ReloadError> {
        self.exe(|session| session.is_loading())
    }

    /// a future which resolves when the load queue next drains
    ///
    /// replaces a hook set earlier, the earlier future will then never resolve
    pub fn after_load(&self) -> Result<ResolvableFuture<()>, ReloadError> {
        let drained = ResolvableFuture::new();
        let resolver = drained.get_resolver();
        self.exe(move |session| {
            session.set_after_load_hook(move || {
                resolver.resolve(());
            })
        })?;
        Ok(drained)
    }

    /// install or remove a transport hook, the hook is constructed on the worker thread
    pub fn set_transport_hook<F>(&self, hook_factory: Option<F>) -> Result<(), ReloadError>
    where
        F: FnOnce() -> Rc<dyn TransportHook> + Send + 'static,
    {
        self.exe(move |session| session.set_transport_hook(hook_factory.map(|f| f())))
    }
}

impl Drop for ReloadRuntime {
    fn drop(&mut self) {
        let _ = self.event_loop.exe(|| SESSION.with(|rc| rc.borrow_mut().take()).is_some());
    }
}
