//! Sequential script loading
//!
//! the LoadQueue is the bare state machine: Idle, or Loading with exactly one request in flight and
//! a fifo of pending requests. The ScriptLoader drives it, it issues requests to the ScriptHost and
//! spawns one completion future per request which advances the queue when the host signals ready.
//!
//! A request which never completes stalls the queue for good, there is no timeout and no retry.
//! A request which cannot be handed to the host at all is dropped, the queue continues with the
//! next one.

use crate::error::ReloadError;
use crate::namespace::ScriptPath;
use crate::registry::SharedRegistry;
use crate::resolvable_future::ResolvableFuture;
use crate::script::{
    is_deps_manifest, DocumentState, ElementOptions, InsertionMode, ScriptElement, ScriptHost,
    ScriptRequest, TransportHook,
};
use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

enum QueueState {
    Idle,
    Loading {
        in_flight: ScriptRequest,
        pending: VecDeque<ScriptRequest>,
    },
}

/// result of completing the in-flight request
#[derive(Debug, PartialEq)]
pub enum Advance {
    /// the next pending request is now in flight and must be issued
    Next {
        finished: ScriptRequest,
        next: ScriptRequest,
    },
    /// nothing pending, the queue is idle again
    Drained { finished: ScriptRequest },
    /// the id was not in flight
    Stale,
}

pub struct LoadQueue {
    state: QueueState,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self {
            state: QueueState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, QueueState::Idle)
    }

    pub fn in_flight(&self) -> Option<&ScriptRequest> {
        match &self.state {
            QueueState::Idle => None,
            QueueState::Loading { in_flight, .. } => Some(in_flight),
        }
    }

    pub fn pending_len(&self) -> usize {
        match &self.state {
            QueueState::Idle => 0,
            QueueState::Loading { pending, .. } => pending.len(),
        }
    }

    /// add a request, returns it back if it must be issued right away
    pub fn enqueue(&mut self, request: ScriptRequest) -> Option<ScriptRequest> {
        if let QueueState::Loading { pending, .. } = &mut self.state {
            pending.push_back(request);
            return None;
        }
        self.state = QueueState::Loading {
            in_flight: request.clone(),
            pending: VecDeque::new(),
        };
        Some(request)
    }

    pub fn complete(&mut self, request_id: usize) -> Advance {
        match std::mem::replace(&mut self.state, QueueState::Idle) {
            QueueState::Idle => Advance::Stale,
            QueueState::Loading {
                in_flight,
                mut pending,
            } => {
                if in_flight.id != request_id {
                    self.state = QueueState::Loading { in_flight, pending };
                    return Advance::Stale;
                }
                match pending.pop_front() {
                    Some(next) => {
                        self.state = QueueState::Loading {
                            in_flight: next.clone(),
                            pending,
                        };
                        Advance::Next {
                            finished: in_flight,
                            next,
                        }
                    }
                    None => Advance::Drained {
                        finished: in_flight,
                    },
                }
            }
        }
    }
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// what happened to a load request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadDisposition {
    /// done without touching the queue
    Loaded,
    /// in flight at the transport hook, which resolves its ready signal once the script ran
    Paused,
    /// sent to the host, now in flight
    Issued,
    /// waiting behind the in-flight request
    Queued,
}

struct LoaderInner {
    registry: SharedRegistry,
    host: Rc<dyn ScriptHost>,
    transport: RefCell<Option<Rc<dyn TransportHook>>>,
    spawner: LocalSpawner,
    deps_manifest: String,
    element_options: RefCell<ElementOptions>,
    queue: RefCell<LoadQueue>,
    loading: Cell<bool>,
    after_load: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl LoaderInner {
    /// hand a request to the transport hook or the host, the returned disposition is either
    /// Issued or Paused
    fn issue(inner: &Rc<Self>, request: &ScriptRequest) -> Result<LoadDisposition, ReloadError> {
        let signal = ResolvableFuture::new();
        let ready = signal.get_resolver();

        let transport = inner.transport.borrow().clone();
        let disposition = match transport {
            Some(hook) => {
                log::debug!("ScriptLoader: importing {} (#{})", request.path, request.id);
                let inline_source = request.inline_source.as_deref();
                let loaded = hook
                    .import_script(&request.path, inline_source, ready.clone())
                    .map_err(|reason| ReloadError::Transport {
                        path: request.path.clone(),
                        reason,
                    })?;
                if loaded {
                    ready.resolve(());
                    LoadDisposition::Issued
                } else {
                    log::debug!("ScriptLoader: {} paused by transport", request.path);
                    LoadDisposition::Paused
                }
            }
            None => {
                let url = inner.registry.borrow().resolve_url(&request.path);
                let mut options = inner.element_options.borrow().clone();
                if let Some(nonce) = inner.host.script_nonce() {
                    options.nonce = Some(nonce);
                }
                let element = ScriptElement::for_request(request, &url, &options);

                log::debug!("ScriptLoader: issuing {} (#{})", request.path, request.id);
                inner
                    .host
                    .insert_script(element, ready)
                    .map_err(|reason| ReloadError::Host {
                        path: request.path.clone(),
                        reason,
                    })?;
                LoadDisposition::Issued
            }
        };

        let request_id = request.id;
        let completion_inner = inner.clone();
        inner.spawner.spawn_local(async move {
            signal.await;
            LoaderInner::advance(&completion_inner, request_id, true);
        })?;
        Ok(disposition)
    }

    /// retire the in-flight request and issue the next one
    ///
    /// requests which fail to issue are dropped unloaded, the queue moves on to the next
    fn advance(inner: &Rc<Self>, request_id: usize, loaded: bool) {
        let mut advance = inner.queue.borrow_mut().complete(request_id);
        let mut loaded = loaded;
        loop {
            match advance {
                Advance::Next { finished, next } => {
                    if loaded {
                        inner.registry.borrow_mut().mark_loaded(&finished.path);
                    }
                    match Self::issue(inner, &next) {
                        Ok(_) => return,
                        Err(e) => {
                            log::error!("ScriptLoader: dropping {}: {}", next.path, e);
                            advance = inner.queue.borrow_mut().complete(next.id);
                            loaded = false;
                        }
                    }
                }
                Advance::Drained { finished } => {
                    if loaded {
                        inner.registry.borrow_mut().mark_loaded(&finished.path);
                    }
                    inner.loading.set(false);
                    log::debug!("ScriptLoader: queue drained");
                    let hook = inner.after_load.borrow_mut().take();
                    if let Some(hook) = hook {
                        hook();
                    }
                    return;
                }
                Advance::Stale => {
                    log::warn!("ScriptLoader: completion for #{} was not in flight", request_id);
                    return;
                }
            }
        }
    }
}

/// serializes script loads, at most one request is ever outstanding at the host or the transport
#[derive(Clone)]
pub struct ScriptLoader {
    inner: Rc<LoaderInner>,
}

impl ScriptLoader {
    pub fn new(
        registry: SharedRegistry,
        host: Rc<dyn ScriptHost>,
        spawner: LocalSpawner,
        deps_manifest: &str,
    ) -> Self {
        Self {
            inner: Rc::new(LoaderInner {
                registry,
                host,
                transport: RefCell::new(None),
                spawner,
                deps_manifest: deps_manifest.to_string(),
                element_options: RefCell::new(ElementOptions::default()),
                queue: RefCell::new(LoadQueue::new()),
                loading: Cell::new(false),
                after_load: RefCell::new(None),
            }),
        }
    }

    pub fn set_transport_hook(&self, hook: Option<Rc<dyn TransportHook>>) {
        *self.inner.transport.borrow_mut() = hook;
    }

    /// attributes for elements created from now on, a nonce of the host takes precedence
    pub fn set_element_options(&self, options: ElementOptions) {
        *self.inner.element_options.borrow_mut() = options;
    }

    /// register a hook which is called once, when the queue next drains
    pub fn set_after_load_hook<H: FnOnce() + 'static>(&self, hook: H) {
        *self.inner.after_load.borrow_mut() = Some(Box::new(hook));
    }

    /// true from the first enqueue until the queue drains
    pub fn is_loading(&self) -> bool {
        self.inner.loading.get()
    }

    pub fn in_flight(&self) -> Option<ScriptPath> {
        self.inner.queue.borrow().in_flight().map(|r| r.path.clone())
    }

    pub fn pending_len(&self) -> usize {
        self.inner.queue.borrow().pending_len()
    }

    /// load a path the way the host loader loads a dependency
    pub fn load(
        &self,
        path: &ScriptPath,
        inline_source: Option<String>,
    ) -> Result<LoadDisposition, ReloadError> {
        let host = &self.inner.host;
        let has_transport = self.inner.transport.borrow().is_some();
        if !has_transport
            && host.document_state() == DocumentState::Complete
            && host.insertion_mode() == InsertionMode::DocumentWrite
        {
            // test harnesses reload the bootstrap which writes the manifest again
            if is_deps_manifest(path, self.inner.deps_manifest.as_str()) {
                log::debug!("ScriptLoader: ignoring late load of {}", path);
                self.inner.registry.borrow_mut().mark_loaded(path);
                return Ok(LoadDisposition::Loaded);
            }
            return Err(ReloadError::WriteAfterLoad(path.clone()));
        }

        self.enqueue_load(path.clone(), inline_source)
    }

    /// put a request on the queue, issuing it immediately when nothing is in flight
    ///
    /// a request that fails to issue is dropped and the error returned
    pub fn enqueue_load(
        &self,
        path: ScriptPath,
        inline_source: Option<String>,
    ) -> Result<LoadDisposition, ReloadError> {
        let request = ScriptRequest::new(path, inline_source);
        let to_issue = self.inner.queue.borrow_mut().enqueue(request);
        match to_issue {
            Some(request) => {
                self.inner.loading.set(true);
                LoaderInner::issue(&self.inner, &request).inspect_err(|_| {
                    LoaderInner::advance(&self.inner, request.id, false);
                })
            }
            None => Ok(LoadDisposition::Queued),
        }
    }
}
