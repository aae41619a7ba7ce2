//! Require interception
//!
//! the RequireInterceptor wraps the host loader's own require. When asked to reload it first
//! invalidates the namespace, then delegates, so the original require finds the marks missing and
//! fetches the scripts again.

use crate::error::ReloadError;
use crate::invalidate::force_reload;
use crate::load_queue::ScriptLoader;
use crate::namespace::{Namespace, ReloadMode, ScriptPath};
use crate::registry::{RegistryView, SharedRegistry};
use std::collections::HashSet;

/// the reload argument of a require call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadArg {
    Absent,
    /// reload only the namespace itself
    Reload,
    /// reload the namespace and everything it requires, for the duration of this call
    ReloadAll,
}

impl ReloadArg {
    fn is_truthy(self) -> bool {
        self != ReloadArg::Absent
    }
}

impl From<bool> for ReloadArg {
    fn from(reload: bool) -> Self {
        if reload {
            ReloadArg::Reload
        } else {
            ReloadArg::Absent
        }
    }
}

impl From<Option<&str>> for ReloadArg {
    fn from(reload: Option<&str>) -> Self {
        match reload {
            None | Some("") => ReloadArg::Absent,
            Some("reload-all") => ReloadArg::ReloadAll,
            Some(_) => ReloadArg::Reload,
        }
    }
}

/// the sticky reload-all state of a session
///
/// a `ReloadAll` require sets it and clears it again when it returns, requires made while it is
/// set (e.g. by the scripts that require triggers) reload their whole closure as well
#[derive(Debug, Default)]
pub struct ReloadContext {
    reload_all: bool,
}

impl ReloadContext {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_reload_all(&self) -> bool {
        self.reload_all
    }
}

/// the host loader's original require
///
/// the context is handed through so requires nested in the original call observe the sticky
/// reload-all state of the call that owns it
pub trait HostRequire {
    type Output;
    fn require(
        &self,
        ctx: &mut ReloadContext,
        namespace: &Namespace,
    ) -> Result<Self::Output, ReloadError>;
}

pub struct RequireInterceptor<H: HostRequire> {
    original: H,
    registry: SharedRegistry,
}

impl<H: HostRequire> RequireInterceptor<H> {
    pub fn new(original: H, registry: SharedRegistry) -> Self {
        Self { original, registry }
    }

    pub fn original(&self) -> &H {
        &self.original
    }

    pub fn require(
        &self,
        ctx: &mut ReloadContext,
        namespace: &Namespace,
        reload: ReloadArg,
    ) -> Result<H::Output, ReloadError> {
        if reload == ReloadArg::ReloadAll {
            ctx.reload_all = true;
        }

        if reload.is_truthy() || ctx.reload_all {
            let mode = if ctx.reload_all {
                ReloadMode::All
            } else {
                ReloadMode::Single
            };
            let invalidation = force_reload(&mut *self.registry.borrow_mut(), namespace, mode);
            log::debug!(
                "require {}: {:?} invalidated {} namespace(s)",
                namespace,
                mode,
                invalidation.len()
            );
        }

        let ret = self.original.require(ctx, namespace);

        if reload == ReloadArg::ReloadAll {
            ctx.reload_all = false;
        }
        ret
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequireOutcome {
    pub namespace: Namespace,
    /// the paths handed to the script loader, dependencies first
    pub scheduled: Vec<ScriptPath>,
}

/// the default original require, writes every unwritten path of a namespace's closure
pub struct DebugLoader {
    registry: SharedRegistry,
    scripts: ScriptLoader,
}

impl DebugLoader {
    pub fn new(registry: SharedRegistry, scripts: ScriptLoader) -> Self {
        Self { registry, scripts }
    }

    pub fn scripts(&self) -> &ScriptLoader {
        &self.scripts
    }

    /// unwritten paths in the requirement closure of path, in post order
    fn unwritten_closure<R: RegistryView>(registry: &R, path: &ScriptPath) -> Vec<ScriptPath> {
        let mut order = vec![];
        let mut seen: HashSet<ScriptPath> = HashSet::new();
        let mut stack = vec![(path.clone(), false)];

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                if !registry.is_written(&current) {
                    order.push(current);
                }
                continue;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.push((current.clone(), true));
            for required in registry.requires_of(&current).iter().rev() {
                match registry.path_for(required) {
                    Some(required_path) => {
                        if !seen.contains(required_path) {
                            stack.push((required_path.clone(), false));
                        }
                    }
                    None => log::warn!("{} requires unknown namespace {}", current, required),
                }
            }
        }
        order
    }
}

impl HostRequire for DebugLoader {
    type Output = RequireOutcome;

    fn require(
        &self,
        _ctx: &mut ReloadContext,
        namespace: &Namespace,
    ) -> Result<RequireOutcome, ReloadError> {
        let scheduled = {
            let registry = self.registry.borrow();
            match registry.path_for(namespace) {
                Some(path) => Self::unwritten_closure(&*registry, path),
                None if registry.is_provided(namespace) => vec![],
                None => return Err(ReloadError::UnknownNamespace(namespace.clone())),
            }
        };

        for (index, path) in scheduled.iter().enumerate() {
            if let Err(e) = self.scripts.load(path, None) {
                log::warn!(
                    "require {}: loading {} failed, {} later path(s) not dispatched",
                    namespace,
                    path,
                    scheduled.len() - index - 1
                );
                return Err(e);
            }
            self.registry.borrow_mut().mark_written(path);
        }

        Ok(RequireOutcome {
            namespace: namespace.clone(),
            scheduled,
        })
    }
}
