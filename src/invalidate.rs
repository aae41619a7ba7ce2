//! The invalidation walker
//!
//! forgets that a namespace (and with ReloadMode::All everything it requires) was ever loaded so
//! the next require fetches and executes it again. The walk uses an explicit work list so deep
//! requirement graphs don't grow the stack.

use crate::namespace::{Namespace, ReloadMode, ScriptPath};
use crate::registry::RegistryView;
use linked_hash_map::LinkedHashMap;
use std::collections::HashSet;

/// the namespaces whose marks were cleared, in visiting order
#[derive(Debug, Default)]
pub struct Invalidation {
    cleared: LinkedHashMap<Namespace, ScriptPath>,
}

impl Invalidation {
    pub fn len(&self) -> usize {
        self.cleared.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
    }
    pub fn contains(&self, namespace: &Namespace) -> bool {
        self.cleared.contains_key(namespace)
    }
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.cleared.keys()
    }
    pub fn paths(&self) -> impl Iterator<Item = &ScriptPath> {
        self.cleared.values()
    }
}

/// clear the loaded and written marks for namespace
///
/// the root namespace is never touched, unknown namespaces are skipped silently so this is safe
/// to call speculatively
pub fn force_reload<R: RegistryView + ?Sized>(
    registry: &mut R,
    namespace: &Namespace,
    mode: ReloadMode,
) -> Invalidation {
    let mut invalidation = Invalidation::default();
    if mode == ReloadMode::None {
        return invalidation;
    }

    let root = registry.root_namespace().clone();
    let mut work_list = vec![namespace.clone()];
    let mut visited: HashSet<Namespace> = HashSet::new();

    while let Some(current) = work_list.pop() {
        if current == root || !visited.insert(current.clone()) {
            continue;
        }

        let path = match registry.path_for(&current) {
            Some(path) => path.clone(),
            None => {
                log::trace!("force_reload: no path for {}", current);
                continue;
            }
        };

        registry.clear_marks(&path);
        log::debug!("force_reload: invalidated {} ({})", current, path);

        if mode == ReloadMode::All {
            for required in registry.requires_of(&path) {
                if !visited.contains(required) {
                    work_list.push(required.clone());
                }
            }
        }

        invalidation.cleared.insert(current, path);

        if mode != ReloadMode::All {
            break;
        }
    }

    invalidation
}
