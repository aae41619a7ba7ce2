use crate::namespace::Namespace;
use crate::registry::Registry;
use crate::script::{DocumentState, InsertionMode, ReadySignal, ScriptElement, ScriptHost};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static LOGGING: Once = Once::new();

pub fn init_logging() {
    LOGGING.call_once(|| {
        simple_logging::log_to_stderr(log::LevelFilter::Debug);
    });
}

/// a -> {b, c}, b -> {d}, e standalone, everything requires cljs.core, all loaded
pub fn sample_registry() -> Registry {
    let mut registry = Registry::new(Namespace::from("cljs.core"), "");
    registry.add_dependency("cljs/core.js", &["cljs.core"], &[]);
    registry.add_dependency("a.js", &["a"], &["cljs.core", "b", "c"]);
    registry.add_dependency("b.js", &["b"], &["cljs.core", "d"]);
    registry.add_dependency("c.js", &["c"], &["cljs.core"]);
    registry.add_dependency("d.js", &["d"], &["cljs.core"]);
    registry.add_dependency("e.js", &["e"], &["cljs.core"]);
    registry.mark_all_loaded();
    registry
}

/// a ScriptHost which records every element and hands out control over the ready signals
pub struct RecordingHost {
    document: Mutex<DocumentState>,
    mode: Mutex<InsertionMode>,
    nonce: Mutex<Option<String>>,
    inserted: Mutex<Vec<(ScriptElement, ReadySignal)>>,
    auto_ready: bool,
    fail_next: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::with_auto_ready(false)
    }

    /// a host whose scripts execute as soon as they are inserted
    pub fn auto_ready() -> Self {
        Self::with_auto_ready(true)
    }

    fn with_auto_ready(auto_ready: bool) -> Self {
        Self {
            document: Mutex::new(DocumentState::Loading),
            mode: Mutex::new(InsertionMode::AppendElement),
            nonce: Mutex::new(None),
            inserted: Mutex::new(vec![]),
            auto_ready,
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn set_document_state(&self, state: DocumentState) {
        *self.document.lock() = state;
    }

    pub fn set_insertion_mode(&self, mode: InsertionMode) {
        *self.mode.lock() = mode;
    }

    pub fn set_nonce(&self, nonce: Option<&str>) {
        *self.nonce.lock() = nonce.map(|n| n.to_string());
    }

    /// the next insert_script call fails
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn inserted(&self) -> Vec<ScriptElement> {
        self.inserted.lock().iter().map(|(el, _)| el.clone()).collect()
    }

    pub fn inserted_srcs(&self) -> Vec<String> {
        self.inserted
            .lock()
            .iter()
            .filter_map(|(el, _)| el.src.clone())
            .collect()
    }

    /// number of inserted scripts which have not signalled ready
    pub fn outstanding(&self) -> usize {
        self.inserted
            .lock()
            .iter()
            .filter(|(_, ready)| !ready.is_resolved())
            .count()
    }

    pub fn ready(&self, index: usize) {
        let signal = self.inserted.lock()[index].1.clone();
        signal.resolve(());
    }
}

impl ScriptHost for RecordingHost {
    fn document_state(&self) -> DocumentState {
        *self.document.lock()
    }

    fn insertion_mode(&self) -> InsertionMode {
        *self.mode.lock()
    }

    fn script_nonce(&self) -> Option<String> {
        self.nonce.lock().clone()
    }

    fn insert_script(&self, element: ScriptElement, ready: ReadySignal) -> anyhow::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("document has no body");
        }
        if self.auto_ready {
            ready.resolve(());
        }
        self.inserted.lock().push((element, ready));
        Ok(())
    }
}
