//! The seams to the hosting document
//!
//! a ScriptHost creates and inserts script elements, a TransportHook may take over fetching
//! altogether. Both are implemented by the embedder and live on the event loop thread.

use crate::namespace::ScriptPath;
use crate::resolvable_future::ResolvableFutureResolver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static REQUEST_IDS: AtomicUsize = AtomicUsize::new(0);

fn next_request_id() -> usize {
    REQUEST_IDS.fetch_add(1, Ordering::SeqCst)
}

/// signal handed to the host for each inserted element, resolving it more than once is a no-op
pub type ReadySignal = Arc<ResolvableFutureResolver<()>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentState {
    Loading,
    Interactive,
    Complete,
}

/// how the host materializes a script request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionMode {
    /// create an element and append it to the live document
    AppendElement,
    /// write markup into the document stream, destructive once the document is complete
    DocumentWrite,
}

/// one queued load
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptRequest {
    pub id: usize,
    pub path: ScriptPath,
    pub inline_source: Option<String>,
}

impl ScriptRequest {
    pub fn new(path: ScriptPath, inline_source: Option<String>) -> Self {
        Self {
            id: next_request_id(),
            path,
            inline_source,
        }
    }
}

/// attributes shared by every element a loader creates
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementOptions {
    /// CSP nonce copied onto external and inline scripts
    pub nonce: Option<String>,
    pub defer: bool,
}

/// what the host should insert for a request
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptElement {
    pub request_id: usize,
    pub content_type: &'static str,
    /// always false, scripts must execute in insertion order
    pub async_load: bool,
    pub defer: bool,
    /// `anonymous` for external scripts, so errors of cross origin scripts carry their details
    pub cross_origin: Option<&'static str>,
    pub nonce: Option<String>,
    pub src: Option<String>,
    pub text: Option<String>,
}

impl ScriptElement {
    pub fn for_request(
        request: &ScriptRequest,
        url: &ScriptPath,
        options: &ElementOptions,
    ) -> Self {
        let (src, text, cross_origin) = match &request.inline_source {
            Some(source) => (None, Some(source.clone()), None),
            None => (Some(url.to_string()), None, Some("anonymous")),
        };
        Self {
            request_id: request.id,
            content_type: "text/javascript",
            async_load: false,
            defer: options.defer,
            cross_origin,
            nonce: options.nonce.clone(),
            src,
            text,
        }
    }
    pub fn is_inline(&self) -> bool {
        self.text.is_some()
    }
}

/// the DOM side: creating, wiring and inserting script elements
pub trait ScriptHost {
    fn document_state(&self) -> DocumentState;

    fn insertion_mode(&self) -> InsertionMode {
        InsertionMode::AppendElement
    }

    /// the nonce of the document's content security policy, if it uses one
    fn script_nonce(&self) -> Option<String> {
        None
    }

    /// insert the element and resolve ready once it has executed
    fn insert_script(&self, element: ScriptElement, ready: ReadySignal) -> anyhow::Result<()>;
}

impl<H: ScriptHost + ?Sized> ScriptHost for Arc<H> {
    fn document_state(&self) -> DocumentState {
        (**self).document_state()
    }

    fn insertion_mode(&self) -> InsertionMode {
        (**self).insertion_mode()
    }

    fn script_nonce(&self) -> Option<String> {
        (**self).script_nonce()
    }

    fn insert_script(&self, element: ScriptElement, ready: ReadySignal) -> anyhow::Result<()> {
        (**self).insert_script(element, ready)
    }
}

/// takes full responsibility for fetching a path
///
/// an import runs in place of inserting an element, so it holds the queue like one
pub trait TransportHook {
    /// return true when the script has executed, false to pause the queue until the hook
    /// resolves ready
    fn import_script(
        &self,
        path: &ScriptPath,
        inline_source: Option<&str>,
        ready: ReadySignal,
    ) -> anyhow::Result<bool>;
}

/// true if path names the loader's own dependency manifest, e.g. `out/goog/deps.js`
pub fn is_deps_manifest(path: &ScriptPath, manifest_name: &str) -> bool {
    if manifest_name.is_empty() {
        return false;
    }
    let path = path.as_str();
    match path.strip_suffix(manifest_name) {
        Some(prefix) => prefix
            .chars()
            .last()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_')),
        None => false,
    }
}

#[cfg(test)]
pub mod tests {
    use crate::namespace::ScriptPath;
    use crate::script::{is_deps_manifest, ElementOptions, ScriptElement, ScriptRequest};

    #[test]
    fn test_deps_manifest() {
        assert!(is_deps_manifest(&ScriptPath::from("deps.js"), "deps.js"));
        assert!(is_deps_manifest(
            &ScriptPath::from("/out/goog/deps.js"),
            "deps.js"
        ));
        assert!(!is_deps_manifest(
            &ScriptPath::from("/out/mydeps.js"),
            "deps.js"
        ));
        assert!(!is_deps_manifest(
            &ScriptPath::from("/out/deps.js.map"),
            "deps.js"
        ));
        assert!(!is_deps_manifest(&ScriptPath::from("/out/deps.js"), ""));
    }

    #[test]
    fn test_element() {
        let options = ElementOptions::default();
        let req = ScriptRequest::new(ScriptPath::from("a.js"), None);
        let el = ScriptElement::for_request(&req, &ScriptPath::from("/out/a.js"), &options);
        assert_eq!(el.src.as_deref(), Some("/out/a.js"));
        assert_eq!(el.cross_origin, Some("anonymous"));
        assert_eq!(el.nonce, None);
        assert!(!el.is_inline());
        assert!(!el.async_load);
        assert!(!el.defer);

        let req = ScriptRequest::new(ScriptPath::from("b.js"), Some("var b = 1;".to_string()));
        let el = ScriptElement::for_request(&req, &ScriptPath::from("/out/b.js"), &options);
        assert!(el.is_inline());
        assert_eq!(el.src, None);
        assert_eq!(el.cross_origin, None);
        assert_eq!(el.request_id, req.id);
    }

    #[test]
    fn test_element_nonce_and_defer() {
        let options = ElementOptions {
            nonce: Some("r4nd0m".to_string()),
            defer: true,
        };
        let req = ScriptRequest::new(ScriptPath::from("a.js"), None);
        let el = ScriptElement::for_request(&req, &ScriptPath::from("a.js"), &options);
        assert_eq!(el.nonce.as_deref(), Some("r4nd0m"));
        assert_eq!(el.cross_origin, Some("anonymous"));
        assert!(el.defer);
        assert!(!el.async_load);

        // inline scripts need the nonce as well
        let req = ScriptRequest::new(ScriptPath::from("repl.js"), Some("1;".to_string()));
        let el = ScriptElement::for_request(&req, &ScriptPath::from("repl.js"), &options);
        assert_eq!(el.nonce.as_deref(), Some("r4nd0m"));
    }
}
