//! # nsreload
//!
//! Live reloading for namespace based script loaders.
//!
//! A development session asks for a namespace to be required again, the coordinator makes the
//! loader forget the namespace (and optionally everything it requires) and lets the loader's own
//! require fetch the scripts again. Scripts are inserted strictly one at a time so their side
//! effects never race.
//!
//! * [registry] the loader's dependency tables
//! * [invalidate] the walker which clears loaded/written marks
//! * [load_queue] the sequential script queue
//! * [require] interception of the loader's require
//! * [session] and [runtime] wire it all together on an [eventloop::EventLoop]
//!
//! # Example
//! ```rust
//! use nsreload::config::ReloadConfig;
//! use nsreload::registry::DepsManifest;
//! use nsreload::require::ReloadArg;
//! use nsreload::runtime::ReloadRuntime;
//! use nsreload::script::{DocumentState, ReadySignal, ScriptElement, ScriptHost};
//! use std::rc::Rc;
//!
//! struct InstantHost;
//!
//! impl ScriptHost for InstantHost {
//!     fn document_state(&self) -> DocumentState {
//!         DocumentState::Complete
//!     }
//!     fn insert_script(&self, _element: ScriptElement, ready: ReadySignal) -> anyhow::Result<()> {
//!         ready.resolve(());
//!         Ok(())
//!     }
//! }
//!
//! let manifest = DepsManifest::from_json_str(
//!     r#"{"dependencies": [{"path": "app.js", "provides": ["app"]}]}"#,
//! ).unwrap();
//! let rt = ReloadRuntime::new(ReloadConfig::default(), manifest, || {
//!     let host: Rc<dyn ScriptHost> = Rc::new(InstantHost);
//!     host
//! }).unwrap();
//!
//! let drained = rt.after_load().unwrap();
//! let outcome = rt.require("app", ReloadArg::Reload).unwrap();
//! assert_eq!(outcome.scheduled.len(), 1);
//! futures::executor::block_on(drained);
//! ```

pub mod config;
pub mod error;
pub mod eventloop;
pub mod invalidate;
pub mod load_queue;
pub mod namespace;
pub mod registry;
pub mod require;
pub mod resolvable_future;
pub mod runtime;
pub mod script;
pub mod session;
#[cfg(test)]
pub mod test_utils;
