use crate::namespace::{Namespace, ScriptPath};

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// writing markup into a finished document would wipe the rendered page
    #[error("Cannot write \"{0}\" after document load")]
    WriteAfterLoad(ScriptPath),

    #[error("Namespace \"{0}\" is not known to the loader")]
    UnknownNamespace(Namespace),

    #[error("Script host failed to load \"{path}\": {reason}")]
    Host { path: ScriptPath, reason: anyhow::Error },

    #[error("Transport hook failed to import \"{path}\": {reason}")]
    Transport { path: ScriptPath, reason: anyhow::Error },

    #[error("Could not spawn completion task: {0}")]
    Spawn(#[from] futures::task::SpawnError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("No reload session on this event loop")]
    SessionUnavailable,

    #[error("Event loop is not running")]
    EventLoopStopped,
}

impl ReloadError {
    /// true for the condition that must abort the reload instead of being absorbed
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReloadError::WriteAfterLoad(_))
    }
}
