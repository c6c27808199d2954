//! Startup errors.
//!
//! Everything that can go wrong before the playground reaches
//! [`AppPhase::Running`](crate::bootstrap::AppPhase) is fatal. The variants
//! below are what [`flow::run`](crate::flow::run) reports before exiting.
//! Internals (IO, GPU setup, glTF parsing) keep using `anyhow` and are
//! wrapped into one of these at the bootstrap boundary.

use instant::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The host environment is missing something we cannot run without,
    /// e.g. the canvas element the rendering surface binds to.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to load scene `{path}`: {source}")]
    SceneLoad {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("loading scene `{path}` did not finish within {after:?}")]
    LoadTimedOut { path: String, after: Duration },

    /// The scene loaded but declares no camera. There is no default camera.
    #[error(
        "no camera defined in scene `{path}`. Add at least one camera to the asset or create one in code"
    )]
    MissingCamera { path: String },

    #[error("invalid rigid body parameters: {0}")]
    InvalidBodyParams(String),

    #[error("physics is not enabled on this scene")]
    PhysicsDisabled,
}

impl BootstrapError {
    pub(crate) fn scene_load(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::SceneLoad {
            path: path.into(),
            source: source.into(),
        }
    }
}
