//! Process-wide model artifact.
//!
//! The artifact is loaded at most once per process and never reloaded; it
//! lives until the process exits.

use crate::artifact::ModelArtifact;
use crate::error::LoadError;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

static ARTIFACT: OnceCell<Arc<ModelArtifact>> = OnceCell::new();

/// Load the artifact at `path` unless one is already loaded.
///
/// Once initialized, later calls return the loaded artifact and do not touch
/// the filesystem, whatever path they pass. A failed load leaves the state
/// uninitialized.
pub fn init<P: AsRef<Path>>(path: P) -> Result<Arc<ModelArtifact>, LoadError> {
    if ARTIFACT.get().is_some() {
        debug!(path = %path.as_ref().display(), "Model artifact already loaded; ignoring init");
    }
    ARTIFACT
        .get_or_try_init(|| ModelArtifact::load(path).map(Arc::new))
        .map(Arc::clone)
}

/// The loaded artifact, if [`init`] has succeeded.
pub fn get() -> Option<Arc<ModelArtifact>> {
    ARTIFACT.get().cloned()
}
