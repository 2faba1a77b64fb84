//! Locations of the converted repositories.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backend schema modules, relative to the backend root.
pub(crate) const BACKEND_SCHEMAS_DIR: &str = "app/schemas";
/// Backend endpoint routers, relative to the backend root.
pub(crate) const BACKEND_ENDPOINTS_DIR: &str = "app/api/v1/endpoints";
/// Frontend type declarations, relative to the frontend root.
pub(crate) const FRONTEND_TYPES_DIR: &str = "types";
/// Frontend API client, relative to the frontend root.
pub(crate) const FRONTEND_API_DIR: &str = "lib/backend-api";
/// Frontend server actions, relative to the frontend root.
pub(crate) const FRONTEND_ACTIONS_DIR: &str = "actions/backend-api";

/// Root directories of the repositories taking part in a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    /// Python backend root.
    pub backend: PathBuf,
    /// TypeScript frontend root.
    pub frontend: PathBuf,
    /// Python engine package root, searched for imported classes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<PathBuf>,
}

impl ProjectLayout {
    /// Creates a layout without an engine root.
    pub fn new(backend: impl Into<PathBuf>, frontend: impl Into<PathBuf>) -> Self {
        Self {
            backend: backend.into(),
            frontend: frontend.into(),
            engine: None,
        }
    }

    /// Sets the engine root.
    pub fn with_engine(mut self, engine: impl Into<PathBuf>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// `backend/app/schemas`.
    pub fn schemas_dir(&self) -> PathBuf {
        self.backend.join(BACKEND_SCHEMAS_DIR)
    }

    /// `backend/app/api/v1/endpoints`.
    pub fn endpoints_dir(&self) -> PathBuf {
        self.backend.join(BACKEND_ENDPOINTS_DIR)
    }

    /// `frontend/types`.
    pub fn types_dir(&self) -> PathBuf {
        self.frontend.join(FRONTEND_TYPES_DIR)
    }

    /// `frontend/lib/backend-api`.
    pub fn api_dir(&self) -> PathBuf {
        self.frontend.join(FRONTEND_API_DIR)
    }

    /// `frontend/actions/backend-api`.
    pub fn actions_dir(&self) -> PathBuf {
        self.frontend.join(FRONTEND_ACTIONS_DIR)
    }

    /// Roots searched when resolving imported Python classes, backend first.
    pub fn python_roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.backend.clone())
            .chain(self.engine.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_conversion_directories() {
        let layout = ProjectLayout::new("/work/backend", "/work/frontend").with_engine("/work/engine");
        assert_eq!(layout.schemas_dir(), PathBuf::from("/work/backend/app/schemas"));
        assert_eq!(layout.api_dir(), PathBuf::from("/work/frontend/lib/backend-api"));
        assert_eq!(
            layout.python_roots(),
            vec![PathBuf::from("/work/backend"), PathBuf::from("/work/engine")]
        );
    }
}
