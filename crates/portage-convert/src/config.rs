//! Conversion settings.

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::ProjectLayout;
use crate::python::DEFAULT_FRAMEWORK_NAMES;
use crate::segment::{DEFAULT_MAX_LINES, DEFAULT_SEPARATOR};
use crate::typescript::SchemaImportRules;

/// Command-line and environment configuration of a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ConvertConfig {
    /// Root of the Python backend repository.
    #[cfg_attr(feature = "config", arg(long, env = "PORTAGE_BACKEND"))]
    pub backend: PathBuf,

    /// Root of the TypeScript frontend repository.
    #[cfg_attr(feature = "config", arg(long, env = "PORTAGE_FRONTEND"))]
    pub frontend: PathBuf,

    /// Root of the Python engine package, searched for imported classes.
    #[serde(default)]
    #[cfg_attr(feature = "config", arg(long, env = "PORTAGE_ENGINE"))]
    pub engine: Option<PathBuf>,

    /// Convert without writing any file.
    #[serde(default)]
    #[cfg_attr(feature = "config", arg(long, env = "PORTAGE_DRY_RUN"))]
    pub dry_run: bool,

    /// Maximum number of lines sent to the model per schema segment.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PORTAGE_MAX_LINES_PER_SEGMENT", default_value_t = DEFAULT_MAX_LINES)
    )]
    pub max_lines_per_segment: usize,

    /// Send the classes an endpoint signature uses along with it.
    #[serde(default)]
    #[cfg_attr(feature = "config", arg(long, env = "PORTAGE_API_DEPENDENCIES"))]
    pub api_dependencies: bool,

    /// Python package of the shared engine.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PORTAGE_ENGINE_PACKAGE", default_value = "engine")
    )]
    pub engine_package: String,

    /// Engine names re-imported by generated types.
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PORTAGE_ENGINE_QUALIFIERS", value_delimiter = ',')
    )]
    pub engine_qualifiers: Vec<String>,

    /// Backend names never imported by generated types.
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PORTAGE_EXCLUDED_QUALIFIERS", value_delimiter = ',')
    )]
    pub excluded_qualifiers: Vec<String>,

    /// Annotation names that are framework wiring and never resolved.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "PORTAGE_FRAMEWORK_ANNOTATIONS",
            value_delimiter = ',',
            default_values = DEFAULT_FRAMEWORK_NAMES
        )
    )]
    pub framework_annotations: Vec<String>,
}

impl ConvertConfig {
    /// Creates a configuration with default settings for the given roots.
    pub fn new(backend: impl Into<PathBuf>, frontend: impl Into<PathBuf>) -> Self {
        let defaults = ConvertOptions::default();
        Self {
            backend: backend.into(),
            frontend: frontend.into(),
            engine: None,
            dry_run: defaults.dry_run,
            max_lines_per_segment: defaults.max_lines_per_segment,
            api_dependencies: defaults.with_dependencies,
            engine_package: defaults.import_rules.engine_package,
            engine_qualifiers: defaults.import_rules.engine_qualifiers,
            excluded_qualifiers: defaults.import_rules.excluded_qualifiers,
            framework_annotations: defaults.framework_names,
        }
    }

    /// Repository roots.
    pub fn layout(&self) -> ProjectLayout {
        let layout = ProjectLayout::new(&self.backend, &self.frontend);
        match &self.engine {
            Some(engine) => layout.with_engine(engine),
            None => layout,
        }
    }

    /// Settings shared by the conversion workers.
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            dry_run: self.dry_run,
            max_lines_per_segment: self.max_lines_per_segment,
            with_dependencies: self.api_dependencies,
            import_rules: SchemaImportRules {
                engine_package: self.engine_package.clone(),
                engine_qualifiers: self.engine_qualifiers.clone(),
                excluded_qualifiers: self.excluded_qualifiers.clone(),
                ..SchemaImportRules::default()
            },
            framework_names: self.framework_annotations.clone(),
            ..ConvertOptions::default()
        }
    }
}

/// Settings read by the conversion workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Skip writing generated files.
    pub dry_run: bool,
    /// Line budget of a schema segment.
    pub max_lines_per_segment: usize,
    /// Separators schema sources are cut at, the first one is used.
    pub separators: Vec<String>,
    /// Resolve the classes used by endpoint signatures.
    pub with_dependencies: bool,
    /// Schema import rewriting rules.
    pub import_rules: SchemaImportRules,
    /// Annotation names skipped during dependency resolution.
    pub framework_names: Vec<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_lines_per_segment: DEFAULT_MAX_LINES,
            separators: vec![DEFAULT_SEPARATOR.to_owned()],
            with_dependencies: false,
            import_rules: SchemaImportRules::default(),
            framework_names: DEFAULT_FRAMEWORK_NAMES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_carry_import_rules() {
        let mut config = ConvertConfig::new("/b", "/f");
        config.engine_qualifiers = vec!["ProjectPublicity".into()];
        config.dry_run = true;

        let options = config.options();
        assert!(options.dry_run);
        assert_eq!(options.import_rules.engine_qualifiers, vec!["ProjectPublicity"]);
        assert_eq!(options.import_rules.types_dir, PathBuf::from("types"));
        assert_eq!(options.framework_names, vec!["BackgroundTasks", "Depends", "Session"]);
    }

    #[test]
    fn layout_includes_engine() {
        let mut config = ConvertConfig::new("/b", "/f");
        assert_eq!(config.layout().python_roots(), vec![PathBuf::from("/b")]);

        config.engine = Some("/e".into());
        assert_eq!(
            config.layout().python_roots(),
            vec![PathBuf::from("/b"), PathBuf::from("/e")]
        );
    }
}
