use crate::{
    error::OpenApiResult,
    examples::ExampleResolver,
    specification::ApiInfo,
    utils::OutputFormat,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options of a single generation run
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Whether to attach example values to properties
    pub generate_examples: bool,

    /// Supplies example values by key
    pub example_resolver: Option<Arc<dyn ExampleResolver>>,

    /// Whether to mark `Option<T>` fields as `nullable`
    pub nullable_optional: bool,

    /// OpenAPI specification version (should be "3.0.3")
    pub openapi_version: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            generate_examples: false,
            example_resolver: None,
            nullable_optional: true,
            openapi_version: "3.0.3".to_string(),
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("generate_examples", &self.generate_examples)
            .field("example_resolver", &self.example_resolver.is_some())
            .field("nullable_optional", &self.nullable_optional)
            .field("openapi_version", &self.openapi_version)
            .finish()
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generate_examples(mut self, enabled: bool) -> Self {
        self.generate_examples = enabled;
        self
    }

    pub fn with_example_resolver<R: ExampleResolver + 'static>(mut self, resolver: R) -> Self {
        self.example_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_nullable_optional(mut self, enabled: bool) -> Self {
        self.nullable_optional = enabled;
        self
    }

    pub fn with_openapi_version(mut self, version: &str) -> Self {
        self.openapi_version = version.to_string();
        self
    }

    /// The resolver, only when example generation is enabled
    pub fn example_resolver(&self) -> Option<&dyn ExampleResolver> {
        if !self.generate_examples {
            return None;
        }
        self.example_resolver.as_deref()
    }
}

/// A header parameter added to every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalHeader {
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Global header entry of a settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalHeaderSettings {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Settings file for the command line generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Registry descriptor file
    pub registry: Option<PathBuf>,

    /// Package prefixes scanned for model types
    pub model_packages: Vec<String>,

    /// Package prefixes scanned for controllers
    pub controller_packages: Vec<String>,

    /// Directory the document is written to
    pub output_dir: Option<PathBuf>,

    pub format: Option<OutputFormat>,

    pub generate_examples: bool,

    /// JSON object mapping example keys to example values
    pub examples_file: Option<PathBuf>,

    pub info: Option<ApiInfo>,

    pub global_headers: Vec<GlobalHeaderSettings>,
}

impl GeneratorSettings {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> OpenApiResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
