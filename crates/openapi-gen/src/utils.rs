/*!
Utility functions for OpenAPI documents: writing, loading and validation.
*/

use crate::{
    endpoints::extract_path_parameters,
    error::{OpenApiError, OpenApiResult},
    specification::{OpenApiSpec, Operation, Schema},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Utility functions for OpenAPI operations
pub struct OpenApiUtils;

impl OpenApiUtils {
    /// Write the document as `swagger.json` or `swagger.yaml` inside
    /// `output_dir`, creating the directory if needed.
    pub fn write_spec<P: AsRef<Path>>(
        spec: &OpenApiSpec,
        output_dir: P,
        format: OutputFormat,
    ) -> OpenApiResult<PathBuf> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let path = output_dir.join(format.file_name());
        Self::save_spec_to_file(spec, &path, format, true)?;

        tracing::info!("Wrote OpenAPI document to {}", path.display());
        Ok(path)
    }

    /// Save OpenAPI specification to file
    pub fn save_spec_to_file<P: AsRef<Path>>(
        spec: &OpenApiSpec,
        path: P,
        format: OutputFormat,
        pretty: bool,
    ) -> OpenApiResult<()> {
        let content = match format {
            OutputFormat::Json => {
                if pretty {
                    serde_json::to_string_pretty(spec)?
                } else {
                    serde_json::to_string(spec)?
                }
            }
            OutputFormat::Yaml => serde_yaml::to_string(spec)?,
        };

        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Load OpenAPI specification from file
    pub fn load_spec_from_file<P: AsRef<Path>>(path: P) -> OpenApiResult<OpenApiSpec> {
        let content = fs::read_to_string(path.as_ref())?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "json" => serde_json::from_str(&content).map_err(OpenApiError::from),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(OpenApiError::from),
            _ => {
                // Try to detect format from content
                if content.trim_start().starts_with('{') {
                    serde_json::from_str(&content).map_err(OpenApiError::from)
                } else {
                    serde_yaml::from_str(&content).map_err(OpenApiError::from)
                }
            }
        }
    }

    /// Validate an OpenAPI specification
    pub fn validate_spec(spec: &OpenApiSpec) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if spec.info.title.is_empty() {
            warnings.push(ValidationWarning::new(
                "info.title is required but empty",
                ValidationLevel::Error,
            ));
        }

        if spec.info.version.is_empty() {
            warnings.push(ValidationWarning::new(
                "info.version is required but empty",
                ValidationLevel::Error,
            ));
        }

        if !spec.openapi.starts_with("3.0") {
            warnings.push(ValidationWarning::new(
                &format!("OpenAPI version {} may not be fully supported", spec.openapi),
                ValidationLevel::Warning,
            ));
        }

        for (path, path_item) in &spec.paths {
            if !path.starts_with('/') {
                warnings.push(ValidationWarning::new(
                    &format!("Path '{}' should start with '/'", path),
                    ValidationLevel::Warning,
                ));
            }

            if path_item.operations().next().is_none() {
                warnings.push(ValidationWarning::new(
                    &format!("Path '{}' has no operations defined", path),
                    ValidationLevel::Warning,
                ));
            }

            let placeholders = extract_path_parameters(path);
            for (method, op) in path_item.operations() {
                if op.responses.is_empty() {
                    warnings.push(ValidationWarning::new(
                        &format!("{} {} has no responses defined", method, path),
                        ValidationLevel::Error,
                    ));
                }

                for placeholder in &placeholders {
                    let declared = op
                        .parameters
                        .iter()
                        .any(|p| p.location == "path" && &p.name == placeholder);
                    if !declared {
                        warnings.push(ValidationWarning::new(
                            &format!(
                                "{} {} does not declare path parameter '{}'",
                                method, path, placeholder
                            ),
                            ValidationLevel::Error,
                        ));
                    }
                }
            }
        }

        let referenced = referenced_schemas(spec);
        for name in &referenced {
            if spec.schema(name).is_none() {
                warnings.push(ValidationWarning::new(
                    &format!("Reference to undefined schema '{}'", name),
                    ValidationLevel::Error,
                ));
            }
        }
        for (name, _) in spec.schemas() {
            if !referenced.contains(name.as_str()) {
                warnings.push(ValidationWarning::new(
                    &format!("Schema '{}' is defined but never referenced", name),
                    ValidationLevel::Info,
                ));
            }
        }

        warnings
    }
}

/// Names of every component schema referenced anywhere in the document
fn referenced_schemas(spec: &OpenApiSpec) -> BTreeSet<&str> {
    let mut roots = Vec::new();
    for path_item in spec.paths.values() {
        for (_, op) in path_item.operations() {
            operation_schemas(op, &mut roots);
        }
    }
    roots.extend(spec.schemas().map(|(_, schema)| schema));

    let mut names = BTreeSet::new();
    for schema in roots {
        schema.walk(&mut |node| {
            if let Some(name) = node.referenced_name() {
                names.insert(name);
            }
        });
    }
    names
}

fn operation_schemas<'a>(op: &'a Operation, out: &mut Vec<&'a Schema>) {
    out.extend(op.parameters.iter().filter_map(|p| p.schema.as_ref()));
    let bodies = op.request_body.iter().flat_map(|body| body.content.values());
    let responses = op.responses.values().flat_map(|r| r.content.values());
    out.extend(bodies.chain(responses).filter_map(|media| media.schema.as_ref()));
}

/// Output format for saving specifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// File name of the written document
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Json => "swagger.json",
            Self::Yaml => "swagger.yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OpenApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(OpenApiError::config_error(format!(
                "Unknown output format '{}', expected json or yaml",
                other
            ))),
        }
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

/// Validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub message: String,
    pub level: ValidationLevel,
}

impl ValidationWarning {
    pub fn new(message: &str, level: ValidationLevel) -> Self {
        Self {
            message: message.to_string(),
            level,
        }
    }
}
