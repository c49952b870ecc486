use std::fmt;
use thiserror::Error;

/// Result type for OpenAPI operations
pub type OpenApiResult<T> = Result<T, OpenApiError>;

/// Errors that can occur during OpenAPI generation
#[derive(Debug, Error)]
pub enum OpenApiError {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A type expression could not be parsed
    #[error(transparent)]
    TypeSyntax(#[from] TypeSyntaxError),

    /// A type cannot be mapped to any OpenAPI primitive or structure
    #[error("Unsupported type `{type_name}`: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    /// A registered interceptor failed
    #[error("Interceptor failed for {subject}: {source}")]
    Interceptor {
        subject: String,
        #[source]
        source: InterceptorError,
    },

    /// Malformed package prefix
    #[error("Invalid package pattern `{0}`")]
    Scan(String),

    /// Type or controller registry error
    #[error("Registry error: {0}")]
    Registry(String),

    /// Schema generation error
    #[error("Schema generation error: {0}")]
    Schema(String),

    /// Endpoint to operation conversion error
    #[error("Operation error: {0}")]
    Operation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more schemas or endpoints failed to generate
    #[error("{0}")]
    Generation(GenerationReport),
}

impl OpenApiError {
    /// Create a new unsupported type error
    pub fn unsupported_type<T: ToString, R: ToString>(type_name: T, reason: R) -> Self {
        Self::UnsupportedType {
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Wrap an interceptor failure with the node it was invoked for
    pub fn interceptor<T: ToString>(subject: T, source: InterceptorError) -> Self {
        Self::Interceptor {
            subject: subject.to_string(),
            source,
        }
    }

    /// Create a new registry error
    pub fn registry_error<T: ToString>(msg: T) -> Self {
        Self::Registry(msg.to_string())
    }

    /// Create a new schema generation error
    pub fn schema_error<T: ToString>(msg: T) -> Self {
        Self::Schema(msg.to_string())
    }

    /// Create a new operation error
    pub fn operation_error<T: ToString>(msg: T) -> Self {
        Self::Operation(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config_error<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Returns the aggregated report when this is a generation failure
    pub fn report(&self) -> Option<&GenerationReport> {
        match self {
            Self::Generation(report) => Some(report),
            _ => None,
        }
    }
}

/// Failure raised by a user supplied interceptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InterceptorError {
    message: String,
}

impl InterceptorError {
    pub fn new<T: ToString>(message: T) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A type expression that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid type expression `{input}` at offset {offset}: {message}")]
pub struct TypeSyntaxError {
    pub input: String,
    pub offset: usize,
    pub message: String,
}

/// What a generation failure belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSubject {
    /// A named schema, optionally narrowed to one of its fields
    Schema { name: String, field: Option<String> },
    /// A controller endpoint
    Endpoint {
        controller: String,
        endpoint: String,
        method: String,
        path: String,
    },
}

impl fmt::Display for FailureSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { name, field: None } => write!(f, "schema {}", name),
            Self::Schema {
                name,
                field: Some(field),
            } => write!(f, "schema {}.{}", name, field),
            Self::Endpoint {
                controller,
                endpoint,
                method,
                path,
            } => write!(f, "endpoint {}::{} ({} {})", controller, endpoint, method, path),
        }
    }
}

/// A single isolated failure recorded while generating a document
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub subject: FailureSubject,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(subject: FailureSubject, error: &OpenApiError) -> Self {
        Self {
            subject,
            message: error.to_string(),
        }
    }

    /// Failure of a whole schema definition
    pub fn schema(name: &str, error: &OpenApiError) -> Self {
        Self::new(
            FailureSubject::Schema {
                name: name.to_string(),
                field: None,
            },
            error,
        )
    }

    /// Failure of a single field within a schema definition
    pub fn field(name: &str, field: &str, error: &OpenApiError) -> Self {
        Self::new(
            FailureSubject::Schema {
                name: name.to_string(),
                field: Some(field.to_string()),
            },
            error,
        )
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Aggregated failures of one `generate` call
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub failures: Vec<GenerationFailure>,
}

impl GenerationReport {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures that belong to endpoints
    pub fn failed_endpoints(&self) -> impl Iterator<Item = &GenerationFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.subject, FailureSubject::Endpoint { .. }))
    }

    /// Failures that belong to schemas or schema fields
    pub fn failed_schemas(&self) -> impl Iterator<Item = &GenerationFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.subject, FailureSubject::Schema { .. }))
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenAPI generation failed with {} error(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {}", failure)?;
        }
        Ok(())
    }
}
