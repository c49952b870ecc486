/*!
# openapi-gen

OpenAPI 3.0 document generation from registered model types and controllers.

Models and controllers are described in a [`TypeRegistry`] (explicitly, via
[`register_type!`]/[`register_controller!`] or from a JSON/YAML/TOML
descriptor file). The generator scans the registry by package prefix, builds
one named schema per distinct type (generic instantiations included, cycles
cut with `$ref`s) and one operation per endpoint, and runs the registered
interceptors on the result.

## Usage

```rust,no_run
use openapi_gen::{ApiInfo, GeneratorConfig, OpenApiGenerator, TypeRegistry};

let registry = TypeRegistry::from_file("registry.yaml").unwrap();
let mut generator = OpenApiGenerator::new(
    registry,
    vec!["app::model".to_string()],
    vec!["app::web".to_string()],
)
.with_info(ApiInfo::new("Pet Store", "1.0.0"))
.with_config(
    GeneratorConfig::new()
        .with_generate_examples(true)
        .with_example_resolver(|key: &str| Some(format!("example for {}", key))),
);

generator.add_global_header("X-Request-Id", "Correlation id", false);
let spec = generator.generate().unwrap();
```
*/

// Re-export main types
pub use crate::{
    config::{GeneratorConfig, GeneratorSettings, GlobalHeader},
    error::{GenerationFailure, GenerationReport, OpenApiError, OpenApiResult},
    examples::ExampleResolver,
    generator::OpenApiGenerator,
    interceptors::{
        InterceptorResult, OperationInterceptor, OperationParameterInterceptor,
        RequestBodyInterceptor, SchemaFieldInterceptor, SchemaInterceptor,
    },
    registry::TypeRegistry,
    resolver::{TypeDescriptor, TypeKind, TypeResolver},
    schema::SchemaGenerator,
    specification::{ApiInfo, OpenApiSpec},
    type_ref::TypeRef,
    utils::{OpenApiUtils, OutputFormat},
};

// Used by the registration macros
#[doc(hidden)]
pub use inventory;

// Core modules
pub mod config;
pub mod error;
pub mod generator;
pub mod specification;

// Type model
pub mod registry;
pub mod resolver;
pub mod type_ref;

// Schema and operation generation
pub mod endpoints;
pub mod examples;
pub mod interceptors;
pub mod schema;

#[macro_use]
mod macros;

// Utilities
pub mod utils;

// Test utilities
#[cfg(test)]
mod test_utils;
