use crate::{
    config::{GeneratorConfig, GlobalHeader},
    endpoints::{endpoint_subject, OperationBuilder},
    error::{GenerationFailure, GenerationReport, OpenApiError, OpenApiResult},
    interceptors::{
        Interceptors, OperationInterceptor, OperationParameterInterceptor,
        RequestBodyInterceptor, SchemaFieldInterceptor, SchemaInterceptor,
    },
    registry::{PackagePattern, TypeRegistry},
    schema::SchemaGenerator,
    specification::{ApiInfo, Components, OpenApiSpec, PathItem},
};
use indexmap::IndexMap;

/// Main OpenAPI specification generator
pub struct OpenApiGenerator {
    registry: TypeRegistry,
    model_packages: Vec<String>,
    controller_packages: Vec<String>,
    info: ApiInfo,
    config: GeneratorConfig,
    interceptors: Interceptors,
    /// First registration of a name wins
    global_headers: IndexMap<String, GlobalHeader>,
    /// Generated specification
    spec: Option<OpenApiSpec>,
}

impl OpenApiGenerator {
    /// Create a generator over the types under `model_packages` and the
    /// controllers under `controller_packages`.
    pub fn new(
        registry: TypeRegistry,
        model_packages: Vec<String>,
        controller_packages: Vec<String>,
    ) -> Self {
        Self {
            registry,
            model_packages,
            controller_packages,
            info: ApiInfo::default(),
            config: GeneratorConfig::default(),
            interceptors: Interceptors::default(),
            global_headers: IndexMap::new(),
            spec: None,
        }
    }

    pub fn with_info(mut self, info: ApiInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_schema_interceptor<I: SchemaInterceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.schema.push(Box::new(interceptor));
    }

    pub fn add_schema_field_interceptor<I: SchemaFieldInterceptor + 'static>(
        &mut self,
        interceptor: I,
    ) {
        self.interceptors.schema_field.push(Box::new(interceptor));
    }

    pub fn add_operation_interceptor<I: OperationInterceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.operation.push(Box::new(interceptor));
    }

    pub fn add_operation_parameter_interceptor<I: OperationParameterInterceptor + 'static>(
        &mut self,
        interceptor: I,
    ) {
        self.interceptors
            .operation_parameter
            .push(Box::new(interceptor));
    }

    pub fn add_request_body_interceptor<I: RequestBodyInterceptor + 'static>(
        &mut self,
        interceptor: I,
    ) {
        self.interceptors.request_body.push(Box::new(interceptor));
    }

    /// Add a header parameter to every operation. Registering a name again
    /// keeps the first registration; an empty description is left out.
    pub fn add_global_header(&mut self, name: &str, description: &str, required: bool) {
        if self.global_headers.contains_key(name) {
            tracing::debug!("Global header '{}' already registered, keeping the first", name);
            return;
        }
        self.global_headers.insert(
            name.to_string(),
            GlobalHeader {
                description: (!description.is_empty()).then(|| description.to_string()),
                required,
            },
        );
    }

    /// Generate the document with the generator's configuration
    pub fn generate(&mut self) -> OpenApiResult<&OpenApiSpec> {
        let config = self.config.clone();
        self.generate_with(&config)
    }

    /// Generate the document with an alternate configuration.
    ///
    /// Every call starts from an empty resolution context. Failing schemas,
    /// fields and endpoints are left out; if any failed, the partial document
    /// is kept (see [`OpenApiGenerator::specification`]) and the failures are
    /// returned as [`OpenApiError::Generation`].
    pub fn generate_with(&mut self, config: &GeneratorConfig) -> OpenApiResult<&OpenApiSpec> {
        let (spec, failures) = self.build(config);

        tracing::info!(
            "Generated OpenAPI document: {} path(s), {} schema(s), {} failure(s)",
            spec.paths.len(),
            spec.schemas().count(),
            failures.len()
        );

        let spec = self.spec.insert(spec);
        let report = GenerationReport { failures };
        if report.is_empty() {
            Ok(spec)
        } else {
            Err(OpenApiError::Generation(report))
        }
    }

    fn build(&self, config: &GeneratorConfig) -> (OpenApiSpec, Vec<GenerationFailure>) {
        let mut spec = OpenApiSpec::with_info(&config.openapi_version, self.info.clone());
        let mut schemas = SchemaGenerator::new(&self.registry, config, &self.interceptors);

        let type_names: Vec<&str> = self.registry.types().map(|d| d.name.as_str()).collect();
        log_empty_packages(&self.model_packages, &type_names, "model types");
        for def in self.registry.scan_types(&self.model_packages) {
            schemas.define(def);
        }

        let controller_names: Vec<&str> =
            self.registry.controllers().map(|c| c.name.as_str()).collect();
        log_empty_packages(&self.controller_packages, &controller_names, "controllers");
        let operations = OperationBuilder::new(&self.interceptors, &self.global_headers);
        for controller in self.registry.scan_controllers(&self.controller_packages) {
            for endpoint in &controller.endpoints {
                let subject = endpoint_subject(controller, endpoint);
                let built = match operations.build(&mut schemas, controller, endpoint) {
                    Ok(built) => built,
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", subject, e);
                        schemas.record(GenerationFailure::new(subject, &e));
                        continue;
                    }
                };

                let item = spec.paths.entry(built.path.clone()).or_insert_with(PathItem::default);
                if !item.try_insert(built.method, built.operation) {
                    let e = OpenApiError::operation_error(format!(
                        "Duplicate operation {} {}",
                        built.method, built.path
                    ));
                    tracing::warn!("Skipping {}: {}", subject, e);
                    schemas.record(GenerationFailure::new(subject, &e));
                }
            }
        }
        spec.paths.sort_keys();

        let (component_schemas, failures) = schemas.finish();
        spec.components = Some(Components {
            schemas: component_schemas,
        });
        (spec, failures)
    }

    /// Export specification as JSON
    pub fn export_json(&self, pretty: bool) -> OpenApiResult<String> {
        let spec = self.spec.as_ref().ok_or_else(|| {
            OpenApiError::config_error("No specification generated yet. Call generate() first.")
        })?;

        if pretty {
            serde_json::to_string_pretty(spec).map_err(OpenApiError::from)
        } else {
            serde_json::to_string(spec).map_err(OpenApiError::from)
        }
    }

    /// Export specification as YAML
    pub fn export_yaml(&self) -> OpenApiResult<String> {
        let spec = self.spec.as_ref().ok_or_else(|| {
            OpenApiError::config_error("No specification generated yet. Call generate() first.")
        })?;

        serde_yaml::to_string(spec).map_err(OpenApiError::from)
    }

    /// Get the last generated specification
    pub fn specification(&self) -> Option<&OpenApiSpec> {
        self.spec.as_ref()
    }
}

/// Well-formed prefixes that select nothing are not an error
fn log_empty_packages(packages: &[String], names: &[&str], kind: &str) {
    if packages.is_empty() {
        tracing::debug!("No {} packages configured", kind);
        return;
    }
    for package in packages {
        // malformed prefixes are reported by the scan itself
        let Ok(pattern) = PackagePattern::parse(package) else {
            continue;
        };
        if !names.iter().any(|name| pattern.matches(name)) {
            tracing::debug!("No {} found under package '{}'", kind, package);
        }
    }
}
