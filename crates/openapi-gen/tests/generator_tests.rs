use openapi_gen::{
    error::{FailureSubject, InterceptorError},
    registry::{ControllerDef, EndpointDef, FieldDef, ParamDef, TypeDef},
    specification::{HttpMethod, Operation, Parameter, RequestBody, Schema},
    ApiInfo, GeneratorConfig, InterceptorResult, OpenApiError, OpenApiGenerator, OpenApiUtils,
    OperationInterceptor, OperationParameterInterceptor, OutputFormat, RequestBodyInterceptor,
    SchemaFieldInterceptor, SchemaInterceptor, TypeDescriptor, TypeRegistry,
};
use openapi_gen::utils::ValidationLevel;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn petstore() -> TypeRegistry {
    TypeRegistry::from_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/petstore.yaml"
    ))
    .unwrap()
}

fn generator(registry: TypeRegistry) -> OpenApiGenerator {
    OpenApiGenerator::new(
        registry,
        vec!["app::model".to_string()],
        vec!["app::web".to_string()],
    )
    .with_info(ApiInfo::new("Pet Store", "1.0.0").with_description("Pet store API"))
}

fn schema_json(schema: &Schema) -> serde_json::Value {
    serde_json::to_value(schema).unwrap()
}

#[test]
fn test_generates_schemas_and_paths() {
    let mut generator = generator(petstore());
    let spec = generator.generate().unwrap();

    assert_eq!(spec.openapi, "3.0.3");
    assert_eq!(spec.info.description.as_deref(), Some("Pet store API"));

    let names: Vec<_> = spec.schemas().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Category", "Circle", "Drawing", "Entity", "Page_Pet", "Pet", "PetStatus", "Shape",
            "Square",
        ]
    );

    assert_eq!(
        schema_json(spec.schema("Pet").unwrap()),
        json!({
            "description": "A pet for sale",
            "allOf": [
                { "$ref": "#/components/schemas/Entity" },
                {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1, "maxLength": 40 },
                        "status": { "$ref": "#/components/schemas/PetStatus" },
                        "category": {
                            "description": "Category of the pet",
                            "nullable": true,
                            "allOf": [{ "$ref": "#/components/schemas/Category" }]
                        },
                        "tags": {
                            "type": "array",
                            "items": { "type": "string" },
                            "uniqueItems": true
                        },
                        "attributes": {
                            "type": "object",
                            "additionalProperties": { "type": "object" }
                        },
                        "weight": { "type": "number", "format": "float", "minimum": 0.0 },
                        "legacyCode": { "type": "string", "nullable": true, "deprecated": true },
                        "age": { "type": "integer", "format": "int32", "minimum": 0.0 }
                    },
                    "required": ["name", "status", "tags", "attributes", "weight", "age"]
                }
            ]
        })
    );

    assert_eq!(
        schema_json(spec.schema("Entity").unwrap()),
        json!({
            "description": "Base of every persisted model",
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "createdAt": { "type": "string", "format": "date-time" }
            },
            "required": ["id", "createdAt"]
        })
    );

    let paths: Vec<_> = spec.paths.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["/drawings", "/pets", "/pets/{petId}"]);

    let list = spec.operation("/pets", HttpMethod::Get).unwrap();
    assert_eq!(list.tags, vec!["PetController"]);
    assert_eq!(list.summary.as_deref(), Some("List pets"));
    let page = list.responses["200"].content["application/json"]
        .schema
        .as_ref()
        .unwrap();
    assert_eq!(page.referenced_name(), Some("Page_Pet"));

    let delete = spec.operation("/pets/{petId}", HttpMethod::Delete).unwrap();
    assert_eq!(delete.deprecated, Some(true));
    assert_eq!(delete.parameters[0].name, "petId");
    assert_eq!(delete.parameters[0].schema, Some(Schema::typed("string")));
    assert_eq!(delete.responses["200"].description, "Successful operation");

    let errors: Vec<_> = OpenApiUtils::validate_spec(spec)
        .into_iter()
        .filter(|w| w.level == ValidationLevel::Error)
        .collect();
    assert!(errors.is_empty(), "{:?}", errors);
}

#[test]
fn test_cyclic_types_produce_one_schema_each() {
    let mut generator = generator(petstore());
    let spec = generator.generate().unwrap();

    let category = spec.schema("Category").unwrap();
    assert_eq!(
        schema_json(category),
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "parent": {
                    "nullable": true,
                    "allOf": [{ "$ref": "#/components/schemas/Category" }]
                },
                "children": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Category" }
                }
            },
            "required": ["name", "children"]
        })
    );
}

#[test]
fn test_polymorphic_types_render_as_discriminated_unions() {
    let mut generator = generator(petstore());
    let spec = generator.generate().unwrap();

    let shape = spec.schema("Shape").unwrap();
    let discriminator = shape.discriminator.as_ref().unwrap();
    assert_eq!(discriminator.property_name, "shapeType");
    assert_eq!(
        discriminator.mapping.values().map(String::as_str).collect::<Vec<_>>(),
        vec!["#/components/schemas/Circle", "#/components/schemas/Square"]
    );
    assert_eq!(shape.required, vec!["color", "shapeType"]);

    let circle = spec.schema("Circle").unwrap();
    assert_eq!(circle.all_of[0].referenced_name(), Some("Shape"));

    let shapes = &spec.schema("Drawing").unwrap().properties["shapes"];
    let variants: Vec<_> = shapes
        .items
        .as_ref()
        .unwrap()
        .one_of
        .iter()
        .filter_map(|s| s.referenced_name())
        .collect();
    assert_eq!(variants, vec!["Circle", "Square"]);
}

#[test]
fn test_generation_is_deterministic() {
    let mut first = generator(petstore());
    let mut second = generator(petstore());
    first.generate().unwrap();
    second.generate().unwrap();

    let json = first.export_json(true).unwrap();
    assert_eq!(json, second.export_json(true).unwrap());

    // a second call on the same generator starts from a fresh context
    first.generate().unwrap();
    assert_eq!(json, first.export_json(true).unwrap());
}

#[test]
fn test_empty_packages_yield_empty_document() {
    let mut generator = OpenApiGenerator::new(petstore(), Vec::new(), Vec::new())
        .with_info(ApiInfo::new("Empty", "0.1.0"));
    let spec = generator.generate().unwrap();

    assert_eq!(
        serde_json::to_value(spec).unwrap(),
        json!({
            "openapi": "3.0.3",
            "info": { "title": "Empty", "version": "0.1.0" },
            "paths": {},
            "components": { "schemas": {} }
        })
    );
}

#[test]
fn test_unknown_and_malformed_packages_are_not_errors() {
    let mut generator = OpenApiGenerator::new(
        petstore(),
        vec!["com.example.nothing".to_string(), "app model".to_string()],
        vec!["app::nowhere::*".to_string()],
    );
    let spec = generator.generate().unwrap();
    assert!(spec.paths.is_empty());
    assert_eq!(spec.schemas().count(), 0);
}

#[test]
fn test_global_headers_first_registration_wins() {
    let mut generator = generator(petstore());
    generator.add_global_header("Test-Global-Header", "Some desc", false);
    generator.add_global_header("Test-Global-Header", "Other desc", true);
    generator.add_global_header("x-request-id", "Correlation id", true);

    let spec = generator.generate().unwrap();
    for item in spec.paths.values() {
        for (_, operation) in item.operations() {
            let header = operation
                .parameters
                .iter()
                .find(|p| p.name == "Test-Global-Header")
                .unwrap();
            assert_eq!(header.location, "header");
            assert_eq!(header.description.as_deref(), Some("Some desc"));
            assert_eq!(header.required, Some(false));
        }
    }

    // the declared X-Request-Id header is kept as declared
    let create = spec.operation("/pets", HttpMethod::Post).unwrap();
    let request_ids: Vec<_> = create
        .parameters
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case("x-request-id"))
        .collect();
    assert_eq!(request_ids.len(), 1);
    assert_eq!(request_ids[0].required, Some(false));
    assert_eq!(request_ids[0].description, None);
}

#[test]
fn test_examples_come_from_resolver_when_enabled() {
    let config = GeneratorConfig::new()
        .with_generate_examples(true)
        .with_example_resolver(|key: &str| Some(format!("TestExampleResolvedWithKey={}", key)));
    let mut generator = generator(petstore()).with_config(config);
    let spec = generator.generate().unwrap();

    let pet = &spec.schema("Pet").unwrap().all_of[1];
    assert_eq!(
        pet.properties["name"].example,
        Some(json!("TestExampleResolvedWithKey=Pet.name"))
    );
    assert_eq!(pet.properties["age"].example, Some(json!(3)));
    assert_eq!(pet.properties["status"].example, None);
    assert_eq!(pet.properties["category"].example, None);

    let entity = spec.schema("Entity").unwrap();
    assert_eq!(
        entity.properties["id"].example,
        Some(json!("TestExampleResolvedWithKey=Entity.id"))
    );
}

#[test]
fn test_no_examples_when_disabled() {
    let config = GeneratorConfig::new()
        .with_example_resolver(|key: &str| Some(format!("TestExampleResolvedWithKey={}", key)));
    let mut generator = generator(petstore()).with_config(config);
    let spec = generator.generate().unwrap();

    for (_, schema) in spec.schemas() {
        schema.walk(&mut |node| assert!(node.example.is_none()));
    }
}

#[derive(Clone, Default)]
struct Recording {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl OperationInterceptor for Recording {
    fn intercept(
        &self,
        _controller: &ControllerDef,
        endpoint: &EndpointDef,
        operation: &mut Operation,
    ) -> InterceptorResult {
        self.push(format!("operation:{}", endpoint.name));
        operation.description = Some("Intercepted operation".to_string());
        Ok(())
    }
}

impl OperationParameterInterceptor for Recording {
    fn intercept(
        &self,
        _controller: &ControllerDef,
        endpoint: &EndpointDef,
        param: &ParamDef,
        parameter: &mut Parameter,
    ) -> InterceptorResult {
        self.push(format!("parameter:{}:{}", endpoint.name, param.name));
        parameter.description = Some("Intercepted parameter".to_string());
        Ok(())
    }
}

impl RequestBodyInterceptor for Recording {
    fn intercept(
        &self,
        _controller: &ControllerDef,
        endpoint: &EndpointDef,
        param: &ParamDef,
        body: &mut RequestBody,
    ) -> InterceptorResult {
        self.push(format!("body:{}:{}", endpoint.name, param.name));
        body.description = Some("Intercepted request body".to_string());
        Ok(())
    }
}

impl SchemaFieldInterceptor for Recording {
    fn intercept(
        &self,
        owner: &TypeDescriptor,
        field: &FieldDef,
        _schema: &mut Schema,
    ) -> InterceptorResult {
        self.push(format!(
            "field:{}.{}",
            owner.schema_name.as_deref().unwrap_or_default(),
            field.name
        ));
        Ok(())
    }
}

impl SchemaInterceptor for Recording {
    fn intercept(&self, ty: &TypeDescriptor, schema: &mut Schema) -> InterceptorResult {
        self.push(format!("schema:{}", ty.schema_name.as_deref().unwrap_or_default()));
        schema.title = Some("Intercepted schema".to_string());
        Ok(())
    }
}

#[test]
fn test_interceptors_run_in_fixed_order() {
    let recording = Recording::default();
    let mut generator = generator(petstore());
    generator.add_operation_interceptor(recording.clone());
    generator.add_operation_parameter_interceptor(recording.clone());
    generator.add_request_body_interceptor(recording.clone());
    generator.add_schema_field_interceptor(recording.clone());
    generator.add_schema_interceptor(recording.clone());

    let spec = generator.generate().unwrap();

    let create: Vec<_> = recording
        .entries()
        .into_iter()
        .filter(|e| e.contains("createPet"))
        .collect();
    assert_eq!(
        create,
        vec![
            "operation:createPet",
            "parameter:createPet:X-Request-Id",
            "body:createPet:pet",
        ]
    );

    let tag_fields: Vec<_> = recording
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("field:Category.") || e == "schema:Category")
        .collect();
    assert_eq!(
        tag_fields,
        vec![
            "field:Category.name",
            "field:Category.parent",
            "field:Category.children",
            "schema:Category",
        ]
    );

    let create = spec.operation("/pets", HttpMethod::Post).unwrap();
    assert_eq!(create.description.as_deref(), Some("Intercepted operation"));
    assert_eq!(
        create.parameters[0].description.as_deref(),
        Some("Intercepted parameter")
    );
    assert_eq!(
        create.request_body.as_ref().unwrap().description.as_deref(),
        Some("Intercepted request body")
    );
    assert_eq!(
        spec.schema("Category").unwrap().title.as_deref(),
        Some("Intercepted schema")
    );
}

struct FailingFor(&'static str);

impl OperationInterceptor for FailingFor {
    fn intercept(
        &self,
        _controller: &ControllerDef,
        endpoint: &EndpointDef,
        _operation: &mut Operation,
    ) -> InterceptorResult {
        if endpoint.name == self.0 {
            return Err(InterceptorError::new("operation rejected"));
        }
        Ok(())
    }
}

impl SchemaInterceptor for FailingFor {
    fn intercept(&self, ty: &TypeDescriptor, _schema: &mut Schema) -> InterceptorResult {
        if ty.schema_name.as_deref() == Some(self.0) {
            return Err(InterceptorError::new("schema rejected"));
        }
        Ok(())
    }
}

#[test]
fn test_interceptor_failures_are_isolated() {
    let mut generator = generator(petstore());
    generator.add_operation_interceptor(FailingFor("deletePet"));
    generator.add_schema_interceptor(FailingFor("PetStatus"));

    let err = generator.generate().unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(report.failures.len(), 2);

    let endpoint = report.failed_endpoints().next().unwrap();
    assert_eq!(
        endpoint.subject,
        FailureSubject::Endpoint {
            controller: "app::web::PetController".to_string(),
            endpoint: "deletePet".to_string(),
            method: "DELETE".to_string(),
            path: "/pets/{petId}".to_string(),
        }
    );
    assert!(endpoint.message.contains("operation rejected"));

    let schema = report.failed_schemas().next().unwrap();
    assert_eq!(
        schema.subject,
        FailureSubject::Schema {
            name: "PetStatus".to_string(),
            field: None,
        }
    );

    let partial = generator.specification().unwrap();
    assert!(partial.operation("/pets/{petId}", HttpMethod::Get).is_some());
    assert!(partial.operation("/pets/{petId}", HttpMethod::Delete).is_none());
    assert!(partial.schema("PetStatus").is_none());
    assert!(partial.schema("Pet").is_some());
}

#[test]
fn test_unsupported_types_fail_only_their_owner() {
    let registry = TypeRegistry::new()
        .with_type(
            TypeDef::object("app::model::Job")
                .field(FieldDef::new("name", "String"))
                .field(FieldDef::new("callback", "fn(i32) -> i32"))
                .field(FieldDef::new("pair", "(i32, i32)")),
        )
        .with_controller(
            ControllerDef::new("app::web::JobController")
                .endpoint(
                    EndpointDef::new("run", "POST", "/jobs")
                        .param(ParamDef::query("hook", "fn()")),
                )
                .endpoint(EndpointDef::new("list", "GET", "/jobs").returns("200", "Vec<Job>")),
        );
    let mut generator = generator(registry);

    let err = generator.generate().unwrap_err();
    let OpenApiError::Generation(report) = &err else {
        panic!("unexpected error {:?}", err);
    };
    assert_eq!(report.failed_schemas().count(), 2);
    assert_eq!(report.failed_endpoints().count(), 1);
    assert!(err.to_string().contains("3 error(s)"));

    let partial = generator.specification().unwrap();
    let job = partial.schema("Job").unwrap();
    assert_eq!(job.properties.keys().collect::<Vec<_>>(), vec!["name"]);
    assert!(partial.operation("/jobs", HttpMethod::Get).is_some());
    assert!(partial.operation("/jobs", HttpMethod::Post).is_none());
}

#[test]
fn test_written_document_matches_generated_one() {
    let mut generator = generator(petstore());
    generator.generate().unwrap();
    let spec = generator.specification().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("target").join("openapi");
    let path = OpenApiUtils::write_spec(spec, &output, OutputFormat::Json).unwrap();
    assert!(path.ends_with("swagger.json"));

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"/pets/{petId}\""));
    assert_eq!(&OpenApiUtils::load_spec_from_file(&path).unwrap(), spec);
}
