use crate::{
    config::GeneratorConfig,
    error::{GenerationFailure, OpenApiError, OpenApiResult},
    examples,
    interceptors::Interceptors,
    registry::{TypeDef, TypeRegistry},
    resolver::{ObjectShape, ResolvedField, TypeDescriptor, TypeKind, TypeResolver},
    specification::{Discriminator, Schema, SCHEMA_REF_PREFIX},
    type_ref::{TypeRef, MAX_TYPE_DEPTH},
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

/// Schema generator for converting registered types to OpenAPI schemas.
///
/// Holds the state of one generation run: the resolver cache, the component
/// schemas built so far and the identities currently being built. Composite
/// types are emitted as `$ref`s and defined exactly once; a reference to an
/// identity that is still being built is where cycles are cut.
pub struct SchemaGenerator<'a> {
    resolver: TypeResolver<'a>,
    config: &'a GeneratorConfig,
    interceptors: &'a Interceptors,
    /// Generated component schemas
    schemas: IndexMap<String, Schema>,
    in_progress: HashSet<String>,
    /// Definition and type of every named schema being built, outermost first
    building: Vec<(String, TypeRef)>,
    failed: HashSet<String>,
    failures: Vec<GenerationFailure>,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        config: &'a GeneratorConfig,
        interceptors: &'a Interceptors,
    ) -> Self {
        Self {
            resolver: TypeResolver::new(registry),
            config,
            interceptors,
            schemas: IndexMap::new(),
            in_progress: HashSet::new(),
            building: Vec::new(),
            failed: HashSet::new(),
            failures: Vec::new(),
        }
    }

    /// Build the component schema of a registered, non-generic type
    pub fn define(&mut self, def: &TypeDef) {
        let result = self
            .resolver
            .resolve(&TypeRef::named(&def.name), "")
            .and_then(|descriptor| self.ensure_defined(&descriptor));

        if let Err(e) = result {
            tracing::warn!("Skipping type '{}': {}", def.name, e);
            self.failures
                .push(GenerationFailure::schema(def.short_name(), &e));
        }
    }

    /// Schema for a use site of `ty`, written inside `scope`
    pub fn schema_for(&mut self, ty: &TypeRef, scope: &str) -> OpenApiResult<Schema> {
        let descriptor = self.resolver.resolve(ty, scope)?;
        self.schema_for_descriptor(&descriptor)
    }

    /// Schema for a use site of a resolved type
    pub fn schema_for_descriptor(&mut self, descriptor: &TypeDescriptor) -> OpenApiResult<Schema> {
        let mut schema = match &descriptor.kind {
            TypeKind::Primitive(primitive) => primitive.schema(),
            TypeKind::Array { items, unique } => Schema {
                schema_type: Some("array".to_string()),
                items: Some(Box::new(self.schema_for(items, "")?)),
                unique_items: unique.then_some(true),
                ..Default::default()
            },
            TypeKind::Map { value, .. } => Schema {
                schema_type: Some("object".to_string()),
                additional_properties: Some(Box::new(self.schema_for(value, "")?)),
                ..Default::default()
            },
            TypeKind::Enum { .. } | TypeKind::Object(_) => {
                Schema::reference(&self.ensure_defined(descriptor)?)
            }
            TypeKind::Polymorphic {
                discriminator,
                subtypes,
                ..
            } => {
                self.ensure_defined(descriptor)?;
                let mut one_of = Vec::with_capacity(subtypes.len());
                let mut mapping = IndexMap::new();
                for (tag, subtype) in subtypes {
                    let name = self.define_subtype(subtype)?;
                    mapping.insert(tag.clone(), format!("{}{}", SCHEMA_REF_PREFIX, name));
                    one_of.push(Schema::reference(&name));
                }
                Schema {
                    one_of,
                    discriminator: Some(Discriminator {
                        property_name: discriminator.clone(),
                        mapping,
                    }),
                    ..Default::default()
                }
            }
        };

        if descriptor.nullable && self.config.nullable_optional {
            if schema.reference.is_some() {
                schema = Schema {
                    all_of: vec![schema],
                    nullable: Some(true),
                    ..Default::default()
                };
            } else {
                schema.nullable = Some(true);
            }
        }

        Ok(schema)
    }

    /// Record a failure that belongs to this run
    pub fn record(&mut self, failure: GenerationFailure) {
        self.failures.push(failure);
    }

    /// Component schemas ordered by name, and the failures of this run
    pub fn finish(mut self) -> (IndexMap<String, Schema>, Vec<GenerationFailure>) {
        self.schemas.sort_keys();
        (self.schemas, self.failures)
    }

    fn define_subtype(&mut self, subtype: &TypeRef) -> OpenApiResult<String> {
        let descriptor = self.resolver.resolve(subtype, "")?;
        if !descriptor.is_composite() {
            return Err(OpenApiError::schema_error(format!(
                "Subtype `{}` is not an object type",
                descriptor.id
            )));
        }
        self.ensure_defined(&descriptor)
    }

    /// Name of the component schema for a composite type, building it the
    /// first time the identity is seen.
    fn ensure_defined(&mut self, descriptor: &TypeDescriptor) -> OpenApiResult<String> {
        let name = descriptor.schema_name.clone().ok_or_else(|| {
            OpenApiError::schema_error(format!("`{}` has no schema name", descriptor.id))
        })?;

        if self.schemas.contains_key(&name)
            || self.in_progress.contains(&descriptor.id)
            || self.failed.contains(&descriptor.id)
        {
            return Ok(name);
        }

        self.check_regular(descriptor)?;

        let definition = descriptor.definition.clone().unwrap_or_default();
        self.in_progress.insert(descriptor.id.clone());
        self.building.push((definition, descriptor.ty.clone()));
        let result = self.build_definition(descriptor, &name);
        self.building.pop();
        self.in_progress.remove(&descriptor.id);

        match result {
            Ok(schema) => {
                tracing::debug!("Generated schema '{}' for {}", name, descriptor.id);
                self.schemas.insert(name.clone(), schema);
            }
            Err(e) => {
                tracing::warn!("Failed to generate schema '{}': {}", name, e);
                self.failed.insert(descriptor.id.clone());
                self.failures.push(GenerationFailure::schema(&name, &e));
            }
        }
        Ok(name)
    }

    /// A generic definition that re-enters itself with its arguments wrapped
    /// further would produce a new identity at every level.
    fn check_regular(&self, descriptor: &TypeDescriptor) -> OpenApiResult<()> {
        if descriptor.ty.depth() > MAX_TYPE_DEPTH {
            return Err(OpenApiError::unsupported_type(
                &descriptor.id,
                format!("type nesting exceeds {} levels", MAX_TYPE_DEPTH),
            ));
        }

        let Some(definition) = &descriptor.definition else {
            return Ok(());
        };
        let outer = self
            .building
            .iter()
            .find(|(building, ty)| building == definition && descriptor.ty.wraps_arguments_of(ty));
        match outer {
            Some((_, outer)) => Err(OpenApiError::unsupported_type(
                &descriptor.id,
                format!("non-regular recursive generic, instantiated from `{}`", outer),
            )),
            None => Ok(()),
        }
    }

    fn build_definition(&mut self, descriptor: &TypeDescriptor, name: &str) -> OpenApiResult<Schema> {
        let mut schema = match &descriptor.kind {
            TypeKind::Enum { variants } => Schema {
                schema_type: Some("string".to_string()),
                enum_values: variants.iter().map(|v| Value::String(v.clone())).collect(),
                ..Default::default()
            },
            TypeKind::Object(shape) => self.build_object(descriptor, name, shape)?,
            TypeKind::Polymorphic {
                shape,
                discriminator,
                subtypes,
            } => {
                let mut schema = self.build_object(descriptor, name, shape)?;
                let own = own_part_mut(&mut schema);
                if !own.properties.contains_key(discriminator) {
                    own.properties
                        .insert(discriminator.clone(), Schema::typed("string"));
                }
                if !own.required.contains(discriminator) {
                    own.required.push(discriminator.clone());
                }

                let mut mapping = IndexMap::new();
                for (tag, subtype) in subtypes {
                    match self.define_subtype(subtype) {
                        Ok(subtype_name) => {
                            mapping.insert(
                                tag.clone(),
                                format!("{}{}", SCHEMA_REF_PREFIX, subtype_name),
                            );
                        }
                        Err(e) => self.failures.push(GenerationFailure::schema(name, &e)),
                    }
                }
                schema.discriminator = Some(Discriminator {
                    property_name: discriminator.clone(),
                    mapping,
                });
                schema
            }
            _ => {
                return Err(OpenApiError::schema_error(format!(
                    "`{}` is not a named type",
                    descriptor.id
                )))
            }
        };

        if schema.description.is_none() {
            schema.description = descriptor.description.clone();
        }
        if descriptor.deprecated {
            schema.deprecated = Some(true);
        }

        for interceptor in &self.interceptors.schema {
            interceptor
                .intercept(descriptor, &mut schema)
                .map_err(|e| OpenApiError::interceptor(format!("schema {}", name), e))?;
        }

        Ok(schema)
    }

    fn build_object(
        &mut self,
        descriptor: &TypeDescriptor,
        name: &str,
        shape: &ObjectShape,
    ) -> OpenApiResult<Schema> {
        let mut own = Schema::typed("object");

        for field in &shape.fields {
            match self.build_field(name, field) {
                Ok(schema) => {
                    if field.is_required() {
                        own.required.push(field.name().to_string());
                    }
                    own.properties.insert(field.name().to_string(), schema);
                }
                Err(e) => {
                    tracing::warn!("Dropping field '{}.{}': {}", name, field.name(), e);
                    self.failures
                        .push(GenerationFailure::field(name, field.name(), &e));
                }
            }
        }

        for field in &shape.fields {
            let Some(property) = own.properties.get_mut(field.name()) else {
                continue;
            };
            for interceptor in &self.interceptors.schema_field {
                interceptor
                    .intercept(descriptor, &field.def, property)
                    .map_err(|e| {
                        OpenApiError::interceptor(format!("schema {}.{}", name, field.name()), e)
                    })?;
            }
        }

        let Some(parent) = &shape.parent else {
            return Ok(own);
        };
        let parent = self.resolver.resolve(parent, "")?;
        if !matches!(
            parent.kind,
            TypeKind::Object(_) | TypeKind::Polymorphic { .. }
        ) {
            return Err(OpenApiError::schema_error(format!(
                "Parent `{}` of {} is not an object type",
                parent.id, name
            )));
        }
        let parent_name = self.ensure_defined(&parent)?;

        Ok(Schema {
            all_of: vec![Schema::reference(&parent_name), own],
            ..Default::default()
        })
    }

    fn build_field(&mut self, owner: &str, field: &ResolvedField) -> OpenApiResult<Schema> {
        let ty = field.ty.clone()?;
        let descriptor = self.resolver.resolve(&ty, &field.scope)?;
        let mut schema = self.schema_for_descriptor(&descriptor)?;
        let def = &field.def;

        if schema.reference.is_some() && (def.description.is_some() || def.deprecated) {
            schema = Schema {
                all_of: vec![schema],
                ..Default::default()
            };
        }
        if def.description.is_some() {
            schema.description = def.description.clone();
        }
        if def.deprecated {
            schema.deprecated = Some(true);
        }

        if !schema.is_reference_like() {
            if def.format.is_some() {
                schema.format = def.format.clone();
            }
            schema.minimum = def.minimum.or(schema.minimum);
            schema.maximum = def.maximum.or(schema.maximum);
            schema.min_length = def.min_length.or(schema.min_length);
            schema.max_length = def.max_length.or(schema.max_length);
            schema.pattern = def.pattern.clone().or(schema.pattern);

            if self.config.generate_examples {
                schema.example =
                    examples::example_for(owner, def, &schema, self.config.example_resolver());
            }
        }

        Ok(schema)
    }
}

/// The part of a definition that carries its own properties
fn own_part_mut(schema: &mut Schema) -> &mut Schema {
    if schema.all_of.is_empty() {
        schema
    } else {
        let last = schema.all_of.len() - 1;
        &mut schema.all_of[last]
    }
}
