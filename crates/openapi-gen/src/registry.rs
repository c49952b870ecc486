/*!
Type and controller registry.

Rust has no runtime reflection, so the models and controllers a document is
generated from are described up front, either by explicit registration, by
link-time submission through [`inventory`] (see [`register_type!`] and
[`register_controller!`]) or by loading a descriptor file.

Names are fully qualified (`app::model::User`); package scanning selects
definitions by prefix.
*/

use crate::error::{OpenApiError, OpenApiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A registered model type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Fully qualified name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Generic parameter names, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generics: Vec<String>,

    #[serde(default)]
    pub deprecated: bool,

    pub shape: TypeShape,
}

/// Structure of a registered type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    Struct {
        #[serde(default)]
        fields: Vec<FieldDef>,

        /// Type expression of the parent type
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,

        /// Declared subtypes, making this type a discriminated union root
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtypes: Option<Subtypes>,
    },
    Enum {
        variants: Vec<String>,
    },
}

/// Subtypes of a polymorphic root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtypes {
    /// Name of the tag property
    pub property_name: String,
    pub variants: Vec<SubtypeDef>,
}

/// One tagged subtype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtypeDef {
    pub tag: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A field of a registered struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    /// Type expression
    #[serde(rename = "type")]
    pub ty: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Overrides the default (`Option<T>` fields are optional, others required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Literal example, used when example generation is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    /// Key handed to the example resolver instead of `Type.field`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_key: Option<String>,
}

impl FieldDef {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
            description: None,
            required: None,
            deprecated: false,
            format: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
            example: None,
            example_key: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_length(mut self, min_length: Option<usize>, max_length: Option<usize>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    pub fn with_example_key(mut self, key: &str) -> Self {
        self.example_key = Some(key.to_string());
        self
    }
}

impl TypeDef {
    /// Struct without fields; add them with [`TypeDef::field`]
    pub fn object(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            generics: Vec::new(),
            deprecated: false,
            shape: TypeShape::Struct {
                fields: Vec::new(),
                parent: None,
                subtypes: None,
            },
        }
    }

    /// Closed set of string values
    pub fn enumeration(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            generics: Vec::new(),
            deprecated: false,
            shape: TypeShape::Enum {
                variants: variants.iter().map(|v| v.to_string()).collect(),
            },
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_generics(mut self, params: &[&str]) -> Self {
        self.generics = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Append a field; ignored for enums
    pub fn field(mut self, field: FieldDef) -> Self {
        if let TypeShape::Struct { fields, .. } = &mut self.shape {
            fields.push(field);
        }
        self
    }

    /// Set the parent type; ignored for enums
    pub fn extends(mut self, parent: &str) -> Self {
        if let TypeShape::Struct { parent: slot, .. } = &mut self.shape {
            *slot = Some(parent.to_string());
        }
        self
    }

    /// Declare a tagged subtype; ignored for enums
    pub fn subtype(mut self, property_name: &str, tag: &str, ty: &str) -> Self {
        if let TypeShape::Struct { subtypes, .. } = &mut self.shape {
            let subtypes = subtypes.get_or_insert_with(|| Subtypes {
                property_name: property_name.to_string(),
                variants: Vec::new(),
            });
            subtypes.variants.push(SubtypeDef {
                tag: tag.to_string(),
                ty: ty.to_string(),
            });
        }
        self
    }

    /// Module part of the name (`app::model` for `app::model::User`)
    pub fn module(&self) -> &str {
        self.name.rsplit_once("::").map(|(m, _)| m).unwrap_or("")
    }

    /// Last segment of the name
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

/// Where an endpoint parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
        }
    }
}

/// A declared endpoint parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParamLocation,

    /// Type expression
    #[serde(rename = "type")]
    pub ty: String,

    /// Overrides the default (path parameters are always required, others
    /// unless `Option<T>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamDef {
    pub fn new(name: &str, location: ParamLocation, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            location,
            ty: ty.to_string(),
            required: None,
            description: None,
        }
    }

    pub fn path(name: &str, ty: &str) -> Self {
        Self::new(name, ParamLocation::Path, ty)
    }

    pub fn query(name: &str, ty: &str) -> Self {
        Self::new(name, ParamLocation::Query, ty)
    }

    pub fn header(name: &str, ty: &str) -> Self {
        Self::new(name, ParamLocation::Header, ty)
    }

    pub fn cookie(name: &str, ty: &str) -> Self {
        Self::new(name, ParamLocation::Cookie, ty)
    }

    pub fn body(name: &str, ty: &str) -> Self {
        Self::new(name, ParamLocation::Body, ty)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A declared response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDef {
    /// Status code (`"200"`, `"404"`, `"default"`)
    pub status: String,

    /// Body type expression; `None` or `()` for an empty body
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A controller endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDef {
    /// Handler name, used as the operation id
    pub name: String,

    /// HTTP verb
    pub method: String,

    /// Path relative to the controller base path
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags; the controller name is used when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub params: Vec<ParamDef>,

    #[serde(default)]
    pub responses: Vec<ResponseDef>,
}

impl EndpointDef {
    pub fn new(name: &str, method: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            summary: None,
            description: None,
            tags: Vec::new(),
            deprecated: false,
            params: Vec::new(),
            responses: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    /// Response with a body of type `ty`
    pub fn returns(mut self, status: &str, ty: &str) -> Self {
        self.responses.push(ResponseDef {
            status: status.to_string(),
            ty: Some(ty.to_string()),
            description: None,
        });
        self
    }

    /// Response without a body
    pub fn responds(mut self, status: &str, description: &str) -> Self {
        self.responses.push(ResponseDef {
            status: status.to_string(),
            ty: None,
            description: Some(description.to_string()),
        });
        self
    }
}

/// A registered controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerDef {
    /// Fully qualified name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
}

impl ControllerDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_path: None,
            endpoints: Vec::new(),
        }
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = Some(base_path.to_string());
        self
    }

    pub fn endpoint(mut self, endpoint: EndpointDef) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Module part of the name, used to resolve relative type names
    pub fn module(&self) -> &str {
        self.name.rsplit_once("::").map(|(m, _)| m).unwrap_or("")
    }

    /// Last segment of the name
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

/// Link-time registration of a model type
pub struct TypeRegistration {
    pub define: fn() -> TypeDef,
}

inventory::collect!(TypeRegistration);

/// Link-time registration of a controller
pub struct ControllerRegistration {
    pub define: fn() -> ControllerDef,
}

inventory::collect!(ControllerRegistration);

/// On-disk layout of a registry descriptor file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub controllers: Vec<ControllerDef>,
}

/// Catalogue of model types and controllers, ordered by name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDef>,
    controllers: BTreeMap<String, ControllerDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted with [`register_type!`] and [`register_controller!`]
    pub fn from_inventory() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<TypeRegistration> {
            registry.register_type((registration.define)());
        }
        for registration in inventory::iter::<ControllerRegistration> {
            registry.register_controller((registration.define)());
        }
        registry
    }

    /// Load a JSON, YAML or TOML descriptor file
    pub fn from_file<P: AsRef<Path>>(path: P) -> OpenApiResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let file: RegistryFile = match extension.to_lowercase().as_str() {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => {
                if content.trim_start().starts_with('{') {
                    serde_json::from_str(&content)?
                } else {
                    serde_yaml::from_str(&content)?
                }
            }
        };

        Ok(Self::from(file))
    }

    /// Register a type; a later registration under the same name replaces
    /// the earlier one.
    pub fn register_type(&mut self, def: TypeDef) -> &mut Self {
        if let Some(previous) = self.types.insert(def.name.clone(), def) {
            tracing::warn!("Type '{}' registered twice, keeping the last one", previous.name);
        }
        self
    }

    /// Register a controller; a later registration under the same name
    /// replaces the earlier one.
    pub fn register_controller(&mut self, def: ControllerDef) -> &mut Self {
        if let Some(previous) = self.controllers.insert(def.name.clone(), def) {
            tracing::warn!(
                "Controller '{}' registered twice, keeping the last one",
                previous.name
            );
        }
        self
    }

    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.register_type(def);
        self
    }

    pub fn with_controller(mut self, def: ControllerDef) -> Self {
        self.register_controller(def);
        self
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn get_controller(&self, name: &str) -> Option<&ControllerDef> {
        self.controllers.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    pub fn controllers(&self) -> impl Iterator<Item = &ControllerDef> {
        self.controllers.values()
    }

    /// Find a type named in an expression written inside `scope`.
    ///
    /// Tries the exact name, then the name relative to `scope`, then a
    /// unique registered type with that last segment.
    pub fn lookup(&self, name: &str, scope: &str) -> OpenApiResult<Option<&TypeDef>> {
        if let Some(def) = self.types.get(name) {
            return Ok(Some(def));
        }
        if !scope.is_empty() {
            if let Some(def) = self.types.get(&format!("{}::{}", scope, name)) {
                return Ok(Some(def));
            }
        }
        if name.contains("::") {
            return Ok(None);
        }

        let mut candidates = self.types.values().filter(|def| def.short_name() == name);
        match (candidates.next(), candidates.next()) {
            (Some(def), None) => Ok(Some(def)),
            (Some(first), Some(second)) => Err(OpenApiError::registry_error(format!(
                "Type name '{}' is ambiguous ('{}', '{}', ...); use a qualified name",
                name, first.name, second.name
            ))),
            (None, _) => Ok(None),
        }
    }

    /// Non-generic types under any of the package prefixes, ordered by name.
    ///
    /// Generic definitions are only built when a reference instantiates them.
    pub fn scan_types(&self, packages: &[String]) -> Vec<&TypeDef> {
        let patterns = compile_patterns(packages);
        self.types
            .values()
            .filter(|def| def.generics.is_empty())
            .filter(|def| patterns.iter().any(|p| p.matches(&def.name)))
            .collect()
    }

    /// Controllers under any of the package prefixes, ordered by name
    pub fn scan_controllers(&self, packages: &[String]) -> Vec<&ControllerDef> {
        let patterns = compile_patterns(packages);
        self.controllers
            .values()
            .filter(|def| patterns.iter().any(|p| p.matches(&def.name)))
            .collect()
    }
}

impl From<RegistryFile> for TypeRegistry {
    fn from(file: RegistryFile) -> Self {
        let mut registry = Self::new();
        for def in file.types {
            registry.register_type(def);
        }
        for def in file.controllers {
            registry.register_controller(def);
        }
        registry
    }
}

fn compile_patterns(packages: &[String]) -> Vec<PackagePattern> {
    packages
        .iter()
        .filter_map(|package| match PackagePattern::parse(package) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!("Skipping package '{}': {}", package, e);
                None
            }
        })
        .collect()
}

static PACKAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*(::\*|\*)?)$")
        .expect("package pattern regex is valid")
});

/// Package prefix such as `app::model`, `app::model::*` or `com.example.model.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePattern {
    base: String,
    /// `app::mod*`: plain string prefix instead of whole segments
    partial_segment: bool,
}

impl PackagePattern {
    pub fn parse(package: &str) -> OpenApiResult<Self> {
        let normalized = package.trim().replace('.', "::");
        if !PACKAGE_PATTERN.is_match(&normalized) {
            return Err(OpenApiError::Scan(package.to_string()));
        }

        if normalized == "*" {
            return Ok(Self {
                base: String::new(),
                partial_segment: true,
            });
        }
        if let Some(base) = normalized.strip_suffix("::*") {
            return Ok(Self {
                base: base.to_string(),
                partial_segment: false,
            });
        }
        if let Some(base) = normalized.strip_suffix('*') {
            return Ok(Self {
                base: base.to_string(),
                partial_segment: true,
            });
        }
        Ok(Self {
            base: normalized,
            partial_segment: false,
        })
    }

    /// Whether a fully qualified name lies under this prefix
    pub fn matches(&self, name: &str) -> bool {
        if self.partial_segment {
            return name.starts_with(&self.base);
        }
        name == self.base
            || name
                .strip_prefix(&self.base)
                .map_or(false, |rest| rest.starts_with("::"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(TypeDef::object("app::model::User"))
            .with_type(TypeDef::object("app::model::billing::Invoice"))
            .with_type(TypeDef::object("app::models::Other"))
            .with_type(TypeDef::object("app::model::Page").with_generics(&["T"]))
            .with_type(TypeDef::object("lib::User"))
    }

    fn names(defs: Vec<&TypeDef>) -> Vec<&str> {
        defs.into_iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_package_scan_is_segment_aware_and_sorted() {
        let registry = registry();
        let found = registry.scan_types(&["app::model::*".to_string()]);
        assert_eq!(
            names(found),
            vec!["app::model::User", "app::model::billing::Invoice"]
        );

        let dotted = registry.scan_types(&["app.model".to_string()]);
        assert_eq!(dotted.len(), 2);

        let partial = registry.scan_types(&["app::mod*".to_string()]);
        assert_eq!(partial.len(), 3);
    }

    #[test]
    fn test_unknown_and_malformed_packages_yield_nothing() {
        let registry = registry();
        assert!(registry.scan_types(&["nowhere::*".to_string()]).is_empty());
        assert!(registry.scan_types(&["app::::model".to_string()]).is_empty());
        assert!(registry.scan_types(&[]).is_empty());
        assert!(PackagePattern::parse("app model").is_err());
        assert!(PackagePattern::parse("").is_err());
    }

    #[test]
    fn test_lookup_prefers_exact_then_scope_then_unique_short_name() {
        let registry = registry();
        assert_eq!(
            registry.lookup("lib::User", "").unwrap().unwrap().name,
            "lib::User"
        );
        assert_eq!(
            registry.lookup("User", "app::model").unwrap().unwrap().name,
            "app::model::User"
        );
        assert_eq!(
            registry.lookup("Invoice", "elsewhere").unwrap().unwrap().name,
            "app::model::billing::Invoice"
        );
        assert!(registry.lookup("User", "elsewhere").is_err());
        assert!(registry.lookup("Missing", "").unwrap().is_none());
    }

    #[test]
    fn test_registry_file_formats() {
        let yaml = r#"
types:
  - name: app::model::Color
    shape:
      kind: enum
      variants: [RED, GREEN]
  - name: app::model::Pet
    shape:
      kind: struct
      fields:
        - name: name
          type: String
          max_length: 40
controllers:
  - name: app::web::PetController
    base_path: /pets
    endpoints:
      - name: list
        method: GET
        path: /
        responses:
          - status: "200"
            type: Vec<Pet>
"#;
        let file: RegistryFile = serde_yaml::from_str(yaml).unwrap();
        let registry = TypeRegistry::from(file);
        assert!(matches!(
            registry.get_type("app::model::Color").unwrap().shape,
            TypeShape::Enum { .. }
        ));
        let controller = registry.get_controller("app::web::PetController").unwrap();
        assert_eq!(controller.endpoints[0].responses[0].ty.as_deref(), Some("Vec<Pet>"));

        let toml_src = r#"
[[types]]
name = "app::model::Tag"
shape = { kind = "struct", fields = [{ name = "label", type = "String" }] }
"#;
        let file: RegistryFile = toml::from_str(toml_src).unwrap();
        assert_eq!(file.types[0].name, "app::model::Tag");
    }
}
