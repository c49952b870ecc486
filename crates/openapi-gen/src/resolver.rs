/*!
Type resolution.

Classifies type expressions into [`TypeDescriptor`]s: primitives, arrays and
sets, maps, enums, objects and polymorphic roots, with generic parameters of
registered definitions bound to the instantiation's arguments.
*/

use crate::{
    error::{OpenApiError, OpenApiResult, TypeSyntaxError},
    registry::{FieldDef, TypeDef, TypeRegistry, TypeShape},
    specification::Schema,
    type_ref::TypeRef,
};
use std::collections::HashMap;

/// Names resolved without the registry
const BUILTIN_NAMES: &[&str] = &[
    "Option", "Box", "Rc", "Arc", "Cow", "Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet",
    "IndexSet", "HashMap", "BTreeMap", "IndexMap", "DateTime", "Utc", "Local", "FixedOffset",
];

/// Primitive OpenAPI types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Number,
    Boolean,
    Uuid,
    Date,
    DateTime,
    Byte,
    /// Free-form JSON value
    Any,
}

impl Primitive {
    /// Map a primitive type name
    pub fn from_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "String" | "str" | "char" => Self::String,
            "i8" | "i16" | "i32" => Self::Int32,
            "u8" | "u16" | "u32" => Self::UInt32,
            "i64" | "i128" | "isize" => Self::Int64,
            "u64" | "u128" | "usize" => Self::UInt64,
            "f32" => Self::Float,
            "f64" => Self::Double,
            "Decimal" => Self::Number,
            "bool" => Self::Boolean,
            "Uuid" => Self::Uuid,
            "NaiveDate" => Self::Date,
            "NaiveDateTime" => Self::DateTime,
            "Value" => Self::Any,
            _ => return None,
        };
        Some(primitive)
    }

    /// Schema for this primitive
    pub fn schema(&self) -> Schema {
        match self {
            Self::String => Schema::typed("string"),
            Self::Int32 => Schema::formatted("integer", "int32"),
            Self::UInt32 => Schema {
                minimum: Some(0.0),
                ..Schema::formatted("integer", "int32")
            },
            Self::Int64 => Schema::formatted("integer", "int64"),
            Self::UInt64 => Schema {
                minimum: Some(0.0),
                ..Schema::formatted("integer", "int64")
            },
            Self::Float => Schema::formatted("number", "float"),
            Self::Double => Schema::formatted("number", "double"),
            Self::Number => Schema::typed("number"),
            Self::Boolean => Schema::typed("boolean"),
            Self::Uuid => Schema::formatted("string", "uuid"),
            Self::Date => Schema::formatted("string", "date"),
            Self::DateTime => Schema::formatted("string", "date-time"),
            Self::Byte => Schema::formatted("string", "byte"),
            Self::Any => Schema::typed("object"),
        }
    }

    /// Whether values of this type can be JSON object keys
    pub fn is_key_compatible(&self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Uuid
                | Self::Date
                | Self::DateTime
        )
    }
}

/// Field of a resolved object, generic parameters already bound
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub def: FieldDef,
    /// Bound type expression; syntax errors are kept so that only this field fails
    pub ty: Result<TypeRef, TypeSyntaxError>,
    /// Module the field was declared in
    pub scope: String,
}

impl ResolvedField {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// `Option<T>` fields are not required unless overridden
    pub fn is_required(&self) -> bool {
        self.def.required.unwrap_or_else(|| match &self.ty {
            Ok(ty) => !ty.is_option(),
            Err(_) => true,
        })
    }
}

/// Fields and parent of an object type
#[derive(Debug, Clone)]
pub struct ObjectShape {
    pub fields: Vec<ResolvedField>,
    pub parent: Option<TypeRef>,
}

/// Classification of a resolved type
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(Primitive),
    /// Ordered sequence, or set when `unique`
    Array { items: TypeRef, unique: bool },
    /// String-keyed mapping
    Map { key: TypeRef, value: TypeRef },
    /// Closed set of string values
    Enum { variants: Vec<String> },
    Object(ObjectShape),
    /// Object with declared subtypes, rendered as a discriminated union
    Polymorphic {
        shape: ObjectShape,
        discriminator: String,
        /// Tag value and subtype
        subtypes: Vec<(String, TypeRef)>,
    },
}

/// A resolved type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Canonical identity (`app::model::Page<app::model::User>`)
    pub id: String,
    /// Canonical type expression
    pub ty: TypeRef,
    pub kind: TypeKind,
    /// Ordered generic arguments
    pub type_args: Vec<TypeRef>,
    /// Used through `Option<T>`
    pub nullable: bool,
    /// Component schema name for named types
    pub schema_name: Option<String>,
    /// Fully qualified name of the registered definition
    pub definition: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
}

impl TypeDescriptor {
    fn anonymous(ty: &TypeRef, kind: TypeKind) -> Self {
        Self {
            id: ty.to_string(),
            ty: ty.clone(),
            kind,
            type_args: ty.args().to_vec(),
            nullable: false,
            schema_name: None,
            definition: None,
            description: None,
            deprecated: false,
        }
    }

    /// Named types get a component schema and are referenced by `$ref`
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Enum { .. } | TypeKind::Object(_) | TypeKind::Polymorphic { .. }
        )
    }
}

/// Resolves type expressions against a registry, caching by identity.
///
/// One resolver lives for exactly one generation run.
pub struct TypeResolver<'r> {
    registry: &'r TypeRegistry,
    cache: HashMap<String, TypeDescriptor>,
    /// Schema name to the identity that owns it
    names: HashMap<String, String>,
}

impl<'r> TypeResolver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Parse and resolve a type expression written inside `scope`
    pub fn resolve_str(&mut self, expr: &str, scope: &str) -> OpenApiResult<TypeDescriptor> {
        let ty = TypeRef::parse(expr)?;
        self.resolve(&ty, scope)
    }

    /// Resolve a type expression written inside `scope`
    pub fn resolve(&mut self, ty: &TypeRef, scope: &str) -> OpenApiResult<TypeDescriptor> {
        let canonical = self.canonicalize(ty, scope)?;
        let key = canonical.to_string();
        if let Some(descriptor) = self.cache.get(&key) {
            return Ok(descriptor.clone());
        }

        let descriptor = self.classify(&canonical)?;
        self.cache.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Replace every name by its fully qualified registered name, or by the
    /// plain built-in name.
    pub fn canonicalize(&self, ty: &TypeRef, scope: &str) -> OpenApiResult<TypeRef> {
        match ty {
            TypeRef::Path { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.canonicalize(arg, scope))
                    .collect::<OpenApiResult<Vec<_>>>()?;
                Ok(TypeRef::Path {
                    name: self.canonical_name(name, scope)?,
                    args,
                })
            }
            TypeRef::Slice(inner) => Ok(TypeRef::Slice(Box::new(self.canonicalize(inner, scope)?))),
            TypeRef::Tuple(items) => Ok(TypeRef::Tuple(
                items
                    .iter()
                    .map(|item| self.canonicalize(item, scope))
                    .collect::<OpenApiResult<Vec<_>>>()?,
            )),
            TypeRef::Function(_) => Ok(ty.clone()),
        }
    }

    fn canonical_name(&self, name: &str, scope: &str) -> OpenApiResult<String> {
        let segment = name.rsplit("::").next().unwrap_or(name);
        let builtin = BUILTIN_NAMES.contains(&segment) || Primitive::from_name(segment).is_some();

        // Registered types shadow built-in names of the same spelling
        match self.registry.lookup(name, scope) {
            Ok(Some(def)) => return Ok(def.name.clone()),
            Err(e) if !builtin => return Err(e),
            _ => {}
        }

        if builtin {
            Ok(segment.to_string())
        } else {
            Err(OpenApiError::unsupported_type(
                name,
                "not a registered type or a supported built-in type",
            ))
        }
    }

    fn classify(&mut self, ty: &TypeRef) -> OpenApiResult<TypeDescriptor> {
        match ty {
            TypeRef::Function(signature) => Err(OpenApiError::unsupported_type(
                signature,
                "function types have no OpenAPI representation",
            )),
            TypeRef::Tuple(items) if items.is_empty() => Err(OpenApiError::unsupported_type(
                "()",
                "the unit type has no schema",
            )),
            TypeRef::Tuple(_) => Err(OpenApiError::unsupported_type(
                ty,
                "tuple types have no OpenAPI 3.0 representation",
            )),
            TypeRef::Slice(inner) => {
                self.resolve(inner, "")?;
                Ok(TypeDescriptor::anonymous(
                    ty,
                    TypeKind::Array {
                        items: inner.as_ref().clone(),
                        unique: false,
                    },
                ))
            }
            TypeRef::Path { name, args } => {
                let registry = self.registry;
                if let Some(def) = registry.get_type(name) {
                    return self.classify_definition(ty, def, args);
                }
                self.classify_builtin(ty, name, args)
            }
        }
    }

    fn classify_builtin(
        &mut self,
        ty: &TypeRef,
        name: &str,
        args: &[TypeRef],
    ) -> OpenApiResult<TypeDescriptor> {
        let kind = match (name, args.len()) {
            ("Option", 1) => {
                let mut inner = self.resolve(&args[0], "")?;
                inner.nullable = true;
                return Ok(inner);
            }
            ("Box" | "Rc" | "Arc" | "Cow", 1) => return self.resolve(&args[0], ""),
            ("Vec", 1) if args[0] == TypeRef::named("u8") => TypeKind::Primitive(Primitive::Byte),
            ("Vec" | "VecDeque" | "LinkedList", 1) => {
                self.resolve(&args[0], "")?;
                TypeKind::Array {
                    items: args[0].clone(),
                    unique: false,
                }
            }
            ("HashSet" | "BTreeSet" | "IndexSet", 1) => {
                self.resolve(&args[0], "")?;
                TypeKind::Array {
                    items: args[0].clone(),
                    unique: true,
                }
            }
            ("HashMap" | "BTreeMap" | "IndexMap", 2) => {
                let key = self.resolve(&args[0], "")?;
                let key_compatible = match &key.kind {
                    TypeKind::Primitive(primitive) => primitive.is_key_compatible(),
                    TypeKind::Enum { .. } => true,
                    _ => false,
                };
                if !key_compatible {
                    return Err(OpenApiError::unsupported_type(
                        ty,
                        format!("map keys of type `{}` cannot be JSON object keys", key.ty),
                    ));
                }
                self.resolve(&args[1], "")?;
                TypeKind::Map {
                    key: args[0].clone(),
                    value: args[1].clone(),
                }
            }
            ("DateTime", 0 | 1) => TypeKind::Primitive(Primitive::DateTime),
            (name, count) => match Primitive::from_name(name) {
                Some(primitive) if count == 0 => TypeKind::Primitive(primitive),
                _ => {
                    return Err(OpenApiError::unsupported_type(
                        ty,
                        format!("`{}` is not supported with {} type argument(s)", name, count),
                    ))
                }
            },
        };
        Ok(TypeDescriptor::anonymous(ty, kind))
    }

    fn classify_definition(
        &mut self,
        ty: &TypeRef,
        def: &'r TypeDef,
        args: &[TypeRef],
    ) -> OpenApiResult<TypeDescriptor> {
        if args.len() != def.generics.len() {
            return Err(OpenApiError::unsupported_type(
                ty,
                format!(
                    "`{}` expects {} type argument(s), found {}",
                    def.name,
                    def.generics.len(),
                    args.len()
                ),
            ));
        }

        let bindings: Vec<(String, TypeRef)> = def
            .generics
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        let scope = def.module();

        let kind = match &def.shape {
            TypeShape::Enum { variants } => TypeKind::Enum {
                variants: variants.clone(),
            },
            TypeShape::Struct {
                fields,
                parent,
                subtypes,
            } => {
                let shape = ObjectShape {
                    fields: fields
                        .iter()
                        .map(|field| ResolvedField {
                            def: field.clone(),
                            ty: TypeRef::parse(&field.ty).map(|t| t.substitute(&bindings)),
                            scope: scope.to_string(),
                        })
                        .collect(),
                    parent: parent
                        .as_deref()
                        .map(|p| self.bind(p, &bindings, scope))
                        .transpose()?,
                };
                match subtypes {
                    Some(subtypes) => TypeKind::Polymorphic {
                        shape,
                        discriminator: subtypes.property_name.clone(),
                        subtypes: subtypes
                            .variants
                            .iter()
                            .map(|v| Ok((v.tag.clone(), self.bind(&v.ty, &bindings, scope)?)))
                            .collect::<OpenApiResult<Vec<_>>>()?,
                    },
                    None => TypeKind::Object(shape),
                }
            }
        };

        Ok(TypeDescriptor {
            id: ty.to_string(),
            ty: ty.clone(),
            kind,
            type_args: args.to_vec(),
            nullable: false,
            schema_name: Some(self.schema_name_for(ty)),
            definition: Some(def.name.clone()),
            description: def.description.clone(),
            deprecated: def.deprecated,
        })
    }

    fn bind(
        &self,
        expr: &str,
        bindings: &[(String, TypeRef)],
        scope: &str,
    ) -> OpenApiResult<TypeRef> {
        let ty = TypeRef::parse(expr)?.substitute(bindings);
        self.canonicalize(&ty, scope)
    }

    /// Short name (`Page_User`), or the dotted qualified name when the short
    /// one already belongs to another identity.
    fn schema_name_for(&mut self, ty: &TypeRef) -> String {
        let id = ty.to_string();
        let short = display_name(ty, false);
        match self.names.get(&short) {
            Some(owner) if owner == &id => short,
            Some(_) => {
                let qualified = display_name(ty, true);
                self.names.insert(qualified.clone(), id);
                qualified
            }
            None => {
                self.names.insert(short.clone(), id);
                short
            }
        }
    }
}

fn display_name(ty: &TypeRef, qualified: bool) -> String {
    match ty {
        TypeRef::Path { name, args } => {
            let mut out = if qualified {
                name.replace("::", ".")
            } else {
                name.rsplit("::").next().unwrap_or(name).to_string()
            };
            for arg in args {
                out.push('_');
                out.push_str(&display_name(arg, qualified));
            }
            out
        }
        TypeRef::Slice(inner) => format!("Slice_{}", display_name(inner, qualified)),
        TypeRef::Tuple(_) => "Tuple".to_string(),
        TypeRef::Function(_) => "Fn".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldDef;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeDef::object("app::model::User")
                    .field(FieldDef::new("id", "i64"))
                    .field(FieldDef::new("email", "Option<String>")),
            )
            .with_type(TypeDef::enumeration("app::model::Role", &["ADMIN", "USER"]))
            .with_type(
                TypeDef::object("app::model::Page")
                    .with_generics(&["T"])
                    .field(FieldDef::new("items", "Vec<T>"))
                    .field(FieldDef::new("total", "u64")),
            )
            .with_type(TypeDef::object("other::User"))
    }

    #[test]
    fn test_primitive_mapping() {
        let registry = registry();
        let mut resolver = TypeResolver::new(&registry);

        for (expr, expected) in [
            ("String", Primitive::String),
            ("&str", Primitive::String),
            ("u16", Primitive::UInt32),
            ("usize", Primitive::UInt64),
            ("f64", Primitive::Double),
            ("uuid::Uuid", Primitive::Uuid),
            ("chrono::DateTime<chrono::Utc>", Primitive::DateTime),
            ("Vec<u8>", Primitive::Byte),
            ("serde_json::Value", Primitive::Any),
        ] {
            let descriptor = resolver.resolve_str(expr, "").unwrap();
            assert!(
                matches!(descriptor.kind, TypeKind::Primitive(p) if p == expected),
                "{} resolved to {:?}",
                expr,
                descriptor.kind
            );
        }
        assert_eq!(Primitive::UInt32.schema().minimum, Some(0.0));
    }

    #[test]
    fn test_containers_and_nullability() {
        let registry = registry();
        let mut resolver = TypeResolver::new(&registry);

        let set = resolver.resolve_str("HashSet<User>", "app::model").unwrap();
        match &set.kind {
            TypeKind::Array { items, unique } => {
                assert!(*unique);
                assert_eq!(items.to_string(), "app::model::User");
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let optional = resolver.resolve_str("Option<Box<User>>", "app::model").unwrap();
        assert!(optional.nullable);
        assert_eq!(optional.id, "app::model::User");
        assert_eq!(optional.schema_name.as_deref(), Some("User"));

        let map = resolver.resolve_str("BTreeMap<Role, Vec<i32>>", "app::model").unwrap();
        assert!(matches!(map.kind, TypeKind::Map { .. }));
    }

    #[test]
    fn test_generic_instantiation_binds_fields() {
        let registry = registry();
        let mut resolver = TypeResolver::new(&registry);

        let page = resolver.resolve_str("app::model::Page<User>", "app::model").unwrap();
        assert_eq!(page.id, "app::model::Page<app::model::User>");
        assert_eq!(page.schema_name.as_deref(), Some("Page_User"));
        assert_eq!(page.type_args, vec![TypeRef::named("app::model::User")]);

        let TypeKind::Object(shape) = &page.kind else {
            panic!("expected object, got {:?}", page.kind);
        };
        let items = shape.fields[0].ty.as_ref().unwrap();
        assert_eq!(items.to_string(), "Vec<app::model::User>");
    }

    #[test]
    fn test_unsupported_types() {
        let registry = registry();
        let mut resolver = TypeResolver::new(&registry);

        for expr in [
            "fn(i32) -> i32",
            "Box<dyn Fn()>",
            "(i32, String)",
            "Missing",
            "HashMap<User, String>",
            "HashMap<f64, String>",
            "app::model::Page",
            "Vec<String, String>",
        ] {
            let err = resolver.resolve_str(expr, "app::model").unwrap_err();
            assert!(
                matches!(err, OpenApiError::UnsupportedType { .. }),
                "{} gave {:?}",
                expr,
                err
            );
        }
    }

    #[test]
    fn test_resolution_is_cached_and_idempotent() {
        let registry = registry();
        let mut resolver = TypeResolver::new(&registry);

        let first = resolver.resolve_str("User", "app::model").unwrap();
        let second = resolver.resolve_str("app::model::User", "").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.schema_name, second.schema_name);
        assert_eq!(resolver.cache.len(), 1);
    }

    #[test]
    fn test_schema_name_collision_falls_back_to_qualified_name() {
        let registry = registry();
        let mut resolver = TypeResolver::new(&registry);

        let ours = resolver.resolve_str("app::model::User", "").unwrap();
        let theirs = resolver.resolve_str("other::User", "").unwrap();
        assert_eq!(ours.schema_name.as_deref(), Some("User"));
        assert_eq!(theirs.schema_name.as_deref(), Some("other.User"));
    }

    #[test]
    fn test_registered_short_name_shadows_builtin() {
        let registry = TypeRegistry::new()
            .with_type(TypeDef::object("app::dto::Value").field(FieldDef::new("amount", "i64")));
        let mut resolver = TypeResolver::new(&registry);

        let ours = resolver.resolve_str("Value", "app::web").unwrap();
        assert!(matches!(ours.kind, TypeKind::Object(_)));
        assert_eq!(ours.schema_name.as_deref(), Some("Value"));

        let json = resolver.resolve_str("serde_json::Value", "app::web").unwrap();
        assert!(matches!(json.kind, TypeKind::Primitive(Primitive::Any)));
    }
}
