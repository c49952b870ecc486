/*!
Link-time registration macros.

```rust,ignore
use openapi_gen::{register_type, registry::{FieldDef, TypeDef}};

register_type!(|| TypeDef::object("app::model::User").field(FieldDef::new("id", "i64")));
```

Everything submitted this way is picked up by
[`TypeRegistry::from_inventory`](crate::registry::TypeRegistry::from_inventory).
*/

/// Submit a model type definition to the link-time registry
#[macro_export]
macro_rules! register_type {
    ($define:expr) => {
        $crate::inventory::submit! {
            $crate::registry::TypeRegistration { define: $define }
        }
    };
}

/// Submit a controller definition to the link-time registry
#[macro_export]
macro_rules! register_controller {
    ($define:expr) => {
        $crate::inventory::submit! {
            $crate::registry::ControllerRegistration { define: $define }
        }
    };
}
