use crate::registry::{
    ControllerDef, EndpointDef, FieldDef, ParamDef, TypeDef, TypeRegistry,
};

/// Pet store models under `app::model`
pub fn pet_registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_type(
            TypeDef::object("app::model::Pet")
                .with_description("A pet for sale")
                .field(FieldDef::new("id", "i64"))
                .field(FieldDef::new("name", "String").with_length(Some(1), Some(40)))
                .field(FieldDef::new("category", "Category"))
                .field(FieldDef::new("tags", "HashSet<Tag>"))
                .field(FieldDef::new("status", "PetStatus"))
                .field(FieldDef::new("nickname", "Option<String>")),
        )
        .with_type(
            TypeDef::object("app::model::Category")
                .field(FieldDef::new("id", "i64"))
                .field(FieldDef::new("name", "String")),
        )
        .with_type(
            TypeDef::object("app::model::Tag")
                .field(FieldDef::new("id", "i64"))
                .field(FieldDef::new("name", "String")),
        )
        .with_type(TypeDef::enumeration(
            "app::model::PetStatus",
            &["AVAILABLE", "PENDING", "SOLD"],
        ))
        .with_type(
            TypeDef::object("app::model::Page")
                .with_generics(&["T"])
                .field(FieldDef::new("items", "Vec<T>"))
                .field(FieldDef::new("total", "u64")),
        )
}

/// Pet store models plus a controller under `app::web`
pub fn pet_store() -> TypeRegistry {
    pet_registry().with_controller(
        ControllerDef::new("app::web::PetController")
            .with_base_path("/pets")
            .endpoint(
                EndpointDef::new("listPets", "GET", "/")
                    .with_summary("List pets")
                    .param(ParamDef::query("status", "Option<PetStatus>"))
                    .param(ParamDef::query("page", "u32"))
                    .returns("200", "Page<Pet>"),
            )
            .endpoint(
                EndpointDef::new("getPet", "GET", "/{petId}")
                    .param(ParamDef::path("petId", "i64").with_description("Pet id"))
                    .returns("200", "Pet")
                    .responds("404", "Pet not found"),
            )
            .endpoint(
                EndpointDef::new("createPet", "POST", "/")
                    .param(ParamDef::header("X-Request-Id", "Option<String>"))
                    .param(ParamDef::body("pet", "Pet"))
                    .returns("201", "Pet"),
            )
            .endpoint(EndpointDef::new("deletePet", "DELETE", "/{petId}/photos/{photoId}")),
    )
}
