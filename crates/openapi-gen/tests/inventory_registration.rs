use openapi_gen::{
    register_controller, register_type,
    registry::{ControllerDef, EndpointDef, FieldDef, ParamDef, TypeDef},
    specification::HttpMethod,
    OpenApiGenerator, TypeRegistry,
};

fn order() -> TypeDef {
    TypeDef::object("shop::model::Order")
        .with_description("A placed order")
        .field(FieldDef::new("id", "u64"))
        .field(FieldDef::new("lines", "Vec<OrderLine>"))
}

fn order_line() -> TypeDef {
    TypeDef::object("shop::model::OrderLine")
        .field(FieldDef::new("sku", "String"))
        .field(FieldDef::new("quantity", "u32"))
}

fn orders() -> ControllerDef {
    ControllerDef::new("shop::web::OrderController")
        .with_base_path("/orders")
        .endpoint(
            EndpointDef::new("getOrder", "GET", "/{orderId}")
                .param(ParamDef::path("orderId", "u64"))
                .returns("200", "Order"),
        )
}

register_type!(order);
register_type!(order_line);
register_controller!(orders);

#[test]
fn test_registered_definitions_are_collected() {
    let registry = TypeRegistry::from_inventory();
    assert!(registry.get_type("shop::model::Order").is_some());
    assert!(registry.get_type("shop::model::OrderLine").is_some());
    assert!(registry.get_controller("shop::web::OrderController").is_some());
}

#[test]
fn test_generates_from_registered_definitions() {
    let mut generator = OpenApiGenerator::new(
        TypeRegistry::from_inventory(),
        vec!["shop::model".to_string()],
        vec!["shop::web".to_string()],
    );
    let spec = generator.generate().unwrap();

    let names: Vec<_> = spec.schemas().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Order", "OrderLine"]);

    let order = spec.schema("Order").unwrap();
    assert_eq!(
        order.properties["lines"].items.as_ref().unwrap().referenced_name(),
        Some("OrderLine")
    );

    let get = spec.operation("/orders/{orderId}", HttpMethod::Get).unwrap();
    assert_eq!(get.operation_id.as_deref(), Some("getOrder"));
    assert_eq!(get.tags, vec!["OrderController"]);
}
