/*!
Post-processing hooks.

Interceptors run after the generator has built a node and may rewrite it in
place. Within each kind they run in registration order; a failing interceptor
fails the schema or endpoint it was invoked for.
*/

use crate::{
    error::InterceptorError,
    registry::{ControllerDef, EndpointDef, FieldDef, ParamDef},
    resolver::TypeDescriptor,
    specification::{Operation, Parameter, RequestBody, Schema},
};

/// Outcome of a single interceptor invocation
pub type InterceptorResult = Result<(), InterceptorError>;

/// Rewrites a finished component schema
pub trait SchemaInterceptor: Send + Sync {
    fn intercept(&self, ty: &TypeDescriptor, schema: &mut Schema) -> InterceptorResult;
}

/// Rewrites one property schema of a component
pub trait SchemaFieldInterceptor: Send + Sync {
    fn intercept(
        &self,
        owner: &TypeDescriptor,
        field: &FieldDef,
        schema: &mut Schema,
    ) -> InterceptorResult;
}

/// Rewrites a finished operation
pub trait OperationInterceptor: Send + Sync {
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        operation: &mut Operation,
    ) -> InterceptorResult;
}

/// Rewrites a declared operation parameter
pub trait OperationParameterInterceptor: Send + Sync {
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        param: &ParamDef,
        parameter: &mut Parameter,
    ) -> InterceptorResult;
}

/// Rewrites a request body
pub trait RequestBodyInterceptor: Send + Sync {
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        param: &ParamDef,
        body: &mut RequestBody,
    ) -> InterceptorResult;
}

impl<F> SchemaInterceptor for F
where
    F: Fn(&TypeDescriptor, &mut Schema) -> InterceptorResult + Send + Sync,
{
    fn intercept(&self, ty: &TypeDescriptor, schema: &mut Schema) -> InterceptorResult {
        self(ty, schema)
    }
}

impl<F> SchemaFieldInterceptor for F
where
    F: Fn(&TypeDescriptor, &FieldDef, &mut Schema) -> InterceptorResult + Send + Sync,
{
    fn intercept(
        &self,
        owner: &TypeDescriptor,
        field: &FieldDef,
        schema: &mut Schema,
    ) -> InterceptorResult {
        self(owner, field, schema)
    }
}

impl<F> OperationInterceptor for F
where
    F: Fn(&ControllerDef, &EndpointDef, &mut Operation) -> InterceptorResult + Send + Sync,
{
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        operation: &mut Operation,
    ) -> InterceptorResult {
        self(controller, endpoint, operation)
    }
}

impl<F> OperationParameterInterceptor for F
where
    F: Fn(&ControllerDef, &EndpointDef, &ParamDef, &mut Parameter) -> InterceptorResult
        + Send
        + Sync,
{
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        param: &ParamDef,
        parameter: &mut Parameter,
    ) -> InterceptorResult {
        self(controller, endpoint, param, parameter)
    }
}

impl<F> RequestBodyInterceptor for F
where
    F: Fn(&ControllerDef, &EndpointDef, &ParamDef, &mut RequestBody) -> InterceptorResult
        + Send
        + Sync,
{
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        param: &ParamDef,
        body: &mut RequestBody,
    ) -> InterceptorResult {
        self(controller, endpoint, param, body)
    }
}

/// Registered interceptors, per kind, in registration order
#[derive(Default)]
pub struct Interceptors {
    pub schema: Vec<Box<dyn SchemaInterceptor>>,
    pub schema_field: Vec<Box<dyn SchemaFieldInterceptor>>,
    pub operation: Vec<Box<dyn OperationInterceptor>>,
    pub operation_parameter: Vec<Box<dyn OperationParameterInterceptor>>,
    pub request_body: Vec<Box<dyn RequestBodyInterceptor>>,
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("schema", &self.schema.len())
            .field("schema_field", &self.schema_field.len())
            .field("operation", &self.operation.len())
            .field("operation_parameter", &self.operation_parameter.len())
            .field("request_body", &self.request_body.len())
            .finish()
    }
}
