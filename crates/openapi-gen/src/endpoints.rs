/*!
Endpoint to operation conversion.

Turns a registered controller endpoint into an OpenAPI operation: path
joining, parameter buckets, request body, responses, global headers and the
operation, parameter and request-body interceptors.
*/

use crate::{
    config::GlobalHeader,
    error::{FailureSubject, OpenApiError, OpenApiResult},
    interceptors::Interceptors,
    registry::{ControllerDef, EndpointDef, ParamDef, ParamLocation},
    schema::SchemaGenerator,
    specification::{HttpMethod, MediaType, Operation, Parameter, RequestBody, Response, Schema},
    type_ref::TypeRef,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

const JSON_MEDIA_TYPE: &str = "application/json";

static PATH_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("path parameter regex is valid"));

/// An operation ready to be mounted on the document
#[derive(Debug, Clone)]
pub struct BuiltOperation {
    pub path: String,
    pub method: HttpMethod,
    pub operation: Operation,
}

/// Builds operations for controller endpoints
pub struct OperationBuilder<'g> {
    interceptors: &'g Interceptors,
    global_headers: &'g IndexMap<String, GlobalHeader>,
}

impl<'g> OperationBuilder<'g> {
    pub fn new(
        interceptors: &'g Interceptors,
        global_headers: &'g IndexMap<String, GlobalHeader>,
    ) -> Self {
        Self {
            interceptors,
            global_headers,
        }
    }

    /// Build the operation of one endpoint; referenced types are defined in
    /// `schemas` as a side effect.
    pub fn build(
        &self,
        schemas: &mut SchemaGenerator<'_>,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
    ) -> OpenApiResult<BuiltOperation> {
        let method: HttpMethod = endpoint.method.parse()?;
        let path = join_paths(controller.base_path.as_deref().unwrap_or(""), &endpoint.path);
        let scope = controller.module();

        let mut path_params = Vec::new();
        let mut query_params = Vec::new();
        let mut header_params = Vec::new();
        let mut cookie_params = Vec::new();
        let mut body: Option<(&ParamDef, RequestBody)> = None;

        for param in &endpoint.params {
            let bucket = match param.location {
                ParamLocation::Path => &mut path_params,
                ParamLocation::Query => &mut query_params,
                ParamLocation::Header => &mut header_params,
                ParamLocation::Cookie => &mut cookie_params,
                ParamLocation::Body => {
                    if let Some((existing, _)) = &body {
                        return Err(OpenApiError::operation_error(format!(
                            "Endpoint declares more than one body parameter ('{}', '{}')",
                            existing.name, param.name
                        )));
                    }
                    body = Some((param, create_request_body(schemas, param, scope)?));
                    continue;
                }
            };
            bucket.push(create_parameter(schemas, param, scope)?);
        }

        // Placeholders without a declared parameter
        for placeholder in extract_path_parameters(&path) {
            if !path_params.iter().any(|p: &Parameter| p.name == placeholder) {
                path_params.push(Parameter {
                    name: placeholder,
                    location: ParamLocation::Path.as_str().to_string(),
                    description: None,
                    required: Some(true),
                    deprecated: None,
                    schema: Some(Schema::typed("string")),
                    example: None,
                });
            }
        }

        for (name, header) in self.global_headers {
            if header_params
                .iter()
                .any(|p: &Parameter| p.name.eq_ignore_ascii_case(name))
            {
                continue;
            }
            header_params.push(Parameter {
                name: name.clone(),
                location: ParamLocation::Header.as_str().to_string(),
                description: header.description.clone(),
                required: Some(header.required),
                deprecated: None,
                schema: Some(Schema::typed("string")),
                example: None,
            });
        }

        let mut parameters = path_params;
        parameters.extend(query_params);
        parameters.extend(header_params);
        parameters.extend(cookie_params);

        let tags = if endpoint.tags.is_empty() {
            vec![controller.short_name().to_string()]
        } else {
            endpoint.tags.clone()
        };

        let body_param = body.as_ref().map(|(param, _)| *param);
        let mut operation = Operation {
            tags,
            summary: endpoint.summary.clone(),
            description: endpoint.description.clone(),
            operation_id: Some(endpoint.name.clone()),
            parameters,
            request_body: body.map(|(_, request_body)| request_body),
            responses: create_responses(schemas, endpoint, scope)?,
            deprecated: endpoint.deprecated.then_some(true),
        };

        self.intercept(controller, endpoint, body_param, &mut operation)?;

        tracing::debug!("Built operation {} {} ({})", method, path, endpoint.name);
        Ok(BuiltOperation {
            path,
            method,
            operation,
        })
    }

    /// Operation interceptors, then parameter interceptors for every
    /// declared parameter, then request-body interceptors.
    fn intercept(
        &self,
        controller: &ControllerDef,
        endpoint: &EndpointDef,
        body_param: Option<&ParamDef>,
        operation: &mut Operation,
    ) -> OpenApiResult<()> {
        for interceptor in &self.interceptors.operation {
            interceptor
                .intercept(controller, endpoint, operation)
                .map_err(|e| OpenApiError::interceptor(format!("operation {}", endpoint.name), e))?;
        }

        for param in endpoint
            .params
            .iter()
            .filter(|p| p.location != ParamLocation::Body)
        {
            let location = param.location.as_str();
            let Some(parameter) = operation
                .parameters
                .iter_mut()
                .find(|p| p.name == param.name && p.location == location)
            else {
                continue;
            };
            for interceptor in &self.interceptors.operation_parameter {
                interceptor
                    .intercept(controller, endpoint, param, parameter)
                    .map_err(|e| {
                        OpenApiError::interceptor(format!("parameter {}", param.name), e)
                    })?;
            }
        }

        if let (Some(param), Some(body)) = (body_param, operation.request_body.as_mut()) {
            for interceptor in &self.interceptors.request_body {
                interceptor
                    .intercept(controller, endpoint, param, body)
                    .map_err(|e| {
                        OpenApiError::interceptor(format!("request body {}", param.name), e)
                    })?;
            }
        }

        Ok(())
    }
}

/// What a failure of `endpoint` is reported against
pub fn endpoint_subject(controller: &ControllerDef, endpoint: &EndpointDef) -> FailureSubject {
    FailureSubject::Endpoint {
        controller: controller.name.clone(),
        endpoint: endpoint.name.clone(),
        method: endpoint.method.to_uppercase(),
        path: join_paths(controller.base_path.as_deref().unwrap_or(""), &endpoint.path),
    }
}

/// Join a base path and an endpoint path with exactly one `/` between them
pub fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = match (base.is_empty(), path.is_empty()) {
        (true, true) => String::new(),
        (true, false) => path.to_string(),
        (false, true) => base.trim_start_matches('/').to_string(),
        (false, false) => format!("{}/{}", base.trim_start_matches('/'), path),
    };
    format!("/{}", joined)
}

/// Placeholder names of a path template, in order
pub fn extract_path_parameters(path: &str) -> Vec<String> {
    PATH_PARAM
        .captures_iter(path)
        .map(|captures| captures[1].to_string())
        .collect()
}

fn create_parameter(
    schemas: &mut SchemaGenerator<'_>,
    param: &ParamDef,
    scope: &str,
) -> OpenApiResult<Parameter> {
    let ty = TypeRef::parse(&param.ty)?;
    let schema = schemas.schema_for(&ty, scope)?;

    // Path parameters are always required
    let required = match param.location {
        ParamLocation::Path => true,
        _ => param.required.unwrap_or(!ty.is_option()),
    };

    Ok(Parameter {
        name: param.name.clone(),
        location: param.location.as_str().to_string(),
        description: param.description.clone(),
        required: Some(required),
        deprecated: None,
        schema: Some(schema),
        example: None,
    })
}

fn create_request_body(
    schemas: &mut SchemaGenerator<'_>,
    param: &ParamDef,
    scope: &str,
) -> OpenApiResult<RequestBody> {
    let ty = TypeRef::parse(&param.ty)?;
    let schema = schemas.schema_for(&ty, scope)?;

    let mut content = IndexMap::new();
    content.insert(
        JSON_MEDIA_TYPE.to_string(),
        MediaType {
            schema: Some(schema),
            example: None,
        },
    );

    Ok(RequestBody {
        description: param.description.clone(),
        content,
        required: Some(param.required.unwrap_or(!ty.is_option())),
    })
}

fn create_responses(
    schemas: &mut SchemaGenerator<'_>,
    endpoint: &EndpointDef,
    scope: &str,
) -> OpenApiResult<IndexMap<String, Response>> {
    let mut responses = IndexMap::new();

    // Default success response if none specified
    if endpoint.responses.is_empty() {
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful operation".to_string(),
                content: IndexMap::new(),
            },
        );
        return Ok(responses);
    }

    for response in &endpoint.responses {
        let ty = response.ty.as_deref().map(TypeRef::parse).transpose()?;
        let mut content = IndexMap::new();
        if let Some(ty) = ty.filter(|ty| !ty.is_unit()) {
            content.insert(
                JSON_MEDIA_TYPE.to_string(),
                MediaType {
                    schema: Some(schemas.schema_for(&ty, scope)?),
                    example: None,
                },
            );
        }

        let description = response
            .description
            .clone()
            .unwrap_or_else(|| status_description(&response.status).to_string());
        responses.insert(response.status.clone(), Response { description, content });
    }

    Ok(responses)
}

fn status_description(status: &str) -> &'static str {
    match status {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "409" => "Conflict",
        "422" => "Unprocessable Entity",
        "500" => "Internal Server Error",
        _ => "Response",
    }
}
