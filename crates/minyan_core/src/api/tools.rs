//! Function-calling bindings for the create and nearby operations.
//!
//! # Responsibility
//! - Describe `createBroadcast` and `findNearbyBroadcasts` as function
//!   declarations with JSON-schema parameters.
//! - Route a named call with JSON arguments to the matching handler.
//!
//! # Invariants
//! - Parameter names are identical to the wire field names.
//! - Numeric range constraints appear in descriptions only, as
//!   `(Constraints: minimum: X, maximum: Y)`.

use crate::api::broadcast_api::{ApiResponse, BroadcastApi, NearbyParams};
use crate::model::broadcast::MinyanType;
use crate::repo::broadcast_repo::BroadcastRepository;
use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const CREATE_BROADCAST: &str = "createBroadcast";
pub const FIND_NEARBY_BROADCASTS: &str = "findNearbyBroadcasts";

/// One callable function exposed to a function-calling client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Result envelope handed back to the calling client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ToolOutcome {
    fn from_response(response: ApiResponse) -> Self {
        if response.is_success() {
            return Self {
                success: true,
                data: Some(response.body.unwrap_or(Value::Null)),
                error: None,
                status_code: None,
            };
        }

        Self {
            success: false,
            data: None,
            error: Some(
                response
                    .error_message()
                    .unwrap_or("request failed")
                    .to_string(),
            ),
            status_code: Some(response.status),
        }
    }
}

struct ParamSpec {
    name: &'static str,
    kind: &'static str,
    format: Option<&'static str>,
    description: &'static str,
    minyan_type_enum: bool,
    range: Option<(f64, f64)>,
    required: bool,
}

const CREATE_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "latitude",
        kind: "number",
        format: Some("double"),
        description: "Latitude of the requested minyan location",
        minyan_type_enum: false,
        range: Some((-90.0, 90.0)),
        required: true,
    },
    ParamSpec {
        name: "longitude",
        kind: "number",
        format: Some("double"),
        description: "Longitude of the requested minyan location",
        minyan_type_enum: false,
        range: Some((-180.0, 180.0)),
        required: true,
    },
    ParamSpec {
        name: "minyanType",
        kind: "string",
        format: None,
        description: "Prayer service being requested",
        minyan_type_enum: true,
        range: None,
        required: true,
    },
    ParamSpec {
        name: "earliestTime",
        kind: "string",
        format: Some("date-time"),
        description: "Earliest acceptable start time (ISO-8601, UTC)",
        minyan_type_enum: false,
        range: None,
        required: true,
    },
    ParamSpec {
        name: "latestTime",
        kind: "string",
        format: Some("date-time"),
        description: "Latest acceptable start time (ISO-8601, UTC)",
        minyan_type_enum: false,
        range: None,
        required: true,
    },
];

const NEARBY_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "latitude",
        kind: "number",
        format: Some("double"),
        description: "Latitude of the search center",
        minyan_type_enum: false,
        range: Some((-90.0, 90.0)),
        required: true,
    },
    ParamSpec {
        name: "longitude",
        kind: "number",
        format: Some("double"),
        description: "Longitude of the search center",
        minyan_type_enum: false,
        range: Some((-180.0, 180.0)),
        required: true,
    },
    ParamSpec {
        name: "radius",
        kind: "number",
        format: Some("double"),
        description: "Search radius in miles",
        minyan_type_enum: false,
        range: Some((0.0, f64::INFINITY)),
        required: true,
    },
    ParamSpec {
        name: "minyanType",
        kind: "string",
        format: None,
        description: "Only return broadcasts for this prayer service",
        minyan_type_enum: true,
        range: None,
        required: false,
    },
];

/// Declarations for every callable operation.
pub fn tool_declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: CREATE_BROADCAST,
            description: "Create a new broadcast when looking for a minyan.",
            parameters: parameters_schema(CREATE_PARAMS),
        },
        ToolDeclaration {
            name: FIND_NEARBY_BROADCASTS,
            description: "Find people near you who need the same minyan.",
            parameters: parameters_schema(NEARBY_PARAMS),
        },
    ]
}

/// Executes one named call against the API.
///
/// Nearby arguments may be JSON numbers or numeric strings.
pub fn dispatch_tool<R: BroadcastRepository>(
    api: &BroadcastApi<R>,
    name: &str,
    args: &Value,
) -> ToolOutcome {
    debug!("event=tool_dispatch module=api name={name}");
    let response = match name {
        CREATE_BROADCAST => api.create(args),
        FIND_NEARBY_BROADCASTS => api.nearby(&nearby_params_from_args(args)),
        other => {
            return ToolOutcome {
                success: false,
                data: None,
                error: Some(format!("Unknown function: {other}")),
                status_code: None,
            };
        }
    };
    ToolOutcome::from_response(response)
}

fn nearby_params_from_args(args: &Value) -> NearbyParams {
    let Some(object) = args.as_object() else {
        return NearbyParams::default();
    };

    NearbyParams::from_pairs(object.iter().filter_map(|(key, value)| {
        let text = match value {
            Value::Null => return None,
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Some((key.as_str(), text))
    }))
}

fn parameters_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(param.kind));
        property.insert(
            "description".to_string(),
            json!(describe_with_constraints(param)),
        );
        if let Some(format) = param.format {
            property.insert("format".to_string(), json!(format));
        }
        if param.minyan_type_enum {
            let names: Vec<&str> = MinyanType::ALL.iter().map(|kind| kind.as_str()).collect();
            property.insert("enum".to_string(), json!(names));
        }
        properties.insert(param.name.to_string(), Value::Object(property));

        if param.required {
            required.push(param.name);
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn describe_with_constraints(param: &ParamSpec) -> String {
    let Some((minimum, maximum)) = param.range else {
        return param.description.to_string();
    };

    let mut constraints = vec![format!("minimum: {minimum}")];
    if maximum.is_finite() {
        constraints.push(format!("maximum: {maximum}"));
    }
    format!(
        "{} (Constraints: {})",
        param.description,
        constraints.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_are_folded_into_descriptions() {
        let declarations = tool_declarations();
        let create = &declarations[0];
        let latitude = &create.parameters["properties"]["latitude"];
        assert_eq!(
            latitude["description"],
            "Latitude of the requested minyan location (Constraints: minimum: -90, maximum: 90)"
        );
        assert!(latitude.get("minimum").is_none());

        let nearby = &declarations[1];
        assert_eq!(
            nearby.parameters["properties"]["radius"]["description"],
            "Search radius in miles (Constraints: minimum: 0)"
        );
    }

    #[test]
    fn nearby_args_accept_numbers_and_strings() {
        let params = nearby_params_from_args(&json!({
            "latitude": 40.713,
            "longitude": "-74.0059",
            "radius": 2,
            "minyanType": null,
        }));
        assert_eq!(params.latitude.as_deref(), Some("40.713"));
        assert_eq!(params.longitude.as_deref(), Some("-74.0059"));
        assert_eq!(params.radius.as_deref(), Some("2"));
        assert_eq!(params.minyan_type, None);
    }
}
