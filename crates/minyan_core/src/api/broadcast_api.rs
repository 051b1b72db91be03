//! Transport-agnostic JSON handlers for broadcast operations.
//!
//! # Responsibility
//! - Decode wire payloads into typed inputs at the boundary.
//! - Map service outcomes onto HTTP-style status codes and JSON bodies.
//!
//! # Invariants
//! - Handlers never panic; every failure becomes an `{error}` body.
//! - Field names match the public contract (`minyanType`, `earliestTime`, ...).
//! - Internal error details are logged, never returned to callers.

use crate::geo::nearby::NearbyQuery;
use crate::model::broadcast::{Broadcast, BroadcastId, BroadcastPatch, GeoPoint, NewBroadcast};
use crate::model::validate::{validate_type, ValidationError};
use crate::repo::broadcast_repo::BroadcastRepository;
use crate::service::broadcast_service::{BroadcastError, BroadcastService};
use log::error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub const CREATED_MESSAGE: &str = "Broadcast created successfully";
pub const UPDATED_MESSAGE: &str = "Broadcast updated successfully";
const NOT_FOUND_MESSAGE: &str = "Broadcast not found";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Status code plus optional JSON body (absent for `204`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    fn serialized<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::json(status, body),
            Err(err) => {
                error!("event=api_encode module=api status=error error={err}");
                Self::error(500, INTERNAL_MESSAGE)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `error` message of a failure body, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("error")?.as_str()
    }
}

impl From<BroadcastError> for ApiResponse {
    fn from(value: BroadcastError) -> Self {
        match value {
            BroadcastError::Validation(err) => Self::error(400, err.to_string()),
            BroadcastError::NotFound(_) => Self::error(404, NOT_FOUND_MESSAGE),
            // Already logged by the service with full detail.
            BroadcastError::Internal(_) => Self::error(500, INTERNAL_MESSAGE),
        }
    }
}

impl From<ValidationError> for ApiResponse {
    fn from(value: ValidationError) -> Self {
        Self::error(400, value.to_string())
    }
}

/// Raw query-string parameters of a nearby request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NearbyParams {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
    pub minyan_type: Option<String>,
}

impl NearbyParams {
    /// Collects parameters from decoded query-string pairs.
    ///
    /// Unrecognized keys are ignored; a repeated key keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "latitude" => &mut params.latitude,
                "longitude" => &mut params.longitude,
                "radius" => &mut params.radius,
                "minyanType" => &mut params.minyan_type,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }

    /// Parses and validates the parameters into a typed query.
    ///
    /// An empty `minyanType` means "any type".
    pub fn to_query(&self) -> Result<NearbyQuery, ValidationError> {
        let latitude = parse_number_param(self.latitude.as_deref(), "latitude")?;
        let longitude = parse_number_param(self.longitude.as_deref(), "longitude")?;
        let radius = parse_number_param(self.radius.as_deref(), "radius")?;

        let mut query = NearbyQuery::new(GeoPoint::new(latitude, longitude), radius);
        if let Some(kind) = self.minyan_type.as_deref().map(str::trim) {
            if !kind.is_empty() {
                query = query.with_type(validate_type(kind)?);
            }
        }
        query.validate()?;
        Ok(query)
    }
}

/// JSON request handlers over a broadcast service.
pub struct BroadcastApi<R: BroadcastRepository> {
    service: BroadcastService<R>,
}

impl<R: BroadcastRepository> BroadcastApi<R> {
    pub fn new(service: BroadcastService<R>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &BroadcastService<R> {
        &self.service
    }

    /// `201 {id, message}` on success.
    pub fn create(&self, body: &Value) -> ApiResponse {
        let fields = match decode_body::<NewBroadcast>(body) {
            Ok(fields) => fields,
            Err(err) => return err.into(),
        };

        match self.service.create(&fields) {
            Ok(broadcast) => ApiResponse::json(
                201,
                json!({ "id": broadcast.id.to_string(), "message": CREATED_MESSAGE }),
            ),
            Err(err) => err.into(),
        }
    }

    /// `200` with the broadcast JSON.
    pub fn get(&self, id: &str) -> ApiResponse {
        let Some(id) = parse_id(id) else {
            return ApiResponse::error(404, NOT_FOUND_MESSAGE);
        };

        match self.service.get(id) {
            Ok(broadcast) => ApiResponse::serialized(200, &broadcast),
            Err(err) => err.into(),
        }
    }

    /// `200` with an array of broadcasts, nearest first.
    pub fn nearby(&self, params: &NearbyParams) -> ApiResponse {
        let query = match params.to_query() {
            Ok(query) => query,
            Err(err) => return err.into(),
        };

        match self.service.nearby(&query) {
            Ok(hits) => {
                let broadcasts: Vec<Broadcast> =
                    hits.into_iter().map(|hit| hit.broadcast).collect();
                ApiResponse::serialized(200, &broadcasts)
            }
            Err(err) => err.into(),
        }
    }

    /// `200 {message}` on success. The body may carry any subset of the
    /// mutable fields.
    pub fn update(&self, id: &str, body: &Value) -> ApiResponse {
        let Some(id) = parse_id(id) else {
            return ApiResponse::error(404, NOT_FOUND_MESSAGE);
        };
        let patch = match decode_body::<BroadcastPatch>(body) {
            Ok(patch) => patch,
            Err(err) => return err.into(),
        };

        match self.service.update(id, &patch) {
            Ok(_) => ApiResponse::json(200, json!({ "message": UPDATED_MESSAGE })),
            Err(err) => err.into(),
        }
    }

    /// `204` with no body on success.
    pub fn delete(&self, id: &str) -> ApiResponse {
        let Some(id) = parse_id(id) else {
            return ApiResponse::error(404, NOT_FOUND_MESSAGE);
        };

        match self.service.delete(id) {
            Ok(()) => ApiResponse::no_content(),
            Err(err) => err.into(),
        }
    }
}

// An id that is not a UUID cannot name a stored broadcast.
fn parse_id(text: &str) -> Option<BroadcastId> {
    Uuid::parse_str(text.trim()).ok()
}

fn parse_number_param(value: Option<&str>, field: &'static str) -> Result<f64, ValidationError> {
    let text = value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(ValidationError::MissingField(field))?;
    text.parse::<f64>()
        .map_err(|_| ValidationError::InvalidField {
            field,
            message: format!("expected a number, got `{text}`"),
        })
}

/// Decodes a JSON body; unknown or malformed fields become a `400`.
fn decode_body<T: DeserializeOwned>(body: &Value) -> Result<T, ValidationError> {
    T::deserialize(body).map_err(|err| ValidationError::InvalidBody(err.to_string()))
}
