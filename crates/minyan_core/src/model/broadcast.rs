//! Broadcast domain model.
//!
//! # Responsibility
//! - Define the canonical broadcast record and its wire shape.
//! - Define creation input and the partial-update patch type.
//!
//! # Invariants
//! - `id` and `created_at` are assigned once and never patched.
//! - `earliest_time <= latest_time` on every persisted record.
//! - `active` only changes through an explicit patch.

use crate::model::timestamp;
use crate::model::validate::{
    validate_coordinates, validate_latitude, validate_longitude, validate_time, validate_type,
    validate_window, ValidationError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of one broadcast.
pub type BroadcastId = Uuid;

/// Prayer session a broadcast is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MinyanType {
    /// Morning service.
    Shacharit,
    /// Afternoon service.
    Mincha,
    /// Evening service.
    Maariv,
}

impl MinyanType {
    pub const ALL: [MinyanType; 3] = [Self::Shacharit, Self::Mincha, Self::Maariv];

    /// Lowercase wire and storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shacharit => "shacharit",
            Self::Mincha => "mincha",
            Self::Maariv => "maariv",
        }
    }
}

impl Display for MinyanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinyanType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        validate_type(value)
    }
}

impl TryFrom<String> for MinyanType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_type(&value)
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_coordinates(self.latitude, self.longitude)
    }
}

/// Canonical broadcast record.
///
/// Serialized with camelCase field names; timestamps render as RFC 3339
/// strings in UTC with a trailing `Z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: BroadcastId,
    pub latitude: f64,
    pub longitude: f64,
    pub minyan_type: MinyanType,
    pub earliest_time: DateTime<Utc>,
    pub latest_time: DateTime<Utc>,
    /// Starts `true`; there is no automatic expiry.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Broadcast {
    /// Builds an active record with a fresh id and the current time as
    /// `created_at`.
    pub fn new(fields: NewBroadcast) -> Self {
        Self::with_id(Uuid::new_v4(), fields, Utc::now())
    }

    /// Builds an active record with caller-provided identity.
    ///
    /// Does not validate; callers run [`Broadcast::validate`] before writes.
    pub fn with_id(id: BroadcastId, fields: NewBroadcast, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            latitude: fields.latitude,
            longitude: fields.longitude,
            minyan_type: fields.minyan_type,
            earliest_time: fields.earliest_time,
            latest_time: fields.latest_time,
            active: true,
            created_at,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Checks the record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_coordinates(self.latitude, self.longitude)?;
        validate_window(&self.earliest_time, &self.latest_time)
    }

    /// Overwrites exactly the fields present in `patch`.
    ///
    /// The merged record is not validated here; write paths validate it as a
    /// whole afterwards.
    pub fn apply(&mut self, patch: &BroadcastPatch) {
        if let Some(latitude) = patch.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            self.longitude = longitude;
        }
        if let Some(minyan_type) = patch.minyan_type {
            self.minyan_type = minyan_type;
        }
        if let Some(earliest_time) = patch.earliest_time {
            self.earliest_time = earliest_time;
        }
        if let Some(latest_time) = patch.latest_time {
            self.latest_time = latest_time;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }
}

/// Creation input for one broadcast, decoded from the create body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBroadcast {
    pub latitude: f64,
    pub longitude: f64,
    pub minyan_type: MinyanType,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub earliest_time: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub latest_time: DateTime<Utc>,
}

impl NewBroadcast {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_coordinates(self.latitude, self.longitude)?;
        validate_window(&self.earliest_time, &self.latest_time)
    }
}

/// Partial update: `None` fields keep their stored value.
///
/// Decoding rejects unknown keys (including the immutable `id` and
/// `createdAt`) and explicit `null` values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BroadcastPatch {
    #[serde(default, deserialize_with = "present")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub minyan_type: Option<MinyanType>,
    #[serde(default, deserialize_with = "timestamp::deserialize_some")]
    pub earliest_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_some")]
    pub latest_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub active: Option<bool>,
}

// A present key must carry a value; `null` does not mean "unset".
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl BroadcastPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Checks the fields that can be judged without the stored record.
    ///
    /// The window is only checked here when both ends are supplied; a
    /// one-sided window change is checked after merging.
    pub fn validate_fields(&self) -> Result<(), ValidationError> {
        if let Some(latitude) = self.latitude {
            validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.longitude {
            validate_longitude(longitude)?;
        }
        if let Some(earliest) = &self.earliest_time {
            validate_time("earliestTime", earliest)?;
        }
        if let Some(latest) = &self.latest_time {
            validate_time("latestTime", latest)?;
        }
        if let (Some(earliest), Some(latest)) = (&self.earliest_time, &self.latest_time) {
            validate_window(earliest, latest)?;
        }
        Ok(())
    }
}
