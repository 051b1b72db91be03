//! Radius search over active broadcasts.
//!
//! # Responsibility
//! - Validate nearby queries at the boundary.
//! - Narrow candidates in storage, then apply the exact haversine check.
//!
//! # Invariants
//! - Only `active` broadcasts are returned.
//! - A hit is returned iff its distance is `<= radius_miles`.
//! - Hits are ordered by ascending distance, ties broken by id.

use crate::geo::distance::{distance_miles, latitude_band};
use crate::model::broadcast::{Broadcast, GeoPoint, MinyanType};
use crate::model::validate::{validate_radius, ValidationError};
use crate::repo::broadcast_repo::{BroadcastFilter, BroadcastRepository, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NearbyResult<T> = Result<T, NearbyError>;

/// Nearby-query error: bad input or a storage failure underneath.
#[derive(Debug)]
pub enum NearbyError {
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for NearbyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NearbyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ValidationError> for NearbyError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for NearbyError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Search options for one nearby query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub center: GeoPoint,
    pub radius_miles: f64,
    /// Optional exact-type filter.
    pub minyan_type: Option<MinyanType>,
}

impl NearbyQuery {
    /// Creates a query with no type filter.
    pub fn new(center: GeoPoint, radius_miles: f64) -> Self {
        Self {
            center,
            radius_miles,
            minyan_type: None,
        }
    }

    pub fn with_type(mut self, minyan_type: MinyanType) -> Self {
        self.minyan_type = Some(minyan_type);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.center.validate()?;
        validate_radius(self.radius_miles)
    }
}

/// Single hit returned by [`find_nearby`].
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyHit {
    pub broadcast: Broadcast,
    pub distance_miles: f64,
}

/// Returns active broadcasts within the query radius.
pub fn find_nearby<R>(repo: &R, query: &NearbyQuery) -> NearbyResult<Vec<NearbyHit>>
where
    R: BroadcastRepository + ?Sized,
{
    query.validate()?;

    let filter = BroadcastFilter {
        active_only: true,
        minyan_type: query.minyan_type,
        latitude_band: Some(latitude_band(query.center, query.radius_miles)),
    };

    let mut hits: Vec<NearbyHit> = repo
        .list_broadcasts(&filter)?
        .into_iter()
        .filter_map(|broadcast| {
            let distance = distance_miles(query.center, broadcast.location());
            (distance <= query.radius_miles).then_some(NearbyHit {
                broadcast,
                distance_miles: distance,
            })
        })
        .collect();

    hits.sort_by(|left, right| {
        left.distance_miles
            .total_cmp(&right.distance_miles)
            .then_with(|| left.broadcast.id.cmp(&right.broadcast.id))
    });

    Ok(hits)
}
