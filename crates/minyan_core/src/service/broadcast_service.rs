//! Broadcast lifecycle service.
//!
//! # Responsibility
//! - Provide create/get/update/delete/nearby entry points for callers.
//! - Validate inputs before delegating to the repository.
//! - Collapse layered errors into the caller-facing taxonomy.
//!
//! # Invariants
//! - The service holds no state besides its repository handle.
//! - Validation failures from the service and the repository surface as the
//!   same `BroadcastError::Validation` kind.
//! - Log events carry ids, types and counts only.

use crate::geo::nearby::{find_nearby, NearbyError, NearbyHit, NearbyQuery};
use crate::model::broadcast::{Broadcast, BroadcastId, BroadcastPatch, NewBroadcast};
use crate::model::validate::ValidationError;
use crate::repo::broadcast_repo::{BroadcastRepository, RepoError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ServiceResult<T> = Result<T, BroadcastError>;

/// Caller-facing error taxonomy.
#[derive(Debug)]
pub enum BroadcastError {
    /// Malformed or out-of-range input, or a failed invariant.
    Validation(ValidationError),
    /// The referenced broadcast does not exist.
    NotFound(BroadcastId),
    /// Storage-layer failure. Not retried here.
    Internal(RepoError),
}

impl BroadcastError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
        }
    }
}

impl Display for BroadcastError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "broadcast not found: {id}"),
            Self::Internal(err) => write!(f, "internal storage error: {err}"),
        }
    }
}

impl Error for BroadcastError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Internal(err) => Some(err),
        }
    }
}

impl From<ValidationError> for BroadcastError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for BroadcastError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Internal(other),
        }
    }
}

impl From<NearbyError> for BroadcastError {
    fn from(value: NearbyError) -> Self {
        match value {
            NearbyError::Validation(err) => Self::Validation(err),
            NearbyError::Repo(err) => err.into(),
        }
    }
}

/// Use-case service wrapper over a broadcast repository.
pub struct BroadcastService<R: BroadcastRepository> {
    repo: R,
}

impl<R: BroadcastRepository> BroadcastService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates and persists a new active broadcast.
    pub fn create(&self, fields: &NewBroadcast) -> ServiceResult<Broadcast> {
        let started_at = Instant::now();
        let result = fields
            .validate()
            .map_err(BroadcastError::from)
            .and_then(|()| self.repo.create_broadcast(fields).map_err(Into::into));

        match &result {
            Ok(broadcast) => info!(
                "event=broadcast_create module=service status=ok id={} minyan_type={} duration_ms={}",
                broadcast.id,
                broadcast.minyan_type,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("broadcast_create", None, err, started_at),
        }
        result
    }

    pub fn get(&self, id: BroadcastId) -> ServiceResult<Broadcast> {
        let result = self.repo.get_broadcast(id).map_err(BroadcastError::from);
        if let Err(err) = &result {
            debug!(
                "event=broadcast_get module=service status=error id={id} error_code={}",
                err.code()
            );
        }
        result
    }

    /// Applies a partial update and returns the merged record.
    ///
    /// # Contract
    /// - Only fields present in `patch` change.
    /// - Supplied fields are checked first; the merged record is checked again
    ///   by the repository inside its write transaction.
    pub fn update(&self, id: BroadcastId, patch: &BroadcastPatch) -> ServiceResult<Broadcast> {
        let started_at = Instant::now();
        let result = patch
            .validate_fields()
            .map_err(BroadcastError::from)
            .and_then(|()| self.repo.update_broadcast(id, patch).map_err(Into::into));

        match &result {
            Ok(broadcast) => info!(
                "event=broadcast_update module=service status=ok id={} active={} duration_ms={}",
                broadcast.id,
                broadcast.active,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("broadcast_update", Some(id), err, started_at),
        }
        result
    }

    /// Permanently removes one broadcast.
    pub fn delete(&self, id: BroadcastId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_broadcast(id).map_err(BroadcastError::from);

        match &result {
            Ok(()) => info!(
                "event=broadcast_delete module=service status=ok id={id} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("broadcast_delete", Some(id), err, started_at),
        }
        result
    }

    /// Finds active broadcasts within the query radius, nearest first.
    pub fn nearby(&self, query: &NearbyQuery) -> ServiceResult<Vec<NearbyHit>> {
        let started_at = Instant::now();
        let result = find_nearby(&self.repo, query).map_err(BroadcastError::from);

        match &result {
            Ok(hits) => info!(
                "event=nearby_query module=geo status=ok radius_miles={} minyan_type={} hits={} duration_ms={}",
                query.radius_miles,
                query.minyan_type.map_or("any", |kind| kind.as_str()),
                hits.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("nearby_query", None, err, started_at),
        }
        result
    }
}

fn log_failure(
    event: &str,
    id: Option<BroadcastId>,
    err: &BroadcastError,
    started_at: Instant,
) {
    let id = id.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string());
    let duration_ms = started_at.elapsed().as_millis();
    match err {
        BroadcastError::Internal(inner) => error!(
            "event={event} module=service status=error id={id} duration_ms={duration_ms} error_code={} error={inner}",
            err.code()
        ),
        _ => warn!(
            "event={event} module=service status=rejected id={id} duration_ms={duration_ms} error_code={}",
            err.code()
        ),
    }
}
