//! Geospatial queries over stored broadcasts.
//!
//! # Responsibility
//! - Compute great-circle distances on a spherical earth.
//! - Answer radius/type filtered "nearby" queries over active broadcasts.

pub mod distance;
pub mod nearby;
