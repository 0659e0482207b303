use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;

/// A measurement site with fixed coordinates.
///
/// Deleting a location removes every reading and episode that references it
/// (see `ModifyRepository::delete_location`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub created_at: DateTime<Utc>,
}

impl Location {
    /// Build a location stamped with the current time.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self::with_created_at(name, latitude, longitude, Utc::now())
    }

    pub fn with_created_at(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            created_at,
        }
    }

    /// Build a location and reject empty names or out-of-range coordinates.
    pub fn validated(name: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        let location = Self::new(name, latitude, longitude);
        location.validate()?;
        Ok(location)
    }
}
