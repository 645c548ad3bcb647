//! Core data types for the storage layer.
//!
//! - [`NewReading`]: the measured fields of a sample, before the store has seen it
//! - [`Reading`]: a persisted sample carrying its store-assigned identity and `stored_at`
//! - [`DeleteOutcome`]: per-batch deletion report, including partial failures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The measured fields of one sample, as handed to [`ReadingStore::insert`].
///
/// [`ReadingStore::insert`]: crate::storage::ReadingStore::insert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in kilometers.
    pub altitude: f64,
    /// Velocity in kilometers per hour.
    pub velocity: f64,
    /// Epoch seconds reported by the upstream source; any JSON number.
    pub timestamp: f64,
}

/// A reading stored in the `readings` collection.
///
/// `id` and `stored_at` are assigned by the store at insert time and never change.
/// Within one store, `stored_at` never decreases in insertion order.
///
/// # Example
///
/// ```
/// use isstrack::storage::Reading;
/// use chrono::Utc;
///
/// let reading = Reading {
///     id: "b3f1c0de".to_string(),
///     latitude: 10.0,
///     longitude: 20.0,
///     altitude: 400.0,
///     velocity: 7660.0,
///     timestamp: 1_700_000_000.0,
///     stored_at: Utc::now(),
/// };
/// assert_eq!(reading.fields().altitude, 400.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Opaque store-assigned identifier.
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub velocity: f64,
    /// Epoch seconds reported by the upstream source; any JSON number.
    pub timestamp: f64,
    /// Server-assigned write time (UTC).
    pub stored_at: DateTime<Utc>,
}

impl Reading {
    /// Build a reading from its measured fields and store-assigned identity.
    pub fn from_new(id: impl Into<String>, new: NewReading, stored_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            latitude: new.latitude,
            longitude: new.longitude,
            altitude: new.altitude,
            velocity: new.velocity,
            timestamp: new.timestamp,
            stored_at,
        }
    }

    /// The measured fields of this reading.
    pub fn fields(&self) -> NewReading {
        NewReading {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            velocity: self.velocity,
            timestamp: self.timestamp,
        }
    }
}

/// Result of a batch delete.
///
/// Partial success is a normal outcome: `deleted` counts the records actually
/// removed and `failed_ids` lists the identifiers whose deletion errored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Number of records removed.
    pub deleted: u64,
    /// Identifiers that could not be deleted.
    pub failed_ids: Vec<String>,
}

impl DeleteOutcome {
    /// Whether every requested deletion went through.
    pub fn is_complete(&self) -> bool {
        self.failed_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_from_new_keeps_fields() {
        let new = NewReading {
            latitude: 10.0,
            longitude: 20.0,
            altitude: 400.0,
            velocity: 7660.0,
            timestamp: 1_700_000_000.0,
        };
        let now = Utc::now();
        let reading = Reading::from_new("abc", new, now);

        assert_eq!(reading.id, "abc");
        assert_eq!(reading.stored_at, now);
        assert_eq!(reading.fields(), new);
    }

    #[test]
    fn test_reading_serializes_stored_at_and_timestamp() {
        let reading = Reading::from_new(
            "abc",
            NewReading {
                latitude: 1.5,
                longitude: -2.5,
                altitude: 410.0,
                velocity: 27_600.0,
                timestamp: 42.25,
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["timestamp"], 42.25);
        assert_eq!(json["longitude"], -2.5);
        assert!(json["stored_at"].is_string());
    }

    #[test]
    fn test_delete_outcome_completeness() {
        assert!(DeleteOutcome::default().is_complete());

        let partial = DeleteOutcome {
            deleted: 30,
            failed_ids: vec!["x".to_string()],
        };
        assert!(!partial.is_complete());
    }
}
