use serde::{Deserialize, Serialize};

use super::errors::TrackerError;

/// Location は地図上の点（WGS84 の度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `field` はエラーメッセージに出す入力名
    pub fn validate(&self, field: &str) -> Result<(), TrackerError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(TrackerError::ValidationFailed(format!(
                "{field}.lat must be within [-90, 90], got {}",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(TrackerError::ValidationFailed(format!(
                "{field}.lng must be within [-180, 180], got {}",
                self.lng
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_edges_of_the_map() {
        Location::new(90.0, -180.0).validate("location").unwrap();
        Location::new(-90.0, 180.0).validate("location").unwrap();
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        let err = Location::new(91.0, 0.0).validate("to_location").unwrap_err();
        assert!(err.to_string().contains("to_location.lat"));

        assert!(Location::new(0.0, f64::NAN).validate("location").is_err());
    }
}
