//! Generic `SonarArray` trait for ranging sensor rings.

use sonarnav_types::NavError;

/// A ring of ranging sensors sampled together once per control cycle.
///
/// Index order is fixed by the driver and must match the zone layout the
/// controller is configured with.
pub trait SonarArray: Send {
    /// Stable identifier for this sensor ring, e.g. `"p3dx_sonar"`.
    fn id(&self) -> &str;

    /// Sample every sensor and return the distances in index order.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Collaborator`] if the sweep cannot be read (e.g.
    /// the simulator connection is lost).
    fn get_sensor_readings(&mut self) -> Result<Vec<f32>, NavError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSonar {
        id: String,
        distance: f32,
    }

    impl SonarArray for FixedSonar {
        fn id(&self) -> &str {
            &self.id
        }

        fn get_sensor_readings(&mut self) -> Result<Vec<f32>, NavError> {
            Ok(vec![self.distance; 16])
        }
    }

    #[test]
    fn fixed_sonar_reports_every_sensor() {
        let mut sonar = FixedSonar {
            id: "front_ring".to_string(),
            distance: 0.75,
        };
        assert_eq!(sonar.id(), "front_ring");
        let readings = sonar.get_sensor_readings().unwrap();
        assert_eq!(readings.len(), 16);
        assert!(readings.iter().all(|&d| (d - 0.75).abs() < f32::EPSILON));
    }
}
