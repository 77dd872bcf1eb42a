//! Generic `WheelDrive` trait for differential-drive bases.
//!
//! The control loop only ever talks to this trait, so a simulated base and a
//! physical motor controller are interchangeable.

use sonarnav_types::{NavError, WheelSpeeds};

/// A differential-drive base commanded by left/right wheel speeds.
pub trait WheelDrive: Send {
    /// Stable identifier for this drive, e.g. `"p3dx_base"`.
    fn id(&self) -> &str;

    /// Command both wheels.  Fire-and-forget: returning `Ok` means the
    /// command was handed over, not that the wheels reached the speed.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Collaborator`] if the command cannot be sent.
    fn set_wheel_speeds(&mut self, speeds: WheelSpeeds) -> Result<(), NavError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LastCommandDrive {
        last: Option<WheelSpeeds>,
    }

    impl WheelDrive for LastCommandDrive {
        fn id(&self) -> &str {
            "test_base"
        }

        fn set_wheel_speeds(&mut self, speeds: WheelSpeeds) -> Result<(), NavError> {
            self.last = Some(speeds);
            Ok(())
        }
    }

    #[test]
    fn drive_records_last_command() {
        let mut drive = LastCommandDrive { last: None };
        drive.set_wheel_speeds(WheelSpeeds::new(0.4, 0.6)).unwrap();
        drive.set_wheel_speeds(WheelSpeeds::new(-0.4, 0.6)).unwrap();
        assert_eq!(drive.last, Some(WheelSpeeds::new(-0.4, 0.6)));
    }
}
