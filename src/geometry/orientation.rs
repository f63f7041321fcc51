//! Rotation compensation between display and camera sensor.

use serde::{Deserialize, Serialize};

/// Current rotation of the display relative to its natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayRotation {
    /// Natural orientation.
    #[default]
    Rotation0,
    /// Rotated a quarter turn.
    Rotation90,
    /// Upside down.
    Rotation180,
    /// Rotated three quarter turns.
    Rotation270,
}

impl DisplayRotation {
    /// All rotations in ascending order.
    pub const ALL: [DisplayRotation; 4] = [
        DisplayRotation::Rotation0,
        DisplayRotation::Rotation90,
        DisplayRotation::Rotation180,
        DisplayRotation::Rotation270,
    ];

    /// Rotation in degrees.
    pub const fn degrees(self) -> u32 {
        match self {
            DisplayRotation::Rotation0 => 0,
            DisplayRotation::Rotation90 => 90,
            DisplayRotation::Rotation180 => 180,
            DisplayRotation::Rotation270 => 270,
        }
    }

    /// Maps a degree value back to a rotation, if it is a quarter turn.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(DisplayRotation::Rotation0),
            90 => Some(DisplayRotation::Rotation90),
            180 => Some(DisplayRotation::Rotation180),
            270 => Some(DisplayRotation::Rotation270),
            _ => None,
        }
    }
}

/// Computes the rotation needed to bring sensor output upright.
///
/// Front-facing sensors are mirrored, so their mounting angle and the
/// display rotation add up; back-facing sensors rotate against the display.
/// The result is always in `0..360`.
pub fn rotation_compensation(
    display: DisplayRotation,
    sensor_orientation: u32,
    front_facing: bool,
) -> u32 {
    let sensor = sensor_orientation % 360;
    let device = display.degrees();
    if front_facing {
        (sensor + device) % 360
    } else {
        (sensor + 360 - device) % 360
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SENSORS: [u32; 4] = [0, 90, 180, 270];

    // (device, sensor, expected back, expected front)
    const TABLE: [(u32, u32, u32, u32); 16] = [
        (0, 0, 0, 0),
        (0, 90, 90, 90),
        (0, 180, 180, 180),
        (0, 270, 270, 270),
        (90, 0, 270, 90),
        (90, 90, 0, 180),
        (90, 180, 90, 270),
        (90, 270, 180, 0),
        (180, 0, 180, 180),
        (180, 90, 270, 270),
        (180, 180, 0, 0),
        (180, 270, 90, 90),
        (270, 0, 90, 270),
        (270, 90, 180, 0),
        (270, 180, 270, 90),
        (270, 270, 0, 180),
    ];

    #[test]
    fn test_full_rotation_table() {
        for (device, sensor, back, front) in TABLE {
            let rotation = DisplayRotation::from_degrees(device).unwrap();
            assert_eq!(
                rotation_compensation(rotation, sensor, false),
                back,
                "back: device={device} sensor={sensor}"
            );
            assert_eq!(
                rotation_compensation(rotation, sensor, true),
                front,
                "front: device={device} sensor={sensor}"
            );
        }
    }

    #[test]
    fn test_documented_cases() {
        assert_eq!(
            rotation_compensation(DisplayRotation::Rotation90, 180, false),
            90
        );
        assert_eq!(
            rotation_compensation(DisplayRotation::Rotation90, 180, true),
            270
        );
    }

    #[test]
    fn test_degrees_round_trip() {
        for rotation in DisplayRotation::ALL {
            assert_eq!(DisplayRotation::from_degrees(rotation.degrees()), Some(rotation));
        }
        assert_eq!(DisplayRotation::from_degrees(45), None);
    }

    proptest! {
        #[test]
        fn prop_compensation_is_quarter_turn(
            device in 0usize..4,
            sensor in 0usize..4,
            front in any::<bool>(),
        ) {
            let result = rotation_compensation(DisplayRotation::ALL[device], SENSORS[sensor], front);
            prop_assert!(result < 360);
            prop_assert_eq!(result % 90, 0);
        }

        #[test]
        fn prop_front_and_back_agree_at_natural_rotation(sensor in 0u32..360) {
            prop_assert_eq!(
                rotation_compensation(DisplayRotation::Rotation0, sensor, true),
                rotation_compensation(DisplayRotation::Rotation0, sensor, false)
            );
        }
    }
}
