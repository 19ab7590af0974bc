use std::fmt;

use serde::Serialize;

/// Where a command is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorTarget {
    Arm,
    Drive,
}

impl fmt::Display for ActuatorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorTarget::Arm => f.write_str("arm"),
            ActuatorTarget::Drive => f.write_str("drive"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Linear and angular velocity for the drive base. Unused axes stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    pub fn linear(x: f64) -> Self {
        Twist {
            linear: Vector3 { x, ..Vector3::default() },
            angular: Vector3::default(),
        }
    }

    pub fn angular(z: f64) -> Self {
        Twist {
            linear: Vector3::default(),
            angular: Vector3 { z, ..Vector3::default() },
        }
    }

    pub fn stop() -> Self {
        Twist::default()
    }
}

/// One fire-and-forget actuator command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Drive(Twist),
    Arm { gesture: String },
}

impl Command {
    pub fn gesture(name: impl Into<String>) -> Self {
        Command::Arm {
            gesture: name.into(),
        }
    }
}

/// Compact form used in logs and scenario expectations:
/// `arm:wave`, `drive:0.20,0.00` (linear x, angular z).
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Drive(twist) => {
                write!(f, "drive:{:.2},{:.2}", twist.linear.x, twist.angular.z)
            }
            Command::Arm { gesture } => write!(f, "arm:{}", gesture),
        }
    }
}
