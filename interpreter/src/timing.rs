use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed delays and drive constants used by the executor.
///
/// Every field is optional in a config file; missing fields keep the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// Nominal time an arm gesture takes to complete.
    pub arm_actuation_ms: u64,
    /// Extra settle time after an arm gesture inside a repeat.
    pub arm_settle_ms: u64,
    /// Pause between repeat iterations.
    pub repeat_pause_ms: u64,
    /// Delay inserted before a risky wheel transition.
    pub safety_interlock_ms: u64,
    /// Interval between velocity commands during a turn.
    pub tick_ms: u64,
    /// Turn rate in rad/s.
    pub angular_speed: f64,
    /// Empirical correction for drivetrain slew, added to the turn rate.
    pub drivetrain_correction: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            arm_actuation_ms: 2000,
            arm_settle_ms: 1000,
            repeat_pause_ms: 500,
            safety_interlock_ms: 1000,
            tick_ms: 100,
            angular_speed: 0.3,
            drivetrain_correction: 0.0634,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    timing: Timing,
}

impl Timing {
    /// Read the `[timing]` table of a config file. Other tables are ignored.
    pub fn from_toml_str(source: &str) -> Result<Timing, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        file.timing.validate()?;
        Ok(file.timing)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".into()));
        }
        let rate = self.angular_speed + self.drivetrain_correction;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "angular_speed + drivetrain_correction must be positive, got {}",
                rate
            )));
        }
        Ok(())
    }

    pub fn arm_actuation(&self) -> Duration {
        Duration::from_millis(self.arm_actuation_ms)
    }

    pub fn arm_settle(&self) -> Duration {
        Duration::from_millis(self.arm_settle_ms)
    }

    pub fn repeat_pause(&self) -> Duration {
        Duration::from_millis(self.repeat_pause_ms)
    }

    pub fn safety_interlock(&self) -> Duration {
        Duration::from_millis(self.safety_interlock_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Seconds needed to sweep `angle_degrees`.
    pub fn turn_seconds(&self, angle_degrees: f64) -> f64 {
        angle_degrees.to_radians() / (self.angular_speed + self.drivetrain_correction)
    }

    pub fn turn_duration(&self, angle_degrees: f64) -> Duration {
        Duration::from_secs_f64(self.turn_seconds(angle_degrees))
    }

    /// Number of velocity ticks published during a sweep of `duration`.
    pub fn sweep_ticks(&self, duration: Duration) -> u32 {
        (duration.as_secs_f64() / self.tick().as_secs_f64()).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_turn_duration() {
        let timing = Timing::default();
        let expected = std::f64::consts::PI / (0.3 + 0.0634);
        assert!((timing.turn_seconds(180.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn quarter_turn_needs_44_ticks() {
        let timing = Timing::default();
        // 4.3225 s at 100 ms per tick
        assert_eq!(timing.sweep_ticks(timing.turn_duration(90.0)), 44);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let timing = Timing::from_toml_str("[timing]\ntick_ms = 50\n").unwrap();
        assert_eq!(timing.tick_ms, 50);
        assert_eq!(timing.arm_actuation_ms, 2000);
        assert_eq!(Timing::from_toml_str("").unwrap(), Timing::default());
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            Timing::from_toml_str("[timing]\ntick_ms = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Timing::from_toml_str("[timing]\nangular_speed = -1.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Timing::from_toml_str("[timing]\ntick = 5\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
