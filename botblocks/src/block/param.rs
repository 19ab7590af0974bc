use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::block::BlockError;

/// A named numeric argument of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    /// Linear speed in m/s.
    Speed,
    /// Turn angle in degrees.
    Angle,
    /// Linear motion duration in seconds.
    Duration,
    /// Pause length in seconds.
    Seconds,
    /// Repeat count.
    Times,
}

impl Param {
    pub const ALL: [Param; 5] = [
        Param::Speed,
        Param::Angle,
        Param::Duration,
        Param::Seconds,
        Param::Times,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Param::Speed => "speed",
            Param::Angle => "angle",
            Param::Duration => "duration",
            Param::Seconds => "seconds",
            Param::Times => "times",
        }
    }

    /// The closed range every stored value of this param lies in.
    pub fn domain(self) -> RangeInclusive<f64> {
        match self {
            Param::Speed => 0.1..=0.3,
            Param::Angle => 1.0..=360.0,
            Param::Duration => 0.5..=10.0,
            Param::Seconds => 1.0..=10.0,
            Param::Times => 1.0..=10.0,
        }
    }

    /// Value read when the param is unset.
    pub fn default_value(self) -> f64 {
        match self {
            Param::Speed => 0.2,
            Param::Angle => 90.0,
            Param::Duration => 2.0,
            Param::Seconds => 1.0,
            Param::Times => 1.0,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Param::Times)
    }

    /// Bring `value` into this param's domain.
    pub fn clamp(self, value: f64) -> Result<f64, BlockError> {
        if !value.is_finite() {
            return Err(BlockError::NonFiniteParam { param: self, value });
        }
        let value = if self.is_integral() { value.round() } else { value };
        let domain = self.domain();
        Ok(value.clamp(*domain.start(), *domain.end()))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| BlockError::UnknownParam(s.to_string()))
    }
}

/// Param values explicitly set on a block. Values are already clamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<Param, f64>);

impl Params {
    pub fn new() -> Self {
        Params(BTreeMap::new())
    }

    pub fn get(&self, param: Param) -> Option<f64> {
        self.0.get(&param).copied()
    }

    pub(crate) fn insert(&mut self, param: Param, value: f64) {
        self.0.insert(param, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Param, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (param, value) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}={}", param, value)?;
        }
        Ok(())
    }
}
