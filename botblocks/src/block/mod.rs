pub mod param;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use param::{Param, Params};

/// Actuator subsystem a block targets, or `Control` for flow nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Arm,
    Wheel,
    Control,
    Other,
}

/// How a wheel block drives the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelMotion {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

impl WheelMotion {
    pub fn is_linear(self) -> bool {
        matches!(self, WheelMotion::Forward | WheelMotion::Backward)
    }

    pub fn is_angular(self) -> bool {
        !self.is_linear()
    }
}

/// The closed block vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    RaiseArm,
    LowerArm,
    Wave,
    Handshake,
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    Repeat,
    Pause,
}

impl BlockKind {
    pub const ALL: [BlockKind; 10] = [
        BlockKind::RaiseArm,
        BlockKind::LowerArm,
        BlockKind::Wave,
        BlockKind::Handshake,
        BlockKind::MoveForward,
        BlockKind::MoveBackward,
        BlockKind::TurnLeft,
        BlockKind::TurnRight,
        BlockKind::Repeat,
        BlockKind::Pause,
    ];

    /// The name used in program files and arm gesture commands.
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::RaiseArm => "raise_arm",
            BlockKind::LowerArm => "lower_arm",
            BlockKind::Wave => "wave",
            BlockKind::Handshake => "handshake",
            BlockKind::MoveForward => "move_forward",
            BlockKind::MoveBackward => "move_backward",
            BlockKind::TurnLeft => "turn_left",
            BlockKind::TurnRight => "turn_right",
            BlockKind::Repeat => "repeat",
            BlockKind::Pause => "pause",
        }
    }

    pub fn category(self) -> Category {
        match self {
            BlockKind::RaiseArm | BlockKind::LowerArm | BlockKind::Wave | BlockKind::Handshake => {
                Category::Arm
            }
            BlockKind::MoveForward
            | BlockKind::MoveBackward
            | BlockKind::TurnLeft
            | BlockKind::TurnRight => Category::Wheel,
            BlockKind::Repeat => Category::Control,
            BlockKind::Pause => Category::Other,
        }
    }

    /// Only the repetition primitive owns children.
    pub fn is_container(self) -> bool {
        matches!(self, BlockKind::Repeat)
    }

    pub fn wheel_motion(self) -> Option<WheelMotion> {
        match self {
            BlockKind::MoveForward => Some(WheelMotion::Forward),
            BlockKind::MoveBackward => Some(WheelMotion::Backward),
            BlockKind::TurnLeft => Some(WheelMotion::TurnLeft),
            BlockKind::TurnRight => Some(WheelMotion::TurnRight),
            _ => None,
        }
    }

    /// Params this kind declares.
    pub fn params(self) -> &'static [Param] {
        match self {
            BlockKind::MoveForward | BlockKind::MoveBackward => &[Param::Speed, Param::Duration],
            BlockKind::TurnLeft | BlockKind::TurnRight => &[Param::Angle],
            BlockKind::Repeat => &[Param::Times],
            BlockKind::Pause => &[Param::Seconds],
            BlockKind::RaiseArm | BlockKind::LowerArm | BlockKind::Wave | BlockKind::Handshake => {
                &[]
            }
        }
    }

    pub fn accepts(self, param: Param) -> bool {
        self.params().contains(&param)
    }

    /// One default block per kind, in vocabulary order.
    pub fn palette() -> Vec<Block> {
        BlockKind::ALL.into_iter().map(Block::new).collect()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockKind {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| BlockError::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    #[error("block '{kind}' has no parameter '{param}'")]
    ParamNotApplicable { kind: BlockKind, param: Param },
    #[error("parameter '{param}' must be a finite number, got {value}")]
    NonFiniteParam { param: Param, value: f64 },
    #[error("block '{0}' is not a container and cannot have children")]
    LeafWithChildren(BlockKind),
    #[error("unknown block kind '{0}'")]
    UnknownKind(String),
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),
}

/// An owned program tree node: a leaf command or a container with children.
///
/// The fields are private so a `Block` is valid by construction: params are
/// clamped and declared by the kind, and only containers carry children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::parser::BlockDef", into = "crate::parser::BlockDef")]
pub struct Block {
    kind: BlockKind,
    params: Params,
    children: Vec<Block>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Block {
            kind,
            params: Params::new(),
            children: Vec::new(),
        }
    }

    /// Convenience constructor for a repeat container.
    pub fn repeat(times: f64, children: Vec<Block>) -> Result<Self, BlockError> {
        let mut block = Block::new(BlockKind::Repeat).with_param(Param::Times, times)?;
        for child in children {
            block.push_child(child)?;
        }
        Ok(block)
    }

    pub fn with_param(mut self, param: Param, value: f64) -> Result<Self, BlockError> {
        self.set_param(param, value)?;
        Ok(self)
    }

    pub fn set_param(&mut self, param: Param, value: f64) -> Result<(), BlockError> {
        if !self.kind.accepts(param) {
            return Err(BlockError::ParamNotApplicable {
                kind: self.kind,
                param,
            });
        }
        let value = param.clamp(value)?;
        self.params.insert(param, value);
        Ok(())
    }

    pub fn push_child(&mut self, child: Block) -> Result<(), BlockError> {
        if !self.kind.is_container() {
            return Err(BlockError::LeafWithChildren(self.kind));
        }
        self.children.push(child);
        Ok(())
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The param's stored value, or its default when unset.
    pub fn param(&self, param: Param) -> f64 {
        self.params.get(param).unwrap_or_else(|| param.default_value())
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub(crate) fn into_parts(self) -> (BlockKind, Params, Vec<Block>) {
        (self.kind, self.params, self.children)
    }

    pub(crate) fn from_parts(kind: BlockKind, params: Params, children: Vec<Block>) -> Self {
        Block {
            kind,
            params,
            children,
        }
    }
}
