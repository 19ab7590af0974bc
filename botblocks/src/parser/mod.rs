pub mod error;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::ParseError;

use crate::Program;
use crate::block::{Block, BlockError, BlockKind, Param, Params};

/// On-disk shape of one block. Params are flattened into optional keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BlockDef {
    kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    times: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<BlockDef>,
}

impl BlockDef {
    fn slot(&mut self, param: Param) -> &mut Option<f64> {
        match param {
            Param::Speed => &mut self.speed,
            Param::Angle => &mut self.angle,
            Param::Duration => &mut self.duration,
            Param::Seconds => &mut self.seconds,
            Param::Times => &mut self.times,
        }
    }
}

impl TryFrom<BlockDef> for Block {
    type Error = BlockError;

    fn try_from(mut def: BlockDef) -> Result<Self, Self::Error> {
        let mut block = Block::new(def.kind);
        for param in Param::ALL {
            if let Some(value) = def.slot(param).take() {
                block.set_param(param, value)?;
            }
        }
        for child in def.children {
            block.push_child(Block::try_from(child)?)?;
        }
        Ok(block)
    }
}

impl From<Block> for BlockDef {
    fn from(block: Block) -> Self {
        let (kind, params, children) = block.into_parts();
        let mut def = BlockDef {
            kind,
            speed: None,
            angle: None,
            duration: None,
            seconds: None,
            times: None,
            children: children.into_iter().map(BlockDef::from).collect(),
        };
        write_params(&mut def, &params);
        def
    }
}

fn write_params(def: &mut BlockDef, params: &Params) {
    for (param, value) in params.iter() {
        *def.slot(param) = Some(value);
    }
}

/// A whole program file. Top-level tables other than `blocks` are ignored.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgramFile {
    #[serde(default)]
    blocks: Vec<Block>,
}

/// Program file entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the TOML source into a Program.
    pub fn parse(&self) -> Result<Program, ParseError> {
        let file: ProgramFile = toml::from_str(&self.source).map_err(|e| {
            let error = ParseError::from_toml(e, self.file_id);
            if error.message.contains("unknown variant") {
                let kinds: Vec<&str> = BlockKind::ALL.iter().map(|k| k.name()).collect();
                error.with_note(format!("block kinds: {}", kinds.join(", ")))
            } else {
                error
            }
        })?;
        debug!(blocks = file.blocks.len(), "parsed program file");
        Ok(Program::from_blocks(file.blocks))
    }
}

/// Serialize a program back into the file format.
pub fn render(program: &Program) -> Result<String, toml::ser::Error> {
    let file = ProgramFile {
        blocks: program.to_blocks(),
    };
    toml::to_string_pretty(&file)
}
