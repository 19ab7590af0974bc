//! Structural edits on a [`Program`].
//!
//! Every edit works on a copy and hands it back, so a failed edit leaves the
//! caller's program untouched and a successful one is observable as a new
//! value with a higher revision.

use thiserror::Error;
use tracing::debug;

use crate::block::{Block, BlockError, Param};
use crate::path::Path;
use crate::program::Program;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("{path} does not name a container")]
    InvalidTarget { path: Path },
    #[error("index {index} is out of range under {parent} ({len} children)")]
    OutOfRange {
        parent: Path,
        index: usize,
        len: usize,
    },
    #[error("cannot move {moved} into {dest}: the destination is inside the moved block")]
    CyclicMove { moved: Path, dest: Path },
    #[error(transparent)]
    Block(#[from] BlockError),
}

impl Program {
    /// Insert `block` at `index` among the children of `parent`.
    pub fn insert(&self, parent: &Path, index: usize, block: Block) -> Result<Program, EditError> {
        let mut next = self.clone();
        let parent_id = next.resolve_parent(parent)?;
        let len = next.siblings(parent_id).len();
        if index > len {
            return Err(EditError::OutOfRange {
                parent: parent.clone(),
                index,
                len,
            });
        }
        let kind = block.kind();
        let id = next.alloc(block, parent_id);
        next.siblings_mut(parent_id).insert(index, id);
        debug!(%parent, index, %kind, "inserted block");
        Ok(next.bumped())
    }

    /// Delete the block at `index` under `parent`, with its whole subtree.
    pub fn remove(&self, parent: &Path, index: usize) -> Result<Program, EditError> {
        let mut next = self.clone();
        let parent_id = next.resolve_parent(parent)?;
        let len = next.siblings(parent_id).len();
        if index >= len {
            return Err(EditError::OutOfRange {
                parent: parent.clone(),
                index,
                len,
            });
        }
        let id = next.siblings_mut(parent_id).remove(index);
        next.free(id);
        debug!(%parent, index, "removed block");
        Ok(next.bumped())
    }

    /// Detach the block at `from` and re-insert it at `dest_index` under
    /// `dest_parent`.
    ///
    /// A `dest_parent` at or below `from` is always `CyclicMove`, even when
    /// it does not address a container. Otherwise `dest_parent` is resolved
    /// before the source is detached, and `dest_index` counts positions in the
    /// destination list after detaching.
    pub fn move_node(
        &self,
        from: &Path,
        dest_parent: &Path,
        dest_index: usize,
    ) -> Result<Program, EditError> {
        let Some((_, from_index)) = from.split_last() else {
            return Err(EditError::InvalidTarget { path: from.clone() });
        };
        if dest_parent.starts_with(from) {
            return Err(EditError::CyclicMove {
                moved: from.clone(),
                dest: dest_parent.clone(),
            });
        }

        let mut next = self.clone();
        let moved = next.resolve(from)?;
        let dest = next.resolve_parent(dest_parent)?;
        if let Some(dest_id) = dest {
            if next.is_within(dest_id, moved) {
                return Err(EditError::CyclicMove {
                    moved: from.clone(),
                    dest: dest_parent.clone(),
                });
            }
        }

        let old_parent = next.node_ref(moved).parent();
        next.siblings_mut(old_parent).remove(from_index);

        let len = next.siblings(dest).len();
        if dest_index > len {
            return Err(EditError::OutOfRange {
                parent: dest_parent.clone(),
                index: dest_index,
                len,
            });
        }
        next.siblings_mut(dest).insert(dest_index, moved);
        next.node_mut(moved).parent = dest;
        debug!(%from, %dest_parent, dest_index, "moved block");
        Ok(next.bumped())
    }

    /// Move a block within one sibling list.
    ///
    /// Splice semantics: the block is removed from `from`, then inserted at
    /// `to` in the shortened list, so `reorder(p, i, j)` followed by
    /// `reorder(p, j, i)` restores the original order.
    pub fn reorder(&self, parent: &Path, from: usize, to: usize) -> Result<Program, EditError> {
        let mut next = self.clone();
        let parent_id = next.resolve_parent(parent)?;
        let len = next.siblings(parent_id).len();
        for index in [from, to] {
            if index >= len {
                return Err(EditError::OutOfRange {
                    parent: parent.clone(),
                    index,
                    len,
                });
            }
        }
        let siblings = next.siblings_mut(parent_id);
        let id = siblings.remove(from);
        siblings.insert(to, id);
        debug!(%parent, from, to, "reordered block");
        Ok(next.bumped())
    }

    /// Set a param on the block at `path`, clamped to the param's domain.
    pub fn set_param(&self, path: &Path, param: Param, value: f64) -> Result<Program, EditError> {
        let mut next = self.clone();
        let id = next.resolve(path)?;
        let kind = next.node_ref(id).kind();
        if !kind.accepts(param) {
            return Err(BlockError::ParamNotApplicable { kind, param }.into());
        }
        let value = param.clamp(value)?;
        next.node_mut(id).params.insert(param, value);
        debug!(%path, %param, value, "set parameter");
        Ok(next.bumped())
    }

    /// Discard the current tree and adopt `blocks` as the new root sequence.
    ///
    /// The new arena holds only `blocks`; ids from `self` do not carry over.
    pub fn replace(&self, blocks: Vec<Block>) -> Program {
        let mut next = Program::from_blocks(blocks);
        next.revision = self.revision + 1;
        next
    }
}
