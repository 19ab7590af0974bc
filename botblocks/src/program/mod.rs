pub mod edit;

use crate::block::{Block, BlockKind, Category, Param, Params};
use crate::path::Path;

pub use edit::EditError;

/// Stable handle of a node in a [`Program`] arena.
///
/// Ids survive every edit that keeps the node alive; they are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    kind: BlockKind,
    params: Params,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The edited program: an ordered forest of blocks stored in an arena.
///
/// Parent/child relationships are id links, so structural edits work on ids
/// resolved from a [`Path`] instead of on nested vectors. Edits never mutate
/// in place: each returns a new `Program` with a higher [`revision`].
///
/// Removed nodes leave empty slots so ids are never reused, and each edit
/// copies the whole arena. Both grow with the number of blocks ever
/// inserted; [`Program::replace`] and [`Program::from_blocks`] start from a
/// compact arena.
///
/// [`revision`]: Program::revision
#[derive(Debug, Clone, Default)]
pub struct Program {
    nodes: Vec<Option<Node>>,
    roots: Vec<NodeId>,
    revision: u64,
}

/// Borrowed view of one live node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    program: &'a Program,
    id: NodeId,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.node.kind
    }

    pub fn category(&self) -> Category {
        self.node.kind.category()
    }

    pub fn is_container(&self) -> bool {
        self.node.kind.is_container()
    }

    pub fn params(&self) -> &'a Params {
        &self.node.params
    }

    pub fn param(&self, param: Param) -> f64 {
        self.node
            .params
            .get(param)
            .unwrap_or_else(|| param.default_value())
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let program = self.program;
        let node = self.node;
        node.children.iter().filter_map(move |id| program.node(*id))
    }

    /// Materialize this subtree as an owned [`Block`].
    pub fn to_block(&self) -> Block {
        let children = self.children().map(|child| child.to_block()).collect();
        Block::from_parts(self.node.kind, self.node.params.clone(), children)
    }
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Build a program from an owned root sequence (a loaded file, a fixture).
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut program = Program::new();
        for block in blocks {
            let id = program.alloc(block, None);
            program.roots.push(id);
        }
        program
    }

    /// Incremented by every successful edit. Use it for change detection.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of root blocks.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of live nodes at every depth.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|node| !node.kind.is_container())
            .count()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        let node = self.nodes.get(id.0)?.as_ref()?;
        Some(NodeRef {
            program: self,
            id,
            node,
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.roots.iter().filter_map(|id| self.node(*id))
    }

    pub fn to_blocks(&self) -> Vec<Block> {
        self.roots().map(|node| node.to_block()).collect()
    }

    pub fn block_at(&self, path: &Path) -> Result<Block, EditError> {
        let id = self.resolve(path)?;
        Ok(self.node_ref(id).to_block())
    }

    /// Pre-order traversal yielding every node with its path.
    pub fn walk(&self) -> Vec<(Path, NodeRef<'_>)> {
        fn visit<'a>(node: NodeRef<'a>, path: Path, out: &mut Vec<(Path, NodeRef<'a>)>) {
            let children: Vec<NodeRef<'a>> = node.children().collect();
            out.push((path.clone(), node));
            for (index, child) in children.into_iter().enumerate() {
                visit(child, path.child(index), out);
            }
        }

        let mut out = Vec::new();
        for (index, root) in self.roots().enumerate() {
            visit(root, Path::new(vec![index]), &mut out);
        }
        out
    }

    /// Resolve a non-empty path to the node it names.
    pub fn resolve(&self, path: &Path) -> Result<NodeId, EditError> {
        let mut parent: Option<NodeId> = None;
        let mut walked = Path::root();
        for &index in path.indices() {
            if let Some(id) = parent {
                if !self.node_ref(id).is_container() {
                    return Err(EditError::InvalidTarget { path: walked });
                }
            }
            let siblings = self.siblings(parent);
            let id = *siblings.get(index).ok_or_else(|| EditError::OutOfRange {
                parent: walked.clone(),
                index,
                len: siblings.len(),
            })?;
            walked = walked.child(index);
            parent = Some(id);
        }
        parent.ok_or(EditError::InvalidTarget { path: Path::root() })
    }

    /// Resolve a path naming a sibling list: the root list or a container.
    pub(crate) fn resolve_parent(&self, path: &Path) -> Result<Option<NodeId>, EditError> {
        if path.is_root() {
            return Ok(None);
        }
        let id = self.resolve(path)?;
        if !self.node_ref(id).is_container() {
            return Err(EditError::InvalidTarget { path: path.clone() });
        }
        Ok(Some(id))
    }

    /// True if `node` is `ancestor` or lies somewhere beneath it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|n| n.parent());
        }
        false
    }

    fn node_ref(&self, id: NodeId) -> NodeRef<'_> {
        self.node(id).expect("resolved node id is live")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("resolved node id is live")
    }

    fn siblings(&self, parent: Option<NodeId>) -> &Vec<NodeId> {
        match parent {
            None => &self.roots,
            Some(id) => {
                let node = self.node_ref(id).node;
                &node.children
            }
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            None => &mut self.roots,
            Some(id) => &mut self.node_mut(id).children,
        }
    }

    /// Store `block` and its subtree, returning the id of its root.
    fn alloc(&mut self, block: Block, parent: Option<NodeId>) -> NodeId {
        let (kind, params, children) = block.into_parts();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            kind,
            params,
            parent,
            children: Vec::new(),
        }));
        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.alloc(child, Some(id)))
            .collect();
        self.node_mut(id).children = child_ids;
        id
    }

    /// Drop the subtree rooted at `id`. The caller unlinks it first.
    fn free(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            for child in node.children {
                self.free(child);
            }
        }
    }

    fn bumped(mut self) -> Self {
        self.revision += 1;
        self
    }
}

/// Structural equality: same kinds, params and sibling order at every level.
impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.to_blocks() == other.to_blocks()
    }
}
