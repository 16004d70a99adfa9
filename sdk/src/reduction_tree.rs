//! Arena describing the order in which segment receipts are joined.
//!
//! Leaves are the lifted segments, internal nodes are joins of their two children. A node
//! becomes ready once both children have produced a receipt.

use zkc_recursion::{ReductionStrategy, SuccinctReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Leaf { segment: usize },
    Join { left: usize, right: usize },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    pending: u8,
    receipt: Option<SuccinctReceipt>,
}

#[derive(Debug)]
pub(crate) struct ReductionTree {
    nodes: Vec<Node>,
    root: usize,
    leaves: usize,
}

impl ReductionTree {
    /// Builds the join plan for `leaves > 0` segments
    pub fn new(leaves: usize, strategy: ReductionStrategy) -> Self {
        let mut nodes: Vec<Node> = (0..leaves)
            .map(|segment| Node {
                kind: NodeKind::Leaf { segment },
                parent: None,
                pending: 0,
                receipt: None,
            })
            .collect();

        let join = |nodes: &mut Vec<Node>, left: usize, right: usize| {
            let id = nodes.len();
            nodes.push(Node {
                kind: NodeKind::Join { left, right },
                parent: None,
                pending: 2,
                receipt: None,
            });
            nodes[left].parent = Some(id);
            nodes[right].parent = Some(id);
            id
        };

        let root = match strategy {
            ReductionStrategy::Fold => (1..leaves).fold(0, |acc, leaf| join(&mut nodes, acc, leaf)),
            ReductionStrategy::Tree => {
                let mut level: Vec<usize> = (0..leaves).collect();
                while level.len() > 1 {
                    let mut next = Vec::with_capacity(level.len().div_ceil(2));
                    for pair in level.chunks(2) {
                        match *pair {
                            [left, right] => next.push(join(&mut nodes, left, right)),
                            [single] => next.push(single),
                            _ => {}
                        }
                    }
                    level = next;
                }
                level.first().copied().unwrap_or(0)
            }
        };
        Self { nodes, root, leaves }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Node ids of the leaves, in segment order
    pub fn leaves(&self) -> std::ops::Range<usize> {
        0..self.leaves
    }

    pub fn kind(&self, node: usize) -> NodeKind {
        self.nodes[node].kind
    }

    /// Number of join nodes
    pub fn joins(&self) -> usize {
        self.nodes.len() - self.leaves
    }

    /// Stores the receipt of `node` and returns its parent if that parent is now ready
    pub fn complete(&mut self, node: usize, receipt: SuccinctReceipt) -> Option<usize> {
        self.nodes[node].receipt = Some(receipt);
        let parent = self.nodes[node].parent?;
        self.nodes[parent].pending -= 1;
        (self.nodes[parent].pending == 0).then_some(parent)
    }

    /// Takes the children receipts of a ready join node
    pub fn take_children(&mut self, node: usize) -> Option<(SuccinctReceipt, SuccinctReceipt)> {
        let NodeKind::Join { left, right } = self.nodes[node].kind else {
            return None;
        };
        let l = self.nodes[left].receipt.take()?;
        let r = self.nodes[right].receipt.take()?;
        Some((l, r))
    }

    pub fn take_root(&mut self) -> Option<SuccinctReceipt> {
        let root = self.root();
        self.nodes[root].receipt.take()
    }
}
