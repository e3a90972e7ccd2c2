use groute_common::geom::GrPoint;

#[derive(Clone, Debug)]
pub struct GrTreeNode {
    pub point: GrPoint,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Final routing tree of one net, stored as an arena rooted at node 0.
///
/// Parent/child pairs on the same layer are wires and must be axis-aligned;
/// pairs at the same (x, y) on different layers are via stacks.
#[derive(Clone, Debug)]
pub struct GrTree {
    nodes: Vec<GrTreeNode>,
}

impl GrTree {
    pub const ROOT: usize = 0;

    pub fn new(root: GrPoint) -> Self {
        Self {
            nodes: vec![GrTreeNode {
                point: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> GrPoint {
        self.nodes[Self::ROOT].point
    }

    #[inline]
    pub fn point(&self, node: usize) -> GrPoint {
        self.nodes[node].point
    }

    #[inline]
    pub fn children(&self, node: usize) -> &[usize] {
        &self.nodes[node].children
    }

    pub fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }

    /// Attaches `point` below `parent` and returns its index. A point equal
    /// to the parent's is merged into it instead.
    pub fn add_child(&mut self, parent: usize, point: GrPoint) -> usize {
        if self.nodes[parent].point == point {
            return parent;
        }
        let idx = self.nodes.len();
        self.nodes.push(GrTreeNode {
            point,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Node indices in pre-order, children visited in insertion order.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        order
    }

    /// Every (parent, child) point pair, parents in pre-order.
    pub fn edges(&self) -> impl Iterator<Item = (GrPoint, GrPoint)> + '_ {
        self.preorder().into_iter().flat_map(move |node| {
            let from = self.nodes[node].point;
            self.nodes[node]
                .children
                .iter()
                .map(move |&child| (from, self.nodes[child].point))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_child_is_merged() {
        let mut tree = GrTree::new(GrPoint::new(1, 2, 2));
        let same = tree.add_child(GrTree::ROOT, GrPoint::new(1, 2, 2));
        assert_eq!(same, GrTree::ROOT);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn preorder_visits_children_in_order() {
        let mut tree = GrTree::new(GrPoint::new(1, 0, 0));
        let a = tree.add_child(GrTree::ROOT, GrPoint::new(1, 4, 0));
        let b = tree.add_child(GrTree::ROOT, GrPoint::new(2, 0, 0));
        let c = tree.add_child(a, GrPoint::new(2, 4, 0));
        assert_eq!(tree.preorder(), vec![0, a, c, b]);
        let edges: Vec<_> = tree.edges().collect();
        assert_eq!(edges.len(), 3);
        // All child pairs of a node come before those of its descendants.
        assert_eq!(edges[1], (GrPoint::new(1, 0, 0), GrPoint::new(2, 0, 0)));
        assert_eq!(edges[2], (GrPoint::new(1, 4, 0), GrPoint::new(2, 4, 0)));
        assert_eq!(tree.parent(c), Some(a));
    }
}
