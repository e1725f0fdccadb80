// src/extractors/hierarchy.rs
//
// Rebuilds the subcontractor tree from the flat, tier-tagged row list. The
// portal has no parent pointers: a row belongs to the closest preceding row
// with a smaller tier. Nodes live in an arena and refer to their children by
// index while the tree is being built; `finish` materializes the nested form.

use crate::extractors::record::SubcontractorNode;

#[derive(Debug)]
struct ArenaNode {
    node: SubcontractorNode,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    arena: Vec<ArenaNode>,
    roots: Vec<usize>,
    /// Open nodes, tiers strictly increasing from bottom to top.
    stack: Vec<usize>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next row in source order.
    pub fn push(&mut self, tier: u32, mut node: SubcontractorNode) {
        node.tier = tier;
        node.more_subcontractors.clear();

        // a sibling closes the previous sibling's subtree along with anything deeper
        while let Some(&top) = self.stack.last() {
            if self.arena[top].node.tier >= tier {
                self.stack.pop();
            } else {
                break;
            }
        }

        let index = self.arena.len();
        self.arena.push(ArenaNode {
            node,
            children: Vec::new(),
        });

        match self.stack.last() {
            Some(&parent) => self.arena[parent].children.push(index),
            None => self.roots.push(index),
        }
        self.stack.push(index);
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Consumes the builder and returns the forest of top-level nodes.
    pub fn finish(self) -> Vec<SubcontractorNode> {
        let mut slots: Vec<Option<ArenaNode>> = self.arena.into_iter().map(Some).collect();
        // children always have a larger index than their parent, so assembling
        // back to front sees every subtree complete before it is attached
        for index in (0..slots.len()).rev() {
            let Some(children) = slots[index].as_ref().map(|n| n.children.clone()) else {
                continue;
            };
            let built: Vec<SubcontractorNode> = children
                .into_iter()
                .filter_map(|child| slots[child].take().map(|c| c.node))
                .collect();
            if let Some(slot) = slots[index].as_mut() {
                slot.node.more_subcontractors = built;
            }
        }

        self.roots
            .into_iter()
            .filter_map(|root| slots[root].take().map(|n| n.node))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_hierarchy<I>(rows: I) -> Vec<SubcontractorNode>
    where
        I: IntoIterator<Item = (u32, SubcontractorNode)>,
    {
        let mut builder = HierarchyBuilder::new();
        for (tier, node) in rows {
            builder.push(tier, node);
        }
        builder.finish()
    }

    fn named(name: &str) -> SubcontractorNode {
        SubcontractorNode {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn flatten(nodes: &[SubcontractorNode], out: &mut Vec<(u32, String)>) {
        for node in nodes {
            out.push((node.tier, node.name.clone()));
            flatten(&node.more_subcontractors, out);
        }
    }

    fn assert_children_deeper(nodes: &[SubcontractorNode]) {
        for node in nodes {
            for child in &node.more_subcontractors {
                assert!(child.tier > node.tier, "{} under {}", child.name, node.name);
            }
            assert_children_deeper(&node.more_subcontractors);
        }
    }

    #[test]
    fn test_siblings_and_children() {
        let tree = build_hierarchy(vec![
            (1, named("A")),
            (2, named("B")),
            (2, named("C")),
            (1, named("D")),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "A");
        assert_eq!(tree[0].tier, 1);
        let kids: Vec<_> = tree[0].more_subcontractors.iter().map(|n| (n.name.as_str(), n.tier)).collect();
        assert_eq!(kids, vec![("B", 2), ("C", 2)]);
        assert!(tree[0].more_subcontractors[0].more_subcontractors.is_empty());
        assert_eq!(tree[1].name, "D");
        assert!(tree[1].more_subcontractors.is_empty());
    }

    #[test]
    fn test_deep_chain_then_shallow_return() {
        let tree = build_hierarchy(vec![
            (1, named("A")),
            (2, named("B")),
            (3, named("C")),
            (4, named("D")),
            (2, named("E")),
            (3, named("F")),
        ]);
        assert_eq!(tree.len(), 1);
        let a = &tree[0];
        assert_eq!(a.more_subcontractors.len(), 2);
        assert_eq!(a.more_subcontractors[0].more_subcontractors[0].more_subcontractors[0].name, "D");
        assert_eq!(a.more_subcontractors[1].name, "E");
        assert_eq!(a.more_subcontractors[1].more_subcontractors[0].name, "F");
    }

    #[test]
    fn test_tier_gaps_and_leading_deep_rows() {
        // with nothing open above it a deep row is top-level; tier gaps are allowed
        let tree = build_hierarchy(vec![
            (3, named("orphan")),
            (1, named("A")),
            (4, named("skip-level")),
            (2, named("B")),
        ]);
        let top: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(top, vec!["orphan", "A"]);
        let under_a: Vec<_> = tree[1].more_subcontractors.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(under_a, vec!["skip-level", "B"]);
    }

    #[test]
    fn test_preorder_reproduces_input() {
        let input = vec![
            (1, "a"), (2, "b"), (3, "c"), (3, "d"), (2, "e"), (1, "f"), (2, "g"), (4, "h"), (3, "i"), (1, "j"),
        ];
        let tree = build_hierarchy(input.iter().map(|(t, n)| (*t, named(n))));

        let mut flat = Vec::new();
        flatten(&tree, &mut flat);
        let expected: Vec<_> = input.iter().map(|(t, n)| (*t, n.to_string())).collect();
        assert_eq!(flat, expected);
        assert_children_deeper(&tree);
    }

    #[test]
    fn test_incremental_builder() {
        let mut builder = HierarchyBuilder::new();
        assert!(builder.is_empty());
        builder.push(1, named("A"));
        builder.push(2, named("B"));
        assert_eq!(builder.len(), 2);
        let tree = builder.finish();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].more_subcontractors[0].name, "B");
    }

    #[test]
    fn test_empty_input() {
        assert!(build_hierarchy(Vec::new()).is_empty());
    }
}
