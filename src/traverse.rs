//! Depth-first walks over the transform forest.
//!
//! All walks use an explicit stack, so nesting depth is bounded only by
//! memory. Siblings are visited in file order.

use crate::structs::{PegboardData, TransformData};

#[derive(Clone, Copy, Debug)]
/// A node visited by a walk.
pub struct WalkEntry<'a> {
    pub node: &'a TransformData,
    /// Index of the parent in the walk result. `None` for root transforms.
    pub parent: Option<usize>,
    /// 0 for root transforms.
    pub depth: usize,
}

/// Pre-order iterator over a transform forest.
pub struct Iter<'a> {
    stack: Vec<(&'a TransformData, usize)>,
    skip_disabled: bool,
}

impl<'a> Iter<'a> {
    fn new(roots: &'a [TransformData], skip_disabled: bool) -> Self {
        let mut iter = Iter {
            stack: Vec::with_capacity(roots.len()),
            skip_disabled,
        };
        iter.push_all(roots, 0);
        iter
    }

    fn push_all(&mut self, nodes: &'a [TransformData], depth: usize) {
        // Reversed so the first sibling is popped first.
        self.stack.extend(nodes.iter().rev().map(|n| (n, depth)));
    }

    /// Like `next`, with the depth of the returned node.
    fn next_with_depth(&mut self) -> Option<(&'a TransformData, usize)> {
        loop {
            let (node, depth) = self.stack.pop()?;
            if self.skip_disabled && !node.enabled {
                continue;
            }
            self.push_all(&node.child, depth + 1);
            return Some((node, depth));
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TransformData;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_depth().map(|(node, _)| node)
    }
}

fn walk(roots: &[TransformData], skip_disabled: bool) -> Vec<WalkEntry<'_>> {
    let mut iter = Iter::new(roots, skip_disabled);
    let mut out: Vec<WalkEntry> = Vec::new();
    // Index of the last visited node at each depth.
    let mut last_at_depth: Vec<usize> = Vec::new();

    while let Some((node, depth)) = iter.next_with_depth() {
        last_at_depth.truncate(depth);
        let parent = depth.checked_sub(1).and_then(|d| last_at_depth.get(d).copied());
        last_at_depth.push(out.len());
        out.push(WalkEntry { node, parent, depth });
    }
    out
}

impl PegboardData {
    /// Every transform, enabled or not, in pre-order.
    pub fn iter_all(&self) -> Iter<'_> {
        Iter::new(&self.transforms, false)
    }

    /// Transforms that are drawn: disabled nodes and their subtrees are skipped.
    pub fn iter_visible(&self) -> Iter<'_> {
        Iter::new(&self.transforms, true)
    }

    /// [`Self::iter_all`] with parent links, for building an editable tree view.
    pub fn walk_all(&self) -> Vec<WalkEntry<'_>> {
        walk(&self.transforms, false)
    }

    pub fn walk_visible(&self) -> Vec<WalkEntry<'_>> {
        walk(&self.transforms, true)
    }
}

impl TransformData {
    /// This transform and all of its descendants, in pre-order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(std::slice::from_ref(self), false)
    }
}
