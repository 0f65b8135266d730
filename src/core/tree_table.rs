//! Indexed tree representation.
//!
//! A `TreeTable` is a flat arena of [`Entry`] values addressed by dense
//! integer ids. Freshly built tables number their entries in post-order:
//! every child id is smaller than its parent's id and the root carries the
//! largest id. Leaves receive the lowest ids, in left-to-right order.
//!
//! Heights are measured in the species-tree frame: the table stores the
//! height of its root and every other height is derived from the depth of a
//! node below the root. This lets trees cloned from, or grown inside, the
//! species tree compare heights directly with it.
//!
//! Gene trees are mutated in place while grafting (see [`TreeTable::graft`]),
//! which temporarily breaks the post-order numbering. [`TreeTable::prune`]
//! compacts such a tree and restores the numbering.

use smallvec::{SmallVec, smallvec};
use std::collections::{HashSet, VecDeque};

use super::clade::Clade;
use crate::errors::{HidtlError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub id: usize,
    /// Id of the species-tree node this entry corresponds to.
    pub fake_id: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub distance_to_parent: Option<f64>,
    pub children: SmallVec<[usize; 2]>,
    pub distance_to_children: SmallVec<[f64; 2]>,
}

impl Entry {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeTable {
    entries: Vec<Entry>,
    root: usize,
    root_height: f64,
}

/// Builder input: one node of a rooted tree with a link to its parent.
/// Children are ordered by their position in the spec list.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeSpec {
    pub name: Option<String>,
    pub fake_id: Option<usize>,
    pub parent: Option<usize>,
    pub length: Option<f64>,
}

impl TreeTable {
    /// Assign post-order ids to `specs` and materialize the table.
    ///
    /// Ids are handed out from a worklist seeded with every leaf; an internal
    /// node is queued once all of its children carry ids. Unnamed internal
    /// nodes are named by concatenating their children's names. When
    /// `root_height` is `None` the deepest leaf is placed at height 0.
    pub(crate) fn from_specs(specs: Vec<NodeSpec>, root_height: Option<f64>) -> TreeTable {
        let n = specs.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (index, spec) in specs.iter().enumerate() {
            if let Some(parent) = spec.parent {
                children[parent].push(index);
            }
        }

        let mut pending: Vec<usize> = children.iter().map(Vec::len).collect();
        let mut worklist: VecDeque<usize> = (0..n).filter(|&i| children[i].is_empty()).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(index) = worklist.pop_front() {
            order.push(index);
            if let Some(parent) = specs[index].parent {
                pending[parent] -= 1;
                if pending[parent] == 0 {
                    worklist.push_back(parent);
                }
            }
        }

        let mut new_id = vec![0; n];
        for (id, &index) in order.iter().enumerate() {
            new_id[index] = id;
        }

        let mut names: Vec<String> = vec![String::new(); n];
        for &index in &order {
            let name = match &specs[index].name {
                Some(name) if !name.is_empty() => name.clone(),
                _ => children[index].iter().map(|&c| names[c].as_str()).collect(),
            };
            names[index] = name;
        }

        let entries: Vec<Entry> = order
            .iter()
            .enumerate()
            .map(|(id, &index)| {
                let spec = &specs[index];
                Entry {
                    id,
                    fake_id: spec.fake_id.unwrap_or(id),
                    name: names[index].clone(),
                    parent: spec.parent.map(|p| new_id[p]),
                    distance_to_parent: spec.parent.map(|_| spec.length.unwrap_or(0.)),
                    children: children[index].iter().map(|&c| new_id[c]).collect(),
                    distance_to_children: children[index]
                        .iter()
                        .map(|&c| specs[c].length.unwrap_or(0.))
                        .collect(),
                }
            })
            .collect();

        let mut table = TreeTable {
            root: entries.len().saturating_sub(1),
            entries,
            root_height: 0.,
        };
        let root_height = match root_height {
            Some(height) => height,
            None => table
                .leaves()
                .map(|leaf| table.depth(leaf.id))
                .fold(0., f64::max),
        };
        table.root_height = root_height;
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, id: usize) -> &Entry {
        &self.entries[id]
    }

    pub fn root(&self) -> &Entry {
        &self.entries[self.root]
    }

    pub fn root_height(&self) -> f64 {
        self.root_height
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|entry| entry.is_leaf())
    }

    /// Distance from the root down to `id`.
    pub fn depth(&self, id: usize) -> f64 {
        let mut depth = 0.;
        let mut current = &self.entries[id];
        while let (Some(parent), Some(distance)) = (current.parent, current.distance_to_parent) {
            depth += distance;
            current = &self.entries[parent];
        }
        depth
    }

    pub fn height(&self, id: usize) -> f64 {
        self.root_height - self.depth(id)
    }

    /// Cumulative branch length from `node` down to its descendant `leaf`,
    /// or `None` if `leaf` does not descend from `node`.
    pub fn distance_to_leaf(&self, node: usize, leaf: usize) -> Option<f64> {
        let mut distance = 0.;
        let mut current = leaf;
        while current != node {
            let entry = &self.entries[current];
            distance += entry.distance_to_parent?;
            current = entry.parent?;
        }
        Some(distance)
    }

    /// Node ids with children before their parents, starting from the root.
    /// Unlike the id order this is valid while the tree is being grafted.
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for &child in self.entries[id].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    pub fn descendant_leaves(&self, id: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let entry = &self.entries[current];
            if entry.is_leaf() {
                leaves.push(current);
            } else {
                stack.extend(entry.children.iter().rev());
            }
        }
        leaves
    }

    /// Clade of species leaves below `id`.
    pub fn clade(&self, id: usize) -> Clade {
        self.descendant_leaves(id)
            .into_iter()
            .map(|leaf| self.entries[leaf].fake_id)
            .collect()
    }

    /// Clades of all nodes, indexed by id.
    pub fn clades(&self) -> Vec<Clade> {
        let mut clades: Vec<Option<Clade>> = vec![None; self.entries.len()];
        for id in self.post_order() {
            let entry = &self.entries[id];
            let clade = if entry.is_leaf() {
                Clade::leaf(entry.fake_id)
            } else {
                entry
                    .children
                    .iter()
                    .filter_map(|&child| clades[child].as_ref())
                    .fold(None, |acc: Option<Clade>, clade| match acc {
                        None => Some(clade.clone()),
                        Some(acc) => Some(acc.union(clade)),
                    })
                    .unwrap_or_else(|| Clade::leaf(entry.fake_id))
            };
            clades[id] = Some(clade);
        }
        clades
            .into_iter()
            .enumerate()
            .map(|(id, clade)| clade.unwrap_or_else(|| self.clade(id)))
            .collect()
    }

    /// Clone the subtree rooted at `id` into a fresh table. The clone keeps
    /// the species-frame heights and the fake ids of the original.
    pub fn subtree(&self, id: usize) -> TreeTable {
        let mut specs: Vec<NodeSpec> = Vec::new();
        let mut stack: Vec<(usize, Option<usize>)> = vec![(id, None)];
        while let Some((current, parent)) = stack.pop() {
            let entry = &self.entries[current];
            let index = specs.len();
            specs.push(NodeSpec {
                name: Some(entry.name.clone()),
                fake_id: Some(entry.fake_id),
                parent,
                length: parent.and(entry.distance_to_parent),
            });
            for &child in entry.children.iter().rev() {
                stack.push((child, Some(index)));
            }
        }
        TreeTable::from_specs(specs, Some(self.height(id)))
    }

    /// Keep only the leaves whose fake id lies in `clade`.
    pub fn restrict(&self, clade: &Clade) -> Option<TreeTable> {
        let lost: HashSet<usize> = self
            .leaves()
            .filter(|leaf| !clade.contains(leaf.fake_id))
            .map(|leaf| leaf.id)
            .collect();
        self.prune(&lost)
    }

    /// Remove the subtrees rooted at `lost` and compact the tree.
    ///
    /// Internal nodes left without children are dropped, nodes left with a
    /// single child are collapsed into that child with the two branch
    /// lengths summed, and ids are reassigned in post-order. Returns `None`
    /// when nothing survives.
    pub fn prune(&self, lost: &HashSet<usize>) -> Option<TreeTable> {
        let order = self.post_order();
        let mut removed = vec![false; self.entries.len()];
        for &id in order.iter().rev() {
            let inherited = self.entries[id].parent.is_some_and(|p| removed[p]);
            removed[id] = lost.contains(&id) || inherited;
        }
        let mut alive = vec![false; self.entries.len()];
        for &id in &order {
            let entry = &self.entries[id];
            let survives =
                !removed[id] && (entry.is_leaf() || entry.children.iter().any(|&c| alive[c]));
            alive[id] = survives;
        }
        if !alive[self.root] {
            return None;
        }

        let alive_children = |id: usize| -> SmallVec<[(usize, f64); 2]> {
            let entry = &self.entries[id];
            entry
                .children
                .iter()
                .zip(entry.distance_to_children.iter())
                .filter(|(c, _)| alive[**c])
                .map(|(&c, &d)| (c, d))
                .collect()
        };
        let collapse = |mut id: usize, mut length: f64| -> (usize, f64) {
            loop {
                let children = alive_children(id);
                if children.len() != 1 {
                    return (id, length);
                }
                length += children[0].1;
                id = children[0].0;
            }
        };

        let (root, _) = collapse(self.root, 0.);
        let mut specs: Vec<NodeSpec> = Vec::new();
        let mut stack: Vec<(usize, Option<usize>, f64)> = vec![(root, None, 0.)];
        while let Some((id, parent, length)) = stack.pop() {
            let entry = &self.entries[id];
            let index = specs.len();
            specs.push(NodeSpec {
                name: Some(entry.name.clone()),
                fake_id: Some(entry.fake_id),
                parent,
                length: parent.map(|_| length),
            });
            for (child, distance) in alive_children(id).into_iter().rev() {
                let (child, distance) = collapse(child, distance);
                stack.push((child, Some(index), distance));
            }
        }
        Some(TreeTable::from_specs(specs, Some(self.height(root))))
    }

    /// Splice `subtree` into the branch above `node`.
    ///
    /// A new internal node is inserted `distance_below` above `node`; it
    /// takes `node` and the root of `subtree` (hanging from a branch of
    /// `subtree_length`) as children and keeps the remainder of the original
    /// branch. When `distance_below` exceeds the current branch the insertion
    /// point is searched further up the lineage. Inserting above the root
    /// creates a new root. Returns the id of the inserted node.
    pub fn graft(
        &mut self,
        node: usize,
        distance_below: f64,
        subtree: TreeTable,
        subtree_length: f64,
        fake_id: usize,
    ) -> Result<usize> {
        if node >= self.entries.len() {
            return Err(HidtlError::ImplementationError(format!(
                "Cannot graft above unknown node {node}"
            )));
        }
        let mut node = node;
        let mut below = distance_below.max(0.);
        while let (Some(parent), Some(distance)) = (
            self.entries[node].parent,
            self.entries[node].distance_to_parent,
        ) {
            if below <= distance {
                break;
            }
            below -= distance;
            node = parent;
        }

        let name = self
            .clade(node)
            .union(&subtree.clade(subtree.root().id))
            .to_string();

        let offset = self.entries.len();
        let subtree_root = offset + subtree.root;
        self.entries
            .extend(subtree.entries.into_iter().map(|mut entry| {
                entry.id += offset;
                entry.parent = entry.parent.map(|p| p + offset);
                entry.children.iter_mut().for_each(|c| *c += offset);
                entry
            }));

        let inserted = self.entries.len();
        let old_parent = self.entries[node].parent;
        let remainder = self.entries[node]
            .distance_to_parent
            .map(|distance| (distance - below).max(0.));
        self.entries.push(Entry {
            id: inserted,
            fake_id,
            name,
            parent: old_parent,
            distance_to_parent: remainder,
            children: smallvec![node, subtree_root],
            distance_to_children: smallvec![below, subtree_length],
        });

        self.entries[node].parent = Some(inserted);
        self.entries[node].distance_to_parent = Some(below);
        self.entries[subtree_root].parent = Some(inserted);
        self.entries[subtree_root].distance_to_parent = Some(subtree_length);

        match old_parent {
            Some(parent) => {
                let entry = &mut self.entries[parent];
                let position = entry
                    .children
                    .iter()
                    .position(|&c| c == node)
                    .ok_or_else(|| {
                        HidtlError::ImplementationError(format!(
                            "Node {node} is missing from the children of {parent}"
                        ))
                    })?;
                entry.children[position] = inserted;
                entry.distance_to_children[position] = remainder.unwrap_or(0.);
            }
            None => {
                self.root = inserted;
                self.root_height += below;
            }
        }
        Ok(inserted)
    }
}
