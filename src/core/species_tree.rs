//! The species tree and queries relating gene-tree heights to it.

use super::clade::Clade;
use super::tree_table::TreeTable;

#[derive(Clone, Debug)]
pub struct SpeciesTree {
    tree: TreeTable,
    clades: Vec<Clade>,
    heights: Vec<f64>,
}

impl SpeciesTree {
    pub fn new(tree: TreeTable) -> Self {
        let clades = tree.clades();
        let heights = (0..tree.len()).map(|id| tree.height(id)).collect();
        Self {
            tree,
            clades,
            heights,
        }
    }

    pub fn tree(&self) -> &TreeTable {
        &self.tree
    }

    pub fn n_leaves(&self) -> usize {
        self.tree.leaves().count()
    }

    pub fn root_id(&self) -> usize {
        self.tree.root().id
    }

    pub fn root_height(&self) -> f64 {
        self.tree.root_height()
    }

    pub fn height(&self, id: usize) -> f64 {
        self.heights[id]
    }

    pub fn name(&self, id: usize) -> &str {
        &self.tree.entry(id).name
    }

    pub fn clade(&self, id: usize) -> &Clade {
        &self.clades[id]
    }

    /// Smallest species node whose clade contains `clade`.
    pub fn lca(&self, clade: &Clade) -> usize {
        // ids are in post-order, so the first superset is the lowest one
        self.clades
            .iter()
            .position(|candidate| candidate.is_superset(clade))
            .unwrap_or_else(|| self.root_id())
    }

    /// Locate a point at `height` on the lineage of `clade`.
    ///
    /// Starting at the lowest node containing `clade`, climb while the
    /// parent is not above `height`. Returns the species node whose branch
    /// holds the point and the distance of the point above that node.
    pub fn map_event(&self, clade: &Clade, height: f64) -> (usize, f64) {
        let mut node = self.lca(clade);
        while let Some(parent) = self.tree.entry(node).parent {
            if self.heights[parent] > height {
                break;
            }
            node = parent;
        }
        (node, (height - self.heights[node]).max(0.))
    }

    /// Branches alive at `height`, other than the root branch and the branch
    /// of `origin`.
    pub fn transfer_candidates(&self, origin: usize, height: f64) -> Vec<usize> {
        let root = self.root_id();
        self.tree
            .entries()
            .iter()
            .filter(|entry| entry.id != origin && entry.id != root)
            .filter(|entry| {
                entry.parent.is_some_and(|parent| {
                    self.heights[entry.id] <= height && self.heights[parent] > height
                })
            })
            .map(|entry| entry.id)
            .collect()
    }
}
