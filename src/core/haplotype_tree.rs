//! Gene trees reconstructed from a coalescent process.
//!
//! Every merge becomes an internal node at the height it happened, every
//! sampled species leaf becomes a gene leaf. The ancestor chain of each leaf
//! links the nodes together and branch lengths are height differences.

use std::collections::HashMap;

use super::clade::Clade;
use super::coalescent::{CoalescentProcess, time_sequences};
use super::tree_table::{NodeSpec, TreeTable};
use crate::errors::{HidtlError, Result};

/// Build the gene tree of `lineage` from `process`, which was recorded on
/// `locus`. Gene leaves are named after their species leaf and internal
/// nodes after their clade.
pub fn reconstruct(
    locus: &TreeTable,
    process: &CoalescentProcess,
    lineage: &Clade,
) -> Result<TreeTable> {
    let sequences = time_sequences(process, locus, lineage);
    if sequences.is_empty() {
        return Err(HidtlError::ImplementationError(format!(
            "Lineage {lineage} has no leaves in the locus tree"
        )));
    }

    let mut specs: Vec<NodeSpec> = Vec::new();
    let mut heights: Vec<f64> = Vec::new();
    let mut index_of: HashMap<Clade, usize> = HashMap::new();

    for leaf in locus.leaves().filter(|leaf| lineage.contains(leaf.fake_id)) {
        index_of.insert(Clade::leaf(leaf.fake_id), specs.len());
        specs.push(NodeSpec {
            name: Some(leaf.name.clone()),
            fake_id: Some(leaf.fake_id),
            ..Default::default()
        });
        heights.push(locus.height(leaf.id));
    }
    for ancestor in sequences.values().flatten() {
        if !index_of.contains_key(&ancestor.clade) {
            index_of.insert(ancestor.clade.clone(), specs.len());
            specs.push(NodeSpec {
                name: Some(ancestor.clade.to_string()),
                fake_id: Some(ancestor.species_id),
                ..Default::default()
            });
            heights.push(ancestor.height);
        }
    }

    let lookup = |clade: &Clade| {
        index_of.get(clade).copied().ok_or_else(|| {
            HidtlError::ImplementationError(format!("Clade {clade} missing from gene tree"))
        })
    };
    for (&leaf, sequence) in &sequences {
        let mut child = lookup(&Clade::leaf(leaf))?;
        for ancestor in sequence {
            let parent = lookup(&ancestor.clade)?;
            specs[child].parent = Some(parent);
            specs[child].length = Some((heights[parent] - heights[child]).max(0.));
            child = parent;
        }
    }

    let roots: Vec<usize> = (0..specs.len())
        .filter(|&index| specs[index].parent.is_none())
        .collect();
    if roots.len() != 1 {
        return Err(HidtlError::ImplementationError(format!(
            "Gene tree of {lineage} has {} roots",
            roots.len()
        )));
    }
    let root_height = heights[roots[0]];
    Ok(TreeTable::from_specs(specs, Some(root_height)))
}
