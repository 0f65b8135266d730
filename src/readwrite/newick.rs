//! Newick reading and writing.
//!
//! Parsing is left to the `newick` crate; the parsed tree is then indexed
//! into a [`TreeTable`]. Writing goes the other way and serializes any
//! [`TreeTable`], optionally relabelling nodes.

use newick::{Newick, NewickTree};

use crate::core::tree_table::{Entry, NodeSpec, TreeTable};
use crate::errors::{HidtlError, Result};

const RESERVED: &[u8] = b"()[]':;,";

/// Parses a single Newick tree terminated by `;`.
pub fn parse(text: &str) -> Result<TreeTable> {
    let tree = newick::one_from_string(text)
        .map_err(|err| HidtlError::InputError(format!("Invalid Newick tree: {err}")))?;
    index(&tree)
}

pub fn read_from_file(path: &str) -> Result<TreeTable> {
    let tree = newick::one_from_filename(path).map_err(|err| {
        HidtlError::InputError(format!("Unable to read Newick tree from {path}: {err}"))
    })?;
    index(&tree)
}

/// Index a parsed tree, keeping the order of children.
fn index(tree: &NewickTree) -> Result<TreeTable> {
    let mut specs: Vec<NodeSpec> = Vec::new();
    let mut stack: Vec<(usize, Option<usize>)> = vec![(tree.root(), None)];
    while let Some((node, parent)) = stack.pop() {
        let name = tree.name(node).map(ToOwned::to_owned);
        if tree[node].is_leaf() && name.as_deref().is_none_or(str::is_empty) {
            return Err(HidtlError::InputError(
                "Newick leaf without a name".to_string(),
            ));
        }
        let length = match tree[node].branch() {
            Some(length) => Some(branch_length(&length.to_string())?),
            None => None,
        };

        let index = specs.len();
        specs.push(NodeSpec {
            name,
            fake_id: None,
            parent,
            length,
        });
        for &child in tree[node].children().iter().rev() {
            stack.push((child, Some(index)));
        }
    }
    Ok(TreeTable::from_specs(specs, None))
}

/// Branch lengths are parsed as `f32`; reading their shortest decimal form
/// as `f64` recovers the value written in the file.
fn branch_length(token: &str) -> Result<f64> {
    let length = token
        .parse::<f64>()
        .map_err(|_| HidtlError::InputError(format!("Invalid branch length `{token}`")))?;
    if !length.is_finite() || length < 0. {
        return Err(HidtlError::InputError(format!(
            "Branch length `{token}` must be finite and >= 0"
        )));
    }
    Ok(length)
}

/// Serializes a tree using the entry names as labels.
pub fn write(tree: &TreeTable) -> String {
    write_with(tree, |entry| Some(entry.name.clone()))
}

/// Serializes a tree, taking labels from `labeller`. Nodes for which the
/// labeller returns `None` are written without a label.
pub fn write_with<F>(tree: &TreeTable, labeller: F) -> String
where
    F: Fn(&Entry) -> Option<String>,
{
    let mut output = String::new();
    write_node(tree, tree.root().id, &labeller, &mut output);
    output.push(';');
    output
}

fn write_node<F>(tree: &TreeTable, id: usize, labeller: &F, output: &mut String)
where
    F: Fn(&Entry) -> Option<String>,
{
    let entry = tree.entry(id);
    if !entry.children.is_empty() {
        output.push('(');
        for (position, &child) in entry.children.iter().enumerate() {
            if position > 0 {
                output.push(',');
            }
            write_node(tree, child, labeller, output);
        }
        output.push(')');
    }
    if let Some(label) = labeller(entry) {
        output.push_str(&quote_label(&label));
    }
    if let Some(length) = entry.distance_to_parent {
        output.push_str(&format!(":{length}"));
    }
}

fn quote_label(label: &str) -> String {
    let needs_quotes = label
        .bytes()
        .any(|byte| RESERVED.contains(&byte) || byte.is_ascii_whitespace());
    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
