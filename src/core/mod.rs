//! This module contains the core datatypes and processes of the library.

pub mod clade;
pub mod coalescent;
pub mod dtl;
pub mod event;
pub mod graft;
pub mod haplotype_tree;
pub mod locus_tree;
pub mod model;
pub mod rates;
pub mod species_tree;
pub mod tree_table;

pub use clade::Clade;
pub use event::{Event, EventKind, EventLog, LoggedEvent};
pub use model::{HaplotypeTree, Model};
pub use species_tree::SpeciesTree;
pub use tree_table::TreeTable;
