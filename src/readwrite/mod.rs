//! Reading species trees and writing gene trees and event tables.

mod events;
pub mod newick;

pub use events::{EventEntry, write_events};
