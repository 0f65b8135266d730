//! Duplication, transfer and loss events.

use derive_more::{Deref, DerefMut, Display};
use serde::Serialize;

use super::clade::Clade;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[display("duplication")]
    Duplication,
    #[display("transfer")]
    Transfer,
    #[display("loss")]
    Loss,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Position in the list of the simulation that produced the event.
    pub index: usize,
    pub gene_node_id: usize,
    pub gene_node_name: String,
    /// Species leaves below the gene node.
    pub gene_clade: Clade,
    /// Distance from the event down to the gene node.
    pub distance_to_gene_node: f64,
    pub event_height: f64,
    pub species_node_id: usize,
    /// Distance from the event down to the species node.
    pub distance_to_species_node: f64,
    pub target_species_id: Option<usize>,
}

impl Event {
    /// Species node where a new lineage enters: the transfer target, or the
    /// mapped species node otherwise.
    pub fn entry_species_id(&self) -> usize {
        self.target_species_id.unwrap_or(self.species_node_id)
    }
}

/// An event together with the nesting level of the simulation it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedEvent {
    pub level: usize,
    pub event: Event,
}

/// Every event of a run, in the order they were grafted.
#[derive(Clone, Debug, Default, PartialEq, Deref, DerefMut)]
pub struct EventLog(Vec<LoggedEvent>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.iter().filter(|logged| logged.event.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, target: Option<usize>) -> Event {
        Event {
            kind,
            index: 0,
            gene_node_id: 1,
            gene_node_name: "B".to_string(),
            gene_clade: Clade::leaf(1),
            distance_to_gene_node: 0.25,
            event_height: 0.25,
            species_node_id: 1,
            distance_to_species_node: 0.25,
            target_species_id: target,
        }
    }

    #[test]
    fn kind_display() {
        assert_eq!(EventKind::Duplication.to_string(), "duplication");
        assert_eq!(EventKind::Transfer.to_string(), "transfer");
        assert_eq!(EventKind::Loss.to_string(), "loss");
    }

    #[test]
    fn entry_species() {
        assert_eq!(event(EventKind::Duplication, None).entry_species_id(), 1);
        assert_eq!(event(EventKind::Transfer, Some(0)).entry_species_id(), 0);
    }

    #[test]
    fn log_counts() {
        let mut log = EventLog::new();
        log.push(LoggedEvent {
            level: 0,
            event: event(EventKind::Loss, None),
        });
        log.push(LoggedEvent {
            level: 1,
            event: event(EventKind::Transfer, Some(2)),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.count(EventKind::Loss), 1);
        assert_eq!(log.count(EventKind::Duplication), 0);
    }
}
