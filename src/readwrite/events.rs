use std::io::{Error, Write};

use serde::Serialize;

use crate::core::event::{EventKind, LoggedEvent};
use crate::core::species_tree::SpeciesTree;

/// One row of the event table.
#[derive(Serialize)]
pub struct EventEntry<'a> {
    pub level: usize,
    pub index: usize,
    pub kind: EventKind,
    pub gene_node_id: usize,
    pub gene_node_name: &'a str,
    pub distance_to_gene_node: f64,
    pub event_height: f64,
    pub species_node_id: usize,
    pub species_node_name: &'a str,
    pub distance_to_species_node: f64,
    pub target_species_id: Option<usize>,
    pub target_species_name: Option<&'a str>,
}

impl<'a> EventEntry<'a> {
    pub fn new(logged: &'a LoggedEvent, species: &'a SpeciesTree) -> Self {
        let event = &logged.event;
        Self {
            level: logged.level,
            index: event.index,
            kind: event.kind,
            gene_node_id: event.gene_node_id,
            gene_node_name: &event.gene_node_name,
            distance_to_gene_node: event.distance_to_gene_node,
            event_height: event.event_height,
            species_node_id: event.species_node_id,
            species_node_name: species.name(event.species_node_id),
            distance_to_species_node: event.distance_to_species_node,
            target_species_id: event.target_species_id,
            target_species_name: event.target_species_id.map(|id| species.name(id)),
        }
    }

    pub fn write(&self, writer: &mut impl Write) -> Result<(), Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.serialize(self)?;
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_header(writer: &mut impl Write) -> Result<(), Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record([
            "level",
            "index",
            "kind",
            "gene_node_id",
            "gene_node_name",
            "distance_to_gene_node",
            "event_height",
            "species_node_id",
            "species_node_name",
            "distance_to_species_node",
            "target_species_id",
            "target_species_name",
        ])?;
        csv_writer.flush()?;
        Ok(())
    }
}

/// Write the header and one row per event.
pub fn write_events<'a>(
    writer: &mut impl Write,
    events: impl IntoIterator<Item = &'a LoggedEvent>,
    species: &SpeciesTree,
) -> Result<(), Error> {
    EventEntry::write_header(writer)?;
    for logged in events {
        EventEntry::new(logged, species).write(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clade::Clade;
    use crate::core::event::Event;
    use crate::core::tree_table::tests::table;

    fn logged(kind: EventKind, target: Option<usize>) -> LoggedEvent {
        LoggedEvent {
            level: 1,
            event: Event {
                kind,
                index: 2,
                gene_node_id: 0,
                gene_node_name: "A".to_string(),
                gene_clade: Clade::leaf(0),
                distance_to_gene_node: 0.5,
                event_height: 0.5,
                species_node_id: 0,
                distance_to_species_node: 0.5,
                target_species_id: target,
            },
        }
    }

    #[test]
    fn test_write() {
        let species = SpeciesTree::new(table("(A:1,(B:1,C:1):1):0;"));
        let mut buffer = Vec::new();
        let events = [
            logged(EventKind::Transfer, Some(3)),
            logged(EventKind::Loss, None),
        ];
        write_events(&mut buffer, &events, &species).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "level,index,kind,gene_node_id,gene_node_name,distance_to_gene_node,event_height,\
             species_node_id,species_node_name,distance_to_species_node,target_species_id,\
             target_species_name\n\
             1,2,transfer,0,A,0.5,0.5,0,A,0.5,3,BC\n\
             1,2,loss,0,A,0.5,0.5,0,A,0.5,,\n"
        );
    }
}
