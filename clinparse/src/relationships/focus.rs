//! Matching of caller focus targets against the selected concepts and attribute edges.

use crate::models::{
    AttributeEntry, AttributeFocusResult, ConceptArena, ConceptEntry, ConceptFocusResult,
    ConceptId, ConceptLabel, FocusRequest, FocusResults, Polarity, RelationshipAttribute,
};

/// Evaluate every focus target of `request`.
///
/// Concept targets look at `selected` concepts of `primary_system` that are included and
/// not overlapped. Attribute targets look at the unique attribute edges.
pub fn parse_focus(
    request: &FocusRequest,
    arena: &ConceptArena,
    selected: &[ConceptId],
    attributes: &[RelationshipAttribute],
    primary_system: &str,
) -> FocusResults {
    let mut results = FocusResults::default();

    for focus in &request.concepts {
        let mut result = ConceptFocusResult::default();

        for &id in selected {
            let concept = &arena[id];
            if concept.system != primary_system || !concept.included || concept.overlap {
                continue;
            }

            let hit = (focus.match_self && concept.code == focus.concept_id)
                || (focus.match_children && concept.has_ancestor(&focus.concept_id));
            if !hit {
                continue;
            }

            let entry = ConceptEntry::from(concept);
            if result.results.contains(&entry) {
                continue;
            }
            result.results.push(entry);
            result.found = true;

            match concept.polarity {
                Polarity::Negative => result.polarity = Some(false),
                Polarity::Positive if result.polarity.is_none() => result.polarity = Some(true),
                _ => {}
            }
        }

        results.concepts.insert(focus.id.clone(), result);
    }

    for focus in &request.attributes {
        let mut result = AttributeFocusResult::default();

        for edge in attributes {
            let (origin, destination) = (&arena[edge.origin], &arena[edge.destination]);
            if origin.code == destination.code || origin.code != focus.origin_id {
                continue;
            }

            let hit = destination.code == focus.destination_id
                || (focus.match_children && destination.has_ancestor(&focus.destination_id));
            if !hit {
                continue;
            }

            let entry = AttributeEntry {
                origin: ConceptLabel::from(origin),
                attribute: ConceptLabel::from(&arena[edge.attribute]),
                destination: ConceptLabel::from(destination),
            };
            if !result.results.contains(&entry) {
                result.results.push(entry);
                result.found = true;
            }
        }

        results.attributes.insert(focus.id.clone(), result);
    }

    tracing::debug!(
        concept_targets = results.concepts.len(),
        attribute_targets = results.attributes.len(),
        "Evaluated focus targets"
    );

    results
}
