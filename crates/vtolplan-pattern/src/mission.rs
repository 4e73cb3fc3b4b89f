use tracing::debug;
use vtolplan_proto::MissionItem;

use crate::context::PlanContext;
use crate::pattern::{scan_for_pattern, Pattern};

/// One entry of a plan: a plain mission item or a recognized pattern.
#[derive(Debug, Clone)]
pub enum PlanEntry {
    Simple(MissionItem),
    Complex(Pattern),
}

/// Walks a flat mission and folds recognized patterns into complex
/// entries. Anything unrecognized stays a simple item.
pub fn scan_mission(items: &[MissionItem], ctx: PlanContext) -> Vec<PlanEntry> {
    let mut entries = Vec::new();
    let mut i = 0;
    while i < items.len() {
        match scan_for_pattern(&items[i..], ctx) {
            Some((pattern, consumed)) => {
                debug!("scan: {:?} consumed {} items at index {}", pattern.kind(), consumed, i);
                entries.push(PlanEntry::Complex(pattern));
                i += consumed.max(1);
            }
            None => {
                entries.push(PlanEntry::Simple(items[i].clone()));
                i += 1;
            }
        }
    }
    entries
}

/// Flattens entries into mission items numbered consecutively from
/// `first_seq`. Patterns are renumbered in place.
pub fn build_mission(entries: &mut [PlanEntry], first_seq: u16) -> Vec<MissionItem> {
    let mut items = Vec::new();
    let mut seq = first_seq;
    for entry in entries.iter_mut() {
        match entry {
            PlanEntry::Simple(item) => {
                let mut item = item.clone();
                item.seq = seq;
                items.push(item);
                seq = seq.saturating_add(1);
            }
            PlanEntry::Complex(pattern) => {
                pattern.set_sequence_number(seq);
                pattern.append_mission_items(&mut items);
                seq = pattern.last_sequence_number().saturating_add(1);
            }
        }
    }
    items
}
