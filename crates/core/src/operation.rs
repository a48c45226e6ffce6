//! Reversible marker operations

use crate::marker::{Marker, MarkerId};

/// A single mutation of the live marker set
///
/// Operations are the only way the marker set changes. Each one has a
/// syntactic inverse, which is what undo replays.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Add(Marker),
    /// Replace `before` with `after`; the ids may differ for
    /// identity-replacing edits
    Update { before: Marker, after: Marker },
    Delete(Marker),
}

impl Operation {
    /// The operation that undoes this one
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::Add(marker) => Operation::Delete(marker.clone()),
            Operation::Delete(marker) => Operation::Add(marker.clone()),
            Operation::Update { before, after } => Operation::Update {
                before: after.clone(),
                after: before.clone(),
            },
        }
    }

    /// Id of the live marker this operation replaces or removes
    pub fn removed_id(&self) -> Option<MarkerId> {
        match self {
            Operation::Add(_) => None,
            Operation::Update { before, .. } => Some(before.id()),
            Operation::Delete(marker) => Some(marker.id()),
        }
    }

    /// Marker this operation leaves live, if any
    pub fn inserted(&self) -> Option<&Marker> {
        match self {
            Operation::Add(marker) => Some(marker),
            Operation::Update { after, .. } => Some(after),
            Operation::Delete(_) => None,
        }
    }

    /// Short action name for menu titles ("Add Arrow", "Move Photo Marker")
    pub fn label(&self) -> String {
        match self {
            Operation::Add(marker) => format!("Add {}", marker.kind().display_name()),
            Operation::Delete(marker) => format!("Delete {}", marker.kind().display_name()),
            Operation::Update { before, after } => {
                let verb = if before.id() != after.id() {
                    "Replace"
                } else if before.page_index() != after.page_index() || before.bounds() != after.bounds() {
                    "Move"
                } else {
                    "Edit"
                };
                format!("{verb} {}", after.kind().display_name())
            }
        }
    }
}
