//! Authoritative set of live markers
//!
//! The store validates every edit up front, then routes it through its
//! [`CommandLog`] so it can be undone. Snapshots share the underlying map
//! copy-on-write: taking one is a reference-count bump, and the next mutation
//! copies the map only while a snapshot is still held.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::command_log::{CommandLog, Replay};
use crate::marker::{Marker, MarkerId, PageIndex, RenderId};
use crate::numbering::{parse_photo_number, PhotoNumber};
use crate::operation::Operation;

/// Rejected store edit; the store is left untouched
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerStoreError {
    #[error("marker {0} is already live")]
    DuplicateId(MarkerId),
    #[error("marker {0} is not live")]
    MissingId(MarkerId),
    #[error("marker {0} does not match its live value")]
    StaleMarker(MarkerId),
    #[error("photo marker {id} has invalid number {content:?}")]
    InvalidPhotoNumber { id: MarkerId, content: String },
    #[error("photo marker number {number} is already used by marker {holder}")]
    DuplicatePhotoNumber { number: PhotoNumber, holder: MarkerId },
}

/// Point-in-time view of the live markers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    markers: Arc<BTreeMap<MarkerId, Marker>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn contains(&self, id: MarkerId) -> bool {
        self.markers.contains_key(&id)
    }

    pub fn ids(&self) -> BTreeSet<MarkerId> {
        self.markers.keys().copied().collect()
    }

    /// All live markers, in id order
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Live markers attached to `page`
    pub fn on_page(&self, page: PageIndex) -> impl Iterator<Item = &Marker> {
        self.markers.values().filter(move |m| m.page_index() == page)
    }

    /// Label numbers of every photo marker in the document
    pub fn photo_numbers(&self) -> BTreeSet<PhotoNumber> {
        self.markers.values().filter_map(Marker::photo_number).collect()
    }

    /// Render ids the rendering surface should show, grouped by page
    pub fn render_ids_by_page(&self) -> BTreeMap<PageIndex, BTreeSet<RenderId>> {
        let mut by_page: BTreeMap<PageIndex, BTreeSet<RenderId>> = BTreeMap::new();
        for marker in self.markers.values() {
            by_page.entry(marker.page_index()).or_default().insert(marker.render_id());
        }
        by_page
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Marker;
    type IntoIter = std::collections::btree_map::Values<'a, MarkerId, Marker>;

    fn into_iter(self) -> Self::IntoIter {
        self.markers.values()
    }
}

/// The map the command log replays into, plus an index of photo numbers
#[derive(Debug, Default)]
struct LiveMarkers {
    markers: Arc<BTreeMap<MarkerId, Marker>>,
    photo_numbers: HashMap<PhotoNumber, MarkerId>,
}

impl LiveMarkers {
    fn insert(&mut self, marker: Marker) {
        if let Some(number) = marker.photo_number() {
            self.photo_numbers.insert(number, marker.id());
        }
        let previous = Arc::make_mut(&mut self.markers).insert(marker.id(), marker);
        debug_assert!(previous.is_none(), "replayed insert of a live marker");
    }

    fn remove(&mut self, id: MarkerId) {
        let removed = Arc::make_mut(&mut self.markers).remove(&id);
        debug_assert!(removed.is_some(), "replayed removal of absent marker {id}");
        if let Some(number) = removed.as_ref().and_then(Marker::photo_number) {
            if self.photo_numbers.get(&number) == Some(&id) {
                self.photo_numbers.remove(&number);
            }
        }
    }
}

impl Replay for LiveMarkers {
    fn replay(&mut self, operation: &Operation) {
        if let Some(id) = operation.removed_id() {
            self.remove(id);
        }
        if let Some(marker) = operation.inserted() {
            self.insert(marker.clone());
        }
    }
}

/// Live markers plus their undo history
#[derive(Debug, Default)]
pub struct MarkerStore {
    live: LiveMarkers,
    log: CommandLog,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store keeping at most `max_levels` undo groups
    pub fn with_max_undo_levels(max_levels: Option<usize>) -> Self {
        Self {
            live: LiveMarkers::default(),
            log: CommandLog::with_max_levels(max_levels),
        }
    }

    /// Add a new marker
    pub fn add(&mut self, marker: Marker) -> Result<(), MarkerStoreError> {
        if self.live.markers.contains_key(&marker.id()) {
            return Err(MarkerStoreError::DuplicateId(marker.id()));
        }
        self.check_photo_number(&marker, None)?;

        self.log.apply(&mut self.live, Operation::Add(marker));
        Ok(())
    }

    /// Replace the live value `before` with `after`
    ///
    /// `after` may carry the same id (attribute edit) or a new one
    /// (identity-replacing edit).
    pub fn update(&mut self, before: Marker, after: Marker) -> Result<(), MarkerStoreError> {
        self.check_live(&before)?;
        if after.id() != before.id() && self.live.markers.contains_key(&after.id()) {
            return Err(MarkerStoreError::DuplicateId(after.id()));
        }
        self.check_photo_number(&after, Some(before.id()))?;

        self.log.apply(&mut self.live, Operation::Update { before, after });
        Ok(())
    }

    /// Remove the live marker
    pub fn delete(&mut self, marker: Marker) -> Result<(), MarkerStoreError> {
        self.check_live(&marker)?;

        self.log.apply(&mut self.live, Operation::Delete(marker));
        Ok(())
    }

    /// Remove the live marker with `id`
    pub fn delete_by_id(&mut self, id: MarkerId) -> Result<(), MarkerStoreError> {
        let marker = self.get(id).cloned().ok_or(MarkerStoreError::MissingId(id))?;
        self.delete(marker)
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.live.markers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.live.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.markers.is_empty()
    }

    /// Current live set; cheap, shares storage with the store
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            markers: Arc::clone(&self.live.markers),
        }
    }

    /// Undo the last edit, returning the resulting snapshot
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.log.undo(&mut self.live).then(|| self.snapshot())
    }

    /// Redo the last undone edit, returning the resulting snapshot
    pub fn redo(&mut self) -> Option<Snapshot> {
        self.log.redo(&mut self.live).then(|| self.snapshot())
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Drop all undo history, keeping the live markers
    pub fn clear_history(&mut self) {
        self.log.clear();
    }

    fn check_live(&self, marker: &Marker) -> Result<(), MarkerStoreError> {
        match self.live.markers.get(&marker.id()) {
            None => Err(MarkerStoreError::MissingId(marker.id())),
            Some(live) if live != marker => Err(MarkerStoreError::StaleMarker(marker.id())),
            Some(_) => Ok(()),
        }
    }

    /// Photo marker content must be a valid number unused by any other live
    /// photo marker. `replacing` is the marker being edited away, if any.
    fn check_photo_number(
        &self,
        marker: &Marker,
        replacing: Option<MarkerId>,
    ) -> Result<(), MarkerStoreError> {
        if !marker.is_photo_marker() {
            return Ok(());
        }
        let Some(content) = marker.content() else {
            return Ok(());
        };
        let number = parse_photo_number(content).ok_or_else(|| MarkerStoreError::InvalidPhotoNumber {
            id: marker.id(),
            content: content.to_string(),
        })?;

        match self.live.photo_numbers.get(&number) {
            Some(&holder) if holder != marker.id() && Some(holder) != replacing => {
                Err(MarkerStoreError::DuplicatePhotoNumber { number, holder })
            }
            _ => Ok(()),
        }
    }
}
