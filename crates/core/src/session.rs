//! Edit session: store, history and surface sync in one place
//!
//! Every edit goes through the marker store and is followed by a sync of the
//! caller's rendering surface, so the surface never drifts from the store.
//! Everything runs on the caller's thread; background producers must hand
//! their results over before calling in.

use tracing::info;

use crate::config::EngineConfig;
use crate::marker::{Marker, MarkerId, MarkerStyle, PageIndex, PageRect};
use crate::numbering::{allocate, AllocatorExhausted, PhotoNumber};
use crate::reconcile::{RenderSurface, Reconciler, SyncReport};
use crate::store::{MarkerStore, MarkerStoreError, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] MarkerStoreError),
    #[error(transparent)]
    Allocator(#[from] AllocatorExhausted),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Default)]
pub struct EditSession {
    store: MarkerStore,
    reconciler: Reconciler,
}

impl EditSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            store: MarkerStore::with_max_undo_levels(config.max_undo_levels),
            reconciler: Reconciler::new().with_restore_page_backref(config.restore_page_backref),
        }
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Number the next photo marker would get, scanning every page
    pub fn next_photo_number(&self) -> Result<PhotoNumber, AllocatorExhausted> {
        allocate(self.store.snapshot().photo_numbers())
    }

    /// Place a new numbered photo marker
    ///
    /// Refused with [`SessionError::Allocator`] when every number is in use.
    pub fn add_photo_marker<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        page: PageIndex,
        bounds: PageRect,
        style: MarkerStyle,
    ) -> SessionResult<(Marker, SyncReport)> {
        let number = self.next_photo_number()?;
        let marker = Marker::photo(page, bounds, style, number);
        info!(number, page, "adding photo marker");

        let report = self.add_marker(surface, marker.clone())?;
        Ok((marker, report))
    }

    pub fn add_marker<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        marker: Marker,
    ) -> SessionResult<SyncReport> {
        self.store.add(marker)?;
        Ok(self.sync(surface))
    }

    pub fn update_marker<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        before: Marker,
        after: Marker,
    ) -> SessionResult<SyncReport> {
        self.store.update(before, after)?;
        Ok(self.sync(surface))
    }

    pub fn delete_marker<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        id: MarkerId,
    ) -> SessionResult<SyncReport> {
        self.store.delete_by_id(id)?;
        Ok(self.sync(surface))
    }

    /// Undo the last edit and sync; `None` when there was nothing to undo
    pub fn undo<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> Option<SyncReport> {
        let snapshot = self.store.undo()?;
        Some(self.reconciler.converge(surface, &snapshot))
    }

    /// Redo the last undone edit and sync
    pub fn redo<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> Option<SyncReport> {
        let snapshot = self.store.redo()?;
        Some(self.reconciler.converge(surface, &snapshot))
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.store.log().undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.store.log().redo_label()
    }

    /// Re-sync against the current snapshot, e.g. after the surface reloaded
    pub fn sync<S: RenderSurface + ?Sized>(&self, surface: &mut S) -> SyncReport {
        self.reconciler.converge(surface, &self.store.snapshot())
    }

    /// Forget undo history, e.g. after the document was reloaded from disk
    pub fn clear_history(&mut self) {
        self.store.clear_history();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerKind;
    use crate::numbering::MAX_PHOTO_NUMBER;
    use crate::surface::PageSurface;

    fn bounds() -> PageRect {
        PageRect::new(20.0, 20.0, 24.0, 24.0)
    }

    #[test]
    fn test_photo_numbers_are_unique_across_pages() {
        let mut session = EditSession::default();
        let mut surface = PageSurface::new(3);

        let (first, _) = session.add_photo_marker(&mut surface, 0, bounds(), MarkerStyle::default()).unwrap();
        let (second, _) = session.add_photo_marker(&mut surface, 2, bounds(), MarkerStyle::default()).unwrap();
        let (third, _) = session.add_photo_marker(&mut surface, 1, bounds(), MarkerStyle::default()).unwrap();

        assert_eq!(first.photo_number(), Some(1));
        assert_eq!(second.photo_number(), Some(2));
        assert_eq!(third.photo_number(), Some(3));
        assert_eq!(surface.object_count(), 3);

        // Freed numbers are reused, smallest first
        session.delete_marker(&mut surface, second.id()).unwrap();
        assert_eq!(session.next_photo_number(), Ok(2));
        assert_eq!(surface.object_count(), 2);
    }

    #[test]
    fn test_allocator_exhaustion_refuses_edit() {
        let mut session = EditSession::default();
        let mut surface = PageSurface::new(1);
        for number in 1..=MAX_PHOTO_NUMBER {
            let marker = Marker::photo(0, bounds(), MarkerStyle::default(), number);
            session.store.add(marker).unwrap();
        }
        let before = session.snapshot();

        let result = session.add_photo_marker(&mut surface, 0, bounds(), MarkerStyle::default());
        assert_eq!(result.unwrap_err(), SessionError::Allocator(AllocatorExhausted));
        assert_eq!(session.snapshot(), before);
        assert_eq!(surface.object_count(), 0);
    }

    #[test]
    fn test_scenario_add_add_delete_undo_redo() {
        let mut session = EditSession::default();
        let mut surface = PageSurface::new(1);
        let a = Marker::with_id(MarkerId::from_u128(1), MarkerKind::PhotoMarker, 0, bounds(), MarkerStyle::default())
            .with_content(Some("1".to_string()));
        let b = Marker::with_id(MarkerId::from_u128(2), MarkerKind::PhotoMarker, 0, bounds(), MarkerStyle::default())
            .with_content(Some("2".to_string()));

        session.add_marker(&mut surface, a.clone()).unwrap();
        session.add_marker(&mut surface, b.clone()).unwrap();
        session.delete_marker(&mut surface, a.id()).unwrap();
        assert_eq!(surface.rendered_ids(0), vec![b.render_id()]);
        assert_eq!(session.undo_label(), Some("Delete Photo Marker"));

        let ids = |s: &EditSession| s.snapshot().ids().into_iter().collect::<Vec<_>>();

        session.undo(&mut surface).unwrap();
        assert_eq!(ids(&session), vec![a.id(), b.id()]);
        session.undo(&mut surface).unwrap();
        assert_eq!(ids(&session), vec![a.id()]);
        session.undo(&mut surface).unwrap();
        assert!(ids(&session).is_empty());
        assert_eq!(surface.object_count(), 0);
        assert!(session.undo(&mut surface).is_none());

        session.redo(&mut surface).unwrap();
        assert_eq!(ids(&session), vec![a.id()]);
        session.redo(&mut surface).unwrap();
        assert_eq!(ids(&session), vec![a.id(), b.id()]);
        session.redo(&mut surface).unwrap();
        assert_eq!(ids(&session), vec![b.id()]);
        assert_eq!(surface.rendered_ids(0), vec![b.render_id()]);
        assert!(!session.can_redo());

        assert_eq!(session.next_photo_number(), Ok(1));
    }

    #[test]
    fn test_failed_edit_leaves_surface_alone() {
        let mut session = EditSession::default();
        let mut surface = PageSurface::new(1);
        let circle = Marker::new(MarkerKind::Circle, 0, bounds(), MarkerStyle::default());
        session.add_marker(&mut surface, circle.clone()).unwrap();
        surface.reset_counters();

        let err = session.add_marker(&mut surface, circle.clone()).unwrap_err();
        assert_eq!(err, SessionError::Store(MarkerStoreError::DuplicateId(circle.id())));
        assert_eq!(surface.add_calls(), 0);
        assert_eq!(surface.remove_calls(), 0);
    }

    #[test]
    fn test_reload_with_fewer_pages() {
        let mut session = EditSession::default();
        let mut surface = PageSurface::new(3);
        session.add_photo_marker(&mut surface, 0, bounds(), MarkerStyle::default()).unwrap();
        let (late, _) = session.add_photo_marker(&mut surface, 2, bounds(), MarkerStyle::default()).unwrap();

        surface.set_page_count(1);
        let report = session.sync(&mut surface);
        assert!(report.is_noop());
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].to_string().contains(&late.id().to_string()));
    }

    #[test]
    fn test_config_limits_history() {
        let config = EngineConfig::default().with_max_undo_levels(Some(1));
        let mut session = EditSession::new(&config);
        let mut surface = PageSurface::new(1);
        session.add_photo_marker(&mut surface, 0, bounds(), MarkerStyle::default()).unwrap();
        session.add_photo_marker(&mut surface, 0, bounds(), MarkerStyle::default()).unwrap();

        assert!(session.undo(&mut surface).is_some());
        assert!(session.undo(&mut surface).is_none());
        assert_eq!(session.snapshot().len(), 1);
    }
}
