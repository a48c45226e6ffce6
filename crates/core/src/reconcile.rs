//! Converges a rendering surface onto a marker snapshot
//!
//! The rendering surface is a paginated container of rendered objects, each
//! tagged with the [`RenderId`] of the marker it was built from. A sync
//! removes objects no longer backed by the snapshot, then materializes
//! markers that have no object yet. Nothing else writes to the surface.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::marker::{Marker, MarkerId, PageIndex, RenderId};
use crate::store::Snapshot;

/// Render ids present on the surface, grouped by page
pub type RenderedIndex = BTreeMap<PageIndex, BTreeSet<RenderId>>;

/// An object drawn on a page of the rendering surface
pub trait RenderedObject {
    fn render_id(&self) -> RenderId;

    /// Page the object believes it is attached to
    fn page(&self) -> Option<PageIndex>;

    fn set_page(&mut self, page: Option<PageIndex>);
}

/// The external paginated view markers are drawn onto
pub trait RenderSurface {
    type Object: RenderedObject;

    fn page_count(&self) -> usize;

    /// Render ids of every object currently on `page`
    fn rendered_ids(&self, page: PageIndex) -> Vec<RenderId>;

    /// Detach the object with `render_id` from `page`
    ///
    /// Some surfaces clear the object's page back-reference as a side effect.
    fn remove_object(&mut self, page: PageIndex, render_id: RenderId) -> Option<Self::Object>;

    /// Build a new object for `marker`, picking the object type from its kind
    fn materialize(&self, marker: &Marker) -> Self::Object;

    fn add_object(&mut self, page: PageIndex, object: Self::Object);

    /// Hand back an object removed during a sync
    fn release(&mut self, _object: Self::Object) {}
}

/// Non-fatal condition met during a sync
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileIssue {
    #[error("marker {marker} targets page {page} but the document has {page_count} pages")]
    PageOutOfRange {
        marker: MarkerId,
        page: PageIndex,
        page_count: usize,
    },
}

/// What a single sync did to the surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub removed: Vec<RenderId>,
    pub added: Vec<RenderId>,
    pub issues: Vec<ReconcileIssue>,
}

impl SyncReport {
    /// True when the surface already matched the snapshot
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.removed.extend(other.removed);
        self.added.extend(other.added);
        self.issues.extend(other.issues);
    }
}

/// Read which render ids `surface` currently shows
pub fn capture<S: RenderSurface + ?Sized>(surface: &S) -> RenderedIndex {
    let mut index = RenderedIndex::new();
    for page in 0..surface.page_count() {
        let Ok(page) = PageIndex::try_from(page) else {
            break;
        };
        let ids: BTreeSet<RenderId> = surface.rendered_ids(page).into_iter().collect();
        if !ids.is_empty() {
            index.insert(page, ids);
        }
    }
    index
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    restore_page_backref: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            restore_page_backref: true,
        }
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether removed objects get their page back-reference restored
    ///
    /// Only needed for surfaces that clear it on removal.
    pub fn with_restore_page_backref(mut self, restore: bool) -> Self {
        self.restore_page_backref = restore;
        self
    }

    /// Capture the surface's current state, then sync against it
    pub fn converge<S: RenderSurface + ?Sized>(&self, surface: &mut S, snapshot: &Snapshot) -> SyncReport {
        let previous = capture(surface);
        self.sync(surface, &previous, snapshot)
    }

    /// Bring `surface` in line with `snapshot`
    ///
    /// `previous` must describe what the surface shows right now. All
    /// removals happen before any addition. Markers on pages the document
    /// doesn't have are skipped and reported.
    pub fn sync<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        previous: &RenderedIndex,
        snapshot: &Snapshot,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let wanted = snapshot.render_ids_by_page();

        for (&page, rendered) in previous {
            let keep = wanted.get(&page);
            for &render_id in rendered {
                if keep.is_some_and(|ids| ids.contains(&render_id)) {
                    continue;
                }
                let Some(mut object) = surface.remove_object(page, render_id) else {
                    continue;
                };
                if self.restore_page_backref && object.page().is_none() {
                    object.set_page(Some(page));
                }
                surface.release(object);
                report.removed.push(render_id);
            }
        }

        let page_count = surface.page_count();
        for marker in snapshot {
            let page = marker.page_index();
            if usize::from(page) >= page_count {
                let issue = ReconcileIssue::PageOutOfRange {
                    marker: marker.id(),
                    page,
                    page_count,
                };
                warn!("skipping marker: {issue}");
                report.issues.push(issue);
                continue;
            }
            let shown = previous
                .get(&page)
                .is_some_and(|ids| ids.contains(&marker.render_id()));
            if shown {
                continue;
            }
            let object = surface.materialize(marker);
            surface.add_object(page, object);
            report.added.push(marker.render_id());
        }

        debug!(
            removed = report.removed.len(),
            added = report.added.len(),
            skipped = report.issues.len(),
            "sync"
        );
        report
    }
}
