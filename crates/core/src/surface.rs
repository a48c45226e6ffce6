//! In-memory rendering surface
//!
//! Keeps rendered markers in per-page lists. Used by the CLI and tests, and as
//! the reference behaviour for real surfaces. It can emulate surfaces that
//! clear an object's page back-reference when it is removed from a page.

use crate::marker::{Marker, MarkerStyle, PageIndex, PageRect, RenderId, RenderKind};
use crate::reconcile::{RenderSurface, RenderedObject};

/// A marker as drawn on a page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarker {
    pub render_id: RenderId,
    pub render_kind: RenderKind,
    pub page: Option<PageIndex>,
    pub bounds: PageRect,
    pub style: MarkerStyle,
    pub text: Option<String>,
}

impl RenderedObject for RenderedMarker {
    fn render_id(&self) -> RenderId {
        self.render_id
    }

    fn page(&self) -> Option<PageIndex> {
        self.page
    }

    fn set_page(&mut self, page: Option<PageIndex>) {
        self.page = page;
    }
}

#[derive(Debug, Default)]
pub struct PageSurface {
    pages: Vec<Vec<RenderedMarker>>,
    clears_page_on_remove: bool,
    released: Vec<RenderedMarker>,
    calls: Vec<String>,
    add_calls: usize,
    remove_calls: usize,
}

impl PageSurface {
    pub fn new(page_count: usize) -> Self {
        Self {
            pages: vec![Vec::new(); page_count],
            ..Self::default()
        }
    }

    /// Emulate surfaces that reset an object's page when it is removed
    pub fn with_backref_defect(mut self, enabled: bool) -> Self {
        self.clears_page_on_remove = enabled;
        self
    }

    /// Change the page count, as after reloading a document. Objects on
    /// pages that no longer exist are dropped.
    pub fn set_page_count(&mut self, page_count: usize) {
        self.pages.resize_with(page_count, Vec::new);
    }

    pub fn objects(&self, page: PageIndex) -> &[RenderedMarker] {
        self.pages.get(usize::from(page)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn object_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls
    }

    /// Surface calls since the last reset, as "add <page> <id>" /
    /// "remove <page> <id>"
    pub fn call_log(&self) -> &[String] {
        &self.calls
    }

    pub fn reset_counters(&mut self) {
        self.add_calls = 0;
        self.remove_calls = 0;
        self.calls.clear();
    }

    /// Objects handed back by the reconciler since the last call
    pub fn take_released(&mut self) -> Vec<RenderedMarker> {
        std::mem::take(&mut self.released)
    }
}

impl RenderSurface for PageSurface {
    type Object = RenderedMarker;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rendered_ids(&self, page: PageIndex) -> Vec<RenderId> {
        self.objects(page).iter().map(|o| o.render_id).collect()
    }

    fn remove_object(&mut self, page: PageIndex, render_id: RenderId) -> Option<RenderedMarker> {
        let objects = self.pages.get_mut(usize::from(page))?;
        let position = objects.iter().position(|o| o.render_id == render_id)?;
        let mut object = objects.remove(position);

        if self.clears_page_on_remove {
            object.page = None;
        }
        self.remove_calls += 1;
        self.calls.push(format!("remove {page} {render_id}"));
        Some(object)
    }

    fn materialize(&self, marker: &Marker) -> RenderedMarker {
        RenderedMarker {
            render_id: marker.render_id(),
            render_kind: marker.kind().render_kind(),
            page: Some(marker.page_index()),
            bounds: marker.bounds(),
            style: marker.style().clone(),
            text: marker.content().map(str::to_owned),
        }
    }

    fn add_object(&mut self, page: PageIndex, mut object: RenderedMarker) {
        let Some(objects) = self.pages.get_mut(usize::from(page)) else {
            return;
        };
        object.page = Some(page);
        self.calls.push(format!("add {page} {}", object.render_id));
        objects.push(object);
        self.add_calls += 1;
    }

    fn release(&mut self, object: RenderedMarker) {
        self.released.push(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerKind;

    #[test]
    fn test_add_and_remove() {
        let mut surface = PageSurface::new(2);
        let marker = Marker::new(
            MarkerKind::PhotoMarker,
            1,
            PageRect::new(0.0, 0.0, 12.0, 12.0),
            MarkerStyle::default(),
        )
        .with_content(Some("3".to_string()));

        let object = surface.materialize(&marker);
        assert_eq!(object.text.as_deref(), Some("3"));
        surface.add_object(1, object);
        assert_eq!(surface.rendered_ids(1), vec![marker.render_id()]);

        let removed = surface.remove_object(1, marker.render_id()).unwrap();
        assert_eq!(removed.page, Some(1));
        assert_eq!(surface.object_count(), 0);
        assert!(surface.remove_object(1, marker.render_id()).is_none());
    }

    #[test]
    fn test_backref_defect_clears_page() {
        let mut surface = PageSurface::new(1).with_backref_defect(true);
        let marker = Marker::new(MarkerKind::Line, 0, PageRect::new(0.0, 0.0, 1.0, 1.0), MarkerStyle::default());
        let object = surface.materialize(&marker);
        surface.add_object(0, object);

        let removed = surface.remove_object(0, marker.render_id()).unwrap();
        assert_eq!(removed.page, None);
    }

    #[test]
    fn test_shrinking_page_count_drops_objects() {
        let mut surface = PageSurface::new(3);
        let marker = Marker::new(MarkerKind::Circle, 2, PageRect::new(0.0, 0.0, 1.0, 1.0), MarkerStyle::default());
        let object = surface.materialize(&marker);
        surface.add_object(2, object);

        surface.set_page_count(1);
        assert_eq!(surface.page_count(), 1);
        assert_eq!(surface.object_count(), 0);
        assert!(surface.objects(2).is_empty());
    }
}
