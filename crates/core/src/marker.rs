//! Marker data model
//!
//! A marker is the logical unit of markup on a document page: a numbered photo
//! label, free text, a shape or a freehand stroke. All coordinates are stored in
//! page-local coordinate space.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::numbering::{parse_photo_number, PhotoNumber};

/// Zero-based page index within a document
pub type PageIndex = u16;

/// Logical identity of a marker
///
/// Stable for the marker's whole logical lifetime. Attribute edits keep it,
/// identity-replacing edits (see [`Marker::replaced`]) mint a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(Uuid);

impl MarkerId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an identifier from a fixed value (fixtures, scripted sessions)
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a marker with the object that currently renders it
///
/// Regenerated whenever the marker needs to be (re)materialized. Never used
/// for logical identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RenderId(Uuid);

impl RenderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned rectangle in page coordinate space (points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two arbitrary corners
    pub fn from_corners(a: (f32, f32), b: (f32, f32)) -> Self {
        let min_x = a.0.min(b.0);
        let min_y = a.1.min(b.1);
        Self {
            x: min_x,
            y: min_y,
            width: (a.0 - b.0).abs(),
            height: (a.1 - b.1).abs(),
        }
    }

    /// Same size, shifted by (dx, dy)
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// RGB color, alpha is carried separately in [`MarkerStyle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
}

/// Visual styling, carried through edits and reconciliation untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub color: Color,
    /// 0.0 = transparent, 1.0 = opaque
    pub alpha: f32,
    /// Stroke width in points
    pub line_width: f32,
    /// Dash lengths in points, empty for a solid stroke
    pub dash_pattern: Vec<f32>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            color: Color::RED,
            alpha: 1.0,
            line_width: 2.0,
            dash_pattern: Vec::new(),
        }
    }
}

/// What a marker depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Numbered label tying a spot on the page to a photo
    PhotoMarker,
    FreeText,
    Line,
    Arrow,
    Rectangle,
    Square,
    Circle,
    HandDrawn,
}

/// Object type a rendering surface uses to draw a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    FreeText,
    Line,
    Square,
    Circle,
    Ink,
}

impl MarkerKind {
    /// Rendering object type used when this kind is materialized
    ///
    /// Photo markers and free text share the free-text object type, the
    /// marker kind is what keeps them apart.
    pub fn render_kind(self) -> RenderKind {
        match self {
            MarkerKind::PhotoMarker | MarkerKind::FreeText => RenderKind::FreeText,
            MarkerKind::Line | MarkerKind::Arrow => RenderKind::Line,
            MarkerKind::Rectangle | MarkerKind::Square => RenderKind::Square,
            MarkerKind::Circle => RenderKind::Circle,
            MarkerKind::HandDrawn => RenderKind::Ink,
        }
    }

    /// Human readable name, used in undo/redo menu titles
    pub fn display_name(self) -> &'static str {
        match self {
            MarkerKind::PhotoMarker => "Photo Marker",
            MarkerKind::FreeText => "Text",
            MarkerKind::Line => "Line",
            MarkerKind::Arrow => "Arrow",
            MarkerKind::Rectangle => "Rectangle",
            MarkerKind::Square => "Square",
            MarkerKind::Circle => "Circle",
            MarkerKind::HandDrawn => "Drawing",
        }
    }
}

/// A single piece of markup attached to one page
///
/// Markers are values: every edit produces a new `Marker`. Edits through the
/// `with_*` helpers keep the logical [`MarkerId`] and mint a new [`RenderId`],
/// so the reconciler re-materializes the changed marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    id: MarkerId,
    render_id: RenderId,
    kind: MarkerKind,
    page_index: PageIndex,
    bounds: PageRect,
    style: MarkerStyle,
    content: Option<String>,
}

impl Marker {
    /// Create a new marker with generated identifiers
    pub fn new(kind: MarkerKind, page_index: PageIndex, bounds: PageRect, style: MarkerStyle) -> Self {
        Self::with_id(MarkerId::new(), kind, page_index, bounds, style)
    }

    /// Create a marker with a specific logical id
    pub fn with_id(
        id: MarkerId,
        kind: MarkerKind,
        page_index: PageIndex,
        bounds: PageRect,
        style: MarkerStyle,
    ) -> Self {
        Self {
            id,
            render_id: RenderId::new(),
            kind,
            page_index,
            bounds,
            style,
            content: None,
        }
    }

    /// Create a photo marker labelled with `number`
    pub fn photo(page_index: PageIndex, bounds: PageRect, style: MarkerStyle, number: PhotoNumber) -> Self {
        Self::new(MarkerKind::PhotoMarker, page_index, bounds, style).with_content(Some(number.to_string()))
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn render_id(&self) -> RenderId {
        self.render_id
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    pub fn page_index(&self) -> PageIndex {
        self.page_index
    }

    pub fn bounds(&self) -> PageRect {
        self.bounds
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn is_photo_marker(&self) -> bool {
        self.kind == MarkerKind::PhotoMarker
    }

    /// The label number of a photo marker, if it carries a valid one
    pub fn photo_number(&self) -> Option<PhotoNumber> {
        if !self.is_photo_marker() {
            return None;
        }
        self.content.as_deref().and_then(parse_photo_number)
    }

    /// Copy with new bounds (move or resize)
    pub fn with_bounds(&self, bounds: PageRect) -> Self {
        let mut next = self.rematerialized();
        next.bounds = bounds;
        next
    }

    /// Copy with a new style
    pub fn with_style(&self, style: MarkerStyle) -> Self {
        let mut next = self.rematerialized();
        next.style = style;
        next
    }

    /// Copy with new text content
    pub fn with_content(&self, content: Option<String>) -> Self {
        let mut next = self.rematerialized();
        next.content = content;
        next
    }

    /// Copy attached to another page
    pub fn moved_to_page(&self, page_index: PageIndex, bounds: PageRect) -> Self {
        let mut next = self.rematerialized();
        next.page_index = page_index;
        next.bounds = bounds;
        next
    }

    /// Identity-replacing copy: same attributes, new logical id
    ///
    /// Used when the rendering surface cannot mutate an attribute in place and
    /// the marker has to be regenerated as a new object.
    pub fn replaced(&self) -> Self {
        let mut next = self.rematerialized();
        next.id = MarkerId::new();
        next
    }

    fn rematerialized(&self) -> Self {
        let mut next = self.clone();
        next.render_id = RenderId::new();
        next
    }
}
