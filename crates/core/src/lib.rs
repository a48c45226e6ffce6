//! Markup Engine Core Library
//!
//! Marker model, undo/redo command log and rendering-surface reconciliation
//! for document markup (photo markers, text, shapes, freehand drawing).

pub mod command_log;
pub mod config;
pub mod marker;
pub mod numbering;
pub mod operation;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod surface;

pub use command_log::{CommandLog, InversePair, LogState, Replay, UndoGroup};
pub use config::{ConfigError, EngineConfig, DEFAULT_LOG_FILTER};
pub use marker::{
    Color, Marker, MarkerId, MarkerKind, MarkerStyle, PageIndex, PageRect, RenderId, RenderKind,
};
pub use numbering::{
    allocate, allocate_from_contents, parse_photo_number, AllocatorExhausted, PhotoNumber,
    MAX_PHOTO_NUMBER,
};
pub use operation::Operation;
pub use reconcile::{
    capture, ReconcileIssue, Reconciler, RenderSurface, RenderedIndex, RenderedObject, SyncReport,
};
pub use session::{EditSession, SessionError, SessionResult};
pub use store::{MarkerStore, MarkerStoreError, Snapshot};
pub use surface::{PageSurface, RenderedMarker};
