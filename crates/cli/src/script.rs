//! Edit scripts: a JSON list of editing steps replayed through a session

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use markup_core::{
    EditSession, Marker, MarkerId, MarkerKind, MarkerStyle, PageIndex, PageRect, PageSurface,
    SyncReport,
};
use serde::Deserialize;
use tracing::debug;

fn default_pages() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Page count of the document being marked up
    #[serde(default = "default_pages")]
    pub pages: usize,
    /// Emulate a surface that clears page back-references on removal
    #[serde(default)]
    pub backref_defect: bool,
    pub steps: Vec<Step>,
}

/// One editing action. Markers are referred to by a script-local tag.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    AddPhoto {
        tag: String,
        page: PageIndex,
        bounds: PageRect,
        #[serde(default)]
        style: MarkerStyle,
    },
    Add {
        tag: String,
        kind: MarkerKind,
        page: PageIndex,
        bounds: PageRect,
        #[serde(default)]
        style: MarkerStyle,
        #[serde(default)]
        text: Option<String>,
    },
    Move {
        tag: String,
        bounds: PageRect,
        #[serde(default)]
        page: Option<PageIndex>,
    },
    SetText {
        tag: String,
        text: Option<String>,
    },
    Restyle {
        tag: String,
        style: MarkerStyle,
    },
    /// Regenerate the marker under a new identity
    Replace {
        tag: String,
    },
    Delete {
        tag: String,
    },
    Undo,
    Redo,
    /// The document was reloaded with a different page count
    Reload {
        pages: usize,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::AddPhoto { .. } => "add_photo",
            Step::Add { .. } => "add",
            Step::Move { .. } => "move",
            Step::SetText { .. } => "set_text",
            Step::Restyle { .. } => "restyle",
            Step::Replace { .. } => "replace",
            Step::Delete { .. } => "delete",
            Step::Undo => "undo",
            Step::Redo => "redo",
            Step::Reload { .. } => "reload",
        }
    }
}

impl Script {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to parse edit script")
    }
}

/// A session being driven by a script
pub struct Replayer {
    pub session: EditSession,
    pub surface: PageSurface,
    /// Every id a tag has named, oldest first; undo can bring any of them back
    tags: HashMap<String, Vec<MarkerId>>,
    /// Accumulated surface changes over all steps
    pub totals: SyncReport,
}

impl Replayer {
    pub fn new(session: EditSession, surface: PageSurface) -> Self {
        Self {
            session,
            surface,
            tags: HashMap::new(),
            totals: SyncReport::default(),
        }
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            self.step(step)
                .with_context(|| format!("step {} ({}) failed", index + 1, step.name()))?;
        }
        Ok(())
    }

    /// Tag of every marker id the script has named
    pub fn tag_index(&self) -> HashMap<MarkerId, &str> {
        self.tags
            .iter()
            .flat_map(|(tag, ids)| ids.iter().map(move |&id| (id, tag.as_str())))
            .collect()
    }

    fn step(&mut self, step: &Step) -> Result<()> {
        let report = match step {
            Step::AddPhoto { tag, page, bounds, style } => {
                self.ensure_new_tag(tag)?;
                let (marker, report) = self.session.add_photo_marker(
                    &mut self.surface,
                    *page,
                    *bounds,
                    style.clone(),
                )?;
                self.record(tag, marker.id());
                report
            }
            Step::Add { tag, kind, page, bounds, style, text } => {
                self.ensure_new_tag(tag)?;
                let marker = Marker::new(*kind, *page, *bounds, style.clone()).with_content(text.clone());
                let id = marker.id();
                let report = self.session.add_marker(&mut self.surface, marker)?;
                self.record(tag, id);
                report
            }
            Step::Move { tag, bounds, page } => {
                let before = self.live(tag)?;
                let after = match page {
                    Some(page) => before.moved_to_page(*page, *bounds),
                    None => before.with_bounds(*bounds),
                };
                self.session.update_marker(&mut self.surface, before, after)?
            }
            Step::SetText { tag, text } => {
                let before = self.live(tag)?;
                let after = before.with_content(text.clone());
                self.session.update_marker(&mut self.surface, before, after)?
            }
            Step::Restyle { tag, style } => {
                let before = self.live(tag)?;
                let after = before.with_style(style.clone());
                self.session.update_marker(&mut self.surface, before, after)?
            }
            Step::Replace { tag } => {
                let before = self.live(tag)?;
                let after = before.replaced();
                let id = after.id();
                let report = self.session.update_marker(&mut self.surface, before, after)?;
                self.record(tag, id);
                report
            }
            Step::Delete { tag } => {
                let id = self.live(tag)?.id();
                self.session.delete_marker(&mut self.surface, id)?
            }
            Step::Undo => self.session.undo(&mut self.surface).unwrap_or_else(|| {
                debug!("nothing to undo");
                SyncReport::default()
            }),
            Step::Redo => self.session.redo(&mut self.surface).unwrap_or_else(|| {
                debug!("nothing to redo");
                SyncReport::default()
            }),
            Step::Reload { pages } => {
                self.surface.set_page_count(*pages);
                self.session.sync(&mut self.surface)
            }
        };

        // Out-of-range markers are reported by the final sync, not per step
        self.totals.removed.extend(report.removed);
        self.totals.added.extend(report.added);
        Ok(())
    }

    /// A tag can be reused once none of its markers is live
    fn ensure_new_tag(&self, tag: &str) -> Result<()> {
        if self.live_id(tag).is_some() {
            bail!("marker tag {tag:?} is already in use");
        }
        Ok(())
    }

    fn record(&mut self, tag: &str, id: MarkerId) {
        self.tags.entry(tag.to_owned()).or_default().push(id);
    }

    /// At most one id per tag is live: every reachable state is one the
    /// script already passed through
    fn live_id(&self, tag: &str) -> Option<MarkerId> {
        let store = self.session.store();
        self.tags
            .get(tag)?
            .iter()
            .rev()
            .copied()
            .find(|&id| store.get(id).is_some())
    }

    fn live(&self, tag: &str) -> Result<Marker> {
        if !self.tags.contains_key(tag) {
            bail!("unknown marker tag {tag:?}");
        }
        self.live_id(tag)
            .and_then(|id| self.session.store().get(id))
            .cloned()
            .with_context(|| format!("marker {tag:?} is not live"))
    }
}
