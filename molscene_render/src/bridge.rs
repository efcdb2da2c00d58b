// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The backend drawing abstraction and the registry that picks one.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use molscene_shape::MetaShape;

use crate::options::RenderOptions;
use crate::types::{CtxId, DrawnElem};

/// Returned by [`DrawBridge::remove_drawn_elem`] when the element is
/// already gone from the context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StaleElem;

/// A concrete drawing backend.
///
/// Retained-mode backends hand out [`DrawnElem`] handles and support
/// surgical removal; immediate-mode backends return `None` from the
/// element-producing methods and report `false` from
/// [`can_modify_graphic`](Self::can_modify_graphic), which makes the
/// tree fall back to clear-and-redraw.
pub trait DrawBridge {
    /// Creates a drawing context of the given size.
    fn create_context(&mut self, width: f64, height: f64) -> CtxId;

    /// Releases a context and everything drawn into it.
    fn release_context(&mut self, ctx: CtxId);

    /// Called once before the root node of a draw pass starts drawing.
    fn prepare_context(&mut self, ctx: CtxId) {
        let _ = ctx;
    }

    /// Called once after the root node of a draw pass finished; buffered
    /// backends flush here.
    fn render_context(&mut self, ctx: CtxId) {
        let _ = ctx;
    }

    /// Erases everything drawn into `ctx`.
    fn clear_context(&mut self, ctx: CtxId);

    /// Whether individual elements in `ctx` can be removed or replaced
    /// after the fact.
    fn can_modify_graphic(&self, ctx: CtxId) -> bool;

    /// Removes a previously drawn element.
    fn remove_drawn_elem(&mut self, ctx: CtxId, elem: DrawnElem) -> Result<(), StaleElem>;

    /// Draws one meta shape, returning its element on retained backends.
    fn draw_shape(
        &mut self,
        ctx: CtxId,
        shape: &MetaShape,
        options: &RenderOptions,
    ) -> Option<DrawnElem>;

    /// Opens an element group, or `None` on backends without grouping.
    fn create_group(&mut self, ctx: CtxId) -> Option<DrawnElem>;

    /// Moves `elem` into `group`.
    fn add_to_group(&mut self, ctx: CtxId, elem: DrawnElem, group: DrawnElem);

    /// Draws an externally encoded image at `origin`; backends without
    /// image support return `None`.
    fn draw_image(&mut self, ctx: CtxId, data_uri: &str, origin: Point) -> Option<DrawnElem> {
        let _ = (ctx, data_uri, origin);
        None
    }

    /// Encodes the context content as a data URI, if the backend can.
    fn export_to_data_uri(&self, ctx: CtxId, mime_type: &str) -> Option<String> {
        let _ = (ctx, mime_type);
        None
    }

    /// Maps a context coordinate to screen space. Identity by default.
    fn transform_context_coord_to_screen(&self, ctx: CtxId, coord: Point) -> Point {
        let _ = ctx;
        coord
    }
}

/// Constructs a fresh bridge instance.
pub type BridgeCtor = fn() -> Box<dyn DrawBridge>;

#[derive(Debug)]
struct BridgeEntry {
    name: &'static str,
    ctor: BridgeCtor,
    priority: i32,
    supported: bool,
}

/// Registry of available bridges, keeping a preferred one selected.
///
/// Each bridge registers with a constructor, a priority and a support
/// probe. The probe runs once at registration; unsupported bridges stay
/// listed but are never preferred. The preferred bridge is re-selected
/// on every register and unregister: highest priority wins, ties go to
/// the earlier registration.
#[derive(Debug, Default)]
pub struct BridgeManager {
    entries: Vec<BridgeEntry>,
    preferred: Option<usize>,
}

impl BridgeManager {
    /// An empty registry with no preferred bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bridge under `name`, replacing any previous entry
    /// with the same name.
    pub fn register(
        &mut self,
        name: &'static str,
        ctor: BridgeCtor,
        priority: i32,
        probe: fn() -> bool,
    ) {
        self.entries.retain(|e| e.name != name);
        let supported = probe();
        if !supported {
            log::debug!("draw bridge '{name}' registered but unsupported here");
        }
        self.entries.push(BridgeEntry {
            name,
            ctor,
            priority,
            supported,
        });
        self.reselect();
    }

    /// Removes a bridge from the registry.
    pub fn unregister(&mut self, name: &str) {
        self.entries.retain(|e| e.name != name);
        self.reselect();
    }

    fn reselect(&mut self) {
        let mut best: Option<usize> = None;
        for (i, e) in self.entries.iter().enumerate() {
            if !e.supported {
                continue;
            }
            match best {
                Some(b) if self.entries[b].priority >= e.priority => {}
                _ => best = Some(i),
            }
        }
        self.preferred = best;
    }

    /// Name of the currently preferred bridge.
    pub fn preferred_name(&self) -> Option<&'static str> {
        self.preferred.map(|i| self.entries[i].name)
    }

    /// Instantiates the preferred bridge.
    pub fn preferred_instance(&self) -> Option<Box<dyn DrawBridge>> {
        self.preferred.map(|i| (self.entries[i].ctor)())
    }

    /// Instantiates the named bridge regardless of preference, as long
    /// as its probe succeeded.
    pub fn instance_of(&self, name: &str) -> Option<Box<dyn DrawBridge>> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.supported)
            .map(|e| (e.ctor)())
    }

    /// Whether `name` is registered and passed its support probe.
    pub fn is_supported(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name && e.supported)
    }
}
