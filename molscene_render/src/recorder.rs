// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording of drawn object bounds for hit testing.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Point;

use molscene_shape::BoundShape;

use crate::types::{CtxId, ObjId};

/// Maps drawn objects to their recorded bound shapes, per context.
///
/// Entries keep draw order within a context: re-recording an object
/// updates its shape in place, and hit tests walk the order back to
/// front so later-drawn (topmost) objects win.
#[derive(Debug, Default)]
pub struct BoundRecorder {
    entries: BTreeMap<CtxId, Vec<(ObjId, BoundShape)>>,
    target_context: Option<CtxId>,
}

impl BoundRecorder {
    /// An empty recorder with no target-context filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts recording to one context; bounds reported for other
    /// contexts are dropped. `None` records everything.
    pub fn set_target_context(&mut self, ctx: Option<CtxId>) {
        self.target_context = ctx;
    }

    /// The current target-context filter.
    pub fn target_context(&self) -> Option<CtxId> {
        self.target_context
    }

    /// Records (or replaces) the bound of `obj` in `ctx`.
    pub fn record(&mut self, ctx: CtxId, obj: ObjId, shape: BoundShape) {
        if let Some(target) = self.target_context
            && target != ctx
        {
            return;
        }
        let list = self.entries.entry(ctx).or_default();
        match list.iter_mut().find(|(o, _)| *o == obj) {
            Some(slot) => slot.1 = shape,
            None => list.push((obj, shape)),
        }
    }

    /// The recorded bound of `obj` in `ctx`, if any.
    pub fn bound_of(&self, ctx: CtxId, obj: ObjId) -> Option<&BoundShape> {
        self.entries
            .get(&ctx)?
            .iter()
            .find(|(o, _)| *o == obj)
            .map(|(_, s)| s)
    }

    /// Drops the bound of `obj` in `ctx`, reporting whether one existed.
    pub fn remove(&mut self, ctx: CtxId, obj: ObjId) -> bool {
        let Some(list) = self.entries.get_mut(&ctx) else {
            return false;
        };
        let before = list.len();
        list.retain(|(o, _)| *o != obj);
        list.len() != before
    }

    /// Drops the bounds of `obj` in every context, for object disposal.
    pub fn remove_everywhere(&mut self, obj: ObjId) {
        for list in self.entries.values_mut() {
            list.retain(|(o, _)| *o != obj);
        }
    }

    /// Drops every bound recorded for `ctx`.
    pub fn clear_context(&mut self, ctx: CtxId) {
        self.entries.remove(&ctx);
    }

    /// Drops every recorded bound.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Recorded entries of `ctx` in draw order.
    pub fn iter_context(&self, ctx: CtxId) -> impl Iterator<Item = (ObjId, &BoundShape)> {
        self.entries
            .get(&ctx)
            .into_iter()
            .flat_map(|list| list.iter().map(|(o, s)| (*o, s)))
    }

    /// Objects whose recorded bound contains `coord`, topmost first.
    ///
    /// `inflate` grows every bound by the given margin before testing,
    /// which gives interactive picking a tolerance radius.
    pub fn objs_at_coord(&self, ctx: CtxId, coord: Point, inflate: f64) -> Vec<ObjId> {
        let Some(list) = self.entries.get(&ctx) else {
            return Vec::new();
        };
        list.iter()
            .rev()
            .filter(|(_, shape)| shape.contains_coord(coord, inflate))
            .map(|(o, _)| *o)
            .collect()
    }
}
