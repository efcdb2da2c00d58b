// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-context draw parameter caches kept by each renderer node.

use alloc::collections::BTreeMap;

use kurbo::Point;

use crate::options::RenderOptions;
use crate::types::{CtxId, DrawnElem};

/// What a node remembers about its last draw pass into one context.
///
/// `redraw` and update escalation replay from this; it must therefore
/// hold the caller-supplied parameters, not just derived state.
#[derive(Clone, Debug, Default)]
pub struct RenderCache {
    /// Base coordinate supplied by the caller (or derived automatically).
    pub base_coord: Option<Point>,
    /// The caller's (inherited) option layer, before local layering.
    pub options: Option<RenderOptions>,
    /// The fully layered options the pass actually drew with.
    pub real_draw_options: Option<RenderOptions>,
    /// Top-level element produced by the pass, when the backend retains.
    pub drawn_elem: Option<DrawnElem>,
    /// Option layer handed to child nodes.
    pub child_draw_options: Option<RenderOptions>,
}

/// A partial cache write; `None` fields leave the cache untouched.
#[derive(Clone, Debug, Default)]
pub struct CacheUpdate {
    /// New base coordinate, when one was supplied or derived.
    pub base_coord: Option<Point>,
    /// New caller-supplied option layer.
    pub options: Option<RenderOptions>,
    /// New fully layered options.
    pub real_draw_options: Option<RenderOptions>,
    /// Outer `Some` writes the field; the inner value may itself be
    /// `None` for immediate-mode backends.
    pub drawn_elem: Option<Option<DrawnElem>>,
    /// New option layer for child nodes.
    pub child_draw_options: Option<RenderOptions>,
}

/// Lazily populated map of caches, one per drawing context.
#[derive(Debug, Default)]
pub(crate) struct CacheMap {
    entries: BTreeMap<CtxId, RenderCache>,
}

impl CacheMap {
    pub(crate) fn get(&self, ctx: CtxId) -> Option<&RenderCache> {
        self.entries.get(&ctx)
    }

    pub(crate) fn entry(&mut self, ctx: CtxId) -> &mut RenderCache {
        self.entries.entry(ctx).or_default()
    }

    /// Applies a partial update, creating the cache on first touch.
    pub(crate) fn update(&mut self, ctx: CtxId, update: CacheUpdate) {
        let cache = self.entry(ctx);
        if let Some(base) = update.base_coord {
            cache.base_coord = Some(base);
        }
        if let Some(opts) = update.options {
            cache.options = Some(opts);
        }
        if let Some(real) = update.real_draw_options {
            cache.real_draw_options = Some(real);
        }
        if let Some(elem) = update.drawn_elem {
            cache.drawn_elem = elem;
        }
        if let Some(child) = update.child_draw_options {
            cache.child_draw_options = Some(child);
        }
    }

    /// Takes the drawn element out of the cache, if any.
    pub(crate) fn take_drawn_elem(&mut self, ctx: CtxId) -> Option<DrawnElem> {
        self.entries.get_mut(&ctx).and_then(|c| c.drawn_elem.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_updates_leave_other_fields_alone() {
        let mut map = CacheMap::default();
        let ctx = CtxId(1);
        map.update(
            ctx,
            CacheUpdate {
                base_coord: Some(Point::new(3.0, 4.0)),
                options: Some(RenderOptions::new()),
                ..Default::default()
            },
        );
        map.update(
            ctx,
            CacheUpdate {
                drawn_elem: Some(Some(DrawnElem(42))),
                ..Default::default()
            },
        );

        let cache = map.get(ctx).unwrap();
        assert_eq!(cache.base_coord, Some(Point::new(3.0, 4.0)));
        assert!(cache.options.is_some());
        assert_eq!(cache.drawn_elem, Some(DrawnElem(42)));
        assert!(cache.real_draw_options.is_none());
    }

    #[test]
    fn drawn_elem_can_be_written_back_to_none() {
        let mut map = CacheMap::default();
        let ctx = CtxId(0);
        map.update(
            ctx,
            CacheUpdate {
                drawn_elem: Some(Some(DrawnElem(7))),
                ..Default::default()
            },
        );
        assert_eq!(map.take_drawn_elem(ctx), Some(DrawnElem(7)));
        assert_eq!(map.take_drawn_elem(ctx), None);
    }

    #[test]
    fn caches_are_independent_per_context() {
        let mut map = CacheMap::default();
        map.update(
            CtxId(0),
            CacheUpdate {
                base_coord: Some(Point::ORIGIN),
                ..Default::default()
            },
        );
        assert!(map.get(CtxId(1)).is_none());
        assert!(map.get(CtxId(0)).is_some());
    }
}
