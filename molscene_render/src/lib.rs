// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Molscene Render: a composable renderer tree for chemical scenes.
//!
//! A document of chemical objects (molecules, atoms, bonds, markers) is
//! drawn by a tree of renderer nodes mirroring the object hierarchy. Each
//! node delegates its own content to a pluggable [`ObjVisual`], draws
//! through an abstract [`DrawBridge`] backend, and records where its
//! objects landed so interaction code can hit test without re-rendering.
//!
//! - [`RenderTree`]: the tree itself, with the draw / redraw / update /
//!   clear protocol and per-context parameter caches.
//! - [`ChemModel`]: read-only view of the document; the tree holds
//!   [`ObjId`] handles, never references into it.
//! - [`VisualFactory`] maps [`TypeTag`]s to visuals; unknown tags fall
//!   back to [`DummyVisual`] so one unsupported object never fails a pass.
//! - [`DrawBridge`] and [`BridgeManager`]: backend abstraction plus
//!   runtime selection among registered backends by priority and support.
//! - [`BoundRecorder`]: per-context bound shapes (from
//!   [`molscene_shape`]) in draw order, queried topmost first.
//!
//! ## Incremental updates
//!
//! After a draw, document mutations reach the tree as
//! [`UpdateDetail`]s. On backends that can modify drawn graphics the
//! change is routed to the smallest responsible subtree and repainted in
//! place; otherwise the whole context is cleared and redrawn from cached
//! parameters. [`RenderTree::begin_update`] / [`RenderTree::end_update`]
//! brackets coalesce a burst of mutations into one pass.
//!
//! ## Example
//!
//! ```
//! use kurbo::Point;
//! use molscene_render::{
//!     ChemModel, CtxId, DrawBridge, DrawScope, DrawnElem, ObjId, ObjVisual, RenderOptions,
//!     RenderTree, RendererKind, StaleElem, TypeTag, UpdateDetail, UpdateType, VisualFactory,
//! };
//! use molscene_shape::MetaShape;
//!
//! struct Water;
//!
//! impl ChemModel for Water {
//!     fn type_tag(&self, _obj: ObjId) -> TypeTag {
//!         TypeTag(1)
//!     }
//!     fn child_objs(&self, obj: ObjId) -> Vec<ObjId> {
//!         if obj == ObjId(0) {
//!             vec![ObjId(1), ObjId(2), ObjId(3)]
//!         } else {
//!             Vec::new()
//!         }
//!     }
//!     fn is_child_of(&self, obj: ObjId, ancestor: ObjId) -> bool {
//!         ancestor == ObjId(0) && obj != ObjId(0)
//!     }
//! }
//!
//! struct Immediate;
//!
//! impl DrawBridge for Immediate {
//!     fn create_context(&mut self, _w: f64, _h: f64) -> CtxId {
//!         CtxId(0)
//!     }
//!     fn release_context(&mut self, _ctx: CtxId) {}
//!     fn clear_context(&mut self, _ctx: CtxId) {}
//!     fn can_modify_graphic(&self, _ctx: CtxId) -> bool {
//!         false
//!     }
//!     fn remove_drawn_elem(&mut self, _ctx: CtxId, _elem: DrawnElem) -> Result<(), StaleElem> {
//!         Err(StaleElem)
//!     }
//!     fn draw_shape(
//!         &mut self,
//!         _ctx: CtxId,
//!         _shape: &MetaShape,
//!         _options: &RenderOptions,
//!     ) -> Option<DrawnElem> {
//!         None
//!     }
//!     fn create_group(&mut self, _ctx: CtxId) -> Option<DrawnElem> {
//!         None
//!     }
//!     fn add_to_group(&mut self, _ctx: CtxId, _elem: DrawnElem, _group: DrawnElem) {}
//! }
//!
//! struct Atom;
//!
//! impl ObjVisual for Atom {
//!     fn draw_self(
//!         &mut self,
//!         _model: &dyn ChemModel,
//!         obj: ObjId,
//!         scope: &mut DrawScope<'_>,
//!     ) -> Option<DrawnElem> {
//!         let x = f64::from(u32::try_from(obj.0).unwrap_or(0));
//!         scope.draw_shape(obj, MetaShape::circle(Point::new(x * 10.0, 0.0), 3.0))
//!     }
//! }
//!
//! let mut factory = VisualFactory::new();
//! factory.register(&[TypeTag(1)], || Box::new(Atom));
//!
//! let model = Water;
//! let mut tree = RenderTree::new(
//!     &model,
//!     ObjId(0),
//!     RendererKind::R2D,
//!     factory,
//!     Box::new(Immediate),
//! );
//! let ctx = CtxId(0);
//! tree.draw(&model, ctx, None, &RenderOptions::new(), None);
//!
//! // Recorded bounds answer hit tests without another pass.
//! assert_eq!(tree.objs_at_coord(ctx, Point::new(20.0, 0.0), 0.0), vec![ObjId(2)]);
//!
//! // An immediate backend cannot patch graphics, so an update replays
//! // the whole context from the cached draw parameters.
//! assert!(tree.update(&model, ctx, &[UpdateDetail::of(ObjId(1))], UpdateType::Modify));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bridge;
mod cache;
mod model;
mod options;
mod recorder;
mod tree;
mod types;
mod visual;

pub use bridge::{BridgeCtor, BridgeManager, DrawBridge, StaleElem};
pub use cache::{CacheUpdate, RenderCache};
pub use model::ChemModel;
pub use options::{OptionValue, RenderOptions};
pub use recorder::BoundRecorder;
pub use tree::{Listener, RenderTree};
pub use types::{
    CtxId, DrawnElem, ListenerId, ObjId, RenderEvent, RendererId, RendererKind, TypeTag,
    UpdateDetail, UpdateType,
};
pub use visual::{DrawScope, DummyVisual, ObjVisual, VisualCtor, VisualFactory};
