// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object drawing behavior and the factories that look it up.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Rect};

use molscene_shape::{BoundShape, MetaShape};

use crate::bridge::DrawBridge;
use crate::model::ChemModel;
use crate::options::RenderOptions;
use crate::types::{CtxId, DrawnElem, ObjId, TypeTag};

/// What a visual sees while drawing its own content.
///
/// The scope wraps the draw bridge for the duration of one node's self
/// draw and collects the bounds the visual reports; the tree feeds them
/// into its recorder and listener notifications afterwards.
pub struct DrawScope<'a> {
    ctx: CtxId,
    base_coord: Option<Point>,
    options: &'a RenderOptions,
    bridge: &'a mut dyn DrawBridge,
    bounds: Vec<(ObjId, BoundShape)>,
}

impl core::fmt::Debug for DrawScope<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DrawScope")
            .field("ctx", &self.ctx)
            .field("base_coord", &self.base_coord)
            .field("bounds", &self.bounds.len())
            .finish_non_exhaustive()
    }
}

impl<'a> DrawScope<'a> {
    pub(crate) fn new(
        ctx: CtxId,
        base_coord: Option<Point>,
        options: &'a RenderOptions,
        bridge: &'a mut dyn DrawBridge,
    ) -> Self {
        Self {
            ctx,
            base_coord,
            options,
            bridge,
            bounds: Vec::new(),
        }
    }

    /// The context being drawn into.
    pub fn ctx(&self) -> CtxId {
        self.ctx
    }

    /// Base coordinate of this pass, if one was supplied or derived.
    pub fn base_coord(&self) -> Option<Point> {
        self.base_coord
    }

    /// The fully layered options of this pass.
    pub fn options(&self) -> &RenderOptions {
        self.options
    }

    /// Direct access to the backend for operations the helpers lack.
    pub fn bridge(&mut self) -> &mut dyn DrawBridge {
        self.bridge
    }

    /// Draws a meta shape with this pass's options and records it as
    /// the bound of `obj`.
    pub fn draw_shape(&mut self, obj: ObjId, shape: MetaShape) -> Option<DrawnElem> {
        let elem = self.bridge.draw_shape(self.ctx, &shape, self.options);
        self.record_bound(obj, BoundShape::from(shape));
        elem
    }

    /// Records a bound for `obj` without drawing anything, for visuals
    /// that draw through [`bridge`](Self::bridge) directly.
    pub fn record_bound(&mut self, obj: ObjId, shape: BoundShape) {
        self.bounds.push((obj, shape));
    }

    pub(crate) fn finish(self) -> Vec<(ObjId, BoundShape)> {
        self.bounds
    }
}

/// Drawing behavior for one kind of document object.
///
/// A visual draws only the object's own content; traversal into child
/// objects, child visual lifecycle and output grouping are handled by
/// the tree. Stateless visuals are common; state, when kept, lives per
/// node since the factory constructs one visual per renderer node.
pub trait ObjVisual {
    /// Draws the object's own content, returning the top-level element
    /// on retained backends.
    fn draw_self(
        &mut self,
        model: &dyn ChemModel,
        obj: ObjId,
        scope: &mut DrawScope<'_>,
    ) -> Option<DrawnElem>;

    /// The child objects the tree should render beneath this one.
    /// Defaults to the model's direct children.
    fn child_objs(&self, model: &dyn ChemModel, obj: ObjId) -> Vec<ObjId> {
        model.child_objs(obj)
    }

    /// Bounding box of the object's own content in object coordinates,
    /// excluding children. `None` when nothing would be drawn.
    ///
    /// `allow_coord_borrow` permits taking a coordinate from a stick
    /// target or neighbor when the object itself has none.
    fn estimate_obj_box(
        &self,
        model: &dyn ChemModel,
        obj: ObjId,
        options: &RenderOptions,
        allow_coord_borrow: bool,
    ) -> Option<Rect> {
        let _ = (model, obj, options, allow_coord_borrow);
        None
    }

    /// Bounding box in context coordinates for a draw at `base_coord`.
    /// Defaults to the object box translated to the base coordinate.
    fn estimate_render_box(
        &self,
        model: &dyn ChemModel,
        obj: ObjId,
        base_coord: Option<Point>,
        options: &RenderOptions,
        allow_coord_borrow: bool,
    ) -> Option<Rect> {
        let rect = self.estimate_obj_box(model, obj, options, allow_coord_borrow)?;
        match base_coord {
            Some(base) => Some(rect + base.to_vec2()),
            None => Some(rect),
        }
    }
}

/// Fallback visual for type tags nothing is registered for.
///
/// Draws nothing, reports no children and no boxes, so unknown objects
/// silently occupy no space instead of failing the whole pass.
#[derive(Debug, Default)]
pub struct DummyVisual;

impl ObjVisual for DummyVisual {
    fn draw_self(
        &mut self,
        _model: &dyn ChemModel,
        obj: ObjId,
        _scope: &mut DrawScope<'_>,
    ) -> Option<DrawnElem> {
        log::trace!("no visual registered for obj {obj:?}, drawing nothing");
        None
    }

    fn child_objs(&self, _model: &dyn ChemModel, _obj: ObjId) -> Vec<ObjId> {
        Vec::new()
    }
}

/// Constructs a fresh visual instance.
pub type VisualCtor = fn() -> Box<dyn ObjVisual>;

/// Maps type tags to visual constructors for one renderer family.
///
/// Lookup is by exact tag; there is no tag hierarchy. Registering a tag
/// again replaces the previous constructor. Unmatched tags fall back to
/// [`DummyVisual`].
#[derive(Debug)]
pub struct VisualFactory {
    map: BTreeMap<TypeTag, VisualCtor>,
}

impl VisualFactory {
    /// An empty factory; every lookup falls back to [`DummyVisual`].
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Registers `ctor` for every tag in `tags`.
    pub fn register(&mut self, tags: &[TypeTag], ctor: VisualCtor) {
        for &tag in tags {
            self.map.insert(tag, ctor);
        }
    }

    /// Removes the registration for `tag`, reporting whether one existed.
    pub fn unregister(&mut self, tag: TypeTag) -> bool {
        self.map.remove(&tag).is_some()
    }

    /// Whether a visual is registered for `tag`.
    pub fn is_registered(&self, tag: TypeTag) -> bool {
        self.map.contains_key(&tag)
    }

    /// Creates the visual for `tag`, or a [`DummyVisual`] when nothing
    /// is registered for it.
    pub fn create(&self, tag: TypeTag) -> Box<dyn ObjVisual> {
        match self.map.get(&tag) {
            Some(ctor) => ctor(),
            None => Box::new(DummyVisual),
        }
    }
}

impl Default for VisualFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    impl ObjVisual for Marker {
        fn draw_self(
            &mut self,
            _model: &dyn ChemModel,
            obj: ObjId,
            scope: &mut DrawScope<'_>,
        ) -> Option<DrawnElem> {
            scope.record_bound(obj, BoundShape::from(MetaShape::point(Point::ORIGIN)));
            None
        }
    }

    struct EmptyModel;

    impl ChemModel for EmptyModel {
        fn type_tag(&self, _obj: ObjId) -> TypeTag {
            TypeTag(0)
        }
        fn child_objs(&self, _obj: ObjId) -> Vec<ObjId> {
            Vec::new()
        }
        fn is_child_of(&self, _obj: ObjId, _ancestor: ObjId) -> bool {
            false
        }
    }

    struct NullBridge;

    impl DrawBridge for NullBridge {
        fn create_context(&mut self, _width: f64, _height: f64) -> CtxId {
            CtxId(0)
        }
        fn release_context(&mut self, _ctx: CtxId) {}
        fn clear_context(&mut self, _ctx: CtxId) {}
        fn can_modify_graphic(&self, _ctx: CtxId) -> bool {
            false
        }
        fn remove_drawn_elem(
            &mut self,
            _ctx: CtxId,
            _elem: DrawnElem,
        ) -> Result<(), crate::bridge::StaleElem> {
            Err(crate::bridge::StaleElem)
        }
        fn draw_shape(
            &mut self,
            _ctx: CtxId,
            _shape: &MetaShape,
            _options: &RenderOptions,
        ) -> Option<DrawnElem> {
            None
        }
        fn create_group(&mut self, _ctx: CtxId) -> Option<DrawnElem> {
            None
        }
        fn add_to_group(&mut self, _ctx: CtxId, _elem: DrawnElem, _group: DrawnElem) {}
    }

    #[test]
    fn unregistered_tags_fall_back_to_dummy() {
        let mut factory = VisualFactory::new();
        factory.register(&[TypeTag(1)], || Box::new(Marker));
        assert!(factory.is_registered(TypeTag(1)));
        assert!(!factory.is_registered(TypeTag(2)));

        let mut dummy = factory.create(TypeTag(2));
        let opts = RenderOptions::new();
        let mut bridge = NullBridge;
        let mut scope = DrawScope::new(CtxId(0), None, &opts, &mut bridge);
        let elem = dummy.draw_self(&EmptyModel, ObjId(1), &mut scope);
        assert!(elem.is_none());
        assert!(scope.finish().is_empty());
        assert!(dummy.child_objs(&EmptyModel, ObjId(1)).is_empty());
    }

    #[test]
    fn registration_is_exact_match_and_replaceable() {
        let mut factory = VisualFactory::new();
        factory.register(&[TypeTag(1), TypeTag(2)], || Box::new(Marker));
        assert!(factory.is_registered(TypeTag(2)));
        assert!(factory.unregister(TypeTag(2)));
        assert!(!factory.is_registered(TypeTag(2)));
        assert!(!factory.unregister(TypeTag(2)));
    }

    #[test]
    fn scope_collects_recorded_bounds() {
        let opts = RenderOptions::new();
        let mut bridge = NullBridge;
        let mut scope = DrawScope::new(CtxId(3), Some(Point::new(1.0, 2.0)), &opts, &mut bridge);
        assert_eq!(scope.ctx(), CtxId(3));
        assert_eq!(scope.base_coord(), Some(Point::new(1.0, 2.0)));
        Marker.draw_self(&EmptyModel, ObjId(5), &mut scope);
        let bounds = scope.finish();
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds[0].0, ObjId(5));
    }
}
