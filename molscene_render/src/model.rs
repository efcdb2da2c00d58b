// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The document-side interface the renderer tree draws from.

use alloc::vec::Vec;

use kurbo::Point;

use crate::options::RenderOptions;
use crate::types::{ObjId, RendererKind, TypeTag};

/// Read access to the chemical document being rendered.
///
/// The renderer tree holds no references into the document; every draw
/// and update call takes the model as a parameter and resolves [`ObjId`]s
/// through it. Implementations are expected to be cheap to query.
pub trait ChemModel {
    /// The type tag visual factories dispatch on.
    fn type_tag(&self, obj: ObjId) -> TypeTag;

    /// Direct children of `obj`, in document order.
    fn child_objs(&self, obj: ObjId) -> Vec<ObjId>;

    /// Whether `obj` sits anywhere below `ancestor` in the document.
    fn is_child_of(&self, obj: ObjId, ancestor: ObjId) -> bool;

    /// Options attached to `obj` for the given renderer family.
    fn render_options(&self, obj: ObjId, kind: RendererKind) -> Option<RenderOptions> {
        let _ = (obj, kind);
        None
    }

    /// Options that outrank both inherited and local ones, typically
    /// set by interactive tools (selection highlight and the like).
    fn overridden_render_options(&self, obj: ObjId, kind: RendererKind) -> Option<RenderOptions> {
        let _ = (obj, kind);
        None
    }

    /// The sibling `obj`'s coordinates stick to, if any.
    ///
    /// A stuck object's position follows its target, so the target must
    /// be drawn first; the tree orders siblings accordingly.
    fn coord_stick_target(&self, obj: ObjId) -> Option<ObjId> {
        let _ = obj;
        None
    }

    /// A base coordinate for `obj` derived from the document itself,
    /// used when the caller of `draw` supplies none.
    fn auto_base_coord(&self, obj: ObjId) -> Option<Point> {
        let _ = obj;
        None
    }
}
