// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifier and event types shared across the renderer tree.

use alloc::string::String;
use alloc::vec::Vec;

use molscene_shape::BoundShape;

/// Opaque identifier of an object in the chemical document.
///
/// The renderer never dereferences these itself; the [`ChemModel`]
/// implementation resolves them on demand.
///
/// [`ChemModel`]: crate::ChemModel
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjId(pub u64);

/// Identifies the kind of object an [`ObjId`] refers to.
///
/// Visual factories dispatch on tags by exact match; tags carry no
/// inheritance relation between each other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeTag(pub u32);

/// Handle to a backend drawing context (one per canvas / surface).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CtxId(pub u32);

/// Handle to a graphic element produced by a draw bridge.
///
/// Only meaningful to retained-mode backends; immediate-mode backends
/// may never hand one out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawnElem(pub u64);

/// Generational handle to a renderer node inside a [`RenderTree`].
///
/// Stays valid until the node is disposed; a slot reused for a new node
/// gets a fresh generation, so stale handles are detected rather than
/// silently aliasing.
///
/// [`RenderTree`]: crate::RenderTree
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RendererId(pub(crate) u32, pub(crate) u32);

impl RendererId {
    #[inline]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "trees do not grow past u32::MAX nodes"
    )]
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self(index as u32, generation)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn generation(self) -> u32 {
        self.1
    }
}

/// Which family of renderers a tree (and its factory) belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RendererKind {
    /// Flat, planar drawing (structural formulas and the like).
    R2D,
    /// Spatial drawing; bound shapes are still recorded as projections.
    R3D,
}

/// What happened to the objects named in an update.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UpdateType {
    /// Properties changed; the object needs repainting in place.
    Modify,
    /// The object was added to its parent.
    Add,
    /// The object was removed from its parent.
    Remove,
    /// The object's drawing should be erased without replacement.
    Clear,
}

/// One changed object inside an update request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateDetail {
    /// The object that changed.
    pub obj: ObjId,
    /// Names of the changed properties, when the caller knows them.
    /// Empty means "anything may have changed".
    pub prop_names: Vec<String>,
}

impl UpdateDetail {
    /// An update detail with no property information attached.
    pub fn of(obj: ObjId) -> Self {
        Self {
            obj,
            prop_names: Vec::new(),
        }
    }
}

bitflags::bitflags! {
    /// Per-node state bits.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub(crate) struct NodeFlags: u8 {
        /// A draw pass through this node is in progress; re-entrant
        /// draw calls on the same node are ignored.
        const DRAWING = 1 << 0;
        /// The node has produced output at least once.
        const DRAWN = 1 << 1;
    }
}

/// Notifications emitted by a [`RenderTree`] to its registered listeners.
///
/// Listeners are called synchronously, in registration order, after the
/// tree has released its internal borrows for the step being reported.
///
/// [`RenderTree`]: crate::RenderTree
#[derive(Debug)]
pub enum RenderEvent<'a> {
    /// A node is about to draw into `ctx`; its cache already holds the
    /// parameters of this pass.
    PrepareDrawing { ctx: CtxId, obj: ObjId },
    /// A node finished a draw pass into `ctx`.
    Draw { ctx: CtxId, obj: ObjId },
    /// A node's output in `ctx` was erased.
    Clear { ctx: CtxId, obj: ObjId },
    /// A concrete object gained, changed or lost its recorded bound.
    BoundChanged {
        ctx: CtxId,
        obj: ObjId,
        /// The object owning the renderer that drew `obj`, when `obj`
        /// is not a renderer-owning object itself.
        parent_obj: Option<ObjId>,
        /// The new bound; `None` when the bound was removed.
        bound: Option<&'a BoundShape>,
        update_type: UpdateType,
    },
}

/// Handle returned by [`RenderTree::add_listener`], used to unregister.
///
/// [`RenderTree::add_listener`]: crate::RenderTree::add_listener
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
