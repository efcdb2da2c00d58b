// Copyright 2026 the Molscene Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The renderer tree: composition, drawing, incremental update.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Rect};

use crate::bridge::DrawBridge;
use crate::cache::{CacheMap, CacheUpdate, RenderCache};
use crate::model::ChemModel;
use crate::options::RenderOptions;
use crate::recorder::BoundRecorder;
use crate::types::{
    CtxId, DrawnElem, ListenerId, NodeFlags, ObjId, RenderEvent, RendererId, RendererKind,
    UpdateDetail, UpdateType,
};
use crate::visual::{DummyVisual, ObjVisual, VisualFactory};

/// A tree listener callback.
pub type Listener = Box<dyn FnMut(&RenderEvent<'_>)>;

struct Node {
    generation: u32,
    obj: ObjId,
    parent: Option<RendererId>,
    /// Child renderers keyed by child object identity, in creation order.
    children: Vec<(ObjId, RendererId)>,
    visual: Box<dyn ObjVisual>,
    caches: CacheMap,
    /// Objects this node's visual recorded bounds for in its last draw
    /// into each context; includes sub-objects drawn under their own ids.
    rendered: BTreeMap<CtxId, Vec<ObjId>>,
    /// Memoized child object list; `None` until prepared or after refresh.
    child_objs: Option<Vec<ObjId>>,
    flags: NodeFlags,
    redirect_context: Option<CtxId>,
}

impl Node {
    fn new(
        generation: u32,
        obj: ObjId,
        visual: Box<dyn ObjVisual>,
        parent: Option<RendererId>,
        redirect_context: Option<CtxId>,
    ) -> Self {
        Self {
            generation,
            obj,
            parent,
            children: Vec::new(),
            visual,
            caches: CacheMap::default(),
            rendered: BTreeMap::new(),
            child_objs: None,
            flags: NodeFlags::empty(),
            redirect_context,
        }
    }
}

struct UpdateItem {
    update_type: UpdateType,
    details: Vec<UpdateDetail>,
}

struct UpdateInfo {
    ctx: CtxId,
    items: Vec<UpdateItem>,
}

/// A tree of renderer nodes over one chemical object and its descendants.
///
/// The tree owns one node per rendered object, the draw bridge it draws
/// through, and the [`BoundRecorder`] every node reports into, so the
/// "one recorder per tree" ownership rule holds by construction. It holds
/// no references into the document: every operation takes the
/// [`ChemModel`] as a parameter and resolves [`ObjId`]s through it.
///
/// Drawing is synchronous recursion. `draw` layers options
/// (caller-inherited, then object-local, then overridden), lets the
/// node's visual draw its own content, reconciles child renderers against
/// the current child object list, and draws children in an order where
/// coordinate-stuck objects follow their anchor target. On retained
/// backends the subtree's output is aggregated into one group element.
///
/// `update` applies object-level changes incrementally when the backend
/// can modify drawn graphics, and escalates to a full clear-and-redraw of
/// the context when it cannot. [`begin_update`](Self::begin_update) /
/// [`end_update`](Self::end_update) brackets coalesce updates per context
/// so a burst of small mutations flushes as one batch.
pub struct RenderTree {
    kind: RendererKind,
    factory: VisualFactory,
    bridge: Box<dyn DrawBridge>,
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: RendererId,
    recorder: BoundRecorder,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: u64,
    suspend_depth: u32,
    pending: Vec<UpdateInfo>,
}

impl core::fmt::Debug for RenderTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("RenderTree")
            .field("kind", &self.kind)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("root", &self.root)
            .field("suspend_depth", &self.suspend_depth)
            .finish_non_exhaustive()
    }
}

impl RenderTree {
    /// Builds a tree rooted at `root_obj`, with the root node's visual
    /// resolved through `factory` (falling back to a dummy visual for
    /// unregistered tags, like any other node).
    pub fn new(
        model: &dyn ChemModel,
        root_obj: ObjId,
        kind: RendererKind,
        factory: VisualFactory,
        bridge: Box<dyn DrawBridge>,
    ) -> Self {
        let mut tree = Self {
            kind,
            factory,
            bridge,
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: RendererId::new(0, 0),
            recorder: BoundRecorder::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            suspend_depth: 0,
            pending: Vec::new(),
        };
        let visual = tree.factory.create(model.type_tag(root_obj));
        tree.root = tree.alloc_node(root_obj, visual, None, None);
        tree
    }

    /// The renderer family this tree draws for.
    pub fn renderer_kind(&self) -> RendererKind {
        self.kind
    }

    /// Handle of the root renderer node.
    pub fn root(&self) -> RendererId {
        self.root
    }

    /// The object a node renders, or `None` for a stale handle.
    pub fn obj_of(&self, id: RendererId) -> Option<ObjId> {
        self.node_opt(id).map(|n| n.obj)
    }

    /// The node currently rendering `obj`, searching the whole tree.
    pub fn renderer_of(&self, obj: ObjId) -> Option<RendererId> {
        self.nodes.iter().enumerate().find_map(|(i, slot)| {
            let node = slot.as_ref()?;
            (node.obj == obj).then(|| RendererId::new(i, node.generation))
        })
    }

    /// The parent of a node, or `None` for the root or a stale handle.
    pub fn parent_of(&self, id: RendererId) -> Option<RendererId> {
        self.node_opt(id)?.parent
    }

    /// Child renderer handles of `id`, in creation order.
    pub fn child_renderers(&self, id: RendererId) -> Vec<RendererId> {
        match self.node_opt(id) {
            Some(n) => n.children.iter().map(|(_, cid)| *cid).collect(),
            None => Vec::new(),
        }
    }

    /// Whether `id` refers to a live node.
    pub fn is_alive(&self, id: RendererId) -> bool {
        self.node_opt(id).is_some()
    }

    /// The bound recorder shared by this tree.
    pub fn recorder(&self) -> &BoundRecorder {
        &self.recorder
    }

    /// Mutable access to the recorder, for setting the target context.
    pub fn recorder_mut(&mut self) -> &mut BoundRecorder {
        &mut self.recorder
    }

    /// The draw bridge this tree draws through.
    pub fn bridge(&self) -> &dyn DrawBridge {
        self.bridge.as_ref()
    }

    /// Mutable access to the bridge, for context management.
    pub fn bridge_mut(&mut self) -> &mut dyn DrawBridge {
        self.bridge.as_mut()
    }

    /// The cached parameters of a node's last draw into `ctx`.
    pub fn render_cache(&self, id: RendererId, ctx: CtxId) -> Option<&RenderCache> {
        self.node_opt(id)?.caches.get(ctx)
    }

    /// Redirects a node's (and, on creation, its descendants') backend
    /// calls to another context.
    pub fn set_redirect_context(&mut self, id: RendererId, ctx: Option<CtxId>) {
        if let Some(node) = self.node_opt_mut(id) {
            node.redirect_context = ctx;
        }
    }

    /// Registers a listener; events fire synchronously in registration
    /// order.
    pub fn add_listener(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregisters a listener, reporting whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Whether the backend can modify drawn graphics in `ctx` in place.
    pub fn can_modify_graphic(&self, ctx: CtxId) -> bool {
        self.bridge.can_modify_graphic(ctx)
    }

    /// Objects whose recorded bound in `ctx` contains `coord`, topmost
    /// first. `inflate` widens every bound for pick tolerance.
    pub fn objs_at_coord(&self, ctx: CtxId, coord: Point, inflate: f64) -> Vec<ObjId> {
        self.recorder.objs_at_coord(ctx, coord, inflate)
    }

    // ---- slot management ----

    fn node_opt(&self, id: RendererId) -> Option<&Node> {
        let node = self.nodes.get(id.index())?.as_ref()?;
        (node.generation == id.generation()).then_some(node)
    }

    fn node_opt_mut(&mut self, id: RendererId) -> Option<&mut Node> {
        let node = self.nodes.get_mut(id.index())?.as_mut()?;
        (node.generation == id.generation()).then_some(node)
    }

    /// Panics on a stale handle; internal callers check liveness first.
    fn node(&self, id: RendererId) -> &Node {
        self.nodes[id.index()].as_ref().expect("dangling RendererId")
    }

    fn node_mut(&mut self, id: RendererId) -> &mut Node {
        self.nodes[id.index()].as_mut().expect("dangling RendererId")
    }

    fn alloc_node(
        &mut self,
        obj: ObjId,
        visual: Box<dyn ObjVisual>,
        parent: Option<RendererId>,
        redirect_context: Option<CtxId>,
    ) -> RendererId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, obj, visual, parent, redirect_context));
            RendererId::new(idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes
                .push(Some(Node::new(generation, obj, visual, parent, redirect_context)));
            self.generations.push(generation);
            RendererId::new(self.nodes.len() - 1, generation)
        }
    }

    /// Frees a node and its subtree, dropping their recorded bounds.
    fn remove_node(&mut self, id: RendererId) {
        if !self.is_alive(id) {
            return;
        }
        let node = self.nodes[id.index()].take().expect("liveness checked");
        self.free_list.push(id.index());
        self.recorder.remove_everywhere(node.obj);
        for objs in node.rendered.values() {
            for obj in objs {
                self.recorder.remove_everywhere(*obj);
            }
        }
        for (_, cid) in node.children {
            self.remove_node(cid);
        }
    }

    /// Drops every node and recorded bound; the tree is unusable for
    /// drawing afterwards. Dropping the tree does the same implicitly.
    pub fn finalize(&mut self) {
        self.nodes.clear();
        self.generations.clear();
        self.free_list.clear();
        self.recorder.clear_all();
        self.pending.clear();
        self.listeners.clear();
    }

    // ---- events ----

    /// For events that do not borrow tree state.
    fn emit(&mut self, event: RenderEvent<'_>) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Bound-changed events borrow the recorder, so listeners are moved
    /// out for the duration of the call.
    fn emit_bound_changed(
        &mut self,
        ctx: CtxId,
        obj: ObjId,
        parent_obj: Option<ObjId>,
        update_type: UpdateType,
    ) {
        let mut listeners = core::mem::take(&mut self.listeners);
        let event = RenderEvent::BoundChanged {
            ctx,
            obj,
            parent_obj,
            bound: self.recorder.bound_of(ctx, obj),
            update_type,
        };
        for (_, listener) in &mut listeners {
            listener(&event);
        }
        drop(event);
        let added = core::mem::replace(&mut self.listeners, listeners);
        self.listeners.extend(added);
    }

    // ---- child object and renderer management ----

    fn prepare_child_objs(&mut self, model: &dyn ChemModel, id: RendererId) {
        if self.node(id).child_objs.is_some() {
            return;
        }
        let objs = {
            let node = self.node(id);
            node.visual.child_objs(model, node.obj)
        };
        self.node_mut(id).child_objs = Some(objs);
    }

    /// Invalidates and rebuilds a node's memoized child object list.
    pub fn refresh_child_objs(&mut self, model: &dyn ChemModel, id: RendererId) {
        if !self.is_alive(id) {
            return;
        }
        self.node_mut(id).child_objs = None;
        self.prepare_child_objs(model, id);
    }

    fn child_renderer(&self, id: RendererId, obj: ObjId) -> Option<RendererId> {
        self.node(id)
            .children
            .iter()
            .find(|(o, _)| *o == obj)
            .map(|(_, cid)| *cid)
    }

    /// Reconciles a node's child renderers with its current child object
    /// list: stale renderers are finalized, surviving ones are kept as
    /// the same instances, and missing ones are created through the
    /// factory (unregistered tags get a dummy visual). New children
    /// inherit the parent's redirect context.
    pub fn prepare_child_renderers(&mut self, model: &dyn ChemModel, id: RendererId) {
        if !self.is_alive(id) {
            return;
        }
        self.prepare_child_objs(model, id);
        let current = self.node(id).child_objs.clone().unwrap_or_default();

        let stale: Vec<(ObjId, RendererId)> = self
            .node(id)
            .children
            .iter()
            .filter(|(obj, _)| !current.contains(obj))
            .copied()
            .collect();
        for (obj, cid) in stale {
            log::trace!("finalizing stale child renderer for obj {obj:?}");
            self.node_mut(id).children.retain(|(o, _)| *o != obj);
            self.remove_node(cid);
        }

        let redirect = self.node(id).redirect_context;
        for obj in current {
            if self.child_renderer(id, obj).is_none() {
                let visual = self.factory.create(model.type_tag(obj));
                let cid = self.alloc_node(obj, visual, Some(id), redirect);
                self.node_mut(id).children.push((obj, cid));
            }
        }
    }

    /// Document order, adjusted so coordinate-stuck objects draw after
    /// the sibling they are anchored to.
    fn sorted_for_draw(&self, model: &dyn ChemModel, objs: &[ObjId]) -> Vec<ObjId> {
        let mut order: Vec<ObjId> = objs.to_vec();
        let mut pass = 0;
        loop {
            let mut moved = false;
            for i in 0..order.len() {
                let Some(target) = model.coord_stick_target(order[i]) else {
                    continue;
                };
                if let Some(j) = order.iter().position(|&o| o == target)
                    && j > i
                {
                    // Removal shifts the target left by one, so inserting
                    // at `j` lands right after it.
                    let obj = order.remove(i);
                    order.insert(j, obj);
                    moved = true;
                }
            }
            pass += 1;
            // The pass cap terminates stick cycles.
            if !moved || pass > order.len() {
                break;
            }
        }
        order
    }

    // ---- capability queries ----

    /// Whether `obj` is rendered anywhere in this tree: by a node
    /// directly, by a descendant renderer, or as a current child object
    /// awaiting a renderer.
    pub fn is_obj_rendered(&self, model: &dyn ChemModel, ctx: CtxId, obj: ObjId) -> bool {
        self.obj_rendered_by(model, self.root, ctx, obj)
    }

    /// Whether `obj` is the object a live node renders itself.
    pub fn is_obj_rendered_directly(&self, obj: ObjId) -> bool {
        self.renderer_of(obj).is_some()
    }

    fn obj_rendered_by(
        &self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        obj: ObjId,
    ) -> bool {
        let Some(node) = self.node_opt(id) else {
            return false;
        };
        if node.obj == obj {
            return true;
        }
        // Sub-objects the visual drew directly under their own ids count
        // as rendered by this node.
        if node.rendered.get(&ctx).is_some_and(|objs| objs.contains(&obj)) {
            return true;
        }
        for (_, cid) in &node.children {
            if self.obj_rendered_by(model, *cid, ctx, obj) {
                return true;
            }
        }
        // A fresh child list catches objects added since the last draw.
        node.visual.child_objs(model, node.obj).contains(&obj)
    }

    // ---- drawing ----

    /// Draws the tree into `ctx`.
    ///
    /// `base_coord` may be `None` to let nodes derive one from the model.
    /// `options` is the caller's inherited option layer. `partial`
    /// restricts the pass to the given objects and their subtrees;
    /// renderers on the path to a member still draw their own content so
    /// the members land inside a complete ancestor chain.
    ///
    /// Returns the backend element aggregating the drawn subtree on
    /// retained backends, `None` on immediate-mode ones.
    pub fn draw(
        &mut self,
        model: &dyn ChemModel,
        ctx: CtxId,
        base_coord: Option<Point>,
        options: &RenderOptions,
        partial: Option<&[ObjId]>,
    ) -> Option<DrawnElem> {
        let root = self.root;
        self.draw_node(model, root, ctx, base_coord, options, partial)
    }

    /// Replays the root's last draw into `ctx` with its cached base
    /// coordinate and options. Returns `None` (and draws nothing) when
    /// `ctx` has not been drawn before.
    pub fn redraw(&mut self, model: &dyn ChemModel, ctx: CtxId) -> Option<DrawnElem> {
        let root = self.root;
        self.redraw_node(model, root, ctx)
    }

    fn redraw_node(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
    ) -> Option<DrawnElem> {
        let (base, options) = match self.node_opt(id).and_then(|n| n.caches.get(ctx)) {
            Some(cache) => (cache.base_coord, cache.options.clone().unwrap_or_default()),
            None => {
                log::warn!("redraw of a node never drawn into ctx {ctx:?}");
                return None;
            }
        };
        let elem = self.draw_node(model, id, ctx, base, &options, None);
        // Re-attach a non-root node's output to its parent's group.
        if let Some(parent) = self.node_opt(id).and_then(|n| n.parent)
            && let Some(e) = elem
            && let Some(group) = self
                .node_opt(parent)
                .and_then(|n| n.caches.get(ctx))
                .and_then(|c| c.drawn_elem)
        {
            let actual = self.actual_ctx(parent, ctx);
            self.bridge.add_to_group(actual, e, group);
        }
        elem
    }

    fn actual_ctx(&self, id: RendererId, ctx: CtxId) -> CtxId {
        self.node_opt(id)
            .and_then(|n| n.redirect_context)
            .unwrap_or(ctx)
    }

    fn draw_node(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        base_coord: Option<Point>,
        inherited: &RenderOptions,
        partial: Option<&[ObjId]>,
    ) -> Option<DrawnElem> {
        if !self.is_alive(id) {
            return None;
        }
        let obj = self.node(id).obj;

        // Partial repaint: subtrees of a member draw unrestricted,
        // ancestors of a member keep filtering, everything else skips.
        let child_partial = match partial {
            None => None,
            Some(members) if members.contains(&obj) => None,
            Some(members) => {
                if members.iter().any(|&m| model.is_child_of(m, obj)) {
                    partial
                } else {
                    return None;
                }
            }
        };

        if self.node(id).flags.contains(NodeFlags::DRAWING) {
            log::warn!("re-entrant draw of renderer for obj {obj:?} ignored");
            return None;
        }
        self.node_mut(id).flags.insert(NodeFlags::DRAWING);

        // Option layering: inherited < object-local < overridden.
        let mut real = inherited.clone();
        if let Some(local) = model.render_options(obj, self.kind) {
            real.merge(&local);
        }
        if let Some(over) = model.overridden_render_options(obj, self.kind) {
            real.merge(&over);
        }
        let base = base_coord.or_else(|| model.auto_base_coord(obj));

        self.node_mut(id).caches.update(
            ctx,
            CacheUpdate {
                base_coord: base,
                options: Some(inherited.clone()),
                real_draw_options: Some(real.clone()),
                ..Default::default()
            },
        );

        self.emit(RenderEvent::PrepareDrawing { ctx, obj });
        let is_root = id == self.root;
        if is_root {
            log::trace!("draw pass begins for ctx {ctx:?}");
            self.bridge.prepare_context(self.actual_ctx(id, ctx));
        }

        let result = self.do_draw(model, id, ctx, base, &real, child_partial);
        self.node_mut(id).caches.update(
            ctx,
            CacheUpdate {
                drawn_elem: Some(result),
                ..Default::default()
            },
        );

        if is_root {
            self.bridge.render_context(self.actual_ctx(id, ctx));
        }
        {
            let flags = &mut self.node_mut(id).flags;
            flags.remove(NodeFlags::DRAWING);
            flags.insert(NodeFlags::DRAWN);
        }
        self.emit(RenderEvent::Draw { ctx, obj });
        result
    }

    fn do_draw(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        base: Option<Point>,
        real: &RenderOptions,
        partial: Option<&[ObjId]>,
    ) -> Option<DrawnElem> {
        self.prepare_child_objs(model, id);
        self.prepare_child_renderers(model, id);

        let actual = self.actual_ctx(id, ctx);
        let self_elem = self.draw_self(model, id, ctx, base, real);

        let child_objs = self.node(id).child_objs.clone().unwrap_or_default();
        if child_objs.is_empty() {
            return self_elem;
        }

        let group = self.bridge.create_group(actual);
        self.node_mut(id).caches.update(
            ctx,
            CacheUpdate {
                child_draw_options: Some(real.clone()),
                ..Default::default()
            },
        );
        if let (Some(g), Some(e)) = (group, self_elem) {
            self.bridge.add_to_group(actual, e, g);
        }

        for child_obj in self.sorted_for_draw(model, &child_objs) {
            let Some(child_id) = self.child_renderer(id, child_obj) else {
                continue;
            };
            let elem = self.draw_node(model, child_id, ctx, None, real, partial);
            if let (Some(g), Some(e)) = (group, elem) {
                self.bridge.add_to_group(actual, e, g);
            }
        }
        group.or(self_elem)
    }

    /// Runs the node's visual against the bridge and feeds the bounds it
    /// reported into the recorder and listeners.
    fn draw_self(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        base: Option<Point>,
        real: &RenderOptions,
    ) -> Option<DrawnElem> {
        let obj = self.node(id).obj;
        let actual_ctx = self.actual_ctx(id, ctx);
        let mut visual = core::mem::replace(&mut self.node_mut(id).visual, Box::new(DummyVisual));
        let mut scope = crate::visual::DrawScope::new(actual_ctx, base, real, self.bridge.as_mut());
        let elem = visual.draw_self(model, obj, &mut scope);
        let bounds = scope.finish();
        self.node_mut(id).visual = visual;

        let recorded: Vec<ObjId> = bounds.iter().map(|(o, _)| *o).collect();
        self.node_mut(id).rendered.insert(ctx, recorded);

        let parent_obj = self
            .node(id)
            .parent
            .and_then(|p| self.node_opt(p))
            .map(|n| n.obj);
        for (bound_obj, shape) in bounds {
            let update_type = if self.recorder.bound_of(actual_ctx, bound_obj).is_some() {
                UpdateType::Modify
            } else {
                UpdateType::Add
            };
            self.recorder.record(actual_ctx, bound_obj, shape);
            let owner = if bound_obj == obj { parent_obj } else { Some(obj) };
            self.emit_bound_changed(actual_ctx, bound_obj, owner, update_type);
        }
        elem
    }

    // ---- clearing ----

    /// Erases the tree's output from `ctx`. Idempotent; removal of
    /// elements already gone from the context is swallowed.
    pub fn clear(&mut self, ctx: CtxId) {
        let root = self.root;
        self.clear_node(root, ctx);
    }

    fn clear_node(&mut self, id: RendererId, ctx: CtxId) {
        if !self.is_alive(id) {
            return;
        }
        let child_ids: Vec<RendererId> =
            self.node(id).children.iter().map(|(_, cid)| *cid).collect();
        for cid in child_ids {
            self.clear_node(cid, ctx);
        }
        self.do_clear_self(id, ctx);

        let obj = self.node(id).obj;
        let actual = self.actual_ctx(id, ctx);
        let parent_obj = self
            .node(id)
            .parent
            .and_then(|p| self.node_opt(p))
            .map(|n| n.obj);
        let mut recorded = self.node_mut(id).rendered.remove(&ctx).unwrap_or_default();
        if !recorded.contains(&obj) {
            recorded.push(obj);
        }
        for bound_obj in recorded {
            if self.recorder.remove(actual, bound_obj) {
                let owner = if bound_obj == obj { parent_obj } else { Some(obj) };
                self.emit(RenderEvent::BoundChanged {
                    ctx: actual,
                    obj: bound_obj,
                    parent_obj: owner,
                    bound: None,
                    update_type: UpdateType::Clear,
                });
            }
        }
        self.node_mut(id).flags.remove(NodeFlags::DRAWN);
        self.emit(RenderEvent::Clear { ctx, obj });
    }

    fn do_clear_self(&mut self, id: RendererId, ctx: CtxId) {
        let actual = self.actual_ctx(id, ctx);
        if !self.bridge.can_modify_graphic(actual) {
            return;
        }
        if let Some(elem) = self.node_mut(id).caches.take_drawn_elem(ctx)
            && self.bridge.remove_drawn_elem(actual, elem).is_err()
        {
            // The element was removed from the context by other means;
            // clear stays idempotent.
            log::trace!("drawn elem {elem:?} already gone from ctx {actual:?}");
        }
    }

    // ---- incremental update ----

    /// Applies an object-level change to the drawn state. Entry point
    /// for callers reacting to document mutations; must follow a draw.
    ///
    /// Details naming objects this tree does not render are ignored.
    /// Returns `false` only when an in-place update was attempted and
    /// failed; escalation to a full redraw reports `true`.
    pub fn update(
        &mut self,
        model: &dyn ChemModel,
        ctx: CtxId,
        details: &[UpdateDetail],
        update_type: UpdateType,
    ) -> bool {
        let root = self.root;
        self.update_on(model, root, ctx, details, update_type)
    }

    /// [`update`](Self::update) addressed at one node; updates for
    /// objects outside that node's subtree are ignored.
    pub fn update_on(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        details: &[UpdateDetail],
        update_type: UpdateType,
    ) -> bool {
        if !self.is_alive(id) {
            return true;
        }
        let filtered: Vec<UpdateDetail> = details
            .iter()
            .filter(|d| self.obj_rendered_by(model, id, ctx, d.obj))
            .cloned()
            .collect();
        if filtered.is_empty() {
            return true;
        }
        let infos = alloc::vec![UpdateInfo {
            ctx,
            items: alloc::vec![UpdateItem {
                update_type,
                details: filtered,
            }],
        }];
        self.update_ex(model, id, infos)
    }

    /// Opens an update batch; nested brackets are allowed. While a
    /// bracket is open, updates queue (merged per context) instead of
    /// applying.
    pub fn begin_update(&mut self) {
        self.suspend_depth += 1;
    }

    /// Closes an update batch; the outermost close flushes the queued
    /// updates as one pass.
    pub fn end_update(&mut self, model: &dyn ChemModel) -> bool {
        self.suspend_depth = self.suspend_depth.saturating_sub(1);
        if self.suspend_depth > 0 {
            return true;
        }
        let pending = core::mem::take(&mut self.pending);
        if pending.is_empty() {
            return true;
        }
        let root = self.root;
        self.update_ex(model, root, pending)
    }

    /// Whether an update batch is currently open.
    pub fn is_updating(&self) -> bool {
        self.suspend_depth > 0
    }

    fn update_ex(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        infos: Vec<UpdateInfo>,
    ) -> bool {
        if self.suspend_depth > 0 {
            merge_update_infos(&mut self.pending, infos);
            return true;
        }
        let can_modify = infos
            .iter()
            .all(|info| self.bridge.can_modify_graphic(self.actual_ctx(id, info.ctx)));
        if can_modify {
            let mut ok = true;
            'infos: for info in &infos {
                for item in &info.items {
                    ok = self.do_update(model, id, info.ctx, &item.details, item.update_type);
                    if !ok {
                        break 'infos;
                    }
                }
            }
            return ok;
        }

        // The backend cannot patch drawn graphics: the root clears the
        // affected contexts and redraws them whole, everything else
        // hands the batch to its parent.
        if id == self.root {
            log::debug!("backend cannot modify graphics; escalating to full redraw");
            let mut ctxs: Vec<CtxId> = Vec::new();
            for info in &infos {
                if !ctxs.contains(&info.ctx) {
                    ctxs.push(info.ctx);
                }
            }
            for ctx in ctxs {
                let actual = self.actual_ctx(id, ctx);
                self.bridge.clear_context(actual);
                self.recorder.clear_context(actual);
                let (base, options) = match self.node(id).caches.get(ctx) {
                    Some(cache) => (cache.base_coord, cache.options.clone().unwrap_or_default()),
                    None => (None, RenderOptions::default()),
                };
                self.draw_node(model, id, ctx, base, &options, None);
            }
            true
        } else {
            log::trace!("escalating update to parent renderer");
            let parent = self.node(id).parent.expect("non-root node has a parent");
            self.update_ex(model, parent, infos)
        }
    }

    fn do_update(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        details: &[UpdateDetail],
        update_type: UpdateType,
    ) -> bool {
        let obj = self.node(id).obj;

        // A hit on the node's own object, or on a sub-object its visual
        // drew directly, short-circuits routing: the node repaints.
        let self_hit = {
            let node = self.node(id);
            details.iter().any(|d| {
                d.obj == obj
                    || (node
                        .rendered
                        .get(&ctx)
                        .is_some_and(|objs| objs.contains(&d.obj))
                        && !node.children.iter().any(|(o, _)| *o == d.obj))
            })
        };
        if self_hit {
            self.clear_node(id, ctx);
            if update_type == UpdateType::Clear {
                return true;
            }
            self.redraw_node(model, id, ctx);
            return true;
        }

        self.refresh_child_objs(model, id);
        let direct_children = self.node(id).child_objs.clone().unwrap_or_default();

        // Leaf nodes drew the updated sub-objects themselves.
        if self.node(id).children.is_empty() && direct_children.is_empty() {
            self.clear_node(id, ctx);
            if update_type == UpdateType::Clear {
                return true;
            }
            self.redraw_node(model, id, ctx);
            return true;
        }

        let mut per_renderer: Vec<(RendererId, Vec<UpdateDetail>)> = Vec::new();
        for detail in details {
            if let Some(child_id) = self.child_renderer(id, detail.obj) {
                if update_type == UpdateType::Remove {
                    self.clear_node(child_id, ctx);
                    self.node_mut(id).children.retain(|(o, _)| *o != detail.obj);
                    self.remove_node(child_id);
                    continue;
                }
                push_detail(&mut per_renderer, child_id, detail.clone());
                continue;
            }
            let responsible: Vec<RendererId> = self
                .node(id)
                .children
                .iter()
                .filter(|(_, cid)| self.obj_rendered_by(model, *cid, ctx, detail.obj))
                .map(|(_, cid)| *cid)
                .collect();
            if responsible.is_empty() {
                if direct_children.contains(&detail.obj) {
                    // A known direct child with no renderer yet (a fresh
                    // add): create its renderer and draw it into the
                    // cached group.
                    self.prepare_child_renderers(model, id);
                    if let Some(child_id) = self.child_renderer(id, detail.obj) {
                        let options = self
                            .node(id)
                            .caches
                            .get(ctx)
                            .and_then(|c| c.child_draw_options.clone())
                            .unwrap_or_default();
                        let elem = self.draw_node(model, child_id, ctx, None, &options, None);
                        if let Some(e) = elem
                            && let Some(group) =
                                self.node(id).caches.get(ctx).and_then(|c| c.drawn_elem)
                        {
                            let actual = self.actual_ctx(id, ctx);
                            self.bridge.add_to_group(actual, e, group);
                        }
                    }
                }
                continue;
            }
            for rid in responsible {
                push_detail(&mut per_renderer, rid, detail.clone());
            }
        }

        let mut ok = true;
        for (rid, dets) in per_renderer {
            ok = self.update_on(model, rid, ctx, &dets, update_type) && ok;
        }
        ok
    }

    // ---- box estimation ----

    /// Bounding box of the whole tree in the document's own coordinate
    /// system: the union of every node's self box. `None` when no node
    /// could estimate geometry.
    pub fn estimate_obj_box(
        &mut self,
        model: &dyn ChemModel,
        ctx: CtxId,
        options: &RenderOptions,
        allow_coord_borrow: bool,
    ) -> Option<Rect> {
        let root = self.root;
        self.estimate_obj_box_on(model, root, ctx, options, allow_coord_borrow)
    }

    fn estimate_obj_box_on(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        options: &RenderOptions,
        allow_coord_borrow: bool,
    ) -> Option<Rect> {
        if !self.is_alive(id) {
            return None;
        }
        self.prepare_child_renderers(model, id);
        let mut result = {
            let node = self.node(id);
            node.visual
                .estimate_obj_box(model, node.obj, options, allow_coord_borrow)
        };
        let child_ids: Vec<RendererId> =
            self.node(id).children.iter().map(|(_, cid)| *cid).collect();
        for cid in child_ids {
            if let Some(b) = self.estimate_obj_box_on(model, cid, ctx, options, allow_coord_borrow)
            {
                result = Some(match result {
                    Some(r) => r.union(b),
                    None => b,
                });
            }
        }
        result
    }

    /// Bounding box of the tree in context space for a draw at
    /// `base_coord`. Only meaningful while a draw cycle is current;
    /// outside one the result may be stale or `None`.
    pub fn estimate_render_box(
        &mut self,
        model: &dyn ChemModel,
        ctx: CtxId,
        base_coord: Option<Point>,
        options: &RenderOptions,
        allow_coord_borrow: bool,
    ) -> Option<Rect> {
        let root = self.root;
        self.estimate_render_box_on(model, root, ctx, base_coord, options, allow_coord_borrow)
    }

    fn estimate_render_box_on(
        &mut self,
        model: &dyn ChemModel,
        id: RendererId,
        ctx: CtxId,
        base_coord: Option<Point>,
        options: &RenderOptions,
        allow_coord_borrow: bool,
    ) -> Option<Rect> {
        if !self.is_alive(id) {
            return None;
        }
        self.prepare_child_renderers(model, id);
        let obj = self.node(id).obj;
        let base = base_coord.or_else(|| model.auto_base_coord(obj));
        let mut result = {
            let node = self.node(id);
            node.visual
                .estimate_render_box(model, obj, base, options, allow_coord_borrow)
        };
        let child_ids: Vec<RendererId> =
            self.node(id).children.iter().map(|(_, cid)| *cid).collect();
        for cid in child_ids {
            // Children draw at their own derived base coordinates.
            if let Some(b) =
                self.estimate_render_box_on(model, cid, ctx, None, options, allow_coord_borrow)
            {
                result = Some(match result {
                    Some(r) => r.union(b),
                    None => b,
                });
            }
        }
        result
    }
}

fn push_detail(
    per_renderer: &mut Vec<(RendererId, Vec<UpdateDetail>)>,
    id: RendererId,
    detail: UpdateDetail,
) {
    match per_renderer.iter_mut().find(|(rid, _)| *rid == id) {
        Some((_, list)) => {
            if !list.iter().any(|d| d.obj == detail.obj) {
                list.push(detail);
            }
        }
        None => per_renderer.push((id, alloc::vec![detail])),
    }
}

/// Merges queued updates per context, coalescing items of the same
/// update type and deduplicating objects within them.
fn merge_update_infos(dest: &mut Vec<UpdateInfo>, src: Vec<UpdateInfo>) {
    for info in src {
        let Some(existing) = dest.iter_mut().find(|d| d.ctx == info.ctx) else {
            dest.push(info);
            continue;
        };
        for item in info.items {
            match existing
                .items
                .iter_mut()
                .find(|it| it.update_type == item.update_type)
            {
                Some(it) => {
                    for detail in item.details {
                        if !it.details.iter().any(|d| d.obj == detail.obj) {
                            it.details.push(detail);
                        }
                    }
                }
                None => existing.items.push(item),
            }
        }
    }
}
