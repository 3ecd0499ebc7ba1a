//! Linked-graph (fiber-style) host engine.
//!
//! The newer simulated engine generation. Its internal representation is an
//! arena of index-linked [`FiberNode`]s: each node carries a discriminant
//! tag, a first-child pointer, a next-sibling pointer, and an alternate
//! pointer pairing it with its counterpart from the other
//! committed/in-progress generation. Updates build a new generation whose
//! nodes are alternate-linked to the old one; commit is a generation-counter
//! swap, so a normalizer can always pick the committed side of every pair.
//! Only the committed pair stays resident: each commit prunes every older
//! generation from the arena, keeping arena size independent of how many
//! updates a session has seen.

use serde_json::Value;
use std::rc::Rc;

use crate::component::{ComponentDef, DefKind, InstanceHandle, RenderScope};
use crate::element::{Element, ElementType, ElementValue, Literal, Props};
use crate::engine::target::{self, HostHandle, HostInstance, MountTarget};
use crate::result::EspejoResult;

/// Index of a node in a [`FiberArena`]
pub type FiberId = usize;

/// Internal discriminant of a fiber node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberTag {
    /// Root of a mounted tree; carries no element of its own
    HostRoot,
    /// Stateful composite component
    Class,
    /// Stateless composite component
    Function,
    /// Transparent grouping node
    Fragment,
    /// Host primitive
    Host,
    /// Literal committed as its own node
    Text,
    /// Subtree rendered into a detached target. Recorded by the wire format
    /// of this engine generation; no adapter interprets it yet.
    Portal,
}

/// Live backing object recorded on a fiber
#[derive(Debug)]
pub enum FiberState {
    /// Backing instance of a class fiber
    Component(InstanceHandle),
    /// Host handle of a host fiber
    Host(HostHandle),
}

/// One node of the engine's private linked graph
#[derive(Debug)]
pub struct FiberNode {
    /// Discriminant tag
    pub tag: FiberTag,
    /// Element type that produced this fiber, when one did
    pub element_type: Option<ElementType>,
    /// Props as of the last commit of this generation
    pub props: Props,
    /// Live backing object, when one exists
    pub state_node: Option<FiberState>,
    /// Literal payload of a text fiber
    pub text: Option<Literal>,
    /// First child
    pub child: Option<FiberId>,
    /// Next sibling
    pub sibling: Option<FiberId>,
    /// Counterpart in the paired generation
    pub alternate: Option<FiberId>,
    /// Generation this fiber was built in
    pub generation: u64,
}

impl FiberNode {
    fn new(tag: FiberTag, generation: u64) -> Self {
        Self {
            tag,
            element_type: None,
            props: Props::default(),
            state_node: None,
            text: None,
            child: None,
            sibling: None,
            alternate: None,
            generation,
        }
    }

    /// Host handle recorded on this fiber, if any
    #[must_use]
    pub fn host_handle(&self) -> Option<HostHandle> {
        match &self.state_node {
            Some(FiberState::Host(handle)) => Some(Rc::clone(handle)),
            _ => None,
        }
    }

    /// Backing instance recorded on this fiber, if any
    #[must_use]
    pub fn instance(&self) -> Option<InstanceHandle> {
        match &self.state_node {
            Some(FiberState::Component(handle)) => Some(handle.clone()),
            _ => None,
        }
    }
}

/// Arena of index-linked fibers
#[derive(Debug, Default)]
pub struct FiberArena {
    nodes: Vec<FiberNode>,
}

impl FiberArena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index
    pub fn alloc(&mut self, node: FiberNode) -> FiberId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Node by index
    #[must_use]
    pub fn get(&self, id: FiberId) -> &FiberNode {
        &self.nodes[id]
    }

    /// Mutable node by index
    pub fn get_mut(&mut self, id: FiberId) -> &mut FiberNode {
        &mut self.nodes[id]
    }

    /// Number of fibers across the resident generations
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no fibers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Collect a sibling run starting at `first`
    #[must_use]
    pub fn siblings(&self, first: Option<FiberId>) -> Vec<FiberId> {
        let mut run = Vec::new();
        let mut next = first;
        while let Some(id) = next {
            run.push(id);
            next = self.get(id).sibling;
        }
        run
    }

    /// Drop every fiber built before `generation` and remap the surviving
    /// links. Returns the old-index to new-index mapping; links into the
    /// dropped range become `None`.
    fn prune_older_than(&mut self, generation: u64) -> Vec<Option<FiberId>> {
        let mut remap = vec![None; self.nodes.len()];
        let mut kept = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            if node.generation >= generation {
                remap[id] = Some(kept);
                kept += 1;
            }
        }
        let mut id = 0;
        self.nodes.retain(|_| {
            let keep = remap[id].is_some();
            id += 1;
            keep
        });
        for node in &mut self.nodes {
            node.child = node.child.and_then(|old| remap[old]);
            node.sibling = node.sibling.and_then(|old| remap[old]);
            node.alternate = node.alternate.and_then(|old| remap[old]);
        }
        remap
    }
}

/// Linked-graph engine driving one mount target.
///
/// Updates are batched internally: by the time `render`, `dispatch`, or
/// `batched_updates` returns, the committed generation reflects every update
/// the call caused.
#[derive(Debug)]
pub struct FiberEngine {
    arena: FiberArena,
    target: MountTarget,
    root: Option<FiberId>,
    committed_generation: u64,
    root_element: Option<Element>,
    context: Value,
    instances: Vec<InstanceHandle>,
}

impl FiberEngine {
    /// Take ownership of a mount target and prepare an empty arena
    pub fn mount(target: MountTarget) -> EspejoResult<Self> {
        target::acquire(&target)?;
        Ok(Self {
            arena: FiberArena::new(),
            target,
            root: None,
            committed_generation: 0,
            root_element: None,
            context: Value::Null,
            instances: Vec::new(),
        })
    }

    /// Render or update the root element in place
    pub fn render(&mut self, el: &Element, context: Value) -> EspejoResult<()> {
        self.context = context;
        self.root_element = Some(el.clone());
        self.instances.clear();
        let generation = self.committed_generation + 1;

        let old_child = self.root.and_then(|id| self.arena.get(id).child);
        let child = self.build_value(
            &ElementValue::Element(el.clone()),
            old_child,
            generation,
        )?;

        let mut root = FiberNode::new(FiberTag::HostRoot, generation);
        root.child = child;
        root.alternate = self.root;
        let root_id = self.arena.alloc(root);
        if let Some(old_root) = self.root {
            self.arena.get_mut(old_root).alternate = Some(root_id);
        }

        self.root = Some(root_id);
        self.committed_generation = generation;

        // Only the committed generation and its paired predecessor stay
        // resident; anything older is unreachable through alternate links
        // and is reclaimed here so long sessions stay bounded.
        if generation > 1 {
            let remap = self.arena.prune_older_than(generation - 1);
            self.root = self.root.and_then(|id| remap[id]);
        }
        Ok(())
    }

    /// Arena of the engine's internal graph
    #[must_use]
    pub fn arena(&self) -> &FiberArena {
        &self.arena
    }

    /// Root fiber of the committed tree
    #[must_use]
    pub fn root_id(&self) -> Option<FiberId> {
        self.root
    }

    /// Generation that last committed
    #[must_use]
    pub fn committed_generation(&self) -> u64 {
        self.committed_generation
    }

    /// Dispatch a simulated native event against a host handle.
    ///
    /// Missing handler props are silent no-ops. State updates the handler
    /// makes are committed before this returns.
    pub fn dispatch(&mut self, handle: &HostHandle, prop: &str, args: &[Value]) -> EspejoResult<()> {
        let handler = handle.borrow().props.handler(prop);
        if let Some(handler) = handler {
            handler(args);
        }
        self.flush()
    }

    /// Run `f` and commit any state updates it made. This engine generation
    /// batches internally, so the boundary degrades to direct invocation
    /// followed by a flush.
    pub fn batched_updates(&mut self, f: Box<dyn FnOnce() + '_>) -> EspejoResult<()> {
        f();
        self.flush()
    }

    /// Tear down the committed tree and release the mount target
    pub fn unmount(&mut self) {
        self.arena = FiberArena::new();
        self.root = None;
        self.root_element = None;
        self.instances.clear();
        target::release(&self.target);
    }

    fn flush(&mut self) -> EspejoResult<()> {
        if !self.instances.iter().any(InstanceHandle::is_dirty) {
            return Ok(());
        }
        if let Some(el) = self.root_element.clone() {
            let context = self.context.clone();
            self.render(&el, context)?;
        }
        for handle in &self.instances {
            handle.clear_dirty();
        }
        Ok(())
    }

    /// Build one fiber (and its subtree) for `value`, pairing it with its
    /// counterpart `old` from the previous generation when the types match.
    fn build_value(
        &mut self,
        value: &ElementValue,
        old: Option<FiberId>,
        generation: u64,
    ) -> EspejoResult<Option<FiberId>> {
        let id = match value {
            ElementValue::Literal(literal) => {
                let mut fiber = FiberNode::new(FiberTag::Text, generation);
                fiber.text = Some(literal.clone());
                self.arena.alloc(fiber)
            }
            ElementValue::Element(el) => match &el.element_type {
                ElementType::Host(tag) => {
                    let tag = tag.clone();
                    self.build_host(&tag, el, old, generation)?
                }
                ElementType::Composite(def) => {
                    let def = Rc::clone(def);
                    self.build_composite(&def, el, old, generation)?
                }
                ElementType::Fragment => {
                    let old_child = self.matching_old_child(old, FiberTag::Fragment, None);
                    let children = el.props.child_values();
                    let child = self.build_children(&children, old_child, generation)?;
                    let mut fiber = FiberNode::new(FiberTag::Fragment, generation);
                    fiber.element_type = Some(ElementType::Fragment);
                    fiber.props = el.props.clone();
                    fiber.child = child;
                    self.arena.alloc(fiber)
                }
            },
        };
        self.pair_alternates(id, old);
        Ok(Some(id))
    }

    fn build_host(
        &mut self,
        tag: &str,
        el: &Element,
        old: Option<FiberId>,
        generation: u64,
    ) -> EspejoResult<FiberId> {
        let reusable = self.matching_old(old, FiberTag::Host, Some(&el.element_type));
        let handle = reusable
            .and_then(|id| self.arena.get(id).host_handle())
            .unwrap_or_else(|| HostInstance::create(tag, el.props.clone()));
        handle.borrow_mut().props = el.props.clone();

        let children = el.props.child_values();
        let child = if children.is_empty() || is_single_literal(&children) {
            // Text elision: a lone literal child is not committed as its
            // own fiber; it stays in the host's children prop.
            None
        } else {
            let old_child = reusable.and_then(|id| self.arena.get(id).child);
            self.build_children(&children, old_child, generation)?
        };

        let mut fiber = FiberNode::new(FiberTag::Host, generation);
        fiber.element_type = Some(el.element_type.clone());
        fiber.props = el.props.clone();
        fiber.state_node = Some(FiberState::Host(handle));
        fiber.child = child;
        Ok(self.arena.alloc(fiber))
    }

    fn build_composite(
        &mut self,
        def: &Rc<ComponentDef>,
        el: &Element,
        old: Option<FiberId>,
        generation: u64,
    ) -> EspejoResult<FiberId> {
        let (tag, handle) = match def.kind() {
            DefKind::Stateful => {
                let reusable = self.matching_old(old, FiberTag::Class, Some(&el.element_type));
                let handle = reusable
                    .and_then(|id| self.arena.get(id).instance())
                    .unwrap_or_else(|| InstanceHandle::new(def));
                (FiberTag::Class, Some(handle))
            }
            DefKind::Stateless => (FiberTag::Function, None),
        };
        if let Some(handle) = &handle {
            self.instances.push(handle.clone());
        }

        let state = handle.as_ref().map_or(Value::Null, InstanceHandle::state);
        let scope = RenderScope::new(&el.props, state, self.context.clone(), handle.clone());
        let output = def.render(&scope);

        let old_child = self.matching_old(old, tag, Some(&el.element_type))
            .and_then(|id| self.arena.get(id).child);
        let child = match output {
            Some(value) => self.build_value(&value, old_child, generation)?,
            None => None,
        };

        let mut fiber = FiberNode::new(tag, generation);
        fiber.element_type = Some(el.element_type.clone());
        fiber.props = el.props.clone();
        fiber.state_node = handle.map(FiberState::Component);
        fiber.child = child;
        Ok(self.arena.alloc(fiber))
    }

    /// Build a sibling-linked run of fibers for a child sequence
    fn build_children(
        &mut self,
        children: &[ElementValue],
        old_first: Option<FiberId>,
        generation: u64,
    ) -> EspejoResult<Option<FiberId>> {
        let old_run = self.arena.siblings(old_first);
        let mut built = Vec::with_capacity(children.len());
        for (index, child) in children.iter().enumerate() {
            let old = old_run.get(index).copied();
            if let Some(id) = self.build_value(child, old, generation)? {
                built.push(id);
            }
        }
        for pair in built.windows(2) {
            self.arena.get_mut(pair[0]).sibling = Some(pair[1]);
        }
        Ok(built.first().copied())
    }

    /// The old counterpart, if it has the expected tag (and element type)
    fn matching_old(
        &self,
        old: Option<FiberId>,
        tag: FiberTag,
        element_type: Option<&ElementType>,
    ) -> Option<FiberId> {
        let id = old?;
        let node = self.arena.get(id);
        if node.tag != tag {
            return None;
        }
        match element_type {
            Some(expected) => (node.element_type.as_ref() == Some(expected)).then_some(id),
            None => Some(id),
        }
    }

    fn matching_old_child(
        &self,
        old: Option<FiberId>,
        tag: FiberTag,
        element_type: Option<&ElementType>,
    ) -> Option<FiberId> {
        self.matching_old(old, tag, element_type)
            .and_then(|id| self.arena.get(id).child)
    }

    fn pair_alternates(&mut self, new_id: FiberId, old: Option<FiberId>) {
        if let Some(old_id) = old {
            self.arena.get_mut(new_id).alternate = Some(old_id);
            self.arena.get_mut(old_id).alternate = Some(new_id);
        }
    }
}

impl Drop for FiberEngine {
    fn drop(&mut self) {
        target::release(&self.target);
    }
}

fn is_single_literal(children: &[ElementValue]) -> bool {
    matches!(children, [ElementValue::Literal(_)])
}
