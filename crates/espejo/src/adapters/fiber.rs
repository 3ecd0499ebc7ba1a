//! Adapter for the linked-graph (fiber-style) engine generation.
//!
//! The normalizer here dispatches purely on each fiber's discriminant tag.
//! Before classifying a fiber it resolves the committed side of its
//! alternate pair, and grouping fibers are spliced into their parent's
//! child run with an iterative worklist so deep grouping nests never
//! recurse.

use serde_json::Value;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::adapter::{nearest_host_handle, Adapter, RendererMode, RendererOptions};
use crate::element::{Element, ElementValue};
use crate::engine::fiber::{FiberArena, FiberEngine, FiberId, FiberTag};
use crate::engine::target::{create_target, MountTarget};
use crate::node::{InstanceRef, NodeType, Rendered, RstNode, RstValue};
use crate::renderer::{Renderer, SessionState, ShallowRenderer, StringRenderer};
use crate::result::{EspejoError, EspejoResult};

/// Adapter committing to the linked-graph engine generation
#[derive(Debug, Clone, Copy, Default)]
pub struct FiberAdapter;

impl FiberAdapter {
    /// Create the adapter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Adapter for FiberAdapter {
    fn target_version(&self) -> &'static str {
        "2.0"
    }

    fn create_renderer(&self, options: RendererOptions) -> EspejoResult<Box<dyn Renderer>> {
        Ok(match options.mode {
            RendererMode::Mount => Box::new(FiberMountRenderer::new(options)),
            RendererMode::Shallow => Box::new(ShallowRenderer::new(options.context)),
            RendererMode::String => Box::new(StringRenderer::new(options.context)),
        })
    }
}

/// Mount-mode session over a [`FiberEngine`]
#[derive(Debug)]
pub struct FiberMountRenderer {
    target: MountTarget,
    context: Value,
    engine: Option<FiberEngine>,
    state: SessionState,
}

impl FiberMountRenderer {
    fn new(options: RendererOptions) -> Self {
        Self {
            target: options.attach_to.unwrap_or_else(create_target),
            context: options.context,
            engine: None,
            state: SessionState::Idle,
        }
    }

    fn live_engine(&mut self, operation: &str) -> EspejoResult<&mut FiberEngine> {
        self.state.ensure_not_unmounted(operation)?;
        let state = self.state;
        self.engine
            .as_mut()
            .ok_or_else(|| EspejoError::invalid_state(operation, state))
    }
}

impl Renderer for FiberMountRenderer {
    fn mode(&self) -> RendererMode {
        RendererMode::Mount
    }

    fn render(&mut self, el: &Element) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("render")?;
        if self.engine.is_none() {
            self.engine = Some(FiberEngine::mount(Rc::clone(&self.target))?);
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.render(el, self.context.clone())?;
        }
        self.state = SessionState::Live;
        debug!(root = el.element_type.name(), "mount render committed");
        Ok(())
    }

    fn get_node(&self) -> EspejoResult<RstNode> {
        self.state.ensure_not_unmounted("get_node")?;
        let engine = self
            .engine
            .as_ref()
            .filter(|engine| engine.root_id().is_some())
            .ok_or_else(|| EspejoError::invalid_state("get_node", self.state))?;
        let root = engine
            .root_id()
            .and_then(|id| fiber_to_tree(engine.arena(), id));
        match root {
            Some(RstValue::Node(node)) => Ok(node),
            _ => Err(EspejoError::engine("root did not normalize to a node")),
        }
    }

    fn simulate_event(&mut self, node: &RstNode, event: &str, args: &[Value]) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("simulate_event")?;
        let prop = crate::events::simulate_prop(event).ok_or_else(|| EspejoError::UnknownEvent {
            event: event.to_owned(),
        })?;
        let handle = nearest_host_handle(node)?;
        self.live_engine("simulate_event")?.dispatch(&handle, &prop, args)
    }

    fn unmount(&mut self) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("unmount")?;
        if let Some(mut engine) = self.engine.take() {
            engine.unmount();
        }
        self.state = SessionState::Unmounted;
        Ok(())
    }

    fn batched_updates_dyn(&mut self, f: Box<dyn FnOnce() + '_>) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("batched_updates")?;
        match self.engine.as_mut() {
            Some(engine) => engine.batched_updates(f),
            None => {
                f();
                Ok(())
            }
        }
    }
}

/// The committed side of a fiber's alternate pair
fn resolve(arena: &FiberArena, id: FiberId) -> FiberId {
    let fiber = arena.get(id);
    match fiber.alternate {
        Some(alt) if arena.get(alt).generation > fiber.generation => alt,
        _ => id,
    }
}

/// Normalize one fiber (and its subtree) into an RST value.
///
/// Unrecognized discriminants collapse to `None` with a diagnostic, the
/// same per-node recovery the instance-graph normalizer applies.
#[must_use]
pub fn fiber_to_tree(arena: &FiberArena, id: FiberId) -> Option<RstValue> {
    let id = resolve(arena, id);
    let fiber = arena.get(id);
    match fiber.tag {
        FiberTag::HostRoot => fiber.child.and_then(|child| fiber_to_tree(arena, child)),
        FiberTag::Text => match &fiber.text {
            Some(literal) => Some(RstValue::Literal(literal.clone())),
            None => {
                warn!("text fiber with no literal payload, collapsing");
                None
            }
        },
        FiberTag::Class | FiberTag::Function => {
            let Some(element_type) = fiber.element_type.clone() else {
                warn!("composite fiber with no element type, collapsing subtree");
                return None;
            };
            let node_type = if fiber.tag == FiberTag::Class {
                NodeType::Class
            } else {
                NodeType::Function
            };
            Some(RstValue::Node(RstNode {
                node_type,
                element_type,
                props: fiber.props.clone(),
                instance: fiber
                    .instance()
                    .map(|handle| InstanceRef::Component(handle.downgrade())),
                rendered: Rendered::from_values(children_to_values(arena, fiber.child)),
            }))
        }
        FiberTag::Host => {
            let Some(element_type) = fiber.element_type.clone() else {
                warn!("host fiber with no element type, collapsing subtree");
                return None;
            };
            let run = children_to_values(arena, fiber.child);
            let rendered = if run.is_empty() {
                // The engine elides a lone literal child as a committed
                // fiber; it is still observable through the children prop.
                let literals: Vec<RstValue> = fiber
                    .props
                    .child_values()
                    .into_iter()
                    .filter_map(|value| match value {
                        ElementValue::Literal(literal) => Some(RstValue::Literal(literal)),
                        ElementValue::Element(_) => None,
                    })
                    .collect();
                if literals.is_empty() {
                    Rendered::None
                } else {
                    Rendered::Many(literals)
                }
            } else {
                Rendered::Many(run)
            };
            Some(RstValue::Node(RstNode {
                node_type: NodeType::Host,
                element_type,
                props: fiber.props.clone(),
                instance: fiber
                    .host_handle()
                    .map(|handle| InstanceRef::Host(Rc::downgrade(&handle))),
                rendered,
            }))
        }
        FiberTag::Fragment => {
            // Grouping fibers are normally spliced by the worklist below; a
            // grouping standing alone contributes only a single value.
            let mut run = children_to_values(arena, fiber.child);
            if run.len() == 1 {
                Some(run.remove(0))
            } else {
                warn!(
                    children = run.len(),
                    "grouping fiber cannot stand in for a single node, collapsing"
                );
                None
            }
        }
        FiberTag::Portal => {
            warn!("discriminant not recognized by this normalizer, collapsing subtree");
            None
        }
    }
}

/// Normalize a child-sibling run, splicing grouping fibers in place.
///
/// Iterative worklist, so arbitrarily deep grouping nests cost no stack.
fn children_to_values(arena: &FiberArena, first: Option<FiberId>) -> Vec<RstValue> {
    let mut out = Vec::new();
    let mut queue: VecDeque<FiberId> = arena.siblings(first).into();
    while let Some(id) = queue.pop_front() {
        let resolved = resolve(arena, id);
        if arena.get(resolved).tag == FiberTag::Fragment {
            let inner = arena.siblings(arena.get(resolved).child);
            for (offset, child) in inner.into_iter().enumerate() {
                queue.insert(offset, child);
            }
        } else if let Some(value) = fiber_to_tree(arena, resolved) {
            out.push(value);
        }
    }
    out
}
