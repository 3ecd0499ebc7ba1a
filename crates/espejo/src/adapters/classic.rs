//! Adapter for the instance-graph engine generation.
//!
//! The normalizer here classifies each [`ClassicInstance`] by which of its
//! optional shape markers are populated, since that is all the generation's
//! internal graph exposes: a host handle marks a host result, a single
//! rendered component marks a composite result, and a record with neither
//! is a shape this adapter does not recognize.

use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::adapter::{nearest_host_handle, Adapter, RendererMode, RendererOptions};
use crate::element::{Element, ElementValue};
use crate::engine::classic::{ClassicChild, ClassicEngine, ClassicInstance, CompositeKind};
use crate::engine::target::{create_target, MountTarget};
use crate::node::{InstanceRef, NodeType, Rendered, RstNode, RstValue};
use crate::renderer::{Renderer, SessionState, ShallowRenderer, StringRenderer};
use crate::result::{EspejoError, EspejoResult};

/// Adapter committing to the instance-graph engine generation
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicAdapter;

impl ClassicAdapter {
    /// Create the adapter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Adapter for ClassicAdapter {
    fn target_version(&self) -> &'static str {
        "1.5"
    }

    fn create_renderer(&self, options: RendererOptions) -> EspejoResult<Box<dyn Renderer>> {
        Ok(match options.mode {
            RendererMode::Mount => Box::new(ClassicMountRenderer::new(options)),
            RendererMode::Shallow => Box::new(ShallowRenderer::new(options.context)),
            RendererMode::String => Box::new(StringRenderer::new(options.context)),
        })
    }
}

/// Mount-mode session over a [`ClassicEngine`]
#[derive(Debug)]
pub struct ClassicMountRenderer {
    target: MountTarget,
    context: Value,
    engine: Option<ClassicEngine>,
    state: SessionState,
}

impl ClassicMountRenderer {
    fn new(options: RendererOptions) -> Self {
        Self {
            target: options.attach_to.unwrap_or_else(create_target),
            context: options.context,
            engine: None,
            state: SessionState::Idle,
        }
    }

    fn live_engine(&mut self, operation: &str) -> EspejoResult<&mut ClassicEngine> {
        self.state.ensure_not_unmounted(operation)?;
        let state = self.state;
        self.engine
            .as_mut()
            .ok_or_else(|| EspejoError::invalid_state(operation, state))
    }
}

impl Renderer for ClassicMountRenderer {
    fn mode(&self) -> RendererMode {
        RendererMode::Mount
    }

    fn render(&mut self, el: &Element) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("render")?;
        if self.engine.is_none() {
            self.engine = Some(ClassicEngine::mount(Rc::clone(&self.target))?);
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
        let root = self
            .engine
            .as_ref()
            .and_then(ClassicEngine::root)
            .ok_or_else(|| EspejoError::invalid_state("get_node", self.state))?;
        match instance_to_tree(root) {
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

/// Normalize one instance-graph node into an RST value.
///
/// Unrecognized shapes collapse to `None` with a diagnostic so a single
/// unexpected record never aborts a whole snapshot.
#[must_use]
pub fn instance_to_tree(inst: &ClassicInstance) -> Option<RstValue> {
    let element = inst.current_element.as_ref()?;
    let el = match element {
        ElementValue::Literal(literal) => return Some(RstValue::Literal(literal.clone())),
        ElementValue::Element(el) => el,
    };

    if let Some(handle) = &inst.host_handle {
        let rendered = match &inst.rendered_children {
            Some(entries) => {
                let values: Vec<RstValue> = entries
                    .iter()
                    .filter_map(|(_, child)| child_to_tree(child))
                    .collect();
                if values.is_empty() {
                    Rendered::None
                } else {
                    Rendered::Many(values)
                }
            }
            // Content-optimized host: its lone literal child was committed
            // as content and lives only in the children prop.
            None => {
                let values: Vec<RstValue> = el
                    .props
                    .child_values()
                    .into_iter()
                    .filter_map(|value| match value {
                        ElementValue::Literal(literal) => Some(RstValue::Literal(literal)),
                        ElementValue::Element(_) => None,
                    })
                    .collect();
                if values.is_empty() {
                    Rendered::None
                } else {
                    Rendered::Many(values)
                }
            }
        };
        return Some(RstValue::Node(RstNode {
            node_type: NodeType::Host,
            element_type: el.element_type.clone(),
            props: el.props.clone(),
            instance: Some(InstanceRef::Host(Rc::downgrade(handle))),
            rendered,
        }));
    }

    if let Some(rendered_component) = &inst.rendered_component {
        let node_type = match inst.composite_kind {
            Some(CompositeKind::Stateful) => NodeType::Class,
            Some(CompositeKind::Stateless) => NodeType::Function,
            other => {
                // Known gap: an unrecognized kind marker is classified as a
                // class rather than failing the snapshot.
                warn!(
                    component = el.element_type.name(),
                    ?other,
                    "unrecognized composite kind marker, classifying as class"
                );
                NodeType::Class
            }
        };
        let rendered = match instance_to_tree(rendered_component) {
            Some(value) => Rendered::One(Box::new(value)),
            None => Rendered::None,
        };
        return Some(RstValue::Node(RstNode {
            node_type,
            element_type: el.element_type.clone(),
            props: el.props.clone(),
            instance: inst
                .instance
                .as_ref()
                .map(|handle| InstanceRef::Component(handle.downgrade())),
            rendered,
        }));
    }

    warn!(
        element = el.element_type.name(),
        "unrecognized instance shape, collapsing subtree"
    );
    None
}

fn child_to_tree(child: &ClassicChild) -> Option<RstValue> {
    match child {
        ClassicChild::Literal(literal) => Some(RstValue::Literal(literal.clone())),
        ClassicChild::Instance(inst) => instance_to_tree(inst),
    }
}
