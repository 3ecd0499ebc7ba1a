//! The version-adapter contract and its shared structural helpers.
//!
//! An [`Adapter`] commits to one host-engine generation: it knows how to
//! drive that generation's renderer and how to normalize its private
//! internal graph into the RST shape. Adapters are immutable after
//! construction and hold no per-session state, so one instance can serve
//! any number of renderer sessions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::element::{Element, ElementType, ElementValue};
use crate::engine::target::{HostHandle, MountTarget};
use crate::node::{InstanceRef, NodeType, Rendered, RstNode, RstValue};
use crate::renderer::Renderer;
use crate::result::{EspejoError, EspejoResult};

/// Rendering mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RendererMode {
    /// Full mount against a live host engine
    Mount,
    /// One composite level deep, no host engine involved past that
    Shallow,
    /// Single-shot static markup
    String,
}

impl fmt::Display for RendererMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mount => "mount",
            Self::Shallow => "shallow",
            Self::String => "string",
        })
    }
}

/// Configuration for one renderer session
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Rendering mode (the only required setting)
    pub mode: RendererMode,
    /// Existing mount target to render into; when absent, mount sessions
    /// create and own one
    pub attach_to: Option<MountTarget>,
    /// Ambient context threaded into every render call
    pub context: Value,
}

impl RendererOptions {
    /// Options for the given mode with no target and null context
    #[must_use]
    pub const fn new(mode: RendererMode) -> Self {
        Self {
            mode,
            attach_to: None,
            context: Value::Null,
        }
    }

    /// Builder form: render into an existing mount target
    #[must_use]
    pub fn with_attach_to(mut self, target: MountTarget) -> Self {
        self.attach_to = Some(target);
        self
    }

    /// Builder form: set the ambient context
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Capability set every host-engine generation adapter implements.
///
/// The default method bodies are the purely structural operations that do
/// not vary by engine generation; `create_renderer` and the mount-mode
/// normalization behind it are what each generation supplies.
pub trait Adapter: fmt::Debug {
    /// Engine generation this adapter commits to
    fn target_version(&self) -> &'static str;

    /// Build a renderer session for the given options
    fn create_renderer(&self, options: RendererOptions) -> EspejoResult<Box<dyn Renderer>>;

    /// Purely structural conversion of an unrendered element description
    /// into an RST value
    fn element_to_node(&self, value: &ElementValue) -> RstValue {
        element_to_tree(value)
    }

    /// Re-derive the element description an observed node was rendered from
    fn node_to_element(&self, node: &RstNode) -> Element {
        node.to_element()
    }

    /// Resolve a node to the nearest live host handle beneath it
    fn node_to_host_node(&self, node: &RstNode) -> EspejoResult<HostHandle> {
        nearest_host_handle(node)
    }
}

/// Structurally convert an element description into an RST value, with no
/// engine render involved.
///
/// This is the depth cutoff of shallow mode: a composite's own render is
/// never invoked, but its declared `children` prop still converts
/// recursively, exactly like a host's. An unexpanded composite therefore
/// surfaces whatever children were passed to it, and `rendered: None` means
/// it was declared with none.
#[must_use]
pub fn element_to_tree(value: &ElementValue) -> RstValue {
    match value {
        ElementValue::Literal(literal) => RstValue::Literal(literal.clone()),
        ElementValue::Element(el) => RstValue::Node(element_to_node(el)),
    }
}

fn element_to_node(el: &Element) -> RstNode {
    let children: Vec<RstValue> =
        el.props.child_values().iter().map(element_to_tree).collect();
    let node_type = match &el.element_type {
        ElementType::Host(_) => NodeType::Host,
        // A declared composite has not rendered, so there is nothing to
        // classify it against; `class` is the historical default.
        ElementType::Composite(_) => NodeType::Class,
        ElementType::Fragment => NodeType::Function,
    };
    let rendered = match &el.element_type {
        ElementType::Fragment => Rendered::from_values(children),
        _ if children.is_empty() => Rendered::None,
        _ => Rendered::Many(children),
    };
    RstNode {
        node_type,
        element_type: el.element_type.clone(),
        props: el.props.clone(),
        instance: None,
        rendered,
    }
}

/// Walk `rendered` chains down from `node` to the nearest host handle.
///
/// Nodes backed by a component instance are walked through; the walk fails
/// when it hits a multi-child sequence (ambiguous) or runs out of nodes
/// before reaching a host (missing).
pub fn nearest_host_handle(node: &RstNode) -> EspejoResult<HostHandle> {
    let mut current = node;
    loop {
        if let Some(InstanceRef::Host(weak)) = &current.instance {
            return weak.upgrade().ok_or_else(|| EspejoError::MissingHostNode {
                description: format!(
                    "the engine has released the handle behind '{}'",
                    current.element_type.name()
                ),
            });
        }
        let next = match &current.rendered {
            Rendered::None => None,
            Rendered::One(value) => value.as_node(),
            Rendered::Many(values) => {
                if values.len() > 1 {
                    return Err(EspejoError::AmbiguousHostNode {
                        description: format!(
                            "'{}' rendered {} children",
                            current.element_type.name(),
                            values.len()
                        ),
                    });
                }
                values.first().and_then(RstValue::as_node)
            }
        };
        match next {
            Some(next) => current = next,
            None => {
                return Err(EspejoError::MissingHostNode {
                    description: format!(
                        "'{}' rendered no host node",
                        current.element_type.name()
                    ),
                })
            }
        }
    }
}
