//! Renderer sessions: the mutable side of the adapter contract.
//!
//! A session owns at most one live render target and the most recent root.
//! Every session follows the same three-state lifecycle regardless of mode:
//!
//! ```text
//!            render                render / simulate_event
//!   idle ───────────▶ live ◀──────────────────────────────┐
//!                      │ │                                │
//!                      │ └────────────────────────────────┘
//!                      │ unmount
//!                      ▼
//!                  unmounted   (terminal)
//! ```
//!
//! Mount sessions live with their adapters; the shallow and string sessions
//! here are shared, since neither touches a generation-specific graph.

use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::adapter::{element_to_tree, RendererMode};
use crate::component::{DefKind, InstanceHandle, RenderScope};
use crate::element::{Element, ElementType, ElementValue};
use crate::events::prop_from_event;
use crate::markup::render_to_static_markup;
use crate::node::{InstanceRef, NodeType, Rendered, RstNode, RstValue};
use crate::result::{EspejoError, EspejoResult};

/// Lifecycle state of a renderer session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing rendered yet
    Idle,
    /// A root is rendered and can be updated, queried, and unmounted
    Live,
    /// Torn down; every further operation is a usage error
    Unmounted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Live => "live",
            Self::Unmounted => "unmounted",
        })
    }
}

impl SessionState {
    /// Usage check shared by every session: the terminal state rejects all
    /// operations
    pub(crate) fn ensure_not_unmounted(self, operation: &str) -> EspejoResult<()> {
        if self == Self::Unmounted {
            return Err(EspejoError::invalid_state(operation, self));
        }
        Ok(())
    }
}

/// A live rendering session in one of the three modes.
///
/// Synchronous by contract: each operation returns only once every update it
/// caused has committed, so `get_node` immediately after always observes a
/// settled tree. Operations a mode does not define fail with
/// [`EspejoError::ModeUnsupported`] through the default bodies here.
pub trait Renderer: fmt::Debug {
    /// Mode this session was configured with
    fn mode(&self) -> RendererMode;

    /// Render the root element, or update it in place when already live
    fn render(&mut self, el: &Element) -> EspejoResult<()> {
        let _ = el;
        Err(EspejoError::mode_unsupported("render", self.mode()))
    }

    /// Produce static markup for an element, with no session state retained
    fn render_to_string(&mut self, el: &Element) -> EspejoResult<String> {
        let _ = el;
        Err(EspejoError::mode_unsupported("render_to_string", self.mode()))
    }

    /// Snapshot the current tree as an RST. Pure: never mutates the session.
    fn get_node(&self) -> EspejoResult<RstNode> {
        Err(EspejoError::mode_unsupported("get_node", self.mode()))
    }

    /// Simulate a user interaction event against a node of the current tree
    fn simulate_event(&mut self, node: &RstNode, event: &str, args: &[Value]) -> EspejoResult<()> {
        let _ = (node, event, args);
        Err(EspejoError::mode_unsupported("simulate_event", self.mode()))
    }

    /// Tear the session down; terminal
    fn unmount(&mut self) -> EspejoResult<()> {
        Err(EspejoError::mode_unsupported("unmount", self.mode()))
    }

    /// Run a closure inside the engine's update-batching boundary, when the
    /// session's engine exposes one; otherwise invoke it directly.
    ///
    /// Object-safe form; callers wanting the closure's return value use
    /// [`RendererExt::batched_updates`].
    fn batched_updates_dyn(&mut self, f: Box<dyn FnOnce() + '_>) -> EspejoResult<()>;
}

/// Generic conveniences over any [`Renderer`]
pub trait RendererExt: Renderer {
    /// [`Renderer::batched_updates_dyn`] with the closure's return value
    /// propagated
    fn batched_updates<T>(&mut self, f: impl FnOnce() -> T) -> EspejoResult<T> {
        let mut slot = None;
        self.batched_updates_dyn(Box::new(|| {
            slot = Some(f());
        }))?;
        slot.ok_or_else(|| EspejoError::engine("batched update closure did not run"))
    }
}

impl<R: Renderer + ?Sized> RendererExt for R {}

/// The root of a shallow session: the element as supplied, the backing
/// instance when the root is stateful, and its one-level render output.
#[derive(Debug)]
struct ShallowRoot {
    element: Element,
    handle: Option<InstanceHandle>,
    output: Option<ElementValue>,
}

/// Renderer session for shallow mode.
///
/// Renders the root exactly one composite level deep; everything the root's
/// output declares stays an unrendered element description. A host root
/// never renders at all, since host primitives have nothing to invoke.
#[derive(Debug)]
pub struct ShallowRenderer {
    context: Value,
    state: SessionState,
    root: Option<ShallowRoot>,
}

impl ShallowRenderer {
    /// Create an idle shallow session
    #[must_use]
    pub const fn new(context: Value) -> Self {
        Self {
            context,
            state: SessionState::Idle,
            root: None,
        }
    }

    fn live_root(&self, operation: &str) -> EspejoResult<&ShallowRoot> {
        self.state.ensure_not_unmounted(operation)?;
        self.root
            .as_ref()
            .ok_or_else(|| EspejoError::invalid_state(operation, self.state))
    }

    /// Invoke the root's render closure once and cache the output
    fn render_root(&mut self) {
        let Some(root) = &mut self.root else {
            return;
        };
        let ElementType::Composite(def) = &root.element.element_type else {
            root.output = None;
            return;
        };
        let state = root.handle.as_ref().map_or(Value::Null, InstanceHandle::state);
        let scope = RenderScope::new(
            &root.element.props,
            state,
            self.context.clone(),
            root.handle.clone(),
        );
        root.output = def.render(&scope);
        if let Some(handle) = &root.handle {
            handle.clear_dirty();
        }
    }

    /// Commit a pending state update by re-invoking the render closure
    fn flush(&mut self) {
        let dirty = self
            .root
            .as_ref()
            .and_then(|root| root.handle.as_ref())
            .is_some_and(InstanceHandle::is_dirty);
        if dirty {
            self.render_root();
        }
    }
}

impl Renderer for ShallowRenderer {
    fn mode(&self) -> RendererMode {
        RendererMode::Shallow
    }

    fn render(&mut self, el: &Element) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("render")?;
        let handle = match &el.element_type {
            ElementType::Composite(def) if def.kind() == DefKind::Stateful => {
                // Same root component updating in place keeps its instance.
                let existing = self.root.as_ref().and_then(|root| {
                    (root.element.element_type == el.element_type)
                        .then(|| root.handle.clone())
                        .flatten()
                });
                Some(existing.unwrap_or_else(|| InstanceHandle::new(def)))
            }
            _ => None,
        };
        self.root = Some(ShallowRoot {
            element: el.clone(),
            handle,
            output: None,
        });
        self.render_root();
        self.state = SessionState::Live;
        debug!(root = el.element_type.name(), "shallow render committed");
        Ok(())
    }

    fn get_node(&self) -> EspejoResult<RstNode> {
        let root = self.live_root("get_node")?;
        if !matches!(root.element.element_type, ElementType::Composite(_)) {
            // Host (or grouping) root: purely structural conversion.
            return match element_to_tree(&ElementValue::Element(root.element.clone())) {
                RstValue::Node(node) => Ok(node),
                RstValue::Literal(_) => Err(EspejoError::engine(
                    "shallow root did not convert to a node",
                )),
            };
        }
        let rendered = match &root.output {
            Some(ElementValue::Element(el)) if el.element_type == ElementType::Fragment => {
                Rendered::from_values(el.props.child_values().iter().map(element_to_tree).collect())
            }
            Some(value) => Rendered::One(Box::new(element_to_tree(value))),
            None => Rendered::None,
        };
        Ok(RstNode {
            node_type: NodeType::Class,
            element_type: root.element.element_type.clone(),
            props: root.element.props.clone(),
            instance: root
                .handle
                .as_ref()
                .map(|handle| InstanceRef::Component(handle.downgrade())),
            rendered,
        })
    }

    fn simulate_event(&mut self, node: &RstNode, event: &str, args: &[Value]) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("simulate_event")?;
        // No native event is synthesized: the matching handler prop on the
        // node itself is invoked directly, and a missing one is the event
        // bubbling to nothing.
        let prop = prop_from_event(event);
        if let Some(handler) = node.props.handler(&prop) {
            handler(args);
        }
        self.flush();
        Ok(())
    }

    fn unmount(&mut self) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("unmount")?;
        self.root = None;
        self.state = SessionState::Unmounted;
        Ok(())
    }

    fn batched_updates_dyn(&mut self, f: Box<dyn FnOnce() + '_>) -> EspejoResult<()> {
        self.state.ensure_not_unmounted("batched_updates")?;
        f();
        self.flush();
        Ok(())
    }
}

/// Renderer session for string mode: stateless and single-shot.
#[derive(Debug)]
pub struct StringRenderer {
    context: Value,
}

impl StringRenderer {
    /// Create a string session
    #[must_use]
    pub const fn new(context: Value) -> Self {
        Self { context }
    }
}

impl Renderer for StringRenderer {
    fn mode(&self) -> RendererMode {
        RendererMode::String
    }

    fn render_to_string(&mut self, el: &Element) -> EspejoResult<String> {
        render_to_static_markup(el, &self.context)
    }

    fn batched_updates_dyn(&mut self, f: Box<dyn FnOnce() + '_>) -> EspejoResult<()> {
        f();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentDef;
    use crate::element::Props;
    use serde_json::json;

    fn foo_def() -> std::rc::Rc<ComponentDef> {
        ComponentDef::stateless("Foo", |_| {
            Some(ElementValue::Element(Element::host(
                "div",
                Props::new().with("className", "in-foo"),
            )))
        })
    }

    mod shallow_tests {
        use super::*;

        #[test]
        fn test_depth_limit_leaves_composites_unexpanded() {
            let foo = foo_def();
            let root = {
                let foo = std::rc::Rc::clone(&foo);
                ComponentDef::stateless("Triple", move |_| {
                    Some(ElementValue::Element(Element::host(
                        "div",
                        Props::new().with_children(vec![
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                        ]),
                    )))
                })
            };

            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&root, Props::new()))
                .unwrap();
            let node = renderer.get_node().unwrap();

            let div = node.rendered.as_one().unwrap().as_node().unwrap();
            let children = div.rendered.as_many().unwrap();
            assert_eq!(children.len(), 3);
            for child in children {
                let child = child.as_node().unwrap();
                assert_eq!(child.node_type, NodeType::Class);
                assert!(child.rendered.is_none());
            }
        }

        #[test]
        fn test_unexpanded_output_keeps_its_declared_children() {
            let foo = foo_def();
            let bar = ComponentDef::stateless("Bar", |_| None);
            let bam = {
                let foo = std::rc::Rc::clone(&foo);
                let bar = std::rc::Rc::clone(&bar);
                ComponentDef::stateless("Bam", move |_| {
                    Some(ElementValue::Element(Element::composite(
                        &bar,
                        Props::new().with_children(vec![
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                        ]),
                    )))
                })
            };

            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&bam, Props::new()))
                .unwrap();
            let node = renderer.get_node().unwrap();

            let bar_node = node.rendered.as_one().unwrap().as_node().unwrap();
            assert_eq!(bar_node.node_type, NodeType::Class);
            assert_eq!(bar_node.element_type.name(), "Bar");
            let children = bar_node.rendered.as_many().unwrap();
            assert_eq!(children.len(), 3);
            for child in children {
                let child = child.as_node().unwrap();
                assert_eq!(child.element_type.name(), "Foo");
                assert!(child.rendered.is_none());
            }
        }

        #[test]
        fn test_grouping_output_collapses_into_the_root() {
            let def = ComponentDef::stateless("Pair", |_| {
                Some(ElementValue::Element(Element::fragment(vec![
                    ElementValue::Element(Element::host("li", Props::new())),
                    ElementValue::Element(Element::host("li", Props::new())),
                ])))
            });
            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&def, Props::new()))
                .unwrap();
            let node = renderer.get_node().unwrap();

            let run = node.rendered.as_many().unwrap();
            assert_eq!(run.len(), 2);
            for child in run {
                let child = child.as_node().unwrap();
                assert_eq!(child.node_type, NodeType::Host);
                assert_eq!(child.element_type.name(), "li");
            }
        }

        #[test]
        fn test_host_root_never_invokes_the_engine() {
            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::host(
                    "span",
                    Props::new().with_child(ElementValue::text("hi")),
                ))
                .unwrap();
            let node = renderer.get_node().unwrap();
            assert_eq!(node.node_type, NodeType::Host);
            assert_eq!(node.rendered.as_many().map(<[RstValue]>::len), Some(1));
        }

        #[test]
        fn test_stateful_root_rerenders_after_simulated_event() {
            let def = ComponentDef::stateful("Toggle", json!({ "on": false }), |scope| {
                let handle = scope.handle().unwrap();
                Some(ElementValue::Element(Element::host(
                    "button",
                    Props::new()
                        .with("data-on", scope.state()["on"].clone())
                        .with_handler("onClick", move |_| {
                            handle.set_state(json!({ "on": true }));
                        }),
                )))
            });
            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&def, Props::new()))
                .unwrap();

            let button = renderer
                .get_node()
                .unwrap()
                .rendered
                .as_one()
                .unwrap()
                .as_node()
                .unwrap()
                .clone();
            renderer.simulate_event(&button, "click", &[]).unwrap();

            let button = renderer.get_node().unwrap();
            let button = button.rendered.as_one().unwrap().as_node().unwrap();
            assert_eq!(button.props.data("data-on"), Some(&json!(true)));
        }

        #[test]
        fn test_missing_handler_is_a_silent_no_op() {
            let def = foo_def();
            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&def, Props::new()))
                .unwrap();
            let before = renderer.get_node().unwrap();
            renderer
                .simulate_event(&before, "doubleclick", &[])
                .unwrap();
            assert_eq!(renderer.get_node().unwrap().cleaned(), before.cleaned());
        }

        #[test]
        fn test_unmount_is_terminal() {
            let def = foo_def();
            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&def, Props::new()))
                .unwrap();
            renderer.unmount().unwrap();

            assert!(matches!(
                renderer.render(&Element::composite(&def, Props::new())),
                Err(EspejoError::InvalidState { .. })
            ));
            assert!(matches!(
                renderer.get_node(),
                Err(EspejoError::InvalidState { .. })
            ));
            assert!(matches!(
                renderer.unmount(),
                Err(EspejoError::InvalidState { .. })
            ));
        }

        #[test]
        fn test_get_node_before_render_is_invalid() {
            let renderer = ShallowRenderer::new(Value::Null);
            assert!(matches!(
                renderer.get_node(),
                Err(EspejoError::InvalidState { .. })
            ));
        }

        #[test]
        fn test_get_node_is_idempotent() {
            let def = foo_def();
            let mut renderer = ShallowRenderer::new(Value::Null);
            renderer
                .render(&Element::composite(&def, Props::new()))
                .unwrap();
            assert_eq!(renderer.get_node().unwrap(), renderer.get_node().unwrap());
        }

        #[test]
        fn test_batched_updates_propagates_return_value() {
            let mut renderer = ShallowRenderer::new(Value::Null);
            let value = renderer.batched_updates(|| 41 + 1).unwrap();
            assert_eq!(value, 42);
        }
    }

    mod string_tests {
        use super::*;

        #[test]
        fn test_render_to_string() {
            let def = foo_def();
            let mut renderer = StringRenderer::new(Value::Null);
            let markup = renderer
                .render_to_string(&Element::composite(&def, Props::new()))
                .unwrap();
            assert_eq!(markup, "<div class=\"in-foo\"></div>");
        }

        #[test]
        fn test_tree_operations_are_mode_errors() {
            let mut renderer = StringRenderer::new(Value::Null);
            assert!(matches!(
                renderer.render(&Element::host("div", Props::new())),
                Err(EspejoError::ModeUnsupported { .. })
            ));
            assert!(matches!(
                renderer.get_node(),
                Err(EspejoError::ModeUnsupported { .. })
            ));
            assert!(matches!(
                renderer.unmount(),
                Err(EspejoError::ModeUnsupported { .. })
            ));
        }
    }
}
