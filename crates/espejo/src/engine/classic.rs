//! Instance-graph host engine.
//!
//! The older of the two simulated engine generations. Its internal
//! representation is a graph of [`ClassicInstance`] records, each of which
//! carries the element that produced it plus *optional* shape markers: an
//! ordered named-children map for host results, a single rendered component
//! for composite results, a host handle, and a composite-kind marker. The
//! instance-graph normalizer classifies nodes by which of these markers are
//! present, so the optionality here is the contract, not an accident.

use serde_json::Value;
use std::rc::Rc;

use crate::component::{ComponentDef, DefKind, InstanceHandle, RenderScope};
use crate::element::{Element, ElementType, ElementValue, Literal, Props};
use crate::engine::target::{self, HostHandle, HostInstance, MountTarget};
use crate::result::{EspejoError, EspejoResult};

/// Composite-kind marker recorded on composite instances.
///
/// The engine only ever records `Stateful` and `Stateless`; `Other` models
/// the marker values a future engine revision might record, which a
/// normalizer has to survive without aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Class-like composite with a backing instance
    Stateful,
    /// Function composite
    Stateless,
    /// Marker value this engine generation does not define
    Other(u8),
}

/// A value slot in a host instance's named-children map
#[derive(Debug)]
pub enum ClassicChild {
    /// Literal committed directly, with no internal node of its own
    Literal(Literal),
    /// Fully mounted child instance
    Instance(ClassicInstance),
}

/// One node of the engine's private instance graph
#[derive(Debug, Default)]
pub struct ClassicInstance {
    /// Element that produced this instance (`None` for the empty result of
    /// a null render)
    pub current_element: Option<ElementValue>,
    /// Ordered named-children map, present on host results with committed
    /// child nodes
    pub rendered_children: Option<Vec<(String, ClassicChild)>>,
    /// Single rendered child, present on composite results
    pub rendered_component: Option<Box<ClassicInstance>>,
    /// Live host handle, present on host results
    pub host_handle: Option<HostHandle>,
    /// Composite-kind marker, present on composite results
    pub composite_kind: Option<CompositeKind>,
    /// Backing instance, present on stateful composite results
    pub instance: Option<InstanceHandle>,
}

/// Instance-graph engine driving one mount target.
///
/// Synchronous by contract: `render`, `dispatch`, and `batched_updates` do
/// not return until every update they caused has committed, so a normalizer
/// walking [`ClassicEngine::root`] always observes a settled graph.
#[derive(Debug)]
pub struct ClassicEngine {
    target: MountTarget,
    root: Option<ClassicInstance>,
    root_element: Option<Element>,
    context: Value,
    instances: Vec<InstanceHandle>,
    in_batch: bool,
}

impl ClassicEngine {
    /// Take ownership of a mount target and prepare an empty root
    pub fn mount(target: MountTarget) -> EspejoResult<Self> {
        target::acquire(&target)?;
        Ok(Self {
            target,
            root: None,
            root_element: None,
            context: Value::Null,
            instances: Vec::new(),
            in_batch: false,
        })
    }

    /// Render or update the root element in place
    pub fn render(&mut self, el: &Element, context: Value) -> EspejoResult<()> {
        self.context = context;
        self.root_element = Some(el.clone());
        self.instances.clear();
        let root = match self.root.take() {
            Some(old) => self.update_element(old, el)?,
            None => self.mount_element(el)?,
        };
        self.root = Some(root);
        Ok(())
    }

    /// Root of the committed instance graph
    #[must_use]
    pub fn root(&self) -> Option<&ClassicInstance> {
        self.root.as_ref()
    }

    /// Dispatch a simulated native event against a host handle.
    ///
    /// A missing handler prop is a silent no-op: the event bubbled to
    /// nothing. Resulting state updates are committed before returning
    /// unless a batch is open.
    pub fn dispatch(&mut self, handle: &HostHandle, prop: &str, args: &[Value]) -> EspejoResult<()> {
        let handler = handle.borrow().props.handler(prop);
        if let Some(handler) = handler {
            handler(args);
        }
        if !self.in_batch {
            self.flush()?;
        }
        Ok(())
    }

    /// Run `f` inside the engine's update-batching boundary: state updates
    /// made during `f` commit together when the batch closes.
    pub fn batched_updates(&mut self, f: Box<dyn FnOnce() + '_>) -> EspejoResult<()> {
        self.in_batch = true;
        f();
        self.in_batch = false;
        self.flush()
    }

    /// Tear down the root and release the mount target
    pub fn unmount(&mut self) {
        self.root = None;
        self.root_element = None;
        self.instances.clear();
        target::release(&self.target);
    }

    /// Commit pending state updates by re-rendering the root in place
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

    fn mount_child(&mut self, value: &ElementValue) -> EspejoResult<ClassicChild> {
        match value {
            ElementValue::Literal(literal) => Ok(ClassicChild::Literal(literal.clone())),
            ElementValue::Element(el) => Ok(ClassicChild::Instance(self.mount_element(el)?)),
        }
    }

    fn mount_element(&mut self, el: &Element) -> EspejoResult<ClassicInstance> {
        match &el.element_type {
            ElementType::Host(tag) => self.mount_host(tag, el),
            ElementType::Composite(def) => {
                let def = Rc::clone(def);
                self.mount_composite(&def, el)
            }
            ElementType::Fragment => Err(EspejoError::engine(
                "fragment elements are not supported by this engine generation",
            )),
        }
    }

    fn mount_host(&mut self, tag: &str, el: &Element) -> EspejoResult<ClassicInstance> {
        let handle = HostInstance::create(tag, el.props.clone());
        let children = el.props.child_values();
        let rendered_children = if children.is_empty() || is_single_literal(&children) {
            // Content optimization: a lone literal child is committed as
            // host content, not as a child node of its own.
            None
        } else {
            let mut mounted = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                mounted.push((format!(".{index}"), self.mount_child(child)?));
            }
            Some(mounted)
        };
        Ok(ClassicInstance {
            current_element: Some(ElementValue::Element(el.clone())),
            rendered_children,
            rendered_component: None,
            host_handle: Some(handle),
            composite_kind: None,
            instance: None,
        })
    }

    fn mount_composite(
        &mut self,
        def: &Rc<ComponentDef>,
        el: &Element,
    ) -> EspejoResult<ClassicInstance> {
        let (kind, handle) = match def.kind() {
            DefKind::Stateful => (CompositeKind::Stateful, Some(InstanceHandle::new(def))),
            DefKind::Stateless => (CompositeKind::Stateless, None),
        };
        if let Some(handle) = &handle {
            self.instances.push(handle.clone());
        }
        let output = self.invoke_render(def, &el.props, handle.as_ref());
        let rendered = self.mount_output(output.as_ref())?;
        Ok(ClassicInstance {
            current_element: Some(ElementValue::Element(el.clone())),
            rendered_children: None,
            rendered_component: Some(Box::new(rendered)),
            host_handle: None,
            composite_kind: Some(kind),
            instance: handle,
        })
    }

    /// Mount the output of one composite render step
    fn mount_output(&mut self, output: Option<&ElementValue>) -> EspejoResult<ClassicInstance> {
        match output {
            None => Ok(ClassicInstance::default()),
            Some(ElementValue::Literal(literal)) => Ok(ClassicInstance {
                current_element: Some(ElementValue::Literal(literal.clone())),
                ..ClassicInstance::default()
            }),
            Some(ElementValue::Element(el)) => self.mount_element(el),
        }
    }

    fn invoke_render(
        &self,
        def: &Rc<ComponentDef>,
        props: &Props,
        handle: Option<&InstanceHandle>,
    ) -> Option<ElementValue> {
        let state = handle.map_or(Value::Null, InstanceHandle::state);
        let scope = RenderScope::new(props, state, self.context.clone(), handle.cloned());
        def.render(&scope)
    }

    fn update_child(
        &mut self,
        old: ClassicChild,
        new: &ElementValue,
    ) -> EspejoResult<ClassicChild> {
        match (old, new) {
            (ClassicChild::Literal(_), ElementValue::Literal(literal)) => {
                Ok(ClassicChild::Literal(literal.clone()))
            }
            (ClassicChild::Instance(old_inst), ElementValue::Element(el))
                if element_type_matches(&old_inst, &el.element_type) =>
            {
                Ok(ClassicChild::Instance(self.update_element(old_inst, el)?))
            }
            (_, value) => self.mount_child(value),
        }
    }

    fn update_element(
        &mut self,
        old: ClassicInstance,
        new: &Element,
    ) -> EspejoResult<ClassicInstance> {
        if !element_type_matches(&old, &new.element_type) {
            // Type changed: the old subtree unmounts wholesale.
            return self.mount_element(new);
        }
        match &new.element_type {
            ElementType::Host(_) => self.update_host(old, new),
            ElementType::Composite(def) => {
                let def = Rc::clone(def);
                self.update_composite(old, &def, new)
            }
            ElementType::Fragment => Err(EspejoError::engine(
                "fragment elements are not supported by this engine generation",
            )),
        }
    }

    fn update_host(&mut self, old: ClassicInstance, new: &Element) -> EspejoResult<ClassicInstance> {
        let handle = old.host_handle.clone();
        if let Some(handle) = &handle {
            handle.borrow_mut().props = new.props.clone();
        }
        let children = new.props.child_values();
        let rendered_children = if children.is_empty() || is_single_literal(&children) {
            None
        } else {
            let mut old_children: Vec<ClassicChild> = old
                .rendered_children
                .map(|entries| entries.into_iter().map(|(_, child)| child).collect())
                .unwrap_or_default();
            let mut updated = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                let next = if index < old_children.len() {
                    let old_child = old_children.remove(0);
                    self.update_child(old_child, child)?
                } else {
                    self.mount_child(child)?
                };
                updated.push((format!(".{index}"), next));
            }
            Some(updated)
        };
        Ok(ClassicInstance {
            current_element: Some(ElementValue::Element(new.clone())),
            rendered_children,
            rendered_component: None,
            host_handle: handle,
            composite_kind: None,
            instance: None,
        })
    }

    fn update_composite(
        &mut self,
        old: ClassicInstance,
        def: &Rc<ComponentDef>,
        new: &Element,
    ) -> EspejoResult<ClassicInstance> {
        // Same composite type: the backing instance (and its state) survive
        // the update, matching the engine's own state-preservation rule.
        let handle = old.instance.clone();
        if let Some(handle) = &handle {
            self.instances.push(handle.clone());
        }
        let output = self.invoke_render(def, &new.props, handle.as_ref());
        let rendered = match (old.rendered_component, output.as_ref()) {
            (Some(old_rendered), Some(ElementValue::Element(el)))
                if element_type_matches(&old_rendered, &el.element_type) =>
            {
                self.update_element(*old_rendered, el)?
            }
            (_, output) => self.mount_output(output)?,
        };
        Ok(ClassicInstance {
            current_element: Some(ElementValue::Element(new.clone())),
            rendered_children: None,
            rendered_component: Some(Box::new(rendered)),
            host_handle: None,
            composite_kind: old.composite_kind,
            instance: handle,
        })
    }
}

impl Drop for ClassicEngine {
    fn drop(&mut self) {
        target::release(&self.target);
    }
}

fn is_single_literal(children: &[ElementValue]) -> bool {
    matches!(children, [ElementValue::Literal(_)])
}

fn element_type_matches(inst: &ClassicInstance, element_type: &ElementType) -> bool {
    match &inst.current_element {
        Some(ElementValue::Element(el)) => el.element_type == *element_type,
        _ => false,
    }
}
