//! Component definitions and backing instances.
//!
//! A `ComponentDef` is the engine-independent description of a composite
//! component: a name, a statefulness marker, and a render closure. Both host
//! engines instantiate stateful defs into `ComponentInstance`s; the RST holds
//! only weak references to those instances, so engine teardown is never
//! extended by an outstanding snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::element::{ElementValue, Props};

/// Event handler stored in props and invoked by the event bridge
pub type EventHandler = Rc<dyn Fn(&[Value])>;

/// Render closure of a composite component
pub type RenderFn = Rc<dyn Fn(&RenderScope<'_>) -> Option<ElementValue>>;

/// Whether a composite definition carries a backing instance model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefKind {
    /// Class-like component with a backing instance and local state
    Stateful,
    /// Plain function component with no instance
    Stateless,
}

/// A composite component definition.
///
/// Definitions are identity-compared: two elements refer to the "same"
/// component exactly when they hold the same `Rc<ComponentDef>`.
pub struct ComponentDef {
    name: String,
    kind: DefKind,
    initial_state: Value,
    render: RenderFn,
}

impl ComponentDef {
    /// Create a stateless (function) component definition
    pub fn stateless(
        name: impl Into<String>,
        render: impl Fn(&RenderScope<'_>) -> Option<ElementValue> + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            kind: DefKind::Stateless,
            initial_state: Value::Null,
            render: Rc::new(render),
        })
    }

    /// Create a stateful (class-like) component definition
    pub fn stateful(
        name: impl Into<String>,
        initial_state: Value,
        render: impl Fn(&RenderScope<'_>) -> Option<ElementValue> + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            kind: DefKind::Stateful,
            initial_state,
            render: Rc::new(render),
        })
    }

    /// Component display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statefulness of this definition
    #[must_use]
    pub const fn kind(&self) -> DefKind {
        self.kind
    }

    /// State a fresh instance starts with
    #[must_use]
    pub const fn initial_state(&self) -> &Value {
        &self.initial_state
    }

    /// Invoke the render closure with the given scope
    pub fn render(&self, scope: &RenderScope<'_>) -> Option<ElementValue> {
        (self.render)(scope)
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Live backing object for a mounted stateful component.
///
/// Owned by the host engine's internal graph; everything outside the engine
/// observes it through an [`InstanceHandle`] or a weak reference.
#[derive(Debug)]
pub struct ComponentInstance {
    def: Rc<ComponentDef>,
    state: Value,
    dirty: bool,
}

impl ComponentInstance {
    /// Definition this instance was created from
    #[must_use]
    pub fn def(&self) -> &Rc<ComponentDef> {
        &self.def
    }

    /// Current component state
    #[must_use]
    pub const fn state(&self) -> &Value {
        &self.state
    }
}

/// Shared handle to a [`ComponentInstance`].
///
/// Render closures of stateful components receive one through their scope so
/// handler props can capture it and call [`InstanceHandle::set_state`].
#[derive(Clone)]
pub struct InstanceHandle {
    inner: Rc<RefCell<ComponentInstance>>,
}

impl InstanceHandle {
    /// Instantiate a definition with its initial state
    #[must_use]
    pub fn new(def: &Rc<ComponentDef>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComponentInstance {
                def: Rc::clone(def),
                state: def.initial_state().clone(),
                dirty: false,
            })),
        }
    }

    /// Definition backing this instance
    #[must_use]
    pub fn def(&self) -> Rc<ComponentDef> {
        Rc::clone(self.inner.borrow().def())
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> Value {
        self.inner.borrow().state.clone()
    }

    /// Merge a patch into the state and mark the instance dirty.
    ///
    /// Object patches are shallow-merged key by key; any other value replaces
    /// the state wholesale. The owning engine commits the update at its next
    /// flush boundary.
    pub fn set_state(&self, patch: Value) {
        let mut inst = self.inner.borrow_mut();
        match (&mut inst.state, patch) {
            (Value::Object(state), Value::Object(patch)) => {
                for (key, value) in patch {
                    state.insert(key, value);
                }
            }
            (state, patch) => *state = patch,
        }
        inst.dirty = true;
    }

    /// Whether an uncommitted state update is pending
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty
    }

    /// Clear the pending-update mark after a commit
    pub(crate) fn clear_dirty(&self) {
        self.inner.borrow_mut().dirty = false;
    }

    /// Non-owning reference for RST `instance` fields
    #[must_use]
    pub fn downgrade(&self) -> Weak<RefCell<ComponentInstance>> {
        Rc::downgrade(&self.inner)
    }

    /// Identity comparison with another handle
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("def", &self.inner.borrow().def().name())
            .field("dirty", &self.inner.borrow().dirty)
            .finish()
    }
}

/// Everything a render closure may observe: props, state, ambient context,
/// and (for stateful components) the handle of the instance being rendered.
#[derive(Debug)]
pub struct RenderScope<'a> {
    props: &'a Props,
    state: Value,
    context: Value,
    handle: Option<InstanceHandle>,
}

impl<'a> RenderScope<'a> {
    /// Build a scope for one render invocation
    #[must_use]
    pub fn new(
        props: &'a Props,
        state: Value,
        context: Value,
        handle: Option<InstanceHandle>,
    ) -> Self {
        Self {
            props,
            state,
            context,
            handle,
        }
    }

    /// Props supplied to the component
    #[must_use]
    pub const fn props(&self) -> &Props {
        self.props
    }

    /// Component state at the start of the render pass
    #[must_use]
    pub const fn state(&self) -> &Value {
        &self.state
    }

    /// Ambient context threaded through the render call
    #[must_use]
    pub const fn context(&self) -> &Value {
        &self.context
    }

    /// Handle of the instance being rendered, for handler props to capture
    #[must_use]
    pub fn handle(&self) -> Option<InstanceHandle> {
        self.handle.clone()
    }
}
