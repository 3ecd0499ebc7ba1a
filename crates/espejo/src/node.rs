//! The Rendered Structure Tree (RST): the normalized, engine-version
//! independent shape every adapter produces.
//!
//! An RST snapshot is always a finite, acyclic tree reflecting the last
//! completed render pass. `instance` fields are weak references: the tree
//! observes live engine objects but never extends their lifetime.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::component::ComponentInstance;
use crate::element::{Element, ElementType, Literal, Props};
use crate::engine::target::{HostHandle, WeakHostHandle};

/// Classification of an RST node, a pure function of its type's shape:
/// a primitive tag is `Host`, a definition with a backing instance model is
/// `Class`, a definition without one is `Function`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Primitive/native rendering target
    Host,
    /// Stateful component instance
    Class,
    /// Stateless component
    Function,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Class => "class",
            Self::Function => "function",
        })
    }
}

/// Non-owning back-reference to the live object behind a node
#[derive(Clone)]
pub enum InstanceRef {
    /// Backing instance of a class component
    Component(Weak<RefCell<ComponentInstance>>),
    /// Handle of a host-rendered primitive
    Host(WeakHostHandle),
}

impl InstanceRef {
    /// Whether the engine still holds the referenced object
    #[must_use]
    pub fn is_live(&self) -> bool {
        match self {
            Self::Component(weak) => weak.strong_count() > 0,
            Self::Host(weak) => weak.strong_count() > 0,
        }
    }

    /// Upgrade to the component instance, if this references one and it is
    /// still alive
    #[must_use]
    pub fn as_component(&self) -> Option<Rc<RefCell<ComponentInstance>>> {
        match self {
            Self::Component(weak) => weak.upgrade(),
            Self::Host(_) => None,
        }
    }

    /// Upgrade to the host handle, if this references one and it is still
    /// alive
    #[must_use]
    pub fn as_host(&self) -> Option<HostHandle> {
        match self {
            Self::Host(weak) => weak.upgrade(),
            Self::Component(_) => None,
        }
    }
}

impl PartialEq for InstanceRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Component(a), Self::Component(b)) => a.ptr_eq(b),
            (Self::Host(a), Self::Host(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(_) => f.write_str("InstanceRef::Component"),
            Self::Host(_) => f.write_str("InstanceRef::Host"),
        }
    }
}

/// The result of a node's own render step
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Rendered {
    /// Rendered nothing
    #[default]
    None,
    /// A single child (composite render results)
    One(Box<RstValue>),
    /// A flat child sequence (host children, spliced grouping runs)
    Many(Vec<RstValue>),
}

impl Rendered {
    /// Collapse a flat sequence: zero children is `None`, one child is that
    /// child unwrapped, two or more stay a sequence
    #[must_use]
    pub fn from_values(mut values: Vec<RstValue>) -> Self {
        match values.len() {
            0 => Self::None,
            1 => Self::One(Box::new(values.remove(0))),
            _ => Self::Many(values),
        }
    }

    /// The single rendered value, if there is exactly one
    #[must_use]
    pub fn as_one(&self) -> Option<&RstValue> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    /// The rendered sequence, if this is one
    #[must_use]
    pub fn as_many(&self) -> Option<&[RstValue]> {
        match self {
            Self::Many(values) => Some(values),
            _ => None,
        }
    }

    /// Whether the node rendered nothing
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A point in a rendered tree: either a literal leaf or a full node
#[derive(Debug, Clone, PartialEq)]
pub enum RstValue {
    /// Literal leaf, never wrapped in a node
    Literal(Literal),
    /// Full RST node
    Node(RstNode),
}

impl RstValue {
    /// The node, if this value is one
    #[must_use]
    pub const fn as_node(&self) -> Option<&RstNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Literal(_) => None,
        }
    }

    /// The literal, if this value is one
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Node(_) => None,
        }
    }
}

/// One normalized point in a rendered tree
#[derive(Debug, Clone, PartialEq)]
pub struct RstNode {
    /// Classification of this node
    pub node_type: NodeType,
    /// Identity-comparable type reference
    pub element_type: ElementType,
    /// Props exactly as supplied, including the raw `children` description
    pub props: Props,
    /// Weak back-reference to the live backing object, when one exists
    pub instance: Option<InstanceRef>,
    /// Result of this node's last completed render step
    pub rendered: Rendered,
}

impl RstNode {
    /// Re-derive the Element Description this node was rendered from
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element {
            element_type: self.element_type.clone(),
            props: self.props.clone(),
        }
    }

    /// Structural copy with `instance` fields and raw `children` props
    /// removed, recursively.
    ///
    /// This is the comparison form for the cross-version contract: two
    /// adapters normalizing equivalent trees must produce equal cleaned
    /// nodes.
    #[must_use]
    pub fn cleaned(&self) -> Self {
        Self {
            node_type: self.node_type,
            element_type: self.element_type.clone(),
            props: self.props.without_children(),
            instance: None,
            rendered: match &self.rendered {
                Rendered::None => Rendered::None,
                Rendered::One(value) => Rendered::One(Box::new(clean_value(value))),
                Rendered::Many(values) => {
                    Rendered::Many(values.iter().map(clean_value).collect())
                }
            },
        }
    }
}

fn clean_value(value: &RstValue) -> RstValue {
    match value {
        RstValue::Literal(literal) => RstValue::Literal(literal.clone()),
        RstValue::Node(node) => RstValue::Node(node.cleaned()),
    }
}

/// Shorthand for building an expected node in assertions
#[must_use]
pub fn node(
    node_type: NodeType,
    element_type: ElementType,
    props: Props,
    rendered: Rendered,
) -> RstNode {
    RstNode {
        node_type,
        element_type,
        props,
        instance: None,
        rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentDef, InstanceHandle};
    use crate::element::ElementValue;
    use serde_json::json;

    mod rendered_tests {
        use super::*;

        #[test]
        fn test_from_values_collapse() {
            assert_eq!(Rendered::from_values(vec![]), Rendered::None);

            let one = Rendered::from_values(vec![RstValue::Literal(Literal::Text("x".into()))]);
            assert!(one.as_one().is_some());

            let many = Rendered::from_values(vec![
                RstValue::Literal(Literal::Text("a".into())),
                RstValue::Literal(Literal::Text("b".into())),
            ]);
            assert_eq!(many.as_many().map(<[RstValue]>::len), Some(2));
        }
    }

    mod cleaned_tests {
        use super::*;

        #[test]
        fn test_cleaned_strips_instance_and_children() {
            let def = ComponentDef::stateful("Foo", json!({}), |_| None);
            let handle = InstanceHandle::new(&def);
            let tree = RstNode {
                node_type: NodeType::Class,
                element_type: ElementType::composite(&def),
                props: Props::new()
                    .with("special", true)
                    .with_child(ElementValue::text("raw")),
                instance: Some(InstanceRef::Component(handle.downgrade())),
                rendered: Rendered::One(Box::new(RstValue::Node(node(
                    NodeType::Host,
                    ElementType::host("span"),
                    Props::new().with_child(ElementValue::text("raw")),
                    Rendered::Many(vec![RstValue::Literal(Literal::Text("raw".into()))]),
                )))),
            };

            let cleaned = tree.cleaned();
            assert!(cleaned.instance.is_none());
            assert!(cleaned.props.children().is_none());
            assert_eq!(cleaned.props.data("special"), Some(&json!(true)));
            let inner = cleaned.rendered.as_one().unwrap().as_node().unwrap();
            assert!(inner.props.children().is_none());
            assert_eq!(
                inner.rendered,
                Rendered::Many(vec![RstValue::Literal(Literal::Text("raw".into()))])
            );
        }

        #[test]
        fn test_instance_ref_liveness() {
            let def = ComponentDef::stateful("Foo", json!({}), |_| None);
            let handle = InstanceHandle::new(&def);
            let reference = InstanceRef::Component(handle.downgrade());
            assert!(reference.is_live());
            assert!(reference.as_component().is_some());
            drop(handle);
            assert!(!reference.is_live());
            assert!(reference.as_component().is_none());
        }
    }
}
