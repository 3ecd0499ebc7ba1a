//! Element descriptions: the *input* tree shape.
//!
//! An [`Element`] is a `type` + `props` pair describing intended UI. It is
//! what callers pass to `render`, and what shallow rendering re-uses to
//! represent children that are deliberately left unexpanded. It carries no
//! `rendered` field: that belongs to the observed [`crate::RstNode`] shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::component::{ComponentDef, EventHandler};

/// A literal leaf: plain strings and numbers appear directly wherever a
/// child is expected, never wrapped in a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Text literal
    Text(String),
    /// Numeric literal
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The `type` of an element or RST node.
///
/// Identity-comparable: host types compare by tag, composite types by
/// definition pointer identity.
#[derive(Clone)]
pub enum ElementType {
    /// Primitive tag rendered by the host engine (a markup element name)
    Host(String),
    /// User-defined composite component
    Composite(Rc<ComponentDef>),
    /// Transparent grouping node: contributes its children, never itself.
    /// Only linked-graph engines understand this type.
    Fragment,
}

impl ElementType {
    /// Host tag constructor
    #[must_use]
    pub fn host(tag: impl Into<String>) -> Self {
        Self::Host(tag.into())
    }

    /// Composite constructor
    #[must_use]
    pub fn composite(def: &Rc<ComponentDef>) -> Self {
        Self::Composite(Rc::clone(def))
    }

    /// Display name of the type (tag or component name)
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Host(tag) => tag,
            Self::Composite(def) => def.name(),
            Self::Fragment => "Fragment",
        }
    }

    /// Whether this is a host primitive tag
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Composite(a), Self::Composite(b)) => Rc::ptr_eq(a, b),
            (Self::Fragment, Self::Fragment) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(tag) => write!(f, "Host({tag:?})"),
            Self::Composite(def) => write!(f, "Composite({:?})", def.name()),
            Self::Fragment => f.write_str("Fragment"),
        }
    }
}

/// One value in a props map
#[derive(Clone)]
pub enum PropValue {
    /// Plain data value
    Data(Value),
    /// Event handler
    Handler(EventHandler),
    /// A single child description (element or literal)
    Node(Box<ElementValue>),
    /// A sequence of child descriptions
    Nodes(Vec<ElementValue>),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Handler(a), Self::Handler(b)) => Rc::ptr_eq(a, b),
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::Nodes(a), Self::Nodes(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(value) => write!(f, "{value:?}"),
            Self::Handler(_) => f.write_str("<handler>"),
            Self::Node(node) => write!(f, "{node:?}"),
            Self::Nodes(nodes) => write!(f, "{nodes:?}"),
        }
    }
}

/// Reserved key under which the raw child description lives
pub const CHILDREN_PROP: &str = "children";

/// Ordered props map, exactly as supplied to the component.
///
/// Insertion order is preserved; the reserved `children` key holds the raw,
/// unprocessed child description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: Vec<(String, PropValue)>,
}

impl Props {
    /// Create an empty props map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prop, replacing any existing entry with the same key
    pub fn insert(&mut self, key: impl Into<String>, value: PropValue) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Builder form: set a plain data prop
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, PropValue::Data(value.into()));
        self
    }

    /// Builder form: set an event handler prop
    #[must_use]
    pub fn with_handler(mut self, key: impl Into<String>, handler: impl Fn(&[Value]) + 'static) -> Self {
        self.insert(key, PropValue::Handler(Rc::new(handler)));
        self
    }

    /// Builder form: set a single child under the reserved `children` key
    #[must_use]
    pub fn with_child(mut self, child: ElementValue) -> Self {
        self.insert(CHILDREN_PROP, PropValue::Node(Box::new(child)));
        self
    }

    /// Builder form: set a child sequence under the reserved `children` key
    #[must_use]
    pub fn with_children(mut self, children: Vec<ElementValue>) -> Self {
        self.insert(CHILDREN_PROP, PropValue::Nodes(children));
        self
    }

    /// Look up a prop by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Look up a plain data prop by key
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&Value> {
        match self.get(key) {
            Some(PropValue::Data(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up an event handler prop by key
    #[must_use]
    pub fn handler(&self, key: &str) -> Option<EventHandler> {
        match self.get(key) {
            Some(PropValue::Handler(handler)) => Some(Rc::clone(handler)),
            _ => None,
        }
    }

    /// The raw child description, if any
    #[must_use]
    pub fn children(&self) -> Option<&PropValue> {
        self.get(CHILDREN_PROP)
    }

    /// Child descriptions as a flat sequence (empty when there are none)
    #[must_use]
    pub fn child_values(&self) -> Vec<ElementValue> {
        match self.children() {
            Some(PropValue::Node(child)) => vec![(**child).clone()],
            Some(PropValue::Nodes(children)) => children.clone(),
            Some(PropValue::Data(Value::String(text))) => {
                vec![ElementValue::text(text.clone())]
            }
            Some(PropValue::Data(Value::Number(n))) => n
                .as_f64()
                .map(|n| vec![ElementValue::Literal(Literal::Number(n))])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of props
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of these props with the reserved `children` key removed
    #[must_use]
    pub fn without_children(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != CHILDREN_PROP)
                .cloned()
                .collect(),
        }
    }
}

/// An element description or a literal leaf: the two shapes a child
/// description (or a composite render result) can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// A full element description
    Element(Element),
    /// A literal leaf
    Literal(Literal),
}

impl ElementValue {
    /// Text literal constructor
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Literal(Literal::Text(text.into()))
    }

    /// Numeric literal constructor
    #[must_use]
    pub fn number(n: f64) -> Self {
        Self::Literal(Literal::Number(n))
    }

    /// The element, if this value is one
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Literal(_) => None,
        }
    }
}

impl From<Element> for ElementValue {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// An unrendered `type` + `props` description of intended UI
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element type (host tag, composite definition, or fragment)
    pub element_type: ElementType,
    /// Props as supplied, including the reserved `children` key
    pub props: Props,
}

impl Element {
    /// Describe a host primitive
    #[must_use]
    pub fn host(tag: impl Into<String>, props: Props) -> Self {
        Self {
            element_type: ElementType::host(tag),
            props,
        }
    }

    /// Describe a composite component
    #[must_use]
    pub fn composite(def: &Rc<ComponentDef>, props: Props) -> Self {
        Self {
            element_type: ElementType::composite(def),
            props,
        }
    }

    /// Describe a transparent grouping of children
    #[must_use]
    pub fn fragment(children: Vec<ElementValue>) -> Self {
        Self {
            element_type: ElementType::Fragment,
            props: Props::new().with_children(children),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod props_tests {
        use super::*;

        #[test]
        fn test_insertion_order_preserved() {
            let props = Props::new().with("b", 1).with("a", 2).with("c", 3);
            let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, vec!["b", "a", "c"]);
        }

        #[test]
        fn test_insert_replaces_in_place() {
            let props = Props::new().with("a", 1).with("b", 2).with("a", 9);
            assert_eq!(props.len(), 2);
            assert_eq!(props.data("a"), Some(&json!(9)));
            let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, vec!["a", "b"]);
        }

        #[test]
        fn test_children_helpers() {
            let props = Props::new().with_child(ElementValue::text("hi"));
            assert_eq!(props.child_values(), vec![ElementValue::text("hi")]);

            let props = Props::new()
                .with_children(vec![ElementValue::text("a"), ElementValue::number(2.0)]);
            assert_eq!(props.child_values().len(), 2);

            assert!(Props::new().child_values().is_empty());
        }

        #[test]
        fn test_data_children_become_literals() {
            let props = Props::new().with(CHILDREN_PROP, "plain");
            assert_eq!(props.child_values(), vec![ElementValue::text("plain")]);
        }

        #[test]
        fn test_without_children() {
            let props = Props::new()
                .with("className", "Qoo")
                .with_child(ElementValue::text("x"));
            let stripped = props.without_children();
            assert!(stripped.children().is_none());
            assert_eq!(stripped.data("className"), Some(&json!("Qoo")));
        }

        #[test]
        fn test_handler_lookup() {
            let props = Props::new().with_handler("onClick", |_| {});
            assert!(props.handler("onClick").is_some());
            assert!(props.handler("onChange").is_none());
        }
    }

    mod element_type_tests {
        use super::*;
        use crate::component::ComponentDef;

        #[test]
        fn test_host_equality_by_tag() {
            assert_eq!(ElementType::host("div"), ElementType::host("div"));
            assert_ne!(ElementType::host("div"), ElementType::host("span"));
        }

        #[test]
        fn test_composite_equality_by_identity() {
            let a = ComponentDef::stateless("Same", |_| None);
            let b = ComponentDef::stateless("Same", |_| None);
            assert_eq!(ElementType::composite(&a), ElementType::composite(&a));
            assert_ne!(ElementType::composite(&a), ElementType::composite(&b));
            assert_ne!(ElementType::composite(&a), ElementType::host("div"));
        }

        #[test]
        fn test_names() {
            let def = ComponentDef::stateless("Foo", |_| None);
            assert_eq!(ElementType::host("div").name(), "div");
            assert_eq!(ElementType::composite(&def).name(), "Foo");
            assert_eq!(ElementType::Fragment.name(), "Fragment");
        }
    }

    mod literal_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(Literal::Text("hi".into()).to_string(), "hi");
            assert_eq!(Literal::Number(3.0).to_string(), "3");
            assert_eq!(Literal::Number(2.5).to_string(), "2.5");
        }
    }
}
