//! Concrete version adapters, one per supported host-engine generation.
//!
//! The tests here pin the cross-version contract: both normalizers must
//! produce structurally equal trees (ignoring `instance` identity) for
//! equivalent inputs, and for host-only trees the purely structural
//! conversion must agree with a full mount.

pub mod classic;
pub mod fiber;

pub use classic::ClassicAdapter;
pub use fiber::FiberAdapter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{element_to_tree, Adapter, RendererMode, RendererOptions};
    use crate::component::ComponentDef;
    use crate::element::{Element, ElementValue, Props};
    use crate::node::{RstNode, RstValue};
    use proptest::prelude::*;
    use serde_json::json;
    use std::rc::Rc;

    fn mount_with(adapter: &dyn Adapter, el: &Element) -> RstNode {
        let mut renderer = adapter
            .create_renderer(RendererOptions::new(RendererMode::Mount))
            .unwrap();
        renderer.render(el).unwrap();
        let node = renderer.get_node().unwrap();
        renderer.unmount().unwrap();
        node
    }

    /// A four-level tree mixing class, function, and host nodes
    fn nested_scenario() -> Element {
        let qoo = ComponentDef::stateless("Qoo", |_| {
            Some(ElementValue::Element(Element::host(
                "span",
                Props::new()
                    .with("className", "Qoo")
                    .with_child(ElementValue::text("Hello World!")),
            )))
        });
        let foo = {
            let qoo = Rc::clone(&qoo);
            ComponentDef::stateful("Foo", json!({}), move |_| {
                Some(ElementValue::Element(Element::composite(
                    &qoo,
                    Props::new(),
                )))
            })
        };
        let bar = {
            let foo = Rc::clone(&foo);
            ComponentDef::stateful("Bar", json!({}), move |scope| {
                Some(ElementValue::Element(Element::host(
                    "div",
                    Props::new()
                        .with("special", scope.props().data("special").cloned().unwrap_or(json!(false)))
                        .with_children(vec![
                            ElementValue::Element(Element::composite(&foo, Props::new())),
                            ElementValue::text("between"),
                            ElementValue::Element(Element::host("em", Props::new())),
                        ]),
                )))
            })
        };
        let bam = {
            let bar = Rc::clone(&bar);
            ComponentDef::stateful("Bam", json!({}), move |_| {
                Some(ElementValue::Element(Element::composite(
                    &bar,
                    Props::new().with("special", true),
                )))
            })
        };
        Element::composite(&bam, Props::new())
    }

    #[test]
    fn test_generations_normalize_nested_trees_identically() {
        let el = nested_scenario();
        let classic = mount_with(&ClassicAdapter::new(), &el);
        let fiber = mount_with(&FiberAdapter::new(), &el);
        assert_eq!(classic.cleaned(), fiber.cleaned());
    }

    #[test]
    fn test_mount_get_node_is_idempotent() {
        let el = nested_scenario();
        for adapter in [&ClassicAdapter::new() as &dyn Adapter, &FiberAdapter::new()] {
            let mut renderer = adapter
                .create_renderer(RendererOptions::new(RendererMode::Mount))
                .unwrap();
            renderer.render(&el).unwrap();
            assert_eq!(renderer.get_node().unwrap(), renderer.get_node().unwrap());
            renderer.unmount().unwrap();
        }
    }

    #[test]
    fn test_generations_agree_on_content_optimized_hosts() {
        let el = Element::host(
            "p",
            Props::new().with_child(ElementValue::text("just text")),
        );
        let classic = mount_with(&ClassicAdapter::new(), &el);
        let fiber = mount_with(&FiberAdapter::new(), &el);
        assert_eq!(classic.cleaned(), fiber.cleaned());
    }

    fn arb_tag() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["div", "span", "p", "ul", "li"]).prop_map(str::to_owned)
    }

    fn arb_props() -> impl Strategy<Value = Props> {
        prop::collection::vec(("[a-h]{1,6}", "[a-z]{0,6}"), 0..3).prop_map(|entries| {
            entries
                .into_iter()
                .fold(Props::new(), |props, (key, value)| props.with(key, value))
        })
    }

    /// Host-and-literal-only element trees
    fn arb_host_value() -> impl Strategy<Value = ElementValue> {
        let leaf = prop_oneof![
            "[a-z ]{1,10}".prop_map(ElementValue::text),
            (0i32..1000).prop_map(|n| ElementValue::number(f64::from(n))),
            (arb_tag(), arb_props())
                .prop_map(|(tag, props)| ElementValue::Element(Element::host(tag, props))),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            (arb_tag(), arb_props(), prop::collection::vec(inner, 0..4)).prop_map(
                |(tag, props, children)| {
                    let props = if children.is_empty() {
                        props
                    } else {
                        props.with_children(children)
                    };
                    ElementValue::Element(Element::host(tag, props))
                },
            )
        })
    }

    fn arb_host_element() -> impl Strategy<Value = Element> {
        (arb_tag(), arb_props(), prop::collection::vec(arb_host_value(), 0..4)).prop_map(
            |(tag, props, children)| {
                let props = if children.is_empty() {
                    props
                } else {
                    props.with_children(children)
                };
                Element::host(tag, props)
            },
        )
    }

    proptest! {
        /// Structural conversion of a host-only tree matches a full mount
        /// on both engine generations, up to `instance` identity.
        #[test]
        fn test_structural_conversion_matches_mount(el in arb_host_element()) {
            let structural = match element_to_tree(&ElementValue::Element(el.clone())) {
                RstValue::Node(node) => node.cleaned(),
                RstValue::Literal(_) => unreachable!("host roots convert to nodes"),
            };
            let classic = mount_with(&ClassicAdapter::new(), &el).cleaned();
            let fiber = mount_with(&FiberAdapter::new(), &el).cleaned();
            prop_assert_eq!(&structural, &classic);
            prop_assert_eq!(&classic, &fiber);
        }
    }
}
