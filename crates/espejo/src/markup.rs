//! Static markup serialization.
//!
//! Backs the string-mode renderer: one synchronous pass from an element
//! description to a markup string, with no mounted tree left behind.
//! Composite components are rendered with a fresh instance at its initial
//! state; handler props and element-valued props never serialize.

use serde_json::Value;
use std::fmt::Write;

use crate::component::{DefKind, InstanceHandle, RenderScope};
use crate::element::{Element, ElementType, ElementValue, Literal, PropValue, CHILDREN_PROP};
use crate::result::EspejoResult;

/// Host tags that never carry children and self-close
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Prop keys whose markup attribute name differs
const ATTRIBUTE_ALIASES: &[(&str, &str)] = &[("className", "class"), ("htmlFor", "for")];

/// Render an element description to static markup.
///
/// Fragments contribute their children with no wrapper; composites that
/// render nothing contribute the empty string.
pub fn render_to_static_markup(el: &Element, context: &Value) -> EspejoResult<String> {
    let mut out = String::new();
    write_element(&mut out, el, context)?;
    Ok(out)
}

fn write_element(out: &mut String, el: &Element, context: &Value) -> EspejoResult<()> {
    match &el.element_type {
        ElementType::Host(tag) => write_host(out, tag, el, context),
        ElementType::Composite(def) => {
            let handle = match def.kind() {
                DefKind::Stateful => Some(InstanceHandle::new(def)),
                DefKind::Stateless => None,
            };
            let state = handle.as_ref().map_or(Value::Null, InstanceHandle::state);
            let scope = RenderScope::new(&el.props, state, context.clone(), handle);
            match def.render(&scope) {
                Some(output) => write_value(out, &output, context),
                None => Ok(()),
            }
        }
        ElementType::Fragment => {
            for child in el.props.child_values() {
                write_value(out, &child, context)?;
            }
            Ok(())
        }
    }
}

fn write_value(out: &mut String, value: &ElementValue, context: &Value) -> EspejoResult<()> {
    match value {
        ElementValue::Element(el) => write_element(out, el, context),
        ElementValue::Literal(literal) => {
            write_literal(out, literal);
            Ok(())
        }
    }
}

fn write_host(out: &mut String, tag: &str, el: &Element, context: &Value) -> EspejoResult<()> {
    out.push('<');
    out.push_str(tag);
    for (key, value) in el.props.iter() {
        if key == CHILDREN_PROP {
            continue;
        }
        if let PropValue::Data(data) = value {
            write_attribute(out, key, data);
        }
    }

    if VOID_TAGS.contains(&tag) {
        out.push_str("/>");
        return Ok(());
    }
    out.push('>');
    for child in el.props.child_values() {
        write_value(out, &child, context)?;
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
    Ok(())
}

fn write_attribute(out: &mut String, key: &str, value: &Value) {
    let name = ATTRIBUTE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, name)| name);
    match value {
        Value::Null => {}
        Value::String(text) => {
            let _ = write!(out, " {name}=\"{}\"", escape(text));
        }
        Value::Number(n) => {
            let _ = write!(out, " {name}=\"{n}\"");
        }
        Value::Bool(b) => {
            let _ = write!(out, " {name}=\"{b}\"");
        }
        Value::Array(_) | Value::Object(_) => {}
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Text(text) => out.push_str(&escape(text)),
        Literal::Number(n) => {
            let _ = write!(out, "{}", Literal::Number(*n));
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentDef;
    use crate::element::Props;
    use serde_json::json;

    mod host_tests {
        use super::*;

        #[test]
        fn test_host_with_text_child() {
            let el = Element::host(
                "span",
                Props::new()
                    .with("className", "Qoo")
                    .with_child(ElementValue::text("Hello World!")),
            );
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<span class=\"Qoo\">Hello World!</span>"
            );
        }

        #[test]
        fn test_attribute_aliases_and_skipped_values() {
            let el = Element::host(
                "label",
                Props::new()
                    .with("htmlFor", "name")
                    .with("data-count", 3)
                    .with("hidden", json!(null))
                    .with_handler("onClick", |_| {}),
            );
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<label for=\"name\" data-count=\"3\"></label>"
            );
        }

        #[test]
        fn test_void_tag_self_closes() {
            let el = Element::host("input", Props::new().with("type", "text"));
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<input type=\"text\"/>"
            );
        }

        #[test]
        fn test_text_is_escaped() {
            let el = Element::host(
                "span",
                Props::new().with_child(ElementValue::text("a < b & c")),
            );
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<span>a &lt; b &amp; c</span>"
            );
        }
    }

    mod composite_tests {
        use super::*;

        #[test]
        fn test_composite_renders_through() {
            let inner = ComponentDef::stateless("Inner", |_| {
                Some(ElementValue::Element(Element::host(
                    "em",
                    Props::new().with_child(ElementValue::text("deep")),
                )))
            });
            let outer = {
                let inner = std::rc::Rc::clone(&inner);
                ComponentDef::stateless("Outer", move |_| {
                    Some(ElementValue::Element(Element::host(
                        "div",
                        Props::new().with_child(ElementValue::Element(Element::composite(
                            &inner,
                            Props::new(),
                        ))),
                    )))
                })
            };
            let el = Element::composite(&outer, Props::new());
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<div><em>deep</em></div>"
            );
        }

        #[test]
        fn test_stateful_composite_uses_initial_state() {
            let def = ComponentDef::stateful("Counter", json!({ "count": 7 }), |scope| {
                Some(ElementValue::Element(Element::host(
                    "button",
                    Props::new().with_child(ElementValue::number(
                        scope.state()["count"].as_f64().unwrap_or(0.0),
                    )),
                )))
            });
            let el = Element::composite(&def, Props::new());
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<button>7</button>"
            );
        }

        #[test]
        fn test_null_render_is_empty_string() {
            let def = ComponentDef::stateless("Empty", |_| None);
            let el = Element::composite(&def, Props::new());
            assert_eq!(render_to_static_markup(&el, &Value::Null).unwrap(), "");
        }
    }

    mod fragment_tests {
        use super::*;

        #[test]
        fn test_fragment_concatenates_children() {
            let el = Element::fragment(vec![
                ElementValue::Element(Element::host("li", Props::new())),
                ElementValue::Element(Element::host("li", Props::new())),
            ]);
            assert_eq!(
                render_to_static_markup(&el, &Value::Null).unwrap(),
                "<li></li><li></li>"
            );
        }
    }
}
