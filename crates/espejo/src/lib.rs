//! Espejo: Adapter-Based Component-Tree Introspection
//!
//! Espejo (Spanish: "mirror") normalizes the private internals of
//! incompatible host-engine generations into one stable tree shape, the
//! Rendered Structure Tree (RST), that assertion code can walk and diff
//! without knowing which engine rendered it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     ESPEJO Architecture                           │
//! ├───────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐     ┌─────────────┐     ┌──────────────┐         │
//! │   │ Element    │     │ Version     │     │ Host Engine  │         │
//! │   │ Description│────►│ Adapter     │────►│ (instance or │         │
//! │   │            │     │ + Renderer  │     │  fiber graph)│         │
//! │   └────────────┘     └──────┬──────┘     └──────┬───────┘         │
//! │                            │  normalize         │                 │
//! │                            ▼                    │                 │
//! │                     ┌────────────┐   weak refs  │                 │
//! │                     │ RST        │◄─────────────┘                 │
//! │                     │ snapshot   │                                │
//! │                     └────────────┘                                │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pick an adapter for the engine generation under test, ask it for a
//! renderer in one of three modes (`mount`, `shallow`, `string`), drive the
//! session, then call `get_node` for a frozen RST snapshot:
//!
//! ```
//! use espejo::{
//!     Adapter, ClassicAdapter, Element, ElementValue, NodeType, Props, RendererMode,
//!     RendererOptions,
//! };
//! use espejo::ComponentDef;
//!
//! let qoo = ComponentDef::stateless("Qoo", |_| {
//!     Some(ElementValue::Element(Element::host(
//!         "span",
//!         Props::new()
//!             .with("className", "Qoo")
//!             .with_child(ElementValue::text("Fuego!")),
//!     )))
//! });
//!
//! let adapter = ClassicAdapter::new();
//! let mut renderer = adapter
//!     .create_renderer(RendererOptions::new(RendererMode::Mount))
//!     .unwrap();
//! renderer
//!     .render(&Element::composite(&qoo, Props::new()))
//!     .unwrap();
//!
//! let node = renderer.get_node().unwrap();
//! assert_eq!(node.node_type, NodeType::Function);
//! renderer.unmount().unwrap();
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Version adapter contract and shared structural conversions
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]
pub mod adapter;

/// Concrete adapters, one per supported engine generation
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod adapters;

mod component;
mod element;

/// Simulated host engines backing the mount-mode renderers
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod engine;

mod events;
mod markup;
mod node;

/// Renderer sessions and their lifecycle
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]
pub mod renderer;

mod result;

pub use adapter::{
    element_to_tree, nearest_host_handle, Adapter, RendererMode, RendererOptions,
};
pub use adapters::{ClassicAdapter, FiberAdapter};
pub use component::{
    ComponentDef, ComponentInstance, DefKind, EventHandler, InstanceHandle, RenderFn, RenderScope,
};
pub use element::{
    Element, ElementType, ElementValue, Literal, PropValue, Props, CHILDREN_PROP,
};
pub use engine::target::{create_target, HostHandle, HostInstance, MountTarget, WeakHostHandle};
pub use events::{map_native_event_name, prop_from_event, simulate_prop};
pub use markup::render_to_static_markup;
pub use node::{node, InstanceRef, NodeType, Rendered, RstNode, RstValue};
pub use renderer::{Renderer, RendererExt, SessionState, ShallowRenderer, StringRenderer};
pub use result::{EspejoError, EspejoResult};
