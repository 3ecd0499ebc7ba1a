//! Simulated host engines.
//!
//! Two engine generations back the mount-mode renderers. They expose the
//! same outer contract (mount a target, render a root element, dispatch
//! events, batch updates, unmount) but keep deliberately different internal
//! representations, which is exactly what the per-version adapters exist to
//! normalize away:
//!
//! - [`classic`]: a nested instance graph, one record per mounted element,
//!   classified by which optional fields are populated.
//! - [`fiber`]: an arena of index-linked fibers with child/sibling/alternate
//!   pointers and a committed-generation counter.

pub mod classic;
pub mod fiber;
pub mod target;
