//! DOM-like mount targets and host-rendered handles.
//!
//! A [`MountTarget`] is the render target a mount session owns. Targets are
//! exclusively owned from a session's first `render` until `unmount`; two
//! live sessions can never share one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::element::Props;
use crate::result::{EspejoError, EspejoResult};

/// Live backing object for one host-rendered primitive.
///
/// Owned by the engine's internal graph. The committed props are kept
/// current so the event bridge can look up handler props on dispatch.
#[derive(Debug)]
pub struct HostInstance {
    /// Host primitive tag
    pub tag: String,
    /// Props as of the last commit
    pub props: Props,
}

impl HostInstance {
    /// Create a handle for a freshly committed host primitive
    #[must_use]
    pub fn create(tag: impl Into<String>, props: Props) -> HostHandle {
        Rc::new(RefCell::new(Self {
            tag: tag.into(),
            props,
        }))
    }
}

/// Shared handle to a [`HostInstance`]
pub type HostHandle = Rc<RefCell<HostInstance>>;

/// Non-owning reference to a [`HostInstance`]
pub type WeakHostHandle = Weak<RefCell<HostInstance>>;

/// A DOM-like mount point
#[derive(Debug, Default)]
pub struct MountPoint {
    in_use: bool,
}

/// Shared handle to a [`MountPoint`]
pub type MountTarget = Rc<RefCell<MountPoint>>;

/// Create a fresh, unowned mount target
#[must_use]
pub fn create_target() -> MountTarget {
    Rc::new(RefCell::new(MountPoint::default()))
}

/// Take exclusive ownership of a target for one session
pub(crate) fn acquire(target: &MountTarget) -> EspejoResult<()> {
    let mut point = target.borrow_mut();
    if point.in_use {
        return Err(EspejoError::TargetInUse);
    }
    point.in_use = true;
    Ok(())
}

/// Release a target at unmount
pub(crate) fn release(target: &MountTarget) {
    target.borrow_mut().in_use = false;
}

impl MountPoint {
    /// Whether a live session currently owns this target
    #[must_use]
    pub const fn is_in_use(&self) -> bool {
        self.in_use
    }
}
