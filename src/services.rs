//! Host runtime collaborators
//!
//! The core never renders, frames cameras, or instantiates objects itself. It
//! asks the host through these traits and keeps only the returned handles.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque handle to a host-side object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(pub u64);

/// What the host should instantiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefab {
    Body,
    Orb,
    Cell,
    /// Empty grouping object used to regroup or stack children
    Container,
}

/// Visual tags the host maps onto materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualState {
    Default,
    Selected,
    HitOnce,
    HitTwice,
    Energized,
}

/// What the camera should frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FocusTarget {
    /// Frame a single object
    Entity(Handle),
    /// Frame an axis-aligned box
    Bounds { center: Vec3, half_extents: Vec3 },
}

/// Realizes entities in the host scene
pub trait SpawnService {
    fn instantiate(&mut self, prefab: Prefab, name: &str, position: Vec3, orientation: Quat) -> Handle;
    fn set_parent(&mut self, child: Handle, parent: Handle);
    fn set_position(&mut self, handle: Handle, position: Vec3);
    fn set_active(&mut self, handle: Handle, active: bool);
    fn despawn(&mut self, handle: Handle);
}

/// Applies visual tags
pub trait VisualService {
    fn set_visual_state(&mut self, handle: Handle, state: VisualState);
}

/// Requests camera framing
pub trait CameraService {
    fn focus_on(&mut self, target: FocusTarget);
}

/// Bundle of collaborators handed to a session at construction
pub struct Services {
    pub spawner: Box<dyn SpawnService>,
    pub visuals: Box<dyn VisualService>,
    pub camera: Box<dyn CameraService>,
}

impl Services {
    pub fn new(
        spawner: impl SpawnService + 'static,
        visuals: impl VisualService + 'static,
        camera: impl CameraService + 'static,
    ) -> Self {
        Self {
            spawner: Box::new(spawner),
            visuals: Box::new(visuals),
            camera: Box::new(camera),
        }
    }

    /// Services backed by a single shared [`Recorder`]
    pub fn recording() -> (Self, Recorder) {
        let recorder = Recorder::default();
        let services = Self::new(recorder.clone(), recorder.clone(), recorder.clone());
        (services, recorder)
    }
}

/// One call made against a collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceCall {
    Instantiate { handle: Handle, prefab: Prefab, name: String, position: Vec3 },
    SetParent { child: Handle, parent: Handle },
    SetPosition { handle: Handle, position: Vec3 },
    SetActive { handle: Handle, active: bool },
    Despawn { handle: Handle },
    SetVisualState { handle: Handle, state: VisualState },
    FocusOn { target: FocusTarget },
}

#[derive(Debug, Default)]
struct RecorderInner {
    next_handle: u64,
    calls: Vec<ServiceCall>,
}

/// In-memory collaborator that hands out sequential handles and logs every call
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Rc<RefCell<RecorderInner>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Latest visual state applied to `handle`
    pub fn visual_state(&self, handle: Handle) -> Option<VisualState> {
        self.inner.borrow().calls.iter().rev().find_map(|call| match call {
            ServiceCall::SetVisualState { handle: h, state } if *h == handle => Some(*state),
            _ => None,
        })
    }

    /// Latest activity flag applied to `handle` (objects start active)
    pub fn is_active(&self, handle: Handle) -> bool {
        self.inner
            .borrow()
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                ServiceCall::SetActive { handle: h, active } if *h == handle => Some(*active),
                _ => None,
            })
            .unwrap_or(true)
    }

    pub fn focus_requests(&self) -> Vec<FocusTarget> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::FocusOn { target } => Some(*target),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ServiceCall) {
        log::trace!("service call: {:?}", call);
        self.inner.borrow_mut().calls.push(call);
    }
}

impl SpawnService for Recorder {
    fn instantiate(&mut self, prefab: Prefab, name: &str, position: Vec3, _orientation: Quat) -> Handle {
        let handle = {
            let mut inner = self.inner.borrow_mut();
            inner.next_handle += 1;
            Handle(inner.next_handle)
        };
        self.record(ServiceCall::Instantiate {
            handle,
            prefab,
            name: name.to_string(),
            position,
        });
        handle
    }

    fn set_parent(&mut self, child: Handle, parent: Handle) {
        self.record(ServiceCall::SetParent { child, parent });
    }

    fn set_position(&mut self, handle: Handle, position: Vec3) {
        self.record(ServiceCall::SetPosition { handle, position });
    }

    fn set_active(&mut self, handle: Handle, active: bool) {
        self.record(ServiceCall::SetActive { handle, active });
    }

    fn despawn(&mut self, handle: Handle) {
        self.record(ServiceCall::Despawn { handle });
    }
}

impl VisualService for Recorder {
    fn set_visual_state(&mut self, handle: Handle, state: VisualState) {
        self.record(ServiceCall::SetVisualState { handle, state });
    }
}

impl CameraService for Recorder {
    fn focus_on(&mut self, target: FocusTarget) {
        log::debug!("camera focus: {:?}", target);
        self.record(ServiceCall::FocusOn { target });
    }
}
