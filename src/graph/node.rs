use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU8, Ordering};
use tracing::{debug, trace, warn};

use super::element::Element;
use crate::core::errors::{DagrunError, Result};
use crate::status::{combine, StatusCode};

/// Index handle of a node inside its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeState {
    Uninitialized = 0,
    Initialized = 1,
    Running = 2,
    Completed = 3,
    Destroyed = 4,
}

impl NodeState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => NodeState::Uninitialized,
            1 => NodeState::Initialized,
            2 => NodeState::Running,
            3 => NodeState::Completed,
            _ => NodeState::Destroyed,
        }
    }
}

/// Result of one [`Node::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRun {
    pub status: StatusCode,
    /// Number of `run` calls made. Zero when `init` failed.
    pub iterations: u32,
}

struct ElementSlot {
    element: Box<dyn Element>,
    init_status: Option<StatusCode>,
}

/// Marks a node `Running` and leaves it `Completed` when dropped, including
/// when the element body panics.
struct RunningState<'a>(&'a AtomicU8);

impl<'a> RunningState<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(NodeState::Running as u8, Ordering::Release);
        Self(state)
    }
}

impl Drop for RunningState<'_> {
    fn drop(&mut self) {
        self.0.store(NodeState::Completed as u8, Ordering::Release);
    }
}

/// A vertex of the dependency graph.
///
/// Edges are `NodeId` handles into the arena owned by the
/// [`Graph`](super::Graph); a node never owns its neighbours. Edge lists are
/// only written while the graph is being built and are read-only afterwards.
/// The dependency counter is the only field shared between workers.
pub struct Node {
    id: NodeId,
    name: String,
    predecessors: Vec<NodeId>,
    successors: Vec<NodeId>,
    pending: AtomicIsize,
    loop_count: u32,
    state: AtomicU8,
    poisoned: AtomicBool,
    destroyed: AtomicBool,
    slot: Mutex<ElementSlot>,
}

impl Node {
    pub const DESTROYED_CODE: &'static str = "NODE_DESTROYED";
    pub const INIT_PANICKED_CODE: &'static str = "INIT_PANICKED";

    pub(crate) fn new(id: NodeId, name: String, element: Box<dyn Element>) -> Self {
        Self {
            id,
            name,
            predecessors: Vec::new(),
            successors: Vec::new(),
            pending: AtomicIsize::new(0),
            loop_count: 1,
            state: AtomicU8::new(NodeState::Uninitialized as u8),
            poisoned: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            slot: Mutex::new(ElementSlot {
                element,
                init_status: None,
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Remaining predecessors in the current run.
    pub fn pending(&self) -> isize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_source(&self) -> bool {
        self.predecessors.is_empty()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_loop_count(&mut self, loop_count: u32) -> Result<()> {
        if loop_count == 0 {
            return Err(DagrunError::invalid_field(
                format!("loop count for node '{}' must be at least 1", self.name),
                "loop_count",
            ));
        }
        self.loop_count = loop_count;
        Ok(())
    }

    /// Returns false when the edge already existed.
    pub(crate) fn add_predecessor(&mut self, predecessor: NodeId) -> bool {
        if self.predecessors.contains(&predecessor) {
            return false;
        }
        self.predecessors.push(predecessor);
        true
    }

    pub(crate) fn add_successor(&mut self, successor: NodeId) {
        if !self.successors.contains(&successor) {
            self.successors.push(successor);
        }
    }

    /// Arm the dependency counter for a new run.
    pub fn reset_for_run(&self) -> Result<()> {
        if self.state() == NodeState::Running {
            return Err(DagrunError::already_running(format!(
                "reset dependency counter of node '{}'",
                self.name
            )));
        }
        self.poisoned.store(false, Ordering::Release);
        self.pending
            .store(self.predecessors.len() as isize, Ordering::Release);
        Ok(())
    }

    /// Record that one predecessor finished.
    ///
    /// Returns true for exactly one caller per run: the one whose decrement
    /// takes the counter from 1 to 0.
    pub fn on_predecessor_completed(&self) -> bool {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        if previous <= 0 {
            warn!(
                node = %self.name,
                pending = previous - 1,
                "dependency counter decremented past zero"
            );
        }
        previous == 1
    }

    /// Mark this node as downstream of a failed or skipped node.
    pub(crate) fn poison(&self) {
        self.poisoned.store(true, Ordering::Release);
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Run the element: `init` once per graph lifetime, then the body up to
    /// `loop_count` times, stopping after the first error.
    pub fn execute(&self) -> NodeRun {
        let mut slot = self.slot.lock();

        if self.destroyed.load(Ordering::Acquire) {
            warn!(node = %self.name, "execute called on a destroyed node");
            return NodeRun {
                status: StatusCode::error(Self::DESTROYED_CODE, "node.destroyed"),
                iterations: 0,
            };
        }

        let init_status = match slot.init_status.clone() {
            Some(status) => status,
            None => {
                // Stays in place if `init` unwinds, so it is never retried.
                slot.init_status = Some(StatusCode::error(
                    Self::INIT_PANICKED_CODE,
                    "node.init_panicked",
                ));
                let status = slot.element.init();
                debug!(node = %self.name, status = %status, "element initialized");
                slot.init_status = Some(status.clone());
                self.state
                    .store(NodeState::Initialized as u8, Ordering::Release);
                status
            }
        };
        if init_status.is_error() {
            return NodeRun {
                status: init_status,
                iterations: 0,
            };
        }

        let _running = RunningState::enter(&self.state);

        let mut status = StatusCode::ok();
        let mut iterations = 0;
        while iterations < self.loop_count && !status.is_error() {
            status = combine(status, slot.element.run());
            iterations += 1;
            trace!(node = %self.name, iteration = iterations, "element iteration finished");
        }

        NodeRun { status, iterations }
    }

    /// Tear the element down. Only the first call reaches the element; later
    /// calls return `None`.
    pub fn destroy(&self) -> Option<StatusCode> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return None;
        }
        let mut slot = self.slot.lock();
        let status = slot.element.destroy();
        self.state
            .store(NodeState::Destroyed as u8, Ordering::Release);
        if status.is_error() {
            warn!(node = %self.name, status = %status, "element destroy failed");
        }
        Some(status)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("predecessors", &self.predecessors)
            .field("successors", &self.successors)
            .field("pending", &self.pending())
            .field("loop_count", &self.loop_count)
            .field("state", &self.state())
            .finish()
    }
}
