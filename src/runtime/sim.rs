//! In-process simulated control runtime.
//!
//! [`SimRuntime`] behaves like a minimal turtlesim node: publishers enqueue
//! [`Twist`] messages into a bounded keep-last queue, and every
//! [`ControlRuntime::spin_once`] drains the queue (last write wins) and
//! integrates a planar pose with the current velocity. A velocity that has
//! not been refreshed for [`COMMAND_TIMEOUT`] decays to zero, the way a
//! real base stops when its controller goes quiet.
//!
//! All state sits behind one mutex, so publishers may be called from any
//! number of threads concurrently.

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::{ControlRuntime, TwistPublisher};
use crate::domain::Twist;
use crate::error::RuntimeError;

/// A velocity older than this is treated as zero.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Planar pose of the simulated base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose2D {
    /// X position in metres.
    pub x: f64,
    /// Y position in metres.
    pub y: f64,
    /// Heading in radians, wrapped to `[-PI, PI]`.
    pub theta: f64,
}

impl Pose2D {
    /// Advances the pose by `dt` seconds at the given body velocity.
    #[must_use]
    pub fn integrate(self, twist: &Twist, dt: f64) -> Self {
        let v = twist.linear.x;
        let w = twist.angular.z;
        Self {
            x: self.x + v * self.theta.cos() * dt,
            y: self.y + v * self.theta.sin() * dt,
            theta: wrap_angle(self.theta + w * dt),
        }
    }
}

fn wrap_angle(theta: f64) -> f64 {
    let mut t = (theta + PI) % (2.0 * PI);
    if t < 0.0 {
        t += 2.0 * PI;
    }
    t - PI
}

#[derive(Debug, Default)]
struct SimState {
    pending: VecDeque<Twist>,
    velocity: Twist,
    last_command: Option<Instant>,
    last_step: Option<Instant>,
    pose: Pose2D,
    spins: u64,
}

#[derive(Debug)]
struct Shared {
    alive: AtomicBool,
    state: Mutex<SimState>,
    work: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, SimState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|_| RuntimeError::Internal("simulation state lock poisoned".to_string()))
    }
}

/// Simulated control runtime. See the module docs.
#[derive(Debug)]
pub struct SimRuntime {
    node_name: String,
    shared: Arc<Shared>,
}

impl SimRuntime {
    /// Starts a simulated node named `node_name`.
    #[must_use]
    pub fn new(node_name: impl Into<String>) -> Self {
        let node_name = node_name.into();
        tracing::info!(node = %node_name, "simulated control runtime started");
        Self {
            node_name,
            shared: Arc::new(Shared {
                alive: AtomicBool::new(true),
                state: Mutex::new(SimState::default()),
                work: Condvar::new(),
            }),
        }
    }

    /// Node name given at construction.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Current pose of the simulated base.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Internal`] if the state lock is poisoned.
    pub fn pose(&self) -> Result<Pose2D, RuntimeError> {
        Ok(self.shared.lock()?.pose)
    }

    /// Velocity currently applied to the base.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Internal`] if the state lock is poisoned.
    pub fn velocity(&self) -> Result<Twist, RuntimeError> {
        Ok(self.shared.lock()?.velocity)
    }

    /// Number of completed spins.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Internal`] if the state lock is poisoned.
    pub fn spin_count(&self) -> Result<u64, RuntimeError> {
        Ok(self.shared.lock()?.spins)
    }
}

impl ControlRuntime for SimRuntime {
    fn ok(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    fn spin_once(&self, timeout: Duration) -> Result<(), RuntimeError> {
        if !self.ok() {
            return Err(RuntimeError::ShutDown);
        }

        let mut state = self.shared.lock()?;
        if state.pending.is_empty() && !timeout.is_zero() {
            state = self
                .shared
                .work
                .wait_timeout(state, timeout)
                .map_err(|_| RuntimeError::Internal("simulation state lock poisoned".to_string()))?
                .0;
        }

        let now = Instant::now();
        let latest = state.pending.drain(..).last();
        if let Some(latest) = latest {
            state.velocity = latest;
            state.last_command = Some(now);
        } else if state
            .last_command
            .is_some_and(|at| now.duration_since(at) > COMMAND_TIMEOUT)
        {
            state.velocity = Twist::default();
            state.last_command = None;
        }

        let dt = state
            .last_step
            .map_or(0.0, |at| now.duration_since(at).as_secs_f64());
        let before = state.pose;
        state.pose = before.integrate(&state.velocity, dt);
        state.last_step = Some(now);
        state.spins = state.spins.saturating_add(1);

        if state.pose != before {
            tracing::trace!(
                x = state.pose.x,
                y = state.pose.y,
                theta = state.pose.theta,
                "simulated pose updated"
            );
        }
        Ok(())
    }

    fn create_twist_publisher(
        &self,
        topic: &str,
        depth: usize,
    ) -> Result<Arc<dyn TwistPublisher>, RuntimeError> {
        if !self.ok() {
            return Err(RuntimeError::ShutDown);
        }
        if topic.is_empty() || depth == 0 {
            return Err(RuntimeError::PublisherRejected {
                topic: topic.to_string(),
                reason: "topic must be non-empty and depth at least 1".to_string(),
            });
        }
        tracing::info!(node = %self.node_name, topic, depth, "publisher created");
        Ok(Arc::new(SimPublisher {
            topic: topic.to_string(),
            depth,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn shutdown(&self) {
        if self.shared.alive.swap(false, Ordering::AcqRel) {
            self.shared.work.notify_all();
            tracing::info!(node = %self.node_name, "simulated control runtime stopped");
        }
    }
}

/// Keep-last publisher feeding the simulated base.
#[derive(Debug)]
struct SimPublisher {
    topic: String,
    depth: usize,
    shared: Arc<Shared>,
}

impl TwistPublisher for SimPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, twist: Twist) -> Result<(), RuntimeError> {
        if !self.shared.alive.load(Ordering::Acquire) {
            return Err(RuntimeError::ShutDown);
        }
        let mut state = self.shared.lock()?;
        state.pending.push_back(twist);
        while state.pending.len() > self.depth {
            state.pending.pop_front();
        }
        drop(state);
        self.shared.work.notify_one();
        Ok(())
    }
}
