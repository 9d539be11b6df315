use std::sync::{Arc, Mutex, MutexGuard};

use taggame_core::{AgentSnapshot, EngineError, EngineState, FrameSnapshot, Vector2};

use crate::TagEngine;
use crate::observation::{Observation, Transition};

/// A `TagEngine` shared between a driver thread and observers.
///
/// Every operation holds one lock for its full duration, so an observer never
/// sees a half-applied step.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<TagEngine>>,
}

impl SharedEngine {
    pub fn new(engine: TagEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// A panic while holding the lock leaves the engine in an unknown state.
    /// The engine is terminated and the poison cleared, so the fault is
    /// reported once and every later call sees a Terminated engine.
    fn lock(&self) -> Result<MutexGuard<'_, TagEngine>, EngineError> {
        self.inner.lock().map_err(|poisoned| {
            poisoned.into_inner().terminate();
            self.inner.clear_poison();
            tracing::error!("Engine lock poisoned, engine terminated");
            EngineError::InvariantViolation("engine lock poisoned".to_string())
        })
    }

    pub fn initialize(&self) -> Result<(), EngineError> {
        self.lock()?.initialize()
    }

    pub fn step(&self, elapsed_ms: f64) -> Result<(), EngineError> {
        self.lock()?.step(elapsed_ms)
    }

    pub fn step_with_action(
        &self,
        elapsed_ms: f64,
        action: Vector2,
    ) -> Result<Transition, EngineError> {
        self.lock()?.step_with_action(elapsed_ms, action)
    }

    pub fn set_rl_action(&self, action: Vector2) -> Result<(), EngineError> {
        self.lock()?.set_rl_action(action)
    }

    pub fn reset(&self) -> Result<Observation, EngineError> {
        self.lock()?.reset()
    }

    pub fn snapshot_all(&self) -> Result<Vec<AgentSnapshot>, EngineError> {
        self.lock()?.snapshot_all()
    }

    pub fn frame(&self) -> Result<FrameSnapshot, EngineError> {
        self.lock()?.frame()
    }

    pub fn observation(&self) -> Result<Observation, EngineError> {
        self.lock()?.observation()
    }

    /// Terminate even if the lock was poisoned.
    pub fn terminate(&self) {
        if let Ok(mut engine) = self.lock() {
            engine.terminate();
        }
    }

    pub fn state(&self) -> EngineState {
        self.lock()
            .map(|engine| engine.state())
            .unwrap_or(EngineState::Terminated)
    }

    /// Run a read-only closure against the engine under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&TagEngine) -> R) -> Result<R, EngineError> {
        Ok(f(&*self.lock()?))
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl SharedEngine {
    /// Mutate the engine directly under the lock, bypassing validation.
    pub fn with_engine_mut<R>(
        &self,
        f: impl FnOnce(&mut TagEngine) -> R,
    ) -> Result<R, EngineError> {
        Ok(f(&mut *self.lock()?))
    }
}
