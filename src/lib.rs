//! stevedore: a minimal cluster task orchestrator.
//!
//! The heart of the crate is the worker-side reconciliation engine: a worker
//! owns a FIFO queue of task-state-change intents, validates each intent
//! against the task lifecycle state machine, drives the container runtime to
//! make reality match the desired state, and persists the outcome as the
//! authoritative record of what is actually running on the machine.

pub mod manager;
pub mod node;
pub mod runtime;
pub mod task;
pub mod worker;
