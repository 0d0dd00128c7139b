//! Runtime integration layer.
//!
//! Isolates the worker-thread boundary: each dispatch worker runs on its own
//! thread with a current-thread tokio runtime, so the rest of the crate never
//! depends on an ambient runtime.

pub(crate) mod worker_runtime;
