//! The fallback orchestrator: compile on the server, or hand off to the client.
//!
//! [`Orchestrator::render`] resolves a list of stylesheet references, runs them
//! through the [`CompileCache`](sheaf_cache::CompileCache), and produces an
//! [`Outcome`]. Any resolution or compile error is logged once and turned
//! into a [`FallbackPayload`] that loads the original sources with a
//! client-side compiler instead, so rendering never fails.

#![warn(missing_docs)]

pub mod html;
pub mod orchestrator;
pub mod payload;

pub use orchestrator::{Orchestrator, Outcome, RenderOptions};
pub use payload::{FallbackPayload, FallbackReason};
