//! Liveness endpoint for herald.
//!
//! A process supervisor probes `/health`; the answer is a fixed payload
//! that only proves the event loop is responsive. It deliberately checks
//! nothing else: scheduler or provider trouble is surfaced through the
//! `status` command, not here.

mod routes;

pub use routes::{WebError, bind, router, serve};
