//! # relay-sse
//!
//! Bridges a publish/subscribe backplane to many concurrent Server-Sent
//! Events streams.
//!
//! Each client connection runs one streaming session: subscribe to a
//! channel, commit the event-stream headers, optionally send an initial
//! state frame, then forward channel messages as `data:` frames until the
//! source ends, the client disconnects or the connection is cancelled. The
//! subscription is released exactly once on every one of those paths.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP GET, text/event-stream)
//!     │
//!     ├── Stream / Publish Handlers (api/)
//!     │
//!     ├── StreamingSession + entry points (sse/)
//!     │
//!     ├── Channel naming, messages (domain/)
//!     │
//!     └── Backplane trait ── InMemoryBackplane (backplane/)
//! ```

pub mod api;
pub mod app_state;
pub mod backplane;
pub mod config;
pub mod domain;
pub mod error;
pub mod sse;
