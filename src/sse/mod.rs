//! Server-Sent Events layer: encoding, sinks, the streaming session and its
//! entry points.
//!
//! Each `GET` on a stream endpoint runs one [`StreamingSession`] on its own
//! task. The session subscribes to the backplane, commits the event-stream
//! headers, optionally writes an initial-state frame and then forwards
//! channel messages as `data:` frames until the source ends, the client
//! leaves or the connection is cancelled.

pub mod entry;
pub mod envelope;
pub mod handler;
pub mod session;
pub mod sink;


pub use entry::{stream_events, stream_untyped, stream_with_initial_state};
pub use envelope::Envelope;
pub use handler::respond_with_stream;
pub use session::{SessionEnd, SessionReport, SessionState, StreamPlan, StreamingSession};
pub use sink::{EventSink, PendingResponse, ResponseSink, response_channel, sse_headers};
