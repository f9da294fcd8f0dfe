//! A batching transport that forwards log records to AWS CloudWatch Logs.
//!
//! Records passed to [`CloudWatchTransport::log`] are formatted, queued in
//! memory, and uploaded in ordered batches by a background task on a fixed
//! interval. Upload failures are routed to a configurable error handler and
//! never crash the host process.

mod buffer;
mod error;
mod format;
mod sink;
mod transport;
mod worker;
mod writer;

use std::time::Duration;

/// Hard CloudWatch limit on the number of events in one `PutLogEvents` call.
const CLOUDWATCH_MAX_BATCH_EVENTS: usize = 10_000;
/// Hard CloudWatch limit on the payload of a single event.
const CLOUDWATCH_MAX_EVENT_SIZE: usize = 256 * 1024;
/// Bytes CloudWatch adds to each event on top of the message payload.
const CLOUDWATCH_EVENT_OVERHEAD: usize = 26;

/// Events drained from the buffer per flush unless configured otherwise.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
/// Interval between flushes unless configured otherwise.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

pub use buffer::EventBuffer;
pub use error::TransportError;
pub use format::{LogRecord, MessageFormat, MessageFormatter};
pub use sink::{CloudWatchSink, RemoteSink};
pub use transport::{AwsOptions, CloudWatchTransport, CloudWatchTransportBuilder, ErrorHandler};
pub use writer::TransportWriter;

/// Starts building a transport that uploads to the given log group and stream.
pub fn builder(log_group: &str, log_stream: &str) -> CloudWatchTransportBuilder<()> {
    CloudWatchTransportBuilder::new(log_group, log_stream)
}
