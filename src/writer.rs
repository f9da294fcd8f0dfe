use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

use crate::buffer::{timestamp, EventBuffer};
use crate::transport::CloudWatchTransport;
use crate::{CLOUDWATCH_EVENT_OVERHEAD, CLOUDWATCH_MAX_EVENT_SIZE};

const MAX_MESSAGE_SIZE: usize = CLOUDWATCH_MAX_EVENT_SIZE - CLOUDWATCH_EVENT_OVERHEAD;

/// `io::Write` adapter that queues one log event per written line.
///
/// Lets a `tracing-subscriber` fmt layer (or anything else that writes lines)
/// feed the transport's buffer directly, bypassing the record formatter.
pub struct TransportWriter {
    line_writer: io::LineWriter<Inner>,
}

impl TransportWriter {
    fn new(buffer: Arc<EventBuffer>) -> Self {
        let line_writer = io::LineWriter::new(Inner { buffer });
        Self { line_writer }
    }
}

impl io::Write for TransportWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.line_writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.line_writer.flush()
    }

    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.line_writer.write_vectored(bufs)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.line_writer.write_all(buf)
    }

    fn write_fmt(&mut self, fmt: std::fmt::Arguments<'_>) -> io::Result<()> {
        self.line_writer.write_fmt(fmt)
    }
}

struct Inner {
    buffer: Arc<EventBuffer>,
}

impl io::Write for Inner {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let buf_len = buf.len();

        let buf = buf.strip_suffix(b"\n").unwrap_or(buf);

        let buf = if buf.len() > MAX_MESSAGE_SIZE {
            eprintln!("Message size exceeds max event payload size, truncated");
            buf.split_at(MAX_MESSAGE_SIZE).0
        } else {
            buf
        };

        let message = String::from_utf8(buf.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.buffer.append(rusoto_logs::InputLogEvent {
            message,
            timestamp: timestamp(),
        });

        Ok(buf_len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write(buf).map(|_| ())
    }
}

impl MakeWriter for CloudWatchTransport {
    type Writer = TransportWriter;

    fn make_writer(&self) -> Self::Writer {
        TransportWriter::new(self.buffer())
    }
}
