use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rusoto_core::region::ParseRegionError;
use rusoto_core::Region;
use rusoto_logs::{CloudWatchLogsClient, InputLogEvent};
use serde_json::{Map, Value};
use tokio::runtime::{Builder, Handle};
use tokio::sync::watch;

use crate::buffer::{timestamp, EventBuffer};
use crate::error::TransportError;
use crate::format::{LogRecord, MessageFormat, MessageFormatter};
use crate::sink::{CloudWatchSink, RemoteSink};
use crate::worker::{flush_loop, FlushSettings};
use crate::{CLOUDWATCH_MAX_BATCH_EVENTS, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH_SIZE};

/// Callback invoked once per failed flush. When absent, errors go to stderr.
pub type ErrorHandler = Box<dyn Fn(&TransportError) + Send + Sync>;

/// SDK client options. Values set here override the builder's top-level
/// shorthand fields, so a `region` given both ways resolves to this one.
#[derive(Debug, Clone, Default)]
pub struct AwsOptions {
    pub region: Option<String>,
    /// Custom endpoint, e.g. for a local CloudWatch stand-in.
    pub endpoint: Option<String>,
}

pub struct CloudWatchTransportBuilder<S> {
    sink: S,
    log_group: String,
    log_stream: String,
    region: Option<String>,
    aws_options: AwsOptions,
    format: MessageFormat,
    error_handler: Option<ErrorHandler>,
    flush_interval: Duration,
    max_batch_size: usize,
    runtime_handle: Handle,
}

impl CloudWatchTransportBuilder<()> {
    pub fn new(log_group: &str, log_stream: &str) -> Self {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build tokio runtime");
        let runtime_handle = runtime.handle().clone();
        std::thread::spawn(move || {
            runtime.block_on(std::future::pending::<()>());
        });
        Self {
            sink: (),
            log_group: log_group.to_string(),
            log_stream: log_stream.to_string(),
            region: None,
            aws_options: AwsOptions::default(),
            format: MessageFormat::default(),
            error_handler: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            runtime_handle,
        }
    }
}

impl<S> CloudWatchTransportBuilder<S> {
    /// Top-level region shorthand; `aws_options.region` takes precedence.
    pub fn region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn aws_options(mut self, aws_options: AwsOptions) -> Self {
        self.aws_options = aws_options;
        self
    }

    /// Renders messages as JSON objects instead of the default text format.
    pub fn json_message(mut self, json_message: bool) -> Self {
        if json_message {
            self.format = MessageFormat::Json;
        }
        self
    }

    /// Overrides both the default and JSON renderings.
    pub fn message_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&LogRecord<'_>) -> String + Send + Sync + 'static,
    {
        self.format = MessageFormat::Custom(Box::new(formatter) as MessageFormatter);
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Events per upload call, clamped to the CloudWatch batch limit.
    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.min(CLOUDWATCH_MAX_BATCH_EVENTS).max(1);
        self
    }

    /// Injects a custom upload destination in place of the CloudWatch client.
    pub fn with_sink<S2>(self, sink: S2) -> CloudWatchTransportBuilder<S2>
    where
        S2: RemoteSink,
    {
        CloudWatchTransportBuilder {
            sink,
            log_group: self.log_group,
            log_stream: self.log_stream,
            region: self.region,
            aws_options: self.aws_options,
            format: self.format,
            error_handler: self.error_handler,
            flush_interval: self.flush_interval,
            max_batch_size: self.max_batch_size,
            runtime_handle: self.runtime_handle,
        }
    }

    /// Builds the CloudWatch client from the merged region options.
    pub fn default_sink(
        self,
    ) -> Result<CloudWatchTransportBuilder<CloudWatchSink<CloudWatchLogsClient>>, ParseRegionError>
    {
        let region = self.effective_region()?;
        let sink = CloudWatchSink::new(CloudWatchLogsClient::new(region));
        Ok(self.with_sink(sink))
    }

    /// Nested `aws_options` win over the top-level shorthand; a custom
    /// endpoint turns the resolved name into a `Region::Custom`.
    fn effective_region(&self) -> Result<Region, ParseRegionError> {
        let name = self
            .aws_options
            .region
            .as_deref()
            .or_else(|| self.region.as_deref());
        match (&self.aws_options.endpoint, name) {
            (Some(endpoint), name) => Ok(Region::Custom {
                name: name.unwrap_or("custom").to_string(),
                endpoint: endpoint.clone(),
            }),
            (None, Some(name)) => Region::from_str(name),
            (None, None) => Ok(Region::default()),
        }
    }
}

impl<S> CloudWatchTransportBuilder<S>
where
    S: RemoteSink,
{
    /// Starts the background flush task and returns the transport facade.
    pub fn build(self) -> CloudWatchTransport {
        let buffer = Arc::new(EventBuffer::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let settings = FlushSettings {
            log_group: self.log_group,
            log_stream: self.log_stream,
            flush_interval: self.flush_interval,
            max_batch_size: self.max_batch_size,
        };
        self.runtime_handle.spawn(flush_loop(
            Arc::new(self.sink),
            Arc::clone(&buffer),
            settings,
            Arc::new(self.error_handler),
            shutdown_rx,
        ));
        CloudWatchTransport {
            buffer,
            format: self.format,
            shutdown: shutdown_tx,
        }
    }
}

/// Public entry point the host framework calls per log record.
///
/// Appending is synchronous and always succeeds; uploads happen on the
/// background flush task, so `log` callers never wait on the network.
pub struct CloudWatchTransport {
    buffer: Arc<EventBuffer>,
    format: MessageFormat,
    shutdown: watch::Sender<bool>,
}

impl CloudWatchTransport {
    /// Formats the record, queues it for upload, and invokes `callback` once
    /// the append completes.
    pub fn log<F>(&self, level: &str, message: &str, meta: &Map<String, Value>, callback: F)
    where
        F: FnOnce(),
    {
        let record = LogRecord {
            level,
            message,
            meta,
        };
        let message = self.format.format(&record);
        self.buffer.append(InputLogEvent {
            message,
            timestamp: timestamp(),
        });
        callback();
    }

    /// Signals the flush task to drain the remaining buffer and stop.
    /// Dropping the transport has the same effect.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub(crate) fn buffer(&self) -> Arc<EventBuffer> {
        Arc::clone(&self.buffer)
    }
}
