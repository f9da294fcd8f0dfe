use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::buffer::EventBuffer;
use crate::error::TransportError;
use crate::sink::RemoteSink;
use crate::transport::ErrorHandler;

pub(crate) struct FlushSettings {
    pub log_group: String,
    pub log_stream: String,
    pub flush_interval: Duration,
    pub max_batch_size: usize,
}

/// Drains the buffer into the sink, one batch per interval tick.
///
/// Events are removed from the buffer at hand-off; a failed upload reports
/// through the error handler exactly once and the batch is not re-queued.
/// When the shutdown signal fires (or its sender is dropped), the remaining
/// buffer is drained once and the task exits.
pub(crate) async fn flush_loop<S>(
    sink: Arc<S>,
    buffer: Arc<EventBuffer>,
    settings: FlushSettings,
    error_handler: Arc<Option<ErrorHandler>>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: RemoteSink,
{
    let mut ticker = time::interval(settings.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately; consume it so
    // no upload happens before the interval has elapsed once.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                flush_once(&*sink, &buffer, &settings, &error_handler).await;
            }
            changed = shutdown.changed() => {
                let stop = changed.is_err() || *shutdown.borrow();
                if stop {
                    drain(&*sink, &buffer, &settings, &error_handler).await;
                    return;
                }
            }
        }
    }
}

async fn flush_once<S>(
    sink: &S,
    buffer: &EventBuffer,
    settings: &FlushSettings,
    error_handler: &Option<ErrorHandler>,
) where
    S: RemoteSink,
{
    let batch = buffer.take_batch(settings.max_batch_size);
    if batch.is_empty() {
        return;
    }
    if let Err(error) = sink
        .upload(&settings.log_group, &settings.log_stream, batch)
        .await
    {
        report(error_handler, &error);
    }
}

async fn drain<S>(
    sink: &S,
    buffer: &EventBuffer,
    settings: &FlushSettings,
    error_handler: &Option<ErrorHandler>,
) where
    S: RemoteSink,
{
    while !buffer.is_empty() {
        flush_once(sink, buffer, settings, error_handler).await;
    }
}

fn report(error_handler: &Option<ErrorHandler>, error: &TransportError) {
    match error_handler {
        Some(handler) => handler(error),
        None => eprintln!("{}", error),
    }
}
