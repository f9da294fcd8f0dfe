use std::collections::HashMap;
use std::sync::Arc;

use async_recursion::async_recursion;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusoto_core::RusotoError;
use rusoto_logs::{
    CloudWatchLogs, CreateLogGroupError, CreateLogGroupRequest, CreateLogStreamError,
    CreateLogStreamRequest, DescribeLogStreamsRequest, InputLogEvent, PutLogEventsError,
    PutLogEventsRequest,
};

use crate::error::TransportError;

/// Bound on sequence-token refreshes and stream creations within one upload.
const PUT_RETRY_LIMIT: usize = 2;

/// Destination for ordered batches of log events.
///
/// Each call resolves exactly once: `Ok` when the whole batch was accepted,
/// `Err` otherwise. Implemented by [`CloudWatchSink`] in production and by
/// hand-rolled fakes in tests.
#[async_trait]
pub trait RemoteSink: Send + Sync + 'static {
    async fn upload(
        &self,
        log_group: &str,
        log_stream: &str,
        events: Vec<InputLogEvent>,
    ) -> Result<(), TransportError>;
}

/// [`RemoteSink`] backed by a CloudWatch Logs client.
///
/// Keeps the upload sequence token per stream, refreshing it from
/// `DescribeLogStreams` when CloudWatch reports it stale, and creates the log
/// group and stream on first use when they do not exist yet.
pub struct CloudWatchSink<C> {
    client: Arc<C>,
    tokens: Mutex<HashMap<String, String>>,
}

impl<C> CloudWatchSink<C>
where
    C: CloudWatchLogs + Send + Sync + 'static,
{
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    #[async_recursion]
    async fn put_events(
        &self,
        log_group: &str,
        log_stream: &str,
        events: Vec<InputLogEvent>,
        retries_left: usize,
    ) -> Result<(), TransportError> {
        let request = PutLogEventsRequest {
            log_events: events.clone(),
            log_group_name: log_group.to_string(),
            log_stream_name: log_stream.to_string(),
            sequence_token: self.tokens.lock().get(log_stream).cloned(),
        };

        match self.client.put_log_events(request).await {
            Ok(response) => {
                let mut tokens = self.tokens.lock();
                match response.next_sequence_token {
                    Some(token) => {
                        tokens.insert(log_stream.to_string(), token);
                    }
                    None => {
                        tokens.remove(log_stream);
                    }
                }
                Ok(())
            }
            Err(RusotoError::Service(PutLogEventsError::InvalidSequenceToken(_)))
            | Err(RusotoError::Service(PutLogEventsError::DataAlreadyAccepted(_)))
                if retries_left > 0 =>
            {
                self.refresh_token(log_group, log_stream).await?;
                self.put_events(log_group, log_stream, events, retries_left - 1)
                    .await
            }
            Err(RusotoError::Service(PutLogEventsError::ResourceNotFound(_)))
                if retries_left > 0 =>
            {
                self.ensure_stream(log_group, log_stream).await?;
                self.put_events(log_group, log_stream, events, retries_left - 1)
                    .await
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn refresh_token(&self, log_group: &str, log_stream: &str) -> Result<(), TransportError> {
        let request = DescribeLogStreamsRequest {
            log_group_name: log_group.to_string(),
            log_stream_name_prefix: Some(log_stream.to_string()),
            ..Default::default()
        };
        let response = self
            .client
            .describe_log_streams(request)
            .await
            .map_err(TransportError::from)?;

        let token = response
            .log_streams
            .unwrap_or_default()
            .into_iter()
            .find(|stream| stream.log_stream_name.as_deref() == Some(log_stream))
            .and_then(|stream| stream.upload_sequence_token);

        let mut tokens = self.tokens.lock();
        match token {
            Some(token) => {
                tokens.insert(log_stream.to_string(), token);
            }
            None => {
                tokens.remove(log_stream);
            }
        }
        Ok(())
    }

    async fn ensure_stream(&self, log_group: &str, log_stream: &str) -> Result<(), TransportError> {
        let request = CreateLogGroupRequest {
            log_group_name: log_group.to_string(),
            ..Default::default()
        };
        match self.client.create_log_group(request).await {
            Ok(()) => {}
            Err(RusotoError::Service(CreateLogGroupError::ResourceAlreadyExists(_))) => {}
            Err(error) => return Err(error.into()),
        }

        let request = CreateLogStreamRequest {
            log_group_name: log_group.to_string(),
            log_stream_name: log_stream.to_string(),
        };
        match self.client.create_log_stream(request).await {
            Ok(()) => {
                // Fresh stream, no token yet.
                self.tokens.lock().remove(log_stream);
                Ok(())
            }
            Err(RusotoError::Service(CreateLogStreamError::ResourceAlreadyExists(_))) => {
                self.refresh_token(log_group, log_stream).await
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[async_trait]
impl<C> RemoteSink for CloudWatchSink<C>
where
    C: CloudWatchLogs + Send + Sync + 'static,
{
    async fn upload(
        &self,
        log_group: &str,
        log_stream: &str,
        events: Vec<InputLogEvent>,
    ) -> Result<(), TransportError> {
        self.put_events(log_group, log_stream, events, PUT_RETRY_LIMIT)
            .await
    }
}
