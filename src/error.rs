use std::convert::Infallible;
use std::error::Error;
use std::fmt;

use rusoto_core::RusotoError;
use rusoto_logs::{
    CreateLogGroupError, CreateLogStreamError, DescribeLogStreamsError, PutLogEventsError,
};

/// Errors surfaced through the transport's error path.
#[derive(Debug)]
pub enum TransportError {
    /// Dispatch, credential, or protocol failure below the service layer.
    Rusoto(RusotoError<Infallible>),
    PutLogEvents(PutLogEventsError),
    CreateLogGroup(CreateLogGroupError),
    CreateLogStream(CreateLogStreamError),
    DescribeLogStreams(DescribeLogStreamsError),
}

/// Splits a service error from the transport-level failure modes shared by
/// every rusoto call.
fn service<E>(error: RusotoError<E>) -> Result<E, RusotoError<Infallible>> {
    match error {
        RusotoError::Service(error) => Ok(error),
        RusotoError::HttpDispatch(err) => Err(RusotoError::HttpDispatch(err)),
        RusotoError::Credentials(err) => Err(RusotoError::Credentials(err)),
        RusotoError::Validation(msg) => Err(RusotoError::Validation(msg)),
        RusotoError::ParseError(msg) => Err(RusotoError::ParseError(msg)),
        RusotoError::Unknown(resp) => Err(RusotoError::Unknown(resp)),
        RusotoError::Blocking => Err(RusotoError::Blocking),
    }
}

impl From<RusotoError<PutLogEventsError>> for TransportError {
    fn from(error: RusotoError<PutLogEventsError>) -> Self {
        match service(error) {
            Ok(error) => Self::PutLogEvents(error),
            Err(error) => Self::Rusoto(error),
        }
    }
}

impl From<RusotoError<CreateLogGroupError>> for TransportError {
    fn from(error: RusotoError<CreateLogGroupError>) -> Self {
        match service(error) {
            Ok(error) => Self::CreateLogGroup(error),
            Err(error) => Self::Rusoto(error),
        }
    }
}

impl From<RusotoError<CreateLogStreamError>> for TransportError {
    fn from(error: RusotoError<CreateLogStreamError>) -> Self {
        match service(error) {
            Ok(error) => Self::CreateLogStream(error),
            Err(error) => Self::Rusoto(error),
        }
    }
}

impl From<RusotoError<DescribeLogStreamsError>> for TransportError {
    fn from(error: RusotoError<DescribeLogStreamsError>) -> Self {
        match service(error) {
            Ok(error) => Self::DescribeLogStreams(error),
            Err(error) => Self::Rusoto(error),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Rusoto(err) => write!(f, "{}", err),
            TransportError::PutLogEvents(err) => write!(f, "{}", err),
            TransportError::CreateLogGroup(err) => write!(f, "{}", err),
            TransportError::CreateLogStream(err) => write!(f, "{}", err),
            TransportError::DescribeLogStreams(err) => write!(f, "{}", err),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransportError::Rusoto(ref err) => Error::source(err),
            TransportError::PutLogEvents(ref err) => Error::source(err),
            TransportError::CreateLogGroup(ref err) => Error::source(err),
            TransportError::CreateLogStream(ref err) => Error::source(err),
            TransportError::DescribeLogStreams(ref err) => Error::source(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_maps_to_its_own_variant() {
        let error: RusotoError<PutLogEventsError> =
            RusotoError::Service(PutLogEventsError::ServiceUnavailable("down".to_string()));
        match TransportError::from(error) {
            TransportError::PutLogEvents(PutLogEventsError::ServiceUnavailable(msg)) => {
                assert_eq!(msg, "down");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn transport_level_error_maps_to_rusoto_variant() {
        let error: RusotoError<CreateLogStreamError> =
            RusotoError::Validation("bad request".to_string());
        match TransportError::from(error) {
            TransportError::Rusoto(RusotoError::Validation(msg)) => {
                assert_eq!(msg, "bad request");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn display_forwards_to_inner_error() {
        let error = TransportError::PutLogEvents(PutLogEventsError::InvalidSequenceToken(
            "expected token".to_string(),
        ));
        assert!(!error.to_string().is_empty());
    }
}
