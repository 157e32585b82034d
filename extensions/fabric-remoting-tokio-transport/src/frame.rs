use bitcode::{Decode, Encode};
use fabric_remoting::{
    CodecError, CodecKind, RemotingMessageHeaders, RemotingRequest, RemotingResponse,
    RemotingResponseHeaders, TransportError, TransportErrorKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum FrameKind {
    /// Expects a `Response` frame with the same correlation id.
    Request,
    OneWay,
    Response,
}

/// One WebSocket binary message.
///
/// Headers are encoded with the header codec of the connection's
/// `SerializationProvider`; the body is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TransportFrame {
    pub correlation_id: u64,
    pub kind: FrameKind,
    pub headers: Vec<u8>,
    pub body: Vec<u8>,
}

impl TransportFrame {
    pub fn request(
        correlation_id: u64,
        request: RemotingRequest,
        codec: CodecKind,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            correlation_id,
            kind: FrameKind::Request,
            headers: request.headers.encode(codec).map_err(protocol_error)?,
            body: request.body,
        })
    }

    pub fn one_way(request: RemotingRequest, codec: CodecKind) -> Result<Self, TransportError> {
        Ok(Self {
            correlation_id: 0,
            kind: FrameKind::OneWay,
            headers: request.headers.encode(codec).map_err(protocol_error)?,
            body: request.body,
        })
    }

    pub fn response(
        correlation_id: u64,
        response: RemotingResponse,
        codec: CodecKind,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            correlation_id,
            kind: FrameKind::Response,
            headers: response.headers.encode(codec).map_err(protocol_error)?,
            body: response.body,
        })
    }

    pub fn into_request(self, codec: CodecKind) -> Result<RemotingRequest, TransportError> {
        let headers = RemotingMessageHeaders::decode(&self.headers, codec).map_err(protocol_error)?;
        Ok(RemotingRequest::new(headers, self.body))
    }

    pub fn into_response(self, codec: CodecKind) -> Result<RemotingResponse, TransportError> {
        let headers =
            RemotingResponseHeaders::decode(&self.headers, codec).map_err(protocol_error)?;
        Ok(RemotingResponse {
            headers,
            body: self.body,
        })
    }

    /// Encodes the frame, failing when it exceeds `max_message_size`.
    pub fn encode(&self, max_message_size: usize) -> Result<Vec<u8>, TransportError> {
        let bytes = bitcode::encode(self);
        if bytes.len() > max_message_size {
            return Err(TransportError::new(
                TransportErrorKind::MessageTooLarge,
                format!(
                    "frame of {} bytes exceeds the limit of {} bytes",
                    bytes.len(),
                    max_message_size
                ),
            ));
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8], max_message_size: usize) -> Result<Self, TransportError> {
        if bytes.len() > max_message_size {
            return Err(TransportError::new(
                TransportErrorKind::MessageTooLarge,
                format!(
                    "received frame of {} bytes exceeds the limit of {} bytes",
                    bytes.len(),
                    max_message_size
                ),
            ));
        }
        bitcode::decode(bytes)
            .map_err(|err| TransportError::new(TransportErrorKind::Protocol, err.to_string()))
    }
}

fn protocol_error(err: CodecError) -> TransportError {
    TransportError::new(TransportErrorKind::Protocol, err.to_string())
}
