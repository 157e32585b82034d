mod body;
mod exception;
mod headers;
mod request_response;
mod result_status;

pub use body::{NamedArgument, RequestBody, ResponseBody};
pub use exception::{
    ApplicationFault, EXCEPTION_PAYLOAD_CODEC, ExceptionInformation, RemoteExceptionType,
};
pub use headers::{HeaderError, RemotingMessageHeaders, RemotingResponseHeaders};
pub use request_response::{EventSubscriptionRequest, RemotingRequest, RemotingResponse};
pub use result_status::RemotingResultStatus;
