use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Outcome of a request, carried in the response headers.
#[repr(u8)]
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
pub enum RemotingResultStatus {
    Success = 0,
    /// The handler returned an application fault; the body carries an
    /// `ExceptionInformation` envelope.
    ApplicationFault = 1,
    /// The endpoint failed outside of the handler (decode error, panic, ...);
    /// the body carries a UTF-8 message.
    SystemFault = 2,
    InterfaceNotFound = 3,
    MethodNotFound = 4,
    Canceled = 5,
}

impl RemotingResultStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        self == RemotingResultStatus::Success
    }
}
