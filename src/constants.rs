/// Name of the request header that turns a request into a cancellation
/// signal for a previously sent call with the same invocation id.
pub const CANCELLATION_HEADER_NAME: &str = "CancellationHeader";

/// Name of the header carrying the subscription id on one-way event messages
/// sent from an actor to its subscribers.
pub const SUBSCRIPTION_ID_HEADER_NAME: &str = "SubscriptionId";

/// Reserved interface id addressing the event subscription control surface of
/// an actor endpoint. User interfaces may never hash to this value.
pub const EVENT_SUBSCRIPTION_INTERFACE_ID: i32 = i32::MIN;

/// Control method id: add a subscription.
pub const SUBSCRIBE_METHOD_ID: i32 = 1;

/// Control method id: remove a subscription.
pub const UNSUBSCRIBE_METHOD_ID: i32 = 2;

/// Argument name used for the return value in unwrapped response bodies.
pub const RETURN_VALUE_ARGUMENT_NAME: &str = "retVal";

/// Largest encoded frame a transport accepts before failing the send.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024 * 4;

/// Number of frames a connection channel holds before applying backpressure.
pub const DEFAULT_TRANSPORT_CHANNEL_BUFFER_SIZE: usize = 64;

/// Seconds a request may wait for its response before the transport reports
/// a timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
