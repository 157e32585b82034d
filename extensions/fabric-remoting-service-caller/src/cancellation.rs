use crate::{PartitionClient, RemotingError};
use fabric_remoting::{RemotingRequest, RemotingResponse};
use tokio_util::sync::CancellationToken;

/// Sends `request` and, if `cancellation` fires first, asks the server to
/// cancel it.
///
/// The original call is still awaited after the cancel request goes out; the
/// server decides whether it finished or observed the cancellation. When the
/// original completes while the cancel request is in flight, the cancel
/// request is dropped.
pub(crate) async fn request_with_cancellation(
    client: &PartitionClient,
    request: RemotingRequest,
    cancellation: Option<&CancellationToken>,
) -> Result<RemotingResponse, RemotingError> {
    let Some(token) = cancellation else {
        return client.request_response(request).await;
    };

    if token.is_cancelled() {
        return Err(RemotingError::Canceled);
    }

    let cancel_request = RemotingRequest::new(request.headers.to_cancellation_request(), Vec::new());
    let call = client.request_response(request);
    tokio::pin!(call);

    tokio::select! {
        result = &mut call => return result,
        _ = token.cancelled() => {}
    }

    tracing::debug!(
        "Canceling invocation {:?} of method {} on interface {}",
        cancel_request.headers.invocation_id,
        cancel_request.headers.method_id,
        cancel_request.headers.interface_id
    );

    let cancel = client.request_response(cancel_request);
    tokio::pin!(cancel);

    tokio::select! {
        result = &mut call => return result,
        delivered = &mut cancel => {
            if let Err(err) = delivered {
                tracing::debug!("Cancellation request was not delivered: {}", err);
            }
        }
    }

    call.await
}
