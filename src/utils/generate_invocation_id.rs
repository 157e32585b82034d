use uuid::Uuid;

/// Produces a process-unique id correlating a cancellable call with any
/// cancellation request sent for it later.
#[inline]
pub fn generate_invocation_id() -> String {
    Uuid::new_v4().to_string()
}
