mod generate_invocation_id;
pub use generate_invocation_id::generate_invocation_id;
