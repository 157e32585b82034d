/// Compile-time remoting id generator using the CRC-64 scheme.
///
/// The argument is the fully qualified name, e.g. `"Example.IKeyValueStore"`
/// for an interface or `"Example.IKeyValueStore.GetValue"` for a method. The
/// result equals what `compute_interface_id` / `compute_method_id` return for
/// `IdScheme::Crc64`, so ids can be pinned as constants:
///
/// ```rust,no_run
/// use fabric_remoting_service::{IdScheme, compute_interface_id, remoting_id};
/// const STORE_ID: i32 = remoting_id!("Example.IKeyValueStore");
/// assert_eq!(STORE_ID, compute_interface_id(IdScheme::Crc64, "Example", "IKeyValueStore"));
/// ```
#[macro_export]
macro_rules! remoting_id {
    ($name:literal) => {{
        const ID: i32 = $crate::crc64_id($name);
        ID
    }};
}
