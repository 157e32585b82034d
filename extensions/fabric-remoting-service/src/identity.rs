use crc::{CRC_64_XZ, Crc};
use serde::{Deserialize, Serialize};
use xxhash_rust::const_xxh3::xxh3_64 as const_xxh3_64;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// Multiplier of the legacy additive hash combination.
const LEGACY_HASH_MULTIPLIER: i32 = 0xA555_5529_u32 as i32;

/// The two generations of interface/method id computation.
///
/// Both sides of a call must agree on the scheme; endpoints can accept
/// several at once (see `RemotingSettings::accepted_id_schemes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdScheme {
    /// Additive, order-sensitive combination of per-string hashes.
    Legacy,
    /// CRC-64 of the fully qualified name, truncated to 32 bits.
    #[default]
    Crc64,
}

/// Per-string hash of the legacy scheme: xxh3-64 truncated to 32 bits.
pub const fn legacy_string_hash(value: &str) -> i32 {
    const_xxh3_64(value.as_bytes()) as i32
}

pub const fn legacy_hash_combine(new_key: i32, current_key: i32) -> i32 {
    current_key
        .wrapping_mul(LEGACY_HASH_MULTIPLIER)
        .wrapping_add(new_key)
}

pub const fn legacy_interface_id(namespace: &str, name: &str) -> i32 {
    let hash = legacy_string_hash(name);
    if namespace.is_empty() {
        hash
    } else {
        legacy_hash_combine(legacy_string_hash(namespace), hash)
    }
}

pub const fn legacy_method_id(namespace: &str, type_name: &str, method_name: &str) -> i32 {
    let mut hash = legacy_string_hash(method_name);
    if !namespace.is_empty() {
        hash = legacy_hash_combine(legacy_string_hash(namespace), hash);
    }
    legacy_hash_combine(legacy_string_hash(type_name), hash)
}

/// CRC-64/XZ of an already qualified name, keeping the low 32 bits.
pub const fn crc64_id(qualified_name: &str) -> i32 {
    CRC64.checksum(qualified_name.as_bytes()) as i32
}

fn crc64_id_of_parts(parts: &[&str]) -> i32 {
    let mut digest = CRC64.digest();
    let mut first = true;
    for part in parts.iter().filter(|part| !part.is_empty()) {
        if !first {
            digest.update(b".");
        }
        digest.update(part.as_bytes());
        first = false;
    }
    digest.finalize() as i32
}

/// Computes the id of an interface from its namespace and name.
pub fn compute_interface_id(scheme: IdScheme, namespace: &str, name: &str) -> i32 {
    match scheme {
        IdScheme::Legacy => legacy_interface_id(namespace, name),
        IdScheme::Crc64 => crc64_id_of_parts(&[namespace, name]),
    }
}

/// Computes the id of a method from its declaring interface's namespace and
/// name plus the method name.
pub fn compute_method_id(
    scheme: IdScheme,
    namespace: &str,
    type_name: &str,
    method_name: &str,
) -> i32 {
    match scheme {
        IdScheme::Legacy => legacy_method_id(namespace, type_name, method_name),
        IdScheme::Crc64 => crc64_id_of_parts(&[namespace, type_name, method_name]),
    }
}
