use sha2::{Digest, Sha256};

const DECK_ID_FLOOR: u64 = 1_000_000_000;
const DECK_ID_SPAN: u64 = 9_000_000_000;

fn digest_u64(namespace: &str, key: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update([0u8]);
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Deterministic deck/model identifier in `[1e9, 1e10)`.
///
/// Derived from SHA-256 so the same name maps to the same id on every run and platform.
pub fn stable_id(namespace: &str, name: &str) -> i64 {
    (DECK_ID_FLOOR + digest_u64(namespace, name) % DECK_ID_SPAN) as i64
}

/// Deterministic positive 52-bit identifier for notes and cards.
pub fn stable_wide_id(namespace: &str, key: &str) -> i64 {
    ((digest_u64(namespace, key) >> 12) | 1) as i64
}

/// Note guid: first 20 hex chars of the content digest.
pub fn note_guid(key: &str) -> String {
    let digest = Sha256::digest(format!("guid\0{key}").as_bytes());
    hex::encode(&digest[..10])
}

/// Anki's first-field checksum column; here the leading 32 bits of SHA-256.
pub fn field_checksum(field: &str) -> i64 {
    let digest = Sha256::digest(field.as_bytes());
    i64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}
