//! Metadata fingerprinting for drift detection.
//!
//! The fingerprint is an MD5 over a canonical serialization of a *projected*
//! copy of the item's metadata: volatile fields are stripped first, so two
//! copies that differ only in links, per-run match annotations or the
//! fingerprint field itself hash identically. `serde_json`'s object map
//! keeps keys sorted, so equal projections serialize to equal bytes no
//! matter what order fields arrived in.

use md5::{Digest, Md5};
use serde_json::{Map, Value};

use crate::remote::RemoteItem;

/// A top-level metadata key is volatile when its name contains any of these
/// markers. `fingerprint` is in the list so a persisted fingerprint never
/// feeds back into its own recomputation.
pub const VOLATILE_KEY_MARKERS: &[&str] = &["Link", "Match", "status", "Url", "fingerprint"];

/// Keys additionally dropped for native documents, whose working size and
/// checksum are locally computed rather than remote-authoritative.
const NATIVE_LOCAL_KEYS: &[&str] = &["fileSize", "md5Checksum"];

fn is_volatile(key: &str) -> bool {
    VOLATILE_KEY_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Projection of an item's metadata with volatile fields removed.
pub fn projected(item: &RemoteItem) -> Result<Value, serde_json::Error> {
    let fields = match serde_json::to_value(item)? {
        Value::Object(fields) => fields,
        // RemoteItem always serializes to an object.
        other => return Ok(other),
    };
    let native = item.is_native_doc();
    let kept: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, _)| !is_volatile(key))
        .filter(|(key, _)| !(native && NATIVE_LOCAL_KEYS.contains(&key.as_str())))
        .collect();
    Ok(Value::Object(kept))
}

/// MD5 hex of a projection's canonical serialization.
pub fn digest_of(projection: &Value) -> String {
    let mut hasher = Md5::new();
    // to_vec on a Value cannot fail.
    hasher.update(serde_json::to_vec(projection).unwrap_or_default());
    hex::encode(hasher.finalize())
}

/// Fingerprint of an item's current metadata.
pub fn fingerprint(item: &RemoteItem) -> Result<String, serde_json::Error> {
    Ok(digest_of(&projected(item)?))
}
