//! Subscriber hashes.
//!
//! List members are addressed by the MD5 hex digest of their lowercased email
//! address, e.g. `lists/{list_id}/members/{subscriber_hash}`.

use md5::{Digest, Md5};

pub fn subscriber_hash(email: &str) -> String {
    hex::encode(Md5::digest(email.to_lowercase().as_bytes()))
}
