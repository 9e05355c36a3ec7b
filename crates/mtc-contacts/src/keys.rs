//! Cache keys owned by this crate.
//!
//! These live beside the gateway's `mautic_api:` entries in the same
//! [`CacheStore`](mtcbridge_client::CacheStore) and are cleared independently.

use mtcbridge_client::cache::digest;

/// Lifetime of form and segment option lists, in seconds.
pub const CATALOG_LIFETIME: u64 = 3600;

/// Prefix of every visitor segment-set entry.
pub const USER_SEGMENTS_PREFIX: &str = "mautic_integration:user_segments:";

/// Segment id -> label map.
pub const SEGMENT_OPTIONS_KEY: &str = "mautic_integration:segment_options";

/// Form id -> label map.
pub const FORM_OPTIONS_KEY: &str = "mautic_integration:form_options";

const FORM_DETAILS_PREFIX: &str = "mautic_integration:form_details:";

/// Segment-set entry for one tracking identifier. The identifier is hashed.
pub fn user_segments_key(tracking_id: &str) -> String {
    format!("{}{}", USER_SEGMENTS_PREFIX, digest(tracking_id))
}

/// Form details entry.
pub fn form_details_key(form_id: &str) -> String {
    format!("{}{}", FORM_DETAILS_PREFIX, form_id)
}
