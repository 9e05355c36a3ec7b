//! # mtc-contacts
//!
//! Visitor-facing views of Mautic data on top of the `mtcbridge-client`
//! gateway.
//!
//! ## Features
//!
//! - **Contact resolution** - tracking identifier to contact through an
//!   ordered list of lookup strategies
//! - **Visitor segments** - segment and tag names per visitor, cached
//! - **Catalogs** - form and segment option lists, form details and stats
//! - **Tracking sources** - pick the identifier from URL, cookie or bridged cookies
//!
//! ## Example
//!
//! ```rust,ignore
//! use mtcbridge_contacts::{ContactResolver, MauticRestClient, TrackingSources};
//!
//! let resolver = ContactResolver::new(MauticRestClient::new(client));
//! let sources = TrackingSources::new().with_mtc_id_cookie("42");
//! if let Some(id) = sources.tracking_id() {
//!     let segments = resolver.get_user_segments_by_tracking_id(&id).await;
//!     let vip = segments.contains("VIP");
//! }
//! ```

mod contact;
mod forms;
pub mod keys;
mod resolver;
mod rest;
mod segments;
mod tracking;

pub use contact::{
    extract_segment_names, is_numeric_id, ContactRecord, ContactTag, SegmentListing,
    SegmentMembership, SegmentSet,
};
pub use forms::{FormCatalog, FormStats};
pub use resolver::{
    default_strategies, is_searchable_id, ContactResolver, DirectIdLookup, FieldSearchLookup,
    LookupStrategy, VisitorInfo,
};
pub use rest::MauticRestClient;
pub use segments::SegmentCatalog;
pub use tracking::{TrackingSources, BRIDGED_COOKIE_NAMES};
