// src/model/mod.rs
// =============================================================================
// The bookmark data the checker operates on.
//
// Submodules:
// - site_link: one bookmark (SiteLink) and the LinkStatus values
// - group: named groups, the collection file, duplicate detection
// =============================================================================

mod group;
mod site_link;

pub use group::{
    compare_urls, filtered_sorted, strip_protocol, LinkCollection, LinkGroup, SameUrls,
    UNSORTED_NAME,
};
pub use site_link::{aggregate_status, LinkSnapshot, LinkStatus, SiteLink, SiteLinkSnapshot};
