// src/model/group.rs
// =============================================================================
// Named groups of bookmarks and the collection file the CLI reads.
//
// A collection is a list of named groups plus a list of "unsorted" links.
// On disk it is JSON:
//
//   {
//     "groups": [
//       { "name": "Rust", "links": [
//           { "label": "Rust", "urls": ["https://www.rust-lang.org"] },
//           { "label": "Docs", "urls": [
//               "https://doc.rust-lang.org",
//               { "url": "http://docs.rs", "label": "docs.rs" } ] }
//       ] }
//     ],
//     "unsorted": [ { "label": "Example", "urls": ["http://example.com"] } ]
//   }
//
// This module also has the duplicate detection and sorting helpers used by
// the --dedupe flag.
// =============================================================================

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::site_link::SiteLink;
use crate::error::{CollectionError, ModelError};

/// Label used for the unsorted list when it is checked as one run.
pub const UNSORTED_NAME: &str = "Unsorted Links";

/// A named, ordered list of bookmarks.
#[derive(Debug, Clone, Default)]
pub struct LinkGroup {
    pub name: String,
    pub links: Vec<Arc<SiteLink>>,
}

impl LinkGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn push(&mut self, site: Arc<SiteLink>) {
        self.links.push(site);
    }

    /// Position of a specific site (by identity, not by URL).
    pub fn index_of(&self, site: &Arc<SiteLink>) -> Option<usize> {
        self.links.iter().position(|s| Arc::ptr_eq(s, site))
    }
}

/// Everything in one bookmark file.
#[derive(Debug, Clone, Default)]
pub struct LinkCollection {
    pub groups: Vec<LinkGroup>,
    pub unsorted: Vec<Arc<SiteLink>>,
}

// ---- file format --------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UrlEntry {
    Plain(String),
    Labeled { url: String, label: String },
}

#[derive(Debug, Deserialize)]
struct SiteEntry {
    label: String,
    #[serde(default)]
    urls: Vec<UrlEntry>,
    #[serde(default)]
    important: bool,
    #[serde(default)]
    deprecated: bool,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    name: String,
    #[serde(default)]
    links: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionFile {
    #[serde(default)]
    groups: Vec<GroupEntry>,
    #[serde(default)]
    unsorted: Vec<SiteEntry>,
}

fn build_site(entry: SiteEntry) -> Result<Arc<SiteLink>, ModelError> {
    let site = SiteLink::default();
    for url in entry.urls {
        match url {
            UrlEntry::Plain(url) => site.append_link(url, entry.label.as_str())?,
            UrlEntry::Labeled { url, label } => site.append_link(url, label)?,
        }
    }
    site.set_important(entry.important);
    site.set_deprecated(entry.deprecated);
    Ok(Arc::new(site))
}

fn build_sites(
    entries: Vec<SiteEntry>,
    group: &str,
) -> Result<Vec<Arc<SiteLink>>, CollectionError> {
    entries
        .into_iter()
        .map(|entry| {
            build_site(entry).map_err(|source| CollectionError::Model {
                group: group.to_string(),
                source,
            })
        })
        .collect()
}

impl LinkCollection {
    /// Parses a collection from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, CollectionError> {
        let file: CollectionFile = serde_json::from_str(text)?;
        let mut groups = Vec::with_capacity(file.groups.len());
        for entry in file.groups {
            let links = build_sites(entry.links, &entry.name)?;
            groups.push(LinkGroup {
                name: entry.name,
                links,
            });
        }
        let unsorted = build_sites(file.unsorted, UNSORTED_NAME)?;
        Ok(Self { groups, unsorted })
    }

    pub fn load(path: &Path) -> Result<Self, CollectionError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Total number of sites in groups and unsorted.
    pub fn site_count(&self) -> usize {
        self.groups.iter().map(LinkGroup::count).sum::<usize>() + self.unsorted.len()
    }
}

// ---- duplicates and ordering ---------------------------------------------------

/// How many URLs two sites share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameUrls {
    None,
    Some,
    All,
}

/// Compares the URL sets of two sites. `All` means every URL of each site
/// appears in the other.
pub fn compare_urls(one: &SiteLink, two: &SiteLink) -> SameUrls {
    let first = one.urls();
    let second = two.urls();
    if first.is_empty() || second.is_empty() {
        return SameUrls::None;
    }
    let first_hits = first.iter().filter(|u| second.contains(u)).count();
    let second_hits = second.iter().filter(|u| first.contains(u)).count();
    if first_hits == 0 {
        SameUrls::None
    } else if first_hits == first.len() && second_hits == second.len() {
        SameUrls::All
    } else {
        SameUrls::Some
    }
}

/// `"https://x.com/a"` -> `"x.com/a"`, `"mailto:me"` -> `"me"`.
pub fn strip_protocol(url: &str) -> &str {
    match url.split_once(':') {
        Some((_, rest)) => rest.strip_prefix("//").unwrap_or(rest),
        None => url,
    }
}

// Empty sites go last, otherwise compare the first URL without its scheme
fn site_order(a: &SiteLink, b: &SiteLink) -> Ordering {
    match (a.url_at(0), b.url_at(0)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => strip_protocol(&x).cmp(strip_protocol(&y)),
    }
}

/// Drops sites whose URLs exactly duplicate an earlier site, then sorts the
/// rest by first URL (ignoring the scheme).
pub fn filtered_sorted(sites: &[Arc<SiteLink>]) -> Vec<Arc<SiteLink>> {
    let mut keep = vec![true; sites.len()];
    for (i, earlier) in sites.iter().enumerate() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..sites.len() {
            if keep[j] && compare_urls(earlier, &sites[j]) == SameUrls::All {
                keep[j] = false;
            }
        }
    }
    let mut result: Vec<_> = sites
        .iter()
        .zip(keep)
        .filter(|(_, keep)| *keep)
        .map(|(site, _)| Arc::clone(site))
        .collect();
    result.sort_by(|a, b| site_order(a, b));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkStatus;

    fn site(urls: &[&str]) -> Arc<SiteLink> {
        let site = SiteLink::default();
        for url in urls {
            site.append_link(*url, "label").unwrap();
        }
        Arc::new(site)
    }

    #[test]
    fn test_from_json() {
        let text = r#"{
            "groups": [
                { "name": "Rust", "links": [
                    { "label": "Rust", "urls": ["https://www.rust-lang.org"], "important": true },
                    { "label": "Docs", "urls": [
                        "https://doc.rust-lang.org",
                        { "url": "http://docs.rs", "label": "docs.rs" }
                    ] }
                ] }
            ],
            "unsorted": [ { "label": "Empty" } ]
        }"#;
        let collection = LinkCollection::from_json(text).unwrap();
        assert_eq!(collection.groups.len(), 1);
        assert_eq!(collection.site_count(), 3);

        let rust = &collection.groups[0];
        assert_eq!(rust.name, "Rust");
        assert!(rust.links[0].is_important());
        assert_eq!(rust.links[1].label_at(0).as_deref(), Some("Docs"));
        assert_eq!(rust.links[1].label_at(1).as_deref(), Some("docs.rs"));
        assert_eq!(rust.links[1].status(), LinkStatus::Unchecked);

        assert!(collection.unsorted[0].is_empty());
    }

    #[test]
    fn test_from_json_reports_group_of_bad_entry() {
        let text =
            r#"{ "groups": [ { "name": "G", "links": [ { "label": "x", "urls": [""] } ] } ] }"#;
        let err = LinkCollection::from_json(text).unwrap_err();
        assert!(matches!(err, CollectionError::Model { ref group, .. } if group == "G"));
    }

    #[test]
    fn test_compare_urls() {
        let a = site(&["http://a.com", "http://b.com"]);
        let b = site(&["http://b.com", "http://a.com"]);
        let c = site(&["http://b.com"]);
        let d = site(&["http://d.com"]);
        assert_eq!(compare_urls(&a, &b), SameUrls::All);
        assert_eq!(compare_urls(&a, &c), SameUrls::Some);
        assert_eq!(compare_urls(&a, &d), SameUrls::None);
        assert_eq!(compare_urls(&a, &site(&[])), SameUrls::None);
    }

    #[test]
    fn test_strip_protocol() {
        assert_eq!(strip_protocol("https://x.com/a"), "x.com/a");
        assert_eq!(strip_protocol("mailto:me@x.com"), "me@x.com");
        assert_eq!(strip_protocol("x.com"), "x.com");
    }

    #[test]
    fn test_filtered_sorted() {
        let list = vec![
            site(&["https://zeta.org"]),
            site(&[]),
            site(&["http://alpha.org"]),
            site(&["https://zeta.org"]),
        ];
        let result = filtered_sorted(&list);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].url_at(0).as_deref(), Some("http://alpha.org"));
        assert_eq!(result[1].url_at(0).as_deref(), Some("https://zeta.org"));
        assert!(result[2].is_empty());
        // the first of the duplicates is the one kept
        assert!(Arc::ptr_eq(&result[1], &list[0]));
    }

    #[test]
    fn test_index_of_uses_identity() {
        let mut group = LinkGroup::new("g");
        let a = site(&["http://a.com"]);
        let twin = site(&["http://a.com"]);
        group.push(Arc::clone(&a));
        assert_eq!(group.index_of(&a), Some(0));
        assert_eq!(group.index_of(&twin), None);
    }
}
