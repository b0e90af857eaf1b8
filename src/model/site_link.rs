// src/model/site_link.rs
// =============================================================================
// The bookmark entity the checking engine works on.
//
// A SiteLink bundles one or more alternative URLs for the same site. Each URL
// has a label and a LinkStatus. The three lists always have the same length,
// and the site-level (aggregate) status is derived from the per-URL statuses.
//
// The checker and whatever displays the bookmarks both touch this entity, so
// all state lives behind one lock and the checker only uses two atomic
// operations on it: begin_check() and commit_statuses().
// =============================================================================

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Outcome of checking a URL (or the summary for a whole site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    /// Never checked, or edited since the last check
    Unchecked,
    /// Malformed URL or not http/https - never sent over the network
    Invalid,
    /// The server answered with a success (or equivalent) status
    Okay,
    /// 404, 410 and friends
    Missing,
    /// No response, transport error or an unclassified status
    Failed,
    /// The resource moved somewhere that is not the same resource
    Redirected,
    /// Authentication or legal restrictions
    Forbidden,
    /// Site-level only: the URLs of the site disagree
    Mixed,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkStatus::Unchecked => "Unchecked",
            LinkStatus::Invalid => "Invalid",
            LinkStatus::Okay => "Okay",
            LinkStatus::Missing => "Missing",
            LinkStatus::Failed => "Failed",
            LinkStatus::Redirected => "Redirected",
            LinkStatus::Forbidden => "Forbidden",
            LinkStatus::Mixed => "Mixed",
        };
        f.write_str(name)
    }
}

/// Summarises per-URL statuses: `Invalid` when empty, the shared status when
/// they all agree, `Mixed` otherwise.
pub fn aggregate_status(statuses: &[LinkStatus]) -> LinkStatus {
    match statuses.split_first() {
        None => LinkStatus::Invalid,
        Some((first, rest)) => {
            if rest.iter().all(|s| s == first) {
                *first
            } else {
                LinkStatus::Mixed
            }
        }
    }
}

// Everything guarded by the entity lock
#[derive(Debug, Default)]
struct Links {
    urls: Vec<String>,
    labels: Vec<String>,
    statuses: Vec<LinkStatus>,
    important: bool,
    deprecated: bool,
    checking: bool,
}

impl Links {
    fn check_index(&self, index: usize) -> Result<(), ModelError> {
        if index < self.urls.len() {
            Ok(())
        } else {
            Err(ModelError::IndexOutOfRange {
                index,
                len: self.urls.len(),
            })
        }
    }
}

/// A bookmark: one site, one or more alternative URLs.
///
/// Shared between the checker and the rest of the program as `Arc<SiteLink>`.
#[derive(Debug, Default)]
pub struct SiteLink {
    inner: Mutex<Links>,
}

/// One URL of a site, as captured by [`SiteLink::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSnapshot {
    pub url: String,
    pub label: String,
    pub status: LinkStatus,
}

/// Serializable copy of a site, used for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteLinkSnapshot {
    pub status: LinkStatus,
    pub important: bool,
    pub deprecated: bool,
    pub links: Vec<LinkSnapshot>,
}

fn require(value: &str, field: &'static str) -> Result<(), ModelError> {
    if value.is_empty() {
        Err(ModelError::EmptyField { field })
    } else {
        Ok(())
    }
}

impl SiteLink {
    /// Creates a site with a single URL. Neither argument may be empty.
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Result<Self, ModelError> {
        let site = Self::default();
        site.append_link(url, label)?;
        Ok(site)
    }

    // ---- read-only accessors ------------------------------------------------

    pub fn link_count(&self) -> usize {
        self.inner.lock().urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().urls.is_empty()
    }

    pub fn url_at(&self, index: usize) -> Option<String> {
        self.inner.lock().urls.get(index).cloned()
    }

    pub fn label_at(&self, index: usize) -> Option<String> {
        self.inner.lock().labels.get(index).cloned()
    }

    pub fn status_at(&self, index: usize) -> Option<LinkStatus> {
        self.inner.lock().statuses.get(index).copied()
    }

    /// All URLs, in order.
    pub fn urls(&self) -> Vec<String> {
        self.inner.lock().urls.clone()
    }

    /// All per-URL statuses, in order.
    pub fn statuses(&self) -> Vec<LinkStatus> {
        self.inner.lock().statuses.clone()
    }

    /// Aggregate status of the site.
    pub fn status(&self) -> LinkStatus {
        aggregate_status(&self.inner.lock().statuses)
    }

    /// True while a checker owns this site.
    pub fn is_checking(&self) -> bool {
        self.inner.lock().checking
    }

    pub fn is_important(&self) -> bool {
        self.inner.lock().important
    }

    pub fn set_important(&self, important: bool) {
        self.inner.lock().important = important;
    }

    pub fn is_deprecated(&self) -> bool {
        self.inner.lock().deprecated
    }

    pub fn set_deprecated(&self, deprecated: bool) {
        self.inner.lock().deprecated = deprecated;
    }

    /// Consistent copy of everything, taken under one lock.
    pub fn snapshot(&self) -> SiteLinkSnapshot {
        let links = self.inner.lock();
        SiteLinkSnapshot {
            status: aggregate_status(&links.statuses),
            important: links.important,
            deprecated: links.deprecated,
            links: links
                .urls
                .iter()
                .zip(&links.labels)
                .zip(&links.statuses)
                .map(|((url, label), status)| LinkSnapshot {
                    url: url.clone(),
                    label: label.clone(),
                    status: *status,
                })
                .collect(),
        }
    }

    // ---- operations used by the checker -------------------------------------

    /// Marks the site as being checked and returns the current statuses.
    ///
    /// Only one check may be in flight per site: fails with
    /// `AlreadyChecking` if the flag is already set.
    pub fn begin_check(&self) -> Result<Vec<LinkStatus>, ModelError> {
        let mut links = self.inner.lock();
        if links.checking {
            return Err(ModelError::AlreadyChecking);
        }
        links.checking = true;
        Ok(links.statuses.clone())
    }

    /// Replaces every per-URL status and clears the checking flag.
    ///
    /// Fails (leaving the site untouched) if the vector length is wrong.
    pub fn commit_statuses(&self, statuses: Vec<LinkStatus>) -> Result<(), ModelError> {
        let mut links = self.inner.lock();
        if statuses.len() != links.urls.len() {
            return Err(ModelError::LengthMismatch {
                expected: links.urls.len(),
                actual: statuses.len(),
            });
        }
        links.statuses = statuses;
        links.checking = false;
        Ok(())
    }

    /// Clears the checking flag without touching any status.
    pub fn end_check(&self) {
        self.inner.lock().checking = false;
    }

    /// Turns `http://...` at `index` into `https://...`.
    pub fn rewrite_url_to_https(&self, index: usize) -> Result<(), ModelError> {
        let mut links = self.inner.lock();
        links.check_index(index)?;
        let url = &mut links.urls[index];
        if !url.starts_with("http:") {
            return Err(ModelError::NotHttp {
                index,
                url: url.clone(),
            });
        }
        url.insert(4, 's');
        Ok(())
    }

    // ---- editing -------------------------------------------------------------

    /// Adds a URL at the end; its status starts as `Unchecked`.
    pub fn append_link(
        &self,
        url: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<(), ModelError> {
        let (url, label) = (url.into(), label.into());
        require(&url, "url")?;
        require(&label, "label")?;
        let mut links = self.inner.lock();
        links.urls.push(url);
        links.labels.push(label);
        links.statuses.push(LinkStatus::Unchecked);
        Ok(())
    }

    /// Inserts a URL before `index` (`index == link_count()` appends).
    pub fn insert_link(
        &self,
        index: usize,
        url: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<(), ModelError> {
        let (url, label) = (url.into(), label.into());
        require(&url, "url")?;
        require(&label, "label")?;
        let mut links = self.inner.lock();
        if index > links.urls.len() {
            return Err(ModelError::IndexOutOfRange {
                index,
                len: links.urls.len(),
            });
        }
        links.urls.insert(index, url);
        links.labels.insert(index, label);
        links.statuses.insert(index, LinkStatus::Unchecked);
        Ok(())
    }

    pub fn delete_link(&self, index: usize) -> Result<(), ModelError> {
        let mut links = self.inner.lock();
        links.check_index(index)?;
        links.urls.remove(index);
        links.labels.remove(index);
        links.statuses.remove(index);
        Ok(())
    }

    /// Moves the link at `index` so it lands in front of what is currently at
    /// `to` (`to == link_count()` moves it to the end).
    pub fn move_link(&self, index: usize, to: usize) -> Result<(), ModelError> {
        let mut links = self.inner.lock();
        links.check_index(index)?;
        if to > links.urls.len() {
            return Err(ModelError::IndexOutOfRange {
                index: to,
                len: links.urls.len(),
            });
        }
        if index == to {
            return Ok(());
        }
        let target = if index < to { to - 1 } else { to };
        let url = links.urls.remove(index);
        let label = links.labels.remove(index);
        let status = links.statuses.remove(index);
        links.urls.insert(target, url);
        links.labels.insert(target, label);
        links.statuses.insert(target, status);
        Ok(())
    }

    /// Replaces a URL. Returns `Ok(true)` if it changed, in which case its
    /// status goes back to `Unchecked`.
    pub fn set_url(&self, index: usize, url: impl Into<String>) -> Result<bool, ModelError> {
        let url = url.into();
        require(&url, "url")?;
        let mut links = self.inner.lock();
        links.check_index(index)?;
        if links.urls[index] == url {
            return Ok(false);
        }
        links.urls[index] = url;
        links.statuses[index] = LinkStatus::Unchecked;
        Ok(true)
    }

    pub fn set_label(&self, index: usize, label: impl Into<String>) -> Result<bool, ModelError> {
        let label = label.into();
        require(&label, "label")?;
        let mut links = self.inner.lock();
        links.check_index(index)?;
        if links.labels[index] == label {
            return Ok(false);
        }
        links.labels[index] = label;
        Ok(true)
    }

    pub fn set_status(&self, index: usize, status: LinkStatus) -> Result<(), ModelError> {
        let mut links = self.inner.lock();
        links.check_index(index)?;
        links.statuses[index] = status;
        Ok(())
    }
}
