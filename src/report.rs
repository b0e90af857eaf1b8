// src/report.rs
// =============================================================================
// Prints check results, either as a table or as JSON.
// =============================================================================

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use bookmark_guardian::model::{SiteLink, SiteLinkSnapshot};
use bookmark_guardian::LinkStatus;

/// One checked list (a group, the unsorted links, or an ad-hoc check).
pub struct CheckedList {
    pub name: String,
    pub sites: Vec<Arc<SiteLink>>,
}

#[derive(Serialize)]
struct ListReport<'a> {
    name: &'a str,
    sites: Vec<SiteLinkSnapshot>,
}

/// Number of sites whose aggregate status is anything but Okay.
pub fn problem_count(lists: &[CheckedList]) -> usize {
    lists
        .iter()
        .flat_map(|list| &list.sites)
        .filter(|site| site.status() != LinkStatus::Okay)
        .count()
}

pub fn print_results(lists: &[CheckedList], json: bool) -> Result<()> {
    if json {
        let reports: Vec<ListReport> = lists
            .iter()
            .map(|list| ListReport {
                name: &list.name,
                sites: list.sites.iter().map(|site| site.snapshot()).collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for list in lists {
            print_table(list);
        }
        print_summary(lists);
    }
    Ok(())
}

// Prints one list as a human-readable table
fn print_table(list: &CheckedList) {
    println!("\n📁 {}", list.name);
    println!("{:<70} {:<18}", "URL", "STATUS");
    println!("{}", "=".repeat(88));

    for site in &list.sites {
        let snapshot = site.snapshot();
        let label = snapshot
            .links
            .first()
            .map(|link| link.label.as_str())
            .unwrap_or("(empty)");
        println!("{:<70} {:<18}", truncate(label, 70), format_status(snapshot.status));

        // The per-URL lines only add something when there are several
        if snapshot.links.len() > 1 {
            for link in &snapshot.links {
                println!("  {:<68} {:<18}", truncate(&link.url, 68), format_status(link.status));
            }
        } else if let Some(link) = snapshot.links.first() {
            println!("  {}", truncate(&link.url, 68));
        }
    }
}

fn print_summary(lists: &[CheckedList]) {
    let total: usize = lists.iter().map(|list| list.sites.len()).sum();
    let problems = problem_count(lists);

    println!();
    println!("📊 Summary:");
    println!("   ✅ OK: {}", total - problems);
    println!("   ❌ Needs attention: {}", problems);
    println!("   📋 Total: {}", total);
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn format_status(status: LinkStatus) -> &'static str {
    match status {
        LinkStatus::Okay => "✅ OK",
        LinkStatus::Unchecked => "⏳ UNCHECKED",
        LinkStatus::Invalid => "🚫 INVALID",
        LinkStatus::Missing => "❌ MISSING",
        LinkStatus::Failed => "⚠️  FAILED",
        LinkStatus::Redirected => "🔀 REDIRECTED",
        LinkStatus::Forbidden => "🔒 FORBIDDEN",
        LinkStatus::Mixed => "🔁 MIXED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_problem_count() {
        let ok = Arc::new(SiteLink::new("http://a.com", "a").unwrap());
        ok.set_status(0, LinkStatus::Okay).unwrap();
        let missing = Arc::new(SiteLink::new("http://b.com", "b").unwrap());
        missing.set_status(0, LinkStatus::Missing).unwrap();
        let lists = vec![CheckedList {
            name: "g".to_string(),
            sites: vec![ok, missing, Arc::new(SiteLink::default())],
        }];
        assert_eq!(problem_count(&lists), 2);
    }
}
