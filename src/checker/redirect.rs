// src/checker/redirect.rs
// =============================================================================
// Decides whether a redirect actually moved a bookmark somewhere else.
//
// Lots of sites redirect without the bookmark being wrong:
// - http://x.com/a  ->  https://x.com/a          (HTTPS upgrade)
// - http://x.com/a  ->  http://x.com/a/          (trailing slash)
// - blog.x.com/p    ->  medium.com/m/global-identity?redirectUrl=<blog.x.com/p>
// - blog.x.com/p    ->  blog.x.com/p?gi=1234     (Medium tracking parameter)
// - x.com/p         ->  sso.x.com/login?service=<x.com/p>&gateway=true
//
// Reporting all of those as "Redirected" would bury the real moves, so they
// are recognised here. Anything not recognised is a genuine redirect.
// =============================================================================

/// What a redirect means for the bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// A real move: the bookmark points somewhere that redirects elsewhere
    None,
    /// Same resource under a cosmetically different URL
    SameResource,
    /// `http://` URL upgraded to the identical `https://` URL
    SchemeUpgrade,
}

// Identity services that carry the real URL, percent-encoded, as a suffix
const IDENTITY_PREFIXES: &[&str] = &[
    "https://medium.com/m/global-identity?redirectUrl=",
    "https://medium.com/m/global-identity-2?redirectUrl=",
];

// Login gateways: ...service=<encoded url>&gateway=true
const GATEWAY_PARAMS: &[&str] = &["?service=", "&service="];
const GATEWAY_SUFFIX: &str = "&gateway=true";

// Tracking parameter appended by Medium-hosted sites
const TRACKING_QUERY: &str = "?gi=";

/// Compares the original URL with the URL the server tried to redirect to.
pub fn resolve_redirect(original: &str, target: &str) -> RedirectOutcome {
    if is_same_resource(original, target) {
        RedirectOutcome::SameResource
    } else if is_scheme_upgrade(original, target) {
        RedirectOutcome::SchemeUpgrade
    } else {
        RedirectOutcome::None
    }
}

fn is_same_resource(original: &str, target: &str) -> bool {
    original == target
        || unwrap_wrapper(target).as_deref() == Some(original)
        || differs_by_trailing_slash(original, target)
        || has_tracking_query(original, target)
}

/// The `https` scheme is exactly the `http` one with an `s` inserted.
fn is_scheme_upgrade(original: &str, target: &str) -> bool {
    match original.strip_prefix("http:") {
        Some(rest) => target.strip_prefix("https:") == Some(rest),
        None => false,
    }
}

fn differs_by_trailing_slash(a: &str, b: &str) -> bool {
    let slashed = |short: &str, long: &str| long.strip_suffix('/') == Some(short);
    slashed(a, b) || slashed(b, a)
}

fn has_tracking_query(original: &str, target: &str) -> bool {
    !original.contains('?')
        && target
            .strip_prefix(original)
            .is_some_and(|rest| rest.starts_with(TRACKING_QUERY))
}

/// Extracts the real URL from a known redirect wrapper.
fn unwrap_wrapper(target: &str) -> Option<String> {
    let encoded = IDENTITY_PREFIXES
        .iter()
        .find_map(|prefix| target.strip_prefix(prefix))
        .or_else(|| gateway_payload(target))?;
    urlencoding::decode(encoded).ok().map(|url| url.into_owned())
}

fn gateway_payload(target: &str) -> Option<&str> {
    let without_suffix = target.strip_suffix(GATEWAY_SUFFIX)?;
    GATEWAY_PARAMS.iter().find_map(|param| {
        without_suffix
            .find(param)
            .map(|start| &without_suffix[start + param.len()..])
    })
}
