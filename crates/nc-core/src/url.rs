//! URL classification and no-cookie rewriting
//!
//! Everything here is a pure function of the input string. Parsing failures
//! are folded into "not a video" so callers never have to handle them.

use url::Url;

use crate::types::UrlClassification;

// =============================================================================
// Host and Path Tokens
// =============================================================================

/// Site token replaced throughout a video URL.
pub const SITE_TOKEN: &str = "youtube";

/// Replacement for [`SITE_TOKEN`].
pub const NO_COOKIE_TOKEN: &str = "yout-ube";

/// Host substring identifying an already rewritten URL.
pub const NO_COOKIE_HOST: &str = "yout-ube.com";

/// Host substring of the canonical video site (matches `www.` and `m.`).
pub const VIDEO_HOST: &str = "youtube.com";

/// Short-link host. Every path on it is a video.
pub const SHORT_LINK_HOST: &str = "youtu.be";

/// Path substrings that mark a playable video page.
pub const VIDEO_PATH_SEGMENTS: [&str; 4] = ["/watch", "/shorts/", "/embed/", "/live/"];

// =============================================================================
// Host Checks
// =============================================================================

/// Parse a URL and return its lowercased host, if it has one.
#[inline]
fn parse_with_host(url: &str) -> Option<(Url, String)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some((parsed, host))
}

/// Whether the host is already on the no-cookie domain.
#[inline]
pub fn is_no_cookie_host(host: &str) -> bool {
    host.contains(NO_COOKIE_HOST)
}

/// Whether a URL belongs to the hosts the navigation listeners watch.
///
/// Mirrors the listener filter: host contains `youtube.com` or host equals
/// `youtu.be`. Rewritten hosts are not included.
pub fn is_monitored_host(url: &str) -> bool {
    match parse_with_host(url) {
        Some((_, host)) => host.contains(VIDEO_HOST) || host == SHORT_LINK_HOST,
        None => false,
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Which kind of video URL matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VideoKind {
    /// `youtu.be/<id>`
    ShortLink,
    /// Canonical host with a recognized path segment.
    Canonical,
}

fn video_kind(parsed: &Url, host: &str) -> Option<VideoKind> {
    if is_no_cookie_host(host) {
        return None;
    }

    if host == SHORT_LINK_HOST {
        return Some(VideoKind::ShortLink);
    }

    let path = parsed.path();
    if host.contains(VIDEO_HOST) && VIDEO_PATH_SEGMENTS.iter().any(|segment| path.contains(segment)) {
        Some(VideoKind::Canonical)
    } else {
        None
    }
}

/// Check if a URL points at a playable video on the canonical site.
///
/// Already rewritten URLs are never video URLs, which keeps the rewrite from
/// looping on its own output.
pub fn is_video_url(url: &str) -> bool {
    match parse_with_host(url) {
        Some((parsed, host)) => video_kind(&parsed, &host).is_some(),
        None => {
            log::debug!("unparseable url: {}", url);
            false
        }
    }
}

/// Expand `youtu.be/<id>?<query>#<frag>` into a watch URL on the no-cookie host.
///
/// The short-link host has no site token to substitute, so it is the one
/// case that is rebuilt instead of rewritten in place.
fn expand_short_link(parsed: &Url) -> String {
    let id = parsed
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("");

    let mut out = format!("{}://www.{}/watch?v={}", parsed.scheme(), NO_COOKIE_HOST, id);
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        out.push('&');
        out.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn lands_on_no_cookie_host(url: &str) -> bool {
    parse_with_host(url).is_some_and(|(_, host)| is_no_cookie_host(&host))
}

/// Classify a URL and produce its no-cookie rewrite when it is a video.
///
/// The rewrite is a literal token substitution over the whole string so the
/// query, fragment and path survive byte for byte.
pub fn classify(url: &str) -> UrlClassification {
    let Some((parsed, host)) = parse_with_host(url) else {
        log::debug!("unparseable url: {}", url);
        return UrlClassification::default();
    };

    let converted = match video_kind(&parsed, &host) {
        Some(VideoKind::ShortLink) => expand_short_link(&parsed),
        Some(VideoKind::Canonical) => url.replace(SITE_TOKEN, NO_COOKIE_TOKEN),
        None => return UrlClassification::default(),
    };

    // The substitution is case-sensitive while the host match is not, so a
    // mixed-case host can come out unchanged with only its query rewritten.
    let rewritten = if converted != url && lands_on_no_cookie_host(&converted) {
        Some(converted)
    } else {
        None
    };

    log::debug!("classified {} -> {:?}", url, rewritten);

    UrlClassification {
        is_video: true,
        rewritten,
    }
}

/// Shorthand for `classify(url).rewritten`.
#[inline]
pub fn rewrite_url(url: &str) -> Option<String> {
    classify(url).rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_watch_url_is_rewritten() {
        let result = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(result.is_video);
        assert_eq!(
            result.rewritten.as_deref(),
            Some("https://www.yout-ube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_short_link_is_rewritten() {
        assert_eq!(
            rewrite_url("https://youtu.be/dQw4w9WgXcQ"),
            Some("https://www.yout-ube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            rewrite_url("https://youtu.be/dQw4w9WgXcQ?t=42#top"),
            Some("https://www.yout-ube.com/watch?v=dQw4w9WgXcQ&t=42#top".to_string())
        );
    }

    #[test]
    fn test_shorts_keep_path() {
        assert_eq!(
            rewrite_url("https://www.youtube.com/shorts/abc123def"),
            Some("https://www.yout-ube.com/shorts/abc123def".to_string())
        );
    }

    #[test]
    fn test_mobile_embed_and_live() {
        assert_eq!(
            rewrite_url("https://m.youtube.com/embed/xyz?start=30#t"),
            Some("https://m.yout-ube.com/embed/xyz?start=30#t".to_string())
        );
        assert_eq!(
            rewrite_url("https://www.youtube.com/live/abc"),
            Some("https://www.yout-ube.com/live/abc".to_string())
        );
    }

    #[test]
    fn test_browse_pages_untouched() {
        assert_eq!(classify("https://www.youtube.com/"), UrlClassification::default());
        assert_eq!(classify("https://www.youtube.com/feed/trending"), UrlClassification::default());
        assert_eq!(classify("https://www.youtube.com/@channel/videos"), UrlClassification::default());
    }

    #[test]
    fn test_rewritten_host_is_ignored() {
        assert!(!is_video_url("https://www.yout-ube.com/embed/abc"));
        assert_eq!(rewrite_url("https://www.yout-ube.com/watch?v=abc"), None);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(classify("not a url"), UrlClassification::default());
        assert_eq!(classify(""), UrlClassification::default());
        assert_eq!(classify("mailto:someone@youtube.com"), UrlClassification::default());
    }

    #[test]
    fn test_other_hosts() {
        assert!(!is_video_url("https://example.com/watch?v=abc"));
        assert!(!is_monitored_host("https://example.com/watch?v=abc"));
        assert!(is_monitored_host("https://music.youtube.com/"));
        assert!(is_monitored_host("https://youtu.be/abc"));
        assert!(!is_monitored_host("https://www.yout-ube.com/watch?v=abc"));
    }

    #[test]
    fn test_uppercase_host_without_token() {
        let result = classify("https://www.YOUTUBE.com/watch?v=abc");
        assert!(result.is_video);
        assert_eq!(result.rewritten, None);
    }

    #[test]
    fn test_mixed_case_host_keeps_query_intact() {
        let result = classify("https://www.YOUTUBE.com/watch?v=youtube");
        assert!(result.is_video);
        assert_eq!(result.rewritten, None);

        let result = classify("https://m.YouTube.com/shorts/youtube-clip");
        assert!(result.is_video);
        assert_eq!(result.rewritten, None);
    }

    fn video_path() -> impl Strategy<Value = String> {
        (
            prop::sample::select(VIDEO_PATH_SEGMENTS.to_vec()),
            "[A-Za-z0-9_-]{0,16}",
        )
            .prop_map(|(segment, tail)| format!("{}{}", segment, tail))
    }

    fn subdomain() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["", "www.", "m.", "music."])
    }

    proptest! {
        #[test]
        fn prop_rewritten_host_never_rewritten(sub in subdomain(), path in video_path(), query in "[a-z0-9=&]{0,12}") {
            let url = format!("https://{}yout-ube.com{}?{}", sub, path, query);
            prop_assert_eq!(classify(&url), UrlClassification::default());
        }

        #[test]
        fn prop_short_link_always_rewritten(path in "(/[A-Za-z0-9_-]{0,12}){0,3}") {
            let url = format!("https://youtu.be{}", path);
            let result = classify(&url);
            prop_assert!(result.is_video);
            prop_assert!(result.rewritten.is_some());
        }

        #[test]
        fn prop_unrecognized_paths_not_rewritten(sub in subdomain(), path in "/(feed|results|channel|@)[a-z]{0,12}") {
            let url = format!("https://{}youtube.com{}", sub, path);
            prop_assert_eq!(rewrite_url(&url), None);
        }

        #[test]
        fn prop_rewrite_is_final(sub in subdomain(), path in video_path(), id in "[A-Za-z0-9]{1,11}") {
            let url = format!("https://{}youtube.com{}?v={}", sub, path, id);
            let rewritten = rewrite_url(&url).expect("video url should rewrite");
            let suffix = format!("?v={}", id);
            prop_assert!(rewritten.ends_with(&suffix));
            prop_assert_eq!(rewrite_url(&rewritten), None);
        }
    }
}
