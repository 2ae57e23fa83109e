//! Image extraction.
//!
//! This is deliberately done with patterns over the raw markup instead of a
//! proper parse. Pages come from an untrusted relay and are frequently
//! truncated or malformed, in which case we simply fail to find anything.

use regex::Regex;
use url::Url;

/// Something that can find a representative image in a page's markup.
pub trait ImageExtractor: Send + Sync {
    /// Look for an image in `markup`, where `page_url` is the address the
    /// markup was fetched from.
    fn extract(&self, markup: &str, page_url: &str) -> Option<String>;
}

impl<F> ImageExtractor for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn extract(&self, markup: &str, page_url: &str) -> Option<String> {
        self(markup, page_url)
    }
}

/// Find the most representative image in some markup, returning it as an
/// absolute URL.
///
/// The following hints are tried in order, and the first one to match wins:
///
/// 1. `<meta property="og:image" content="...">`
/// 2. `<meta name="twitter:image" content="...">`
/// 3. `<meta name="twitter:image:src" content="...">`
/// 4. the first `<img>` inside a `<figure>`
/// 5. the first `<img>` anywhere
///
/// # Examples
///
/// ```rust
/// let markup = r#"<figure><img src="/img/x.jpg"></figure>"#;
///
/// let got = carimage::extract_image(markup, "https://example.com/a/b");
///
/// assert_eq!(got.as_deref(), Some("https://example.com/img/x.jpg"));
/// ```
pub fn extract_image(markup: &str, page_url: &str) -> Option<String> {
    let candidate = candidate(markup)?.as_str();
    log::trace!("Found \"{}\" in \"{}\"", candidate, page_url);

    Some(absolutize(candidate, page_url))
}

/// Resolve a (possibly relative) reference against the page it was found on.
///
/// Anything which can't be resolved is returned untouched.
pub fn absolutize(candidate: &str, page_url: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(candidate))
        .map(String::from)
        .unwrap_or_else(|e| {
            log::debug!(
                "Unable to resolve \"{}\" against \"{}\": {}",
                candidate,
                page_url,
                e
            );
            candidate.to_string()
        })
}

fn candidate(markup: &str) -> Option<regex::Match<'_>> {
    META.iter()
        .find_map(|patterns| earliest(patterns, markup))
        .or_else(|| capture(&FIGURE_IMG, markup))
        .or_else(|| capture(&ANY_IMG, markup))
}

fn capture<'m>(re: &Regex, markup: &'m str) -> Option<regex::Match<'m>> {
    re.captures(markup).and_then(|caps| caps.get(1))
}

/// The earliest match of any of the `patterns`.
fn earliest<'m>(
    patterns: &[Regex],
    markup: &'m str,
) -> Option<regex::Match<'m>> {
    patterns
        .iter()
        .filter_map(|re| capture(re, markup))
        .min_by_key(|m| m.start())
}

/// Matches a `<meta>` tag for `key`, regardless of whether the `content`
/// attribute comes before or after the `property`/`name`.
fn meta_patterns(key: &str) -> [Regex; 2] {
    let key = regex::escape(key);
    let name = format!(r#"(?:property|name)\s*=\s*["']{}["']"#, key);
    let content = r#"content\s*=\s*["']([^"']+)["']"#;

    [
        Regex::new(&format!(r"(?i)<meta\b[^>]*{}[^>]*{}", name, content))
            .unwrap(),
        Regex::new(&format!(r"(?i)<meta\b[^>]*{}[^>]*{}", content, name))
            .unwrap(),
    ]
}

lazy_static::lazy_static! {
    static ref META: Vec<[Regex; 2]> =
        ["og:image", "twitter:image", "twitter:image:src"]
        .iter()
        .map(|key| meta_patterns(key))
        .collect();

    static ref FIGURE_IMG: Regex = Regex::new(
        r#"(?is)<figure\b.*?<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#
    ).unwrap();

    static ref ANY_IMG: Regex = Regex::new(
        r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#
    ).unwrap();
}
