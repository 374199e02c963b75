//! URL helpers shared by page records and the backlink merger.

use ::url::Url;

/// Normalize a URL into the form stored in `address.url`.
///
/// Drops the fragment and query string, any `www.` label, and a single
/// trailing slash.
pub fn normalize_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let mut href = without_query.trim().replace("www.", "");
    if href.ends_with('/') {
        href.pop();
    }
    href
}

/// Split a URL into the words indexed as `address.urlAsText`.
///
/// Separators are `/ . - _ :`; empty pieces are dropped and repeated words
/// are kept once, in first-seen order.
pub fn split_url_to_words(url: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in url.split(['/', '.', '-', '_', ':']) {
        if word.is_empty() || words.iter().any(|w| w == word) {
            continue;
        }
        words.push(word.to_string());
    }
    words
}

/// Authority component of a URL: the scheme is stripped and everything from
/// the first path slash on is dropped.
pub fn domain_of(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            return match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
        }
    }

    let rest = match url.find("//") {
        Some(pos) => &url[pos + 2..],
        None => url,
    };
    rest.split('/').next().unwrap_or_default().to_string()
}
