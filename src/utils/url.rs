// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve a potentially relative link against a base URL.
pub fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract the college code from a listing link: the text after the
/// final `=`, or the whole href when there is none.
pub fn college_code_from_href(href: &str) -> String {
    href.rsplit('=').next().unwrap_or_default().to_string()
}
