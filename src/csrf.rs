//! CSRF token discovery.
//!
//! The server issues its token three ways: a hidden `csrfmiddlewaretoken`
//! form field, a `<meta name="csrf-token">` tag, and a `csrftoken` cookie.
//! The field wins over the meta tag, which wins over the cookie.

use std::sync::LazyLock;

use regex::Regex;

/// Name of the hidden form field carrying the token.
pub const FORM_FIELD: &str = "csrfmiddlewaretoken";
/// Name of the meta tag carrying the token.
pub const META_NAME: &str = "csrf-token";
/// Name of the cookie carrying the token.
pub const COOKIE_NAME: &str = "csrftoken";
/// Header the token is sent in.
pub const HEADER: &str = "X-CSRFToken";

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid input tag pattern"));
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta tag pattern"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute pattern")
});

/// Find the token in a rendered page.
#[must_use]
pub fn from_html(html: &str) -> Option<String> {
    find_in_tags(&INPUT_TAG, html, "name", FORM_FIELD, "value")
        .or_else(|| find_in_tags(&META_TAG, html, "name", META_NAME, "content"))
}

/// Find the token in a `Cookie`-style header value (`a=1; csrftoken=xyz`).
#[must_use]
pub fn from_cookie_header(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name.trim() == COOKIE_NAME && !value.trim().is_empty()).then(|| value.trim().to_string())
    })
}

fn find_in_tags(
    tags: &Regex,
    html: &str,
    key: &str,
    expected: &str,
    value_attr: &str,
) -> Option<String> {
    tags.find_iter(html).find_map(|tag| {
        let mut matched = false;
        let mut value = None;
        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            if name.eq_ignore_ascii_case(key) && raw == expected {
                matched = true;
            } else if name.eq_ignore_ascii_case(value_attr) {
                value = Some(raw.to_string());
            }
        }
        if matched {
            value.filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}
