use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Escaped when converting an IRI to a URI: everything except alphanumerics
/// and the RFC 3987 (3.1) safe characters. `%` is kept so existing escapes
/// survive.
const IRI_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'#')
    .remove(b'%')
    .remove(b'[')
    .remove(b']')
    .remove(b'=')
    .remove(b':')
    .remove(b';')
    .remove(b'$')
    .remove(b'&')
    .remove(b'(')
    .remove(b')')
    .remove(b'+')
    .remove(b',')
    .remove(b'!')
    .remove(b'?')
    .remove(b'*')
    .remove(b'@')
    .remove(b'\'')
    .remove(b'~')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

const ABSOLUTE_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

pub fn iri_to_uri(iri: &str) -> String {
    utf8_percent_encode(iri, IRI_ESCAPE).to_string()
}

fn is_absolute(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| ABSOLUTE_SCHEMES.contains(&parsed.scheme()))
}

/// Qualifies a site-relative URL with the feed domain.
pub fn add_domain(domain: &str, url: &str, secure: bool) -> String {
    if domain.is_empty() {
        return url.to_string();
    }
    let protocol = if secure { "https" } else { "http" };
    if url.starts_with("//") {
        format!("{protocol}:{url}")
    } else if is_absolute(url) {
        url.to_string()
    } else {
        iri_to_uri(&format!("{protocol}://{domain}{url}"))
    }
}

pub fn rfc2822_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

/// `Last-Modified` style date, e.g. `Tue, 04 Oct 2022 15:20:53 GMT`.
pub fn http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
