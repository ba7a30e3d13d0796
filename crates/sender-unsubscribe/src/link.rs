//! Picking an HTTP unsubscribe URL for a sender.

/// Derive the http(s) URL to use for an automatic unsubscribe.
///
/// An explicit `unsubscribe_link` wins when it is http(s). Otherwise the
/// first http(s) entry of an RFC 2369 `List-Unsubscribe` header is used,
/// e.g. `<mailto:unsub@example.com>, <https://example.com/unsub>`.
/// `mailto:` entries are never returned.
pub fn http_unsubscribe_url(
    unsubscribe_link: Option<&str>,
    list_unsubscribe_header: Option<&str>,
) -> Option<String> {
    if let Some(link) = unsubscribe_link.map(str::trim).filter(|l| is_http(l)) {
        return Some(link.to_string());
    }

    let header = list_unsubscribe_header?.trim();
    if header.is_empty() {
        return None;
    }

    header_entries(header)
        .into_iter()
        .find(|entry| is_http(entry))
        .map(str::to_string)
}

/// Split a `List-Unsubscribe` value into its URLs.
///
/// Entries are taken from `<` to the next `>`, so commas inside a URL are
/// kept. A value without angle brackets is split on commas.
fn header_entries(header: &str) -> Vec<&str> {
    if !header.contains('<') {
        return header
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
    }

    let mut entries = Vec::new();
    let mut rest = header;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            // Unterminated entry runs to the end of the header.
            entries.push(after.trim());
            break;
        };
        entries.push(after[..end].trim());
        rest = &after[end + 1..];
    }
    entries
}

fn is_http(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}
