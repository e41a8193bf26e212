//! Cursor extraction from RFC 8288 `Link` headers.

// crates.io
use http::{HeaderMap, header::LINK};
use url::Url;

/// Query parameters that may carry the next-page cursor, in priority order.
pub const CURSOR_PARAMS: [&str; 2] = ["after", "cursor"];

/// Extract the next-page cursor from the response's `Link` headers.
///
/// Relative link targets are resolved against `base`. Returns `None` when no `rel="next"` link
/// carries a usable cursor, which marks the final page.
pub fn next_cursor(headers: &HeaderMap, base: &Url) -> Option<String> {
	headers
		.get_all(LINK)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.find_map(|value| next_cursor_from_link(value, base))
}

/// Extract the next-page cursor from a single `Link` header value.
pub fn next_cursor_from_link(value: &str, base: &Url) -> Option<String> {
	value.split(',').find_map(|section| {
		let (target, params) = split_link(section)?;

		if !params.split(';').any(is_next_relation) {
			return None;
		}

		let url = base.join(target).ok()?;

		CURSOR_PARAMS.iter().find_map(|name| {
			url.query_pairs()
				.find(|(key, value)| key == *name && !value.is_empty())
				.map(|(_, value)| value.into_owned())
		})
	})
}

fn split_link(section: &str) -> Option<(&str, &str)> {
	let section = section.trim();
	let rest = section.strip_prefix('<')?;
	let (target, params) = rest.split_once('>')?;

	Some((target.trim(), params))
}

fn is_next_relation(param: &str) -> bool {
	let Some((name, value)) = param.split_once('=') else {
		return false;
	};

	name.trim().eq_ignore_ascii_case("rel")
		&& value
			.trim()
			.trim_matches('"')
			.split_ascii_whitespace()
			.any(|relation| relation.eq_ignore_ascii_case("next"))
}
