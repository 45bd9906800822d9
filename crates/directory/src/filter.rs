//! Search-term normalisation and LDAP-style filter helpers.

/// Characters escaped with a backslash inside a name filter.
const ESCAPED: &[char] = &[',', '\\', '#', '+', '<', '>', ';', '"', '='];

/// Trims a search term, returning `None` when nothing is left.
pub fn normalize_term(term: Option<&str>) -> Option<&str> {
	term.map(str::trim).filter(|t| !t.is_empty())
}

/// Trims `value` and backslash-escapes filter metacharacters.
pub fn escape_term(value: &str) -> String {
	let value = value.trim();
	let mut out = String::with_capacity(value.len());
	for ch in value.chars() {
		if ESCAPED.contains(&ch) {
			out.push('\\');
		}
		out.push(ch);
	}
	out
}

/// Restricts `base` to entries whose account name starts with `term`.
///
/// Blank terms leave the filter unchanged.
pub fn prefix_filter(base: &str, term: Option<&str>) -> String {
	match normalize_term(term) {
		Some(term) => format!("(&{base}(sAMAccountName={}*))", escape_term(term)),
		None => base.to_owned(),
	}
}

/// Case-insensitive name-prefix match used by in-process backends.
pub fn matches_prefix(name: &str, term: Option<&str>) -> bool {
	match normalize_term(term) {
		Some(term) => name.len() >= term.len() && name.is_char_boundary(term.len()) && name[..term.len()].eq_ignore_ascii_case(term),
		None => true,
	}
}
