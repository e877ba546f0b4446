use std::collections::HashMap;

/// Parse a boolean value from a raw string, accepting common env-style forms.
///
/// Accepted truthy values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"`.
/// Accepted falsy values: `"0"`, `"false"`, `"no"`, `"off"`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Trimmed value of `name`, ignoring unset and blank entries.
pub fn non_empty<'a>(
    env: &'a HashMap<String, String>,
    name: &str,
) -> Option<&'a str> {
    env.get(name)
        .map(|raw| raw.trim())
        .filter(|value| !value.is_empty())
}
