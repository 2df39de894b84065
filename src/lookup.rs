//! Ordered field lookup over loosely shaped provider payloads
//!
//! Provider responses nest the same information under different paths and
//! naming conventions (`inlineData` vs `inline_data`). Instead of scattering
//! dual-naming conditionals through the codebase, callers give an ordered
//! list of dotted paths and take the first match.

use serde_json::Value;

/// Look up a dotted path in a JSON value.
///
/// Path segments address object keys; a segment that parses as an integer
/// addresses an array index. Returns `None` as soon as any segment is
/// missing or the shape does not match.
///
/// # Examples
///
/// ```
/// use imagegen_probe::lookup::lookup;
/// use serde_json::json;
///
/// let payload = json!({"result": {"images": [{"url": "http://x/a.png"}]}});
/// let url = lookup(&payload, "result.images.0.url").and_then(|v| v.as_str());
/// assert_eq!(url, Some("http://x/a.png"));
/// ```
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// First match from an ordered list of dotted paths
pub fn lookup_first<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| lookup(value, path))
}

/// Dotted-path lookup yielding a string slice
pub fn lookup_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

/// Object field access tolerating both camelCase and snake_case naming.
///
/// The camelCase spelling is tried first, matching the order the original
/// backends documented.
pub fn field_dual<'a>(value: &'a Value, camel: &str, snake: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    map.get(camel).or_else(|| map.get(snake))
}
