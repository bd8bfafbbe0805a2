//! Signing input for call parameters
//!
//! The API verifies a signature over a flattened, percent-encoded form of the
//! call's parameter values followed by five metadata fields. The ordering,
//! casing and escaping here must match the server byte for byte: any
//! difference invalidates every signature.

use indexmap::IndexMap;
use url::form_urlencoded;

use crate::wire::Value;

/// Named call parameters, in call order
///
/// Only the values take part in the signing input; the names are what the
/// SOAP message uses.
pub type Params = IndexMap<String, Value>;

/// `get_domain_names` → `getDomainNames`
pub fn camelize(action: &str) -> String {
    let mut parts = action.split('_');
    let head = parts.next().unwrap_or_default().to_lowercase();

    parts.fold(head, |mut out, part| {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
        out
    })
}

/// Form-encode one component, with `%20` for spaces and `~` left bare
pub fn urlencode(input: &str) -> String {
    form_urlencoded::byte_serialize(input.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace("%7E", "~")
        .replace('*', "%2A")
}

/// Flatten a value into `key=value` segments
///
/// Lists are addressed by index, maps and objects by field name, nesting as
/// bracketed segments: `0[name]=a`.
pub fn encode_segments(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    encode_into(value, None, &mut out);
    out
}

fn encode_into(value: &Value, prefix: Option<&str>, out: &mut Vec<String>) {
    let key_for = |key: &str| match prefix {
        Some(prefix) => format!("{prefix}[{}]", urlencode(key)),
        None => urlencode(key),
    };

    match value {
        Value::Scalar(s) => out.push(format!("{}={}", prefix.unwrap_or_default(), urlencode(s))),
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                encode_into(item, Some(&key_for(&index.to_string())), out);
            }
        }
        Value::Map(fields) | Value::Object { fields, .. } => {
            for (name, field) in fields {
                encode_into(field, Some(&key_for(name)), out);
            }
        }
    }
}

/// Build the exact string that gets signed for one call
pub fn serialize(
    action: &str,
    service: &str,
    hostname: &str,
    timestamp: i64,
    nonce: &str,
    params: &Params,
) -> String {
    let mut segments = Vec::new();
    for (index, value) in params.values().enumerate() {
        encode_into(value, Some(&index.to_string()), &mut segments);
    }

    segments.push(format!("__method={}", camelize(action)));
    segments.push(format!("__service={service}"));
    segments.push(format!("__hostname={hostname}"));
    segments.push(format!("__timestamp={timestamp}"));
    segments.push(format!("__nonce={nonce}"));
    segments.join("&")
}
