//! Mapping between fully qualified names and registrar entry names

use crate::error::{Error, Result};
use crate::record::{APEX, Domain};

/// Find the managed domain `fqdn` belongs to
///
/// A domain matches when it equals the fqdn or is a label-aligned suffix of
/// it, ignoring ASCII case. When several domains match (`example.com` and
/// `sub.example.com`), the longest one wins.
pub fn resolve_domain<'a>(fqdn: &str, domains: &'a [Domain]) -> Result<&'a Domain> {
    let fqdn = fqdn.trim_end_matches('.');
    domains
        .iter()
        .filter(|domain| relative_part(fqdn, &domain.name).is_some())
        .max_by_key(|domain| domain.name.len())
        .ok_or_else(|| Error::domain_not_managed(fqdn))
}

/// Labels of `fqdn` left of `domain`, `""` for the apex
fn relative_part<'a>(fqdn: &'a str, domain: &str) -> Option<&'a str> {
    let split = fqdn.len().checked_sub(domain.len())?;
    let suffix = fqdn.get(split..)?;
    if !suffix.eq_ignore_ascii_case(domain) {
        return None;
    }
    match &fqdn[..split] {
        "" => Some(""),
        label => label.strip_suffix('.'),
    }
}

/// Entry name of `fqdn` relative to `domain`: `@` for the apex, else the label
///
/// Names are lower-cased, matching how the registrar stores them.
pub fn entry_name(fqdn: &str, domain: &str) -> String {
    let fqdn = fqdn.trim_end_matches('.');
    match relative_part(fqdn, domain) {
        Some("") => APEX.to_string(),
        Some(label) => label.to_ascii_lowercase(),
        None => fqdn.to_ascii_lowercase(),
    }
}

/// Fully qualified name of an entry name within `domain`
pub fn fqdn(entry_name: &str, domain: &str) -> String {
    if entry_name == APEX {
        domain.to_string()
    } else {
        format!("{entry_name}.{domain}")
    }
}
