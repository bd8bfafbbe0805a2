//! Record model
//!
//! Two granularities exist side by side:
//!
//! - [`RawEntry`]: what the registrar stores. One entry, one content value.
//! - [`LogicalRecord`]: what an operator declares. One `(fqdn, type)` key,
//!   any number of content values.
//!
//! [`DesiredRecord`] is the declaration handed in by the host, and
//! [`RecordState`] is what gets reported back after a pass.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default TTL when a declaration leaves it out
pub const DEFAULT_TTL: u32 = 3600;

/// Entry name the registrar uses for the domain apex
pub const APEX: &str = "@";

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    #[default]
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchange
    Mx,
    /// Name server
    Ns,
    /// Service locator
    Srv,
    /// Text
    Txt,
    /// Certification authority authorization
    Caa,
}

impl RecordType {
    /// All supported types, in wire order
    pub const ALL: [RecordType; 8] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Srv,
        RecordType::Txt,
        RecordType::Caa,
    ];

    /// Upper-case name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
            RecordType::Caa => "CAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation(format!("Unsupported record type: {s}")))
    }
}

/// Who owns the content values at a record key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHandling {
    /// The declaration owns every value at its key
    #[default]
    Replace,
    /// The declaration owns only the values it lists
    Merge,
}

/// Whether the record should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsureState {
    /// The record should exist
    #[default]
    Present,
    /// The record should not exist
    Absent,
}

/// A managed domain, as discovered from the registrar
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    /// Domain name, e.g. `example.com`
    pub name: String,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One registrar-side DNS entry holding exactly one content value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Label relative to the domain, or `@` for the apex
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// The single content value
    pub content: String,
    /// TTL in seconds (`expire` on the wire)
    pub ttl: u32,
}

impl RawEntry {
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        content: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            content: content.into(),
            ttl,
        }
    }

    /// Fully qualified name of this entry within `domain`
    pub fn fqdn(&self, domain: &str) -> String {
        crate::domain::fqdn(&self.name, domain)
    }

    /// Whether this entry sits at the given `(entry name, type)` key
    pub fn is_at(&self, name: &str, record_type: RecordType) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.record_type == record_type
    }
}

/// `(fqdn, type)` identity of a logical record
///
/// Displays as `fqdn/TYPE`, which doubles as the instance name reported to
/// the host. Parsing accepts the same form, or a bare fqdn meaning type A.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub fqdn: String,
    pub record_type: RecordType,
}

impl RecordKey {
    pub fn new(fqdn: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            fqdn: fqdn.into(),
            record_type,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fqdn, self.record_type)
    }
}

impl FromStr for RecordKey {
    type Err = Error;

    fn from_str(title: &str) -> Result<Self> {
        let (fqdn, record_type) = match title.split_once('/') {
            Some((fqdn, kind)) => (fqdn, kind.parse()?),
            None => (title, RecordType::default()),
        };
        if fqdn.is_empty() {
            return Err(Error::validation(format!("Record title has no fqdn: {title}")));
        }
        Ok(Self::new(fqdn, record_type))
    }
}

/// A group of raw entries sharing `(fqdn, type)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRecord {
    pub fqdn: String,
    pub record_type: RecordType,
    /// Content values in first-seen order, without duplicates
    pub contents: IndexSet<String>,
    pub ttl: u32,
    pub content_handling: ContentHandling,
}

impl LogicalRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.fqdn.clone(), self.record_type)
    }

    /// Report this record as currently present
    pub fn into_state(self) -> RecordState {
        RecordState {
            ensure: EnsureState::Present,
            fqdn: self.fqdn,
            record_type: self.record_type,
            contents: self.contents.into_iter().collect(),
            ttl: self.ttl,
        }
    }
}

/// Reconciled state reported back to the host for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordState {
    pub ensure: EnsureState,
    pub fqdn: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(rename = "content")]
    pub contents: Vec<String>,
    pub ttl: u32,
}

impl RecordState {
    /// Instance name, `fqdn/TYPE`
    pub fn name(&self) -> String {
        RecordKey::new(self.fqdn.clone(), self.record_type).to_string()
    }
}

/// A declared record, as handed in by the host's resource layer
///
/// Deserializing checks the declared type and TTL while parsing, so an
/// unsupported type or a non-integer TTL never yields a record. Use
/// [`from_json`](Self::from_json) to get those back as
/// [`Error::Validation`] rather than a JSON error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Declaration")]
pub struct DesiredRecord {
    pub ensure: EnsureState,
    pub fqdn: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(rename = "content")]
    pub contents: Vec<String>,
    pub ttl: u32,
    pub content_handling: ContentHandling,
}

/// A declaration exactly as the host hands it over, before any checks
#[derive(Debug, Deserialize)]
struct Declaration {
    #[serde(default)]
    ensure: EnsureState,
    fqdn: String,
    #[serde(rename = "type")]
    record_type: Option<String>,
    #[serde(rename = "content", default, deserialize_with = "one_or_many")]
    contents: Vec<String>,
    ttl: Option<serde_json::Value>,
    #[serde(default)]
    content_handling: ContentHandling,
}

impl TryFrom<Declaration> for DesiredRecord {
    type Error = Error;

    fn try_from(declaration: Declaration) -> Result<Self> {
        let record_type = match declaration.record_type {
            Some(kind) => kind.parse()?,
            None => RecordType::default(),
        };
        let ttl = match declaration.ttl {
            Some(value) => integer_ttl(&value)?,
            None => DEFAULT_TTL,
        };
        Ok(Self {
            ensure: declaration.ensure,
            fqdn: declaration.fqdn,
            record_type,
            contents: declaration.contents,
            ttl,
            content_handling: declaration.content_handling,
        })
    }
}

impl DesiredRecord {
    /// Declare a present, replace-policy record with the default TTL
    pub fn new<I, S>(fqdn: impl Into<String>, record_type: RecordType, contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ensure: EnsureState::Present,
            fqdn: fqdn.into(),
            record_type,
            contents: contents.into_iter().map(Into::into).collect(),
            ttl: DEFAULT_TTL,
            content_handling: ContentHandling::Replace,
        }
    }

    /// Parse one declaration from JSON
    ///
    /// Malformed JSON is an [`Error::Json`]; a well-formed declaration with
    /// an unsupported type or a non-integer TTL is an [`Error::Validation`].
    pub fn from_json(json: &str) -> Result<Self> {
        let declaration: Declaration = serde_json::from_str(json)?;
        declaration.try_into()
    }

    /// Parse a JSON array of declarations, failing on the first bad one
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        let declarations: Vec<Declaration> = serde_json::from_str(json)?;
        declarations.into_iter().map(Self::try_from).collect()
    }

    /// Declare from a `fqdn/TYPE` title
    pub fn from_title<I, S>(title: &str, contents: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key: RecordKey = title.parse()?;
        Ok(Self::new(key.fqdn, key.record_type, contents))
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_handling(mut self, content_handling: ContentHandling) -> Self {
        self.content_handling = content_handling;
        self
    }

    pub fn with_ensure(mut self, ensure: EnsureState) -> Self {
        self.ensure = ensure;
        self
    }

    pub fn absent(self) -> Self {
        self.with_ensure(EnsureState::Absent)
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.fqdn.clone(), self.record_type)
    }

    /// Declared content values, de-duplicated in declaration order
    pub fn content_set(&self) -> IndexSet<String> {
        self.contents.iter().cloned().collect()
    }

    /// Check the declaration before anything is sent to the registrar
    pub fn validate(&self) -> Result<()> {
        if self.fqdn.trim_end_matches('.').is_empty() {
            return Err(Error::validation("The fqdn of the record must not be blank"));
        }

        if self.contents.iter().any(String::is_empty) {
            return Err(Error::validation(format!(
                "{}: an empty record is not allowed",
                self.key()
            )));
        }

        if self.record_type == RecordType::Cname {
            if self.content_handling == ContentHandling::Merge {
                return Err(Error::validation(format!(
                    "{}: CNAME records cannot use merge content handling",
                    self.key()
                )));
            }
            if self.content_set().len() > 1 {
                return Err(Error::validation(format!(
                    "{}: the content of a CNAME record cannot have multiple entries",
                    self.key()
                )));
            }
        }

        if self.ensure == EnsureState::Present
            && self.content_handling == ContentHandling::Replace
            && self.contents.is_empty()
        {
            return Err(Error::validation(format!(
                "{}: the content of the record must not be blank",
                self.key()
            )));
        }

        Ok(())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

// Hosts hand TTLs over as strings as often as numbers.
fn integer_ttl(value: &serde_json::Value) -> Result<u32> {
    let seconds = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::validation(format!("TTL must be an integer, got {value}")))?;

    u32::try_from(seconds).map_err(|_| Error::validation(format!("TTL out of range: {seconds}")))
}
