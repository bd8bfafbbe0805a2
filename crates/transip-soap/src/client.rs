//! Service client
//!
//! One RPC per [`ServiceClient::call`]: encode the parameters, sign them,
//! hand both to the [`Transport`], then unwrap and decode the response.
//!
//! The client never retries. Every failure comes back to the caller as an
//! error naming the action (and the domain, when the call concerned one).

use async_trait::async_trait;
use indexmap::IndexMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use transip_dns_core::config::{AccessMode, ClientConfig};
use transip_dns_core::record::{Domain, RawEntry, RecordType};
use transip_dns_core::{Error, Result};

use crate::params::{Params, camelize};
use crate::signer::{RequestSigner, SessionToken};
use crate::wire::{Value, WireValue, decode, encode};

pub const GET_DOMAIN_NAMES: &str = "get_domain_names";
pub const GET_INFO: &str = "get_info";
pub const BATCH_GET_INFO: &str = "batch_get_info";
pub const SET_DNS_ENTRIES: &str = "set_dns_entries";

/// Wire class of a DNS entry
pub const DNS_ENTRY_CLASS: &str = "DnsEntry";

/// The transport's answer to one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status of the exchange
    pub status: u16,
    /// SOAP body, keyed by `<action>_response`
    pub body: WireValue,
}

/// Moves a signed message to the API and back
///
/// Implementations own the HTTP and XML layers. They must deliver the
/// session attributes in the order [`SessionToken::attributes`] gives them.
/// A transport imposing a timeout reports it as an error; callers never
/// assume a timed-out call was or was not applied.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(
        &self,
        action: &str,
        message: WireValue,
        session: &SessionToken,
    ) -> Result<TransportResponse>;

    /// Transport name for logging
    fn transport_name(&self) -> &'static str;
}

/// Client for the TransIP domain service
pub struct ServiceClient {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    mode: AccessMode,
    /// Keeps calls on one client from overlapping
    gate: Mutex<()>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("transport", &self.transport.transport_name())
            .field("signer", &self.signer)
            .field("mode", &self.mode)
            .finish()
    }
}

impl ServiceClient {
    /// Create a client
    ///
    /// Fails with a configuration error if the key cannot be parsed.
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            signer: RequestSigner::new(config)?,
            mode: config.mode,
            transport,
            gate: Mutex::new(()),
        })
    }

    /// Perform one RPC
    ///
    /// `domain` only labels errors. The response body is unwrapped from its
    /// `<action>_response` envelope and decoded.
    pub async fn call(&self, action: &str, domain: Option<&str>, params: Params) -> Result<Value> {
        let _gate = self.gate.lock().await;

        let session = self.signer.sign(action, &params)?;
        let message = encode(&Value::Map(params));

        tracing::debug!(
            "Calling {} via {} transport{}",
            camelize(action),
            self.transport.transport_name(),
            domain.map(|d| format!(" for {d}")).unwrap_or_default()
        );

        let response = self
            .transport
            .invoke(action, message, &session)
            .await
            .map_err(|e| retag(action, domain, e))?;

        check_status(action, domain, &response)?;

        let envelope = format!("{action}_response");
        let payload = match response.body.get(&envelope) {
            Some(payload) => payload,
            None => {
                tracing::warn!("Response to {} has no {} envelope", action, envelope);
                &response.body
            }
        };
        Ok(decode(payload))
    }

    /// Names of every domain on the account
    pub async fn domain_names(&self) -> Result<Vec<Domain>> {
        let value = self.call(GET_DOMAIN_NAMES, None, Params::new()).await?;

        let names: &[Value] = match &value {
            Value::List(items) => items.as_slice(),
            Value::Scalar(_) => std::slice::from_ref(&value),
            _ => return Err(Error::malformed(GET_DOMAIN_NAMES, "expected a list of names")),
        };

        names
            .iter()
            .map(|name| {
                name.as_str()
                    .map(Domain::new)
                    .ok_or_else(|| Error::malformed(GET_DOMAIN_NAMES, "domain name is not a string"))
            })
            .collect()
    }

    /// Every entry of one domain
    pub async fn domain_entries(&self, domain: &str) -> Result<Vec<RawEntry>> {
        let mut params = Params::new();
        params.insert("domainName".into(), domain.into());

        let value = self.call(GET_INFO, Some(domain), params).await?;
        entries_of(GET_INFO, &value)
    }

    /// Every entry of each named domain, in one call
    pub async fn batch_domain_entries(
        &self,
        domains: &[Domain],
    ) -> Result<IndexMap<String, Vec<RawEntry>>> {
        let mut params = Params::new();
        params.insert(
            "domainNames".into(),
            Value::List(domains.iter().map(|d| d.name.as_str().into()).collect()),
        );

        let value = self.call(BATCH_GET_INFO, None, params).await?;
        let infos: &[Value] = match &value {
            Value::List(items) => items.as_slice(),
            Value::Map(fields) if fields.is_empty() => &[],
            Value::Map(_) => std::slice::from_ref(&value),
            _ => return Err(Error::malformed(BATCH_GET_INFO, "expected a list of domains")),
        };

        infos
            .iter()
            .map(|info| {
                let name = info
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::malformed(BATCH_GET_INFO, "domain without a name"))?;
                Ok((name.to_string(), entries_of(BATCH_GET_INFO, info)?))
            })
            .collect()
    }

    /// Replace the full entry list of one domain
    pub async fn set_dns_entries(&self, domain: &str, entries: &[RawEntry]) -> Result<()> {
        if self.mode == AccessMode::ReadOnly {
            return Err(Error::config(format!(
                "Cannot write entries for {domain}: client is in {} mode",
                self.mode
            )));
        }

        let mut params = Params::new();
        params.insert("domainName".into(), domain.into());
        params.insert(
            "dnsEntries".into(),
            Value::List(entries.iter().map(entry_to_value).collect()),
        );

        self.call(SET_DNS_ENTRIES, Some(domain), params).await?;
        Ok(())
    }
}

fn retag(action: &str, domain: Option<&str>, error: Error) -> Error {
    match error {
        Error::TransportFault { message, .. } => Error::transport(action, domain, message),
        other => Error::transport(action, domain, other.to_string()),
    }
}

fn check_status(action: &str, domain: Option<&str>, response: &TransportResponse) -> Result<()> {
    let status = response.status;
    if (200..300).contains(&status) {
        return Ok(());
    }

    let detail = fault_string(&response.body)
        .map(|f| format!(": {f}"))
        .unwrap_or_default();

    let message = match status {
        401 | 403 => format!("Authentication failed: check login and key. Status: {status}{detail}"),
        429 => format!("Rate limit exceeded. Please retry later. Status: {status}"),
        500..=599 => format!("Server error: {status}{detail}"),
        _ => format!("Unexpected status {status}{detail}"),
    };
    Err(Error::transport(action, domain, message))
}

/// `faultstring` of a SOAP fault body, if any
fn fault_string(body: &WireValue) -> Option<&str> {
    body.get("Fault")?.get("faultstring")?.as_str()
}

/// Wire form of one entry
pub fn entry_to_value(entry: &RawEntry) -> Value {
    Value::object(
        DNS_ENTRY_CLASS,
        [
            ("name", Value::from(entry.name.as_str())),
            ("expire", Value::from(entry.ttl)),
            ("type", Value::from(entry.record_type.as_str())),
            ("content", Value::from(entry.content.as_str())),
        ],
    )
}

/// Read one entry from a decoded `DnsEntry`
///
/// Refuses what it cannot represent rather than skipping it: an entry
/// dropped here would be deleted by the next full-state write.
pub fn entry_from_value(action: &str, value: &Value) -> Result<RawEntry> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed(action, format!("DnsEntry without {name}")))
    };

    let type_name = field("type")?;
    let record_type = RecordType::from_str(type_name)
        .map_err(|_| Error::malformed(action, format!("unsupported record type {type_name}")))?;
    let expire = field("expire")?;
    let ttl = expire
        .trim()
        .parse()
        .map_err(|_| Error::malformed(action, format!("expire '{expire}' is not an integer")))?;

    Ok(RawEntry::new(field("name")?, record_type, field("content")?, ttl))
}

fn entries_of(action: &str, domain: &Value) -> Result<Vec<RawEntry>> {
    match domain.get("dnsEntries") {
        None => Ok(Vec::new()),
        Some(Value::List(items)) => items.iter().map(|e| entry_from_value(action, e)).collect(),
        Some(Value::Map(fields)) if fields.is_empty() => Ok(Vec::new()),
        Some(single @ Value::Map(_)) => Ok(vec![entry_from_value(action, single)?]),
        Some(_) => Err(Error::malformed(action, "dnsEntries is not a list")),
    }
}
