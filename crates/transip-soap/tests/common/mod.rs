//! In-process registrar for the contract tests
//!
//! Answers the four domain-service actions the way the API shapes them:
//! arrays arrive as `item` plus a `@soap_enc:array_type` count, with a lone
//! element left unwrapped. Every call's signature is checked against the
//! public half of the test key over the parameters actually received.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use transip_dns_core::config::ClientConfig;
use transip_dns_core::record::RawEntry;
use transip_dns_core::Result;
use transip_soap::client::entry_from_value;
use transip_soap::params::Params;
use transip_soap::signer::SessionToken;
use transip_soap::wire::{Value, WireValue, decode};
use transip_soap::{ServiceClient, Transport, TransportResponse, serialize};

pub const TEST_KEY: &str = include_str!("../fixtures/test_key.pem");

pub fn client_config() -> ClientConfig {
    ClientConfig::new("tester", TEST_KEY)
}

/// One call as the registrar saw it
#[derive(Debug, Clone)]
pub struct ReceivedCall {
    pub action: String,
    pub attributes: Vec<(&'static str, String)>,
    pub signature_valid: bool,
}

#[derive(Clone)]
pub struct FakeRegistrar {
    zones: Arc<Mutex<IndexMap<String, Vec<RawEntry>>>>,
    calls: Arc<Mutex<Vec<ReceivedCall>>>,
    failures: Arc<Mutex<IndexMap<String, u16>>>,
    public_key: RsaPublicKey,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl FakeRegistrar {
    pub fn new() -> Self {
        let key = RsaPrivateKey::from_pkcs1_pem(TEST_KEY).unwrap();
        Self {
            zones: Arc::default(),
            calls: Arc::default(),
            failures: Arc::default(),
            public_key: RsaPublicKey::from(&key),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
            latency: None,
        }
    }

    pub fn with_zone(self, domain: &str, entries: Vec<RawEntry>) -> Self {
        self.zones.lock().unwrap().insert(domain.to_string(), entries);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `action` with `status` and a SOAP fault from now on
    pub fn fail(&self, action: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert(action.to_string(), status);
    }

    pub fn zone(&self, domain: &str) -> Option<Vec<RawEntry>> {
        self.zones.lock().unwrap().get(domain).cloned()
    }

    pub fn calls(&self) -> Vec<ReceivedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.action).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> Arc<ServiceClient> {
        Arc::new(ServiceClient::new(&client_config(), Arc::new(self.clone())).unwrap())
    }

    fn verify(&self, action: &str, params: &Params, session: &SessionToken) -> bool {
        let input = serialize(
            action,
            "DomainService",
            "api.transip.nl",
            session.timestamp,
            &session.nonce,
            params,
        );
        let b64 = session
            .signature
            .replace("%2B", "+")
            .replace("%2F", "/")
            .replace("%3D", "=");
        let Ok(raw) = STANDARD.decode(b64) else {
            return false;
        };
        self.public_key
            .verify(
                Pkcs1v15Sign::new::<Sha512>(),
                &Sha512::digest(input.as_bytes()),
                &raw,
            )
            .is_ok()
    }

    fn answer(&self, action: &str, params: &Params) -> std::result::Result<WireValue, String> {
        let domain_name = || {
            params
                .get("domainName")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| "domainName missing".to_string())
        };

        let zones = self.zones.lock().unwrap();
        match action {
            "get_domain_names" => Ok(server_array(
                "xsd",
                "string",
                zones.keys().map(|k| WireValue::scalar(k.as_str())).collect(),
            )),
            "get_info" => {
                let name = domain_name()?;
                let entries = zones.get(&name).ok_or("Domain not found")?;
                Ok(domain_info(&name, entries))
            }
            "batch_get_info" => {
                let names: Vec<String> = match params.get("domainNames") {
                    Some(Value::List(items)) => items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                    _ => return Err("domainNames missing".to_string()),
                };
                let mut infos = Vec::new();
                for name in names {
                    let entries = zones.get(&name).ok_or("Domain not found")?;
                    infos.push(domain_info(&name, entries));
                }
                Ok(server_array("tns", "Domain", infos))
            }
            "set_dns_entries" => {
                let name = domain_name()?;
                if !zones.contains_key(&name) {
                    return Err("Domain not found".to_string());
                }
                drop(zones);
                let entries = match params.get("dnsEntries") {
                    Some(Value::List(items)) => items
                        .iter()
                        .map(|v| entry_from_value(action, v))
                        .collect::<Result<Vec<_>>>()
                        .map_err(|e| e.to_string())?,
                    Some(Value::Map(fields)) if fields.is_empty() => Vec::new(),
                    _ => return Err("dnsEntries missing".to_string()),
                };
                self.zones.lock().unwrap().insert(name, entries);
                Ok(WireValue::Struct(IndexMap::new()))
            }
            other => Err(format!("Unknown action {other}")),
        }
    }
}

#[async_trait]
impl Transport for FakeRegistrar {
    async fn invoke(
        &self,
        action: &str,
        message: WireValue,
        session: &SessionToken,
    ) -> Result<TransportResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let params = match decode(&message) {
            Value::Map(fields) => fields,
            _ => IndexMap::new(),
        };

        self.calls.lock().unwrap().push(ReceivedCall {
            action: action.to_string(),
            attributes: session.attributes(),
            signature_valid: self.verify(action, &params, session),
        });

        let failure = self.failures.lock().unwrap().get(action).copied();
        let response = match failure {
            Some(status) => Ok(fault(status, "Simulated failure")),
            None => match self.answer(action, &params) {
                Ok(payload) => Ok(TransportResponse {
                    status: 200,
                    body: WireValue::structure([(
                        format!("{action}_response"),
                        WireValue::structure([("return", payload)]),
                    )]),
                }),
                Err(message) => Ok(fault(500, &message)),
            },
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    fn transport_name(&self) -> &'static str {
        "fake-registrar"
    }
}

fn fault(status: u16, message: &str) -> TransportResponse {
    TransportResponse {
        status,
        body: WireValue::structure([(
            "Fault",
            WireValue::structure([("faultstring", WireValue::scalar(message))]),
        )]),
    }
}

/// An array the way the API returns one
pub fn server_array(namespace: &str, element_type: &str, mut items: Vec<WireValue>) -> WireValue {
    let count = items.len();
    let mut fields = IndexMap::new();
    match count {
        0 => {}
        1 => {
            fields.insert("item".to_string(), items.remove(0));
        }
        _ => {
            fields.insert("item".to_string(), WireValue::Sequence(items));
        }
    }
    fields.insert(
        "@xsi:type".to_string(),
        WireValue::scalar(format!("tns:ArrayOf{element_type}")),
    );
    fields.insert(
        "@soap_enc:array_type".to_string(),
        WireValue::scalar(format!("{namespace}:{element_type}[{count}]")),
    );
    WireValue::Struct(fields)
}

fn domain_info(name: &str, entries: &[RawEntry]) -> WireValue {
    WireValue::structure([
        ("name", WireValue::scalar(name)),
        (
            "dnsEntries",
            server_array("tns", "DnsEntry", entries.iter().map(dns_entry).collect()),
        ),
        ("@xsi:type", WireValue::scalar("tns:Domain")),
    ])
}

fn dns_entry(entry: &RawEntry) -> WireValue {
    WireValue::structure([
        ("name", WireValue::scalar(entry.name.as_str())),
        ("expire", WireValue::scalar(entry.ttl.to_string())),
        ("type", WireValue::scalar(entry.record_type.as_str())),
        ("content", WireValue::scalar(entry.content.as_str())),
        ("@xsi:type", WireValue::scalar("tns:DnsEntry")),
    ])
}
