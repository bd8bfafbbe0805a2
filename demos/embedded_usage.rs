//! Minimal embedding example for transip-dns-core
//!
//! Runs one convergence pass through the full SOAP stack (codec, signer,
//! client, record store) against an in-process registrar, so nothing leaves
//! the machine. Swap `DemoRegistrar` for a real HTTP transport to talk to
//! the API.
//!
//! Credentials come from `TRANSIP_USERNAME` / `TRANSIP_PRIVATE_KEY` /
//! `TRANSIP_KEY_FILE` when set, otherwise from the test key shipped with
//! `transip-soap`. `TRANSIP_LOG_LEVEL` picks the log level (default info).

use anyhow::Context;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;
use transip_dns_core::record::{DesiredRecord, RawEntry, RecordType};
use transip_dns_core::{ClientConfig, EngineConfig, EngineEvent, ReconciliationEngine};
use transip_soap::client::{entry_from_value, entry_to_value};
use transip_soap::{
    RecordStore, ServiceClient, SessionToken, Transport, TransportResponse, Value, WireValue,
    decode, encode,
};

const DEMO_KEY: &str = include_str!("../crates/transip-soap/tests/fixtures/test_key.pem");

const DECLARATIONS: &str = r#"[
    { "fqdn": "example.com", "type": "MX", "content": "10 mail.example.com.", "ttl": "300" },
    { "fqdn": "example.com", "type": "TXT", "content": ["v=spf1 mx -all"], "content_handling": "merge" },
    { "fqdn": "www.example.com", "type": "CNAME", "content": ["a.example.net.", "b.example.net."] },
    { "fqdn": "old.example.com", "ensure": "absent" },
    { "fqdn": "www.example.org", "content": "192.0.2.10" }
]"#;

/// Registrar living in this process
struct DemoRegistrar {
    zones: Mutex<IndexMap<String, Vec<RawEntry>>>,
}

impl DemoRegistrar {
    fn new() -> Self {
        let mut zones = IndexMap::new();
        zones.insert(
            "example.com".to_string(),
            vec![
                RawEntry::new("@", RecordType::A, "192.0.2.1", 3600),
                RawEntry::new("@", RecordType::Txt, "google-site-verification=abc", 3600),
                RawEntry::new("old", RecordType::A, "192.0.2.99", 3600),
            ],
        );
        Self {
            zones: Mutex::new(zones),
        }
    }

    fn answer(&self, action: &str, params: &Value) -> anyhow::Result<Value> {
        let mut zones = self
            .zones
            .lock()
            .map_err(|_| anyhow::anyhow!("registrar state poisoned"))?;
        let domain_name = params.get("domainName").and_then(Value::as_str);

        let domain_info = |name: &str, entries: &[RawEntry]| {
            Value::object(
                "Domain",
                [
                    ("name", Value::from(name)),
                    ("dnsEntries", Value::List(entries.iter().map(entry_to_value).collect())),
                ],
            )
        };

        Ok(match (action, domain_name) {
            ("get_domain_names", _) => {
                Value::List(zones.keys().map(|k| Value::from(k.as_str())).collect())
            }
            ("get_info", Some(name)) => {
                let entries = zones.get(name).context("Domain not found")?;
                domain_info(name, entries)
            }
            ("batch_get_info", _) => Value::List(
                zones
                    .iter()
                    .map(|(name, entries)| domain_info(name, entries))
                    .collect(),
            ),
            ("set_dns_entries", Some(name)) => {
                let entries = match params.get("dnsEntries") {
                    Some(Value::List(items)) => items
                        .iter()
                        .map(|e| entry_from_value(action, e))
                        .collect::<transip_dns_core::Result<Vec<_>>>()?,
                    _ => Vec::new(),
                };
                zones.insert(name.to_string(), entries);
                Value::Map(IndexMap::new())
            }
            (other, _) => anyhow::bail!("Unsupported action {other}"),
        })
    }
}

#[async_trait]
impl Transport for DemoRegistrar {
    async fn invoke(
        &self,
        action: &str,
        message: WireValue,
        session: &SessionToken,
    ) -> transip_dns_core::Result<TransportResponse> {
        info!("[Registrar] {} from {} (nonce {})", action, session.login, session.nonce);

        match self.answer(action, &decode(&message)) {
            Ok(payload) => Ok(TransportResponse {
                status: 200,
                body: WireValue::structure([(
                    format!("{action}_response"),
                    WireValue::structure([("return", encode(&payload))]),
                )]),
            }),
            Err(e) => Ok(TransportResponse {
                status: 500,
                body: WireValue::structure([(
                    "Fault",
                    WireValue::structure([("faultstring", WireValue::scalar(e.to_string()))]),
                )]),
            }),
        }
    }

    fn transport_name(&self) -> &'static str {
        "demo"
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let log_level = match env::var("TRANSIP_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = ClientConfig::from_env().unwrap_or_else(|_| ClientConfig::new("demo", DEMO_KEY));
    info!("Using {:?}", config);

    let registrar = Arc::new(DemoRegistrar::new());
    let client = Arc::new(ServiceClient::new(&config, registrar.clone())?);
    let store = Arc::new(RecordStore::new(client));

    let (engine, mut events) = ReconciliationEngine::new(store, EngineConfig::default());

    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let EngineEvent::RecordFailed { record, error } = &event {
                warn!("[Event] {} failed: {}", record, error);
            } else {
                info!("[Event] {:?}", event);
            }
        }
    });

    let records = DesiredRecord::list_from_json(DECLARATIONS).context("Invalid declarations")?;
    let report = engine.apply_all(&records).await;

    for (key, outcome) in &report.outcomes {
        match outcome {
            Ok(applied) => info!(
                "{} -> {:?} {:?} (ttl {}){}",
                key,
                applied.state.ensure,
                applied.state.contents,
                applied.state.ttl,
                if applied.changed { "" } else { " unchanged" }
            ),
            Err(e) => warn!("{} -> {}", key, e),
        }
    }

    for state in engine.instances().await? {
        info!("Present: {} {:?} ttl {}", state.name(), state.contents, state.ttl);
    }

    drop(engine);
    listener.await?;

    info!(
        "Pass finished: {} applied, {} failed",
        report.applied(),
        report.failed()
    );
    Ok(())
}
