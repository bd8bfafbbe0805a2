// # TransIP SOAP
//
// Signed SOAP access to the TransIP `DomainService`, and an `EntryStore`
// built on it for the convergence engine in `transip-dns-core`.
//
// ## Layers
//
// - **wire**: native values to and from the SOAP array/struct encoding
// - **params**: the flattened `key=value` form of call parameters that is
//   signed
// - **signer**: RSA/SHA-512 signature over that form, delivered as session
//   attributes (login, mode, timestamp, nonce, clientVersion, signature)
// - **client**: one RPC per `call`, through a pluggable [`Transport`]
// - **store**: [`RecordStore`], the registrar-backed `EntryStore`
//
// ## Security Requirements
//
// - Private key material NEVER appears in logs or Debug output
// - Timestamp and nonce are regenerated for every call
// - Malformed keys fail at construction, before any network activity
//
// ## API Reference
//
// - WSDL: `https://api.transip.nl/wsdl/?service=DomainService`
// - Actions used: `getDomainNames`, `getInfo`, `batchGetInfo`, `setDnsEntries`

pub mod client;
pub mod params;
pub mod signer;
pub mod store;
pub mod wire;

pub use client::{ServiceClient, Transport, TransportResponse};
pub use params::{Params, camelize, serialize, urlencode};
pub use signer::{RequestSigner, SessionToken};
pub use store::RecordStore;
pub use wire::{Value, WireValue, decode, encode};
