//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles share their state through `Arc`, so a test keeps a clone for
//! inspection while the engine owns the boxed original.

#![allow(dead_code)]

use ifddns_core::error::{Error, Result};
use ifddns_core::traits::{DnsProvider, IpSource};
use ifddns_core::{BindingConfig, EngineConfig, EngineEvent, Reconciler};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const OLD_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);
pub const NEW_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 9);

/// An IP source whose interface table the test edits directly
#[derive(Clone, Default)]
pub struct FakeInterfaces {
    table: Arc<Mutex<HashMap<String, Ipv4Addr>>>,
    current_call_count: Arc<AtomicUsize>,
}

impl FakeInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with one interface up
    pub fn with(interface: &str, ip: Ipv4Addr) -> Self {
        let source = Self::new();
        source.set(interface, ip);
        source
    }

    /// Bring an interface up (or change its address)
    pub fn set(&self, interface: &str, ip: Ipv4Addr) {
        self.table.lock().unwrap().insert(interface.to_string(), ip);
    }

    /// Take an interface down
    pub fn remove(&self, interface: &str) {
        self.table.lock().unwrap().remove(interface);
    }

    /// Get the number of times current() was called
    pub fn current_call_count(&self) -> usize {
        self.current_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for FakeInterfaces {
    async fn current(&self, interface_name: &str) -> Option<Ipv4Addr> {
        self.current_call_count.fetch_add(1, Ordering::SeqCst);
        self.table.lock().unwrap().get(interface_name).copied()
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Debug, Clone)]
struct RemoteRecord {
    domain_name: String,
    record_prefix: String,
    value: String,
}

#[derive(Default)]
struct ProviderState {
    records: HashMap<String, RemoteRecord>,
    failing_updates: HashSet<String>,
    failing_reads: HashSet<String>,
    dropped_writes: HashSet<String>,
    updates: Vec<(String, Ipv4Addr)>,
}

/// A DnsProvider holding records in memory
///
/// Like a real provider, it rejects an update that would not change the
/// record. Individual records can be scripted to fail updates, fail reads,
/// or silently drop writes.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ProviderState>>,
    resolve_call_count: Arc<AtomicUsize>,
    read_call_count: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a remote record
    pub fn add_record(&self, record_id: &str, domain_name: &str, record_prefix: &str, value: &str) {
        self.state.lock().unwrap().records.insert(
            record_id.to_string(),
            RemoteRecord {
                domain_name: domain_name.to_string(),
                record_prefix: record_prefix.to_string(),
                value: value.to_string(),
            },
        );
    }

    /// Current remote value of a record
    pub fn value_of(&self, record_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(record_id)
            .map(|r| r.value.clone())
    }

    /// Every update call on `record_id` fails from now on
    pub fn fail_updates(&self, record_id: &str) {
        self.state.lock().unwrap().failing_updates.insert(record_id.to_string());
    }

    /// Every read call on `record_id` fails from now on
    pub fn fail_reads(&self, record_id: &str) {
        self.state.lock().unwrap().failing_reads.insert(record_id.to_string());
    }

    /// Updates on `record_id` report success but change nothing
    pub fn drop_writes(&self, record_id: &str) {
        self.state.lock().unwrap().dropped_writes.insert(record_id.to_string());
    }

    /// Get the number of times update() was called
    pub fn update_call_count(&self) -> usize {
        self.state.lock().unwrap().updates.len()
    }

    /// Record ids and values passed to update(), in call order
    pub fn updates(&self) -> Vec<(String, Ipv4Addr)> {
        self.state.lock().unwrap().updates.clone()
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times read() was called
    pub fn read_call_count(&self) -> usize {
        self.read_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProvider for ScriptedProvider {
    async fn resolve(&self, domain_name: &str, record_prefix: &str) -> Result<String> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();

        let mut matches: Vec<_> = state
            .records
            .iter()
            .filter(|(_, r)| r.domain_name == domain_name && r.record_prefix == record_prefix)
            .map(|(id, _)| id.clone())
            .collect();
        matches.sort();

        matches.into_iter().next().ok_or_else(|| {
            Error::resolution(format!("no record {record_prefix} under {domain_name}"))
        })
    }

    async fn update(
        &self,
        record_id: &str,
        _record_type: &str,
        _record_prefix: &str,
        value: Ipv4Addr,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.updates.push((record_id.to_string(), value));

        if state.failing_updates.contains(record_id) {
            return Err(Error::update("InternalError: scripted failure"));
        }
        let dropped = state.dropped_writes.contains(record_id);

        let record = state
            .records
            .get_mut(record_id)
            .ok_or_else(|| Error::update(format!("InvalidRecordId.NotFound: {record_id}")))?;

        if record.value == value.to_string() {
            return Err(Error::update("DomainRecordDuplicate: The DNS record already exists."));
        }
        if !dropped {
            record.value = value.to_string();
        }
        Ok(())
    }

    async fn read(&self, record_id: &str) -> Result<String> {
        self.read_call_count.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();

        if state.failing_reads.contains(record_id) {
            return Err(Error::read("ServiceUnavailable: scripted failure"));
        }
        state
            .records
            .get(record_id)
            .map(|r| r.value.clone())
            .ok_or_else(|| Error::read(format!("InvalidRecordId.NotFound: {record_id}")))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// The binding used by most scenarios
pub fn home_binding() -> BindingConfig {
    BindingConfig::new("example.com", "home", "eth0")
}

/// Build an engine with default timing over the given doubles
pub fn engine_with(
    source: &FakeInterfaces,
    provider: &ScriptedProvider,
) -> (Reconciler, mpsc::Receiver<EngineEvent>) {
    Reconciler::new(
        Box::new(source.clone()),
        Box::new(provider.clone()),
        &EngineConfig::default(),
    )
    .expect("engine construction succeeds")
}

/// Build an engine and register `bindings`, which must all resolve
pub async fn registered_engine(
    source: &FakeInterfaces,
    provider: &ScriptedProvider,
    bindings: Vec<BindingConfig>,
) -> (Reconciler, mpsc::Receiver<EngineEvent>) {
    let (mut engine, events) = engine_with(source, provider);
    for binding in bindings {
        engine
            .register(binding)
            .await
            .expect("binding registers");
    }
    (engine, events)
}

/// Drain every event currently buffered
pub fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
