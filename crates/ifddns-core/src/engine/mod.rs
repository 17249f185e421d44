//! Reconciliation engine
//!
//! The [`Reconciler`] is responsible for:
//! - Registering bindings (resolving record ids, retrying with a fixed delay)
//! - Observing interface addresses on every tick
//! - Detecting drift against each binding's cached value
//! - Updating the provider, reading the record back, rolling back on mismatch
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────────┐
//!                 │   Ticker    │ (every poll interval)
//!                 └──────┬──────┘
//!                        ▼
//! ┌─────────────┐  ┌──────────────┐  ┌─────────────┐
//! │  IpSource   │◀─│  Reconciler  │─▶│ DnsProvider │
//! │ (observe)   │  └──────┬───────┘  │ (update,    │
//! └─────────────┘         │          │  read-back) │
//!                         ▼          └─────────────┘
//!                 ┌──────────────┐
//!                 │ EngineEvent  │ (notify)
//!                 └──────────────┘
//! ```
//!
//! ## Per-binding cycle
//!
//! 1. Read the interface address; skip the binding if there is none
//! 2. Equal to the cached value → unchanged
//! 3. Otherwise update the provider
//!    - success → cache the new value, go to 4
//!    - failure with no cached value → adopt the new value silently
//!      (first tick after start, the record most likely already holds it)
//!    - failure otherwise → report, keep the cached value
//! 4. Read the record back
//!    - equal → confirmed
//!    - different → restore the previous cached value
//!    - read failed → inconclusive, keep the new value

pub mod schedule;

use crate::binding::DomainBinding;
use crate::config::{BindingConfig, EngineConfig};
use crate::error::{Error, Result};
use crate::registry::DomainRegistry;
use crate::traits::{DnsProvider, IpSource};
use schedule::{IntervalTicker, Ticker};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// What happened to one binding during one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The interface reported no IPv4 address; nothing was attempted
    InterfaceDown,

    /// Cached value already matched (or was adopted on first observation)
    Unchanged,

    /// Update succeeded and the read-back matched
    Confirmed,

    /// Update succeeded but the read-back disagreed; cached value was reset
    RolledBack {
        /// Value the provider reported
        actual: String,
    },

    /// Update succeeded but the read-back failed; cached value kept
    Inconclusive {
        /// Read-back error text
        error: String,
    },

    /// The provider rejected the update; cached value kept
    UpdateFailed {
        /// Update error text
        error: String,
    },
}

/// Result of reconciling one binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOutcome {
    /// Registered domain
    pub domain_name: String,
    /// Record prefix (RR)
    pub record_prefix: String,
    /// Provider record id
    pub record_id: String,
    /// Cached value before the tick
    pub old_value: Option<Ipv4Addr>,
    /// Interface address observed during the tick
    pub observed: Option<Ipv4Addr>,
    /// What happened
    pub status: OutcomeStatus,
}

impl BindingOutcome {
    /// Whether the tick issued an update that the provider accepted
    pub fn is_changed(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Confirmed
                | OutcomeStatus::RolledBack { .. }
                | OutcomeStatus::Inconclusive { .. }
        )
    }

    /// Whether the tick left this binding with a surfaced error
    pub fn is_error(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::RolledBack { .. } | OutcomeStatus::UpdateFailed { .. }
        )
    }
}

/// Outcomes of one pass over the registry, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// One entry per registered binding
    pub outcomes: Vec<BindingOutcome>,
}

impl TickReport {
    /// Look up the outcome for a binding
    pub fn outcome(&self, domain_name: &str, record_prefix: &str) -> Option<&BindingOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.domain_name == domain_name && o.record_prefix == record_prefix)
    }

    /// Number of bindings that ended the tick with an error
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A binding resolved and joined the registry
    Registered {
        domain_name: String,
        record_prefix: String,
        record_id: String,
    },

    /// A registration attempt failed and will be retried
    RegistrationFailed {
        domain_name: String,
        record_prefix: String,
        error: String,
        attempt: usize,
    },

    /// One binding was reconciled
    Reconciled(BindingOutcome),

    /// Loop started
    Started { bindings_count: usize },

    /// Loop stopped
    Stopped { reason: String },
}

/// Reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Populate with [`Reconciler::register_all()`] (retries until every binding resolves)
/// 3. Start with [`Reconciler::run()`]; runs until a shutdown signal arrives
///
/// ## Threading
///
/// Everything runs sequentially on the caller's task: one binding at a time,
/// one provider call at a time. The engine owns its [`DomainRegistry`], so
/// each binding's cached value has exactly one writer.
pub struct Reconciler {
    /// IP source for observing interfaces
    ip_source: Box<dyn IpSource>,

    /// DNS provider gateway
    provider: Box<dyn DnsProvider>,

    /// Resolved bindings
    registry: DomainRegistry,

    /// Interval between ticks
    poll_interval: Duration,

    /// Delay between registration attempts
    registration_retry_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler with an empty registry
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            ip_source,
            provider,
            registry: DomainRegistry::new(),
            poll_interval: config.poll_interval(),
            registration_retry_delay: config.registration_retry_delay(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The bindings registered so far
    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    /// Resolve one binding and add it to the registry (single attempt)
    pub async fn register(&mut self, binding: BindingConfig) -> Result<()> {
        let added = self
            .registry
            .add(binding, self.provider.as_ref(), self.ip_source.as_ref())
            .await?;

        let event = EngineEvent::Registered {
            domain_name: added.domain_name().to_string(),
            record_prefix: added.record_prefix().to_string(),
            record_id: added.record_id().to_string(),
        };
        self.emit_event(event);
        Ok(())
    }

    /// Register every binding, retrying each until it resolves
    ///
    /// A failed binding is retried after the registration delay, forever;
    /// the caller cancels by dropping this future. Incomplete bindings
    /// (`Error::Config`) are returned immediately since retrying cannot fix
    /// them.
    pub async fn register_all(&mut self, bindings: Vec<BindingConfig>) -> Result<()> {
        for binding in bindings {
            let mut attempt = 1;
            loop {
                match self.register(binding.clone()).await {
                    Ok(()) => break,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(
                            "Failed to register {} (attempt {}): {}; retrying in {:?}",
                            binding.fqdn(),
                            attempt,
                            e,
                            self.registration_retry_delay
                        );
                        self.emit_event(EngineEvent::RegistrationFailed {
                            domain_name: binding.domain_name.clone(),
                            record_prefix: binding.record_prefix.clone(),
                            error: e.to_string(),
                            attempt,
                        });
                        attempt += 1;
                        tokio::time::sleep(self.registration_retry_delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run the loop until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&mut self) -> Result<()> {
        let mut ticker = IntervalTicker::new(self.poll_interval);
        self.run_internal(&mut ticker, None).await
    }

    /// Run the loop until `shutdown_rx` fires (or its sender is dropped)
    pub async fn run_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        let mut ticker = IntervalTicker::new(self.poll_interval);
        self.run_internal(&mut ticker, Some(shutdown_rx)).await
    }

    /// Run the loop on a caller-supplied tick source
    pub async fn run_with_ticker<T: Ticker + ?Sized>(
        &mut self,
        ticker: &mut T,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_internal(ticker, Some(shutdown_rx)).await
    }

    async fn run_internal<T: Ticker + ?Sized>(
        &mut self,
        ticker: &mut T,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        if self.registry.is_empty() {
            return Err(Error::config("No bindings registered"));
        }

        self.emit_event(EngineEvent::Started {
            bindings_count: self.registry.len(),
        });
        info!(
            "Reconciling {} binding(s) every {:?}",
            self.registry.len(),
            self.poll_interval
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    debug!(
                        "Tick finished: {} binding(s), {} error(s)",
                        report.outcomes.len(),
                        report.error_count()
                    );
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reconcile every binding once, in registration order
    ///
    /// A failure on one binding never stops the others.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for binding in self.registry.iter_mut() {
            let outcome =
                reconcile_binding(binding, self.ip_source.as_ref(), self.provider.as_ref()).await;
            report.outcomes.push(outcome);
        }

        for outcome in &report.outcomes {
            self.emit_event(EngineEvent::Reconciled(outcome.clone()));
        }

        report
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}

/// Result of change detection for one binding
enum Detection {
    Unchanged,
    Changed,
    ChangedWithError(Error),
}

/// Observe, detect, update and verify one binding
async fn reconcile_binding(
    binding: &mut DomainBinding,
    ip_source: &dyn IpSource,
    provider: &dyn DnsProvider,
) -> BindingOutcome {
    let old_value = binding.cached_value();
    let observed = ip_source.current(binding.interface_name()).await;

    let status = match observed {
        None => {
            warn!(
                "Interface {} has no IPv4 address, skipping {}",
                binding.interface_name(),
                binding.fqdn()
            );
            OutcomeStatus::InterfaceDown
        }
        Some(curr_ip) => match detect_change(binding, provider, curr_ip).await {
            Detection::Unchanged => OutcomeStatus::Unchanged,
            Detection::ChangedWithError(e) => {
                error!(
                    "Failed to update {} (RR: {}, old ip: {}, new ip: {}, recordId: {}): {}",
                    binding.fqdn(),
                    binding.record_prefix(),
                    display_ip(old_value),
                    curr_ip,
                    binding.record_id(),
                    e
                );
                OutcomeStatus::UpdateFailed {
                    error: e.to_string(),
                }
            }
            Detection::Changed => {
                info!(
                    "Updated {} (RR: {}, old ip: {}, new ip: {}, recordId: {})",
                    binding.fqdn(),
                    binding.record_prefix(),
                    display_ip(old_value),
                    curr_ip,
                    binding.record_id()
                );
                verify(binding, provider, old_value, curr_ip).await
            }
        },
    };

    BindingOutcome {
        domain_name: binding.domain_name().to_string(),
        record_prefix: binding.record_prefix().to_string(),
        record_id: binding.record_id().to_string(),
        old_value,
        observed,
        status,
    }
}

/// Compare the observation with the cached value and push it if they differ
async fn detect_change(
    binding: &mut DomainBinding,
    provider: &dyn DnsProvider,
    curr_ip: Ipv4Addr,
) -> Detection {
    if binding.cached_value() == Some(curr_ip) {
        return Detection::Unchanged;
    }

    let result = provider
        .update(
            binding.record_id(),
            binding.record_type(),
            binding.record_prefix(),
            curr_ip,
        )
        .await;

    match result {
        Ok(()) => {
            binding.apply_observed_value(curr_ip);
            Detection::Changed
        }
        Err(e) if binding.cached_value().is_none() => {
            // Converged state is not persisted, so the first update after a
            // start is usually rejected as a no-op by the provider.
            debug!(
                "Adopting {} for {} after first-run update rejection: {}",
                curr_ip,
                binding.fqdn(),
                e
            );
            binding.apply_observed_value(curr_ip);
            Detection::Unchanged
        }
        Err(e) => Detection::ChangedWithError(e),
    }
}

/// Read the record back; roll the cache back only on a confirmed mismatch
async fn verify(
    binding: &mut DomainBinding,
    provider: &dyn DnsProvider,
    previous: Option<Ipv4Addr>,
    curr_ip: Ipv4Addr,
) -> OutcomeStatus {
    match provider.read(binding.record_id()).await {
        Ok(actual) if actual.trim().parse::<Ipv4Addr>().ok() == Some(curr_ip) => {
            info!("Change confirmed for {}: {}", binding.fqdn(), curr_ip);
            OutcomeStatus::Confirmed
        }
        Ok(actual) => {
            let mismatch = Error::VerificationMismatch {
                expected: curr_ip,
                actual: actual.clone(),
            };
            warn!(
                "Change failed for {}, resetting cached ip to {}: {}",
                binding.fqdn(),
                display_ip(previous),
                mismatch
            );
            binding.rollback_to(previous);
            OutcomeStatus::RolledBack { actual }
        }
        Err(e) => {
            warn!(
                "Could not verify {} (recordId: {}): {}",
                binding.fqdn(),
                binding.record_id(),
                e
            );
            OutcomeStatus::Inconclusive {
                error: e.to_string(),
            }
        }
    }
}

fn display_ip(ip: Option<Ipv4Addr>) -> String {
    ip.map(|ip| ip.to_string()).unwrap_or_else(|| "<none>".to_string())
}
