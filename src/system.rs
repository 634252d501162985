//! Wiring of the whole deposit service around one ledger and one bus.
//!
//! Two ways to run it:
//!
//! - [`DepositSystem::run_until_idle`] relays the outbox, lets the gateway
//!   answer and applies the replies on the calling thread until nothing
//!   moves. Deterministic; used by tests and the simulation binary.
//! - [`DepositSystem::spawn`] starts the outbox relay, the gateway
//!   listener and the reply listener as background threads.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bus::InMemoryQueue;
use crate::clock::Clock;
use crate::config::DepositConfig;
use crate::consumer::{listen, EventRouter, TransportHandle, TransportStats};
use crate::error::DepositError;
use crate::events::{CardMaterialized, CardStatusCommand, DepositMaterialized, WithdrawalSettled};
use crate::gateway::{AbsSimulator, Gateway, GatewayBridge};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};
use crate::lock::InMemoryLockManager;
use crate::outbox::{OutboxWorker, OutboxWorkerThread, WorkerStats};
use crate::saga::{
    AutoRenewalToggle, CardIssuanceSaga, CardStatusMachine, DepositSaga, ReconcileReport,
    WithdrawalSaga,
};
use crate::service::{AccountService, CardService, Catalog, DepositService};

/// Upper bound on relay/answer/apply rounds in one `run_until_idle` call.
const MAX_IDLE_ROUNDS: usize = 1_000;

/// Work done by one [`DepositSystem::run_until_idle`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdleStats {
    pub rounds: usize,
    pub relayed: usize,
    pub requests_served: usize,
    pub replies_applied: usize,
    pub failures: usize,
}

pub struct DepositSystem<S = InMemoryLedgerStore> {
    config: DepositConfig,
    ledger: Arc<Ledger<S>>,
    queue: InMemoryQueue,
    clock: Arc<dyn Clock>,
    deposits: Arc<DepositSaga<S>>,
    card_issuance: Arc<CardIssuanceSaga<S>>,
    card_status: Arc<CardStatusMachine<S>>,
    withdrawals: Arc<WithdrawalSaga<S>>,
    auto_renewal: AutoRenewalToggle<S>,
    cards: CardService<S>,
    deposit_service: DepositService<S>,
    accounts: AccountService<S>,
    catalog: Catalog<S>,
    relay: OutboxWorker<S, InMemoryQueue>,
    replies: Arc<EventRouter>,
    gateway: Option<GatewayBridge<InMemoryQueue>>,
}

impl DepositSystem<InMemoryLedgerStore> {
    /// An empty in-memory ledger with no gateway attached. The bus keeps
    /// sent events only when `record_sent_events` is set.
    pub fn in_memory(config: DepositConfig, clock: Arc<dyn Clock>) -> Self {
        let ledger = Ledger::new(InMemoryLedgerStore::new(), Arc::new(InMemoryLockManager::new()))
            .with_lock_timeout(config.lock_timeout());
        let queue = if config.record_sent_events {
            InMemoryQueue::recording()
        } else {
            InMemoryQueue::new()
        };
        Self::new(config, Arc::new(ledger), queue, clock)
    }

    /// An in-memory system answered by an [`AbsSimulator`].
    pub fn simulated(config: DepositConfig, clock: Arc<dyn Clock>, seed: Option<u64>) -> Self {
        let system = Self::in_memory(config, clock.clone());
        let simulator = AbsSimulator::new(system.ledger.clone(), clock);
        let simulator = match seed {
            Some(seed) => simulator.with_seed(seed),
            None => simulator,
        };
        system.with_gateway(Arc::new(simulator))
    }
}

impl<S: LedgerStore + 'static> DepositSystem<S> {
    pub fn new(
        config: DepositConfig,
        ledger: Arc<Ledger<S>>,
        queue: InMemoryQueue,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let channels = config.channels.clone();

        let deposits = Arc::new(DepositSaga::new(ledger.clone(), channels.clone()));
        let card_issuance = Arc::new(CardIssuanceSaga::new(ledger.clone(), channels.clone()));
        let card_status = Arc::new(CardStatusMachine::new(ledger.clone(), channels.clone()));
        let withdrawals = Arc::new(WithdrawalSaga::new(
            ledger.clone(),
            channels.clone(),
            clock.clone(),
        ));

        let replies = EventRouter::new(channels.clone())
            .on({
                let saga = deposits.clone();
                move |event: DepositMaterialized| saga.on_deposit_materialized(event)
            })
            .on({
                let saga = card_issuance.clone();
                move |event: CardMaterialized| saga.on_card_materialized(event)
            })
            .on({
                let saga = withdrawals.clone();
                move |event: WithdrawalSettled| saga.on_settlement(event).map(|_| ())
            })
            .on({
                let machine = card_status.clone();
                move |command: CardStatusCommand| machine.on_status_command(command)
            });

        let relay = OutboxWorker::new(ledger.clone(), queue.clone(), clock.clone())
            .configured(&config.outbox)
            .with_worker_id("outbox-relay-inline");

        Self {
            cards: CardService::new(ledger.clone(), channels.clone()),
            auto_renewal: AutoRenewalToggle::new(ledger.clone(), channels),
            deposit_service: DepositService::new(ledger.clone(), clock.clone()),
            accounts: AccountService::new(ledger.clone()),
            catalog: Catalog::new(ledger.clone()),
            config,
            ledger,
            queue,
            clock,
            deposits,
            card_issuance,
            card_status,
            withdrawals,
            relay,
            replies: Arc::new(replies),
            gateway: None,
        }
    }

    /// Answer requests with `gateway`.
    pub fn with_gateway<G: Gateway + 'static>(mut self, gateway: Arc<G>) -> Self {
        self.gateway = Some(GatewayBridge::new(
            gateway,
            self.queue.clone(),
            self.config.channels.clone(),
        ));
        self
    }

    pub fn config(&self) -> &DepositConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger<S>> {
        &self.ledger
    }

    pub fn queue(&self) -> &InMemoryQueue {
        &self.queue
    }

    pub fn deposits(&self) -> &DepositSaga<S> {
        &self.deposits
    }

    pub fn card_issuance(&self) -> &CardIssuanceSaga<S> {
        &self.card_issuance
    }

    pub fn card_status(&self) -> &CardStatusMachine<S> {
        &self.card_status
    }

    pub fn withdrawals(&self) -> &WithdrawalSaga<S> {
        &self.withdrawals
    }

    pub fn auto_renewal(&self) -> &AutoRenewalToggle<S> {
        &self.auto_renewal
    }

    pub fn cards(&self) -> &CardService<S> {
        &self.cards
    }

    pub fn deposit_service(&self) -> &DepositService<S> {
        &self.deposit_service
    }

    pub fn accounts(&self) -> &AccountService<S> {
        &self.accounts
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn gateway(&self) -> Option<&GatewayBridge<InMemoryQueue>> {
        self.gateway.as_ref()
    }

    /// Relay, answer and apply until a round moves nothing.
    pub fn run_until_idle(&self) -> Result<IdleStats, DepositError> {
        let mut stats = IdleStats::default();

        while stats.rounds < MAX_IDLE_ROUNDS {
            stats.rounds += 1;

            let relayed = self.relay.drain()?;
            let served = match &self.gateway {
                Some(gateway) => gateway.pump(&self.queue)?,
                None => Default::default(),
            };
            let applied = self.replies.pump(&self.queue)?;

            stats.relayed += relayed.completed;
            stats.requests_served += served.handled;
            stats.replies_applied += applied.handled;
            stats.failures += served.failed + applied.failed;

            if relayed.completed == 0 && served.delivered() == 0 && applied.delivered() == 0 {
                return Ok(stats);
            }
        }

        warn!(rounds = stats.rounds, "system still busy after round limit");
        Ok(stats)
    }

    /// Fail and compensate withdrawals older than the configured timeout.
    pub fn reconcile(&self) -> Result<ReconcileReport, DepositError> {
        self.withdrawals.reconcile(self.config.withdrawal_timeout())
    }

    /// Start the background workers.
    pub fn spawn(&self) -> RunningSystem {
        let poll = self.config.listener_poll_interval();

        let worker = OutboxWorker::new(self.ledger.clone(), self.queue.clone(), self.clock.clone())
            .configured(&self.config.outbox)
            .with_worker_id(format!("outbox-relay-{}", std::process::id()));
        let relay = OutboxWorkerThread::spawn(worker, self.config.outbox.poll_interval());

        let gateway = self
            .gateway
            .as_ref()
            .map(|bridge| listen(bridge.router(), self.queue.clone(), "gateway-listener", poll));
        let replies = listen(self.replies.clone(), self.queue.clone(), "reply-listener", poll);

        info!(gateway = gateway.is_some(), "deposit system started");
        RunningSystem {
            relay,
            gateway,
            replies,
        }
    }
}

/// Statistics of the background workers after shutdown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SystemStats {
    pub relay: WorkerStats,
    pub gateway: Option<TransportStats>,
    pub replies: TransportStats,
}

/// Background workers started by [`DepositSystem::spawn`].
pub struct RunningSystem {
    relay: OutboxWorkerThread,
    gateway: Option<TransportHandle>,
    replies: TransportHandle,
}

impl RunningSystem {
    /// Stop every worker and wait for them.
    pub fn stop(self) -> SystemStats {
        self.relay.signal_stop();
        if let Some(gateway) = &self.gateway {
            gateway.signal_stop();
        }
        self.replies.signal_stop();

        let stats = SystemStats {
            relay: self.relay.stop(),
            gateway: self.gateway.map(TransportHandle::stop),
            replies: self.replies.stop(),
        };
        info!(
            published = stats.relay.messages_published,
            purged = stats.relay.messages_purged,
            replies = stats.replies.handled,
            "deposit system stopped"
        );
        stats
    }
}
