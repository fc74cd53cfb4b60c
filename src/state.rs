use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::config::MatchPolicy;
use crate::models::carrier::Carrier;
use crate::models::matching::{Match, MatchEvent, MatchStatus};
use crate::models::request::DeliveryRequest;
use crate::models::route::Route;
use crate::models::settlement::{Settlement, TaxInvoice};
use crate::observability::metrics::Metrics;
use crate::stations::StationCatalog;

/// Shared application state. The DashMap collections are the document
/// store; the station catalog is read-only reference data.
pub struct AppState {
    pub catalog: StationCatalog,
    pub policy: MatchPolicy,
    pub carriers: DashMap<Uuid, Carrier>,
    pub routes: DashMap<Uuid, Route>,
    pub requests: DashMap<Uuid, DeliveryRequest>,
    pub matches: DashMap<Uuid, Match>,
    pub settlements: DashMap<Uuid, Settlement>,
    pub invoices: DashMap<Uuid, TaxInvoice>,
    /// Acceptance-window timers, keyed by request id. Aborted and removed
    /// on every terminal transition so a stale timer can never fire
    /// against a resolved request.
    pub timers: DashMap<Uuid, AbortHandle>,
    pub request_tx: mpsc::Sender<Uuid>,
    pub events_tx: broadcast::Sender<MatchEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        catalog: StationCatalog,
        policy: MatchPolicy,
        request_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<Uuid>) {
        let (request_tx, request_rx) = mpsc::channel(request_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                catalog,
                policy,
                carriers: DashMap::new(),
                routes: DashMap::new(),
                requests: DashMap::new(),
                matches: DashMap::new(),
                settlements: DashMap::new(),
                invoices: DashMap::new(),
                timers: DashMap::new(),
                request_tx,
                events_tx,
                metrics: Metrics::new(),
            },
            request_rx,
        )
    }

    /// The single in-flight offer for a request, if any.
    pub fn pending_match_for(&self, request_id: Uuid) -> Option<Match> {
        self.matches
            .iter()
            .find(|entry| {
                entry.request_id == request_id && entry.status == MatchStatus::Pending
            })
            .map(|entry| entry.value().clone())
    }

    /// Carriers that already received an offer for a request, across all
    /// attempts.
    pub fn tried_carriers(&self, request_id: Uuid) -> Vec<Uuid> {
        self.matches
            .iter()
            .filter(|entry| entry.request_id == request_id)
            .map(|entry| entry.carrier_id)
            .collect()
    }

    pub fn clear_timer(&self, request_id: Uuid) {
        if let Some((_, handle)) = self.timers.remove(&request_id) {
            handle.abort();
        }
    }

    /// Fire-and-forget notification hook. Lagging or absent subscribers
    /// never block a state transition.
    pub fn emit(&self, event: MatchEvent) {
        let _ = self.events_tx.send(event);
    }
}
