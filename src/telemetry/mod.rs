//! Telemetry for the retrieval core
//!
//! Counts registrations, served queries, access denials and index/registry
//! drift. Events are kept in a bounded ring for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::documents::DocumentId;

/// Number of events retained for `recent_events`
const MAX_EVENTS: usize = 1024;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    DocumentRegistered {
        id: DocumentId,
        department: String,
        timestamp: Instant,
    },
    QueryServed {
        role: String,
        candidates: usize,
        returned: usize,
        timestamp: Instant,
    },
    /// Candidates withheld from a role by the access filter
    AccessDenied {
        role: String,
        count: usize,
        timestamp: Instant,
    },
    /// Index returned an id the registry does not know
    CandidateDropped {
        id: DocumentId,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub documents_registered: usize,
    pub queries_served: usize,
    pub empty_results: usize,
    pub candidates_denied: usize,
    pub candidates_dropped: usize,
}

/// Telemetry collector, cheap to clone and share
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::DocumentRegistered { .. } => {
                    stats.documents_registered += 1;
                }
                TelemetryEvent::QueryServed { returned, .. } => {
                    stats.queries_served += 1;
                    if *returned == 0 {
                        stats.empty_results += 1;
                    }
                }
                TelemetryEvent::AccessDenied { count, .. } => {
                    stats.candidates_denied += count;
                }
                TelemetryEvent::CandidateDropped { .. } => {
                    stats.candidates_dropped += 1;
                }
            }
        }

        let mut events = lock(&self.events);
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Number of unresolvable candidates seen so far
    pub fn drift_count(&self) -> usize {
        lock(&self.stats).candidates_dropped
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get retained event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
