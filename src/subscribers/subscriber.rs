//! # Subscribe: the hook for alarms, telemetry and operator feeds.
//!
//! A subscriber sees supervisor events after the loop has published them.
//! It runs on its own worker with its own bounded queue, so a slow alarm
//! pager or a stalled telemetry exporter never holds up dispatch or
//! reconciliation.
//!
//! ```text
//! SubscriberSet::emit ─► wants(kind)? ─► [queue] ─► worker ─► on_event()
//!                             │no                      └─► panic → SubscriberPanicked
//!                             └─► skipped
//! ```
//!
//! A full queue drops the event for that subscriber and publishes
//! `EventKind::SubscriberOverflow`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use fleetvisor::{Event, EventKind, Subscribe};
//!
//! struct Alarms;
//!
//! #[async_trait]
//! impl Subscribe for Alarms {
//!     async fn on_event(&self, ev: &Event) {
//!         println!("ALARM {} {:?}", ev.kind.as_str(), ev.reason);
//!     }
//!
//!     fn name(&self) -> &'static str { "alarms" }
//!
//!     fn wants(&self, kind: EventKind) -> bool {
//!         matches!(kind, EventKind::Degraded | EventKind::LinkFault | EventKind::OrchestrationError)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Consumer of supervisor events.
///
/// `on_event` must not block the executor; errors are the subscriber's own business.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Short name, used in logs and in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events are dropped (clamped to at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }

    /// Filter applied before queueing. Default: every kind.
    fn wants(&self, _kind: EventKind) -> bool {
        true
    }
}
