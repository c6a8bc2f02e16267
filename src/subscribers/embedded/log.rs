//! # LogWriter: events rendered through `tracing`.
//!
//! A subscriber that turns every [`Event`] into one `tracing` record with
//! structured fields. Install any `tracing` subscriber (e.g.
//! `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt layer)
//! ```text
//!  INFO fleetvisor: command accepted command=turn_on from=off to=standby
//!  WARN fleetvisor: node lost node=hv-03 from=standby reason="unreachable: 'hv-03' not responding"
//! ERROR fleetvisor: aggregate degraded from=standby reason="node 'hv-03' is unknown"
//!  INFO fleetvisor: load ready to=peak
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn text<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let node = e.node.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        let (from, to, command) = (text(&e.from), text(&e.to), text(&e.command));

        match e.kind {
            EventKind::NodeRecovered => {
                tracing::info!(target: "fleetvisor", node, %to, "node recovered");
            }
            EventKind::NodeLost => {
                tracing::warn!(target: "fleetvisor", node, %from, %command, reason, "node lost");
            }
            EventKind::StateChangedExternally => {
                tracing::info!(target: "fleetvisor", node, %from, %to, "state changed externally");
            }
            EventKind::AggregateTransitioned => {
                tracing::info!(target: "fleetvisor", %from, %to, "aggregate transitioned");
            }
            EventKind::Degraded => {
                tracing::error!(target: "fleetvisor", %from, reason, "aggregate degraded");
            }
            EventKind::Ready => {
                tracing::info!(target: "fleetvisor", %to, "load ready");
            }
            EventKind::OrchestrationError => {
                tracing::error!(target: "fleetvisor", node, %from, %to, "load aborted");
            }
            EventKind::LoadStarted => {
                tracing::info!(target: "fleetvisor", %to, "load started");
            }
            EventKind::CommandAccepted => {
                tracing::info!(target: "fleetvisor", %command, %from, %to, "command accepted");
            }
            EventKind::CommandRejected => {
                tracing::warn!(target: "fleetvisor", %command, %from, reason, "command rejected");
            }
            EventKind::LinkFault => {
                tracing::error!(target: "fleetvisor", node, %command, reason, "link fault; dispatch disarmed");
            }
            EventKind::DispatchRearmed => {
                tracing::info!(target: "fleetvisor", "dispatch re-armed");
            }
            EventKind::Reconfigured => {
                tracing::info!(target: "fleetvisor", reason, "node set reconfigured");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "fleetvisor", reason, "shutdown requested");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "fleetvisor", subscriber = node, reason, kind = e.kind.as_str(), "subscriber trouble");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
