//! # Recover Example
//!
//! One endpoint stops answering while the fleet turns on. The aggregate
//! degrades to `Error`, further ramp commands are rejected, and `Recover`
//! brings every node back to `Off` once the endpoint is reachable again.
//!
//! Demonstrates:
//! - A custom [`Subscribe`] implementation (alarm counter)
//! - Driving the supervisor by hand with `tick` / `submit`
//! - `Recover` visiting nodes in reverse order
//!
//! ## Run
//! ```bash
//! cargo run --example recover
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use fleetvisor::{
    Command, Config, Event, EventKind, LogWriter, MemoryLink, NodeDescriptor, NodeState,
    Subscribe, SupervisorBuilder,
};
use tracing_subscriber::EnvFilter;

/// Counts alarms; a real one would page the shift crew.
#[derive(Default)]
struct Alarms {
    raised: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for Alarms {
    async fn on_event(&self, ev: &Event) {
        if matches!(ev.kind, EventKind::Degraded | EventKind::NodeLost) {
            let n = self.raised.fetch_add(1, Ordering::Relaxed) + 1;
            println!(
                "{:>4}[alarm #{n}] {} {}",
                "",
                ev.kind.as_str(),
                ev.reason.as_deref().unwrap_or("")
            );
        }
    }

    fn name(&self) -> &'static str {
        "alarms"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let link = Arc::new(
        MemoryLink::new()
            .with_node("hv-01", NodeState::Off)
            .with_node("hv-02", NodeState::Off)
            .with_node("hv-03", NodeState::Off),
    );
    let alarms = Arc::new(Alarms::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![alarms.clone(), Arc::new(LogWriter::new())];

    let mut sup = SupervisorBuilder::new(Config::default(), link.clone())
        .with_nodes(vec![
            NodeDescriptor::new("hv-01", "sector1"),
            NodeDescriptor::new("hv-02", "sector2"),
            NodeDescriptor::new("hv-03", "sector3"),
        ])
        .with_subscribers(subs)
        .build()?;

    sup.tick().await;
    println!(" ─► Aggregate: {}", sup.status().aggregate);

    // ============================================================
    // Demo 1: hv-02 drops off the network during TurnOn
    // ============================================================
    link.set_reachable("hv-02", false);
    let report = sup.submit(Command::TurnOn, None).await?;
    println!(
        " ─► TurnOn sent={} failed={} aggregate={}",
        report.sent.len(),
        report.failures.len(),
        sup.status().aggregate
    );

    // ============================================================
    // Demo 2: ramp commands are refused while degraded
    // ============================================================
    if let Err(e) = sup.submit(Command::Peak, None).await {
        println!(" ─► Peak refused: {e} ({})", e.as_label());
    }

    // ============================================================
    // Demo 3: Recover once the endpoint answers again
    // ============================================================
    link.set_reachable("hv-02", true);
    link.clear_sent();
    sup.submit(Command::Recover, None).await?;
    let order: Vec<String> = link.sent().into_iter().map(|(id, _)| id).collect();
    println!(" ─► Recover order: {}", order.join(" → "));

    link.settle();
    sup.tick().await;
    println!(" ─► Aggregate: {}", sup.status().aggregate);

    // Give subscriber workers a moment before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("Alarms raised: {}", alarms.raised.load(Ordering::Relaxed));
    Ok(())
}
