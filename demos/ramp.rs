//! # Ramp Example
//!
//! Brings a simulated fleet of four power supplies from `Off` to `Peak`
//! with a load sequence, then turns it off again.
//!
//! Demonstrates:
//! - Running the supervisory loop with a [`SupervisorHandle`]
//! - Staged ramp-up (`TurnOn` first, then the level command)
//! - Watching [`Status`] snapshots
//! - Rendering events through `tracing` with [`LogWriter`]
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example ramp
//! ```

use std::{sync::Arc, time::Duration};

use fleetvisor::{
    Command, Config, LogWriter, MemoryLink, NodeDescriptor, NodeState, Status, Subscribe,
    SupervisorBuilder, SupervisorHandle,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const NODES: [&str; 4] = ["hv-01", "hv-02", "hv-03", "hv-04"];

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let link = Arc::new(MemoryLink::new());
    for id in NODES {
        link.add_node(id, NodeState::Off);
    }

    let cfg = Config {
        poll_interval: Duration::from_millis(200),
        handle_signals: false,
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = SupervisorBuilder::new(cfg, link.clone())
        .with_nodes(
            NODES
                .iter()
                .enumerate()
                .map(|(i, id)| NodeDescriptor::new(*id, format!("sector{}", i + 1)))
                .collect(),
        )
        .with_subscribers(subs)
        .build()?;
    let handle = sup.handle();

    let token = CancellationToken::new();
    let running = tokio::spawn(sup.run(token.clone()));

    // Hardware ramp time: every endpoint reaches its level after 500ms.
    let hw = Arc::clone(&link);
    let hw_token = token.clone();
    tokio::spawn(async move {
        let mut every = tokio::time::interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                _ = hw_token.cancelled() => break,
                _ = every.tick() => hw.settle(),
            }
        }
    });

    wait_until(&handle, |s| s.aggregate == NodeState::Off).await?;
    println!(" ─► Fleet discovered: {}", render(&handle.status()));

    // ============================================================
    // Demo 1: load sequence to Peak
    // ============================================================
    println!(" ─► Loading to Peak...");
    handle.load(NodeState::Peak).await?;
    wait_until(&handle, |s| s.aggregate == NodeState::Peak && !s.loading).await?;
    println!(" ─► {}", render(&handle.status()));

    // ============================================================
    // Demo 2: step back down to Shoulder
    // ============================================================
    println!(" ─► Submitting Shoulder...");
    let report = handle.submit(Command::Shoulder, None).await?;
    println!(" ─► Sent to {} node(s)", report.sent.len());
    wait_until(&handle, |s| s.aggregate == NodeState::Shoulder).await?;

    // ============================================================
    // Demo 3: turn everything off
    // ============================================================
    println!(" ─► Turning off...");
    handle.submit(Command::TurnOff, None).await?;
    wait_until(&handle, |s| s.aggregate == NodeState::Off).await?;
    println!(" ─► {}", render(&handle.status()));

    token.cancel();
    running.await?;
    println!("Done");
    Ok(())
}

async fn wait_until(handle: &SupervisorHandle, f: impl Fn(&Status) -> bool) -> anyhow::Result<()> {
    let mut rx = handle.watch();
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|s| f(s))).await??;
    Ok(())
}

fn render(status: &Status) -> String {
    let nodes: Vec<String> = status
        .nodes
        .iter()
        .map(|n| format!("{}={}", n.identity, n.state))
        .collect();
    format!("aggregate={} [{}]", status.aggregate, nodes.join(" "))
}
