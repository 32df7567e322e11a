//! List available strategies.

use anyhow::Result;
use std::sync::Arc;
use sync_engine::{MemoryCloudRepository, MemoryFileRepository, StrategyFactory, StrategyKind};

/// Run the strategies command.
pub fn run() -> Result<()> {
    let factory = StrategyFactory::new();

    println!("=== strategies ===");
    println!();
    for kind in StrategyKind::ALL {
        let strategy = factory.create_strategy(
            kind,
            Arc::new(MemoryFileRepository::new()),
            Arc::new(MemoryCloudRepository::new()),
        );
        let marker = if kind == StrategyKind::default() {
            " (default)"
        } else {
            ""
        };
        println!("{:<10} {}{}", kind.as_str(), strategy.name(), marker);
        println!("           {}", strategy.description());
    }
    Ok(())
}
