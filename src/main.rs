use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use std::env;
use std::path::Path;

use residential_console::{
    init_tracing, load_residents, ConsoleConfig, FeedItem, InMemoryFeedHub, Residential, Scope,
    SubscriptionAggregator,
};

fn main() -> Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();
    let config = ConsoleConfig::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("houses") => match args.get(2) {
            Some(path) => run_houses(Path::new(path), &config)?,
            None => bail!("usage: residential-console houses <residents.csv|residents.json>"),
        },
        Some("demo") => run_demo(&config)?,
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("residential-console {}", residential_console::VERSION);
    println!();
    println!("  houses <file>   Group resident records (CSV or JSON) into houses");
    println!("  demo            Merge two in-memory live feeds and print the result");
}

fn run_houses(path: &Path, config: &ConsoleConfig) -> Result<()> {
    println!("🏠 House Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading residents...");
    let records = load_residents(path)?;
    println!("✓ Loaded {} records from {}", records.len(), path.display());

    let engine = config.grouping.engine();
    let grouping = engine.group_houses(&records);

    println!("\n🔍 Grouping ({})...", grouping.strategy.as_str());
    for group in &grouping.groups {
        println!("  {:<32} {:>3}  [{}]", group.display_name, group.member_count, group.key);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Houses: {}", grouping.house_count());
    println!("✓ Grouped residents: {}", grouping.total_members());
    println!("✓ Excluded records: {}", grouping.excluded);

    Ok(())
}

fn run_demo(config: &ConsoleConfig) -> Result<()> {
    println!("📡 Feed Aggregation Demo");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let at = |secs: i64| Utc.timestamp_opt(secs, 0).single();
    let (Some(t1), Some(t2), Some(t3)) = (at(1_700_000_000), at(1_700_000_600), at(1_700_001_200))
    else {
        bail!("demo timestamps out of range");
    };

    let hub = InMemoryFeedHub::new();
    let entities = vec![
        Residential::new("R1", "Los Pinos", "PIN01"),
        Residential::new("R2", "Los Olmos", "OLM02"),
    ];
    let mut aggregator = SubscriptionAggregator::new(hub.clone(), entities, &config.aggregator);

    aggregator.set_scope(Scope::AllEntities);
    hub.publish("R1", vec![FeedItem::new("visit-1", t1)]);
    hub.publish("R2", vec![FeedItem::new("visit-2", t2)]);
    hub.publish("R1", vec![FeedItem::new("visit-1", t1), FeedItem::new("visit-3", t3)]);
    let merged = aggregator.pump();

    println!("\n✓ Merged {} payloads from {} feeds", merged, aggregator.active_sources().len());
    for row in aggregator.results() {
        println!("  {}  {:<10} {}", row.item.timestamp.to_rfc3339(), row.item.id, row.source_label);
    }

    aggregator.teardown();
    println!("\n✅ Feeds closed ({} still open)", hub.active_subscriptions());

    Ok(())
}
