// End-to-end scenarios through the public API

use chrono::{TimeZone, Utc};
use residential_console::{
    AggregatorConfig, FeedItem, GroupingStrategy, HouseGroupingEngine, InMemoryFeedHub,
    Residential, ResidentRecord, Scope, SubscriptionAggregator,
};

fn item(id: &str, secs: i64) -> FeedItem {
    FeedItem::new(id, Utc.timestamp_opt(secs, 0).unwrap())
}

fn row_ids(aggregator: &SubscriptionAggregator<InMemoryFeedHub>) -> Vec<String> {
    aggregator.results().iter().map(|r| r.item.id.clone()).collect()
}

#[test]
fn single_entity_feed_updates_in_place() {
    let hub = InMemoryFeedHub::new();
    let entities = vec![Residential::new("R1", "Los Pinos", "PIN01")];
    let mut aggregator = SubscriptionAggregator::new(hub.clone(), entities, &AggregatorConfig::default());

    aggregator.set_scope(Scope::SingleEntity("R1".to_string()));
    assert_eq!(hub.subscribers_of("R1"), 1);

    hub.publish("R1", vec![item("x1", 100)]);
    aggregator.pump();
    assert_eq!(row_ids(&aggregator), vec!["x1"]);

    hub.publish("R1", vec![item("x1", 100), item("x2", 200)]);
    aggregator.pump();
    assert_eq!(row_ids(&aggregator), vec!["x2", "x1"]);
    assert!(aggregator.results().iter().all(|r| r.source_label == "Los Pinos"));
}

#[test]
fn switching_entities_never_mixes_rows() {
    let hub = InMemoryFeedHub::new();
    let entities = vec![
        Residential::new("A", "Los Pinos", "PIN01"),
        Residential::new("B", "Los Olmos", "OLM02"),
    ];
    let mut aggregator = SubscriptionAggregator::new(hub.clone(), entities, &AggregatorConfig::default());

    aggregator.set_scope(Scope::SingleEntity("A".to_string()));
    hub.publish("A", vec![item("a1", 10)]);
    aggregator.pump();

    aggregator.set_scope(Scope::SingleEntity("B".to_string()));
    hub.publish("A", vec![item("a1", 10), item("a2", 20)]);
    hub.publish("B", vec![item("b1", 5)]);
    aggregator.pump();

    assert_eq!(row_ids(&aggregator), vec!["b1"]);
    assert_eq!(hub.active_subscriptions(), 1);

    // back to every entity: A's current snapshot is replayed on subscribe
    aggregator.set_scope(Scope::AllEntities);
    aggregator.pump();
    assert_eq!(row_ids(&aggregator), vec!["a2", "a1", "b1"]);
}

#[test]
fn dirty_street_names_collapse_to_one_house() {
    let records = vec![
        ResidentRecord::resident("", "Calle Juárez", "14"),
        ResidentRecord::resident("", "CALLE  JUAREZ", "14"),
        ResidentRecord::resident("", "calle juarez\u{200B}", "14"),
    ];

    for strategy in [GroupingStrategy::UnionFind, GroupingStrategy::OrderedIndex] {
        let grouping = HouseGroupingEngine::with_strategy(strategy).group_houses(&records);
        assert_eq!(grouping.house_count(), 1);
        assert_eq!(grouping.groups[0].member_count, 3);
        assert_eq!(grouping.groups[0].display_name, "Calle Juárez 14");
    }
}

#[test]
fn union_find_keys_ignore_record_order() {
    let mut records = vec![
        ResidentRecord::resident("X", "Pinos", "1"),
        ResidentRecord::resident("Y", "Pinos", "1"),
        ResidentRecord::resident("X", "Olmos", "2"),
        ResidentRecord::resident("", "Cedros", "9"),
    ];
    let engine = HouseGroupingEngine::new();
    let forward = engine.group_houses(&records);

    records.reverse();
    let backward = engine.group_houses(&records);

    assert_eq!(forward.keys(), backward.keys());
    for key in forward.keys() {
        assert_eq!(forward.member_count(key), backward.member_count(key));
    }
}
