//! Warclaim Headless Simulation Harness
//!
//! Validates the territory economy and its data files without a game server.
//! Runs entirely in-process on a simulated clock.
//!
//! Usage:
//!   cargo run -p warclaim-simtest
//!   cargo run -p warclaim-simtest -- --verbose
//!   cargo run -p warclaim-simtest -- --json

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use warclaim_core::prelude::*;
use warclaim_logic::bonuses::aggregate_costs;
use warclaim_logic::config::validate_config;
use warclaim_logic::economy::{produced_emeralds, StorageCapacity};
use warclaim_logic::ledger::{self, ResourceFlags};
use warclaim_logic::routing::TerritoryGraph;

// ── Data files (same JSON a server would load) ──────────────────────────
const MAP_JSON: &str = include_str!("../../../data/territories.json");
const BONUS_JSON: &str = include_str!("../../../data/bonuses.json");

const HEADQUARTERS: &str = "Ragni";
const ISLAND: &str = "Selchar";

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    passed: usize,
    failed: usize,
    results: &'a [TestResult],
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let json = std::env::args().any(|a| a == "--json");
    if !json {
        println!("=== Warclaim Simulation Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Map and bonus data
    let Some((map, table)) = validate_data(&mut results, verbose && !json) else {
        report(&results, verbose, json);
        return;
    };

    // 2. Production and storage formulas
    results.extend(validate_formulas(verbose && !json));

    // 3. Store and debit algorithms
    results.extend(validate_ledger_algorithms(verbose && !json));

    // 4. Routing on the map graph
    results.extend(validate_routing(&map, verbose && !json));

    // 5. Ten simulated minutes on the full map
    results.extend(validate_claim_run(&map, &table, verbose && !json));

    // 6. Parallel ticking and persistence
    results.extend(validate_parallel_and_save(&map, &table, verbose && !json));

    report(&results, verbose, json);
}

fn report(results: &[TestResult], verbose: bool, json: bool) {
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    if json {
        let summary = Summary {
            passed,
            failed,
            results,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("failed to encode report: {}", e),
        }
    } else {
        println!();
        for r in results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
        println!(
            "\n=== RESULT: {}/{} passed, {} failed ===",
            passed,
            results.len(),
            failed
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Data ─────────────────────────────────────────────────────────────

fn validate_data(
    results: &mut Vec<TestResult>,
    verbose: bool,
) -> Option<(Vec<MapTerritory>, BonusTable)> {
    if verbose {
        println!("--- Data ---");
    }

    let map = match load_map(MAP_JSON) {
        Ok(m) => m,
        Err(e) => {
            results.push(TestResult::check(
                "map_parse",
                false,
                format!("JSON parse error: {}", e),
            ));
            return None;
        }
    };
    let table = match load_bonus_table(BONUS_JSON) {
        Ok(t) => t,
        Err(e) => {
            results.push(TestResult::check(
                "bonus_parse",
                false,
                format!("JSON parse error: {}", e),
            ));
            return None;
        }
    };

    results.push(TestResult::check(
        "map_not_empty",
        map.len() >= 10,
        format!("{} territories", map.len()),
    ));

    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = map
        .iter()
        .filter(|t| !seen.insert(t.name.to_lowercase()))
        .map(|t| t.name.as_str())
        .collect();
    results.push(TestResult::check(
        "map_names_unique",
        duplicates.is_empty(),
        format!("duplicates: {:?}", duplicates),
    ));

    let known = &seen;
    let dangling: Vec<String> = map
        .iter()
        .flat_map(|t| {
            t.conns
                .iter()
                .filter(move |c| !known.contains(&c.to_lowercase()))
                .map(move |c| format!("{} -> {}", t.name, c))
        })
        .collect();
    results.push(TestResult::check(
        "map_connections_resolve",
        dangling.is_empty(),
        format!("dangling: {:?}", dangling),
    ));

    let negative: Vec<&str> = map
        .iter()
        .filter(|t| ResourceKind::ALL.iter().any(|k| t.multiplier(*k) < 0.0))
        .map(|t| t.name.as_str())
        .collect();
    results.push(TestResult::check(
        "map_multipliers_non_negative",
        negative.is_empty(),
        format!("negative: {:?}", negative),
    ));

    let missing: Vec<&str> = BonusKey::ALL
        .iter()
        .filter(|k| table.definition(**k).is_none())
        .map(|k| k.as_str())
        .collect();
    results.push(TestResult::check(
        "bonus_table_complete",
        missing.is_empty(),
        format!("{} keys, missing: {:?}", table.len(), missing),
    ));
    results.push(TestResult::check(
        "bonus_table_matches_builtin",
        table == BonusTable::standard(),
        "data/bonuses.json vs BonusTable::standard()".into(),
    ));

    let errors = validate_config(&EconomyConfig::default());
    results.push(TestResult::check(
        "default_config_valid",
        errors.is_empty(),
        format!("{:?}", errors),
    ));

    Some((map, table))
}

// ── 2. Formulas ─────────────────────────────────────────────────────────

fn validate_formulas(verbose: bool) -> Vec<TestResult> {
    if verbose {
        println!("--- Formulas ---");
    }
    let config = EconomyConfig::default();
    let mut results = Vec::new();

    let emeralds = produced_emeralds(&config, 0.0, 2.0);
    results.push(TestResult::check(
        "emerald_production_x2",
        emeralds == 5,
        format!("trunc(2.5 * 2.0) = {}", emeralds),
    ));

    let base = StorageCapacity::compute(&config, 0.0, 0.0, false);
    let hq = StorageCapacity::compute(&config, 0.0, 0.0, true);
    results.push(TestResult::check(
        "base_capacity",
        base.resource == 300 && base.emerald == 3000,
        format!("{:?}", base),
    ));
    results.push(TestResult::check(
        "hq_capacity",
        hq.resource == 500 && hq.emerald == 15_000,
        format!("{:?}", hq),
    ));

    let boosted = StorageCapacity::compute(&config, 100.0, 300.0, false);
    results.push(TestResult::check(
        "storage_bonus_capacity",
        boosted.resource == 600 && boosted.emerald == 12_000,
        format!("{:?}", boosted),
    ));

    let table = BonusTable::standard();
    let mut levels = warclaim_logic::bonuses::default_bonus_levels();
    let idle = aggregate_costs(&table, &levels);
    levels.insert(BonusKey::TowerAura, 2);
    levels.insert(BonusKey::EmeraldRate, 3);
    let busy = aggregate_costs(&table, &levels);
    results.push(TestResult::check(
        "upkeep_aggregation",
        idle.is_empty() && busy.get(ResourceKind::Crop) == 9,
        format!("idle {:?}, busy crop {}", idle, busy.get(ResourceKind::Crop)),
    ));

    results
}

// ── 3. Ledger algorithms ────────────────────────────────────────────────

fn relay(kind: ResourceKind, amount: i64) -> Transference {
    Transference::new(
        "relay",
        TransferDirection::TerritoryToHq,
        TerritoryId(1),
        TerritoryId(0),
        Ledger::from_pairs(&[(kind, amount)]),
    )
}

fn validate_ledger_algorithms(verbose: bool) -> Vec<TestResult> {
    if verbose {
        println!("--- Ledger ---");
    }
    let capacity = StorageCapacity {
        resource: 300,
        emerald: 3000,
    };
    let mut results = Vec::new();

    let mut held = Ledger::from_pairs(&[(ResourceKind::Ore, 285)]);
    let mut flags = ResourceFlags::default();
    ledger::store(
        &mut held,
        &mut flags,
        &Ledger::from_pairs(&[(ResourceKind::Ore, 30)]),
        &capacity,
    );
    results.push(TestResult::check(
        "overflow_clamps",
        held.get(ResourceKind::Ore) == 300 && flags.overflow(ResourceKind::Ore),
        format!("ore {}", held.get(ResourceKind::Ore)),
    ));

    let costs = Ledger::from_pairs(&[(ResourceKind::Crop, 50)]);
    let mut held = Ledger::from_pairs(&[(ResourceKind::Crop, 20)]);
    let mut flags = ResourceFlags::default();
    let mut relays = vec![relay(ResourceKind::Crop, 45)];
    ledger::debit(&mut held, &mut flags, &mut relays, &costs);
    let relay_left = relays[0].payload.get(ResourceKind::Crop);
    results.push(TestResult::check(
        "deficit_covered_by_relay",
        held.get(ResourceKind::Crop) == 0 && relay_left == 15 && !flags.gap(ResourceKind::Crop),
        format!("held {}, relay {}", held.get(ResourceKind::Crop), relay_left),
    ));

    let mut held = Ledger::from_pairs(&[(ResourceKind::Crop, 20)]);
    let mut flags = ResourceFlags::default();
    let mut relays = vec![relay(ResourceKind::Crop, 10)];
    ledger::debit(&mut held, &mut flags, &mut relays, &costs);
    let relay_left = relays[0].payload.get(ResourceKind::Crop);
    results.push(TestResult::check(
        "deficit_uncovered_sets_gap",
        held.get(ResourceKind::Crop) == 20 && relay_left == 10 && flags.gap(ResourceKind::Crop),
        format!("held {}, relay {}", held.get(ResourceKind::Crop), relay_left),
    ));

    results
}

// ── 4. Routing ──────────────────────────────────────────────────────────

fn validate_routing(map: &[MapTerritory], verbose: bool) -> Vec<TestResult> {
    if verbose {
        println!("--- Routing ---");
    }
    let graph = TerritoryGraph::from_connections(
        map.iter()
            .map(|t| (t.name.as_str(), t.conns.iter().map(String::as_str))),
    );
    let mut results = Vec::new();
    let (Some(hq), Some(island)) = (graph.id_of(HEADQUARTERS), graph.id_of(ISLAND)) else {
        results.push(TestResult::check(
            "routing_landmarks",
            false,
            format!("{} or {} missing from map", HEADQUARTERS, ISLAND),
        ));
        return results;
    };

    let mut unreachable = Vec::new();
    for id in graph.ids() {
        if id == hq || id == island {
            continue;
        }
        if GraphRouter.route(&graph, id, hq, RouteStyle::Fastest).is_empty() {
            unreachable.push(graph.name_of(id).unwrap_or("?").to_string());
        }
    }
    results.push(TestResult::check(
        "mainland_reaches_headquarters",
        unreachable.is_empty(),
        format!("unreachable: {:?}", unreachable),
    ));

    results.push(TestResult::check(
        "island_unreachable",
        GraphRouter
            .route(&graph, island, hq, RouteStyle::Cheapest)
            .is_empty(),
        format!("{} has no connections", ISLAND),
    ));

    let mut route_ok = true;
    for id in graph.ids() {
        let fastest = GraphRouter.route(&graph, id, hq, RouteStyle::Fastest);
        let cheapest = GraphRouter.route(&graph, id, hq, RouteStyle::Cheapest);
        if fastest.len() > cheapest.len() && !cheapest.is_empty() {
            route_ok = false;
        }
        if !fastest.is_empty() && fastest.last() != Some(&hq) {
            route_ok = false;
        }
    }
    results.push(TestResult::check(
        "route_shapes",
        route_ok,
        "fastest never longer than cheapest, routes end at the headquarters".into(),
    ));

    results
}

// ── 5. Claim run ────────────────────────────────────────────────────────

fn build_engine(map: &[MapTerritory], table: &BonusTable) -> Option<ClaimEngine> {
    let claim = Claim::from_map("Harness Guild", map, EconomyConfig::default())
        .ok()?
        .with_catalog(Arc::new(table.clone()));
    claim.set_headquarters(HEADQUARTERS).ok()?;
    Some(ClaimEngine::new(claim))
}

fn capacity_violations(engine: &ClaimEngine) -> Vec<String> {
    let claim = engine.claim();
    let catalog = claim.services().catalog.clone();
    let mut violations = Vec::new();
    for territory in claim.snapshot_all() {
        let capacity = territory.capacity(claim.config(), catalog.as_ref());
        for (kind, amount) in territory.ledger.iter() {
            if amount < 0 || amount > capacity.for_kind(kind) {
                violations.push(format!("{} {}={}", territory.name(), kind, amount));
            }
        }
    }
    violations
}

fn validate_claim_run(map: &[MapTerritory], table: &BonusTable, verbose: bool) -> Vec<TestResult> {
    if verbose {
        println!("--- Claim run (10 simulated minutes) ---");
    }
    let mut results = Vec::new();
    let Some(mut engine) = build_engine(map, table) else {
        results.push(TestResult::check(
            "claim_build",
            false,
            "map did not form a valid claim".into(),
        ));
        return results;
    };

    // A few territories run bonuses they cannot afford
    for name in ["Detlas", "Almuj"] {
        if let Some(id) = engine.claim().territory_id(name) {
            engine.claim().with_territory_mut(id, |t| {
                t.set_bonus_level(BonusKey::TowerAura, 3);
                t.set_bonus_level(BonusKey::EfficientResource, 2);
            });
        }
    }

    let mut worst = Vec::new();
    let mut events = Vec::new();
    for _ in 0..600 {
        engine.update(1_000);
        let violations = capacity_violations(&engine);
        if worst.is_empty() && !violations.is_empty() {
            worst = violations;
        }
        events.extend(engine.drain_events());
    }

    results.push(TestResult::check(
        "capacity_invariant",
        worst.is_empty(),
        format!("first violations: {:?}", worst),
    ));

    let hq_stock = engine
        .claim()
        .territory_id(HEADQUARTERS)
        .and_then(|id| engine.claim().with_territory(id, |t| t.ledger.clone()))
        .unwrap_or_default();
    let funneled = ResourceKind::RAW.iter().all(|k| hq_stock.get(*k) > 0);
    results.push(TestResult::check(
        "headquarters_collects",
        funneled,
        format!("{:?}", hq_stock),
    ));

    let delivered = events
        .iter()
        .filter(|e| matches!(e.event, EconomyEvent::Delivered { .. }))
        .count();
    let relayed = events
        .iter()
        .filter(|e| matches!(e.event, EconomyEvent::Relayed { .. }))
        .count();
    results.push(TestResult::check(
        "parcels_move",
        delivered > 0 && relayed > 0,
        format!("{} delivered, {} relayed", delivered, relayed),
    ));

    let island = engine.claim().territory_id(ISLAND);
    let (queued, held) = island
        .and_then(|id| {
            engine
                .claim()
                .with_territory(id, |t| (t.relay_queue.len(), t.ledger.total()))
        })
        .unwrap_or((0, 0));
    let stalls = events
        .iter()
        .filter(|e| {
            matches!(
                e.event,
                EconomyEvent::TransferStalled {
                    reason: StallReason::NoRoute,
                    ..
                }
            )
        })
        .count();
    results.push(TestResult::check(
        "island_keeps_stock",
        queued == 0 && held > 0 && stalls > 0,
        format!("{} queued, {} held, {} stall events", queued, held, stalls),
    ));

    let shortfalls = events
        .iter()
        .filter(|e| matches!(e.event, EconomyEvent::Shortfall { .. }))
        .count();
    let requested = engine.claim().requested_totals();
    results.push(TestResult::check(
        "upkeep_accounted",
        shortfalls > 0 && requested.get(ResourceKind::Crop) > 0,
        format!("{} shortfalls, requested {:?}", shortfalls, requested),
    ));

    if verbose {
        println!("  total stock after 10 min: {:?}", engine.total_stock());
    }

    results
}

// ── 6. Parallel ticking and persistence ─────────────────────────────────

fn validate_parallel_and_save(
    map: &[MapTerritory],
    table: &BonusTable,
    verbose: bool,
) -> Vec<TestResult> {
    if verbose {
        println!("--- Parallel & persistence ---");
    }
    let mut results = Vec::new();
    let (Some(mut sequential), Some(mut parallel)) =
        (build_engine(map, table), build_engine(map, table))
    else {
        results.push(TestResult::check(
            "claim_build",
            false,
            "map did not form a valid claim".into(),
        ));
        return results;
    };

    for _ in 0..300 {
        sequential.update(1_000);
        parallel.update_parallel(1_000, 4);
    }
    results.push(TestResult::check(
        "parallel_run_invariants",
        capacity_violations(&parallel).is_empty()
            && parallel.total_stock().get(ResourceKind::Emerald) > 0,
        format!(
            "sequential {:?}, parallel {:?}",
            sequential.total_stock(),
            parallel.total_stock()
        ),
    ));

    let mut buffer = Vec::new();
    let saved = sequential.save(&mut buffer);
    let restored = build_engine(map, table).and_then(|mut engine| {
        engine.load(&buffer[..]).ok()?;
        Some(engine)
    });
    match (saved, restored) {
        (Ok(()), Some(mut restored)) => {
            sequential.run_for(120_000, 1_000);
            restored.run_for(120_000, 1_000);
            results.push(TestResult::check(
                "save_load_continues",
                sequential.total_stock() == restored.total_stock(),
                format!("{} bytes", buffer.len()),
            ));
        }
        (saved, _) => results.push(TestResult::check(
            "save_load_continues",
            false,
            format!("save result {:?}", saved.err().map(|e| e.to_string())),
        )),
    }

    results
}
