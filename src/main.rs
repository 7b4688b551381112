// src/main.rs

use std::env;
use std::process;

use log::{debug, info, warn};

use keyset::storage::memory::{MemoryTable, TableSchema};
use keyset::{BatchesExt, IterateOptions, KeysetResult, Order, iterate_select_query};

const DEFAULT_ROWS: usize = 25;
const DEFAULT_BATCH: usize = 10;

fn usage() -> ! {
    eprintln!("usage: keyset [rows] [batch] [asc|desc] [--items]");
    process::exit(2);
}

fn seed(rows: usize) -> KeysetResult<MemoryTable> {
    let schema = TableSchema::new(
        "users",
        &[("id", "INTEGER"), ("name", "TEXT"), ("created_at", "TIMESTAMP")],
    )?
    .with_primary_key("id")?;
    let table = MemoryTable::new(schema);
    for i in 1..=rows {
        let values = vec![
            i.to_string(),
            format!("user{}", i),
            format!("2024-01-01 00:{:02}:{:02}", (i / 60) % 60, i % 60),
        ];
        table.insert_values(&values)?;
    }
    debug!("seeded {} rows", table.len());
    Ok(table)
}

fn run(rows: usize, batch: usize, order: Order, items: bool) -> KeysetResult<()> {
    let table = seed(rows)?;
    let spec = {
        let table = table.clone();
        move || table.query()
    };
    let batches = iterate_select_query(spec, IterateOptions::new(batch, "id").order(order))?;

    if items {
        for item in batches.items() {
            let row = item?;
            let fields: Vec<String> = row.values().map(|v| v.to_string()).collect();
            println!("{}", fields.join(" | "));
        }
    } else {
        for (n, page) in batches.enumerate() {
            let page = page?;
            let ids: Vec<String> = page
                .iter()
                .filter_map(|r| r.get("id"))
                .map(|v| v.to_string())
                .collect();
            println!("batch {}: [{}]", n + 1, ids.join(", "));
        }
    }

    let stats = table.stats();
    info!("done: {} count queries, {} page queries", stats.counts, stats.fetches);
    Ok(())
}

fn main() {
    env_logger::init();

    let mut positional = Vec::new();
    let mut items = false;
    for arg in env::args().skip(1) {
        if arg == "--items" {
            items = true;
        } else if arg == "-h" || arg == "--help" {
            usage();
        } else {
            positional.push(arg);
        }
    }

    let rows = match positional.first() {
        Some(s) => s.parse().unwrap_or_else(|_| usage()),
        None => DEFAULT_ROWS,
    };
    let batch = match positional.get(1) {
        Some(s) => s.parse().unwrap_or_else(|_| usage()),
        None => DEFAULT_BATCH,
    };
    let order = match positional.get(2) {
        Some(s) => Order::from_str(s).unwrap_or_else(|| usage()),
        None => Order::Asc,
    };

    info!("iterating {} rows in batches of {} ({})", rows, batch, order.as_str());
    if let Err(e) = run(rows, batch, order, items) {
        warn!("iteration failed: {}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
