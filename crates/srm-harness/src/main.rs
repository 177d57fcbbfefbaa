//! SRM harness
//!
//! Runs the end-to-end scenario against a SQLite database: create the tables, persist
//! a small reference graph, then read it back through single-entity, nested and
//! multi-entity queries.
//!
//! # Usage
//!
//! ```bash
//! # Uses ./conf.json
//! srm-harness
//!
//! # Custom configuration, SQL logged
//! srm-harness --conf /tmp/harness.json --log-level debug
//! ```
//!
//! The configuration file wraps a `DatabaseConfig`:
//!
//! ```json
//! { "databaseConfig": { "database": "harness.db", "schema": "harness" } }
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use srm::prelude::*;
use srm_core::config::load_json;
use srm_sqlite::SqliteProvider;

#[derive(Entity, Debug, Clone, Default)]
struct Master1 {
    #[srm(schema = "harness")]
    id: i64,
    name: String,
}

#[derive(Entity, Debug, Clone, Default)]
struct Master2 {
    #[srm(schema = "harness")]
    id: i64,
    name: String,
}

#[derive(Entity, Debug, Clone, Default)]
struct Detail {
    #[srm(schema = "harness")]
    id: i64,
    master1: Master1,
    master2: Master2,
    name: String,
}

#[derive(Entity, Debug, Clone, Default)]
struct YetAnother {
    #[srm(schema = "harness")]
    id: i64,
    detail: Detail,
    name: String,
    date: Date,
    time: Time,
    timestamp: Timestamp,
    double: f64,
}

/// On-disk configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarnessConfig {
    #[serde(rename = "databaseConfig")]
    database_config: DatabaseConfig,
}

/// SRM end-to-end harness
#[derive(Parser, Debug)]
#[command(name = "srm-harness", version, about = "Exercise SRM against SQLite")]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", default_value = "conf.json")]
    conf: PathBuf,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "SRM_LOG_LEVEL")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config: HarnessConfig = load_json(&args.conf)
        .with_context(|| format!("Failed to load config file {}", args.conf.display()))?;
    info!(database = %config.database_config.database, "Loaded configuration");

    let manager = Manager::new(config.database_config, SqliteProvider::new());
    let created = manager
        .create_tables(&[
            Master1::descriptor(),
            Master2::descriptor(),
            Detail::descriptor(),
            YetAnother::descriptor(),
        ])
        .context("Failed to create tables")?;
    info!(tables = ?created, "Schema ready");

    manager
        .transactional(run_scenario)
        .context("Scenario failed")?;
    Ok(())
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_new(format!(
        "srm={level},srm_session={level},srm_schema={level},srm_sqlite={level},srm_harness={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn run_scenario(tx: &Transaction<srm_sqlite::SqliteConnection>) -> srm::Result<()> {
    let mut first = Master1 {
        id: 0,
        name: "Master 1".to_string(),
    };
    tx.persist(&mut first)?;
    let mut m1 = Master1 {
        id: 0,
        name: "Master 1'".to_string(),
    };
    tx.persist(&mut m1)?;
    let mut m2 = Master2 {
        id: 0,
        name: "Master 2".to_string(),
    };
    tx.persist(&mut m2)?;

    let mut detail = Detail {
        id: 0,
        master1: m1.clone(),
        master2: m2.clone(),
        name: "Detail".to_string(),
    };
    tx.persist(&mut detail)?;

    let mut ya = YetAnother {
        id: 0,
        detail: detail.clone(),
        name: "Y A".to_string(),
        date: Date::today(),
        time: Time::now(),
        timestamp: Timestamp::now(),
        double: 0.0,
    };
    tx.persist(&mut ya)?;

    let details = tx.query::<Detail>(
        "where o_master1.id = $1 and o_master2.id = $2",
        &[Value::BigInt(m1.id), Value::BigInt(m2.id)],
    )?;
    for d in &details {
        println!("{} {}", d.name, d.master1.name);
    }

    let nested = tx.query::<YetAnother>("where o_detail_master1.id = $1", &[Value::BigInt(m1.id)])?;
    for y in &nested {
        println!("{} {}", y.name, y.detail.master1.name);
    }

    if let Some(found) = tx.find::<Master1>(first.id)? {
        println!("{}", found.name);
    }

    for m in tx.query::<Master1>("", &[])? {
        println!("{} {}", m.id, m.name);
    }

    let rows = tx.query_multi(
        &[
            Master1::descriptor(),
            Detail::descriptor(),
            YetAnother::descriptor(),
        ],
        &left_outer("o2.master1_id = o1.id").left_outer("o3.detail_id = o2.id"),
        "order by o1.id",
        &[],
    )?;
    for row in &rows {
        let master = row.get::<Master1>(0)?;
        let detail = row.get::<Detail>(1)?;
        let another = row.get::<YetAnother>(2)?;
        println!(
            "{} {:?} {:?}",
            master.map_or_else(String::new, |m| m.name),
            detail.map(|d| d.name),
            another.map(|y| y.name)
        );
    }

    info!(debug = ?tx.debug_info(), "Scenario finished");
    Ok(())
}
