//! # Seed Data Generator
//!
//! Writes the default rate configuration and packing-material catalog.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file
//! cargo run -p moowwee-db --bin seed
//!
//! # Specify database path
//! cargo run -p moowwee-db --bin seed -- --db ./data/moowwee.db
//! ```
//!
//! Safe to run repeatedly: the rate row is overwritten and catalog entries
//! are matched by machine name.

use anyhow::Context;
use chrono::Utc;
use std::env;
use moowwee_core::{Money, PackingMaterial, RateConfiguration};
use moowwee_db::{Database, DbConfig};

/// Default catalog: (name, display name, price in cents, full service)
const CATALOG: &[(&str, &str, i64, bool)] = &[
    ("full_service_packing", "Full Service Packing", 20_000, true),
    ("small_boxes", "Small Boxes", 300, false),
    ("medium_boxes", "Medium Boxes", 500, false),
    ("large_boxes", "Large Boxes", 700, false),
    ("wardrobe_boxes", "Wardrobe Boxes", 1_200, false),
    ("packing_paper", "Packing Paper", 600, false),
    ("plastic_tape", "Plastic Tape", 400, false),
    ("bubble_wrap", "Bubble Wrap", 1_000, false),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("moowwee_db=info"))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = "moowwee.db".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                i += 1;
                db_path = args
                    .get(i)
                    .context("--db requires a path")?
                    .clone();
            }
            "--help" | "-h" => {
                println!("Usage: seed [--db PATH]");
                println!();
                println!("Options:");
                println!("  --db, -d PATH     Database file path (default: moowwee.db)");
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    println!("🌱 Moowwee seed");
    println!("   Database: {}", db_path);

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("cannot open {}", db_path))?;

    let rates = RateConfiguration {
        hourly_rate: Money::from_dollars(125),
        floor_fee: Money::zero(),
        per_mile_fee: Money::from_dollars(2),
        piano_fee: Money::zero(),
        gun_safe_fee: Money::zero(),
        packing_materials: Vec::new(),
        updated_at: Utc::now(),
    };
    db.rates().save(&rates).await?;
    println!(
        "   ✓ Rates: {}/hour, {}/mile, {}/floor",
        rates.hourly_rate, rates.per_mile_fee, rates.floor_fee
    );

    for (position, (name, display_name, cents, full_service)) in CATALOG.iter().enumerate() {
        let material = PackingMaterial {
            id: 0,
            name: name.to_string(),
            display_name: display_name.to_string(),
            price: Money::from_cents(*cents),
            description: None,
            is_active: true,
            is_full_service: *full_service,
            sort_order: position as i32,
        };
        let id = db.rates().upsert_material(&material).await?;
        println!("   ✓ #{:<3} {:<22} {}", id, display_name, material.price);
    }

    let count = db.rates().count_materials().await?;
    println!("✅ Seed complete ({} catalog entries)", count);

    db.close().await;
    Ok(())
}
