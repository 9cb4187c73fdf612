//! # Seed Data Generator
//!
//! Populates a development database with products, customers and tax
//! settings for one owner.
//!
//! ## Usage
//! ```bash
//! # Default owner "demo-shop", all catalog products, 25 customers
//! cargo run -p khata-db --bin seed
//!
//! # Another owner and database
//! cargo run -p khata-db --bin seed -- --owner shop-42 --db ./data/khata.db
//! ```
//!
//! Products go through the stock ledger, so every tracked product starts
//! with one `initial` movement and replays cleanly.

use std::env;
use std::time::Instant;

use khata_core::{Quantity, TaxSettings, UnitOfMeasure};
use khata_db::service::customer_ledger::NewCustomer;
use khata_db::service::stock_ledger::NewProduct;
use khata_db::{CallerContext, Database, DbConfig, Engine, EngineConfig};

/// (name, unit, price in paise, opening stock in thousandths)
const CATALOG: &[(&str, UnitOfMeasure, i64, i64)] = &[
    ("Basmati Rice", UnitOfMeasure::Kg, 9_500, 50_000),
    ("Sona Masoori Rice", UnitOfMeasure::Kg, 6_200, 80_000),
    ("Toor Dal", UnitOfMeasure::Kg, 14_000, 25_000),
    ("Moong Dal", UnitOfMeasure::Kg, 12_500, 20_000),
    ("Sugar", UnitOfMeasure::Kg, 4_500, 40_000),
    ("Atta", UnitOfMeasure::Kg, 3_800, 100_000),
    ("Sunflower Oil", UnitOfMeasure::Liter, 16_000, 30_000),
    ("Mustard Oil", UnitOfMeasure::Liter, 18_500, 15_000),
    ("Toned Milk", UnitOfMeasure::Liter, 5_400, 40_000),
    ("Turmeric Powder", UnitOfMeasure::Gram, 30, 2_000_000),
    ("Chilli Powder", UnitOfMeasure::Gram, 40, 1_500_000),
    ("Tea Leaves 250g", UnitOfMeasure::Piece, 14_500, 60_000),
    ("Biscuits Pack", UnitOfMeasure::Piece, 1_000, 200_000),
    ("Bath Soap", UnitOfMeasure::Piece, 3_500, 120_000),
    ("Detergent 1kg", UnitOfMeasure::Piece, 11_000, 45_000),
    ("Matchbox", UnitOfMeasure::Box, 200, 300_000),
    ("Eggs", UnitOfMeasure::Dozen, 8_400, 30_000),
    ("Bananas", UnitOfMeasure::Dozen, 6_000, 12_000),
    ("Carry Bag", UnitOfMeasure::Piece, 500, 0),
];

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Priya", "Rohan", "Ananya", "Vikram", "Meera", "Arjun", "Kavya", "Sanjay", "Divya",
];

const LAST_NAMES: &[&str] = &["Sharma", "Iyer", "Patel", "Reddy", "Gupta"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./khata_dev.db");
    let mut owner = String::from("demo-shop");
    let mut customers: usize = 25;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner = args[i + 1].clone();
                    i += 1;
                }
            }
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    customers = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Khata Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./khata_dev.db)");
                println!("  -o, --owner <ID>       Owner account id (default: demo-shop)");
                println!("  -c, --customers <N>    Number of customers (default: 25)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Khata Seed Data Generator");
    println!("=========================");
    println!("Database:  {}", db_path);
    println!("Owner:     {}", owner);
    println!("Customers: {}", customers);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count(&owner).await?;
    if existing > 0 {
        println!("⚠ Owner already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    db.settings()
        .set_tax_settings(
            &owner,
            TaxSettings {
                enabled: true,
                rate_bps: 500,
            },
        )
        .await?;
    println!("✓ Tax settings: 5% enabled");

    let engine = Engine::new(db.clone(), EngineConfig::default());
    let ctx = CallerContext::new(&owner, Some("seed"))?;
    let start = Instant::now();

    println!();
    println!("Generating products...");
    let mut created = 0;
    for (name, unit, price_cents, stock_milli) in CATALOG {
        let request = NewProduct {
            name: name.to_string(),
            category_id: None,
            price_cents: *price_cents,
            unit: *unit,
            initial_stock: Quantity::from_milli(*stock_milli),
            // Carry bags are handed out freely
            is_stock_required: *stock_milli > 0,
            min_quantity: None,
        };

        match engine.stock().create_product(&ctx, request).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("Failed to create {}: {}", name, e),
        }
    }
    println!("  Created {} products", created);

    println!();
    println!("Generating customers...");
    let mut created = 0;
    for n in 0..customers {
        let first = FIRST_NAMES[n % FIRST_NAMES.len()];
        let last = LAST_NAMES[(n / FIRST_NAMES.len()) % LAST_NAMES.len()];
        let request = NewCustomer {
            name: format!("{} {}", first, last),
            phone: Some(format!("98{:08}", 45_000_000 + n * 7_919)),
            email: None,
            address: None,
        };

        match engine.customers().create_customer(&ctx, request).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("Failed to create customer {}: {}", n, e),
        }
    }
    println!("  Created {} customers", created);

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    db.close().await;
    Ok(())
}
