//! # Seed Data Generator
//!
//! Populates the database with demo invoices for development.
//!
//! ## Usage
//! ```bash
//! # Generate 40 invoices for org "demo-org" (default)
//! cargo run -p crewbook-db --bin seed
//!
//! # Generate custom amount for another org
//! cargo run -p crewbook-db --bin seed -- --count 200 --org acme
//!
//! # Specify database path
//! cargo run -p crewbook-db --bin seed -- --db ./data/crewbook.db
//! ```
//!
//! ## Generated Invoices
//! Each invoice bills one job with one to three lines of contracting work,
//! a flat tax amount, and a customer snapshot. Invoices are spread over the
//! last twelve months and cycle through every status:
//! - draft (left as created)
//! - sent
//! - paid (sent first, then paid a few days later)
//! - void

use chrono::{Duration, Utc};
use crewbook_core::invoice::InvoiceDraft;
use crewbook_core::{Customer, InvoiceLine};
use crewbook_db::{Database, DbConfig};
use std::env;

/// Line items for realistic invoices: (label, base amount in cents)
const WORK: &[(&str, i64)] = &[
    ("Framing labor", 185_000),
    ("Drywall install", 92_500),
    ("Electrical rough-in", 140_000),
    ("Plumbing fixtures", 67_800),
    ("Roof tear-off", 210_000),
    ("Interior paint", 48_900),
    ("Tile backsplash", 31_250),
    ("Deck rebuild", 265_000),
    ("Permit fees", 12_500),
    ("Debris haul-away", 9_800),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Dana Reyes", "dana@example.com"),
    ("Marcus Hill", "marcus@example.com"),
    ("Priya Shah", "priya@example.com"),
    ("Tom Becker", "tom@example.com"),
    ("Alma Ortiz", "alma@example.com"),
];

const STREETS: &[&str] = &["Elm St", "Oak Ave", "Cedar Ln", "Maple Dr", "Birch Rd"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut org_id = String::from("demo-org");
    let mut db_path = String::from("./crewbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--org" | "-o" => {
                if i + 1 < args.len() {
                    org_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Crewbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of invoices to generate (default: 40)");
                println!("  -o, --org <ID>     Organization id (default: demo-org)");
                println!("  -d, --db <PATH>    Database file path (default: ./crewbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Crewbook Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Org:      {}", org_id);
    println!("Invoices: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing invoices
    let existing = db.invoices().count(&org_id).await?;
    if existing > 0 {
        println!("⚠ Org {} already has {} invoices", org_id, existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating invoices...");

    let mut generated = 0;
    let mut paid = 0;
    let start = std::time::Instant::now();
    let now = Utc::now();

    for seed in 0..count {
        // Spread creation over the last ~12 months, oldest first
        let created_at = now - Duration::days(((count - seed) * 365 / count.max(1)) as i64);
        let draft = generate_draft(&org_id, seed);

        let invoice = match db.invoices().create(draft, created_at).await {
            Ok(invoice) => invoice,
            Err(e) => {
                eprintln!("Failed to create invoice {}: {}", seed, e);
                continue;
            }
        };

        match seed % 4 {
            1 => {
                db.invoices()
                    .mark_sent(&invoice.id, created_at + Duration::days(1))
                    .await?;
            }
            2 => {
                db.invoices()
                    .mark_sent(&invoice.id, created_at + Duration::days(1))
                    .await?;
                db.invoices()
                    .mark_paid(&invoice.id, created_at + Duration::days(14))
                    .await?;
                paid += 1;
            }
            3 if seed % 8 == 7 => {
                db.invoices().void(&invoice.id).await?;
            }
            _ => {}
        }

        generated += 1;

        if generated % 50 == 0 {
            println!("  Generated {} invoices...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} invoices ({} paid) in {:?}", generated, paid, elapsed);

    // Verify numbering
    println!();
    println!("Verifying invoice numbers...");
    let year = chrono::Datelike::year(&now);
    let current = db.counters().current(&org_id, year).await?;
    println!("  Counter for {}: {:?}", year, current);
    let listed = db.invoices().list_for_org(&org_id).await?;
    if let Some(latest) = listed.first() {
        println!("  Latest number: {}", latest.number);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single invoice draft with realistic data.
fn generate_draft(org_id: &str, seed: usize) -> InvoiceDraft {
    let line_count = 1 + seed % 3;
    let lines: Vec<InvoiceLine> = (0..line_count)
        .map(|n| {
            let (label, base) = WORK[(seed * 3 + n) % WORK.len()];
            // Vary the amount by up to ±10%
            let swing = ((seed * 37 + n * 11) % 21) as i64 - 10;
            InvoiceLine {
                id: format!("line-{}", n + 1),
                label: label.to_string(),
                amount_cents: base + base * swing / 100,
            }
        })
        .collect();

    // Flat tax of 8.25% on the subtotal, rounded down to the cent
    let subtotal: i64 = lines.iter().map(|l| l.amount_cents).sum();
    let tax_cents = subtotal * 825 / 10_000;

    let (name, email) = CUSTOMERS[seed % CUSTOMERS.len()];
    let street = STREETS[seed % STREETS.len()];

    InvoiceDraft {
        org_id: org_id.to_string(),
        job_id: format!("job-{:03}", seed % 12 + 1),
        lines,
        tax_cents,
        customer: Some(Customer {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            phone: None,
        }),
        address_snapshot: Some(format!("{} {}", 100 + seed, street)),
        ..Default::default()
    }
}
