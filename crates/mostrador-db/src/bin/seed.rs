//! # Seed Data Generator
//!
//! Populates a development database with identities, employees and a
//! product catalog.
//!
//! ## Usage
//! ```bash
//! # Default catalog size (200 products)
//! cargo run -p mostrador-db --bin seed
//!
//! # Custom amount
//! cargo run -p mostrador-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p mostrador-db --bin seed -- --db ./data/mostrador.db
//! ```
//!
//! ## Generated Data
//! - `admin` (superuser), `encargada` (staff) and three cashiers
//! - Products across a few grocery families, with sizes. Roughly one in
//!   ten has no tracked stock and several start at or below their minimum
//!   so the dashboard alerts have something to show.

use std::env;

use mostrador_core::{AuthIdentity, ProductForm};
use mostrador_db::{Database, DbConfig, EmployeeDirectory};
use uuid::Uuid;

const FAMILIES: &[(&str, &[&str])] = &[
    (
        "Almacén",
        &[
            "Arroz", "Fideos", "Harina", "Azúcar", "Sal", "Aceite", "Yerba", "Café", "Té",
            "Lentejas",
        ],
    ),
    (
        "Lácteos",
        &[
            "Leche", "Yogur", "Queso", "Manteca", "Crema", "Dulce de leche",
        ],
    ),
    (
        "Bebidas",
        &[
            "Agua", "Gaseosa", "Jugo", "Cerveza", "Soda", "Vino tinto",
        ],
    ),
    (
        "Limpieza",
        &[
            "Lavandina", "Detergente", "Jabón", "Esponja", "Suavizante",
        ],
    ),
];

/// Size variants with their price addon in cents.
const SIZES: &[(&str, i64)] = &[
    ("250g", 0),
    ("500g", 150),
    ("1kg", 400),
    ("1L", 300),
    ("2L", 550),
    ("x6", 900),
];

/// (username, is_staff, is_superuser)
const IDENTITIES: &[(&str, bool, bool)] = &[
    ("admin", true, true),
    ("encargada", true, false),
    ("cajero1", false, false),
    ("cajero2", false, false),
    ("cajero3", false, false),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./mostrador_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
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
                println!("Mostrador Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./mostrador_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mostrador Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Identities and their employee profiles
    println!();
    println!("Creating users...");
    let directory = EmployeeDirectory::new(db.clone());
    for (username, is_staff, is_superuser) in IDENTITIES {
        let identity = AuthIdentity {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            first_name: capitalize(username),
            last_name: String::new(),
            email: format!("{}@mostrador.local", username),
            is_staff: *is_staff,
            is_superuser: *is_superuser,
            is_active: true,
        };
        db.identities().insert(&identity).await?;
        directory.resolve_employee(&identity).await?;
        println!("  {} (staff: {}, superuser: {})", username, is_staff, is_superuser);
    }

    // Catalog
    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (family_idx, (family, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let form = generate_product(
                    name,
                    size,
                    *price_addon,
                    family_idx * 1000 + name_idx * 20 + size_idx,
                );

                if let Err(e) = db.products().insert(&form).await {
                    eprintln!("Failed to insert {} ({}): {}", form.name, family, e);
                    continue;
                }

                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let summary = db.products().stock_summary().await?;
    println!(
        "  Stock: {} normal, {} low, {} out of stock",
        summary.normal, summary.low_stock, summary.out_of_stock
    );

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Deterministic product data derived from `seed`.
fn generate_product(name: &str, size: &str, price_addon: i64, seed: usize) -> ProductForm {
    // 2.50 - 12.49 plus the size addon
    let price_cents = 250 + ((seed * 37) % 1000) as i64 + price_addon;

    let stock_minimum = (seed % 6) as i64;
    let stock = if seed % 10 == 9 {
        None
    } else {
        Some(((seed * 13) % 40) as i64)
    };

    ProductForm {
        name: format!("{} {}", name, size),
        price_cents,
        stock,
        stock_minimum,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
