//! # Seed Data Generator
//!
//! Populates an empty database with a demo back office.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockroom_dev.db
//! cargo run -p stockroom-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db --password s3cret
//! ```
//!
//! ## Generated Data
//! - One admin user (`admin@stockroom.local`)
//! - A GST rule on groceries and a higher rate on beverages
//! - Categories, one supplier, and a few products per category

use std::env;

use stockroom_core::import::{ProductDraft, SupplierDraft};
use stockroom_core::{Money, Principal, ProductStatus, SupplierStatus, TaxRate};
use stockroom_db::repository::tax::TaxInput;
use stockroom_db::repository::user::NewUser;
use stockroom_db::{Database, DbConfig};

/// (category, [(name, sku, price in minor units)])
const CATALOGUE: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Beverages",
        &[
            ("Cola 330ml", "BEV-001", 120),
            ("Mineral Water 1.5L", "BEV-002", 90),
            ("Orange Juice 1L", "BEV-003", 350),
        ],
    ),
    (
        "Groceries",
        &[
            ("Basmati Rice 5kg", "GRO-001", 2_450),
            ("Cooking Oil 1L", "GRO-002", 780),
            ("Sugar 1kg", "GRO-003", 160),
        ],
    ),
    (
        "Snacks",
        &[
            ("Salted Crisps", "SNK-001", 70),
            ("Chocolate Bar", "SNK-002", 150),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockroom_dev.db");
    let mut password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "-p" | "--password" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: ./stockroom_dev.db)");
                println!("  -p, --password <PASS>   Admin password (default: admin123)");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockroom Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    if db.users().count().await? > 0 {
        println!("⚠ Database already has users; skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admins = db
        .users()
        .register(
            None,
            vec![NewUser {
                full_name: "Store Admin".to_string(),
                email: "admin@stockroom.local".to_string(),
                password,
                role: None,
                role_name: None,
            }],
        )
        .await?;
    let admin = Principal::from(&admins[0]);
    println!("✓ Admin user: {}", admins[0].email);

    db.taxes()
        .create(
            &admin,
            TaxInput {
                name: "General Sales Tax".to_string(),
                code: "GST".to_string(),
                rate: TaxRate::from_percentage(17.0)?,
                description: Some("Standard rate".to_string()),
                applicable_categories: vec!["Groceries".to_string(), "Snacks".to_string()],
                is_active: true,
            },
        )
        .await?;
    db.taxes()
        .create(
            &admin,
            TaxInput {
                name: "Beverage Excise".to_string(),
                code: "BEV_EXCISE".to_string(),
                rate: TaxRate::from_percentage(20.0)?,
                description: None,
                applicable_categories: vec!["Beverages".to_string()],
                is_active: true,
            },
        )
        .await?;
    println!("✓ Taxes created");

    let supplier = db
        .suppliers()
        .create(
            &admin,
            SupplierDraft {
                name: "Metro Wholesale".to_string(),
                phone: "+92 300 1234567".to_string(),
                email: Some("orders@metro.example".to_string()),
                address: Some("Main Boulevard, Lahore".to_string()),
                contact_person_name: Some("Imran".to_string()),
                contact_person_phone: None,
                status: SupplierStatus::Active,
            },
        )
        .await?;
    println!("✓ Supplier: {}", supplier.name);

    let mut generated = 0;
    for (category, products) in CATALOGUE {
        db.categories().create(&admin, category).await?;

        for (name, sku, price) in products.iter() {
            let draft = ProductDraft {
                name: name.to_string(),
                sku: sku.to_string(),
                barcode: None,
                description: None,
                category: category.to_string(),
                supplier_id: Some(supplier.id.clone()),
                base_price: Money::from_cents(*price),
                cost: Money::from_cents(price * 7 / 10),
                stock: 50,
                reorder_level: 10,
                status: ProductStatus::Available,
            };

            match db.products().create(&admin, draft).await {
                Ok(product) => {
                    generated += 1;
                    println!("  {} {} → {}", product.sku, product.base_price, product.price_with_tax);
                }
                Err(e) => eprintln!("Failed to insert {}: {}", sku, e),
            }
        }
    }

    println!();
    println!("✓ Generated {} products", generated);
    println!();
    println!("Log in with admin@stockroom.local");

    db.close().await;
    Ok(())
}
