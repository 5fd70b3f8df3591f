//! # Seed Data Generator
//!
//! Populates a database with a demo café menu for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p kopi-db --bin seed
//! cargo run -p kopi-db --bin seed -- --db ./data/kopi.db
//! ```
//!
//! ## Seeded Data
//! - Categories: Coffee, Non-Coffee, Food, Pastries
//! - Drinks with S/M/L sizes and add-ons (extra shot, oat milk, less sugar)
//! - Food and pastries, pastries stock-tracked
//! - Fees: 10% dine-in service charge, then 6% SST on everything
//! - Discount code `KOPI10` (10%, min RM30)
//! - One admin account (`admin@kopi.local` / `changeme123`)

use std::env;

use anyhow::Context;
use chrono::Utc;
use kopi_core::{
    AddOn, Category, DiscountCode, DiscountType, Fee, FeeScope, FeeType, MenuPromo, Product, ProductSize,
    SizeName, StaffRole, StockChangeType,
};
use kopi_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (category, name, price_sen, sized drink, stock-tracked)
const MENU: &[(&str, &str, i64, bool, bool)] = &[
    ("Coffee", "Kopi O", 350, true, false),
    ("Coffee", "Kopi Susu", 450, true, false),
    ("Coffee", "Americano", 800, true, false),
    ("Coffee", "Latte", 1000, true, false),
    ("Coffee", "Flat White", 1100, true, false),
    ("Non-Coffee", "Teh Tarik", 450, true, false),
    ("Non-Coffee", "Milo Dinosaur", 750, true, false),
    ("Non-Coffee", "Matcha Latte", 1200, true, false),
    ("Food", "Nasi Lemak", 1250, false, false),
    ("Food", "Roti Bakar Kaya", 550, false, false),
    ("Food", "Half-Boiled Eggs", 400, false, false),
    ("Pastries", "Butter Croissant", 800, false, true),
    ("Pastries", "Pandan Chiffon", 650, false, true),
];

/// (size, multiplier in bps)
const SIZES: &[(SizeName, u32)] = &[(SizeName::S, 8_000), (SizeName::M, 10_000), (SizeName::L, 12_000)];

/// (add-on, price_sen)
const DRINK_ADD_ONS: &[(&str, i64)] = &[("Extra shot", 200), ("Oat milk", 250), ("Less sugar", 0)];

const PASTRY_OPENING_STOCK: i64 = 24;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kopi_db=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./kopi_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kopi POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kopi_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Kopi POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();
    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let now = Utc::now();

    // Categories
    let mut category_ids = Vec::new();
    for (idx, name) in ["Coffee", "Non-Coffee", "Food", "Pastries"].iter().enumerate() {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            sort_order: idx as i64,
            active: true,
        };
        db.products().insert_category(&category).await?;
        category_ids.push((*name, category.id));
    }

    // Products
    for (category, name, price_sen, sized, tracked) in MENU {
        let category_id = category_ids
            .iter()
            .find(|(n, _)| n == category)
            .map(|(_, id)| id.clone());

        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            price_sen: *price_sen,
            category_id,
            tags: if *sized { vec!["drink".to_string()] } else { vec![] },
            allergens: if name.contains("Susu") || name.contains("Latte") || name.contains("Croissant") {
                vec!["milk".to_string()]
            } else {
                vec![]
            },
            stock_quantity: 0,
            track_stock: *tracked,
            show_in_kitchen: true,
            active: true,
            rating: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        db.products()
            .insert(&product)
            .await
            .with_context(|| format!("inserting {}", name))?;

        if *sized {
            for (size_name, bps) in SIZES {
                db.products()
                    .insert_size(&ProductSize {
                        id: Uuid::new_v4().to_string(),
                        product_id: product.id.clone(),
                        size_name: *size_name,
                        price_multiplier_bps: *bps,
                        price_override_sen: None,
                        active: true,
                    })
                    .await?;
            }
            for (add_on, price_sen) in DRINK_ADD_ONS {
                db.products()
                    .insert_add_on(&AddOn {
                        id: Uuid::new_v4().to_string(),
                        product_id: product.id.clone(),
                        name: add_on.to_string(),
                        price_sen: *price_sen,
                        active: true,
                    })
                    .await?;
            }
        }

        if *tracked {
            db.stock()
                .record_movement(
                    &product.id,
                    PASTRY_OPENING_STOCK,
                    StockChangeType::Initial,
                    Some("opening stock".to_string()),
                )
                .await?;
        }
    }
    println!("✓ {} menu items", MENU.len());

    // Fees, in compounding order
    let fees = [
        ("Service charge", FeeType::Percentage, 1000, FeeScope::DineIn),
        ("SST", FeeType::Percentage, 600, FeeScope::Both),
    ];
    for (offset, (name, fee_type, amount, scope)) in fees.into_iter().enumerate() {
        db.fees()
            .insert(&Fee {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                fee_type,
                amount,
                applies_to: scope,
                active: true,
                created_at: now + chrono::Duration::milliseconds(offset as i64),
            })
            .await?;
    }
    println!("✓ Service charge and SST");

    db.discounts()
        .insert(&DiscountCode {
            id: Uuid::new_v4().to_string(),
            code: "KOPI10".to_string(),
            discount_type: DiscountType::Percentage,
            value: 1000,
            min_order_sen: 3000,
            usage_limit: Some(500),
            usage_count: 0,
            expires_at: None,
            applies_to: vec![],
            active: true,
        })
        .await?;
    println!("✓ Discount code KOPI10");

    db.promos()
        .insert(&MenuPromo {
            id: Uuid::new_v4().to_string(),
            title: "Teh Tarik Tuesday".to_string(),
            description: Some("Second teh tarik half price every Tuesday".to_string()),
            image_url: None,
            active: true,
            sort_order: 0,
            starts_at: None,
            ends_at: None,
            created_at: now,
            updated_at: now,
        })
        .await?;

    db.staff()
        .create("admin@kopi.local", "Admin", StaffRole::Admin, "changeme123")
        .await?;
    println!("✓ Admin account admin@kopi.local");

    println!();
    println!("✓ Seed complete!");
    info!(products = MENU.len(), "Seed complete");
    db.close().await;
    Ok(())
}
