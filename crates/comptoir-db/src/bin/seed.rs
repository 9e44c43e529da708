//! # Seed Data Generator
//!
//! Fills an empty database with a small demo shop.
//!
//! ## Usage
//! ```bash
//! cargo run -p comptoir-db --bin seed
//!
//! # Specify database path
//! cargo run -p comptoir-db --bin seed -- --db ./data/comptoir.db
//! ```
//!
//! ## Generated Data
//! - Three categories with a handful of products each
//! - One supplier with a received, partly paid supply order
//! - Two clients and a few cash/card sales
//!
//! No user is created: the server bootstraps the first administrator.

use comptoir_core::{
    CategoryInput, ClientInput, NewSale, NewSupplyOrder, PaymentMethod, ProductInput,
    SaleLineInput, SupplierInput, SupplyLineInput,
};
use comptoir_db::{Database, DbConfig};
use std::env;

/// (category, [(reference, name, purchase, sale, min_stock)])
const CATALOG: &[(&str, &[(&str, &str, i64, i64, i64)])] = &[
    (
        "Papeterie",
        &[
            ("PAP-CAH-A4", "Cahier A4 96 pages", 120, 350, 10),
            ("PAP-STY-BL", "Stylo bille bleu", 25, 120, 30),
            ("PAP-AGE-26", "Agenda 2026", 400, 1290, 5),
        ],
    ),
    (
        "Épicerie fine",
        &[
            ("EPI-CONF-FR", "Confiture de fraise 370 g", 210, 590, 6),
            ("EPI-MIEL-LA", "Miel de lavande 250 g", 380, 950, 4),
        ],
    ),
    (
        "Cadeaux",
        &[
            ("CAD-MUG-01", "Mug émaillé", 300, 900, 3),
            ("CAD-BOU-PARF", "Bougie parfumée", 450, 1490, 3),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./comptoir_dev.db");

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
                println!("Comptoir Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./comptoir_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Comptoir Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(None, None).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    // Catalog
    let mut products = Vec::new();
    for (category_name, items) in CATALOG {
        let category = db
            .categories()
            .create(&CategoryInput {
                name: category_name.to_string(),
                description: None,
            })
            .await?;

        for (reference, name, purchase, sale, min_stock) in items.iter() {
            let product = db
                .products()
                .create(
                    &ProductInput {
                        category_id: Some(category.id.clone()),
                        reference: reference.to_string(),
                        barcode: None,
                        name: name.to_string(),
                        description: None,
                        purchase_price_cents: *purchase,
                        sale_price_cents: *sale,
                        stock: 0,
                        min_stock: *min_stock,
                    },
                    None,
                )
                .await?;
            products.push(product);
        }
    }
    println!("✓ {} products in {} categories", products.len(), CATALOG.len());

    // Supplier and a received order that brings the stock in
    let supplier = db
        .suppliers()
        .create(&SupplierInput {
            name: "Grossiste du Centre".to_string(),
            contact_name: Some("Martine Roux".to_string()),
            email: Some("commandes@grossiste-centre.fr".to_string()),
            phone: Some("0241000000".to_string()),
            address: Some("12 rue des Halles, 49000 Angers".to_string()),
            notes: None,
        })
        .await?;

    let lines: Vec<SupplyLineInput> = products
        .iter()
        .map(|p| SupplyLineInput {
            product_id: p.id.clone(),
            quantity: 20,
            unit_cost_cents: p.purchase_price_cents,
        })
        .collect();
    let total: i64 = lines.iter().map(|l| l.quantity * l.unit_cost_cents).sum();

    let order = db
        .supplies()
        .create(
            &NewSupplyOrder {
                supplier_id: supplier.id.clone(),
                reference: "BC-0001".to_string(),
                ordered_at: None,
                lines,
                paid_cents: total / 2,
                payment_method: Some(PaymentMethod::Transfer),
                received: true,
                notes: Some("Commande d'ouverture".to_string()),
            },
            None,
        )
        .await?;
    println!(
        "✓ Supply order {} received ({} still owed)",
        order.order.reference, order.remaining_cents
    );

    // Clients and sales
    let client = db
        .clients()
        .create(&ClientInput {
            first_name: Some("Louise".to_string()),
            last_name: "Martin".to_string(),
            email: Some("louise.martin@example.fr".to_string()),
            phone: None,
            address: None,
            notes: None,
        })
        .await?;
    db.clients()
        .create(&ClientInput {
            first_name: Some("Hugo".to_string()),
            last_name: "Bernard".to_string(),
            email: None,
            phone: Some("0612345678".to_string()),
            address: None,
            notes: None,
        })
        .await?;

    let mut sales = 0;
    for (index, product) in products.iter().enumerate().take(4) {
        let payment_method = if index % 2 == 0 {
            PaymentMethod::Cash
        } else {
            PaymentMethod::Card
        };
        let detail = db
            .sales()
            .create(
                &NewSale {
                    client_id: (index == 0).then(|| client.id.clone()),
                    lines: vec![SaleLineInput {
                        product_id: product.id.clone(),
                        quantity: 2,
                        unit_price_cents: None,
                    }],
                    discount_cents: 0,
                    payment_method,
                    tendered_cents: None,
                    notes: None,
                },
                None,
            )
            .await?;
        println!("  Sale {} ({})", detail.sale.invoice_number, detail.sale.total());
        sales += 1;
    }
    println!("✓ {} sales recorded", sales);

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
