//! odk — operator CLI for OrderDesk.
//!
//! Talks straight to Postgres via `ODK_DATABASE_URL`: schema status and
//! migrations, demo seeding, and a direct add-item invocation that goes
//! through the same mutator path as the daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use odk_db::{insert_category, insert_client, insert_order, insert_product, NewProduct, PgOrderStore};
use odk_orders::{AddItemRequest, OrderLineMutator};

#[derive(Parser)]
#[command(name = "odk")]
#[command(about = "OrderDesk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Seed fixture data
    Seed {
        #[command(subcommand)]
        cmd: SeedCmd,
    },

    /// Order operations
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses when order_line already
    /// carries rows unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB that already holds order data.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SeedCmd {
    /// Insert the demo fixture: a two-level category tree, one client with
    /// an open order, and two products.
    Demo,
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Add a product to an existing order (atomic; decrements stock).
    AddItem {
        /// Order id
        #[arg(long)]
        order: i64,

        /// Product id
        #[arg(long)]
        product: i64,

        /// Units to add (must be > 0)
        #[arg(long)]
        qty: i64,

        /// Deadline for the whole operation, in milliseconds
        #[arg(long, default_value_t = 5_000)]
        deadline_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => db_status().await,
            DbCmd::Migrate { yes } => db_migrate(yes).await,
        },
        Commands::Seed { cmd } => match cmd {
            SeedCmd::Demo => seed_demo().await,
        },
        Commands::Order { cmd } => match cmd {
            OrderCmd::AddItem {
                order,
                product,
                qty,
                deadline_ms,
            } => order_add_item(order, product, qty, deadline_ms).await,
        },
    }
}

async fn db_status() -> Result<()> {
    let pool = odk_db::connect_from_env().await?;
    let st = odk_db::status(&pool).await?;
    println!("connectivity: {}", if st.ok { "ok" } else { "FAILED" });
    println!(
        "schema:       {}",
        if st.has_order_line_table {
            "present"
        } else {
            "missing (run `odk db migrate`)"
        }
    );
    Ok(())
}

async fn db_migrate(yes: bool) -> Result<()> {
    let pool = odk_db::connect_from_env().await?;

    let existing = odk_db::count_order_lines(&pool).await?;
    if existing > 0 && !yes {
        bail!(
            "refusing to migrate: order_line already holds {existing} rows; \
             re-run with --yes to acknowledge"
        );
    }

    odk_db::migrate(&pool).await?;
    println!("migrations applied");
    Ok(())
}

async fn seed_demo() -> Result<()> {
    let pool = odk_db::connect_from_env().await?;

    let root = insert_category(&pool, "electronics", None).await?;
    let accessories = insert_category(&pool, "accessories", Some(root)).await?;

    let client_id = insert_client(&pool, "Acme Retail", Some("1 Warehouse Way")).await?;
    let order_id = insert_order(&pool, client_id).await?;

    let cable = insert_product(
        &pool,
        &NewProduct {
            name: "USB-C cable".to_string(),
            stock: 100,
            price_micros: 9_990_000, // 9.99
            category_id: Some(accessories),
        },
    )
    .await?;
    let stand = insert_product(
        &pool,
        &NewProduct {
            name: "Laptop stand".to_string(),
            stock: 25,
            price_micros: 49_000_000,
            category_id: Some(accessories),
        },
    )
    .await?;

    println!("seeded demo data:");
    println!("  categories: {root} (electronics) -> {accessories} (accessories)");
    println!("  client:     {client_id} (Acme Retail)");
    println!("  order:      {order_id}");
    println!("  products:   {cable} (USB-C cable, stock 100), {stand} (Laptop stand, stock 25)");
    Ok(())
}

async fn order_add_item(order: i64, product: i64, qty: i64, deadline_ms: u64) -> Result<()> {
    let pool = odk_db::connect_from_env().await?;
    let mutator = OrderLineMutator::new(Arc::new(PgOrderStore::new(pool)));

    let receipt = mutator
        .add_item(
            AddItemRequest {
                order_id: order,
                product_id: product,
                quantity: qty,
            },
            Some(Duration::from_millis(deadline_ms)),
        )
        .await?;

    println!(
        "added: order {} now holds {} unit(s) of product {}; stock remaining {}",
        receipt.order_id, receipt.line_quantity, receipt.product_id, receipt.remaining_stock
    );
    Ok(())
}
