//! odk-db
//!
//! Postgres backend for OrderDesk: connection/migration plumbing, fixture
//! insert helpers, and [`PgOrderStore`] — the production [`OrderStore`]
//! implementation.
//!
//! The add-item transaction locks the product row with `SELECT ... FOR
//! UPDATE`, so two concurrent adds against the same product serialize at
//! the row and the second one re-reads the committed stock. Adds against
//! different products take different row locks and do not block each
//! other. The order-line upsert is a single `INSERT ... ON CONFLICT ... DO
//! UPDATE` statement — there is no find-then-insert window.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use odk_orders::{
    AddItemReceipt, AddItemRequest, OrderError, OrderLine, OrderStore, OrderSummary, Product,
};

pub const ENV_DB_URL: &str = "ODK_DATABASE_URL";

/// Connect to Postgres using ODK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='order_line'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_order_line_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_order_line_table: bool,
}

/// Count order_line rows. Used by CLI guardrails to prevent accidental
/// migration of a database that already carries ledger data.
pub async fn count_order_lines(pool: &PgPool) -> Result<i64> {
    // If schema doesn't exist yet, treat as 0 (safe) rather than failing.
    let st = status(pool).await?;
    if !st.has_order_line_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from order_line")
        .fetch_one(pool)
        .await
        .context("count_order_lines failed")?;

    Ok(n)
}

// ---------------------------------------------------------------------------
// Fixture / seeding inserts
// ---------------------------------------------------------------------------
//
// Catalog and order creation are out of scope for the core operation; these
// helpers exist for the CLI `seed` command and the scenario tests. They use
// anyhow because nothing in the caller-facing taxonomy applies to them.

pub async fn insert_category(pool: &PgPool, name: &str, parent_id: Option<i64>) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "insert into category (name, parent_id) values ($1, $2) returning id",
    )
    .bind(name)
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .context("insert_category failed")?;
    Ok(id)
}

pub async fn insert_client(pool: &PgPool, name: &str, address: Option<&str>) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "insert into client (name, address) values ($1, $2) returning id",
    )
    .bind(name)
    .bind(address)
    .fetch_one(pool)
    .await
    .context("insert_client failed")?;
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub stock: i64,
    pub price_micros: i64,
    pub category_id: Option<i64>,
}

pub async fn insert_product(pool: &PgPool, product: &NewProduct) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into product (name, stock, price_micros, category_id)
        values ($1, $2, $3, $4)
        returning id
        "#,
    )
    .bind(&product.name)
    .bind(product.stock)
    .bind(product.price_micros)
    .bind(product.category_id)
    .fetch_one(pool)
    .await
    .context("insert_product failed")?;
    Ok(id)
}

pub async fn insert_order(pool: &PgPool, client_id: i64) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "insert into orders (client_id) values ($1) returning id",
    )
    .bind(client_id)
    .fetch_one(pool)
    .await
    .context("insert_order failed")?;
    Ok(id)
}

// ---------------------------------------------------------------------------
// PgOrderStore
// ---------------------------------------------------------------------------

/// Production `OrderStore` over a shared [`PgPool`].
///
/// The pool is the explicitly passed store handle: constructed once at
/// startup, injected here, and closed at shutdown. Nothing reads ambient
/// global connection state.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Serialization failure (40001) or deadlock (40P01): the transaction lost
/// a race with a concurrent writer and is safe to retry as-is.
fn is_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

fn db_err(err: sqlx::Error) -> OrderError {
    if is_conflict(&err) {
        OrderError::Conflict {
            detail: err.to_string(),
        }
    } else {
        OrderError::Store {
            detail: err.to_string(),
        }
    }
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        stock: row.try_get("stock")?,
        price_micros: row.try_get("price_micros")?,
        category_id: row.try_get("category_id")?,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn product(&self, product_id: i64) -> Result<Product, OrderError> {
        let row = sqlx::query(
            "select id, name, stock, price_micros, category_id from product where id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(OrderError::ProductNotFound { product_id })?;

        product_from_row(&row).map_err(db_err)
    }

    async fn order(&self, order_id: i64) -> Result<OrderSummary, OrderError> {
        let row = sqlx::query("select id, client_id, created_at from orders where id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(OrderError::OrderNotFound { order_id })?;

        Ok(OrderSummary {
            id: row.try_get("id").map_err(db_err)?,
            client_id: row.try_get("client_id").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
        })
    }

    async fn find_line(
        &self,
        order_id: i64,
        product_id: i64,
    ) -> Result<Option<OrderLine>, OrderError> {
        // Distinguish "no such order" from "order has no such line".
        self.order(order_id).await?;

        let row = sqlx::query(
            "select quantity from order_line where order_id = $1 and product_id = $2",
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(OrderLine {
                order_id,
                product_id,
                quantity: row.try_get("quantity").map_err(db_err)?,
            })),
            None => Ok(None),
        }
    }

    async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderError> {
        self.order(order_id).await?;

        let rows = sqlx::query(
            r#"
            select product_id, quantity
            from order_line
            where order_id = $1
            order by product_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            lines.push(OrderLine {
                order_id,
                product_id: row.try_get("product_id").map_err(db_err)?,
                quantity: row.try_get("quantity").map_err(db_err)?,
            });
        }
        Ok(lines)
    }

    async fn add_item(&self, req: &AddItemRequest) -> Result<AddItemReceipt, OrderError> {
        // Backstop for callers that bypass the mutator; a negative quantity
        // must never inflate stock. The schema CHECKs only catch the
        // first-insert case, not a negative increment of an existing line.
        if req.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: req.quantity,
            });
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Step 1+2: load the product and take its row lock. Holding the
        // lock until commit means the stock check below can never use a
        // stale value — a concurrent add on the same product waits here.
        let product_row = sqlx::query("select stock from product where id = $1 for update")
            .bind(req.product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;

        let available: i64 = match product_row {
            Some(row) => row.try_get("stock").map_err(db_err)?,
            None => {
                return Err(OrderError::ProductNotFound {
                    product_id: req.product_id,
                })
            }
        };

        if available < req.quantity {
            // Nothing written yet; dropping `tx` rolls back the lock.
            return Err(OrderError::InsufficientStock {
                product_id: req.product_id,
                available,
                requested: req.quantity,
            });
        }

        // Step 3: the order must exist before a line can reference it.
        let order_exists = sqlx::query("select 1 as one from orders where id = $1")
            .bind(req.order_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .is_some();
        if !order_exists {
            return Err(OrderError::OrderNotFound {
                order_id: req.order_id,
            });
        }

        // Step 4: upsert the association row. One statement covers both
        // first-add (insert) and repeat-add (increment), keyed on the
        // composite primary key.
        let line_row = sqlx::query(
            r#"
            insert into order_line (order_id, product_id, quantity)
            values ($1, $2, $3)
            on conflict (order_id, product_id)
            do update set quantity = order_line.quantity + excluded.quantity
            returning quantity
            "#,
        )
        .bind(req.order_id)
        .bind(req.product_id)
        .bind(req.quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let line_quantity: i64 = line_row.try_get("quantity").map_err(db_err)?;

        // Step 5: decrement stock on the row we hold the lock for.
        let stock_row = sqlx::query(
            "update product set stock = stock - $2 where id = $1 returning stock",
        )
        .bind(req.product_id)
        .bind(req.quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let remaining_stock: i64 = stock_row.try_get("stock").map_err(db_err)?;

        // Step 6: all-or-nothing. Any error above (or a dropped future on
        // deadline elapse) leaves the transaction uncommitted and Postgres
        // rolls it back.
        tx.commit().await.map_err(db_err)?;

        Ok(AddItemReceipt {
            order_id: req.order_id,
            product_id: req.product_id,
            line_quantity,
            remaining_stock,
        })
    }
}
