use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartItemId, OrderId, OrderItemId, ProductId, UserId};
use domain::{
    Cart, CartItem, Money, Order, OrderItem, OrderSortField, OrderStatus, Page, PageRequest,
    Product, SortDirection, StockLine,
};
use sqlx::{
    PgConnection, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CartStore, CheckoutStore, InventoryStore, OrderLedger},
};

const ORDER_COLUMNS: &str = "id, user_id, status, total_cents, created_at, payment_reference";

/// PostgreSQL-backed store implementation.
///
/// Stock commits are single conditional updates, so the database serializes
/// concurrent decrements of the same row. Finalization locks the order row
/// and runs inside one transaction.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_u32(row.try_get("stock")?, "products.stock")?,
        })
    }

    fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: to_u32(row.try_get("quantity")?, "order_items.quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status.parse().map_err(StoreError::Corrupt)?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Order::restore(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            Money::from_cents(row.try_get("total_cents")?),
            created_at,
            row.try_get("payment_reference")?,
            items,
        ))
    }

    /// Loads the items for a set of order rows and assembles the orders,
    /// keeping the rows' order.
    async fn hydrate(conn: &mut PgConnection, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let item_rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: Uuid = row.try_get("order_id")?;
            items
                .entry(order_id)
                .or_default()
                .push(Self::row_to_order_item(row)?);
        }

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn fetch_order(
        conn: &mut PgConnection,
        order_id: OrderId,
        for_update: bool,
    ) -> Result<Option<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        if for_update {
            sql.push_str(" FOR UPDATE");
        }

        let Some(row) = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        Ok(Self::hydrate(conn, vec![row]).await?.pop())
    }

    /// Conditionally decrements one product's stock on the given connection.
    async fn commit_line(conn: &mut PgConnection, line: &StockLine) -> Result<()> {
        let quantity = i64::from(line.quantity);
        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock",
        )
        .bind(line.product_id.as_str())
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;

        if updated.is_some() {
            return Ok(());
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(line.product_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientStock {
                product_id: line.product_id.clone(),
                requested: line.quantity,
                available: to_u32(available, "products.stock")?,
            }),
            None => Err(StoreError::ProductNotFound(line.product_id.clone())),
        }
    }

    async fn commit_lines(conn: &mut PgConnection, lines: &[StockLine]) -> Result<()> {
        for line in StockLine::normalize(lines) {
            if let Err(err) = Self::commit_line(conn, &line).await {
                if matches!(err, StoreError::InsufficientStock { .. }) {
                    metrics::counter!("inventory_commit_rejections_total").increment(1);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    async fn ensure_cart(conn: &mut PgConnection, user_id: UserId) -> Result<()> {
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id.as_uuid())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn empty_cart(conn: &mut PgConnection, user_id: UserId) -> Result<()> {
        Self::ensure_cart(conn, user_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *conn)
            .await?;

        sqlx::query("UPDATE carts SET total_cents = 0, version = version + 1 WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn to_u64(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn to_i64(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn sort_column(field: OrderSortField) -> &'static str {
    match field {
        OrderSortField::Id => "id",
        OrderSortField::CreatedAt => "created_at",
        OrderSortField::TotalAmount => "total_cents",
        OrderSortField::Status => "status",
    }
}

fn sort_direction(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn put_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, price_cents = EXCLUDED.price_cents, stock = EXCLUDED.stock
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn try_commit(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::commit_lines(&mut conn, &[StockLine::new(product_id.clone(), quantity)]).await
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn try_commit_batch(&self, lines: &[StockLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::commit_lines(&mut tx, lines).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn load_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_cart(&mut conn, user_id).await?;

        let version: i64 = sqlx::query_scalar("SELECT version FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *conn)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity, p.name, p.price_cents
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.position ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                Ok(CartItem {
                    id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                    product_name: row.try_get("name")?,
                    unit_price: Money::from_cents(row.try_get("price_cents")?),
                    quantity: to_u32(row.try_get("quantity")?, "cart_items.quantity")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Cart::restore(
            user_id,
            items,
            to_u64(version, "carts.version")?,
        ))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        let user_id = cart.user_id();
        let expected = to_i64(cart.version(), "carts.version")?;
        let mut tx = self.pool.begin().await?;

        Self::ensure_cart(&mut tx, user_id).await?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE carts SET total_cents = $2, version = version + 1
            WHERE user_id = $1 AND version = $3
            RETURNING version
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(cart.total_price().cents())
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(version) = updated else {
            let actual: i64 = sqlx::query_scalar("SELECT version FROM carts WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
            return Err(StoreError::CartConflict {
                user_id,
                expected: cart.version(),
                actual: to_u64(actual, "carts.version")?,
            });
        };

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for (position, item) in cart.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (id, user_id, product_id, quantity, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Cart::restore(
            user_id,
            cart.items().to_vec(),
            to_u64(version, "carts.version")?,
        ))
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::empty_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for PostgresStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn create_order(&self, order: &Order) -> Result<()> {
        order.validate()?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_cents, created_at, payment_reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.total_amount().cents())
        .bind(order.created_at())
        .bind(order.payment_reference())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.id());
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price_cents, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id().as_uuid())
            .bind(item.product_id.as_str())
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_order(&mut conn, order_id, false).await
    }

    async fn attach_payment_reference(&self, order_id: OrderId, reference: &str) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::fetch_order(&mut tx, order_id, true)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.attach_payment_reference(reference)?;

        sqlx::query("UPDATE orders SET payment_reference = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(reference)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        Self::hydrate(&mut conn, rows).await
    }

    async fn orders_for_product(&self, product_id: &ProductId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders o
            WHERE EXISTS (
                SELECT 1 FROM order_items i WHERE i.order_id = o.id AND i.product_id = $1
            )
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(product_id.as_str())
        .fetch_all(&mut *conn)
        .await?;

        Self::hydrate(&mut conn, rows).await
    }

    async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>> {
        let sort = request.sort();
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&mut *conn)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY {} {}, id ASC LIMIT $1 OFFSET $2",
            sort_column(sort.field),
            sort_direction(sort.direction),
        ))
        .bind(i64::from(request.size()))
        .bind(to_i64(request.offset(), "offset")?)
        .fetch_all(&mut *conn)
        .await?;

        let content = Self::hydrate(&mut conn, rows).await?;
        Ok(Page::new(content, &request, to_u64(total, "count")?))
    }
}

#[async_trait]
impl CheckoutStore for PostgresStore {
    #[tracing::instrument(skip(self))]
    async fn finalize_paid_order(&self, order_id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::fetch_order(&mut tx, order_id, true)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if !order.status().can_pay() {
            return Err(StoreError::AlreadyPaid(order_id));
        }

        // Dropping `tx` on any error below rolls back every decrement.
        Self::commit_lines(&mut tx, &order.stock_lines()).await?;
        order.mark_paid()?;

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(order.status().as_str())
            .execute(&mut *tx)
            .await?;

        Self::empty_cart(&mut tx, order.user_id()).await?;

        tx.commit().await?;
        Ok(order)
    }
}
