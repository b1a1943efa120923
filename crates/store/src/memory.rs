use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartItemId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, Money, Order, OrderSort, OrderSortField, Page, PageRequest, Product,
    SortDirection, StockLine,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::store::{CartStore, CheckoutStore, InventoryStore, OrderLedger};
use crate::{Result, StoreError};

#[derive(Debug, Clone)]
struct StoredCartItem {
    id: CartItemId,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Default)]
struct CartRecord {
    items: Vec<StoredCartItem>,
    total: Money,
    version: u64,
}

impl CartRecord {
    fn clear(&mut self) {
        self.items.clear();
        self.total = Money::zero();
        self.version += 1;
    }
}

#[derive(Default)]
struct Inner {
    products: RwLock<HashMap<ProductId, Arc<Mutex<Product>>>>,
    carts: Mutex<HashMap<UserId, CartRecord>>,
    orders: RwLock<HashMap<OrderId, Arc<Mutex<Order>>>>,
}

type LockedLine = (StockLine, OwnedMutexGuard<Product>);

/// In-memory store for tests and local development.
///
/// Each product sits behind its own mutex, so commits for disjoint products
/// run in parallel. Batches lock their products in sorted order. Lock order
/// across the store is always order -> products -> carts.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut map = store.inner.products.write().await;
            for product in products {
                map.insert(product.id.clone(), Arc::new(Mutex::new(product)));
            }
        }
        store
    }

    /// Returns a product's current stock.
    pub async fn stock(&self, product_id: &ProductId) -> Option<u32> {
        let handle = self.inner.products.read().await.get(product_id).cloned()?;
        let product = handle.lock().await;
        Some(product.stock)
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.inner.orders.read().await.len()
    }

    async fn product_handle(&self, product_id: &ProductId) -> Result<Arc<Mutex<Product>>> {
        self.inner
            .products
            .read()
            .await
            .get(product_id)
            .cloned()
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))
    }

    async fn order_handle(&self, order_id: OrderId) -> Option<Arc<Mutex<Order>>> {
        self.inner.orders.read().await.get(&order_id).cloned()
    }

    async fn all_orders(&self) -> Vec<Order> {
        let handles: Vec<_> = self.inner.orders.read().await.values().cloned().collect();
        let mut orders = Vec::with_capacity(handles.len());
        for handle in handles {
            orders.push(handle.lock().await.clone());
        }
        orders
    }

    /// Locks every product named by `lines`, merged and in sorted order.
    async fn lock_lines(&self, lines: &[StockLine]) -> Result<Vec<LockedLine>> {
        let lines = StockLine::normalize(lines);
        let mut handles = Vec::with_capacity(lines.len());
        for line in &lines {
            handles.push(self.product_handle(&line.product_id).await?);
        }

        let mut locked = Vec::with_capacity(lines.len());
        for (line, handle) in lines.into_iter().zip(handles) {
            locked.push((line, handle.lock_owned().await));
        }
        Ok(locked)
    }
}

/// Decrements every locked line, restoring the applied ones if any line falls short.
fn commit_locked(locked: &mut [LockedLine]) -> Result<()> {
    let mut applied = 0;
    let mut shortfall = None;

    for (line, product) in locked.iter_mut() {
        if product.stock < line.quantity {
            shortfall = Some(StoreError::InsufficientStock {
                product_id: line.product_id.clone(),
                requested: line.quantity,
                available: product.stock,
            });
            break;
        }
        product.stock -= line.quantity;
        applied += 1;
    }

    match shortfall {
        Some(err) => {
            restore_locked(&mut locked[..applied]);
            metrics::counter!("inventory_commit_rejections_total").increment(1);
            Err(err)
        }
        None => Ok(()),
    }
}

fn restore_locked(locked: &mut [LockedLine]) {
    for (line, product) in locked.iter_mut() {
        product.stock += line.quantity;
    }
}

fn compare_orders(a: &Order, b: &Order, sort: OrderSort) -> Ordering {
    let primary = match sort.field {
        OrderSortField::Id => a.id().cmp(&b.id()),
        OrderSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        OrderSortField::TotalAmount => a.total_amount().cmp(&b.total_amount()),
        OrderSortField::Status => a.status().as_str().cmp(b.status().as_str()),
    };
    let primary = match sort.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id().cmp(&b.id()))
}

fn oldest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let Some(handle) = self.inner.products.read().await.get(product_id).cloned() else {
            return Ok(None);
        };
        let product = handle.lock().await.clone();
        Ok(Some(product))
    }

    async fn put_product(&self, product: Product) -> Result<()> {
        let existing = self.inner.products.read().await.get(&product.id).cloned();
        match existing {
            Some(handle) => *handle.lock().await = product,
            None => {
                self.inner
                    .products
                    .write()
                    .await
                    .entry(product.id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(product)));
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn try_commit(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let handle = self.product_handle(product_id).await?;
        let mut product = handle.lock().await;
        if product.stock < quantity {
            metrics::counter!("inventory_commit_rejections_total").increment(1);
            return Err(StoreError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(())
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn try_commit_batch(&self, lines: &[StockLine]) -> Result<()> {
        let mut locked = self.lock_lines(lines).await?;
        commit_locked(&mut locked)
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn load_cart(&self, user_id: UserId) -> Result<Cart> {
        let (stored, version) = {
            let mut carts = self.inner.carts.lock().await;
            let record = carts.entry(user_id).or_default();
            (record.items.clone(), record.version)
        };

        let mut items = Vec::with_capacity(stored.len());
        for item in stored {
            let product = self
                .product(&item.product_id)
                .await?
                .ok_or_else(|| StoreError::ProductNotFound(item.product_id.clone()))?;
            items.push(CartItem {
                id: item.id,
                product_id: item.product_id,
                product_name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
            });
        }

        Ok(Cart::restore(user_id, items, version))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        let mut carts = self.inner.carts.lock().await;
        let record = carts.entry(cart.user_id()).or_default();

        if record.version != cart.version() {
            return Err(StoreError::CartConflict {
                user_id: cart.user_id(),
                expected: cart.version(),
                actual: record.version,
            });
        }

        record.items = cart
            .items()
            .iter()
            .map(|item| StoredCartItem {
                id: item.id,
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect();
        record.total = cart.total_price();
        record.version += 1;

        Ok(Cart::restore(
            cart.user_id(),
            cart.items().to_vec(),
            record.version,
        ))
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        self.inner
            .carts
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clear();
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn create_order(&self, order: &Order) -> Result<()> {
        order.validate()?;
        let mut orders = self.inner.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateOrder(order.id()));
        }
        orders.insert(order.id(), Arc::new(Mutex::new(order.clone())));
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        match self.order_handle(order_id).await {
            Some(handle) => Ok(Some(handle.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn attach_payment_reference(&self, order_id: OrderId, reference: &str) -> Result<Order> {
        let handle = self
            .order_handle(order_id)
            .await
            .ok_or(StoreError::OrderNotFound(order_id))?;
        let mut order = handle.lock().await;
        order.attach_payment_reference(reference)?;
        Ok(order.clone())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .all_orders()
            .await
            .into_iter()
            .filter(|order| order.is_owned_by(user_id))
            .collect();
        oldest_first(&mut orders);
        Ok(orders)
    }

    async fn orders_for_product(&self, product_id: &ProductId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .all_orders()
            .await
            .into_iter()
            .filter(|order| order.contains_product(product_id))
            .collect();
        oldest_first(&mut orders);
        Ok(orders)
    }

    async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>> {
        let mut orders = self.all_orders().await;
        orders.sort_by(|a, b| compare_orders(a, b, request.sort()));

        let total = orders.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let content = orders
            .into_iter()
            .skip(offset)
            .take(request.size() as usize)
            .collect();

        Ok(Page::new(content, &request, total))
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    #[tracing::instrument(skip(self))]
    async fn finalize_paid_order(&self, order_id: OrderId) -> Result<Order> {
        let handle = self
            .order_handle(order_id)
            .await
            .ok_or(StoreError::OrderNotFound(order_id))?;
        let mut order = handle.lock().await;

        if !order.status().can_pay() {
            return Err(StoreError::AlreadyPaid(order_id));
        }

        let mut locked = self.lock_lines(&order.stock_lines()).await?;
        commit_locked(&mut locked)?;

        if let Err(err) = order.mark_paid() {
            restore_locked(&mut locked);
            return Err(err.into());
        }

        self.inner
            .carts
            .lock()
            .await
            .entry(order.user_id())
            .or_default()
            .clear();

        Ok(order.clone())
    }
}
