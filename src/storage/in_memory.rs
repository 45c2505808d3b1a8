use super::{normalize_timestamp, now, PageFor, Storage};
use crate::domain::{CrmTotals, Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
use crate::error::{CrmError, Result};
use crate::filters::{
    CustomerField, CustomerFilter, OrderBy, OrderField, OrderFilter, Page, ProductField,
    ProductFilter,
};
use crate::validation::{
    check_products_resolved, checked_sum, distinct_product_ids, order_total, validate_customer,
    validate_product, EMAIL_EXISTS, INVALID_CUSTOMER,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct State {
    customers: BTreeMap<i64, Customer>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    next_customer_id: i64,
    next_product_id: i64,
    next_order_id: i64,
}

impl State {
    /// ASCII case folding, the same rule as SQLite's `NOCASE`.
    fn email_taken(&self, email: &str) -> bool {
        self.customers
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(email))
    }

    fn insert_customer(&mut self, input: &NewCustomer) -> Result<Customer> {
        let input = validate_customer(input)?;
        if self.email_taken(&input.email) {
            return Err(CrmError::validation(EMAIL_EXISTS));
        }
        self.next_customer_id += 1;
        let customer = Customer {
            id: self.next_customer_id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            created_at: now(),
        };
        self.customers.insert(customer.id, customer.clone());
        debug!("Created customer: {} with id {}", customer.email, customer.id);
        Ok(customer)
    }

    fn products_of(&self, order: &Order) -> Vec<Product> {
        order
            .product_ids
            .iter()
            .filter_map(|id| self.products.get(id).cloned())
            .collect()
    }

    fn sorted_customers(&self, filter: &CustomerFilter, order: OrderBy<CustomerField>) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self
            .customers
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        customers.sort_by(|a, b| order.compare(a, b));
        customers
    }

    fn sorted_products(&self, filter: &ProductFilter, order: OrderBy<ProductField>) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| order.compare(a, b));
        products
    }

    fn sorted_orders(&self, filter: &OrderFilter, order: OrderBy<OrderField>) -> Vec<Order> {
        let mut orders = self.filtered_orders(filter);
        orders.sort_by(|a, b| order.compare(a, b));
        orders
    }

    fn filtered_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| {
                let products = self.products_of(o);
                filter.matches(o, self.customers.get(&o.customer_id), &products)
            })
            .cloned()
            .collect()
    }
}

/// Mutex-guarded maps for tests and `--in-memory` runs. Data is lost on drop.
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer> {
        let mut state = self.state.lock()?;
        state.insert_customer(&input)
    }

    async fn create_customers_bulk(&self, inputs: Vec<NewCustomer>) -> Result<Vec<Result<Customer>>> {
        let mut state = self.state.lock()?;
        Ok(inputs
            .iter()
            .map(|input| state.insert_customer(input))
            .collect())
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        let state = self.state.lock()?;
        Ok(state.customers.get(&id).cloned())
    }

    async fn get_customers_by_ids(&self, ids: &[i64]) -> Result<Vec<Customer>> {
        let state = self.state.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.customers.get(id).cloned())
            .collect())
    }

    async fn query_customers(
        &self,
        filter: &CustomerFilter,
        order: OrderBy<CustomerField>,
        page: Page,
    ) -> Result<Vec<Customer>> {
        let state = self.state.lock()?;
        Ok(page.slice(&state.sorted_customers(filter, order)))
    }

    async fn page_customers(
        &self,
        filter: &CustomerFilter,
        order: OrderBy<CustomerField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Customer>)> {
        let state = self.state.lock()?;
        let customers = state.sorted_customers(filter, order);
        Ok((customers.len(), page_for(customers.len()).slice(&customers)))
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let input = validate_product(&input)?;
        let mut state = self.state.lock()?;
        state.next_product_id += 1;
        let product = Product {
            id: state.next_product_id,
            name: input.name,
            price: input.price,
            stock: input.stock,
            created_at: now(),
        };
        state.products.insert(product.id, product.clone());
        debug!("Created product: {} with id {}", product.name, product.id);
        Ok(product)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let state = self.state.lock()?;
        Ok(state.products.get(&id).cloned())
    }

    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let state = self.state.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn query_products(
        &self,
        filter: &ProductFilter,
        order: OrderBy<ProductField>,
        page: Page,
    ) -> Result<Vec<Product>> {
        let state = self.state.lock()?;
        Ok(page.slice(&state.sorted_products(filter, order)))
    }

    async fn page_products(
        &self,
        filter: &ProductFilter,
        order: OrderBy<ProductField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Product>)> {
        let state = self.state.lock()?;
        let products = state.sorted_products(filter, order);
        Ok((products.len(), page_for(products.len()).slice(&products)))
    }

    async fn create_order(&self, input: NewOrder) -> Result<Order> {
        let product_ids = distinct_product_ids(&input)?;
        let mut state = self.state.lock()?;
        if !state.customers.contains_key(&input.customer_id) {
            return Err(CrmError::validation(INVALID_CUSTOMER));
        }
        let products: Vec<Product> = product_ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect();
        check_products_resolved(&product_ids, &products)?;
        let total_amount = order_total(&products)?;

        state.next_order_id += 1;
        let order = Order {
            id: state.next_order_id,
            customer_id: input.customer_id,
            product_ids,
            total_amount,
            order_date: input.order_date.map(normalize_timestamp).unwrap_or_else(now),
        };
        state.orders.insert(order.id, order.clone());
        debug!("Created order {} for customer {}", order.id, order.customer_id);
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let state = self.state.lock()?;
        Ok(state.orders.get(&id).cloned())
    }

    async fn query_orders(
        &self,
        filter: &OrderFilter,
        order: OrderBy<OrderField>,
        page: Page,
    ) -> Result<Vec<Order>> {
        let state = self.state.lock()?;
        Ok(page.slice(&state.sorted_orders(filter, order)))
    }

    async fn page_orders(
        &self,
        filter: &OrderFilter,
        order: OrderBy<OrderField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Order>)> {
        let state = self.state.lock()?;
        let orders = state.sorted_orders(filter, order);
        Ok((orders.len(), page_for(orders.len()).slice(&orders)))
    }

    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>> {
        let state = self.state.lock()?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn totals(&self) -> Result<CrmTotals> {
        let state = self.state.lock()?;
        Ok(CrmTotals {
            total_customers: state.customers.len() as i64,
            total_orders: state.orders.len() as i64,
            total_revenue: checked_sum(state.orders.values().map(|o| o.total_amount))?,
        })
    }
}
