use super::{normalize_timestamp, now, PageFor, Storage};
use crate::domain::{CrmTotals, Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
use crate::error::{CrmError, Result};
use crate::filters::{
    non_empty, CustomerField, CustomerFilter, OrderBy, OrderField, OrderFilter, Page,
    ProductField, ProductFilter,
};
use crate::validation::{
    check_products_resolved, checked_sum, distinct_product_ids, order_total, validate_customer,
    validate_product, EMAIL_EXISTS, INVALID_CUSTOMER,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS customers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    phone       TEXT,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS products (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    price_cents  INTEGER NOT NULL CHECK (price_cents > 0),
    stock        INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    created_at   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS orders (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id  INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
    total_cents  INTEGER NOT NULL CHECK (total_cents >= 0),
    order_date   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS order_products (
    order_id    INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    product_id  INTEGER NOT NULL REFERENCES products(id),
    position    INTEGER NOT NULL,
    PRIMARY KEY (order_id, product_id)
);
CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);
CREATE INDEX IF NOT EXISTS idx_order_products_product ON order_products(product_id);
"#;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, created_at";
const PRODUCT_COLUMNS: &str = "id, name, price_cents, stock, created_at";
const ORDER_COLUMNS: &str = "id, customer_id, total_cents, order_date";

fn to_cents(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or_else(|| CrmError::validation(format!("Amount out of range: {amount}")))
}

/// Filter bounds outside the storable range clamp to the `i64` extremes.
fn bound_cents(amount: Decimal, round: fn(Decimal) -> Decimal) -> i64 {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(round)
        .and_then(|cents| cents.to_i64())
        .unwrap_or(if amount.is_sign_negative() { i64::MIN } else { i64::MAX })
}

/// Lower bounds round up and upper bounds round down so sub-cent bounds stay exact.
fn cents_lower_bound(amount: Decimal) -> i64 {
    bound_cents(amount, |cents| cents.ceil())
}

fn cents_upper_bound(amount: Decimal) -> i64 {
    bound_cents(amount, |cents| cents.floor())
}

fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Fixed-width UTC text, so lexical order equals time order.
fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        created_at: parse_ts(row, 4)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        price: from_cents(row.get(2)?),
        stock: row.get(3)?,
        created_at: parse_ts(row, 4)?,
    })
}

/// Order row without its product links.
fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        product_ids: Vec::new(),
        total_amount: from_cents(row.get(2)?),
        order_date: parse_ts(row, 3)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Accumulates `WHERE` fragments and their positional parameters.
#[derive(Default)]
struct WhereClause {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    fn push(&mut self, clause: &str, params: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.params.extend(params);
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn customer_where(filter: &CustomerFilter) -> WhereClause {
    let mut w = WhereClause::default();
    if let Some(needle) = non_empty(&filter.name_icontains) {
        w.push("instr(lower(name), lower(?)) > 0", [text(needle)]);
    }
    if let Some(needle) = non_empty(&filter.email_icontains) {
        w.push("instr(lower(email), lower(?)) > 0", [text(needle)]);
    }
    if let Some(gte) = filter.created_at_gte {
        w.push("created_at >= ?", [Value::Text(ts(gte))]);
    }
    if let Some(lte) = filter.created_at_lte {
        w.push("created_at <= ?", [Value::Text(ts(lte))]);
    }
    if let Some(prefix) = non_empty(&filter.phone_pattern) {
        w.push(
            "phone IS NOT NULL AND lower(substr(phone, 1, length(?))) = lower(?)",
            [text(prefix), text(prefix)],
        );
    }
    w
}

fn product_where(filter: &ProductFilter) -> WhereClause {
    let mut w = WhereClause::default();
    if let Some(needle) = non_empty(&filter.name_icontains) {
        w.push("instr(lower(name), lower(?)) > 0", [text(needle)]);
    }
    if let Some(gte) = filter.price_gte {
        w.push("price_cents >= ?", [Value::Integer(cents_lower_bound(gte))]);
    }
    if let Some(lte) = filter.price_lte {
        w.push("price_cents <= ?", [Value::Integer(cents_upper_bound(lte))]);
    }
    if let Some(gte) = filter.stock_gte {
        w.push("stock >= ?", [Value::Integer(gte.into())]);
    }
    if let Some(lte) = filter.stock_lte {
        w.push("stock <= ?", [Value::Integer(lte.into())]);
    }
    if filter.low_stock == Some(true) {
        w.push(
            "stock < ?",
            [Value::Integer(crate::filters::LOW_STOCK_THRESHOLD.into())],
        );
    }
    w
}

fn order_where(filter: &OrderFilter) -> WhereClause {
    let mut w = WhereClause::default();
    if let Some(gte) = filter.total_amount_gte {
        w.push("total_cents >= ?", [Value::Integer(cents_lower_bound(gte))]);
    }
    if let Some(lte) = filter.total_amount_lte {
        w.push("total_cents <= ?", [Value::Integer(cents_upper_bound(lte))]);
    }
    if let Some(gte) = filter.order_date_gte {
        w.push("order_date >= ?", [Value::Text(ts(gte))]);
    }
    if let Some(lte) = filter.order_date_lte {
        w.push("order_date <= ?", [Value::Text(ts(lte))]);
    }
    if let Some(needle) = non_empty(&filter.customer_name) {
        w.push(
            "customer_id IN (SELECT id FROM customers WHERE instr(lower(name), lower(?)) > 0)",
            [text(needle)],
        );
    }
    // IN-subqueries keep an order from appearing once per matching product
    if let Some(needle) = non_empty(&filter.product_name) {
        w.push(
            "id IN (SELECT op.order_id FROM order_products op \
             JOIN products p ON p.id = op.product_id \
             WHERE instr(lower(p.name), lower(?)) > 0)",
            [text(needle)],
        );
    }
    if let Some(product_id) = filter.product_id {
        w.push(
            "id IN (SELECT order_id FROM order_products WHERE product_id = ?)",
            [Value::Integer(product_id)],
        );
    }
    w
}

fn count_rows(conn: &Connection, table: &str, w: &WhereClause) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {table} {}", w.sql());
    let count: i64 = conn.query_row(&sql, params_from_iter(w.params.iter()), |row| row.get(0))?;
    Ok(count as usize)
}

fn select_customers(
    conn: &Connection,
    w: &WhereClause,
    order: OrderBy<CustomerField>,
    page: Page,
) -> Result<Vec<Customer>> {
    let sql = format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers {} {} {}",
        w.sql(),
        order.sql(),
        limit_sql(page)
    );
    let mut stmt = conn.prepare(&sql)?;
    let customers = stmt
        .query_map(params_from_iter(w.params.iter()), customer_from_row)?
        .collect::<rusqlite::Result<Vec<Customer>>>()?;
    Ok(customers)
}

fn select_products(
    conn: &Connection,
    w: &WhereClause,
    order: OrderBy<ProductField>,
    page: Page,
) -> Result<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products {} {} {}",
        w.sql(),
        order.sql(),
        limit_sql(page)
    );
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map(params_from_iter(w.params.iter()), product_from_row)?
        .collect::<rusqlite::Result<Vec<Product>>>()?;
    Ok(products)
}

fn select_orders(
    conn: &Connection,
    w: &WhereClause,
    order: OrderBy<OrderField>,
    page: Page,
) -> Result<Vec<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders {} {} {}",
        w.sql(),
        order.sql(),
        limit_sql(page)
    );
    let orders = {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(w.params.iter()), order_from_row)?
            .collect::<rusqlite::Result<Vec<Order>>>()?;
        rows
    };
    with_product_ids(conn, orders)
}

fn limit_sql(page: Page) -> String {
    // SQLite needs a LIMIT before OFFSET; -1 means unbounded
    let limit = page.limit.map(|l| l as i64).unwrap_or(-1);
    format!("LIMIT {} OFFSET {}", limit, page.offset)
}

fn insert_customer(conn: &Connection, input: &NewCustomer) -> Result<Customer> {
    let input = validate_customer(input)?;
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE email = ?1)",
        params![input.email],
        |row| row.get(0),
    )?;
    if exists {
        return Err(CrmError::validation(EMAIL_EXISTS));
    }
    let created_at = now();
    conn.execute(
        "INSERT INTO customers (name, email, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![input.name, input.email, input.phone, ts(created_at)],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            CrmError::validation(EMAIL_EXISTS)
        } else {
            CrmError::Database(e)
        }
    })?;
    let customer = Customer {
        id: conn.last_insert_rowid(),
        name: input.name,
        email: input.email,
        phone: input.phone,
        created_at,
    };
    debug!("Created customer: {} with id {}", customer.email, customer.id);
    Ok(customer)
}

fn load_product_ids(conn: &Connection, order_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT product_id FROM order_products WHERE order_id = ?1 ORDER BY position",
    )?;
    let ids = stmt
        .query_map(params![order_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn with_product_ids(conn: &Connection, mut orders: Vec<Order>) -> Result<Vec<Order>> {
    for order in &mut orders {
        order.product_ids = load_product_ids(conn, order.id)?;
    }
    Ok(orders)
}

fn select_products_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ({placeholders})");
    let mut stmt = conn.prepare(&sql)?;
    let found = stmt
        .query_map(params_from_iter(ids.iter()), product_from_row)?
        .collect::<rusqlite::Result<Vec<Product>>>()?;
    // keep the caller's id order
    Ok(ids
        .iter()
        .filter_map(|id| found.iter().find(|p| p.id == *id).cloned())
        .collect())
}

/// Relational store over a single SQLite connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database file and applies the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened CRM database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer> {
        let conn = self.conn.lock()?;
        insert_customer(&conn, &input)
    }

    async fn create_customers_bulk(&self, inputs: Vec<NewCustomer>) -> Result<Vec<Result<Customer>>> {
        let mut conn = self.conn.lock()?;
        let mut tx = conn.transaction()?;
        let mut results = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let sp = tx.savepoint()?;
            match insert_customer(&sp, input) {
                Ok(customer) => {
                    sp.commit()?;
                    results.push(Ok(customer));
                }
                // dropping the savepoint rolls this record back
                Err(e) => results.push(Err(e)),
            }
        }
        tx.commit()?;
        Ok(results)
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        let conn = self.conn.lock()?;
        let customer = conn
            .query_row(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
                params![id],
                customer_from_row,
            )
            .optional()?;
        Ok(customer)
    }

    async fn get_customers_by_ids(&self, ids: &[i64]) -> Result<Vec<Customer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let customers = stmt
            .query_map(params_from_iter(ids.iter()), customer_from_row)?
            .collect::<rusqlite::Result<Vec<Customer>>>()?;
        Ok(customers)
    }

    async fn query_customers(
        &self,
        filter: &CustomerFilter,
        order: OrderBy<CustomerField>,
        page: Page,
    ) -> Result<Vec<Customer>> {
        let w = customer_where(filter);
        let conn = self.conn.lock()?;
        select_customers(&conn, &w, order, page)
    }

    async fn page_customers(
        &self,
        filter: &CustomerFilter,
        order: OrderBy<CustomerField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Customer>)> {
        let w = customer_where(filter);
        let conn = self.conn.lock()?;
        let total = count_rows(&conn, "customers", &w)?;
        let customers = select_customers(&conn, &w, order, page_for(total))?;
        Ok((total, customers))
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let input = validate_product(&input)?;
        let price_cents = to_cents(input.price)?;
        let created_at = now();
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO products (name, price_cents, stock, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![input.name, price_cents, input.stock, ts(created_at)],
        )?;
        let product = Product {
            id: conn.last_insert_rowid(),
            name: input.name,
            price: from_cents(price_cents),
            stock: input.stock,
            created_at,
        };
        debug!("Created product: {} with id {}", product.name, product.id);
        Ok(product)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let conn = self.conn.lock()?;
        let product = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                params![id],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let conn = self.conn.lock()?;
        select_products_by_ids(&conn, ids)
    }

    async fn query_products(
        &self,
        filter: &ProductFilter,
        order: OrderBy<ProductField>,
        page: Page,
    ) -> Result<Vec<Product>> {
        let w = product_where(filter);
        let conn = self.conn.lock()?;
        select_products(&conn, &w, order, page)
    }

    async fn page_products(
        &self,
        filter: &ProductFilter,
        order: OrderBy<ProductField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Product>)> {
        let w = product_where(filter);
        let conn = self.conn.lock()?;
        let total = count_rows(&conn, "products", &w)?;
        let products = select_products(&conn, &w, order, page_for(total))?;
        Ok((total, products))
    }

    async fn create_order(&self, input: NewOrder) -> Result<Order> {
        let product_ids = distinct_product_ids(&input)?;
        let order_date = input.order_date.map(normalize_timestamp).unwrap_or_else(now);

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let customer_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)",
            params![input.customer_id],
            |row| row.get(0),
        )?;
        if !customer_exists {
            return Err(CrmError::validation(INVALID_CUSTOMER));
        }
        let products = select_products_by_ids(&tx, &product_ids)?;
        check_products_resolved(&product_ids, &products)?;
        let total_amount = order_total(&products)?;

        tx.execute(
            "INSERT INTO orders (customer_id, total_cents, order_date) VALUES (?1, ?2, ?3)",
            params![input.customer_id, to_cents(total_amount)?, ts(order_date)],
        )?;
        let order_id = tx.last_insert_rowid();
        {
            let mut link = tx.prepare_cached(
                "INSERT INTO order_products (order_id, product_id, position) VALUES (?1, ?2, ?3)",
            )?;
            for (position, product_id) in product_ids.iter().enumerate() {
                link.execute(params![order_id, product_id, position as i64])?;
            }
        }
        tx.commit()?;

        debug!("Created order {} for customer {}", order_id, input.customer_id);
        Ok(Order {
            id: order_id,
            customer_id: input.customer_id,
            product_ids,
            total_amount,
            order_date,
        })
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let conn = self.conn.lock()?;
        let order = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                order_from_row,
            )
            .optional()?;
        match order {
            Some(order) => Ok(with_product_ids(&conn, vec![order])?.pop()),
            None => Ok(None),
        }
    }

    async fn query_orders(
        &self,
        filter: &OrderFilter,
        order: OrderBy<OrderField>,
        page: Page,
    ) -> Result<Vec<Order>> {
        let w = order_where(filter);
        let conn = self.conn.lock()?;
        select_orders(&conn, &w, order, page)
    }

    async fn page_orders(
        &self,
        filter: &OrderFilter,
        order: OrderBy<OrderField>,
        page_for: PageFor<'_>,
    ) -> Result<(usize, Vec<Order>)> {
        let w = order_where(filter);
        let conn = self.conn.lock()?;
        let total = count_rows(&conn, "orders", &w)?;
        let orders = select_orders(&conn, &w, order, page_for(total))?;
        Ok((total, orders))
    }

    async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>> {
        let conn = self.conn.lock()?;
        let orders = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map(params![customer_id], order_from_row)?
                .collect::<rusqlite::Result<Vec<Order>>>()?;
            rows
        };
        with_product_ids(&conn, orders)
    }

    async fn totals(&self) -> Result<CrmTotals> {
        let conn = self.conn.lock()?;
        let total_customers: i64 =
            conn.query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))?;
        let mut stmt = conn.prepare_cached("SELECT total_cents FROM orders")?;
        let amounts = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|cents| cents.map(from_cents))
            .collect::<rusqlite::Result<Vec<Decimal>>>()?;
        Ok(CrmTotals {
            total_customers,
            total_orders: amounts.len() as i64,
            total_revenue: checked_sum(amounts)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cents_conversion() {
        assert_eq!(to_cents(Decimal::from_str("19.99").unwrap()).unwrap(), 1999);
        assert_eq!(from_cents(1999).to_string(), "19.99");
        assert_eq!(cents_lower_bound(Decimal::from_str("10.001").unwrap()), 1001);
        assert_eq!(cents_upper_bound(Decimal::from_str("10.009").unwrap()), 1000);
    }

    #[test]
    fn out_of_range_amounts() {
        let err = to_cents(Decimal::MAX).unwrap_err();
        assert!(err.to_string().contains("Amount out of range"));
        assert_eq!(cents_lower_bound(Decimal::MAX), i64::MAX);
        assert_eq!(cents_upper_bound(Decimal::MAX), i64::MAX);
        assert_eq!(cents_lower_bound(Decimal::MIN), i64::MIN);
        assert_eq!(cents_upper_bound(Decimal::from_str("100000000000000000").unwrap()), i64::MAX);
    }

    #[test]
    fn where_clause_joins_fragments() {
        let filter = ProductFilter {
            name_icontains: Some("cable".into()),
            low_stock: Some(true),
            ..Default::default()
        };
        let w = product_where(&filter);
        assert_eq!(
            w.sql(),
            "WHERE instr(lower(name), lower(?)) > 0 AND stock < ?"
        );
        assert_eq!(w.params.len(), 2);
        assert!(customer_where(&CustomerFilter::default()).sql().is_empty());
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2024-01-02T03:04:05.5Z").unwrap().with_timezone(&Utc);
        assert_eq!(ts(early), "2024-01-02T03:04:05.000000Z");
        assert!(ts(early) < ts(late));
    }
}
