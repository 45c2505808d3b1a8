//! Filter inputs and ordering shared by every storage backend.

use crate::domain::{Customer, Order, Product};
use crate::error::{CrmError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Products with fewer units than this count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub name_icontains: Option<String>,
    pub email_icontains: Option<String>,
    pub created_at_gte: Option<DateTime<Utc>>,
    pub created_at_lte: Option<DateTime<Utc>>,
    /// Case-insensitive prefix of the phone number.
    pub phone_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub name_icontains: Option<String>,
    pub price_gte: Option<Decimal>,
    pub price_lte: Option<Decimal>,
    pub stock_gte: Option<i32>,
    pub stock_lte: Option<i32>,
    pub low_stock: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub total_amount_gte: Option<Decimal>,
    pub total_amount_lte: Option<Decimal>,
    pub order_date_gte: Option<DateTime<Utc>>,
    pub order_date_lte: Option<DateTime<Utc>>,
    pub customer_name: Option<String>,
    pub product_name: Option<String>,
    pub product_id: Option<i64>,
}

/// Empty strings are treated as "no constraint".
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Case folding is ASCII-only, matching SQLite's `lower()` and `NOCASE`.
pub(crate) fn icontains(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(needle) = non_empty(&self.name_icontains) {
            if !icontains(&customer.name, needle) {
                return false;
            }
        }
        if let Some(needle) = non_empty(&self.email_icontains) {
            if !icontains(&customer.email, needle) {
                return false;
            }
        }
        if let Some(gte) = self.created_at_gte {
            if customer.created_at < gte {
                return false;
            }
        }
        if let Some(lte) = self.created_at_lte {
            if customer.created_at > lte {
                return false;
            }
        }
        if let Some(prefix) = non_empty(&self.phone_pattern) {
            let prefix = prefix.to_ascii_lowercase();
            match &customer.phone {
                Some(phone) if phone.to_ascii_lowercase().starts_with(&prefix) => {}
                _ => return false,
            }
        }
        true
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = non_empty(&self.name_icontains) {
            if !icontains(&product.name, needle) {
                return false;
            }
        }
        if self.price_gte.is_some_and(|gte| product.price < gte) {
            return false;
        }
        if self.price_lte.is_some_and(|lte| product.price > lte) {
            return false;
        }
        if self.stock_gte.is_some_and(|gte| product.stock < gte) {
            return false;
        }
        if self.stock_lte.is_some_and(|lte| product.stock > lte) {
            return false;
        }
        if self.low_stock == Some(true) && product.stock >= LOW_STOCK_THRESHOLD {
            return false;
        }
        true
    }
}

impl OrderFilter {
    /// `customer` and `products` are the order's resolved relations.
    pub fn matches(&self, order: &Order, customer: Option<&Customer>, products: &[Product]) -> bool {
        if self.total_amount_gte.is_some_and(|gte| order.total_amount < gte) {
            return false;
        }
        if self.total_amount_lte.is_some_and(|lte| order.total_amount > lte) {
            return false;
        }
        if self.order_date_gte.is_some_and(|gte| order.order_date < gte) {
            return false;
        }
        if self.order_date_lte.is_some_and(|lte| order.order_date > lte) {
            return false;
        }
        if let Some(needle) = non_empty(&self.customer_name) {
            if !customer.is_some_and(|c| icontains(&c.name, needle)) {
                return false;
            }
        }
        if let Some(needle) = non_empty(&self.product_name) {
            if !products.iter().any(|p| icontains(&p.name, needle)) {
                return false;
            }
        }
        if let Some(product_id) = self.product_id {
            if !order.product_ids.contains(&product_id) {
                return false;
            }
        }
        true
    }
}

/// A sortable column of one entity.
pub trait SortField: Copy + Default + PartialEq + std::fmt::Debug {
    const ENTITY: &'static str;

    /// Accepts snake_case (`created_at`) and camelCase (`createdAt`).
    fn from_name(name: &str) -> Option<Self>;

    fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CustomerField {
    #[default]
    Id,
    Name,
    Email,
    Phone,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductField {
    #[default]
    Id,
    Name,
    Price,
    Stock,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderField {
    #[default]
    Id,
    CustomerId,
    TotalAmount,
    OrderDate,
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl SortField for CustomerField {
    const ENTITY: &'static str = "customer";

    fn from_name(name: &str) -> Option<Self> {
        match to_snake_case(name).as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::CreatedAt => "created_at",
        }
    }
}

impl SortField for ProductField {
    const ENTITY: &'static str = "product";

    fn from_name(name: &str) -> Option<Self> {
        match to_snake_case(name).as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "stock" => Some(Self::Stock),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Price => "price_cents",
            Self::Stock => "stock",
            Self::CreatedAt => "created_at",
        }
    }
}

impl SortField for OrderField {
    const ENTITY: &'static str = "order";

    fn from_name(name: &str) -> Option<Self> {
        match to_snake_case(name).as_str() {
            "id" => Some(Self::Id),
            "customer" | "customer_id" => Some(Self::CustomerId),
            "total_amount" => Some(Self::TotalAmount),
            "order_date" => Some(Self::OrderDate),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CustomerId => "customer_id",
            Self::TotalAmount => "total_cents",
            Self::OrderDate => "order_date",
        }
    }
}

/// Parsed `orderBy` argument. A leading `-` sorts descending; ties break on ascending id.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderBy<F: SortField> {
    pub field: F,
    pub descending: bool,
}

impl<F: SortField> OrderBy<F> {
    pub fn asc(field: F) -> Self {
        Self { field, descending: false }
    }

    pub fn desc(field: F) -> Self {
        Self { field, descending: true }
    }

    /// `None` or a blank string yields the default (ascending id).
    pub fn parse(spec: Option<&str>) -> Result<Self> {
        let spec = match spec.map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(s) => s,
        };
        let (descending, name) = match spec.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, spec.strip_prefix('+').unwrap_or(spec)),
        };
        let field = F::from_name(name).ok_or_else(|| {
            CrmError::validation(format!(
                "Cannot order {} by '{}'",
                F::ENTITY,
                name
            ))
        })?;
        Ok(Self { field, descending })
    }

    /// `ORDER BY` clause with the id tiebreaker.
    pub fn sql(&self) -> String {
        let dir = if self.descending { "DESC" } else { "ASC" };
        if self.field == F::default() {
            format!("ORDER BY id {dir}")
        } else {
            format!("ORDER BY {} {dir}, id ASC", self.field.column())
        }
    }

    fn apply(&self, primary: Ordering, a_id: i64, b_id: i64) -> Ordering {
        let primary = if self.descending { primary.reverse() } else { primary };
        if self.field == F::default() {
            primary
        } else {
            primary.then(a_id.cmp(&b_id))
        }
    }
}

/// SQLite sorts NULL before any value; absent phones follow the same rule.
fn cmp_opt_str(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

impl OrderBy<CustomerField> {
    pub fn compare(&self, a: &Customer, b: &Customer) -> Ordering {
        let primary = match self.field {
            CustomerField::Id => a.id.cmp(&b.id),
            CustomerField::Name => a.name.cmp(&b.name),
            // emails are NOCASE in the relational store
            CustomerField::Email => a.email.to_ascii_lowercase().cmp(&b.email.to_ascii_lowercase()),
            CustomerField::Phone => cmp_opt_str(&a.phone, &b.phone),
            CustomerField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        self.apply(primary, a.id, b.id)
    }
}

impl OrderBy<ProductField> {
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.field {
            ProductField::Id => a.id.cmp(&b.id),
            ProductField::Name => a.name.cmp(&b.name),
            ProductField::Price => a.price.cmp(&b.price),
            ProductField::Stock => a.stock.cmp(&b.stock),
            ProductField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        self.apply(primary, a.id, b.id)
    }
}

impl OrderBy<OrderField> {
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        let primary = match self.field {
            OrderField::Id => a.id.cmp(&b.id),
            OrderField::CustomerId => a.customer_id.cmp(&b.customer_id),
            OrderField::TotalAmount => a.total_amount.cmp(&b.total_amount),
            OrderField::OrderDate => a.order_date.cmp(&b.order_date),
        };
        self.apply(primary, a.id, b.id)
    }
}

/// Offset/limit window applied after filtering and ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    /// Negative GraphQL arguments clamp to zero.
    pub fn from_args(limit: Option<i32>, offset: Option<i32>) -> Self {
        Self {
            offset: offset.map(|o| o.max(0) as usize).unwrap_or(0),
            limit: limit.map(|l| l.max(0) as usize),
        }
    }

    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = self.offset.min(items.len());
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit).min(items.len()),
            None => items.len(),
        };
        items[start..end].to_vec()
    }
}
