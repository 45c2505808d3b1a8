//! Field-level checks applied before anything is written to a store.

use crate::domain::{NewCustomer, NewProduct, NewOrder, Product};
use crate::error::{CrmError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

/// `+` followed by 10-15 digits, or `123-456-7890`.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+\d{10,15}|\d{3}-\d{3}-\d{4})$").expect("valid phone regex"));

pub const EMAIL_EXISTS: &str = "Email already exists";
pub const INVALID_PHONE: &str = "Invalid phone format";
pub const INVALID_EMAIL: &str = "Invalid email format";
pub const NAME_REQUIRED: &str = "Name is required";
pub const PRICE_NOT_POSITIVE: &str = "Price must be positive";
pub const PRICE_PRECISION: &str = "Price cannot have more than 2 decimal places";
pub const PRICE_TOO_LARGE: &str = "Price is too large";
pub const AMOUNT_TOO_LARGE: &str = "Amount is too large";
pub const STOCK_NEGATIVE: &str = "Stock cannot be negative";
pub const PRODUCTS_REQUIRED: &str = "At least one product is required";
pub const INVALID_CUSTOMER: &str = "Invalid customer ID";
pub const INVALID_PRODUCT: &str = "Invalid product ID";

/// Money is kept to cents.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount either store can hold. `i64::MAX` cents stays free for clamped filter bounds.
pub fn max_amount() -> Decimal {
    Decimal::new(i64::MAX - 1, MONEY_SCALE)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Blank phones are treated as absent.
pub fn normalize_phone(phone: Option<&str>) -> Result<Option<String>> {
    match phone.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) if is_valid_phone(p) => Ok(Some(p.to_string())),
        Some(_) => Err(CrmError::validation(INVALID_PHONE)),
    }
}

pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| CrmError::validation(INVALID_EMAIL))?;
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(CrmError::validation(INVALID_EMAIL));
    }
    Ok(email.to_string())
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CrmError::validation(NAME_REQUIRED));
    }
    Ok(name.to_string())
}

/// Shape checks only; email uniqueness needs the store.
pub fn validate_customer(input: &NewCustomer) -> Result<NewCustomer> {
    Ok(NewCustomer {
        name: normalize_name(&input.name)?,
        email: normalize_email(&input.email)?,
        phone: normalize_phone(input.phone.as_deref())?,
    })
}

pub fn validate_product(input: &NewProduct) -> Result<NewProduct> {
    let name = normalize_name(&input.name)?;
    if input.price <= Decimal::ZERO {
        return Err(CrmError::validation(PRICE_NOT_POSITIVE));
    }
    if input.price.normalize().scale() > MONEY_SCALE {
        return Err(CrmError::validation(PRICE_PRECISION));
    }
    if input.price > max_amount() {
        return Err(CrmError::validation(PRICE_TOO_LARGE));
    }
    if input.stock < 0 {
        return Err(CrmError::validation(STOCK_NEGATIVE));
    }
    let mut price = input.price;
    price.rescale(MONEY_SCALE);
    Ok(NewProduct {
        name,
        price,
        stock: input.stock,
    })
}

/// Returns the distinct product ids in first-seen order.
pub fn distinct_product_ids(input: &NewOrder) -> Result<Vec<i64>> {
    if input.product_ids.is_empty() {
        return Err(CrmError::validation(PRODUCTS_REQUIRED));
    }
    let mut ids = Vec::with_capacity(input.product_ids.len());
    for id in &input.product_ids {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    Ok(ids)
}

/// Every requested id must resolve to a product.
pub fn check_products_resolved(requested: &[i64], found: &[Product]) -> Result<()> {
    if requested
        .iter()
        .all(|id| found.iter().any(|p| p.id == *id))
    {
        Ok(())
    } else {
        Err(CrmError::validation(INVALID_PRODUCT))
    }
}

/// Sums money amounts; fails instead of overflowing or passing `max_amount`.
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let max = max_amount();
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .filter(|sum| *sum <= max)
            .ok_or_else(|| CrmError::validation(AMOUNT_TOO_LARGE))
    })
}

pub fn order_total(products: &[Product]) -> Result<Decimal> {
    checked_sum(products.iter().map(|p| p.price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn product(id: i64, price: &str) -> Product {
        Product {
            id,
            name: format!("p{id}"),
            price: Decimal::from_str(price).unwrap(),
            stock: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn phone_formats() {
        assert!(is_valid_phone("+12345678901"));
        assert!(is_valid_phone("123-456-7890"));
        assert!(!is_valid_phone("+123"));
        assert!(!is_valid_phone("1234567890"));
        assert!(!is_valid_phone("123-4567-890"));
        assert!(!is_valid_phone("+1234567890123456"));
    }

    #[test]
    fn blank_phone_is_absent() {
        assert_eq!(normalize_phone(Some("  ")).unwrap(), None);
        assert_eq!(normalize_phone(None).unwrap(), None);
        assert_eq!(
            normalize_phone(Some(" 555-123-4567 ")).unwrap().as_deref(),
            Some("555-123-4567")
        );
    }

    #[test]
    fn email_shape() {
        assert_eq!(normalize_email(" alice@example.com ").unwrap(), "alice@example.com");
        for bad in ["alice", "@example.com", "alice@example", "a@b@c.com", "a b@c.com", "a@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn customer_requires_name() {
        let err = validate_customer(&NewCustomer {
            name: "   ".into(),
            email: "a@b.co".into(),
            phone: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), NAME_REQUIRED);
    }

    #[test]
    fn product_price_and_stock() {
        let ok = NewProduct {
            name: "Laptop".into(),
            price: Decimal::from_str("999.99").unwrap(),
            stock: 0,
        };
        assert!(validate_product(&ok).is_ok());

        let free = NewProduct { price: Decimal::ZERO, ..ok.clone() };
        assert_eq!(validate_product(&free).unwrap_err().to_string(), PRICE_NOT_POSITIVE);

        let fractional = NewProduct { price: Decimal::from_str("1.005").unwrap(), ..ok.clone() };
        assert_eq!(validate_product(&fractional).unwrap_err().to_string(), PRICE_PRECISION);

        let trailing_zeros = NewProduct { price: Decimal::from_str("2.5000").unwrap(), ..ok.clone() };
        assert_eq!(validate_product(&trailing_zeros).unwrap().price.to_string(), "2.50");

        let negative = NewProduct { stock: -1, ..ok };
        assert_eq!(validate_product(&negative).unwrap_err().to_string(), STOCK_NEGATIVE);
    }

    #[test]
    fn order_product_ids_are_deduplicated() {
        let order = NewOrder {
            customer_id: 1,
            product_ids: vec![3, 1, 3, 2, 1],
            order_date: None,
        };
        assert_eq!(distinct_product_ids(&order).unwrap(), vec![3, 1, 2]);

        let empty = NewOrder { product_ids: vec![], ..order };
        assert_eq!(distinct_product_ids(&empty).unwrap_err().to_string(), PRODUCTS_REQUIRED);
    }

    #[test]
    fn unresolved_products_and_totals() {
        let found = vec![product(1, "10.50"), product(2, "4.25")];
        assert!(check_products_resolved(&[1, 2], &found).is_ok());
        assert_eq!(
            check_products_resolved(&[1, 9], &found).unwrap_err().to_string(),
            INVALID_PRODUCT
        );
        assert_eq!(order_total(&found).unwrap(), Decimal::from_str("14.75").unwrap());
    }

    #[test]
    fn price_ceiling_and_overflowing_totals() {
        let huge = NewProduct {
            name: "Yacht".into(),
            price: Decimal::from_str("79228162514264337593543950335").unwrap(),
            stock: 1,
        };
        assert_eq!(validate_product(&huge).unwrap_err().to_string(), PRICE_TOO_LARGE);

        let at_ceiling = NewProduct { price: max_amount(), ..huge };
        assert_eq!(validate_product(&at_ceiling).unwrap().price, max_amount());

        let pricey = vec![product(1, "50000000000000000"), product(2, "50000000000000000")];
        assert_eq!(order_total(&pricey).unwrap_err().to_string(), AMOUNT_TOO_LARGE);

        let overflowing = [Decimal::MAX, Decimal::MAX];
        assert_eq!(checked_sum(overflowing).unwrap_err().to_string(), AMOUNT_TOO_LARGE);
    }
}
