use anyhow::Result;
use async_graphql::{Request, Variables};
use crm_graphql::graphql::{create_schema, GraphQLSchema};
use crm_graphql::storage::{InMemoryStorage, SqliteStorage, Storage};
use serde_json::{json, Value};
use std::sync::Arc;

fn backends() -> Result<Vec<(&'static str, GraphQLSchema)>> {
    let memory: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    let sqlite: Arc<dyn Storage> = Arc::new(SqliteStorage::open_in_memory()?);
    Ok(vec![
        ("memory", create_schema(memory)),
        ("sqlite", create_schema(sqlite)),
    ])
}

/// Runs `query` and returns `(data, error messages)`.
async fn execute(schema: &GraphQLSchema, query: &str, variables: Value) -> Result<(Value, Vec<String>)> {
    let request = Request::new(query).variables(Variables::from_json(variables));
    let response = schema.execute(request).await;
    let errors = response.errors.iter().map(|e| e.message.clone()).collect();
    Ok((response.data.into_json()?, errors))
}

async fn create_customer(schema: &GraphQLSchema, name: &str, email: &str, phone: Option<&str>) -> Result<String> {
    let (data, errors) = execute(
        schema,
        "mutation($name: String!, $email: String!, $phone: String) {
            createCustomer(name: $name, email: $email, phone: $phone) { customer { id } message }
        }",
        json!({ "name": name, "email": email, "phone": phone }),
    )
    .await?;
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    Ok(data["createCustomer"]["customer"]["id"]
        .as_str()
        .unwrap()
        .to_string())
}

async fn create_product(schema: &GraphQLSchema, name: &str, price: &str, stock: i32) -> Result<String> {
    let (data, errors) = execute(
        schema,
        "mutation($name: String!, $price: Decimal!, $stock: Int!) {
            createProduct(name: $name, price: $price, stock: $stock) { product { id } }
        }",
        json!({ "name": name, "price": price, "stock": stock }),
    )
    .await?;
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    Ok(data["createProduct"]["product"]["id"]
        .as_str()
        .unwrap()
        .to_string())
}

async fn create_order(schema: &GraphQLSchema, customer_id: &str, product_ids: &[&str]) -> Result<(Value, Vec<String>)> {
    execute(
        schema,
        "mutation($customerId: ID!, $productIds: [ID!]!) {
            createOrder(customerId: $customerId, productIds: $productIds) {
                order { id totalAmount customer { name } products { name price } }
            }
        }",
        json!({ "customerId": customer_id, "productIds": product_ids }),
    )
    .await
}

#[tokio::test]
async fn hello_field_answers() -> Result<()> {
    for (_, schema) in backends()? {
        let (data, errors) = execute(&schema, "{ hello }", json!({})).await?;
        assert!(errors.is_empty());
        assert_eq!(data["hello"], "Hello, GraphQL!");
    }
    Ok(())
}

#[tokio::test]
async fn create_customer_rejects_duplicate_email() -> Result<()> {
    for (backend, schema) in backends()? {
        let (data, errors) = execute(
            &schema,
            r#"mutation {
                createCustomer(name: "Alice", email: "alice@example.com", phone: "+1234567890") {
                    customer { id name email phone }
                    message
                }
            }"#,
            json!({}),
        )
        .await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        let payload = &data["createCustomer"];
        assert_eq!(payload["message"], "Customer created successfully");
        assert_eq!(payload["customer"]["name"], "Alice");
        assert_eq!(payload["customer"]["phone"], "+1234567890");

        let response = schema
            .execute(
                r#"mutation {
                    createCustomer(name: "Other Alice", email: "ALICE@example.com") { customer { id } }
                }"#,
            )
            .await;
        assert_eq!(response.errors.len(), 1, "{backend}");
        assert_eq!(response.errors[0].message, "Email already exists");
        let error = serde_json::to_value(&response.errors[0])?;
        assert_eq!(error["extensions"]["code"], "VALIDATION", "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn create_customer_validates_phone_and_email() -> Result<()> {
    for (backend, schema) in backends()? {
        let (_, errors) = execute(
            &schema,
            r#"mutation { createCustomer(name: "Bob", email: "bob@example.com", phone: "12345") { customer { id } } }"#,
            json!({}),
        )
        .await?;
        assert_eq!(errors, vec!["Invalid phone format".to_string()], "{backend}");

        let (_, errors) = execute(
            &schema,
            r#"mutation { createCustomer(name: "Bob", email: "not-an-email") { customer { id } } }"#,
            json!({}),
        )
        .await?;
        assert_eq!(errors, vec!["Invalid email format".to_string()], "{backend}");

        create_customer(&schema, "Bob", "bob@example.com", Some("123-456-7890")).await?;
        let (data, _) = execute(&schema, "{ customers { name } }", json!({})).await?;
        assert_eq!(data["customers"].as_array().unwrap().len(), 1, "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn bulk_create_keeps_valid_records() -> Result<()> {
    for (backend, schema) in backends()? {
        create_customer(&schema, "Existing", "existing@example.com", None).await?;

        let (data, errors) = execute(
            &schema,
            "mutation($input: [BulkCustomerInput!]!) {
                bulkCreateCustomers(input: $input) { customers { name } errors }
            }",
            json!({ "input": [
                { "name": "Carol", "email": "carol@example.com", "phone": "+15550001111" },
                { "name": "Dave", "email": "dave@example.com", "phone": "bad" },
                { "name": "Eve", "email": "existing@example.com" },
                { "name": "Frank", "email": "frank@example.com" },
                { "name": "Carol Again", "email": "carol@example.com" }
            ]}),
        )
        .await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");

        let payload = &data["bulkCreateCustomers"];
        let names: Vec<&str> = payload["customers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Carol", "Frank"], "{backend}");
        assert_eq!(
            payload["errors"],
            json!([
                "Record 2: Invalid phone format",
                "Record 3: Email already exists",
                "Record 5: Email already exists"
            ]),
            "{backend}"
        );

        let (data, _) = execute(&schema, "{ crmReport { totalCustomers } }", json!({})).await?;
        assert_eq!(data["crmReport"]["totalCustomers"], 3, "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn create_product_validates_price_and_stock() -> Result<()> {
    for (backend, schema) in backends()? {
        let (data, errors) = execute(
            &schema,
            r#"mutation { createProduct(name: "Laptop", price: "999.9") { product { name price stock } } }"#,
            json!({}),
        )
        .await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        let product = &data["createProduct"]["product"];
        assert_eq!(product["price"], "999.90", "{backend}");
        assert_eq!(product["stock"], 0, "{backend}");

        for (price, stock, message) in [
            ("-5", 1, "Price must be positive"),
            ("0", 1, "Price must be positive"),
            ("1.999", 1, "Price cannot have more than 2 decimal places"),
            ("10", -1, "Stock cannot be negative"),
        ] {
            let (_, errors) = execute(
                &schema,
                "mutation($price: Decimal!, $stock: Int!) {
                    createProduct(name: \"Widget\", price: $price, stock: $stock) { product { id } }
                }",
                json!({ "price": price, "stock": stock }),
            )
            .await?;
            assert_eq!(errors, vec![message.to_string()], "{backend}: {price}/{stock}");
        }

        let (data, _) = execute(&schema, "{ products { name } }", json!({})).await?;
        assert_eq!(data["products"].as_array().unwrap().len(), 1, "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn create_order_sums_product_prices() -> Result<()> {
    for (backend, schema) in backends()? {
        let customer = create_customer(&schema, "Alice", "alice@example.com", None).await?;
        let laptop = create_product(&schema, "Laptop", "20.00", 5).await?;
        let mouse = create_product(&schema, "Mouse", "25.50", 50).await?;

        let (data, errors) = create_order(&schema, &customer, &[&laptop, &mouse, &laptop]).await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        let order = &data["createOrder"]["order"];
        assert_eq!(order["totalAmount"], "45.50", "{backend}");
        assert_eq!(order["customer"]["name"], "Alice", "{backend}");
        assert_eq!(
            order["products"],
            json!([
                { "name": "Laptop", "price": "20.00" },
                { "name": "Mouse", "price": "25.50" }
            ]),
            "{backend}"
        );

        let (data, _) = execute(
            &schema,
            "query($id: ID!) { customer(id: $id) { orders { totalAmount } } }",
            json!({ "id": customer }),
        )
        .await?;
        assert_eq!(data["customer"]["orders"], json!([{ "totalAmount": "45.50" }]), "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn create_order_rejects_bad_references() -> Result<()> {
    for (backend, schema) in backends()? {
        let customer = create_customer(&schema, "Alice", "alice@example.com", None).await?;
        let product = create_product(&schema, "Laptop", "20.00", 5).await?;

        let (_, errors) = create_order(&schema, "999", &[&product]).await?;
        assert_eq!(errors, vec!["Invalid customer ID".to_string()], "{backend}");

        let (_, errors) = create_order(&schema, &customer, &[&product, "999"]).await?;
        assert_eq!(errors, vec!["Invalid product ID".to_string()], "{backend}");

        let (_, errors) = create_order(&schema, &customer, &[]).await?;
        assert_eq!(errors, vec!["At least one product is required".to_string()], "{backend}");

        let (_, errors) = create_order(&schema, "abc", &[&product]).await?;
        assert_eq!(errors, vec!["Invalid customer ID".to_string()], "{backend}");

        let (data, _) = execute(&schema, "{ crmReport { totalOrders } }", json!({})).await?;
        assert_eq!(data["crmReport"]["totalOrders"], 0, "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn lookups_by_id_return_null_when_missing() -> Result<()> {
    for (backend, schema) in backends()? {
        let (data, errors) = execute(
            &schema,
            "{ customer(id: 42) { id } product(id: 42) { id } order(id: 42) { id } }",
            json!({}),
        )
        .await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        assert_eq!(
            data,
            json!({ "customer": null, "product": null, "order": null }),
            "{backend}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn all_products_filters_orders_and_counts() -> Result<()> {
    for (backend, schema) in backends()? {
        create_product(&schema, "Keyboard", "45.00", 3).await?;
        create_product(&schema, "Monitor", "199.99", 12).await?;
        create_product(&schema, "Mouse", "19.99", 8).await?;
        create_product(&schema, "Cable", "5.00", 100).await?;

        let (data, errors) = execute(
            &schema,
            r#"{
                allProducts(filter: { lowStock: true }, orderBy: "-price") {
                    totalCount
                    edges { node { name } }
                }
            }"#,
            json!({}),
        )
        .await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        assert_eq!(data["allProducts"]["totalCount"], 2, "{backend}");
        assert_eq!(
            data["allProducts"]["edges"],
            json!([{ "node": { "name": "Keyboard" } }, { "node": { "name": "Mouse" } }]),
            "{backend}"
        );

        let (data, _) = execute(
            &schema,
            r#"{
                allProducts(filter: { priceGte: "10", priceLte: "100", nameIcontains: "O" }, orderBy: "name") {
                    totalCount
                    edges { node { name } }
                }
            }"#,
            json!({}),
        )
        .await?;
        assert_eq!(data["allProducts"]["totalCount"], 2, "{backend}");
        assert_eq!(
            data["allProducts"]["edges"],
            json!([{ "node": { "name": "Keyboard" } }, { "node": { "name": "Mouse" } }]),
            "{backend}"
        );

        let (_, errors) = execute(&schema, r#"{ allProducts(orderBy: "secret") { totalCount } }"#, json!({})).await?;
        assert_eq!(errors, vec!["Cannot order product by 'secret'".to_string()], "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn all_customers_paginates_with_cursors() -> Result<()> {
    for (backend, schema) in backends()? {
        for (name, email) in [
            ("Ann", "ann@example.com"),
            ("Ben", "ben@corp.com"),
            ("Cid", "cid@example.com"),
            ("Dee", "dee@example.com"),
            ("Eli", "eli@corp.com"),
        ] {
            create_customer(&schema, name, email, None).await?;
        }

        let page = "query($after: String) {
            allCustomers(orderBy: \"name\", first: 2, after: $after) {
                totalCount
                pageInfo { hasNextPage hasPreviousPage endCursor }
                edges { node { name } }
            }
        }";
        let (data, errors) = execute(&schema, page, json!({ "after": null })).await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        let connection = &data["allCustomers"];
        assert_eq!(connection["totalCount"], 5);
        assert_eq!(connection["pageInfo"]["hasNextPage"], true);
        assert_eq!(connection["pageInfo"]["hasPreviousPage"], false);
        assert_eq!(
            connection["edges"],
            json!([{ "node": { "name": "Ann" } }, { "node": { "name": "Ben" } }])
        );

        let cursor = connection["pageInfo"]["endCursor"].clone();
        let (data, _) = execute(&schema, page, json!({ "after": cursor })).await?;
        let connection = &data["allCustomers"];
        assert_eq!(connection["pageInfo"]["hasPreviousPage"], true, "{backend}");
        assert_eq!(
            connection["edges"],
            json!([{ "node": { "name": "Cid" } }, { "node": { "name": "Dee" } }]),
            "{backend}"
        );

        let (data, _) = execute(
            &schema,
            r#"{ allCustomers(filter: { emailIcontains: "@CORP" }, orderBy: "-name") { totalCount edges { node { name } } } }"#,
            json!({}),
        )
        .await?;
        assert_eq!(data["allCustomers"]["totalCount"], 2, "{backend}");
        assert_eq!(
            data["allCustomers"]["edges"],
            json!([{ "node": { "name": "Eli" } }, { "node": { "name": "Ben" } }]),
            "{backend}"
        );

        let (data, _) = execute(&schema, "{ customers(limit: 2, offset: 3) { name } }", json!({})).await?;
        assert_eq!(data["customers"], json!([{ "name": "Dee" }, { "name": "Eli" }]), "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn all_orders_filters_through_relations() -> Result<()> {
    for (backend, schema) in backends()? {
        let alice = create_customer(&schema, "Alice Smith", "alice@example.com", None).await?;
        let bob = create_customer(&schema, "Bob Jones", "bob@example.com", None).await?;
        let laptop = create_product(&schema, "Laptop", "1000.00", 5).await?;
        let mouse = create_product(&schema, "Mouse", "20.00", 50).await?;

        create_order(&schema, &alice, &[&laptop, &mouse]).await?;
        create_order(&schema, &bob, &[&mouse]).await?;
        create_order(&schema, &alice, &[&mouse]).await?;

        let (data, errors) = execute(
            &schema,
            r#"{ allOrders(filter: { customerName: "alice" }) { totalCount } }"#,
            json!({}),
        )
        .await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        assert_eq!(data["allOrders"]["totalCount"], 2, "{backend}");

        let (data, _) = execute(
            &schema,
            r#"{ allOrders(filter: { productName: "lap" }) { totalCount edges { node { totalAmount } } } }"#,
            json!({}),
        )
        .await?;
        assert_eq!(data["allOrders"]["totalCount"], 1, "{backend}");
        assert_eq!(data["allOrders"]["edges"][0]["node"]["totalAmount"], "1020.00", "{backend}");

        let (data, _) = execute(
            &schema,
            "query($id: ID!) { allOrders(filter: { productId: $id }, orderBy: \"-totalAmount\") { edges { node { customer { name } } } } }",
            json!({ "id": mouse }),
        )
        .await?;
        let names: Vec<&str> = data["allOrders"]["edges"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["node"]["customer"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Alice Smith", "Bob Jones", "Alice Smith"], "{backend}");

        let (data, _) = execute(
            &schema,
            r#"{ allOrders(filter: { totalAmountGte: "25" }) { totalCount } }"#,
            json!({}),
        )
        .await?;
        assert_eq!(data["allOrders"]["totalCount"], 1, "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn crm_report_totals_customers_orders_and_revenue() -> Result<()> {
    for (backend, schema) in backends()? {
        let (data, _) = execute(
            &schema,
            "{ crmReport { totalCustomers totalOrders totalRevenue } }",
            json!({}),
        )
        .await?;
        assert_eq!(data["crmReport"]["totalCustomers"], 0, "{backend}");
        assert_eq!(data["crmReport"]["totalOrders"], 0, "{backend}");

        let alice = create_customer(&schema, "Alice", "alice@example.com", None).await?;
        create_customer(&schema, "Bob", "bob@example.com", None).await?;
        let pen = create_product(&schema, "Pen", "1.25", 10).await?;
        let pad = create_product(&schema, "Pad", "3.50", 10).await?;
        create_order(&schema, &alice, &[&pen, &pad]).await?;
        create_order(&schema, &alice, &[&pad]).await?;

        let (data, _) = execute(
            &schema,
            "{ crmReport { totalCustomers totalOrders totalRevenue } }",
            json!({}),
        )
        .await?;
        assert_eq!(
            data["crmReport"],
            json!({ "totalCustomers": 2, "totalOrders": 2, "totalRevenue": "8.25" }),
            "{backend}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn oversized_amounts_are_rejected_without_breaking_the_store() -> Result<()> {
    let max_price = "92233720368547758.06";
    for (backend, schema) in backends()? {
        let (_, errors) = execute(
            &schema,
            "mutation($price: Decimal!) { createProduct(name: \"Yacht\", price: $price) { product { id } } }",
            json!({ "price": "92233720368547758.07" }),
        )
        .await?;
        assert_eq!(errors, vec!["Price is too large".to_string()], "{backend}");

        let customer = create_customer(&schema, "Alice", "alice@example.com", None).await?;
        let yacht = create_product(&schema, "Yacht", max_price, 1).await?;
        let island = create_product(&schema, "Island", max_price, 1).await?;

        let (_, errors) = create_order(&schema, &customer, &[&yacht, &island]).await?;
        assert_eq!(errors, vec!["Amount is too large".to_string()], "{backend}");

        let (data, errors) = execute(&schema, "{ crmReport { totalOrders totalRevenue } }", json!({})).await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        assert_eq!(data["crmReport"]["totalOrders"], 0, "{backend}");

        let (data, errors) = create_order(&schema, &customer, &[&yacht]).await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        assert_eq!(data["createOrder"]["order"]["totalAmount"], max_price, "{backend}");
        let (data, _) = execute(&schema, "{ crmReport { totalRevenue } }", json!({})).await?;
        assert_eq!(data["crmReport"]["totalRevenue"], max_price, "{backend}");

        // two maximal orders no longer fit in the revenue total
        create_order(&schema, &customer, &[&island]).await?;
        let (_, errors) = execute(&schema, "{ crmReport { totalRevenue } }", json!({})).await?;
        assert_eq!(errors, vec!["Amount is too large".to_string()], "{backend}");

        let (data, errors) = execute(&schema, "{ allOrders { totalCount } customers { name } }", json!({})).await?;
        assert!(errors.is_empty(), "{backend}: {errors:?}");
        assert_eq!(data["allOrders"]["totalCount"], 2, "{backend}");
        assert_eq!(data["customers"], json!([{ "name": "Alice" }]), "{backend}");
    }
    Ok(())
}

#[tokio::test]
async fn out_of_range_filter_bounds_clamp() -> Result<()> {
    let huge = "79228162514264337593543950335";
    let huge_negative = "-79228162514264337593543950335";
    for (backend, schema) in backends()? {
        let customer = create_customer(&schema, "Alice", "alice@example.com", None).await?;
        let pen = create_product(&schema, "Pen", "1.25", 10).await?;
        create_product(&schema, "Pad", "3.50", 10).await?;
        create_order(&schema, &customer, &[&pen]).await?;

        for (filter, expected) in [
            (json!({ "priceGte": huge }), 0),
            (json!({ "priceLte": huge }), 2),
            (json!({ "priceGte": huge_negative }), 2),
            (json!({ "priceLte": huge_negative }), 0),
            (json!({ "priceGte": "100000000000000000" }), 0),
        ] {
            let (data, errors) = execute(
                &schema,
                "query($filter: ProductFilterInput) { allProducts(filter: $filter) { totalCount } }",
                json!({ "filter": filter }),
            )
            .await?;
            assert!(errors.is_empty(), "{backend}: {errors:?}");
            assert_eq!(data["allProducts"]["totalCount"], expected, "{backend}: {filter}");
        }

        for (filter, expected) in [
            (json!({ "totalAmountGte": huge }), 0),
            (json!({ "totalAmountLte": huge }), 1),
        ] {
            let (data, errors) = execute(
                &schema,
                "query($filter: OrderFilterInput) { allOrders(filter: $filter) { totalCount } }",
                json!({ "filter": filter }),
            )
            .await?;
            assert!(errors.is_empty(), "{backend}: {errors:?}");
            assert_eq!(data["allOrders"]["totalCount"], expected, "{backend}: {filter}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn case_insensitive_matching_folds_ascii_only() -> Result<()> {
    for (backend, schema) in backends()? {
        create_customer(&schema, "ÉLODIE", "elodie@example.com", None).await?;
        create_customer(&schema, "Zoé", "élo@example.com", None).await?;
        create_customer(&schema, "Zoë", "ÉLO@example.com", None).await?;

        for (needle, expected) in [("élodie", 0), ("LODIE", 1), ("lodie", 1), ("zo", 2)] {
            let (data, errors) = execute(
                &schema,
                "query($needle: String) { allCustomers(filter: { nameIcontains: $needle }) { totalCount } }",
                json!({ "needle": needle }),
            )
            .await?;
            assert!(errors.is_empty(), "{backend}: {errors:?}");
            assert_eq!(data["allCustomers"]["totalCount"], expected, "{backend}: {needle}");
        }

        let (_, errors) = execute(
            &schema,
            r#"mutation { createCustomer(name: "Dup", email: "élo@EXAMPLE.COM") { customer { id } } }"#,
            json!({}),
        )
        .await?;
        assert_eq!(errors, vec!["Email already exists".to_string()], "{backend}");
    }
    Ok(())
}
