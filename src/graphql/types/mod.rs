pub mod connection;
pub mod customer;
pub mod inputs;
pub mod order;
pub mod payloads;
pub mod product;

pub use connection::TotalCount;
pub use customer::Customer;
pub use inputs::{BulkCustomerInput, CustomerFilterInput, OrderFilterInput, ProductFilterInput};
pub use order::Order;
pub use payloads::{
    BulkCreateCustomersPayload, CreateCustomerPayload, CreateOrderPayload, CreateProductPayload,
    CrmReport,
};
pub use product::Product;
