//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod history;
pub mod reporting;
pub mod sales;
pub mod stock;
pub mod suppliers;

pub use auth::{login, logout, me, register};
pub use health::health_check;
pub use history::{bulk_delete_history, delete_history_entry, list_history};
pub use reporting::{export_stock_csv, get_dashboard, get_low_stock};
pub use sales::{delete_sale, list_sales, pos_overview, record_sale};
pub use stock::{
    create_stock_item, delete_stock_image, delete_stock_item, get_product_price, get_stock_item,
    issue_stock, list_stock, receive_stock, set_reorder_level, update_stock_item,
    upload_stock_image,
};
pub use suppliers::{
    create_supplier, delete_supplier, get_supplier, list_brands, list_suppliers, update_supplier,
};
