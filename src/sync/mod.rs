pub mod importer;

pub use importer::{import_orders, order_to_trade_input};
