pub mod order;
pub mod order_item;
pub mod order_log;
pub mod promo_code;
