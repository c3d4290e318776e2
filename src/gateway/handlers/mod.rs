pub mod account;
pub mod admin;
pub mod funding;
pub mod order;
pub mod rates;
