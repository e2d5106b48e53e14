pub mod call;
pub mod check;
pub mod config;
