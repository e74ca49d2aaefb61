pub mod account;
pub mod bill;
pub mod requests;
pub mod responses;
pub mod session;
pub mod types;
