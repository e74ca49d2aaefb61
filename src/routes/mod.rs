pub mod account;
pub mod event;
pub mod health;
pub mod session;
