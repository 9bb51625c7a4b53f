pub mod button;
pub mod config;
pub mod display;
pub mod error;
pub mod identity_store;
pub mod panel;
pub mod power;
pub mod scheduler;
pub mod service;
pub mod signals;
