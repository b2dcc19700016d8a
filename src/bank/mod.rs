//! Bank Adapter Registry: rule-based parsers over known bank-statement
//! layouts.

pub mod adapter;
pub mod adapters;
pub mod registry;

pub use adapter::{AccountIdentity, BankAdapter, BankAdapterError};
pub use registry::BankAdapterRegistry;
