pub mod factory;
pub mod local;
pub mod provider;
pub mod static_key;
