pub mod counter;
pub mod key_value_store;
