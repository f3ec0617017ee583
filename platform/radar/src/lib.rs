pub mod api;
pub mod collection;
pub mod config;
pub mod database;
pub mod engine;
pub mod events;
pub mod global;
pub mod listing;
pub mod store;

#[cfg(test)]
mod tests;
