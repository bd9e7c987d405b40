pub mod connection;
pub mod models;
pub mod repos;
pub mod schema;

#[cfg(test)]
pub mod testing;
