pub mod client;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
