// HTTP read surface for stored case prices.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
