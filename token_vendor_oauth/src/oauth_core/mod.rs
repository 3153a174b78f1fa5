pub mod config;
pub mod flow;
pub mod gateway;
pub mod http_client;
pub mod pkce;
pub mod sink;
pub mod types;
