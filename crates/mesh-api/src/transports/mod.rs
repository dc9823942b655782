// Transport adapters

pub mod http;
