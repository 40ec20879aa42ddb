pub mod rest;
pub mod tls;
pub mod ws;
