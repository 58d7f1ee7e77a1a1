//! FIX 4.4 market-data ingestion: a persistent upstream session feeding
//! a durable tick store, rolling OHLC candles and a hot cache mirror.

pub mod config;
pub mod constants;
pub mod daemon;
pub mod error;
pub mod fix;
pub mod models;
pub mod services;
pub mod worker;
