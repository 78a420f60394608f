pub mod archive;
pub mod binance;
