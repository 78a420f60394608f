pub mod trade_history;
