pub mod currency_service;
pub mod history_service;
pub mod ledger_service;
pub mod market_data_service;
pub mod valuation_service;
