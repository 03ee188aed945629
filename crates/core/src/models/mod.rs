pub mod company;
pub mod currency;
pub mod ledger;
pub mod price;
pub mod purchase;
pub mod settings;
pub mod valuation;
