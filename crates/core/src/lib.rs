pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use std::path::PathBuf;

use errors::CoreError;
use models::{
    company::CompanyProfile,
    ledger::Ledger,
    price::{PricePoint, Quote},
    purchase::{PurchaseRecord, PurchaseRequest},
    settings::Settings,
    valuation::{FxRates, Holdings, ValuationSnapshot},
};
use providers::registry::ProviderRegistry;
use services::{
    currency_service::CurrencyService,
    history_service::HistoryService,
    ledger_service::LedgerService,
    market_data_service::MarketDataService,
    valuation_service::{self, ValuationService},
};
use storage::{format, layout::StorageLayout, manager::StorageManager};

/// Main entry point for the Stock Ledger core library.
///
/// One tracker per ticker. It owns the in-memory ledger and wires the
/// ledger, the market-data providers and the valuation model together;
/// none of those know about each other.
#[must_use]
pub struct StockTracker {
    ticker: String,
    settings: Settings,
    layout: StorageLayout,
    ledger: Ledger,
    ledger_service: LedgerService,
    market: MarketDataService,
    currency_service: CurrencyService,
    valuation_service: ValuationService,
    history_service: HistoryService,
}

impl std::fmt::Debug for StockTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockTracker")
            .field("ticker", &self.ticker)
            .field("records", &self.ledger.len())
            .field("base_directory", &self.layout.base_directory())
            .field("display_currency", &self.settings.display_currency)
            .finish()
    }
}

impl StockTracker {
    /// Open (or start) the ledger of `ticker` with the default providers.
    ///
    /// Creates the ticker directory if needed, then loads the ledger.
    pub fn open(ticker: &str, settings: Settings) -> Result<Self, CoreError> {
        let registry = ProviderRegistry::new_with_defaults(&settings, ticker);
        Self::open_with_registry(ticker, settings, registry)
    }

    /// Like `open`, with caller-supplied providers.
    pub fn open_with_registry(
        ticker: &str,
        settings: Settings,
        registry: ProviderRegistry,
    ) -> Result<Self, CoreError> {
        let ticker = storage::layout::normalize_ticker(ticker)?;
        let layout = StorageLayout::new(settings.resolved_base_directory()?);

        // One-time setup, before any ledger operation
        layout.ensure_ticker_dir(&ticker)?;

        let ledger_service = LedgerService::new(layout.clone());
        let ledger = ledger_service.load_ledger(&ticker)?;
        tracing::debug!(ticker = %ticker, records = ledger.len(), "ledger opened");

        Ok(Self {
            ticker,
            settings,
            history_service: HistoryService::new(layout.clone()),
            layout,
            ledger,
            ledger_service,
            market: MarketDataService::new(registry),
            currency_service: CurrencyService::new(),
            valuation_service: ValuationService::new(),
        })
    }

    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    // ── Purchase Ledger ─────────────────────────────────────────────

    /// Record a purchase and persist the ledger before returning.
    ///
    /// When only the quantity is known, the unit price is the ticker's
    /// closing price on the purchase date.
    pub async fn record_purchase(
        &mut self,
        request: PurchaseRequest,
    ) -> Result<PurchaseRecord, CoreError> {
        let today = chrono::Local::now().date_naive();

        // Validate the cheap parts before touching the network
        if request.date > today {
            return Err(CoreError::ValidationError(format!(
                "Purchase date {} is in the future",
                request.date
            )));
        }

        let close = if request.needs_historical_close() {
            Some(self.market.historical_close(&self.ticker, request.date).await?)
        } else {
            None
        };

        self.ledger_service.record_purchase(
            &mut self.ledger,
            &request,
            close.as_ref(),
            &self.settings.display_currency,
            today,
        )
    }

    /// Re-read the ledger from disk and return its records, oldest first.
    pub fn load_ledger(&mut self) -> Result<Vec<PurchaseRecord>, CoreError> {
        self.ledger = self.ledger_service.load_ledger(&self.ticker)?;
        Ok(self.ledger.records().to_vec())
    }

    /// Records currently in memory, oldest first.
    #[must_use]
    pub fn records(&self) -> &[PurchaseRecord] {
        self.ledger.records()
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Total shares and cost in the display currency.
    /// Fetches FX rates only for purchases made in another currency.
    pub async fn current_holdings(&self) -> Result<Holdings, CoreError> {
        let fx = self.collect_rates(None).await?;
        self.valuation_service
            .current_holdings(self.ledger.records(), &fx, self.settings.fx_policy)
    }

    /// Current price of the ticker, in the currency it is quoted in.
    pub async fn current_price(&self) -> Result<Quote, CoreError> {
        self.market.current_price(&self.ticker).await
    }

    /// Holdings valued at the current market price.
    pub async fn valuation_snapshot(&self) -> Result<ValuationSnapshot, CoreError> {
        let quote = self.current_price().await?;
        let fx = self.collect_rates(Some(&quote.currency)).await?;
        self.valuation_service.valuation_snapshot(
            self.ledger.records(),
            &quote,
            &fx,
            self.settings.fx_policy,
        )
    }

    /// Whether the current price is at least `discount_threshold` (a
    /// fraction in `[0, 1)`) below the average purchase price.
    pub async fn is_current_price_avg_discount(
        &self,
        discount_threshold: f64,
    ) -> Result<bool, CoreError> {
        valuation_service::validate_threshold(discount_threshold)?;

        let quote = self.current_price().await?;
        let fx = self.collect_rates(Some(&quote.currency)).await?;
        self.valuation_service.is_discount_to_average(
            self.ledger.records(),
            &quote,
            &fx,
            self.settings.fx_policy,
            discount_threshold,
        )
    }

    async fn collect_rates(&self, quote_currency: Option<&str>) -> Result<FxRates, CoreError> {
        self.currency_service
            .collect_rates(
                &self.market,
                self.ledger.records(),
                quote_currency,
                &self.settings.display_currency,
                self.settings.fx_policy,
            )
            .await
    }

    // ── Company Profile ─────────────────────────────────────────────

    /// The company profile, from disk unless `refresh` is set or nothing
    /// was saved yet; freshly fetched profiles are saved.
    pub async fn company_profile(&self, refresh: bool) -> Result<CompanyProfile, CoreError> {
        let path = self.layout.profile_path(&self.ticker)?;
        if !refresh {
            if let Some(saved) = StorageManager::load_profile(&path)? {
                return Ok(saved);
            }
        }

        let profile = self.market.company_profile(&self.ticker).await?;
        StorageManager::save_profile(&path, &profile)?;
        tracing::info!(ticker = %self.ticker, "company profile saved");
        Ok(profile)
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Fetch daily closes for `[from, to]` and write them to `history.csv`.
    pub async fn export_price_history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(PathBuf, Vec<PricePoint>), CoreError> {
        self.history_service
            .export_price_history(&self.market, &self.ticker, from, to)
            .await
    }

    /// All purchases as CSV: `date,quantity,unit_price,currency,total`.
    #[must_use]
    pub fn export_purchases_csv(&self) -> String {
        format::encode_purchases_csv(self.ledger.records())
    }

    /// All purchases in the ledger file format.
    pub fn export_purchases_json(&self) -> Result<String, CoreError> {
        let bytes = format::encode_ledger(self.ledger.records())?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Serialization(format!("Ledger is not UTF-8: {e}")))
    }

    // ── Provider Availability ───────────────────────────────────────

    /// Names of the market-data providers, in fallback order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.market.market_provider_names()
    }
}
