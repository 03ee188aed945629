// ═══════════════════════════════════════════════════════════════════
// Service Tests: LedgerService, ValuationService, CurrencyService,
// MarketDataService, HistoryService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use stock_ledger_core::errors::{CoreError, ErrorKind};
use stock_ledger_core::models::company::CompanyProfile;
use stock_ledger_core::models::ledger::Ledger;
use stock_ledger_core::models::price::{PricePoint, Quote};
use stock_ledger_core::models::purchase::{PurchaseRecord, PurchaseRequest};
use stock_ledger_core::models::valuation::{FxPolicy, FxRates, Holdings};
use stock_ledger_core::providers::registry::ProviderRegistry;
use stock_ledger_core::providers::traits::{FxRateProvider, MarketDataProvider};
use stock_ledger_core::services::currency_service::CurrencyService;
use stock_ledger_core::services::history_service::{self, HistoryService};
use stock_ledger_core::services::ledger_service::{resolve_purchase, LedgerService};
use stock_ledger_core::services::market_data_service::MarketDataService;
use stock_ledger_core::services::valuation_service::{validate_threshold, ValuationService};
use stock_ledger_core::storage::layout::StorageLayout;
use stock_ledger_core::storage::manager::StorageManager;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 1)
}

// ═══════════════════════════════════════════════════════════════════
// Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// Market data from fixed tables. `fail` makes every call error out.
struct MockMarket {
    name: &'static str,
    current: Option<Quote>,
    closes: HashMap<NaiveDate, Quote>,
    history: Vec<PricePoint>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockMarket {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            current: None,
            closes: HashMap::new(),
            history: Vec::new(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    fn with_current(mut self, price: f64, currency: &str) -> Self {
        self.current = Some(Quote::new(price, currency));
        self
    }

    fn with_close(mut self, on: NaiveDate, price: f64, currency: &str) -> Self {
        self.closes.insert(on, Quote::new(price, currency));
        self
    }

    fn with_history(mut self, points: Vec<PricePoint>) -> Self {
        self.history = points;
        self
    }

    fn error(&self, what: &str) -> CoreError {
        CoreError::ProviderError {
            provider: self.name.to_string(),
            message: format!("{what} unavailable"),
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    fn name(&self) -> &str {
        self.name
    }

    async fn get_current_price(&self, _symbol: &str) -> Result<Quote, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(self.error("current price"));
        }
        self.current.clone().ok_or_else(|| self.error("current price"))
    }

    async fn get_historical_close(
        &self,
        _symbol: &str,
        date: NaiveDate,
    ) -> Result<Quote, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(self.error("close"));
        }
        self.closes.get(&date).cloned().ok_or_else(|| self.error("close"))
    }

    async fn get_price_history(
        &self,
        _symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(self.error("history"));
        }
        Ok(self
            .history
            .iter()
            .filter(|p| p.date >= from && p.date <= to)
            .cloned()
            .collect())
    }

    async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(self.error("profile"));
        }
        Ok(CompanyProfile {
            symbol: symbol.to_string(),
            short_name: Some(format!("{symbol} Inc.")),
            long_name: None,
            exchange: None,
            quote_type: Some("EQUITY".into()),
            fetched_on: today(),
        })
    }
}

/// FX rates keyed by (from, date); `None` date is the spot rate.
struct MockFx {
    rates: HashMap<(String, Option<NaiveDate>), f64>,
    calls: Arc<AtomicUsize>,
}

impl MockFx {
    fn new() -> Self {
        Self {
            rates: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_rate(mut self, from: &str, on: Option<NaiveDate>, rate: f64) -> Self {
        self.rates.insert((from.to_string(), on), rate);
        self
    }
}

#[async_trait]
impl FxRateProvider for MockFx {
    fn name(&self) -> &str {
        "MockFx"
    }

    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<f64, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rates
            .get(&(from.to_string(), date))
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: from.to_string(),
                currency: to.to_string(),
                date: date.map_or_else(|| "latest".into(), |d| d.to_string()),
            })
    }
}

fn market_with(providers: Vec<MockMarket>, fx: Option<MockFx>) -> MarketDataService {
    let mut registry = ProviderRegistry::new();
    for p in providers {
        registry.register_market(Box::new(p));
    }
    if let Some(fx) = fx {
        registry.register_fx(Box::new(fx));
    }
    MarketDataService::new(registry)
}

// ═══════════════════════════════════════════════════════════════════
// resolve_purchase: derivation rules
// ═══════════════════════════════════════════════════════════════════

mod resolve {
    use super::*;

    fn req() -> PurchaseRequest {
        PurchaseRequest::new(date(2024, 1, 10))
    }

    #[test]
    fn quantity_and_price() {
        let r = resolve_purchase(&req().with_quantity(10.0).with_unit_price(100.0), None, "USD", today())
            .unwrap();
        assert_eq!(r.quantity, 10.0);
        assert_eq!(r.unit_price, 100.0);
        assert_eq!(r.currency, "USD");
        assert_eq!(r.date, date(2024, 1, 10));
    }

    #[test]
    fn quantity_and_total_derives_price() {
        let r = resolve_purchase(&req().with_quantity(4.0).with_total_paid(500.0), None, "ZAR", today())
            .unwrap();
        assert_eq!(r.unit_price, 125.0);
        assert_eq!(r.currency, "ZAR");
    }

    #[test]
    fn price_and_total_derives_quantity() {
        let r = resolve_purchase(&req().with_unit_price(250.0).with_total_paid(1000.0), None, "ZAR", today())
            .unwrap();
        assert_eq!(r.quantity, 4.0);
    }

    #[test]
    fn derived_values_reproduce_the_total() {
        let total = 1000.0;
        let r = resolve_purchase(&req().with_quantity(3.0).with_total_paid(total), None, "USD", today())
            .unwrap();
        assert!((r.total_paid() - total).abs() <= total * 1e-6);

        let r = resolve_purchase(&req().with_unit_price(7.0).with_total_paid(total), None, "USD", today())
            .unwrap();
        assert!((r.total_paid() - total).abs() <= total * 1e-6);
    }

    #[test]
    fn consistent_total_is_accepted() {
        let r = resolve_purchase(
            &req().with_quantity(3.0).with_unit_price(33.3333).with_total_paid(100.0),
            None,
            "USD",
            today(),
        )
        .unwrap();
        assert_eq!(r.unit_price, 33.3333);
    }

    #[test]
    fn inconsistent_total_is_rejected() {
        let err = resolve_purchase(
            &req().with_quantity(10.0).with_unit_price(100.0).with_total_paid(900.0),
            None,
            "USD",
            today(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn quantity_only_uses_historical_close() {
        let close = Quote::new(18.75, "usd");
        let r = resolve_purchase(&req().with_quantity(2.0), Some(&close), "ZAR", today()).unwrap();
        assert_eq!(r.unit_price, 18.75);
        assert_eq!(r.currency, "USD");
    }

    #[test]
    fn quantity_only_without_close_is_rejected() {
        let err = resolve_purchase(&req().with_quantity(2.0), None, "ZAR", today()).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn close_currency_must_match_requested_currency() {
        let close = Quote::new(18.75, "USD");
        let err = resolve_purchase(
            &req().with_quantity(2.0).with_currency("EUR"),
            Some(&close),
            "ZAR",
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("EUR")));
    }

    #[test]
    fn price_only_is_rejected() {
        assert!(resolve_purchase(&req().with_unit_price(10.0), None, "USD", today()).is_err());
    }

    #[test]
    fn total_only_is_ambiguous() {
        let err = resolve_purchase(&req().with_total_paid(10.0), None, "USD", today()).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("Ambiguous")));
    }

    #[test]
    fn nothing_given_is_ambiguous() {
        assert!(resolve_purchase(&req(), None, "USD", today()).is_err());
    }

    #[test]
    fn non_positive_values_are_rejected() {
        for request in [
            req().with_quantity(0.0).with_unit_price(10.0),
            req().with_quantity(-1.0).with_unit_price(10.0),
            req().with_quantity(1.0).with_unit_price(0.0),
            req().with_quantity(1.0).with_total_paid(-5.0),
            req().with_quantity(f64::NAN).with_unit_price(1.0),
        ] {
            let err = resolve_purchase(&request, None, "USD", today()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{request:?}");
        }
    }

    #[test]
    fn future_date_is_rejected() {
        let request = PurchaseRequest::new(date(2024, 6, 2))
            .with_quantity(1.0)
            .with_unit_price(1.0);
        assert!(resolve_purchase(&request, None, "USD", today()).is_err());
    }

    #[test]
    fn explicit_currency_wins_over_display_currency() {
        let r = resolve_purchase(
            &req().with_quantity(1.0).with_unit_price(1.0).with_currency("eur"),
            None,
            "ZAR",
            today(),
        )
        .unwrap();
        assert_eq!(r.currency, "EUR");
    }

    #[test]
    fn invalid_currency_is_rejected() {
        let request = req().with_quantity(1.0).with_unit_price(1.0).with_currency("EURO");
        assert!(resolve_purchase(&request, None, "ZAR", today()).is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// LedgerService: recording and loading
// ═══════════════════════════════════════════════════════════════════

mod ledger_service {
    use super::*;

    fn service(dir: &TempDir) -> LedgerService {
        let layout = StorageLayout::new(dir.path());
        layout.ensure_ticker_dir("AAPL").unwrap();
        LedgerService::new(layout)
    }

    #[test]
    fn record_then_load() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let mut ledger = service.load_ledger("AAPL").unwrap();
        assert!(ledger.is_empty());

        let request = PurchaseRequest::new(date(2024, 1, 10))
            .with_quantity(10.0)
            .with_unit_price(100.0)
            .with_currency("USD");
        service
            .record_purchase(&mut ledger, &request, None, "ZAR", today())
            .unwrap();

        let loaded = service.load_ledger("AAPL").unwrap();
        assert_eq!(loaded.records(), &[PurchaseRecord::new(date(2024, 1, 10), 10.0, 100.0, "USD")]);
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn records_keep_insertion_order() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let mut ledger = service.load_ledger("AAPL").unwrap();

        for (d, q) in [(date(2024, 3, 1), 1.0), (date(2024, 1, 1), 2.0), (date(2024, 2, 1), 3.0)] {
            let request = PurchaseRequest::new(d).with_quantity(q).with_unit_price(10.0);
            service
                .record_purchase(&mut ledger, &request, None, "USD", today())
                .unwrap();
        }

        let quantities: Vec<f64> = service
            .load_ledger("AAPL")
            .unwrap()
            .records()
            .iter()
            .map(|r| r.quantity)
            .collect();
        assert_eq!(quantities, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn load_twice_is_identical() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let mut ledger = service.load_ledger("AAPL").unwrap();
        let request = PurchaseRequest::new(date(2024, 1, 10))
            .with_quantity(3.0)
            .with_total_paid(1000.0);
        service
            .record_purchase(&mut ledger, &request, None, "USD", today())
            .unwrap();

        assert_eq!(service.load_ledger("AAPL").unwrap(), service.load_ledger("AAPL").unwrap());
    }

    #[test]
    fn invalid_request_leaves_ledger_untouched() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let mut ledger = service.load_ledger("AAPL").unwrap();

        let request = PurchaseRequest::new(date(2024, 1, 10)).with_quantity(-1.0);
        assert!(service
            .record_purchase(&mut ledger, &request, None, "USD", today())
            .is_err());
        assert!(ledger.is_empty());
        assert!(!service.layout().ledger_path("AAPL").unwrap().exists());
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        // Ticker directory never created: the write has nowhere to go
        let service = LedgerService::new(StorageLayout::new(dir.path()));
        let mut ledger = Ledger::new("MSFT");

        let request = PurchaseRequest::new(date(2024, 1, 10))
            .with_quantity(1.0)
            .with_unit_price(1.0);
        let err = service
            .record_purchase(&mut ledger, &request, None, "USD", today())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(ledger.is_empty());
    }

    #[test]
    fn corrupt_ledger_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let path = service.layout().ledger_path("AAPL").unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            service.load_ledger("AAPL"),
            Err(CoreError::StorageError(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// ValuationService
// ═══════════════════════════════════════════════════════════════════

mod valuation_service {
    use super::*;

    fn usd_records() -> Vec<PurchaseRecord> {
        vec![
            PurchaseRecord::new(date(2024, 1, 10), 4.0, 100.0, "USD"),
            PurchaseRecord::new(date(2024, 2, 10), 6.0, 100.0, "USD"),
        ]
    }

    #[test]
    fn holdings_sum_shares_and_cost() {
        let h = ValuationService::new()
            .current_holdings(&usd_records(), &FxRates::new("USD"), FxPolicy::PurchaseDate)
            .unwrap();
        assert_eq!(
            h,
            Holdings {
                total_shares: 10.0,
                total_cost: 1000.0,
                currency: "USD".into()
            }
        );
    }

    #[test]
    fn empty_ledger_holds_nothing() {
        let h = ValuationService::new()
            .current_holdings(&[], &FxRates::new("ZAR"), FxPolicy::PurchaseDate)
            .unwrap();
        assert_eq!(h.total_shares, 0.0);
        assert_eq!(h.total_cost, 0.0);
    }

    #[test]
    fn snapshot_of_ten_shares_at_150() {
        let s = ValuationService::new()
            .valuation_snapshot(
                &usd_records(),
                &Quote::new(150.0, "USD"),
                &FxRates::new("USD"),
                FxPolicy::PurchaseDate,
            )
            .unwrap();
        assert_eq!(s.total_shares, 10.0);
        assert_eq!(s.total_cost, 1000.0);
        assert_eq!(s.current_value, 1500.0);
        assert_eq!(s.roi().unwrap(), 0.5);
    }

    #[test]
    fn snapshot_of_empty_ledger_has_no_roi() {
        let s = ValuationService::new()
            .valuation_snapshot(&[], &Quote::new(150.0, "USD"), &FxRates::new("USD"), FxPolicy::Spot)
            .unwrap();
        assert_eq!(s.current_value, 0.0);
        assert!(matches!(s.roi(), Err(CoreError::InsufficientData(_))));
    }

    #[test]
    fn discount_detected() {
        // average 100, price 80, threshold 15%: 80 <= 85
        let discounted = ValuationService::new()
            .is_discount_to_average(
                &usd_records(),
                &Quote::new(80.0, "USD"),
                &FxRates::new("USD"),
                FxPolicy::PurchaseDate,
                0.15,
            )
            .unwrap();
        assert!(discounted);
    }

    #[test]
    fn no_discount_above_threshold_price() {
        let discounted = ValuationService::new()
            .is_discount_to_average(
                &usd_records(),
                &Quote::new(90.0, "USD"),
                &FxRates::new("USD"),
                FxPolicy::PurchaseDate,
                0.15,
            )
            .unwrap();
        assert!(!discounted);
    }

    #[test]
    fn zero_threshold_accepts_price_at_average() {
        let discounted = ValuationService::new()
            .is_discount_to_average(
                &usd_records(),
                &Quote::new(100.0, "USD"),
                &FxRates::new("USD"),
                FxPolicy::PurchaseDate,
                0.0,
            )
            .unwrap();
        assert!(discounted);
    }

    #[test]
    fn discount_on_empty_ledger_is_insufficient_data() {
        let err = ValuationService::new()
            .is_discount_to_average(
                &[],
                &Quote::new(80.0, "USD"),
                &FxRates::new("USD"),
                FxPolicy::PurchaseDate,
                0.15,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn threshold_bounds() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(0.999).is_ok());
        for bad in [1.0, 1.5, -0.1, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(validate_threshold(bad), Err(CoreError::ValidationError(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn cost_converted_at_purchase_date_rate() {
        let records = vec![
            PurchaseRecord::new(date(2024, 1, 10), 1.0, 100.0, "USD"),
            PurchaseRecord::new(date(2024, 2, 10), 1.0, 100.0, "USD"),
        ];
        let fx = FxRates::new("ZAR")
            .with_historical("USD", date(2024, 1, 10), 18.0)
            .with_historical("USD", date(2024, 2, 10), 19.0)
            .with_spot("USD", 20.0);

        let by_date = ValuationService::new()
            .current_holdings(&records, &fx, FxPolicy::PurchaseDate)
            .unwrap();
        assert_eq!(by_date.total_cost, 3700.0);
        assert_eq!(by_date.currency, "ZAR");

        let at_spot = ValuationService::new()
            .current_holdings(&records, &fx, FxPolicy::Spot)
            .unwrap();
        assert_eq!(at_spot.total_cost, 4000.0);
    }

    #[test]
    fn current_price_converted_at_spot() {
        let records = vec![PurchaseRecord::new(date(2024, 1, 10), 2.0, 1800.0, "ZAR")];
        let fx = FxRates::new("ZAR").with_spot("USD", 20.0);
        let s = ValuationService::new()
            .valuation_snapshot(&records, &Quote::new(100.0, "USD"), &fx, FxPolicy::PurchaseDate)
            .unwrap();
        assert_eq!(s.current_price, 2000.0);
        assert_eq!(s.current_value, 4000.0);
    }

    #[test]
    fn missing_rate_is_reported_not_guessed() {
        let records = vec![PurchaseRecord::new(date(2024, 1, 10), 1.0, 100.0, "EUR")];
        let err = ValuationService::new()
            .current_holdings(&records, &FxRates::new("ZAR"), FxPolicy::PurchaseDate)
            .unwrap_err();
        assert!(matches!(err, CoreError::PriceNotAvailable { .. }));
    }
}

// ═══════════════════════════════════════════════════════════════════
// MarketDataService: fallback
// ═══════════════════════════════════════════════════════════════════

mod market_data {
    use super::*;

    #[tokio::test]
    async fn no_providers() {
        let market = market_with(vec![], None);
        assert!(matches!(
            market.current_price("AAPL").await,
            Err(CoreError::NoProvider(_))
        ));
        assert!(matches!(
            market.fx_rate("USD", "ZAR", None).await,
            Err(CoreError::NoProvider(_))
        ));
    }

    #[tokio::test]
    async fn falls_back_to_next_provider() {
        let first = MockMarket::failing("first");
        let first_calls = first.calls.clone();
        let second = MockMarket::new("second").with_current(150.0, "USD");

        let market = market_with(vec![first, second], None);
        let quote = market.current_price("AAPL").await.unwrap();
        assert_eq!(quote, Quote::new(150.0, "USD"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let market = market_with(vec![MockMarket::failing("a"), MockMarket::failing("b")], None);
        match market.current_price("AAPL").await {
            Err(CoreError::ProviderError { provider, .. }) => assert_eq!(provider, "b"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_positive_quote_is_skipped() {
        let bad = MockMarket::new("bad").with_current(0.0, "USD");
        let good = MockMarket::new("good").with_current(12.0, "USD");
        let market = market_with(vec![bad, good], None);
        assert_eq!(market.current_price("X").await.unwrap().price, 12.0);
    }

    #[tokio::test]
    async fn history_drops_unpriced_rows() {
        let provider = MockMarket::new("p").with_history(vec![
            PricePoint { date: date(2024, 1, 2), price: 10.0 },
            PricePoint { date: date(2024, 1, 3), price: f64::NAN },
            PricePoint { date: date(2024, 1, 4), price: 11.0 },
        ]);
        let market = market_with(vec![provider], None);
        let points = market
            .price_history("X", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn same_currency_fx_skips_providers() {
        let fx = MockFx::new();
        let calls = fx.calls.clone();
        let market = market_with(vec![], Some(fx));
        assert_eq!(market.fx_rate("usd", "USD", None).await.unwrap(), 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_names_in_order() {
        let market = market_with(vec![MockMarket::new("x"), MockMarket::new("y")], None);
        assert_eq!(market.market_provider_names(), vec!["x", "y"]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// CurrencyService: which rates get fetched
// ═══════════════════════════════════════════════════════════════════

mod currency_service {
    use super::*;

    #[tokio::test]
    async fn single_currency_ledger_fetches_nothing() {
        let fx = MockFx::new();
        let calls = fx.calls.clone();
        let market = market_with(vec![], Some(fx));
        let records = vec![PurchaseRecord::new(date(2024, 1, 10), 1.0, 10.0, "ZAR")];

        let rates = CurrencyService::new()
            .collect_rates(&market, &records, Some("ZAR"), "ZAR", FxPolicy::PurchaseDate)
            .await
            .unwrap();
        assert_eq!(rates.display_currency(), "ZAR");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn purchase_date_policy_fetches_each_date_once() {
        let d1 = date(2024, 1, 10);
        let d2 = date(2024, 2, 10);
        let fx = MockFx::new()
            .with_rate("USD", Some(d1), 18.0)
            .with_rate("USD", Some(d2), 19.0)
            .with_rate("USD", None, 20.0);
        let calls = fx.calls.clone();
        let market = market_with(vec![], Some(fx));
        let records = vec![
            PurchaseRecord::new(d1, 1.0, 10.0, "USD"),
            PurchaseRecord::new(d1, 2.0, 10.0, "USD"),
            PurchaseRecord::new(d2, 1.0, 10.0, "USD"),
        ];

        let rates = CurrencyService::new()
            .collect_rates(&market, &records, Some("USD"), "ZAR", FxPolicy::PurchaseDate)
            .await
            .unwrap();
        assert_eq!(rates.historical_rate("USD", d1).unwrap(), 18.0);
        assert_eq!(rates.historical_rate("USD", d2).unwrap(), 19.0);
        assert_eq!(rates.spot_rate("USD").unwrap(), 20.0);
        // two dates plus one spot
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn spot_policy_fetches_one_rate_per_currency() {
        let fx = MockFx::new()
            .with_rate("USD", None, 20.0)
            .with_rate("EUR", None, 21.0);
        let calls = fx.calls.clone();
        let market = market_with(vec![], Some(fx));
        let records = vec![
            PurchaseRecord::new(date(2024, 1, 10), 1.0, 10.0, "USD"),
            PurchaseRecord::new(date(2024, 2, 10), 1.0, 10.0, "USD"),
            PurchaseRecord::new(date(2024, 3, 10), 1.0, 10.0, "EUR"),
        ];

        let rates = CurrencyService::new()
            .collect_rates(&market, &records, Some("USD"), "ZAR", FxPolicy::Spot)
            .await
            .unwrap();
        assert_eq!(rates.spot_rate("EUR").unwrap(), 21.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_rate_propagates() {
        let market = market_with(vec![], Some(MockFx::new()));
        let records = vec![PurchaseRecord::new(date(2024, 1, 10), 1.0, 10.0, "USD")];
        let err = CurrencyService::new()
            .collect_rates(&market, &records, None, "ZAR", FxPolicy::PurchaseDate)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
    }
}

// ═══════════════════════════════════════════════════════════════════
// HistoryService
// ═══════════════════════════════════════════════════════════════════

mod history {
    use super::*;

    #[tokio::test]
    async fn export_writes_csv() {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure_ticker_dir("AAPL").unwrap();

        let market = market_with(
            vec![MockMarket::new("p").with_history(vec![
                PricePoint { date: date(2024, 1, 2), price: 185.5 },
                PricePoint { date: date(2024, 1, 3), price: 184.25 },
            ])],
            None,
        );
        let (path, points) = HistoryService::new(layout.clone())
            .export_price_history(&market, "AAPL", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap();

        assert_eq!(path, layout.history_path("AAPL").unwrap());
        assert_eq!(points.len(), 2);
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv, "date,close\n2024-01-02,185.5\n2024-01-03,184.25\n");
    }

    #[tokio::test]
    async fn reversed_range_is_rejected_before_fetching() {
        let dir = TempDir::new().unwrap();
        let provider = MockMarket::new("p");
        let calls = provider.calls.clone();
        let market = market_with(vec![provider], None);

        let err = HistoryService::new(StorageLayout::new(dir.path()))
            .export_price_history(&market, "AAPL", date(2024, 2, 1), date(2024, 1, 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn range_limit() {
        assert!(history_service::validate_range(date(2014, 1, 1), date(2023, 12, 1)).is_ok());
        assert!(history_service::validate_range(date(2010, 1, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn history_file_is_plain_csv_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        StorageManager::save_price_history(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "date,close\n");
    }
}
