// src/pipeline/sync.rs

//! Multi-account sync engine.
//!
//! For each account, in order: fetch orders, extract shipments, filter, then
//! submit the survivors one at a time. A throttle from the tracking sink ends
//! the whole run. History is flushed on every exit path.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{AccountCredentials, Config, HistoryEntry, RunPolicy, Shipment};
use crate::pipeline::filter::{Decision, SkipReason, classify};
use crate::services::{
    CarrierNormalizer, EbayClient, OrderSource, ParcelClient, ShipmentExtractor, Submission,
    SubmitOutcome, TrackingSink,
};
use crate::storage::HistoryStore;
use crate::utils;

/// Counters for one account (or, summed, for a run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub fetched: usize,
    pub extracted: usize,
    pub anomalies: usize,
    pub skipped_delivered: usize,
    pub skipped_stale: usize,
    pub skipped_duplicate: usize,
    pub skipped_unmapped: usize,
    /// Eligible but held back by the per-run cap
    pub deferred: usize,
    pub submitted: usize,
    pub failed: usize,
    pub throttled: usize,
}

impl RunResult {
    fn count_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Delivered => self.skipped_delivered += 1,
            SkipReason::Stale => self.skipped_stale += 1,
            SkipReason::Duplicate => self.skipped_duplicate += 1,
            SkipReason::UnmappedCarrier => self.skipped_unmapped += 1,
        }
    }

    pub fn merge(&mut self, other: &RunResult) {
        self.fetched += other.fetched;
        self.extracted += other.extracted;
        self.anomalies += other.anomalies;
        self.skipped_delivered += other.skipped_delivered;
        self.skipped_stale += other.skipped_stale;
        self.skipped_duplicate += other.skipped_duplicate;
        self.skipped_unmapped += other.skipped_unmapped;
        self.deferred += other.deferred;
        self.submitted += other.submitted;
        self.failed += other.failed;
        self.throttled += other.throttled;
    }

    fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Orders fetched", self.fetched.to_string()),
            ("Shipments extracted", self.extracted.to_string()),
            ("Anomalies", self.anomalies.to_string()),
            ("Skipped (delivered)", self.skipped_delivered.to_string()),
            ("Skipped (stale)", self.skipped_stale.to_string()),
            ("Skipped (duplicate)", self.skipped_duplicate.to_string()),
            ("Skipped (unmapped)", self.skipped_unmapped.to_string()),
            ("Deferred (cap)", self.deferred.to_string()),
            ("Submitted", self.submitted.to_string()),
            ("Failed", self.failed.to_string()),
            ("Throttled", self.throttled.to_string()),
        ]
    }
}

/// Terminal state of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    Completed,
    ThrottleStopped,
    /// Authentication failed; the run moved on to the next account
    ErrorStopped(String),
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountState::Completed => f.write_str("completed"),
            AccountState::ThrottleStopped => f.write_str("throttle_stopped"),
            AccountState::ErrorStopped(reason) => write!(f, "error_stopped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub account: String,
    pub state: AccountState,
    pub result: RunResult,
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Parcel rate-limited the run; `tracking_number` is pending retry
    ThrottleStopped {
        tracking_number: String,
        account: String,
        at: DateTime<Utc>,
    },
}

/// Everything a run did, per account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub accounts: Vec<AccountReport>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn totals(&self) -> RunResult {
        let mut totals = RunResult::default();
        for report in &self.accounts {
            totals.merge(&report.result);
        }
        totals
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self.outcome, RunOutcome::ThrottleStopped { .. })
    }

    /// Write the end-of-run summary to the log.
    pub fn log_summary(&self) {
        utils::log::separator();
        for report in &self.accounts {
            utils::log::sub_item(&format!(
                "account={} state={} submitted={} skipped={} deferred={} failed={}",
                report.account,
                report.state,
                report.result.submitted,
                report.result.skipped_delivered
                    + report.result.skipped_stale
                    + report.result.skipped_duplicate
                    + report.result.skipped_unmapped,
                report.result.deferred,
                report.result.failed,
            ));
        }
        utils::log::summary("Sync run", &self.totals().summary_items());
        match &self.outcome {
            RunOutcome::Completed => utils::log::success("Sync completed"),
            RunOutcome::ThrottleStopped {
                tracking_number,
                account,
                at,
            } => log::warn!(
                "Sync stopped by Parcel rate limit at {} (account={} tracking={} pending retry)",
                at.to_rfc3339(),
                account,
                tracking_number
            ),
        }
    }
}

/// State carried across accounts within one run.
#[derive(Default)]
struct RunState {
    /// Successful submissions so far, checked against the cap
    submitted: usize,
    /// Submission attempts so far, used to space requests
    attempts: usize,
    attempted: HashSet<String>,
    throttle: Option<RunOutcome>,
}

/// The sync engine. Collaborators are borrowed for the run.
pub struct SyncEngine<'a> {
    policy: RunPolicy,
    source: &'a dyn OrderSource,
    sink: &'a dyn TrackingSink,
    normalizer: CarrierNormalizer,
    request_delay: Duration,
    flush_each_record: bool,
    now: DateTime<Utc>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(policy: RunPolicy, source: &'a dyn OrderSource, sink: &'a dyn TrackingSink) -> Self {
        Self {
            policy,
            source,
            sink,
            normalizer: CarrierNormalizer::new(),
            request_delay: Duration::ZERO,
            flush_each_record: true,
            now: Utc::now(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: CarrierNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Pause between consecutive submissions.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Flush history after every recorded submission, not only at the end.
    pub fn with_flush_each_record(mut self, flush: bool) -> Self {
        self.flush_each_record = flush;
        self
    }

    /// Reference time for the age filter.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Run every account in order.
    ///
    /// A history that cannot be loaded aborts before any account is touched.
    /// Otherwise history is flushed whatever happens, and a failed flush
    /// fails the run even if every account succeeded.
    pub async fn run(
        &self,
        accounts: &[AccountCredentials],
        history: &mut dyn HistoryStore,
    ) -> Result<RunReport> {
        history.load().await?;
        log::info!(
            "Starting sync: {} account(s), {} known tracking numbers, cap {}",
            accounts.len(),
            history.len(),
            self.policy.max_submissions_per_run
        );

        let outcome = self.run_accounts(accounts, history).await;
        let flushed = history.flush().await;

        match (outcome, flushed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => {
                log::error!("History could not be saved: {e}");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Err(run_err), Err(flush_err)) => {
                log::error!("Sync aborted: {run_err}");
                log::error!("History could not be saved: {flush_err}");
                Err(flush_err)
            }
        }
    }

    async fn run_accounts(
        &self,
        accounts: &[AccountCredentials],
        history: &mut dyn HistoryStore,
    ) -> Result<RunReport> {
        let mut state = RunState::default();
        let mut reports = Vec::with_capacity(accounts.len());

        for (i, account) in accounts.iter().enumerate() {
            let report = self.sync_account(account, history, &mut state).await?;
            reports.push(report);

            if state.throttle.is_some() {
                let remaining = accounts.len() - i - 1;
                if remaining > 0 {
                    log::warn!("Throttled; {remaining} remaining account(s) not attempted");
                }
                break;
            }
        }

        Ok(RunReport {
            accounts: reports,
            outcome: state.throttle.take().unwrap_or(RunOutcome::Completed),
        })
    }

    async fn sync_account(
        &self,
        account: &AccountCredentials,
        history: &mut dyn HistoryStore,
        state: &mut RunState,
    ) -> Result<AccountReport> {
        let name = account.run_name.as_str();
        let mut result = RunResult::default();
        let report = |account_state, result| AccountReport {
            account: name.to_string(),
            state: account_state,
            result,
        };

        log::info!("account={name} fetching orders (lookback {}d)", self.policy.lookback_days);
        let orders = match self
            .source
            .fetch_orders(account, self.policy.lookback_days)
            .await
        {
            Ok(orders) => orders,
            Err(e) if e.is_auth() => {
                log::error!("account={name} decision=stop reason=auth_error: {e}");
                return Ok(report(AccountState::ErrorStopped(e.to_string()), result));
            }
            Err(e) => return Err(e),
        };
        result.fetched = orders.len();

        let extractor = ShipmentExtractor::new(&self.normalizer);
        for order in &orders {
            let extraction = extractor.extract(order);
            result.extracted += extraction.shipments.len();
            result.anomalies += extraction.anomalies;

            for shipment in &extraction.shipments {
                if self
                    .process_shipment(name, shipment, history, state, &mut result)
                    .await?
                {
                    return Ok(report(AccountState::ThrottleStopped, result));
                }
            }
        }

        log::info!(
            "account={name} completed: {} submitted, {} deferred, {} failed",
            result.submitted,
            result.deferred,
            result.failed
        );
        Ok(report(AccountState::Completed, result))
    }

    /// Filter and possibly submit one shipment. Returns `true` when throttled.
    async fn process_shipment(
        &self,
        account: &str,
        shipment: &Shipment,
        history: &mut dyn HistoryStore,
        state: &mut RunState,
        result: &mut RunResult,
    ) -> Result<bool> {
        let tracking = shipment.tracking_number.as_str();
        let seen = history.contains(tracking) || state.attempted.contains(tracking);

        if let Decision::Skip(reason) = classify(shipment, &self.policy, self.now, seen) {
            result.count_skip(reason);
            log::info!("account={account} tracking={tracking} decision=skip reason={reason}");
            return Ok(false);
        }

        if state.submitted >= self.policy.max_submissions_per_run {
            result.deferred += 1;
            log::info!("account={account} tracking={tracking} decision=defer reason=run_cap_reached");
            return Ok(false);
        }

        if state.attempts > 0 && !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        state.attempts += 1;
        state.attempted.insert(tracking.to_string());

        let submission = Submission::from(shipment);
        let outcome = self.sink.submit(&submission).await;

        match outcome {
            SubmitOutcome::Accepted | SubmitOutcome::AlreadyTracked => {
                history.record(
                    HistoryEntry::new(tracking)
                        .with_account(account)
                        .with_carrier(submission.carrier_code.as_str()),
                );
                if self.flush_each_record {
                    history.flush().await?;
                }
                state.submitted += 1;
                result.submitted += 1;
                log::info!(
                    "account={account} tracking={tracking} decision=submit reason={outcome} carrier={}",
                    submission.carrier_code
                );
                Ok(false)
            }
            SubmitOutcome::Throttled { retry_after } => {
                let at = Utc::now();
                result.throttled += 1;
                log::warn!(
                    "account={account} tracking={tracking} decision=pending_retry reason=throttled retry_after={} at={}",
                    retry_after.as_deref().unwrap_or("-"),
                    at.to_rfc3339()
                );
                state.throttle = Some(RunOutcome::ThrottleStopped {
                    tracking_number: tracking.to_string(),
                    account: account.to_string(),
                    at,
                });
                Ok(true)
            }
            SubmitOutcome::Failed(reason) => {
                result.failed += 1;
                log::warn!("account={account} tracking={tracking} decision=failed reason={reason}");
                Ok(false)
            }
        }
    }
}

/// Run one sync with the live eBay and Parcel clients.
pub async fn run_sync(
    config: &Config,
    accounts: &[AccountCredentials],
    history: &mut dyn HistoryStore,
    parcel_api_key: &str,
) -> Result<RunReport> {
    if accounts.is_empty() {
        return Err(AppError::config(
            "no eBay accounts configured (set EBAY_APP_ID and EBAY_CLIENT_SECRET)",
        ));
    }

    utils::log::header("eBay → Parcel sync");

    let source = EbayClient::new(&config.ebay, &config.parcel.user_agent)?;
    let sink = ParcelClient::new(&config.parcel, parcel_api_key)?;
    let engine = SyncEngine::new(config.policy.clone(), &source, &sink)
        .with_normalizer(CarrierNormalizer::with_aliases(&config.carriers.aliases))
        .with_request_delay(Duration::from_millis(config.parcel.request_delay_ms))
        .with_flush_each_record(config.history.flush_each_record);

    let report = engine.run(accounts, history).await?;
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnmappedCarrierPolicy;
    use crate::models::order::{Order, ShippingDetails, TrackingDetails};
    use crate::storage::MemoryHistoryStore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn account(name: &str) -> AccountCredentials {
        AccountCredentials {
            suffix: None,
            run_name: name.to_string(),
            app_id: format!("{name}-app"),
            client_secret: "secret".to_string(),
            dev_id: "dev".to_string(),
            access_token: "token".to_string(),
            refresh_token: String::new(),
        }
    }

    /// (tracking number, carrier, delivery status)
    type Tracking<'a> = (&'a str, &'a str, Option<&'a str>);

    fn order(id: &str, shipped_days_ago: i64, tracking: &[Tracking]) -> Order {
        let shipped = now() - chrono::Duration::days(shipped_days_ago);
        Order {
            order_id: Some(id.to_string()),
            shipped_time: Some(shipped.to_rfc3339()),
            shipping_details: Some(ShippingDetails {
                tracking_details: tracking
                    .iter()
                    .map(|(number, carrier, status)| TrackingDetails {
                        shipment_tracking_number: Some(number.to_string()),
                        shipping_carrier_used: Some(carrier.to_string()),
                        delivery_status: status.map(str::to_string),
                        ..TrackingDetails::default()
                    })
                    .collect(),
            }),
            ..Order::default()
        }
    }

    fn in_transit(id: &str, number: &str, days_ago: i64) -> Order {
        order(id, days_ago, &[(number, "USPS", Some("InTransit"))])
    }

    #[derive(Default)]
    struct FakeSource {
        orders: HashMap<String, Vec<Order>>,
        auth_failures: HashSet<String>,
        broken: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, account: &str, orders: Vec<Order>) -> Self {
            self.orders.insert(account.to_string(), orders);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderSource for FakeSource {
        async fn fetch_orders(
            &self,
            account: &AccountCredentials,
            _lookback_days: u32,
        ) -> Result<Vec<Order>> {
            let name = account.run_name.clone();
            self.calls.lock().unwrap().push(name.clone());
            if self.auth_failures.contains(&name) {
                return Err(AppError::auth(name, "token expired"));
            }
            if self.broken.contains(&name) {
                return Err(AppError::ebay(name, "[10007] Internal error"));
            }
            Ok(self.orders.get(&name).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        scripted: HashMap<String, SubmitOutcome>,
        calls: Mutex<Vec<Submission>>,
    }

    impl FakeSink {
        fn respond(mut self, tracking: &str, outcome: SubmitOutcome) -> Self {
            self.scripted.insert(tracking.to_string(), outcome);
            self
        }

        fn submitted(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.tracking_number.clone())
                .collect()
        }
    }

    #[async_trait]
    impl TrackingSink for FakeSink {
        async fn submit(&self, submission: &Submission) -> SubmitOutcome {
            self.calls.lock().unwrap().push(submission.clone());
            self.scripted
                .get(&submission.tracking_number)
                .cloned()
                .unwrap_or(SubmitOutcome::Accepted)
        }
    }

    fn engine<'a>(source: &'a FakeSource, sink: &'a FakeSink, policy: RunPolicy) -> SyncEngine<'a> {
        SyncEngine::new(policy, source, sink).with_now(now())
    }

    #[tokio::test]
    async fn test_delivered_and_stale_are_skipped() {
        let source = FakeSource::default().with(
            "default",
            vec![
                order("o1", 10, &[("A", "UPS", Some("InTransit"))]),
                order("o2", 5, &[("B", "USPS", Some("Delivered"))]),
                order("o3", 100, &[("C", "FedEx", Some("InTransit"))]),
            ],
        );
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();
        let policy = RunPolicy {
            max_shipment_age_days: 45,
            ..RunPolicy::default()
        };

        let report = engine(&source, &sink, policy)
            .run(&[account("default")], &mut history)
            .await
            .unwrap();

        assert_eq!(sink.submitted(), vec!["A"]);
        let totals = report.totals();
        assert_eq!(totals.submitted, 1);
        assert_eq!(totals.skipped_delivered, 1);
        assert_eq!(totals.skipped_stale, 1);
        assert_eq!(history.len(), 1);
        assert!(history.contains("A"));
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(sink.calls.lock().unwrap()[0].carrier_code, "ups");
    }

    #[tokio::test]
    async fn test_known_tracking_number_is_not_resubmitted() {
        let source = FakeSource::default().with("default", vec![in_transit("o1", "T1", 1)]);
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::with_numbers(["T1"]);

        let report = engine(&source, &sink, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await
            .unwrap();

        assert!(sink.submitted().is_empty());
        assert_eq!(report.totals().skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn test_second_run_submits_nothing() {
        let source = FakeSource::default().with(
            "default",
            vec![
                in_transit("o1", "A", 1),
                order("o2", 2, &[("B", "UPS", None), ("C", "DHL", None)]),
            ],
        );
        let mut history = MemoryHistoryStore::new();

        let first = FakeSink::default();
        engine(&source, &first, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await
            .unwrap();
        assert_eq!(first.submitted().len(), 3);

        let second = FakeSink::default();
        let report = engine(&source, &second, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await
            .unwrap();
        assert!(second.submitted().is_empty());
        assert_eq!(report.totals().skipped_duplicate, 3);
    }

    #[tokio::test]
    async fn test_throttle_stops_all_accounts() {
        let source = FakeSource::default()
            .with(
                "first",
                vec![
                    in_transit("o1", "S1", 1),
                    in_transit("o2", "S2", 1),
                    in_transit("o3", "S3", 1),
                ],
            )
            .with("second", vec![in_transit("o4", "S4", 1)]);
        let sink = FakeSink::default().respond(
            "S2",
            SubmitOutcome::Throttled {
                retry_after: Some("3600".to_string()),
            },
        );
        let mut history = MemoryHistoryStore::new();

        let report = engine(&source, &sink, RunPolicy::default())
            .run(&[account("first"), account("second")], &mut history)
            .await
            .unwrap();

        assert_eq!(sink.submitted(), vec!["S1", "S2"]);
        assert_eq!(source.calls(), vec!["first"]);
        assert!(history.contains("S1"));
        assert!(!history.contains("S2"));
        assert!(history.flush_count() >= 1);

        assert_eq!(report.accounts.len(), 1);
        assert_eq!(report.accounts[0].state, AccountState::ThrottleStopped);
        assert_eq!(report.accounts[0].result.throttled, 1);
        match &report.outcome {
            RunOutcome::ThrottleStopped {
                tracking_number,
                account,
                ..
            } => {
                assert_eq!(tracking_number, "S2");
                assert_eq!(account, "first");
            }
            other => panic!("expected throttle stop, got {other:?}"),
        }
        assert!(report.is_throttled());
    }

    #[tokio::test]
    async fn test_cap_defers_across_accounts() {
        let source = FakeSource::default()
            .with(
                "first",
                vec![
                    in_transit("o1", "A", 1),
                    in_transit("o2", "B", 1),
                    in_transit("o3", "C", 1),
                ],
            )
            .with(
                "second",
                vec![in_transit("o4", "D", 1), in_transit("o5", "E", 1)],
            );
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();
        let policy = RunPolicy {
            max_submissions_per_run: 2,
            ..RunPolicy::default()
        };

        let report = engine(&source, &sink, policy)
            .run(&[account("first"), account("second")], &mut history)
            .await
            .unwrap();

        assert_eq!(sink.submitted(), vec!["A", "B"]);
        assert_eq!(source.calls(), vec!["first", "second"]);
        let totals = report.totals();
        assert_eq!(totals.submitted, 2);
        assert_eq!(totals.deferred, 3);
        assert_eq!(report.accounts[1].result.deferred, 2);
        assert_eq!(report.outcome, RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_cap_counts_only_successes() {
        let source = FakeSource::default().with(
            "default",
            vec![
                in_transit("o1", "A", 1),
                in_transit("o2", "B", 1),
                in_transit("o3", "C", 1),
            ],
        );
        let sink = FakeSink::default().respond("A", SubmitOutcome::Failed("HTTP 500".to_string()));
        let mut history = MemoryHistoryStore::new();
        let policy = RunPolicy {
            max_submissions_per_run: 2,
            ..RunPolicy::default()
        };

        let report = engine(&source, &sink, policy)
            .run(&[account("default")], &mut history)
            .await
            .unwrap();

        assert_eq!(sink.submitted(), vec!["A", "B", "C"]);
        let totals = report.totals();
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.submitted, 2);
        assert!(!history.contains("A"));
    }

    #[tokio::test]
    async fn test_already_tracked_is_recorded() {
        let source = FakeSource::default().with("default", vec![in_transit("o1", "A", 1)]);
        let sink = FakeSink::default().respond("A", SubmitOutcome::AlreadyTracked);
        let mut history = MemoryHistoryStore::new();

        let report = engine(&source, &sink, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await
            .unwrap();

        assert_eq!(report.totals().submitted, 1);
        assert!(history.contains("A"));
    }

    #[tokio::test]
    async fn test_failed_number_is_not_retried_in_same_run() {
        let source = FakeSource::default()
            .with("first", vec![in_transit("o1", "A", 1)])
            .with("second", vec![in_transit("o2", "A", 1)]);
        let sink = FakeSink::default().respond("A", SubmitOutcome::Failed("HTTP 500".to_string()));
        let mut history = MemoryHistoryStore::new();

        let report = engine(&source, &sink, RunPolicy::default())
            .run(&[account("first"), account("second")], &mut history)
            .await
            .unwrap();

        assert_eq!(sink.submitted(), vec!["A"]);
        assert_eq!(report.accounts[1].result.skipped_duplicate, 1);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_auth_error_stops_only_that_account() {
        let mut source = FakeSource::default().with("second", vec![in_transit("o1", "A", 1)]);
        source.auth_failures.insert("first".to_string());
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();

        let report = engine(&source, &sink, RunPolicy::default())
            .run(&[account("first"), account("second")], &mut history)
            .await
            .unwrap();

        assert!(matches!(
            report.accounts[0].state,
            AccountState::ErrorStopped(_)
        ));
        assert_eq!(report.accounts[1].state, AccountState::Completed);
        assert_eq!(sink.submitted(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_source_error_ends_run_after_flush() {
        let mut source = FakeSource::default().with("first", vec![in_transit("o1", "A", 1)]);
        source.broken.insert("second".to_string());
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();

        let result = engine(&source, &sink, RunPolicy::default())
            .with_flush_each_record(false)
            .run(
                &[account("first"), account("second"), account("third")],
                &mut history,
            )
            .await;

        assert!(matches!(result, Err(AppError::EbayApi { .. })));
        assert_eq!(source.calls(), vec!["first", "second"]);
        assert!(history.contains("A"));
        assert_eq!(history.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_flush_failure_fails_run() {
        let source = FakeSource::default().with("default", vec![in_transit("o1", "A", 1)]);
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new().failing_flush();

        let result = engine(&source, &sink, RunPolicy::default())
            .with_flush_each_record(false)
            .run(&[account("default")], &mut history)
            .await;

        assert!(matches!(result, Err(AppError::Persistence { .. })));
        assert_eq!(sink.submitted(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_incremental_flush_failure_stops_submitting() {
        let source = FakeSource::default().with(
            "default",
            vec![in_transit("o1", "A", 1), in_transit("o2", "B", 1)],
        );
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new().failing_flush();

        let result = engine(&source, &sink, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await;

        assert!(matches!(result, Err(AppError::Persistence { .. })));
        assert_eq!(sink.submitted(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_unmapped_carrier_policy() {
        let orders = vec![
            order("o1", 1, &[("A", "Evri", None)]),
            order("o2", 1, &[("B", "", None)]),
        ];

        let source = FakeSource::default().with("default", orders.clone());
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();
        engine(&source, &sink, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await
            .unwrap();
        let codes: Vec<String> = sink
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.carrier_code.clone())
            .collect();
        assert_eq!(codes, vec!["Evri", "pholder"]);

        let source = FakeSource::default().with("default", orders);
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();
        let policy = RunPolicy {
            unmapped_carrier: UnmappedCarrierPolicy::Skip,
            ..RunPolicy::default()
        };
        let report = engine(&source, &sink, policy)
            .run(&[account("default")], &mut history)
            .await
            .unwrap();
        assert!(sink.submitted().is_empty());
        assert_eq!(report.totals().skipped_unmapped, 2);
    }

    #[tokio::test]
    async fn test_extraction_order_is_preserved() {
        let source = FakeSource::default().with(
            "default",
            vec![
                order("o1", 1, &[("Z9", "UPS", None), ("A1", "UPS", None)]),
                in_transit("o2", "M5", 1),
            ],
        );
        let sink = FakeSink::default();
        let mut history = MemoryHistoryStore::new();

        engine(&source, &sink, RunPolicy::default())
            .run(&[account("default")], &mut history)
            .await
            .unwrap();

        assert_eq!(sink.submitted(), vec!["Z9", "A1", "M5"]);
    }
}
