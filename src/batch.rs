//! Batch dues run orchestration.
//!
//! A run evaluates every member of one organization for one billing period.
//! Member failures are isolated: a bad billing fact produces a failure
//! record and the run continues. At most one run per organization and period
//! is admitted at a time; a second attempt while the first is live is
//! rejected with [`EngineError::RunConflict`]. Runs can be cancelled; the
//! flag is observed between members, and work already written stands.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::calculation::{LateFeePolicy, evaluate_member};
use crate::error::{EngineError, EngineResult};
use crate::models::{BillingPeriod, FailureRecord, RunSummary};
use crate::money::MoneyContext;
use crate::providers::{LedgerSink, RosterProvider, RuleRepository};

/// Tracks which (organization, period) runs are currently live.
///
/// Cheap to clone; clones share the underlying admission set.
#[derive(Debug, Clone, Default)]
pub struct RunAdmissions {
    live: Arc<Mutex<HashSet<(String, BillingPeriod)>>>,
}

/// Releases the admission slot when dropped.
pub struct AdmissionGuard {
    live: Arc<Mutex<HashSet<(String, BillingPeriod)>>>,
    key: (String, BillingPeriod),
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&self.key);
        }
    }
}

impl RunAdmissions {
    /// Creates an empty admission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a run for the organization and period, or rejects with
    /// [`EngineError::RunConflict`] if one is already live.
    pub fn admit(
        &self,
        organization_id: &str,
        period: BillingPeriod,
    ) -> EngineResult<AdmissionGuard> {
        let key = (organization_id.to_string(), period);
        let mut live = self.live.lock().map_err(|_| EngineError::RunConflict {
            organization_id: organization_id.to_string(),
            period: period.to_string(),
        })?;
        if !live.insert(key.clone()) {
            return Err(EngineError::RunConflict {
                organization_id: organization_id.to_string(),
                period: period.to_string(),
            });
        }
        Ok(AdmissionGuard {
            live: Arc::clone(&self.live),
            key,
        })
    }
}

/// A cooperative cancellation flag shared with an in-flight run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Orchestrates batch dues runs over the collaborator seams.
pub struct BatchRunner {
    roster: Arc<dyn RosterProvider>,
    rules: Arc<dyn RuleRepository>,
    sink: Arc<dyn LedgerSink>,
    policy: LateFeePolicy,
    money: MoneyContext,
    admissions: RunAdmissions,
}

impl BatchRunner {
    /// Creates a runner with its own admission set.
    pub fn new(
        roster: Arc<dyn RosterProvider>,
        rules: Arc<dyn RuleRepository>,
        sink: Arc<dyn LedgerSink>,
        policy: LateFeePolicy,
        money: MoneyContext,
    ) -> Self {
        Self::with_admissions(roster, rules, sink, policy, money, RunAdmissions::new())
    }

    /// Creates a runner sharing an admission set with other runners.
    pub fn with_admissions(
        roster: Arc<dyn RosterProvider>,
        rules: Arc<dyn RuleRepository>,
        sink: Arc<dyn LedgerSink>,
        policy: LateFeePolicy,
        money: MoneyContext,
        admissions: RunAdmissions,
    ) -> Self {
        Self {
            roster,
            rules,
            sink,
            policy,
            money,
            admissions,
        }
    }

    /// Runs dues for one organization and period.
    ///
    /// Every roster member ends up in exactly one summary bucket: succeeded,
    /// skipped, or failed. Cancellation stops evaluation between members and
    /// returns the partial summary with `cancelled` set.
    pub fn run_batch(
        &self,
        organization_id: &str,
        period: BillingPeriod,
        cancel: &CancelFlag,
    ) -> EngineResult<RunSummary> {
        let _admission = self.admissions.admit(organization_id, period)?;
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        tracing::info!(
            %run_id,
            organization_id,
            period = %period,
            "Starting dues run"
        );

        let rule_date = period
            .first_day()
            .ok_or_else(|| EngineError::InputsUnavailable {
                provider: "period".to_string(),
                message: format!("invalid billing period {}", period),
            })?;
        let rule = self.rules.active_rule(organization_id, rule_date)?;
        let facts = self.roster.billing_facts(organization_id, period)?;

        let mut summary = RunSummary {
            run_id,
            organization_id: organization_id.to_string(),
            period,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            total_dues: rust_decimal::Decimal::ZERO,
            total_contributions: rust_decimal::Decimal::ZERO,
            cancelled: false,
            duration_us: 0,
        };
        let mut seen: HashSet<String> = HashSet::with_capacity(facts.len());

        for fact in &facts {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                tracing::info!(%run_id, processed = summary.total_processed(), "Run cancelled");
                break;
            }

            if !seen.insert(fact.member_id.clone()) {
                summary.failed += 1;
                self.sink.append_failure(FailureRecord {
                    member_id: fact.member_id.clone(),
                    error_kind: "INVALID_BILLING_FACT".to_string(),
                    reason: format!(
                        "duplicate billing fact for member '{}' in roster",
                        fact.member_id
                    ),
                    recorded_at: Utc::now(),
                })?;
                tracing::warn!(%run_id, member_id = %fact.member_id, "Duplicate roster entry");
                continue;
            }

            match evaluate_member(&rule, fact, &self.policy, &self.money, run_id) {
                Ok(entry) => {
                    if entry.skipped.is_some() {
                        summary.skipped += 1;
                    } else {
                        summary.succeeded += 1;
                        summary.total_dues = self.money.add(summary.total_dues, entry.total_due)?;
                        let entry_contributions = self
                            .money
                            .add(self.money.add(entry.cope, entry.pac)?, entry.strike_fund)?;
                        summary.total_contributions = self
                            .money
                            .add(summary.total_contributions, entry_contributions)?;
                    }
                    self.sink.append_entry(entry)?;
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(
                        %run_id,
                        member_id = %fact.member_id,
                        error = %err,
                        "Member evaluation failed"
                    );
                    self.sink.append_failure(FailureRecord {
                        member_id: fact.member_id.clone(),
                        error_kind: err.kind().to_string(),
                        reason: err.to_string(),
                        recorded_at: Utc::now(),
                    })?;
                }
            }
        }

        summary.duration_us = started.elapsed().as_micros() as u64;
        tracing::info!(
            %run_id,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            total_dues = %summary.total_dues,
            cancelled = summary.cancelled,
            "Dues run finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ContributionSchedule, DuesRule, MemberBillingFact, MembershipStatus, RuleMethod,
    };
    use crate::models::{LedgerEntry, RemittanceRecord};
    use crate::providers::{InMemoryRoster, InMemoryRules, MemoryLedgerSink};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::atomic::AtomicU32;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn period() -> BillingPeriod {
        BillingPeriod {
            year: 2025,
            month: 3,
        }
    }

    fn percentage_rule() -> DuesRule {
        DuesRule {
            id: "rule-pct".to_string(),
            organization_id: "local-100".to_string(),
            method: RuleMethod::Percentage { rate: dec("0.02") },
            contributions: ContributionSchedule::default(),
            currency: "USD".to_string(),
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            effective_to: None,
            version: 1,
        }
    }

    fn fact(member_id: &str, wages: &str) -> MemberBillingFact {
        MemberBillingFact {
            member_id: member_id.to_string(),
            organization_id: "local-100".to_string(),
            period: period(),
            gross_wages: dec(wages),
            hours_worked: dec("152"),
            arrears_balance: Decimal::ZERO,
            days_overdue: 0,
            dues_override: None,
            status: MembershipStatus::Active,
        }
    }

    fn runner(facts: Vec<MemberBillingFact>, sink: MemoryLedgerSink) -> BatchRunner {
        BatchRunner::new(
            Arc::new(InMemoryRoster::new(facts)),
            Arc::new(InMemoryRules::new(vec![percentage_rule()])),
            Arc::new(sink),
            LateFeePolicy::default(),
            MoneyContext::default(),
        )
    }

    /// BR-001: failures are isolated and every member lands in one bucket
    #[test]
    fn test_failures_are_isolated() {
        let mut facts: Vec<MemberBillingFact> =
            (0..97).map(|i| fact(&format!("m-{:03}", i), "4200")).collect();
        for i in 0..3 {
            let mut bad = fact(&format!("bad-{}", i), "4200");
            bad.hours_worked = dec("-8");
            facts.push(bad);
        }

        let sink = MemoryLedgerSink::new();
        let summary = runner(facts, sink.clone())
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();

        assert_eq!(summary.succeeded, 97);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.total_processed(), 100);
        assert_eq!(sink.entries().len(), 97);
        assert_eq!(sink.failures().len(), 3);
        assert_eq!(
            sink.failures()[0].error_kind,
            "INVALID_BILLING_FACT"
        );
    }

    /// BR-002: skipped members are counted and written, never dropped
    #[test]
    fn test_skipped_members_written() {
        let mut facts = vec![fact("m-001", "4200"), fact("m-002", "3000")];
        facts[1].status = MembershipStatus::Exempt;

        let sink = MemoryLedgerSink::new();
        let summary = runner(facts, sink.clone())
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(sink.entries().len(), 2);
        // skipped entry contributes nothing to the total
        assert_eq!(summary.total_dues, dec("84.00"));
    }

    /// BR-003: a second run for the same organization and period is rejected
    #[test]
    fn test_concurrent_run_rejected() {
        let admissions = RunAdmissions::new();
        let _guard = admissions.admit("local-100", period()).unwrap();

        let sink = MemoryLedgerSink::new();
        let runner = BatchRunner::with_admissions(
            Arc::new(InMemoryRoster::new(vec![fact("m-001", "4200")])),
            Arc::new(InMemoryRules::new(vec![percentage_rule()])),
            Arc::new(sink),
            LateFeePolicy::default(),
            MoneyContext::default(),
            admissions,
        );

        let result = runner.run_batch("local-100", period(), &CancelFlag::new());
        assert!(matches!(
            result.unwrap_err(),
            EngineError::RunConflict { .. }
        ));
    }

    /// BR-004: the admission slot is released when the run completes
    #[test]
    fn test_admission_released_after_run() {
        let sink = MemoryLedgerSink::new();
        let runner = runner(vec![fact("m-001", "4200")], sink);

        runner
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();
        // the same key admits again
        runner
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();
    }

    /// BR-005: a different period for the same organization runs concurrently
    #[test]
    fn test_different_period_not_conflicting() {
        let admissions = RunAdmissions::new();
        let _march = admissions.admit("local-100", period()).unwrap();
        let april = BillingPeriod {
            year: 2025,
            month: 4,
        };
        assert!(admissions.admit("local-100", april).is_ok());
    }

    /// BR-006: cancellation stops between members and keeps completed work
    #[test]
    fn test_cancellation_preserves_completed_work() {
        let facts: Vec<MemberBillingFact> =
            (0..10).map(|i| fact(&format!("m-{:03}", i), "4200")).collect();
        let sink = MemoryLedgerSink::new();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let summary = runner(facts, sink.clone())
            .run_batch("local-100", period(), &cancel)
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.total_processed(), 0);
        assert!(sink.entries().is_empty());
    }

    /// A sink that requests cancellation after a set number of entries,
    /// simulating an operator cancelling while the run is in flight.
    struct CancellingSink {
        inner: MemoryLedgerSink,
        cancel: CancelFlag,
        remaining: AtomicU32,
    }

    impl LedgerSink for CancellingSink {
        fn append_entry(&self, entry: LedgerEntry) -> EngineResult<()> {
            self.inner.append_entry(entry)?;
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.cancel.cancel();
            }
            Ok(())
        }

        fn append_failure(&self, failure: FailureRecord) -> EngineResult<()> {
            self.inner.append_failure(failure)
        }

        fn upsert_remittance(&self, record: RemittanceRecord) -> EngineResult<()> {
            self.inner.upsert_remittance(record)
        }
    }

    /// BR-010: cancelling mid-run keeps the entries already written and
    /// reports only the members actually processed
    #[test]
    fn test_cancellation_mid_run_stops_after_current_member() {
        let facts: Vec<MemberBillingFact> =
            (0..10).map(|i| fact(&format!("m-{:03}", i), "4200")).collect();
        let inner = MemoryLedgerSink::new();
        let cancel = CancelFlag::new();
        let sink = CancellingSink {
            inner: inner.clone(),
            cancel: cancel.clone(),
            remaining: AtomicU32::new(4),
        };

        let runner = BatchRunner::new(
            Arc::new(InMemoryRoster::new(facts)),
            Arc::new(InMemoryRules::new(vec![percentage_rule()])),
            Arc::new(sink),
            LateFeePolicy::default(),
            MoneyContext::default(),
        );
        let summary = runner
            .run_batch("local-100", period(), &cancel)
            .unwrap();

        assert!(summary.cancelled);
        // the member being evaluated when the flag flipped still completes
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.total_processed(), 4);
        assert_eq!(inner.entries().len(), 4);
        assert_eq!(summary.total_dues, dec("336.00"));
    }

    /// BR-011: per-entry contributions roll up into the summary
    #[test]
    fn test_summary_totals_contributions() {
        let rule = DuesRule {
            contributions: ContributionSchedule {
                cope: dec("2.00"),
                pac: dec("1.00"),
                strike_fund: Decimal::ZERO,
                initiation_fee: Decimal::ZERO,
            },
            ..percentage_rule()
        };
        let mut facts = vec![fact("m-001", "4200"), fact("m-002", "1000")];
        facts.push({
            let mut exempt = fact("m-003", "2000");
            exempt.status = MembershipStatus::Exempt;
            exempt
        });
        let sink = MemoryLedgerSink::new();

        let runner = BatchRunner::new(
            Arc::new(InMemoryRoster::new(facts)),
            Arc::new(InMemoryRules::new(vec![rule])),
            Arc::new(sink.clone()),
            LateFeePolicy::default(),
            MoneyContext::default(),
        );
        let summary = runner
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();

        // two billable members at 3.00 each; the exempt member adds nothing
        assert_eq!(summary.total_contributions, dec("6.00"));
        // 84.00 + 20.00 base plus 6.00 contributions
        assert_eq!(summary.total_dues, dec("110.00"));
    }

    /// BR-007: duplicate member ids in the roster become failure records
    #[test]
    fn test_duplicate_member_recorded_as_failure() {
        let facts = vec![fact("m-001", "4200"), fact("m-001", "3000")];
        let sink = MemoryLedgerSink::new();

        let summary = runner(facts, sink.clone())
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(sink.failures()[0].reason.contains("duplicate"));
    }

    /// BR-008: a missing rule fails the run before any member is touched
    #[test]
    fn test_missing_rule_fails_run() {
        let sink = MemoryLedgerSink::new();
        let runner = BatchRunner::new(
            Arc::new(InMemoryRoster::new(vec![fact("m-001", "4200")])),
            Arc::new(InMemoryRules::new(vec![])),
            Arc::new(sink.clone()),
            LateFeePolicy::default(),
            MoneyContext::default(),
        );

        let result = runner.run_batch("local-100", period(), &CancelFlag::new());
        assert!(matches!(
            result.unwrap_err(),
            EngineError::RuleNotFound { .. }
        ));
        assert!(sink.entries().is_empty());
    }

    /// BR-009: entries share the run id and the summary total matches them
    #[test]
    fn test_summary_total_matches_entries() {
        let facts = vec![fact("m-001", "4200"), fact("m-002", "1000")];
        let sink = MemoryLedgerSink::new();

        let summary = runner(facts, sink.clone())
            .run_batch("local-100", period(), &CancelFlag::new())
            .unwrap();

        let entries = sink.entries();
        let entry_total: Decimal = entries.iter().map(|e| e.total_due).sum();
        assert_eq!(summary.total_dues, entry_total);
        assert!(entries.iter().all(|e| e.run_id == summary.run_id));
    }
}
