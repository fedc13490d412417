//! Collaborator traits at the engine's seams, with in-memory implementations.
//!
//! The engine never fetches its own inputs. Rosters, rules, jurisdiction
//! formulas, and affiliate returns arrive through these traits, and results
//! leave through [`LedgerSink`]. The in-memory implementations back the HTTP
//! layer (which carries inputs inline) and the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AffiliateReturn, BillingPeriod, DuesRule, FailureRecord, JurisdictionFormula, LedgerEntry,
    MemberBillingFact, RemittanceRecord, ReportingPeriod,
};

/// Supplies the member roster with billing facts for a run.
pub trait RosterProvider: Send + Sync {
    /// Returns the billing facts for every member of the organization in
    /// the period.
    fn billing_facts(
        &self,
        organization_id: &str,
        period: BillingPeriod,
    ) -> EngineResult<Vec<MemberBillingFact>>;
}

/// Supplies the dues rule in effect for an organization on a date.
pub trait RuleRepository: Send + Sync {
    /// Returns the effective rule, or [`EngineError::RuleNotFound`] if no
    /// rule covers the date.
    fn active_rule(&self, organization_id: &str, date: NaiveDate) -> EngineResult<DuesRule>;
}

/// Receives the engine's outputs.
pub trait LedgerSink: Send + Sync {
    /// Appends a computed ledger entry.
    fn append_entry(&self, entry: LedgerEntry) -> EngineResult<()>;
    /// Appends a per-member failure record.
    fn append_failure(&self, failure: FailureRecord) -> EngineResult<()>;
    /// Inserts or replaces the remittance record for its affiliate and period.
    fn upsert_remittance(&self, record: RemittanceRecord) -> EngineResult<()>;
}

/// Supplies per-capita formula constants per federation and jurisdiction.
pub trait JurisdictionFormulaProvider: Send + Sync {
    /// Returns the formula, or [`EngineError::FormulaNotFound`].
    fn formula(
        &self,
        federation_id: &str,
        jurisdiction_id: &str,
    ) -> EngineResult<JurisdictionFormula>;
}

/// Supplies the affiliate universe and membership returns for a federation.
pub trait MembershipProvider: Send + Sync {
    /// Every affiliate expected to report for the federation.
    fn expected_affiliates(&self, federation_id: &str) -> EngineResult<Vec<String>>;
    /// The returns actually received for the period.
    fn affiliate_returns(
        &self,
        federation_id: &str,
        period: ReportingPeriod,
    ) -> EngineResult<Vec<AffiliateReturn>>;
}

fn poisoned(provider: &str) -> EngineError {
    EngineError::InputsUnavailable {
        provider: provider.to_string(),
        message: "state lock poisoned".to_string(),
    }
}

/// In-memory roster keyed by organization and period.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    facts: HashMap<(String, BillingPeriod), Vec<MemberBillingFact>>,
}

impl InMemoryRoster {
    /// Creates a roster from pre-grouped billing facts.
    pub fn new(facts: Vec<MemberBillingFact>) -> Self {
        let mut roster = Self::default();
        for fact in facts {
            roster
                .facts
                .entry((fact.organization_id.clone(), fact.period))
                .or_default()
                .push(fact);
        }
        roster
    }
}

impl RosterProvider for InMemoryRoster {
    fn billing_facts(
        &self,
        organization_id: &str,
        period: BillingPeriod,
    ) -> EngineResult<Vec<MemberBillingFact>> {
        Ok(self
            .facts
            .get(&(organization_id.to_string(), period))
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory rule store. When several versions of a rule cover the same
/// date, the highest version wins.
#[derive(Debug, Default)]
pub struct InMemoryRules {
    rules: Vec<DuesRule>,
}

impl InMemoryRules {
    /// Creates a rule store from a list of rules.
    pub fn new(rules: Vec<DuesRule>) -> Self {
        Self { rules }
    }
}

impl RuleRepository for InMemoryRules {
    fn active_rule(&self, organization_id: &str, date: NaiveDate) -> EngineResult<DuesRule> {
        self.rules
            .iter()
            .filter(|r| r.organization_id == organization_id && r.is_effective(date))
            .max_by_key(|r| r.version)
            .cloned()
            .ok_or_else(|| EngineError::RuleNotFound {
                organization_id: organization_id.to_string(),
                date: date.to_string(),
            })
    }
}

/// In-memory ledger sink collecting entries, failures, and remittances.
///
/// Clones share the underlying storage, so a handler can hand the sink to
/// the runner and read the results back afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerSink {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
    failures: Arc<Mutex<Vec<FailureRecord>>>,
    remittances: Arc<Mutex<Vec<RemittanceRecord>>>,
}

impl MemoryLedgerSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected ledger entries.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Snapshot of the collected failure records.
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.failures.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Snapshot of the collected remittance records.
    pub fn remittances(&self) -> Vec<RemittanceRecord> {
        self.remittances
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl LedgerSink for MemoryLedgerSink {
    fn append_entry(&self, entry: LedgerEntry) -> EngineResult<()> {
        self.entries
            .lock()
            .map_err(|_| poisoned("ledger"))?
            .push(entry);
        Ok(())
    }

    fn append_failure(&self, failure: FailureRecord) -> EngineResult<()> {
        self.failures
            .lock()
            .map_err(|_| poisoned("ledger"))?
            .push(failure);
        Ok(())
    }

    fn upsert_remittance(&self, record: RemittanceRecord) -> EngineResult<()> {
        let mut remittances = self.remittances.lock().map_err(|_| poisoned("ledger"))?;
        match remittances.iter_mut().find(|r| {
            r.federation_id == record.federation_id
                && r.affiliate_id == record.affiliate_id
                && r.period == record.period
        }) {
            Some(existing) => *existing = record,
            None => remittances.push(record),
        }
        Ok(())
    }
}

/// Static jurisdiction formula lookup keyed by federation and jurisdiction.
#[derive(Debug, Default)]
pub struct StaticFormulas {
    formulas: HashMap<(String, String), JurisdictionFormula>,
}

impl StaticFormulas {
    /// Creates a lookup from (federation, jurisdiction, formula) triples.
    pub fn new(entries: Vec<(String, String, JurisdictionFormula)>) -> Self {
        Self {
            formulas: entries
                .into_iter()
                .map(|(fed, jur, formula)| ((fed, jur), formula))
                .collect(),
        }
    }
}

impl JurisdictionFormulaProvider for StaticFormulas {
    fn formula(
        &self,
        federation_id: &str,
        jurisdiction_id: &str,
    ) -> EngineResult<JurisdictionFormula> {
        self.formulas
            .get(&(federation_id.to_string(), jurisdiction_id.to_string()))
            .cloned()
            .ok_or_else(|| EngineError::FormulaNotFound {
                federation_id: federation_id.to_string(),
                jurisdiction_id: jurisdiction_id.to_string(),
            })
    }
}

/// Static membership data: expected affiliates and their returns.
#[derive(Debug, Default)]
pub struct StaticMembership {
    affiliates: HashMap<String, Vec<String>>,
    returns: HashMap<(String, ReportingPeriod), Vec<AffiliateReturn>>,
}

impl StaticMembership {
    /// Creates membership data for one federation.
    pub fn new(
        federation_id: &str,
        affiliates: Vec<String>,
        period: ReportingPeriod,
        returns: Vec<AffiliateReturn>,
    ) -> Self {
        let mut membership = Self::default();
        membership
            .affiliates
            .insert(federation_id.to_string(), affiliates);
        membership
            .returns
            .insert((federation_id.to_string(), period), returns);
        membership
    }
}

impl MembershipProvider for StaticMembership {
    fn expected_affiliates(&self, federation_id: &str) -> EngineResult<Vec<String>> {
        self.affiliates
            .get(federation_id)
            .cloned()
            .ok_or_else(|| EngineError::InputsUnavailable {
                provider: "membership".to_string(),
                message: format!("no affiliate list for federation '{}'", federation_id),
            })
    }

    fn affiliate_returns(
        &self,
        federation_id: &str,
        period: ReportingPeriod,
    ) -> EngineResult<Vec<AffiliateReturn>> {
        Ok(self
            .returns
            .get(&(federation_id.to_string(), period))
            .cloned()
            .unwrap_or_default())
    }
}
