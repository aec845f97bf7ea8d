//! End-to-end day run: admit, enrich, classify, group, match, report.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, instrument};

use super::matcher::{GroupResults, PatternMatcher};
use super::report::ArbitrageReport;
use crate::calendar::{BusinessCalendar, HolidayCalendar, TenorResolver};
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::grouping::{
    admit_financing, admit_operations, classify, consolidate, FinancingRates, GroupKey, GroupedDay,
    InstrumentGrouper,
};
use crate::records::{
    enrich_financing, enrich_operations, Currency, FeeResolver, RawFinancing, RawOperation,
    ScheduleFeeResolver,
};

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct DayRun {
    /// Groups as built, with the day-level rates used.
    pub grouped: GroupedDay,
    /// Pattern results per group.
    pub results: BTreeMap<GroupKey, GroupResults>,
    /// Flattened, ordered report.
    pub report: ArbitrageReport,
}

/// Wires the pipeline stages together.
#[derive(Debug, Clone)]
pub struct ArbitrageEngine<C, R> {
    grouper: InstrumentGrouper<C>,
    matcher: PatternMatcher,
    fees: R,
    default_currency: Currency,
    day_count_basis: u32,
    consolidate_legs: bool,
    parallel: bool,
}

impl ArbitrageEngine<HolidayCalendar, ScheduleFeeResolver> {
    /// Build an engine from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        let convention = config.settlement().map_err(EngineError::InvalidConfig)?;
        let resolver = TenorResolver::new(config.calendar()?, config.market.clone(), convention);

        Ok(Self {
            grouper: InstrumentGrouper::new(resolver),
            matcher: PatternMatcher::new(config.quote_base, config.day_count_basis),
            fees: config.fee_resolver(),
            default_currency: config.currency(),
            day_count_basis: config.day_count_basis,
            consolidate_legs: config.consolidate_legs,
            parallel: config.parallel,
        })
    }
}

impl<C: BusinessCalendar + Sync, R: FeeResolver> ArbitrageEngine<C, R> {
    /// Assemble an engine from its parts.
    pub fn new(
        grouper: InstrumentGrouper<C>,
        matcher: PatternMatcher,
        fees: R,
        default_currency: Currency,
        day_count_basis: u32,
    ) -> Self {
        Self {
            grouper,
            matcher,
            fees,
            default_currency,
            day_count_basis,
            consolidate_legs: false,
            parallel: false,
        }
    }

    /// Merge same-price legs before classification.
    pub fn with_consolidation(mut self, enabled: bool) -> Self {
        self.consolidate_legs = enabled;
        self
    }

    /// Evaluate groups on the rayon pool.
    pub fn with_parallelism(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Tenor resolver in use.
    pub fn resolver(&self) -> &TenorResolver<C> {
        self.grouper.resolver()
    }

    /// Run the full pipeline for one trading day.
    ///
    /// Fee enrichment is awaited to completion before grouping starts.
    /// Passing back `rates` from an earlier run skips re-aggregation.
    #[instrument(skip(self, operations, financing, rates), fields(operations = operations.len(), financing = financing.len()))]
    pub async fn run(
        &self,
        operations: &[RawOperation],
        financing: &[RawFinancing],
        trading_day: NaiveDate,
        rates: Option<&FinancingRates>,
    ) -> Result<DayRun> {
        let admitted_ops = admit_operations(operations, &self.default_currency);
        let admitted_fin = admit_financing(financing, &self.default_currency, self.day_count_basis);

        let ops = enrich_operations(&self.fees, admitted_ops).await?;
        let fin = enrich_financing(&self.fees, admitted_fin).await?;

        let ops = if self.consolidate_legs { consolidate(ops) } else { ops };
        let classified = classify(ops);
        let grouped = self.grouper.group(&classified, &fin, trading_day, rates)?;

        let results = if self.parallel {
            self.matcher.evaluate_all_parallel(&grouped)
        } else {
            self.matcher.evaluate_all(&grouped)
        };

        let report = ArbitrageReport::new(
            grouped.trading_day,
            grouped.tenor_days,
            grouped.rates.clone(),
            &results,
        );

        info!(
            %trading_day,
            results = report.results.len(),
            total_pnl = %report.totals.total_pnl,
            "Day evaluated"
        );

        Ok(DayRun {
            grouped,
            results,
            report,
        })
    }
}
