//! Per-(instrument, tenor) grouping of legs and financing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use tracing::{info, instrument, warn};

use super::classifier::{ClassifiedOperations, OperationBuckets};
use super::financing::{average_rates_by_currency, weighted_rate, FinancingRates};
use crate::calendar::{BusinessCalendar, TenorResolver};
use crate::error::CalendarError;
use crate::metrics;
use crate::records::{Currency, FinancingTransaction};

/// Grouping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    /// Instrument ticker.
    pub instrument: String,
    /// Settlement gap in calendar days.
    pub tenor_days: u32,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}d", self.instrument, self.tenor_days)
    }
}

/// Where a group's average TNA came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Weighted over the group's own financing transactions.
    #[strum(serialize = "group")]
    Group,
    /// Day-level average for the group currency.
    #[strum(serialize = "day_average")]
    DayAverage,
    /// No rate could be derived.
    #[strum(serialize = "unavailable")]
    Unavailable,
}

/// Legs and financing of one instrument at one tenor.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentTenorGroup {
    /// Group key.
    pub key: GroupKey,
    /// Currency the legs settle in.
    pub currency: Currency,
    /// Operation buckets.
    pub buckets: OperationBuckets,
    /// Financing transactions with matching tenor and currency.
    pub financing: Vec<FinancingTransaction>,
    /// Representative TNA in percent.
    pub avg_tna: Option<Decimal>,
    /// Origin of `avg_tna`.
    pub rate_source: RateSource,
}

impl InstrumentTenorGroup {
    /// Instrument ticker.
    pub fn instrument(&self) -> &str {
        &self.key.instrument
    }

    /// Tenor in days.
    pub fn tenor_days(&self) -> u32 {
        self.key.tenor_days
    }
}

/// Output of one grouping pass.
#[derive(Debug, Clone)]
pub struct GroupedDay {
    /// Trading day grouped.
    pub trading_day: NaiveDate,
    /// Tenor of the trading day.
    pub tenor_days: u32,
    /// Day-level rates used as fallback (computed or supplied).
    pub rates: FinancingRates,
    /// Groups in key order.
    pub groups: BTreeMap<GroupKey, InstrumentTenorGroup>,
}

/// Builds [`InstrumentTenorGroup`]s for a trading day.
#[derive(Debug, Clone)]
pub struct InstrumentGrouper<C> {
    resolver: TenorResolver<C>,
}

impl<C: BusinessCalendar> InstrumentGrouper<C> {
    /// Create a grouper on top of a tenor resolver.
    pub fn new(resolver: TenorResolver<C>) -> Self {
        Self { resolver }
    }

    /// Tenor resolver in use.
    pub fn resolver(&self) -> &TenorResolver<C> {
        &self.resolver
    }

    /// Group classified legs and financing for `trading_day`.
    ///
    /// `rates` is computed once from `financing` when not supplied.
    #[instrument(skip(self, classified, financing, rates), fields(instruments = classified.instrument_count()))]
    pub fn group(
        &self,
        classified: &ClassifiedOperations,
        financing: &[FinancingTransaction],
        trading_day: NaiveDate,
        rates: Option<&FinancingRates>,
    ) -> Result<GroupedDay, CalendarError> {
        let tenor_days = self.resolver.tenor_days(trading_day)?;
        let rates = match rates {
            Some(rates) => rates.clone(),
            None => average_rates_by_currency(financing),
        };

        let groups = build_groups(classified, financing, tenor_days, &rates);

        metrics::record_groups_built(groups.len());
        info!(
            %trading_day,
            tenor_days,
            groups = groups.len(),
            currencies = rates.len(),
            "Groups built"
        );

        Ok(GroupedDay {
            trading_day,
            tenor_days,
            rates,
            groups,
        })
    }
}

/// Build groups for a known tenor.
pub fn build_groups(
    classified: &ClassifiedOperations,
    financing: &[FinancingTransaction],
    tenor_days: u32,
    rates: &FinancingRates,
) -> BTreeMap<GroupKey, InstrumentTenorGroup> {
    let mut groups = BTreeMap::new();

    for (instrument, buckets) in &classified.by_instrument {
        let Some(currency) = buckets.iter().next().map(|op| op.currency.clone()) else {
            continue;
        };

        let attached: Vec<FinancingTransaction> = financing
            .iter()
            .filter(|tx| tx.tenor_days == tenor_days && tx.currency == currency)
            .cloned()
            .collect();

        let (avg_tna, rate_source) = match weighted_rate(&attached) {
            Some(rate) => (Some(rate), RateSource::Group),
            None => match rates.get(&currency) {
                Some(rate) => (Some(rate), RateSource::DayAverage),
                None => (None, RateSource::Unavailable),
            },
        };

        if rate_source == RateSource::Unavailable {
            warn!(%instrument, %currency, tenor_days, "No financing rate for group");
        }

        let key = GroupKey {
            instrument: instrument.clone(),
            tenor_days,
        };
        groups.insert(
            key.clone(),
            InstrumentTenorGroup {
                key,
                currency,
                buckets: buckets.clone(),
                financing: attached,
                avg_tna,
                rate_source,
            },
        );
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{HolidayCalendar, SettlementConvention};
    use crate::grouping::classify;
    use crate::records::{FinancingRole, Operation, SettlementVenue, Side};
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn grouper() -> InstrumentGrouper<HolidayCalendar> {
        InstrumentGrouper::new(TenorResolver::new(
            HolidayCalendar::default(),
            "BYMA",
            SettlementConvention::NextBusinessDay,
        ))
    }

    fn op(instrument: &str, side: Side, venue: SettlementVenue, currency: &str) -> Operation {
        Operation {
            instrument: instrument.to_string(),
            side,
            venue,
            traded_at: "2025-10-03T14:00:00Z".parse().unwrap(),
            quantity: dec!(100),
            price: dec!(100),
            commission: dec!(0),
            currency: Currency::new(currency),
            fees: None,
        }
    }

    fn tx(currency: &str, tenor_days: u32, principal: Decimal, rate: Decimal) -> FinancingTransaction {
        FinancingTransaction {
            instrument: "PESOS".to_string(),
            principal,
            rate,
            tenor_days,
            currency: Currency::new(currency),
            role: FinancingRole::Lender,
            accrued_interest: dec!(0),
            fees: None,
        }
    }

    #[test]
    fn groups_are_keyed_by_instrument_and_tenor() {
        let classified = classify(vec![
            op("S31O5", Side::Sell, SettlementVenue::Immediate, "ARS"),
            op("S31O5", Side::Buy, SettlementVenue::Deferred, "ARS"),
            op("AL30D", Side::Buy, SettlementVenue::Immediate, "USD"),
        ]);

        let day = grouper()
            .group(&classified, &[], date("2025-10-03"), None)
            .unwrap();

        assert_eq!(day.tenor_days, 3);
        assert_eq!(day.groups.len(), 2);
        let key = GroupKey {
            instrument: "S31O5".to_string(),
            tenor_days: 3,
        };
        let group = &day.groups[&key];
        assert_eq!(group.buckets.sell_immediate.len(), 1);
        assert_eq!(group.buckets.buy_deferred.len(), 1);
        assert_eq!(group.rate_source, RateSource::Unavailable);
    }

    #[test]
    fn group_rate_prefers_matching_tenor_transactions() {
        let classified = classify(vec![op("S31O5", Side::Sell, SettlementVenue::Immediate, "ARS")]);
        let financing = vec![
            tx("ARS", 3, dec!(1000), dec!(30)),
            tx("ARS", 1, dec!(9000), dec!(50)),
        ];

        let day = grouper()
            .group(&classified, &financing, date("2025-10-03"), None)
            .unwrap();

        let group = day.groups.values().next().unwrap();
        assert_eq!(group.financing.len(), 1);
        assert_eq!(group.avg_tna, Some(dec!(30)));
        assert_eq!(group.rate_source, RateSource::Group);
        // Day-level rate still covers every tenor: (1000*30 + 9000*50) / 10000
        assert_eq!(day.rates.get(&Currency::new("ARS")), Some(dec!(48)));
    }

    #[test]
    fn day_average_is_used_when_group_has_no_financing() {
        let classified = classify(vec![op("S31O5", Side::Sell, SettlementVenue::Immediate, "ARS")]);
        let financing = vec![tx("ARS", 1, dec!(1000), dec!(42))];

        let day = grouper()
            .group(&classified, &financing, date("2025-10-03"), None)
            .unwrap();

        let group = day.groups.values().next().unwrap();
        assert!(group.financing.is_empty());
        assert_eq!(group.avg_tna, Some(dec!(42)));
        assert_eq!(group.rate_source, RateSource::DayAverage);
    }

    #[test]
    fn supplied_rates_are_reused() {
        let classified = classify(vec![op("AL30D", Side::Buy, SettlementVenue::Immediate, "usd")]);
        let mut supplied = FinancingRates::default();
        supplied.insert("USD", dec!(1.5));

        let day = grouper()
            .group(&classified, &[], date("2025-10-01"), Some(&supplied))
            .unwrap();

        assert_eq!(day.rates, supplied);
        let group = day.groups.values().next().unwrap();
        assert_eq!(group.tenor_days(), 1);
        assert_eq!(group.avg_tna, Some(dec!(1.5)));
    }
}
