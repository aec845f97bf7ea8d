//! Principal-weighted financing rates.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::records::{Currency, FinancingTransaction};

/// Average TNA per currency for one trading day.
///
/// Returned to the caller so it can be reused across grouping passes instead
/// of being recomputed per group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingRates(BTreeMap<Currency, Decimal>);

impl FinancingRates {
    /// Rate for a currency, if any transaction used it.
    pub fn get(&self, currency: &Currency) -> Option<Decimal> {
        self.0.get(currency).copied()
    }

    /// Set the rate for a currency.
    pub fn insert(&mut self, currency: impl Into<Currency>, rate: Decimal) {
        self.0.insert(currency.into(), rate);
    }

    /// Whether no currency has a rate.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of currencies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in currency order.
    pub fn iter(&self) -> impl Iterator<Item = (&Currency, &Decimal)> {
        self.0.iter()
    }
}

/// Running Σ(principal × rate) and Σ(principal).
#[derive(Debug, Clone, Copy, Default)]
struct WeightedSum {
    weighted: Decimal,
    principal: Decimal,
}

impl WeightedSum {
    fn add(&mut self, tx: &FinancingTransaction) {
        self.weighted += tx.principal * tx.rate;
        self.principal += tx.principal;
    }

    fn average(&self) -> Decimal {
        if self.principal.is_zero() {
            Decimal::ZERO
        } else {
            self.weighted / self.principal
        }
    }
}

/// Principal-weighted average TNA per currency.
///
/// A currency whose transactions carry no principal maps to zero.
#[instrument(skip_all, fields(count = transactions.len()))]
pub fn average_rates_by_currency(transactions: &[FinancingTransaction]) -> FinancingRates {
    let mut sums: BTreeMap<Currency, WeightedSum> = BTreeMap::new();
    for tx in transactions {
        // Currency is normalized on construction; re-normalize for records built by hand.
        sums.entry(Currency::new(tx.currency.as_str()))
            .or_default()
            .add(tx);
    }

    let rates = FinancingRates(
        sums.into_iter()
            .map(|(currency, sum)| (currency, sum.average()))
            .collect(),
    );
    debug!(currencies = rates.len(), "Financing rates aggregated");
    rates
}

/// Principal-weighted TNA of a set of transactions, `None` without principal.
pub fn weighted_rate<'a>(
    transactions: impl IntoIterator<Item = &'a FinancingTransaction>,
) -> Option<Decimal> {
    let mut sum = WeightedSum::default();
    for tx in transactions {
        sum.add(tx);
    }
    (!sum.principal.is_zero()).then(|| sum.average())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FinancingRole;
    use rust_decimal_macros::dec;

    fn tx(currency: &str, principal: Decimal, rate: Decimal) -> FinancingTransaction {
        FinancingTransaction {
            instrument: "PESOS".to_string(),
            principal,
            rate,
            tenor_days: 1,
            currency: Currency::new(currency),
            role: FinancingRole::Lender,
            accrued_interest: dec!(0),
            fees: None,
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(average_rates_by_currency(&[]).is_empty());
    }

    #[test]
    fn rates_are_principal_weighted_per_currency() {
        let rates = average_rates_by_currency(&[
            tx("ARS", dec!(100), dec!(30)),
            tx("ars", dec!(300), dec!(40)),
            tx("USD", dec!(50), dec!(2)),
        ]);

        assert_eq!(rates.len(), 2);
        // (100*30 + 300*40) / 400 = 37.5
        assert_eq!(rates.get(&Currency::new("ARS")), Some(dec!(37.5)));
        assert_eq!(rates.get(&Currency::new("usd")), Some(dec!(2)));
    }

    #[test]
    fn zero_principal_yields_zero_rate() {
        let rates = average_rates_by_currency(&[tx("ARS", dec!(0), dec!(35)), tx("ARS", dec!(0), dec!(40))]);

        assert_eq!(rates.get(&Currency::new("ARS")), Some(dec!(0)));
    }

    #[test]
    fn weighted_rate_is_none_without_principal() {
        let zero = [tx("ARS", dec!(0), dec!(35))];
        assert_eq!(weighted_rate(&zero), None);

        let some = [tx("ARS", dec!(200), dec!(35)), tx("ARS", dec!(200), dec!(45))];
        assert_eq!(weighted_rate(&some), Some(dec!(40)));
    }
}
