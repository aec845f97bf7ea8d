//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::calendar::{HolidayCalendar, SettlementConvention};
use crate::error::CalendarError;
use crate::records::{Currency, ScheduleFeeResolver};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Settlement ===
    /// `next_business_day` or `t+N`.
    #[serde(default = "default_settlement_convention")]
    pub settlement_convention: String,

    /// Market identifier passed to the calendar.
    #[serde(default = "default_market")]
    pub market: String,

    /// Comma-separated `YYYY-MM-DD` market holidays.
    #[serde(default)]
    pub market_holidays: Vec<String>,

    // === Pricing ===
    /// Units of nominal per quoted price (100 for bonds and letras).
    #[serde(default = "default_quote_base")]
    pub quote_base: Decimal,

    /// Day-count denominator for interest accrual.
    #[serde(default = "default_day_count_basis")]
    pub day_count_basis: u32,

    /// Currency assumed for records that carry none.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    // === Fee Schedule (fractions, 0.001 = 0.1%) ===
    /// Broker commission on traded notional.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// Market rights on notional or financed principal.
    #[serde(default = "default_market_rights_rate")]
    pub market_rights_rate: Decimal,

    /// Annualized guarantee expense on financed principal.
    #[serde(default)]
    pub guarantee_rate: Decimal,

    /// Annualized broker commission on financed principal.
    #[serde(default = "default_financing_commission_rate")]
    pub financing_commission_rate: Decimal,

    /// Tax applied over every expense.
    #[serde(default = "default_expenses_tax_rate")]
    pub expenses_tax_rate: Decimal,

    // === Execution ===
    /// Evaluate groups on the rayon pool.
    #[serde(default)]
    pub parallel: bool,

    /// Merge same-price legs before classification.
    #[serde(default = "default_true")]
    pub consolidate_legs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON.
    #[serde(default)]
    pub log_json: bool,
}

fn default_settlement_convention() -> String {
    "next_business_day".to_string()
}

fn default_market() -> String {
    "BYMA".to_string()
}

fn default_quote_base() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_day_count_basis() -> u32 {
    365
}

fn default_currency() -> String {
    "ARS".to_string()
}

fn default_commission_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}

fn default_market_rights_rate() -> Decimal {
    Decimal::new(1, 4) // 0.01%
}

fn default_financing_commission_rate() -> Decimal {
    Decimal::new(15, 4) // 0.15% annualized
}

fn default_expenses_tax_rate() -> Decimal {
    Decimal::new(21, 2) // 21%
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settlement_convention: default_settlement_convention(),
            market: default_market(),
            market_holidays: Vec::new(),
            quote_base: default_quote_base(),
            day_count_basis: default_day_count_basis(),
            default_currency: default_currency(),
            commission_rate: default_commission_rate(),
            market_rights_rate: default_market_rights_rate(),
            guarantee_rate: Decimal::ZERO,
            financing_commission_rate: default_financing_commission_rate(),
            expenses_tax_rate: default_expenses_tax_rate(),
            parallel: false,
            consolidate_legs: true,
            rust_log: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        self.settlement()?;

        if self.market.trim().is_empty() {
            return Err("MARKET is required".to_string());
        }

        if self.quote_base <= Decimal::ZERO {
            return Err("QUOTE_BASE must be positive".to_string());
        }

        if self.day_count_basis == 0 {
            return Err("DAY_COUNT_BASIS must be positive".to_string());
        }

        if self.default_currency.trim().is_empty() {
            return Err("DEFAULT_CURRENCY is required".to_string());
        }

        let rates = [
            ("COMMISSION_RATE", self.commission_rate),
            ("MARKET_RIGHTS_RATE", self.market_rights_rate),
            ("GUARANTEE_RATE", self.guarantee_rate),
            ("FINANCING_COMMISSION_RATE", self.financing_commission_rate),
            ("EXPENSES_TAX_RATE", self.expenses_tax_rate),
        ];
        for (name, rate) in rates {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(format!("{name} must be in [0, 1)"));
            }
        }

        self.calendar().map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Parsed settlement convention.
    pub fn settlement(&self) -> Result<SettlementConvention, String> {
        self.settlement_convention.parse()
    }

    /// Market calendar built from the holiday list.
    pub fn calendar(&self) -> Result<HolidayCalendar, CalendarError> {
        HolidayCalendar::from_strings(&self.market_holidays)
    }

    /// Normalized default currency.
    pub fn currency(&self) -> Currency {
        Currency::new(&self.default_currency)
    }

    /// Fee resolver for the configured schedule.
    pub fn fee_resolver(&self) -> ScheduleFeeResolver {
        ScheduleFeeResolver {
            commission_rate: self.commission_rate,
            market_rights_rate: self.market_rights_rate,
            guarantee_rate: self.guarantee_rate,
            financing_commission_rate: self.financing_commission_rate,
            expenses_tax_rate: self.expenses_tax_rate,
            quote_base: self.quote_base,
            day_count_basis: self.day_count_basis,
        }
    }
}
