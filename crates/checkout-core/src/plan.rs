//! Plan Catalog
//!
//! Static pricing tiers and the billing-cycle price derivation.
//! Prices are `rust_decimal` values in BRL.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Billing period selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    #[serde(alias = "yearly")]
    Annual,
}

impl BillingCycle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Flip between monthly and annual
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Monthly => Self::Annual,
            Self::Annual => Self::Monthly,
        }
    }

    /// Suffix shown after a price ("/month", "/year")
    pub const fn period_label(self) -> &'static str {
        match self {
            Self::Monthly => "month",
            Self::Annual => "year",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "annual" | "yearly" => Ok(Self::Annual),
            other => Err(CheckoutError::InvalidCycle(other.to_string())),
        }
    }
}

/// A subscription pricing tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Display name, also the catalog key
    pub name: String,

    /// One-line pitch
    pub description: String,

    /// Price per month when billed monthly
    pub monthly_price: Decimal,

    /// Price per year when billed annually
    pub annual_price: Decimal,

    /// Struck-through reference price shown next to the offer
    #[serde(default)]
    pub list_price: Option<Decimal>,

    /// Feature bullet points
    pub features: Vec<String>,

    /// Highlighted as "Most Popular"
    #[serde(default)]
    pub popular: bool,
}

impl Plan {
    /// Price charged for the given billing cycle
    pub const fn price_for(&self, cycle: BillingCycle) -> Decimal {
        match cycle {
            BillingCycle::Monthly => self.monthly_price,
            BillingCycle::Annual => self.annual_price,
        }
    }

    /// Amount saved per year by paying annually
    pub fn annual_savings(&self) -> Decimal {
        self.monthly_price * dec!(12) - self.annual_price
    }

    /// Annual savings as a whole percentage of twelve monthly payments
    pub fn annual_savings_percent(&self) -> Decimal {
        let full_year = self.monthly_price * dec!(12);
        if full_year <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.annual_savings() / full_year * dec!(100)).round()
    }

    /// Label of the subscribe button
    pub fn call_to_action(&self) -> &'static str {
        if self.name == "Starter" {
            "Start Free"
        } else {
            "Subscribe Now"
        }
    }
}

/// A plan priced for a specific billing cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanQuote {
    pub plan: Plan,
    pub cycle: BillingCycle,
    pub price: Decimal,
    pub period: &'static str,
}

impl PlanQuote {
    pub fn new(plan: &Plan, cycle: BillingCycle) -> Self {
        Self {
            plan: plan.clone(),
            cycle,
            price: plan.price_for(cycle),
            period: cycle.period_label(),
        }
    }
}

/// Price for a plan under a billing cycle
pub const fn price_for(plan: &Plan, cycle: BillingCycle) -> Decimal {
    plan.price_for(cycle)
}

fn plan(
    name: &str,
    description: &str,
    prices: (Decimal, Decimal, Decimal),
    popular: bool,
    features: &[&str],
) -> Plan {
    let (monthly_price, annual_price, list_price) = prices;
    Plan {
        name: name.into(),
        description: description.into(),
        monthly_price,
        annual_price,
        list_price: Some(list_price),
        features: features.iter().map(|f| (*f).to_string()).collect(),
        popular,
    }
}

static CATALOG: LazyLock<Vec<Plan>> = LazyLock::new(|| {
    vec![
        plan(
            "Starter",
            "Perfect for getting started",
            (dec!(29), dec!(290), dec!(49)),
            false,
            &[
                "Up to 5 projects",
                "Basic analytics",
                "Email support",
                "Standard security",
                "1GB storage",
            ],
        ),
        plan(
            "Professional",
            "Best for growing businesses",
            (dec!(79), dec!(790), dec!(99)),
            true,
            &[
                "Unlimited projects",
                "Advanced analytics",
                "Priority support",
                "Enhanced security",
                "50GB storage",
                "Team collaboration",
                "API access",
            ],
        ),
        plan(
            "Enterprise",
            "For large-scale operations",
            (dec!(199), dec!(1990), dec!(299)),
            false,
            &[
                "Everything in Professional",
                "Custom integrations",
                "24/7 phone support",
                "Enterprise security",
                "Unlimited storage",
                "Advanced team management",
                "SLA guarantee",
                "Dedicated account manager",
            ],
        ),
    ]
});

/// All plans, in display order
pub fn list_plans() -> &'static [Plan] {
    &CATALOG
}

/// Look up a plan by name (case-insensitive)
pub fn find_plan(name: &str) -> Option<&'static Plan> {
    let name = name.trim();
    list_plans()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// The plan flagged as most popular
pub fn popular_plan() -> Option<&'static Plan> {
    list_plans().iter().find(|p| p.popular)
}

/// Every plan quoted for one billing cycle
pub fn quotes(cycle: BillingCycle) -> Vec<PlanQuote> {
    list_plans()
        .iter()
        .map(|p| PlanQuote::new(p, cycle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let names: Vec<_> = list_plans().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Starter", "Professional", "Enterprise"]);
    }

    #[test]
    fn test_price_for_every_plan_and_cycle() {
        for plan in list_plans() {
            assert_eq!(price_for(plan, BillingCycle::Annual), plan.annual_price);
            assert_eq!(price_for(plan, BillingCycle::Monthly), plan.monthly_price);
        }
    }

    #[test]
    fn test_professional_is_popular() {
        let popular = popular_plan().unwrap();
        assert_eq!(popular.name, "Professional");
        assert_eq!(popular.annual_price, dec!(790));
    }

    #[test]
    fn test_find_plan_ignores_case() {
        assert_eq!(find_plan("enterprise").unwrap().monthly_price, dec!(199));
        assert!(find_plan("Platinum").is_none());
    }

    #[test]
    fn test_annual_savings() {
        let starter = find_plan("Starter").unwrap();
        assert_eq!(starter.annual_savings(), dec!(58));
        assert_eq!(starter.annual_savings_percent(), dec!(17));
    }

    #[test]
    fn test_cycle_toggle_and_parse() {
        assert_eq!(BillingCycle::default(), BillingCycle::Monthly);
        assert_eq!(BillingCycle::Monthly.toggle(), BillingCycle::Annual);
        assert_eq!("Yearly".parse::<BillingCycle>().unwrap(), BillingCycle::Annual);
        assert!("weekly".parse::<BillingCycle>().is_err());
    }

    #[test]
    fn test_quotes_follow_cycle() {
        let annual = quotes(BillingCycle::Annual);
        assert_eq!(annual[1].price, dec!(790));
        assert_eq!(annual[1].period, "year");
        assert_eq!(find_plan("Starter").unwrap().call_to_action(), "Start Free");
    }
}
