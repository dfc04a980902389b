//! Plan recommendation and pricing rules.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::business::ExpectedVolume;

/// Business size band derived from the employee count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessSize {
    Micro,
    Small,
    Medium,
    Large,
}

/// Map an employee count onto its size band.
///
/// `1..=10` micro, `11..=50` small, `51..=250` medium, `251..` large. Zero is
/// treated as micro so the function stays total.
pub fn get_business_size_category(employee_count: u32) -> BusinessSize {
    match employee_count {
        0..=10 => BusinessSize::Micro,
        11..=50 => BusinessSize::Small,
        51..=250 => BusinessSize::Medium,
        _ => BusinessSize::Large,
    }
}

/// Subscription tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Growth,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Growth => "growth",
            Self::Enterprise => "enterprise",
        }
    }

    /// Monthly list price before any price-variant adjustment.
    pub fn base_monthly_price(self) -> Decimal {
        match self {
            Self::Starter => dec!(29),
            Self::Growth => dec!(79),
            Self::Enterprise => dec!(199),
        }
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "starter" => Ok(Self::Starter),
            "growth" => Ok(Self::Growth),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("Unknown plan '{other}'")),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommend a tier from business size and expected volume.
///
/// High volume always wins, then large businesses, then the micro/low case;
/// everything else lands on growth.
pub fn get_recommended_plan(employee_count: u32, volume: ExpectedVolume) -> PlanTier {
    let size = get_business_size_category(employee_count);
    if volume == ExpectedVolume::High || size == BusinessSize::Large {
        PlanTier::Enterprise
    } else if size == BusinessSize::Micro && volume == ExpectedVolume::Low {
        PlanTier::Starter
    } else {
        PlanTier::Growth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Months actually charged per billing period. Yearly billing gives two
    /// months free.
    pub fn billed_months(self) -> Decimal {
        match self {
            Self::Monthly => dec!(1),
            Self::Yearly => dec!(10),
        }
    }
}

impl FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("Unknown billing cycle '{other}'")),
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional extras purchasable with any plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOn {
    ExtraNumber,
    PrioritySupport,
    AdvancedAnalytics,
    CrmIntegration,
}

impl AddOn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtraNumber => "extra_number",
            Self::PrioritySupport => "priority_support",
            Self::AdvancedAnalytics => "advanced_analytics",
            Self::CrmIntegration => "crm_integration",
        }
    }

    pub fn monthly_price(self) -> Decimal {
        match self {
            Self::ExtraNumber => dec!(15),
            Self::PrioritySupport => dec!(25),
            Self::AdvancedAnalytics => dec!(20),
            Self::CrmIntegration => dec!(30),
        }
    }
}

impl FromStr for AddOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "extra_number" => Ok(Self::ExtraNumber),
            "priority_support" => Ok(Self::PrioritySupport),
            "advanced_analytics" => Ok(Self::AdvancedAnalytics),
            "crm_integration" => Ok(Self::CrmIntegration),
            other => Err(format!("Unknown add-on '{other}'")),
        }
    }
}

/// Pricing experiment bucket, fixed when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceVariant {
    Control,
    Discount,
    Premium,
}

impl PriceVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Discount => "discount",
            Self::Premium => "premium",
        }
    }

    /// Pick a bucket uniformly at random.
    pub fn assign<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => Self::Control,
            1 => Self::Discount,
            _ => Self::Premium,
        }
    }

    fn multiplier(self) -> Decimal {
        match self {
            Self::Control => dec!(1.00),
            Self::Discount => dec!(0.85),
            Self::Premium => dec!(1.15),
        }
    }
}

impl FromStr for PriceVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "control" => Ok(Self::Control),
            "discount" => Ok(Self::Discount),
            "premium" => Ok(Self::Premium),
            other => Err(format!("Unknown price variant '{other}'")),
        }
    }
}

impl fmt::Display for PriceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price breakdown for one billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub plan: PlanTier,
    pub billing_cycle: BillingCycle,
    pub plan_monthly: Decimal,
    pub add_ons_monthly: Decimal,
    pub total: Decimal,
}

/// Price a plan selection. The variant adjusts the plan price only.
pub fn quote(
    plan: PlanTier,
    billing_cycle: BillingCycle,
    add_ons: &[AddOn],
    variant: PriceVariant,
) -> Quote {
    let plan_monthly = (plan.base_monthly_price() * variant.multiplier()).round_dp(2);
    let add_ons_monthly: Decimal = add_ons.iter().map(|a| a.monthly_price()).sum();
    let total = ((plan_monthly + add_ons_monthly) * billing_cycle.billed_months()).round_dp(2);
    Quote {
        plan,
        billing_cycle,
        plan_monthly,
        add_ons_monthly,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn size_category_boundaries() {
        assert_eq!(get_business_size_category(1), BusinessSize::Micro);
        assert_eq!(get_business_size_category(10), BusinessSize::Micro);
        assert_eq!(get_business_size_category(11), BusinessSize::Small);
        assert_eq!(get_business_size_category(50), BusinessSize::Small);
        assert_eq!(get_business_size_category(51), BusinessSize::Medium);
        assert_eq!(get_business_size_category(250), BusinessSize::Medium);
        assert_eq!(get_business_size_category(251), BusinessSize::Large);
        assert_eq!(get_business_size_category(1_000_000), BusinessSize::Large);
    }

    #[test]
    fn size_category_is_monotonic() {
        let mut previous = get_business_size_category(1);
        for n in 2..=1_000 {
            let size = get_business_size_category(n);
            assert!(size >= previous, "size dropped at {n}");
            previous = size;
        }
    }

    #[test]
    fn high_volume_always_enterprise() {
        for n in [1, 3, 10, 11, 50, 51, 250, 251, 10_000] {
            assert_eq!(
                get_recommended_plan(n, ExpectedVolume::High),
                PlanTier::Enterprise,
                "employee_count={n}"
            );
        }
    }

    #[test]
    fn recommendation_table() {
        assert_eq!(get_recommended_plan(5, ExpectedVolume::Low), PlanTier::Starter);
        assert_eq!(get_recommended_plan(5, ExpectedVolume::Medium), PlanTier::Growth);
        assert_eq!(get_recommended_plan(25, ExpectedVolume::Medium), PlanTier::Growth);
        assert_eq!(get_recommended_plan(25, ExpectedVolume::Low), PlanTier::Growth);
        assert_eq!(get_recommended_plan(120, ExpectedVolume::Low), PlanTier::Growth);
        assert_eq!(get_recommended_plan(500, ExpectedVolume::Low), PlanTier::Enterprise);
        assert_eq!(get_recommended_plan(251, ExpectedVolume::Medium), PlanTier::Enterprise);
    }

    #[test]
    fn quote_control_monthly() {
        let q = quote(PlanTier::Growth, BillingCycle::Monthly, &[], PriceVariant::Control);
        assert_eq!(q.plan_monthly, dec!(79));
        assert_eq!(q.total, dec!(79));
    }

    #[test]
    fn quote_discount_yearly_with_add_ons() {
        let q = quote(
            PlanTier::Starter,
            BillingCycle::Yearly,
            &[AddOn::ExtraNumber, AddOn::PrioritySupport],
            PriceVariant::Discount,
        );
        // 29 * 0.85 = 24.65
        assert_eq!(q.plan_monthly, dec!(24.65));
        assert_eq!(q.add_ons_monthly, dec!(40));
        assert_eq!(q.total, dec!(646.50));
    }

    #[test]
    fn quote_premium_rounds_to_cents() {
        let q = quote(PlanTier::Enterprise, BillingCycle::Monthly, &[], PriceVariant::Premium);
        assert_eq!(q.plan_monthly, dec!(228.85));
    }

    #[test]
    fn variant_assignment_covers_all_buckets() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(PriceVariant::assign(&mut rng));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn enum_parsing_matches_serde() {
        for plan in [PlanTier::Starter, PlanTier::Growth, PlanTier::Enterprise] {
            let json = serde_json::to_string(&plan).unwrap();
            assert_eq!(json, format!("\"{plan}\""));
            assert_eq!(plan.as_str().parse::<PlanTier>().unwrap(), plan);
        }
        for add_on in [
            AddOn::ExtraNumber,
            AddOn::PrioritySupport,
            AddOn::AdvancedAnalytics,
            AddOn::CrmIntegration,
        ] {
            let json = serde_json::to_string(&add_on).unwrap();
            assert_eq!(json, format!("\"{}\"", add_on.as_str()));
        }
        assert!("gold".parse::<PlanTier>().is_err());
    }
}
