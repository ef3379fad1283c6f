use crate::config::ScoringConfig;
use crate::core::{Category, FeatureRecord, PaymentMethod};

/// One triggered rule: the score delta plus a human-readable justification.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub delta: f64,
    pub reason: String,
}

impl RuleHit {
    fn new(delta: f64, reason: &str) -> Self {
        Self {
            delta,
            reason: reason.to_string(),
        }
    }
}

/// A scoring rule that evaluates one aspect of a transaction. `None` means
/// the rule did not fire.
pub trait Rule {
    fn name(&self) -> &str;
    fn evaluate(&self, record: &FeatureRecord, config: &ScoringConfig) -> Option<RuleHit>;
}

/// The fixed rule set in evaluation order. Order matters: `reasons` on the
/// scored record accumulates in this order.
pub fn default_rules() -> Vec<Box<dyn Rule + Send + Sync>> {
    vec![
        Box::new(AmountTierRule),
        Box::new(NightTransactionRule),
        Box::new(CategoryRule),
        Box::new(ForeignLocationRule),
        Box::new(PaymentMethodRule),
        Box::new(EarlyMorningRule),
        Box::new(RoundAmountRule),
    ]
}

// --- Individual Rules ---

/// Amount tiers, mutually exclusive, highest threshold wins.
struct AmountTierRule;
impl Rule for AmountTierRule {
    fn name(&self) -> &str { "amount_tier" }
    fn evaluate(&self, record: &FeatureRecord, config: &ScoringConfig) -> Option<RuleHit> {
        let amount = record.record.amount;
        if amount > config.amount_tier_high {
            Some(RuleHit::new(0.6, "very high transaction amount"))
        } else if amount > config.amount_tier_elevated {
            Some(RuleHit::new(0.4, "high transaction amount"))
        } else if amount > config.amount_tier_notable {
            Some(RuleHit::new(0.2, "elevated transaction amount"))
        } else {
            None
        }
    }
}

struct NightTransactionRule;
impl Rule for NightTransactionRule {
    fn name(&self) -> &str { "night_transaction" }
    fn evaluate(&self, record: &FeatureRecord, _config: &ScoringConfig) -> Option<RuleHit> {
        record
            .is_night_transaction
            .then(|| RuleHit::new(0.3, "night-time transaction"))
    }
}

/// Category risk, mutually exclusive by category. Retail and unknown
/// categories contribute nothing.
struct CategoryRule;
impl Rule for CategoryRule {
    fn name(&self) -> &str { "category" }
    fn evaluate(&self, record: &FeatureRecord, _config: &ScoringConfig) -> Option<RuleHit> {
        match record.record.category {
            Category::Atm => Some(RuleHit::new(0.4, "ATM transaction")),
            Category::Online | Category::ECommerce => {
                Some(RuleHit::new(0.3, "online purchase channel"))
            }
            Category::Gas | Category::Food => {
                Some(RuleHit::new(0.1, "card-present gas/food purchase"))
            }
            _ => None,
        }
    }
}

struct ForeignLocationRule;
impl Rule for ForeignLocationRule {
    fn name(&self) -> &str { "foreign_location" }
    fn evaluate(&self, record: &FeatureRecord, _config: &ScoringConfig) -> Option<RuleHit> {
        record
            .is_foreign
            .then(|| RuleHit::new(0.4, "foreign transaction location"))
    }
}

struct PaymentMethodRule;
impl Rule for PaymentMethodRule {
    fn name(&self) -> &str { "payment_method" }
    fn evaluate(&self, record: &FeatureRecord, _config: &ScoringConfig) -> Option<RuleHit> {
        match record.record.payment_method {
            PaymentMethod::DigitalWallet => Some(RuleHit::new(0.2, "digital wallet payment")),
            PaymentMethod::CreditCard => Some(RuleHit::new(0.15, "credit card payment")),
            _ => None,
        }
    }
}

/// Hours 00-07 inclusive. Overlaps the night-transaction window on purpose:
/// both rules can fire for the same hour and the contributions stack.
struct EarlyMorningRule;
impl Rule for EarlyMorningRule {
    fn name(&self) -> &str { "early_morning" }
    fn evaluate(&self, record: &FeatureRecord, _config: &ScoringConfig) -> Option<RuleHit> {
        (record.hour_of_day <= 7)
            .then(|| RuleHit::new(0.25, "very early morning transaction"))
    }
}

/// Exact multiples of 100 are a weak structuring signal.
struct RoundAmountRule;
impl Rule for RoundAmountRule {
    fn name(&self) -> &str { "round_amount" }
    fn evaluate(&self, record: &FeatureRecord, _config: &ScoringConfig) -> Option<RuleHit> {
        (record.record.amount % 100.0 == 0.0)
            .then(|| RuleHit::new(0.1, "round amount (multiple of 100)"))
    }
}
