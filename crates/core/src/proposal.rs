use serde::{Deserialize, Serialize};

use crate::domain::quote::{IntegrityStatus, QuoteTotals};

/// What the proposal-generation service is allowed to do with a quote.
/// `Refuse` is a normal classification result, not an error; callers must
/// check it and disable proposal creation accordingly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalDecision {
    Proceed,
    ProceedWithWarning { flags: Vec<String> },
    Refuse { flags: Vec<String> },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ProposalGate;

impl ProposalGate {
    pub fn evaluate(totals: &QuoteTotals) -> ProposalDecision {
        match totals.integrity_status {
            IntegrityStatus::Passed => ProposalDecision::Proceed,
            IntegrityStatus::Warning => {
                ProposalDecision::ProceedWithWarning { flags: totals.integrity_flags.clone() }
            }
            IntegrityStatus::Blocked => {
                ProposalDecision::Refuse { flags: totals.integrity_flags.clone() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ProposalDecision, ProposalGate};
    use crate::domain::quote::{IntegrityStatus, QuoteTotals};

    fn totals(status: IntegrityStatus) -> QuoteTotals {
        QuoteTotals {
            total_client_price: Decimal::new(10_000, 0),
            total_vendor_cost: Decimal::new(6_000, 0),
            gross_margin: Decimal::new(4_000, 0),
            gross_margin_percent: Decimal::new(40, 0),
            integrity_status: status,
            integrity_flags: vec!["example".to_string()],
        }
    }

    #[test]
    fn blocked_quotes_refuse_proposal_creation() {
        let decision = ProposalGate::evaluate(&totals(IntegrityStatus::Blocked));
        assert!(matches!(decision, ProposalDecision::Refuse { .. }));
    }

    #[test]
    fn warnings_proceed_with_flags_attached() {
        let decision = ProposalGate::evaluate(&totals(IntegrityStatus::Warning));
        match decision {
            ProposalDecision::ProceedWithWarning { flags } => {
                assert_eq!(flags, vec!["example".to_string()]);
            }
            other => panic!("expected warning decision, got {other:?}"),
        }
    }

    #[test]
    fn passed_quotes_proceed() {
        assert_eq!(
            ProposalGate::evaluate(&totals(IntegrityStatus::Passed)),
            ProposalDecision::Proceed
        );
    }
}
