use proptest::prelude::*;

use guild_types::{EngineId, Principal, ProposalId, TokenAmount};

proptest! {
    /// TokenAmount: checked_add(a, b) == Some(a + b) when no overflow.
    #[test]
    fn token_amount_checked_add(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2) {
        let sum = TokenAmount::new(a).checked_add(TokenAmount::new(b));
        prop_assert_eq!(sum, Some(TokenAmount::new(a + b)));
    }

    /// TokenAmount: checked_add detects overflow at the top of the range.
    #[test]
    fn token_amount_checked_add_overflow(b in 1u128..1_000_000) {
        prop_assert!(TokenAmount::new(u128::MAX).checked_add(TokenAmount::new(b)).is_none());
    }

    /// TokenAmount: saturating_sub returns ZERO on underflow.
    #[test]
    fn token_amount_saturating_sub(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = TokenAmount::new(a).saturating_sub(TokenAmount::new(b));
        if b > a {
            prop_assert_eq!(result, TokenAmount::ZERO);
        } else {
            prop_assert_eq!(result, TokenAmount::new(a - b));
        }
    }

    /// ProposalId ordering follows the ledger index.
    #[test]
    fn proposal_id_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(ProposalId::new(a) < ProposalId::new(b), a < b);
        prop_assert_eq!(ProposalId::new(a).as_usize(), usize::try_from(a).ok());
    }

    /// Principal equality is string equality.
    #[test]
    fn principal_equality(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        prop_assert_eq!(Principal::new(a.clone()) == Principal::new(b.clone()), a == b);
    }

    /// EngineId display carries the raw id.
    #[test]
    fn engine_id_display(raw in 0u64..1_000_000) {
        prop_assert_eq!(EngineId::new(raw).to_string(), format!("engine-{}", raw));
    }
}
