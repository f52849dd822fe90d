//! Per-head fare splitting
//!
//! Pure integer functions, no I/O, no time dependency.
//!
//! Collections round up so the group is never short-collected; refunds
//! round down so the group is never over-refunded. The rounding
//! remainder is an accepted one-sided cost in both directions.

use wallet_core::Money;

/// Per-head share of an amount to collect, rounded up
///
/// `head_count <= 0` yields zero.
pub fn split_collect(amount: Money, head_count: usize) -> Money {
    if head_count == 0 || !amount.is_positive() {
        return Money::ZERO;
    }
    amount.div_ceil(head_count as i64)
}

/// Per-head share of an amount to refund, rounded down
///
/// `head_count <= 0` yields zero.
pub fn split_refund(amount: Money, head_count: usize) -> Money {
    if head_count == 0 || !amount.is_positive() {
        return Money::ZERO;
    }
    amount.div_floor(head_count as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(v: i64) -> Money {
        Money::from_minor(v)
    }

    #[test]
    fn test_split_collect_rounds_up() {
        assert_eq!(split_collect(m(100), 3), m(34));
        assert_eq!(split_collect(m(9000), 3), m(3000));
        assert_eq!(split_collect(m(1), 2), m(1));
    }

    #[test]
    fn test_split_refund_rounds_down() {
        assert_eq!(split_refund(m(100), 3), m(33));
        assert_eq!(split_refund(m(9000), 3), m(3000));
        assert_eq!(split_refund(m(1), 2), m(0));
    }

    #[test]
    fn test_zero_heads() {
        assert_eq!(split_collect(m(100), 0), m(0));
        assert_eq!(split_refund(m(100), 0), m(0));
    }

    #[test]
    fn test_zero_amount() {
        assert_eq!(split_collect(m(0), 3), m(0));
        assert_eq!(split_refund(m(0), 3), m(0));
    }

    proptest! {
        /// Sum of per-head collections always covers the amount.
        #[test]
        fn prop_collect_never_short(amount in 0i64..1_000_000_000, heads in 1usize..64) {
            let per_head = split_collect(m(amount), heads);
            prop_assert!(per_head.minor() * heads as i64 >= amount);
            // Surplus is bounded by one unit short of a full head count
            prop_assert!(per_head.minor() * heads as i64 - amount < heads as i64);
        }

        /// Sum of per-head refunds never exceeds the amount.
        #[test]
        fn prop_refund_never_over(amount in 0i64..1_000_000_000, heads in 1usize..64) {
            let per_head = split_refund(m(amount), heads);
            prop_assert!(per_head.minor() * heads as i64 <= amount);
            prop_assert!(amount - per_head.minor() * (heads as i64) < heads as i64);
        }
    }
}
