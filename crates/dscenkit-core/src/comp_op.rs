//! Comparison operator and the coercion rules used to evaluate it.
//!
//! Grounded in the original `CompOp.cpp`: try integer comparison first,
//! fall back to double comparison, then fall back to lexicographic
//! string comparison. `Defined` never looks at the other two operands
//! and answers only whether both sides are simultaneously empty or
//! simultaneously non-empty.

use serde::{Deserialize, Serialize};

/// One of the comparison operators a [`crate::condition::PropertyCondition`]
/// or [`crate::condition::FeatureCondition`] can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompOp {
    Equal,
    Different,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Defined,
}

/// Evaluates `lhs <op> rhs` with the coercion rules described in
/// [`CompOp`]'s module docs.
pub fn compare(lhs: &str, op: CompOp, rhs: &str) -> bool {
    if op == CompOp::Defined {
        return lhs.is_empty() == rhs.is_empty();
    }

    if let (Ok(a), Ok(b)) = (lhs.parse::<i64>(), rhs.parse::<i64>()) {
        return compare_ord(a.cmp(&b), op);
    }

    if let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        return match op {
            CompOp::Equal => a == b,
            CompOp::Different => a != b,
            CompOp::Greater => a > b,
            CompOp::GreaterOrEqual => a >= b,
            CompOp::Less => a < b,
            CompOp::LessOrEqual => a <= b,
            CompOp::Defined => unreachable!(),
        };
    }

    compare_ord(lhs.cmp(rhs), op)
}

fn compare_ord(ord: std::cmp::Ordering, op: CompOp) -> bool {
    use std::cmp::Ordering::*;
    match op {
        CompOp::Equal => ord == Equal,
        CompOp::Different => ord != Equal,
        CompOp::Greater => ord == Greater,
        CompOp::GreaterOrEqual => ord != Less,
        CompOp::Less => ord == Less,
        CompOp::LessOrEqual => ord != Greater,
        CompOp::Defined => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert!(compare("10", CompOp::Greater, "9"));
        assert!(compare("10", CompOp::Greater, "-9"));
        assert!(compare("2", CompOp::Less, "10"));
    }

    #[test]
    fn double_coercion() {
        assert!(compare("1.5", CompOp::Greater, "1.25"));
        assert!(compare("1.5", CompOp::Equal, "1.50"));
    }

    #[test]
    fn lexicographic_fallback() {
        assert!(compare("a", CompOp::Less, "b"));
        assert!(compare("apple", CompOp::Less, "banana"));
    }

    #[test]
    fn defined_only_checks_emptiness() {
        assert!(!compare("", CompOp::Defined, "x"));
        assert!(compare("", CompOp::Defined, ""));
        assert!(compare("x", CompOp::Defined, "y"));
    }

    #[test]
    fn mixed_numeric_and_string_falls_back_to_lexicographic() {
        // "abc" is not numeric, so the whole pair falls back to string compare.
        assert!(compare("10", CompOp::Less, "abc"));
    }
}
