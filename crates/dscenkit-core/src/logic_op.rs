//! Logic operator combining a running boolean with a child [`crate::condition::Condition`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    And,
    Or,
    AndNot,
    OrNot,
    Xor,
}

/// Combines `running` with `next` per `op`, short-circuiting the way the
/// original `Condition::Evaluate` does for `And`/`AndNot` (an early `false`
/// return once the running result can no longer change).
pub fn combine(running: bool, op: LogicOp, next: bool) -> bool {
    match op {
        LogicOp::And => running && next,
        LogicOp::Or => running || next,
        LogicOp::AndNot => running && !next,
        LogicOp::OrNot => running || !next,
        LogicOp::Xor => running != next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_truth_table() {
        assert!(!combine(true, LogicOp::Xor, true));
        assert!(combine(true, LogicOp::Xor, false));
        assert!(combine(false, LogicOp::Xor, true));
        assert!(!combine(false, LogicOp::Xor, false));
    }

    #[test]
    fn and_not_short_circuits_logically() {
        assert!(!combine(false, LogicOp::AndNot, false));
        assert!(combine(true, LogicOp::AndNot, false));
    }
}
