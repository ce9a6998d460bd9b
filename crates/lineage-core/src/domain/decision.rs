//! Decision model: what a traversal step does after its record is stored.
//!
//! `decide` is a pure function of the task, the freshly built record and the
//! store claim. Side effects (enqueueing children) are executed by the worker.

use serde::Serialize;

use super::{AncestorRecord, DiscoveryTask};

/// Result of a write-if-absent against the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Claim {
    /// This write stored the record.
    Stored,
    /// A record already existed under the key; nothing was written.
    AlreadyExisted,
}

impl Claim {
    pub fn already_existed(self) -> bool {
        matches!(self, Claim::AlreadyExisted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The person is a root of the lineage.
    NoParents,
    /// The key was already claimed by a prior or concurrent traversal.
    AlreadyExplored,
    /// `record.level >= maximum_level`.
    DepthExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Terminal(TerminalReason),

    /// One child task per known parent, father first.
    FanOut(Vec<DiscoveryTask>),
}

impl Decision {
    pub fn is_fan_out(&self) -> bool {
        matches!(self, Decision::FanOut(_))
    }

    pub fn children(&self) -> &[DiscoveryTask] {
        match self {
            Decision::FanOut(children) => children.as_slice(),
            Decision::Terminal(_) => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Terminal(TerminalReason::NoParents) => "terminal.no_parents",
            Decision::Terminal(TerminalReason::AlreadyExplored) => "terminal.already_explored",
            Decision::Terminal(TerminalReason::DepthExhausted) => "terminal.depth_exhausted",
            Decision::FanOut(_) => "fan_out",
        }
    }
}

/// Termination protocol. The checks run in this order:
/// 1. no known parents
/// 2. key already existed
/// 3. depth budget exhausted
pub fn decide(task: &DiscoveryTask, record: &AncestorRecord, claim: Claim) -> Decision {
    if !record.has_parents() {
        return Decision::Terminal(TerminalReason::NoParents);
    }
    if claim.already_existed() {
        return Decision::Terminal(TerminalReason::AlreadyExplored);
    }
    if record.level >= task.maximum_level {
        return Decision::Terminal(TerminalReason::DepthExhausted);
    }
    Decision::FanOut(
        record
            .parent_ids()
            .map(|parent| task.child(parent, record.level))
            .collect(),
    )
}

/// Status reported to the invoking host.
///
/// Failures other than the depth ceiling are not a `Completion`: the task is
/// left unacknowledged and the queue redelivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Done(Decision),
    Rejected { requested: u32 },
}

impl Completion {
    pub fn status_code(&self) -> u16 {
        match self {
            Completion::Done(_) => 200,
            Completion::Rejected { .. } => 401,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AncestorId;
    use rstest::rstest;

    fn task(level: u32, maximum_level: u32) -> DiscoveryTask {
        DiscoveryTask {
            ancestor_id: AncestorId::new(1640524),
            level,
            maximum_level,
        }
    }

    fn record(task: &DiscoveryTask, parents: bool) -> AncestorRecord {
        AncestorRecord {
            id: task.ancestor_id,
            level: task.record_level(),
            first_name: "charles".into(),
            last_name: "de gaulle".into(),
            html_source: String::new(),
            father_id: parents.then_some(AncestorId::new(3481126)),
            mother_id: parents.then_some(AncestorId::new(3481008)),
        }
    }

    #[test]
    fn fan_out_carries_depth_and_budget() {
        let t = task(0, 2);
        let r = record(&t, true);
        let decision = decide(&t, &r, Claim::Stored);

        let children = decision.children();
        assert_eq!(children.len(), 2);
        for child in children {
            assert_eq!(child.level, r.level);
            assert_eq!(child.level, t.level + 1);
            assert_eq!(child.maximum_level, t.maximum_level);
        }
        assert_eq!(children[0].ancestor_id, AncestorId::new(3481126));
        assert_eq!(children[1].ancestor_id, AncestorId::new(3481008));
    }

    #[rstest]
    #[case::stored(Claim::Stored)]
    #[case::already_existed(Claim::AlreadyExisted)]
    fn no_parents_wins_over_every_other_check(#[case] claim: Claim) {
        let t = task(0, 16);
        let r = record(&t, false);
        assert_eq!(
            decide(&t, &r, claim),
            Decision::Terminal(TerminalReason::NoParents)
        );
    }

    #[test]
    fn existing_key_stops_the_branch_even_with_budget_left() {
        let t = task(0, 16);
        let r = record(&t, true);
        assert_eq!(
            decide(&t, &r, Claim::AlreadyExisted),
            Decision::Terminal(TerminalReason::AlreadyExplored)
        );
    }

    #[rstest]
    #[case::at_limit(1, 2)]
    #[case::single_level(0, 1)]
    #[case::zero_budget(0, 0)]
    #[case::past_limit(5, 3)]
    fn depth_budget_exhausted(#[case] level: u32, #[case] maximum_level: u32) {
        let t = task(level, maximum_level);
        let r = record(&t, true);
        assert_eq!(
            decide(&t, &r, Claim::Stored),
            Decision::Terminal(TerminalReason::DepthExhausted)
        );
    }

    #[test]
    fn single_known_parent_yields_one_child() {
        let t = task(0, 3);
        let mut r = record(&t, true);
        r.mother_id = None;
        let decision = decide(&t, &r, Claim::Stored);
        assert_eq!(decision.children().len(), 1);
    }

    #[test]
    fn bounded_depth_for_every_budget() {
        // Walk a chain where every record has parents: fan-out must stop at maximum_level.
        for maximum_level in 1..=crate::domain::MAX_DEPTH_CEILING {
            let mut current = task(0, maximum_level);
            let mut steps = 0;
            loop {
                let r = record(&current, true);
                match decide(&current, &r, Claim::Stored) {
                    Decision::FanOut(children) => {
                        assert!(children[0].level < maximum_level);
                        current = children[0];
                        steps += 1;
                    }
                    Decision::Terminal(reason) => {
                        assert_eq!(reason, TerminalReason::DepthExhausted);
                        break;
                    }
                }
            }
            assert_eq!(steps, maximum_level - 1);
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            Completion::Done(Decision::Terminal(TerminalReason::NoParents)).status_code(),
            200
        );
        assert_eq!(Completion::Rejected { requested: 17 }.status_code(), 401);
    }
}
