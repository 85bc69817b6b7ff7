//! Composite track-switch groups
//!
//! A [`SwitchGroup`] maps the live states of 1-5 underlying switches onto the
//! small set of positions an operator picks between on a track panel. The
//! group only stores switch names; states are read from (and written back to)
//! the roster by the caller, so the current position is always a projection
//! of live switch state and never cached.

use crate::element::ColorName;
use crate::entity::SwitchState;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const C: SwitchState = SwitchState::Closed;
const T: SwitchState = SwitchState::Thrown;

/// User-facing position of a switch group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Closed,
    Thrown,
    Left,
    Mid,
    Right,
    Straight,
    Cross,
    TurnWest,
    TurnEast,
    Branch,
    CrossForward,
    CrossBackward,
    Main,
    Passing,
    /// Underlying switches disagree with every named position
    Invalid,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Position::Closed => "closed",
            Position::Thrown => "thrown",
            Position::Left => "left",
            Position::Mid => "mid",
            Position::Right => "right",
            Position::Straight => "straight",
            Position::Cross => "cross",
            Position::TurnWest => "turnWest",
            Position::TurnEast => "turnEast",
            Position::Branch => "branch",
            Position::CrossForward => "crossForward",
            Position::CrossBackward => "crossBackward",
            Position::Main => "main",
            Position::Passing => "passing",
            Position::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Geometry of a switch group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// One plain turnout
    Single,
    /// Left and right turnouts sharing a throat
    ThreeWay,
    /// Both ends of a double slip
    DoubleSlip,
    /// Two turnouts forming a single crossover
    Crossover,
    /// Crossover pair followed by a branch turnout
    CrossoverBranchForward,
    /// Branch turnout followed by a crossover pair
    CrossoverBranchBackward,
    /// Entry and exit turnouts of a passing siding
    MiddlePassing,
    /// Two crossover pairs plus a branch turnout
    DoubleCrossoverBranch,
    /// Three-way turnout with a crossover pair behind it
    ThreeWayCrossover,
}

type PositionTable = &'static [(Position, &'static [SwitchState])];

impl GroupKind {
    /// Number of underlying switches
    pub fn arity(self) -> usize {
        match self {
            GroupKind::Single => 1,
            GroupKind::ThreeWay
            | GroupKind::DoubleSlip
            | GroupKind::Crossover
            | GroupKind::MiddlePassing => 2,
            GroupKind::CrossoverBranchForward | GroupKind::CrossoverBranchBackward => 3,
            GroupKind::ThreeWayCrossover => 4,
            GroupKind::DoubleCrossoverBranch => 5,
        }
    }

    /// Positions in the order a press steps through them
    pub fn cycle(self) -> &'static [Position] {
        use Position::*;
        match self {
            GroupKind::Single => &[Closed, Thrown],
            // From mid the second press lands on right, not back on mid
            GroupKind::ThreeWay => &[Left, Right, Mid],
            GroupKind::DoubleSlip => &[Straight, Cross, TurnWest, TurnEast],
            GroupKind::Crossover => &[Straight, Cross],
            GroupKind::CrossoverBranchForward => &[Straight, Cross, Branch],
            GroupKind::CrossoverBranchBackward => &[Straight, Branch, Cross],
            GroupKind::MiddlePassing => &[Main, Passing],
            GroupKind::DoubleCrossoverBranch => &[Straight, CrossForward, CrossBackward, Branch],
            GroupKind::ThreeWayCrossover => &[Left, Right, Mid, Cross],
        }
    }

    fn table(self) -> PositionTable {
        use Position::*;
        match self {
            GroupKind::Single => &[(Closed, &[C]), (Thrown, &[T])],
            GroupKind::ThreeWay => &[(Left, &[T, C]), (Right, &[C, T]), (Mid, &[C, C])],
            GroupKind::DoubleSlip => &[
                (Straight, &[C, C]),
                (Cross, &[T, T]),
                (TurnWest, &[T, C]),
                (TurnEast, &[C, T]),
            ],
            GroupKind::Crossover => &[(Straight, &[C, C]), (Cross, &[T, T])],
            GroupKind::CrossoverBranchForward => &[
                (Straight, &[C, C, C]),
                (Cross, &[T, T, C]),
                (Branch, &[C, C, T]),
            ],
            GroupKind::CrossoverBranchBackward => &[
                (Straight, &[C, C, C]),
                (Branch, &[T, C, C]),
                (Cross, &[C, T, T]),
            ],
            GroupKind::MiddlePassing => &[(Main, &[C, C]), (Passing, &[T, T])],
            GroupKind::DoubleCrossoverBranch => &[
                (Straight, &[C, C, C, C, C]),
                (CrossForward, &[T, T, C, C, C]),
                (CrossBackward, &[C, C, T, T, C]),
                (Branch, &[C, C, C, C, T]),
            ],
            GroupKind::ThreeWayCrossover => &[
                (Left, &[T, C, C, C]),
                (Right, &[C, T, C, C]),
                (Mid, &[C, C, C, C]),
                (Cross, &[C, C, T, T]),
            ],
        }
    }

    /// Position with every underlying switch closed; `Invalid` recovers to it
    pub fn home(self) -> Position {
        self.table()
            .iter()
            .find(|(_, states)| states.iter().all(|s| *s == C))
            .map(|(pos, _)| *pos)
            .unwrap_or(self.cycle()[0])
    }
}

/// Error building a group from configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("{kind:?} group needs {expected} switches, got {actual}")]
    Arity {
        kind: GroupKind,
        expected: usize,
        actual: usize,
    },
}

/// A switch group as configured on a track panel
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchGroup {
    kind: GroupKind,
    members: Vec<String>,
    label: Option<String>,
}

impl SwitchGroup {
    pub fn new(
        kind: GroupKind,
        members: Vec<String>,
        label: Option<String>,
    ) -> Result<Self, GroupError> {
        if members.len() != kind.arity() {
            return Err(GroupError::Arity {
                kind,
                expected: kind.arity(),
                actual: members.len(),
            });
        }
        Ok(Self {
            kind,
            members,
            label,
        })
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// System names of the underlying switches, in table order
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn label(&self) -> &str {
        self.label
            .as_deref()
            .or_else(|| self.members.first().map(String::as_str))
            .unwrap_or("")
    }

    pub fn contains(&self, switch: &str) -> bool {
        self.members.iter().any(|m| m == switch)
    }

    /// Derive the position from live switch states (same order as `members`)
    pub fn current_position(&self, states: &[SwitchState]) -> Position {
        if states.len() != self.members.len() {
            return Position::Invalid;
        }
        self.kind
            .table()
            .iter()
            .find(|(_, expected)| *expected == states)
            .map(|(pos, _)| *pos)
            .unwrap_or(Position::Invalid)
    }

    /// Next position in the cycle; never `Invalid`
    pub fn next_position(&self, pos: Position) -> Position {
        let cycle = self.kind.cycle();
        match cycle.iter().position(|p| *p == pos) {
            Some(i) => cycle[(i + 1) % cycle.len()],
            None => self.kind.home(),
        }
    }

    /// Display color of a position
    pub fn color(&self, pos: Position) -> ColorName {
        match pos {
            Position::Closed | Position::Straight | Position::Mid | Position::Main => {
                ColorName::Green
            }
            Position::Thrown | Position::Cross | Position::CrossForward => ColorName::Red,
            Position::Left | Position::TurnWest => ColorName::Yellow,
            Position::Right | Position::TurnEast => ColorName::Blue,
            Position::Branch | Position::Passing => ColorName::Orange,
            Position::CrossBackward => ColorName::Purple,
            Position::Invalid => ColorName::Warning,
        }
    }

    /// Switch writes that put the group into `pos`
    ///
    /// Returns `None` for positions this group does not have (including
    /// `Invalid`), so nothing is ever half-written.
    pub fn set_states(&self, pos: Position) -> Option<Vec<(String, SwitchState)>> {
        let (_, states) = self.kind.table().iter().find(|(p, _)| *p == pos)?;
        Some(
            self.members
                .iter()
                .cloned()
                .zip(states.iter().copied())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_KINDS: [GroupKind; 9] = [
        GroupKind::Single,
        GroupKind::ThreeWay,
        GroupKind::DoubleSlip,
        GroupKind::Crossover,
        GroupKind::CrossoverBranchForward,
        GroupKind::CrossoverBranchBackward,
        GroupKind::MiddlePassing,
        GroupKind::DoubleCrossoverBranch,
        GroupKind::ThreeWayCrossover,
    ];

    fn group(kind: GroupKind) -> SwitchGroup {
        let members = (0..kind.arity()).map(|i| format!("LT{}", i + 1)).collect();
        SwitchGroup::new(kind, members, None).unwrap()
    }

    fn states_for(group: &SwitchGroup, pos: Position) -> Vec<SwitchState> {
        group
            .set_states(pos)
            .unwrap()
            .into_iter()
            .map(|(_, s)| s)
            .collect()
    }

    #[test]
    fn test_arity_is_checked() {
        let err = SwitchGroup::new(GroupKind::ThreeWay, vec!["LT1".into()], None).unwrap_err();
        assert_eq!(
            err,
            GroupError::Arity {
                kind: GroupKind::ThreeWay,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_three_way_second_press_from_mid_is_right() {
        let g = group(GroupKind::ThreeWay);
        let first = g.next_position(Position::Mid);
        let second = g.next_position(first);
        assert_eq!((first, second), (Position::Left, Position::Right));
        assert_eq!(g.next_position(second), Position::Mid);
        assert_eq!(GroupKind::ThreeWay.home(), Position::Mid);
    }

    #[test]
    fn test_three_way_positions() {
        let g = group(GroupKind::ThreeWay);
        assert_eq!(g.current_position(&[C, C]), Position::Mid);
        assert_eq!(g.current_position(&[T, C]), Position::Left);
        assert_eq!(g.current_position(&[C, T]), Position::Right);
        assert_eq!(g.current_position(&[T, T]), Position::Invalid);

        assert_eq!(g.next_position(Position::Mid), Position::Left);
        assert_eq!(
            g.set_states(Position::Left).unwrap(),
            vec![("LT1".to_string(), T), ("LT2".to_string(), C)]
        );
    }

    #[test]
    fn test_unknown_state_is_invalid() {
        let g = group(GroupKind::Single);
        assert_eq!(g.current_position(&[SwitchState::Unknown]), Position::Invalid);
        assert_eq!(
            g.current_position(&[SwitchState::Inconsistent]),
            Position::Invalid
        );
        assert_eq!(g.color(Position::Invalid), ColorName::Warning);
    }

    #[test]
    fn test_invalid_recovers_to_home() {
        for kind in ALL_KINDS {
            let g = group(kind);
            let home = g.next_position(Position::Invalid);
            assert_ne!(home, Position::Invalid);
            assert!(states_for(&g, home).iter().all(|s| *s == C), "{:?}", kind);
        }
    }

    #[test]
    fn test_set_states_invalid_writes_nothing() {
        let g = group(GroupKind::DoubleSlip);
        assert!(g.set_states(Position::Invalid).is_none());
        assert!(g.set_states(Position::Left).is_none());
    }

    #[test]
    fn test_every_cycle_position_round_trips_through_states() {
        for kind in ALL_KINDS {
            let g = group(kind);
            for pos in kind.cycle() {
                assert_eq!(g.current_position(&states_for(&g, *pos)), *pos);
            }
        }
    }

    #[test]
    fn test_double_slip_cycle_order() {
        let g = group(GroupKind::DoubleSlip);
        let mut pos = Position::Straight;
        let mut seen = vec![pos];
        for _ in 0..3 {
            pos = g.next_position(pos);
            seen.push(pos);
        }
        assert_eq!(
            seen,
            vec![
                Position::Straight,
                Position::Cross,
                Position::TurnWest,
                Position::TurnEast
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_next_position_cycles_back(kind_idx in 0usize..9, start in 0usize..5) {
            let kind = ALL_KINDS[kind_idx];
            let g = group(kind);
            let cycle = kind.cycle();
            let start = cycle[start % cycle.len()];
            let mut pos = start;
            for _ in 0..cycle.len() {
                pos = g.next_position(pos);
                prop_assert_ne!(pos, Position::Invalid);
            }
            prop_assert_eq!(pos, start);
        }
    }
}
