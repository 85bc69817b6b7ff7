//! Track switch (JMRI turnout) entity

use crate::attribute::Attribute;

/// JMRI turnout state codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    Unknown,
    Closed,
    Thrown,
    Inconsistent,
}

impl SwitchState {
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => SwitchState::Closed,
            4 => SwitchState::Thrown,
            8 => SwitchState::Inconsistent,
            _ => SwitchState::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            SwitchState::Unknown => 1,
            SwitchState::Closed => 2,
            SwitchState::Thrown => 4,
            SwitchState::Inconsistent => 8,
        }
    }
}

/// A turnout mirrored from the server
///
/// Only created once the server has reported it; until then every group
/// referencing it is unresolved.
#[derive(Debug, Clone)]
pub struct Switch {
    pub state: Attribute,
    pub user_name: Attribute,
    pub inverted: Attribute,
}

impl Switch {
    /// New switch in the unknown state, named after its system name
    pub fn new(system_name: &str) -> Self {
        Self {
            state: Attribute::new("state", SwitchState::Unknown.code()),
            user_name: Attribute::new("userName", system_name),
            inverted: Attribute::new("inverted", false),
        }
    }

    pub fn state(&self) -> SwitchState {
        self.state
            .as_int()
            .map(SwitchState::from_code)
            .unwrap_or(SwitchState::Unknown)
    }

    /// Write a state locally; returns whether it changed
    pub fn set_state(&mut self, state: SwitchState) -> bool {
        self.state.assign(state.code())
    }
}
