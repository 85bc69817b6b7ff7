//! Domain entities mirrored from the automation server
//!
//! The [`Roster`] owns every locomotive and switch plus the configured track
//! panels. Server pushes are applied through [`Roster::apply`], which reports
//! exactly the attributes that changed so controllers can refresh only the
//! affected elements.

mod loco;
mod switch;

pub use loco::Loco;
pub use switch::{Switch, SwitchState};

use crate::config::AppConfig;
use crate::protocol::{function_index, ServerEvent};
use crate::switch_group::SwitchGroup;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Locomotive field that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocoField {
    Speed,
    Forward,
    Function(usize),
    Color,
    Slot,
}

/// Switch field that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchField {
    State,
    UserName,
    Inverted,
}

/// One attribute change, as seen by controllers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityChange {
    Loco { address: u32, field: LocoField },
    Switch { name: String, field: SwitchField },
    /// First report of a switch; groups using it may have become complete
    SwitchResolved { name: String },
}

/// A named track panel: the switch groups drawn and bound together
#[derive(Debug, Clone)]
pub struct Panel {
    pub name: String,
    pub groups: Vec<SwitchGroup>,
}

/// All entities known to the surface
#[derive(Debug, Clone, Default)]
pub struct Roster {
    locos: Vec<Loco>,
    switches: HashMap<String, Switch>,
    panels: Vec<Panel>,
}

impl Roster {
    pub fn new(locos: Vec<Loco>, panels: Vec<Panel>) -> Self {
        Self {
            locos,
            switches: HashMap::new(),
            panels,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let locos = config.locos.iter().map(Loco::from_config).collect();
        let mut panels = Vec::with_capacity(config.panels.len());
        for panel in &config.panels {
            let mut groups = Vec::with_capacity(panel.groups.len());
            for (idx, g) in panel.groups.iter().enumerate() {
                let group = SwitchGroup::new(g.kind, g.switches.clone(), g.label.clone())
                    .with_context(|| format!("Invalid group {} in panel '{}'", idx, panel.name))?;
                groups.push(group);
            }
            panels.push(Panel {
                name: panel.name.clone(),
                groups,
            });
        }
        Ok(Self::new(locos, panels))
    }

    pub fn locos(&self) -> &[Loco] {
        &self.locos
    }

    pub fn loco(&self, address: u32) -> Option<&Loco> {
        self.locos.iter().find(|l| l.address() == address)
    }

    pub fn loco_mut(&mut self, address: u32) -> Option<&mut Loco> {
        self.locos.iter_mut().find(|l| l.address() == address)
    }

    pub fn switch(&self, name: &str) -> Option<&Switch> {
        self.switches.get(name)
    }

    pub fn switch_mut(&mut self, name: &str) -> Option<&mut Switch> {
        self.switches.get_mut(name)
    }

    /// Every switch name referenced by a panel, deduplicated, in panel order
    pub fn referenced_switches(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self
            .panels
            .iter()
            .flat_map(|p| p.groups.iter())
            .flat_map(|g| g.members().iter())
        {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Live states of a group's switches, or `None` while any is unresolved
    pub fn group_states(&self, group: &SwitchGroup) -> Option<Vec<SwitchState>> {
        group
            .members()
            .iter()
            .map(|name| self.switches.get(name).map(Switch::state))
            .collect()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn group(&self, panel: usize, group: usize) -> Option<&SwitchGroup> {
        self.panels.get(panel).and_then(|p| p.groups.get(group))
    }

    /// Apply a server push, returning the attributes that actually changed
    pub fn apply(&mut self, event: &ServerEvent) -> Vec<EntityChange> {
        match event {
            ServerEvent::Throttle { address, data } => {
                let Some(loco) = self.loco_mut(*address) else {
                    trace!("Ignoring throttle update for unknown address {}", address);
                    return Vec::new();
                };
                let mut changes = Vec::new();
                for (key, value) in data {
                    let field = match key.as_str() {
                        "speed" => loco.speed.assign_json(value).then_some(LocoField::Speed),
                        "forward" => loco.forward.assign_json(value).then_some(LocoField::Forward),
                        "color" => loco.color.assign_json(value).then_some(LocoField::Color),
                        "slot" => loco.slot.assign_json(value).then_some(LocoField::Slot),
                        other => function_index(other).and_then(|idx| {
                            let function = loco.functions.get_mut(idx)?;
                            function
                                .assign_json(value)
                                .then_some(LocoField::Function(idx))
                        }),
                    };
                    if let Some(field) = field {
                        changes.push(EntityChange::Loco {
                            address: *address,
                            field,
                        });
                    }
                }
                changes
            }
            ServerEvent::Turnout { name, data } => {
                let mut changes = Vec::new();
                if !self.switches.contains_key(name) {
                    debug!("Switch '{}' resolved", name);
                    self.switches.insert(name.clone(), Switch::new(name));
                    changes.push(EntityChange::SwitchResolved { name: name.clone() });
                }
                let Some(switch) = self.switches.get_mut(name) else {
                    return changes;
                };
                for (key, value) in data {
                    let field = match key.as_str() {
                        "state" => switch.state.assign_json(value).then_some(SwitchField::State),
                        "userName" => switch
                            .user_name
                            .assign_json(value)
                            .then_some(SwitchField::UserName),
                        "inverted" => switch
                            .inverted
                            .assign_json(value)
                            .then_some(SwitchField::Inverted),
                        _ => None,
                    };
                    if let Some(field) = field {
                        changes.push(EntityChange::Switch {
                            name: name.clone(),
                            field,
                        });
                    }
                }
                changes
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch_group::GroupKind;
    use serde_json::json;

    fn roster() -> Roster {
        let loco = Loco::from_config(&serde_yaml::from_str("address: 3").unwrap());
        let group = SwitchGroup::new(
            GroupKind::ThreeWay,
            vec!["LT1".into(), "LT2".into()],
            None,
        )
        .unwrap();
        Roster::new(
            vec![loco],
            vec![Panel {
                name: "Yard".into(),
                groups: vec![group],
            }],
        )
    }

    fn turnout(name: &str, state: i64) -> ServerEvent {
        ServerEvent::decode(&json!({"type": "turnout", "data": {"name": name, "state": state}}))
            .unwrap()
    }

    #[test]
    fn test_throttle_update_reports_changed_fields_only() {
        let mut roster = roster();
        let event = ServerEvent::decode(&json!({
            "type": "throttle",
            "data": {"throttle": "L3", "speed": 0.5, "forward": true, "F2": true, "F99": true}
        }))
        .unwrap();
        let mut changes = roster.apply(&event);
        changes.sort_by_key(|c| format!("{:?}", c));
        assert_eq!(
            changes,
            vec![
                EntityChange::Loco { address: 3, field: LocoField::Function(2) },
                EntityChange::Loco { address: 3, field: LocoField::Speed },
            ]
        );
        assert!(roster.apply(&event).is_empty());
    }

    #[test]
    fn test_group_resolves_when_all_switches_reported() {
        let mut roster = roster();
        let group = roster.group(0, 0).unwrap().clone();
        assert!(roster.group_states(&group).is_none());

        let changes = roster.apply(&turnout("LT1", 2));
        assert_eq!(changes[0], EntityChange::SwitchResolved { name: "LT1".into() });
        assert!(roster.group_states(&group).is_none());

        roster.apply(&turnout("LT2", 2));
        assert_eq!(
            roster.group_states(&group),
            Some(vec![SwitchState::Closed, SwitchState::Closed])
        );
    }

    #[test]
    fn test_unknown_loco_is_ignored() {
        let mut roster = roster();
        let event =
            ServerEvent::decode(&json!({"type": "throttle", "data": {"throttle": "L9", "speed": 1.0}}))
                .unwrap();
        assert!(roster.apply(&event).is_empty());
    }

    #[test]
    fn test_referenced_switches_are_deduplicated() {
        let roster = roster();
        assert_eq!(roster.referenced_switches(), vec!["LT1".to_string(), "LT2".to_string()]);
    }
}
