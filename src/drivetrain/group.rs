// Symbolic wheel groups
//
// Each drivetrain builds its selector table once at construction. Resolving a
// selector is a map lookup; a selector missing from the table is invalid for
// that drivetrain kind.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::kinematics::KinematicsKind;
use super::roles::Role;
use crate::error::{DriveError, Result};

/// Symbolic actuator group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSelector {
    BackLeft,
    BackRight,
    FrontLeft,
    FrontRight,
    Front,
    Back,
    Left,
    Right,
    /// The four corner wheels
    Drivetrain,
    /// Corners plus the auxiliary axis when present
    All,
    /// Only the auxiliary axis
    Auxiliary,
}

impl GroupSelector {
    pub const ALL_SELECTORS: [GroupSelector; 11] = [
        GroupSelector::BackLeft,
        GroupSelector::BackRight,
        GroupSelector::FrontLeft,
        GroupSelector::FrontRight,
        GroupSelector::Front,
        GroupSelector::Back,
        GroupSelector::Left,
        GroupSelector::Right,
        GroupSelector::Drivetrain,
        GroupSelector::All,
        GroupSelector::Auxiliary,
    ];
}

impl fmt::Display for GroupSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupSelector::BackLeft => "back_left",
            GroupSelector::BackRight => "back_right",
            GroupSelector::FrontLeft => "front_left",
            GroupSelector::FrontRight => "front_right",
            GroupSelector::Front => "front",
            GroupSelector::Back => "back",
            GroupSelector::Left => "left",
            GroupSelector::Right => "right",
            GroupSelector::Drivetrain => "drivetrain",
            GroupSelector::All => "all",
            GroupSelector::Auxiliary => "auxiliary",
        };
        f.write_str(name)
    }
}

/// Pre-built selector -> roles mapping for one drivetrain kind
#[derive(Debug, Clone)]
pub struct GroupTable {
    kinematics: KinematicsKind,
    groups: HashMap<GroupSelector, Vec<Role>>,
}

impl GroupTable {
    pub fn new(kinematics: KinematicsKind) -> Self {
        use GroupSelector as G;
        use Role::*;

        let mut groups = HashMap::new();
        groups.insert(G::BackLeft, vec![BackLeft]);
        groups.insert(G::BackRight, vec![BackRight]);
        groups.insert(G::FrontLeft, vec![FrontLeft]);
        groups.insert(G::FrontRight, vec![FrontRight]);
        groups.insert(G::Front, vec![FrontLeft, FrontRight]);
        groups.insert(G::Back, vec![BackLeft, BackRight]);
        groups.insert(G::Left, vec![BackLeft, FrontLeft]);
        groups.insert(G::Right, vec![BackRight, FrontRight]);
        groups.insert(G::Drivetrain, Role::CORNERS.to_vec());

        if kinematics.has_auxiliary() {
            let mut all = Role::CORNERS.to_vec();
            all.push(Auxiliary);
            groups.insert(G::All, all);
            groups.insert(G::Auxiliary, vec![Auxiliary]);
        } else {
            groups.insert(G::All, Role::CORNERS.to_vec());
        }

        Self { kinematics, groups }
    }

    pub fn kinematics(&self) -> KinematicsKind {
        self.kinematics
    }

    /// Roles named by `selector`, in a fixed order
    pub fn resolve(&self, selector: GroupSelector) -> Result<&[Role]> {
        self.groups
            .get(&selector)
            .map(Vec::as_slice)
            .ok_or(DriveError::InvalidSelector {
                selector,
                kinematics: self.kinematics,
            })
    }
}
