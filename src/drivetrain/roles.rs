// Wheel roles and the canonical four-corner set

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::motor::{Actuator, MotorDriver};

/// Position of an actuator on the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    BackLeft,
    BackRight,
    FrontLeft,
    FrontRight,
    /// Perpendicular lateral axis, only on holonomic-with-auxiliary bases
    Auxiliary,
}

impl Role {
    /// Corner roles in canonical order
    pub const CORNERS: [Role; 4] = [
        Role::BackLeft,
        Role::BackRight,
        Role::FrontLeft,
        Role::FrontRight,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::BackLeft => "back_left",
            Role::BackRight => "back_right",
            Role::FrontLeft => "front_left",
            Role::FrontRight => "front_right",
            Role::Auxiliary => "auxiliary",
        };
        f.write_str(name)
    }
}

/// One value per corner wheel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerSet<T> {
    pub back_left: T,
    pub back_right: T,
    pub front_left: T,
    pub front_right: T,
}

impl<T> CornerSet<T> {
    pub fn new(back_left: T, back_right: T, front_left: T, front_right: T) -> Self {
        Self {
            back_left,
            back_right,
            front_left,
            front_right,
        }
    }

    /// Same value on every corner
    pub fn splat(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(value.clone(), value.clone(), value.clone(), value)
    }

    pub fn get(&self, role: Role) -> Option<&T> {
        match role {
            Role::BackLeft => Some(&self.back_left),
            Role::BackRight => Some(&self.back_right),
            Role::FrontLeft => Some(&self.front_left),
            Role::FrontRight => Some(&self.front_right),
            Role::Auxiliary => None,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> Option<&mut T> {
        match role {
            Role::BackLeft => Some(&mut self.back_left),
            Role::BackRight => Some(&mut self.back_right),
            Role::FrontLeft => Some(&mut self.front_left),
            Role::FrontRight => Some(&mut self.front_right),
            Role::Auxiliary => None,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> CornerSet<U> {
        CornerSet {
            back_left: f(self.back_left),
            back_right: f(self.back_right),
            front_left: f(self.front_left),
            front_right: f(self.front_right),
        }
    }

    /// Values in canonical role order
    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        [
            (Role::BackLeft, &self.back_left),
            (Role::BackRight, &self.back_right),
            (Role::FrontLeft, &self.front_left),
            (Role::FrontRight, &self.front_right),
        ]
        .into_iter()
    }
}

impl<D: MotorDriver> CornerSet<Actuator<D>> {
    /// Assign roles by sorting actuator names.
    ///
    /// Sorted positions 0..3 become back-left, back-right, front-left and
    /// front-right. Names such as `backLeft`/`backRight`/`frontLeft`/
    /// `frontRight` sort into that order; names that don't will silently
    /// land on the wrong corner, so prefer [`CornerSet::new`].
    pub fn sorted_by_name(actuators: [Actuator<D>; 4]) -> Self {
        let mut actuators = actuators;
        actuators.sort_by(|a, b| a.compare_by_name(b));
        let [back_left, back_right, front_left, front_right] = actuators;
        Self::new(back_left, back_right, front_left, front_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::SimMotor;

    const NAMES: [&str; 4] = ["backLeft", "backRight", "frontLeft", "frontRight"];

    fn permutations(items: [&'static str; 4]) -> Vec<[&'static str; 4]> {
        let mut out = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let mut seen = [false; 4];
                        if idx.iter().all(|&i| !std::mem::replace(&mut seen[i], true)) {
                            out.push(idx.map(|i| items[i]));
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_sorted_by_name_any_permutation() {
        let perms = permutations(NAMES);
        assert_eq!(perms.len(), 24);

        for names in perms {
            let actuators = names.map(|n| Actuator::new(n, SimMotor::new()));
            let corners = CornerSet::sorted_by_name(actuators);
            let order: Vec<&str> = corners.iter().map(|(_, a)| a.name()).collect();
            assert_eq!(order, NAMES, "input order {:?}", names);
        }
    }

    #[test]
    fn test_get_by_role() {
        let set = CornerSet::new(1, 2, 3, 4);
        assert_eq!(set.get(Role::BackLeft), Some(&1));
        assert_eq!(set.get(Role::FrontRight), Some(&4));
        assert_eq!(set.get(Role::Auxiliary), None);
    }

    #[test]
    fn test_map_preserves_roles() {
        let set = CornerSet::new(1, -2, 3, -4).map(|v| v * 10);
        assert_eq!(set, CornerSet::new(10, -20, 30, -40));
    }
}
