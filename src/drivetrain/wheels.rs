// Actuator storage addressed by role

use super::roles::{CornerSet, Role};
use crate::error::Result;
use crate::motor::{Actuator, ActuatorState, MotorDriver};

/// The four corner actuators plus the optional auxiliary axis
pub struct Wheels<D> {
    corners: CornerSet<Actuator<D>>,
    auxiliary: Option<Actuator<D>>,
}

impl<D: MotorDriver> Wheels<D> {
    pub fn new(corners: CornerSet<Actuator<D>>, auxiliary: Option<Actuator<D>>) -> Self {
        Self { corners, auxiliary }
    }

    pub fn get(&self, role: Role) -> Option<&Actuator<D>> {
        match role {
            Role::Auxiliary => self.auxiliary.as_ref(),
            corner => self.corners.get(corner),
        }
    }

    pub fn get_mut(&mut self, role: Role) -> Option<&mut Actuator<D>> {
        match role {
            Role::Auxiliary => self.auxiliary.as_mut(),
            corner => self.corners.get_mut(corner),
        }
    }

    /// Every actuator present, corners first
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = Role::CORNERS.to_vec();
        if self.auxiliary.is_some() {
            roles.push(Role::Auxiliary);
        }
        roles
    }

    /// Apply `f` to each actuator in `roles`, stopping at the first error
    pub fn for_each<F>(&mut self, roles: &[Role], mut f: F) -> Result<()>
    where
        F: FnMut(Role, &mut Actuator<D>) -> Result<()>,
    {
        for &role in roles {
            if let Some(actuator) = self.get_mut(role) {
                f(role, actuator)?;
            }
        }
        Ok(())
    }

    /// Poll every actuator in `roles`; true while any of them is still busy.
    ///
    /// All actuators are queried on each call, even after one reports busy.
    pub fn poll_busy(&mut self, roles: &[Role]) -> Result<bool> {
        let mut busy = false;
        self.for_each(roles, |_, actuator| {
            busy |= actuator.is_busy()?;
            Ok(())
        })?;
        Ok(busy)
    }

    pub fn states(&self) -> Vec<(Role, ActuatorState)> {
        self.roles()
            .into_iter()
            .filter_map(|role| self.get(role).map(|a| (role, a.state())))
            .collect()
    }
}
