//! Role-and-scope authorization
//!
//! Every actor carries a [`Role`] and, for scoped roles, the id of the
//! region, sub-region or unit they are responsible for. An
//! [`AuthorizationGate`] turns that into the two answers the service layer
//! needs: is the actor an administrator, and may they manage a given unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{PersonId, UnitRef};

/// What an actor is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages every unit
    Master,
    /// Manages the units of one region
    RegionalAdmin,
    /// Manages the units of one sub-region
    SubRegionalLead,
    /// Manages a single unit
    UnitLead,
    /// Plays services; may mark own unavailability and trade own slots
    Organist,
    /// Read-only
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::RegionalAdmin => "regional_admin",
            Self::SubRegionalLead => "sub_regional_lead",
            Self::UnitLead => "unit_lead",
            Self::Organist => "organist",
            Self::Viewer => "viewer",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Master | Self::RegionalAdmin | Self::SubRegionalLead | Self::UnitLead
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "master" => Ok(Self::Master),
            "regional_admin" | "admin_regional" => Ok(Self::RegionalAdmin),
            "sub_regional_lead" | "encarregado_sub_regional" => Ok(Self::SubRegionalLead),
            "unit_lead" | "encarregado_comum" => Ok(Self::UnitLead),
            "organist" | "organista" => Ok(Self::Organist),
            "viewer" | "visualizador" => Ok(Self::Viewer),
            _ => Err(Error::validation(format!("unknown role '{s}'"))),
        }
    }
}

/// The person performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: PersonId,
    pub name: String,
    pub role: Role,
    /// Region, sub-region or unit id the role applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: PersonId::new(id),
            name: name.into(),
            role,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Viewers never write
    pub fn can_write(&self) -> bool {
        self.role != Role::Viewer
    }

    fn scope_is(&self, id: &str) -> bool {
        self.scope.as_deref() == Some(id)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

/// Answers authorization questions for the service layer
pub trait AuthorizationGate: Send + Sync {
    /// Whether `actor` holds management rights over `unit`
    fn can_manage(&self, unit: &UnitRef, actor: &Actor) -> bool;

    fn is_admin(&self, actor: &Actor) -> bool;
}

/// Role plus hierarchy scope matching
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeGate;

impl AuthorizationGate for ScopeGate {
    fn can_manage(&self, unit: &UnitRef, actor: &Actor) -> bool {
        match actor.role {
            Role::Master => true,
            Role::RegionalAdmin => actor.scope_is(&unit.region_id),
            Role::SubRegionalLead => actor.scope_is(&unit.sub_region_id),
            Role::UnitLead => actor.scope_is(&unit.unit_id),
            Role::Organist | Role::Viewer => false,
        }
    }

    fn is_admin(&self, actor: &Actor) -> bool {
        actor.role.is_admin()
    }
}

/// Fail with an authorization error unless `actor` may manage `unit`
pub fn require_manage(gate: &dyn AuthorizationGate, unit: &UnitRef, actor: &Actor) -> Result<()> {
    if gate.can_manage(unit, actor) {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "{actor} may not manage unit {unit}"
        )))
    }
}

/// Fail with an authorization error for read-only actors
pub fn require_write(actor: &Actor) -> Result<()> {
    if actor.can_write() {
        Ok(())
    } else {
        Err(Error::unauthorized(format!("{actor} is read-only")))
    }
}
