//! Entity identity and registration.
//!
//! Two entity kinds are tracked: mobile agents (robots) and manipulable items.
//! Each kind has its own dense id space, assigned in registration order and
//! never reused while a session lives.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable identifier of a registered agent.
///
/// # Examples
///
/// ```
/// use rewindable::AgentId;
///
/// let id = AgentId::new(0);
/// assert_eq!(id.index(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates an agent id from its raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a registered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u32);

impl ItemId {
    /// Creates an item id from its raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape class of a warehouse item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Cardboard box, the default.
    #[default]
    Box,
    /// Drum or barrel.
    Cylinder,
    /// Ball.
    Sphere,
    /// Level-specific item.
    Special,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box => write!(f, "box"),
            Self::Cylinder => write!(f, "cylinder"),
            Self::Sphere => write!(f, "sphere"),
            Self::Special => write!(f, "special"),
        }
    }
}

/// Where an item belongs, and how close counts as "there".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Target slot position.
    pub target: Vec3,
    /// Maximum distance from `target` that still counts as placed.
    pub tolerance: f32,
}

impl Placement {
    /// Creates a placement.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NegativeTolerance` if `tolerance` is negative or NaN.
    pub fn new(target: Vec3, tolerance: f32) -> Result<Self, ValidationError> {
        validate_tolerance(tolerance)?;
        Ok(Self { target, tolerance })
    }

    /// True when `position` lies within tolerance of the target (inclusive).
    #[must_use]
    pub fn contains(&self, position: Vec3) -> bool {
        position.distance(self.target) <= self.tolerance
    }
}

pub(crate) fn validate_tolerance(tolerance: f32) -> Result<(), ValidationError> {
    if tolerance.is_nan() || tolerance < 0.0 {
        return Err(ValidationError::NegativeTolerance { value: tolerance });
    }
    Ok(())
}

/// Static description of a registered item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Shape class, used for counts and display.
    pub kind: ItemKind,
    /// Where the item has to end up.
    pub placement: Placement,
}

/// Registration bookkeeping for both entity kinds.
///
/// The registry owns id assignment. Removing an entity does not free its id:
/// the counter only grows, so a removed id can never alias a newer entity.
#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    agents: BTreeSet<AgentId>,
    items: BTreeMap<ItemId, ItemSpec>,
    next_agent: u32,
    next_item: u32,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent under the next free id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IdSpaceExhausted` once every agent id was handed out.
    pub fn register_agent(&mut self) -> Result<AgentId, ValidationError> {
        let id = AgentId(self.next_agent);
        self.insert_agent(id)?;
        Ok(id)
    }

    /// Register an agent under an id chosen by the host.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateEntity` if the id is live and
    /// `ValidationError::IdSpaceExhausted` for `u32::MAX`, which would leave
    /// no id for the next registration.
    pub fn insert_agent(&mut self, id: AgentId) -> Result<(), ValidationError> {
        if self.agents.contains(&id) {
            return Err(ValidationError::DuplicateEntity {
                kind: "agent",
                id: id.0,
            });
        }
        let next = id
            .0
            .checked_add(1)
            .ok_or(ValidationError::IdSpaceExhausted { kind: "agent" })?;
        self.next_agent = self.next_agent.max(next);
        self.agents.insert(id);
        Ok(())
    }

    /// Register a new item under the next free id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IdSpaceExhausted` once every item id was handed out.
    pub fn register_item(&mut self, spec: ItemSpec) -> Result<ItemId, ValidationError> {
        let id = ItemId(self.next_item);
        self.insert_item(id, spec)?;
        Ok(id)
    }

    /// Register an item under an id chosen by the host.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateEntity` if the id is live and
    /// `ValidationError::IdSpaceExhausted` for `u32::MAX`.
    pub fn insert_item(&mut self, id: ItemId, spec: ItemSpec) -> Result<(), ValidationError> {
        if self.items.contains_key(&id) {
            return Err(ValidationError::DuplicateEntity {
                kind: "item",
                id: id.0,
            });
        }
        let next = id
            .0
            .checked_add(1)
            .ok_or(ValidationError::IdSpaceExhausted { kind: "item" })?;
        self.next_item = self.next_item.max(next);
        self.items.insert(id, spec);
        Ok(())
    }

    /// Remove an agent. Returns false if it was not registered.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        self.agents.remove(&id)
    }

    /// Remove an item. Returns its spec if it was registered.
    pub fn remove_item(&mut self, id: ItemId) -> Option<ItemSpec> {
        self.items.remove(&id)
    }

    /// True if the agent is registered.
    #[must_use]
    pub fn contains_agent(&self, id: AgentId) -> bool {
        self.agents.contains(&id)
    }

    /// True if the item is registered.
    #[must_use]
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Static description of a registered item.
    #[must_use]
    pub fn item_spec(&self, id: ItemId) -> Option<&ItemSpec> {
        self.items.get(&id)
    }

    pub(crate) fn item_spec_mut(&mut self, id: ItemId) -> Result<&mut ItemSpec, ValidationError> {
        self.items
            .get_mut(&id)
            .ok_or(ValidationError::UnknownItem { id })
    }

    /// Registered agents in ascending id order.
    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.iter().copied()
    }

    /// Registered items in ascending id order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &ItemSpec)> + '_ {
        self.items.iter().map(|(id, spec)| (*id, spec))
    }

    /// Number of registered agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of registered items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of registered items of the given kind.
    #[must_use]
    pub fn count_items_by_kind(&self, kind: ItemKind) -> usize {
        self.items.values().filter(|spec| spec.kind == kind).count()
    }

    /// Forget every entity and restart both id spaces at zero.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
