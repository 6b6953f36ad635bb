//! Collaborators the network consumes: the game world and puppet behaviors
//!
//! The network never owns entities. It refers to them by [`EntityRef`] and asks
//! the world to resolve, move, create and place them. [`MemoryWorld`] is a small
//! self-contained world used by the binaries and tests.

use crate::error::{NetworkError, WorldError};
use crate::packet::{Movement, MovementState, Placement};
use crate::session::MovementSource;
use crate::CELL_SIZE;
use log::debug;
use std::collections::HashMap;

/// Identifier of a world entity; the world owns the entity itself
pub type EntityRef = String;

/// Spatial partition an entity lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Exterior { x: i32, y: i32 },
    Interior { name: String },
}

impl Cell {
    /// Maps world coordinates to the exterior cell containing them
    pub fn exterior_at(placement: &Placement) -> Self {
        Cell::Exterior {
            x: (placement.position[0] / CELL_SIZE).floor() as i32,
            y: (placement.position[1] / CELL_SIZE).floor() as i32,
        }
    }

    pub fn is_exterior(&self) -> bool {
        matches!(self, Cell::Exterior { .. })
    }

    pub fn display_name(&self) -> String {
        match self {
            Cell::Exterior { x, y } => format!("Exterior ({}, {})", x, y),
            Cell::Interior { name } => name.clone(),
        }
    }
}

/// NPC record fields needed to render a puppet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appearance {
    pub model: String,
    pub head: String,
    pub hair: String,
    pub race: String,
    pub class: String,
}

/// Live state of a resolved entity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActorState {
    pub placement: Placement,
    pub movement: Movement,
    pub state: MovementState,
}

pub trait World {
    /// The locally controlled character
    fn player(&self) -> EntityRef;

    /// Resolves an entity; `None` once it has been removed or unloaded
    fn actor(&self, entity: &str) -> Option<ActorState>;

    fn cell_of(&self, entity: &str) -> Option<Cell>;

    fn appearance(&self, entity: &str) -> Option<Appearance>;

    fn set_placement(&mut self, entity: &str, placement: Placement) -> Result<(), WorldError>;

    fn set_movement(&mut self, entity: &str, movement: Movement) -> Result<(), WorldError>;

    /// Creates an NPC record and returns its id
    fn create_record(&mut self, appearance: &Appearance) -> String;

    /// Instantiates a record inside a cell
    fn place(
        &mut self,
        record: &str,
        cell: &Cell,
        placement: Placement,
    ) -> Result<EntityRef, WorldError>;

    /// Moves the local viewpoint (the player) to another cell
    fn change_cell(&mut self, cell: &Cell, placement: Placement) -> Result<(), WorldError>;

    fn attach_puppet(&mut self, entity: &str, behavior: PuppetBehavior) -> Result<(), WorldError>;

    /// Deletes an entity created by [`World::place`], behavior included
    fn despawn(&mut self, entity: &str) -> Result<(), WorldError>;
}

/// Behavior tag for an entity driven by a remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuppetBehavior {
    secret: String,
}

impl PuppetBehavior {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Copies the session's latest movement into the entity.
    ///
    /// Returns whether the behavior has completed, which a puppet never does.
    pub fn execute(
        &self,
        entity: &str,
        source: &dyn MovementSource,
        world: &mut dyn World,
    ) -> Result<bool, NetworkError> {
        let movement = source.character_movement(&self.secret)?;
        world.set_movement(entity, movement)?;
        Ok(false)
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub record: String,
    pub cell: Cell,
    pub state: ActorState,
    pub behavior: Option<PuppetBehavior>,
}

/// In-memory world with a single player entity
#[derive(Debug)]
pub struct MemoryWorld {
    records: HashMap<String, Appearance>,
    actors: HashMap<EntityRef, Actor>,
    player: EntityRef,
    next_id: u32,
}

impl MemoryWorld {
    pub fn new(player_appearance: Appearance, cell: Cell, placement: Placement) -> Self {
        let mut world = Self {
            records: HashMap::new(),
            actors: HashMap::new(),
            player: "player".to_string(),
            next_id: 1,
        };

        world
            .records
            .insert("player".to_string(), player_appearance);
        world.actors.insert(
            "player".to_string(),
            Actor {
                record: "player".to_string(),
                cell,
                state: ActorState {
                    placement,
                    ..ActorState::default()
                },
                behavior: None,
            },
        );
        world
    }

    /// Creates a record and places it in one step
    pub fn spawn(&mut self, appearance: &Appearance, cell: &Cell, placement: Placement) -> EntityRef {
        let record = self.create_record(appearance);
        self.insert_actor(record, cell.clone(), placement)
    }

    pub fn remove(&mut self, entity: &str) -> Option<Actor> {
        self.actors.remove(entity)
    }

    pub fn get(&self, entity: &str) -> Option<&Actor> {
        self.actors.get(entity)
    }

    pub fn player_actor(&self) -> Option<&Actor> {
        self.actors.get(&self.player)
    }

    /// Drives the local player as the host application would each frame
    pub fn move_player(&mut self, placement: Placement, movement: Movement, state: MovementState) {
        if let Some(actor) = self.actors.get_mut(&self.player) {
            actor.state = ActorState {
                placement,
                movement,
                state,
            };
        }
    }

    /// Entities carrying a puppet behavior
    pub fn puppets(&self) -> Vec<EntityRef> {
        let mut puppets: Vec<EntityRef> = self
            .actors
            .iter()
            .filter(|(_, actor)| actor.behavior.is_some())
            .map(|(entity, _)| entity.clone())
            .collect();
        puppets.sort();
        puppets
    }

    /// Runs one behavior tick for every puppet; returns how many were updated
    pub fn tick_puppets(&mut self, source: &dyn MovementSource) -> usize {
        let behaviors: Vec<(EntityRef, PuppetBehavior)> = self
            .actors
            .iter()
            .filter_map(|(entity, actor)| {
                actor
                    .behavior
                    .as_ref()
                    .map(|behavior| (entity.clone(), behavior.clone()))
            })
            .collect();

        let mut updated = 0;
        for (entity, behavior) in behaviors {
            match behavior.execute(&entity, source, self) {
                Ok(_) => updated += 1,
                Err(e) => debug!("Puppet {} not updated: {}", entity, e),
            }
        }
        updated
    }

    fn insert_actor(&mut self, record: String, cell: Cell, placement: Placement) -> EntityRef {
        let entity = format!("{}#{}", record, self.next_id);
        self.next_id += 1;

        self.actors.insert(
            entity.clone(),
            Actor {
                record,
                cell,
                state: ActorState {
                    placement,
                    ..ActorState::default()
                },
                behavior: None,
            },
        );
        entity
    }

    fn actor_mut(&mut self, entity: &str) -> Result<&mut Actor, WorldError> {
        self.actors
            .get_mut(entity)
            .ok_or_else(|| WorldError::EntityNotFound(entity.to_string()))
    }
}

impl World for MemoryWorld {
    fn player(&self) -> EntityRef {
        self.player.clone()
    }

    fn actor(&self, entity: &str) -> Option<ActorState> {
        self.actors.get(entity).map(|actor| actor.state)
    }

    fn cell_of(&self, entity: &str) -> Option<Cell> {
        self.actors.get(entity).map(|actor| actor.cell.clone())
    }

    fn appearance(&self, entity: &str) -> Option<Appearance> {
        let actor = self.actors.get(entity)?;
        self.records.get(&actor.record).cloned()
    }

    fn set_placement(&mut self, entity: &str, placement: Placement) -> Result<(), WorldError> {
        self.actor_mut(entity)?.state.placement = placement;
        Ok(())
    }

    fn set_movement(&mut self, entity: &str, movement: Movement) -> Result<(), WorldError> {
        self.actor_mut(entity)?.state.movement = movement;
        Ok(())
    }

    fn create_record(&mut self, appearance: &Appearance) -> String {
        let record = format!("puppet_npc_{}", self.next_id);
        self.next_id += 1;
        self.records.insert(record.clone(), appearance.clone());
        record
    }

    fn place(
        &mut self,
        record: &str,
        cell: &Cell,
        placement: Placement,
    ) -> Result<EntityRef, WorldError> {
        if !self.records.contains_key(record) {
            return Err(WorldError::RecordNotFound(record.to_string()));
        }
        Ok(self.insert_actor(record.to_string(), cell.clone(), placement))
    }

    fn change_cell(&mut self, cell: &Cell, placement: Placement) -> Result<(), WorldError> {
        let player = self.player.clone();
        let actor = self.actor_mut(&player)?;
        actor.cell = cell.clone();
        actor.state.placement = placement;
        Ok(())
    }

    fn attach_puppet(&mut self, entity: &str, behavior: PuppetBehavior) -> Result<(), WorldError> {
        self.actor_mut(entity)?.behavior = Some(behavior);
        Ok(())
    }

    fn despawn(&mut self, entity: &str) -> Result<(), WorldError> {
        if entity == self.player {
            return Err(WorldError::EntityNotFound(entity.to_string()));
        }
        self.actors
            .remove(entity)
            .map(|_| ())
            .ok_or_else(|| WorldError::EntityNotFound(entity.to_string()))
    }
}
