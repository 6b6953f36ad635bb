//! Wire packet format exchanged between peers
//!
//! Every datagram is one fixed-size record: a sender-local timestamp followed by
//! a tagged payload, zero-padded to [`PACKET_SIZE`]. The layout is identical on
//! both ends and never negotiated.

use crate::error::WireError;
use crate::fixed::FixedStr;
use crate::world::{ActorState, Appearance, Cell};
use crate::{CELL_NAME_CAPACITY, MODEL_NAME_CAPACITY, PACKET_SIZE, SECRET_CAPACITY, SHORT_NAME_CAPACITY};
use serde::{Deserialize, Serialize};

pub type Secret = FixedStr<SECRET_CAPACITY>;
pub type CellName = FixedStr<CELL_NAME_CAPACITY>;
pub type ModelName = FixedStr<MODEL_NAME_CAPACITY>;
pub type ShortName = FixedStr<SHORT_NAME_CAPACITY>;

/// Movement settings of an actor: where it is heading and turning, not where it is
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl Movement {
    pub fn new(position: [f32; 3], rotation: [f32; 3]) -> Self {
        Self { position, rotation }
    }

    /// Compares the bit patterns, so `-0.0 != 0.0` and identical NaNs are equal
    pub fn bitwise_eq(&self, other: &Movement) -> bool {
        let bits = |values: &[f32; 3]| values.map(f32::to_bits);
        bits(&self.position) == bits(&other.position) && bits(&self.rotation) == bits(&other.rotation)
    }
}

/// Authoritative transform of an entity in its cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl Placement {
    pub fn new(position: [f32; 3], rotation: [f32; 3]) -> Self {
        Self { position, rotation }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementState {
    #[default]
    Idle,
    Walking,
    Running,
    Sneaking,
    Jumping,
    Swimming,
}

/// Sent on every periodic update by both roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterMovement {
    pub secret: Secret,
    pub state: MovementState,
    pub movement: Movement,
    /// Placement applied to the puppet independently of dead-reckoned movement
    pub placement: Placement,
}

/// Everything a peer needs to render and follow a puppet it has never seen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuppetInfo {
    pub secret: Secret,
    pub movement: Movement,
    pub is_exterior: bool,
    pub cell_name: CellName,
    pub placement: Placement,
    pub model: ModelName,
    pub head: ModelName,
    pub hair: ModelName,
    pub race: ShortName,
    pub class: ShortName,
}

impl PuppetInfo {
    /// Describes an actor, failing on any field that does not fit the record
    pub fn describe(
        secret: &str,
        actor: &ActorState,
        cell: &Cell,
        appearance: &Appearance,
    ) -> Result<Self, WireError> {
        let (is_exterior, cell_name) = match cell {
            Cell::Exterior { .. } => (true, CellName::default()),
            Cell::Interior { name } => (false, CellName::new("cell name", name)?),
        };

        Ok(Self {
            secret: Secret::new("secret", secret)?,
            movement: actor.movement,
            is_exterior,
            cell_name,
            placement: actor.placement,
            model: ModelName::new("model", &appearance.model)?,
            head: ModelName::new("head", &appearance.head)?,
            hair: ModelName::new("hair", &appearance.hair)?,
            race: ShortName::new("race", &appearance.race)?,
            class: ShortName::new("class", &appearance.class)?,
        })
    }

    /// Cell the puppet stands in; the received name is bounded before it is read
    pub fn cell(&self) -> Result<Cell, WireError> {
        if self.is_exterior {
            Ok(Cell::exterior_at(&self.placement))
        } else {
            let name = self.cell_name.terminated();
            Ok(Cell::Interior {
                name: name.read("cell name")?.to_string(),
            })
        }
    }

    pub fn appearance(&self) -> Result<Appearance, WireError> {
        Ok(Appearance {
            model: self.model.read("model")?.to_string(),
            head: self.head.read("head")?.to_string(),
            hair: self.hair.read("hair")?.to_string(),
            race: self.race.read("race")?.to_string(),
            class: self.class.read("class")?.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageCode {
    /// There is no puppet on the server with the given secret
    WrongPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    CharacterMovement,
    NewClientRequest,
    AcceptClient,
    OtherMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    CharacterMovement(CharacterMovement),
    NewClientRequest {
        secret: Secret,
    },
    /// `client` is the joining peer's own puppet and doubles as its destination
    AcceptClient {
        client: PuppetInfo,
        host: PuppetInfo,
    },
    OtherMessage {
        code: MessageCode,
    },
}

impl Payload {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Payload::CharacterMovement(_) => PacketType::CharacterMovement,
            Payload::NewClientRequest { .. } => PacketType::NewClientRequest,
            Payload::AcceptClient { .. } => PacketType::AcceptClient,
            Payload::OtherMessage { .. } => PacketType::OtherMessage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Sender-local clock; only ever compared against the same sender
    pub timestamp: u64,
    pub payload: Payload,
}

impl Packet {
    /// Creates an unstamped packet; the transport stamps it when sending
    pub fn new(payload: Payload) -> Self {
        Self {
            timestamp: 0,
            payload,
        }
    }

    pub fn new_client_request(secret: &str) -> Result<Self, WireError> {
        Ok(Self::new(Payload::NewClientRequest {
            secret: Secret::new("secret", secret)?,
        }))
    }

    pub fn packet_type(&self) -> PacketType {
        self.payload.packet_type()
    }

    /// Encodes into exactly [`PACKET_SIZE`] bytes
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut data = bincode::serialize(self)?;
        if data.len() > PACKET_SIZE {
            return Err(WireError::Oversize {
                len: data.len(),
                capacity: PACKET_SIZE,
            });
        }
        data.resize(PACKET_SIZE, 0);
        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() != PACKET_SIZE {
            return Err(WireError::Size {
                expected: PACKET_SIZE,
                actual: data.len(),
            });
        }
        Ok(bincode::deserialize(data)?)
    }
}
