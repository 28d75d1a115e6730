//! Session store consumed by the reflection flow.
//!
//! The [`SessionStore`] trait mirrors the actions a UI store exposes
//! (`add_message`, `add_entity`, `show_friction`, ...). [`MemorySessionStore`]
//! keeps the current session in memory; durable persistence is the host's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A chat or voice-transcript message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Kind of extracted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Problem,
    Emotion,
    Value,
    Action,
    Friction,
    Grease,
}

impl EntityType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Problem => "problem",
            EntityType::Emotion => "emotion",
            EntityType::Value => "value",
            EntityType::Action => "action",
            EntityType::Friction => "friction",
            EntityType::Grease => "grease",
        }
    }
}

/// Something extracted from the conversation and shown in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: EntityType,
    pub label: String,
    /// -1.0 (negative) to 1.0 (positive)
    pub valence: f64,
}

impl Entity {
    /// Create an entity with a fresh id; valence is clamped to [-1, 1].
    pub fn new(entity_type: EntityType, label: impl Into<String>, valence: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_type,
            label: label.into(),
            valence: valence.clamp(-1.0, 1.0),
        }
    }
}

/// Directed link between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// Two competing entities grinding against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionPoint {
    pub id: String,
    pub description: String,
    pub entity_ids: Vec<String>,
    /// Set once grease has been applied
    pub grease: Option<String>,
}

/// A delivered breakthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakthrough {
    pub friction: String,
    pub grease: String,
    pub insight: String,
    pub created_at: DateTime<Utc>,
}

/// One reflection session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub entities: Vec<Entity>,
    pub connections: Vec<Connection>,
    pub friction_points: Vec<FrictionPoint>,
    pub messages: Vec<Message>,
    pub breakthroughs: Vec<Breakthrough>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entities: Vec::new(),
            connections: Vec::new(),
            friction_points: Vec::new(),
            messages: Vec::new(),
            breakthroughs: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// User message texts, oldest first.
    pub fn user_history(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .collect()
    }
}

/// Store actions the flow reads and writes through.
pub trait SessionStore: Send {
    /// Open a fresh session, discarding the current one. Returns its id.
    fn start_session(&mut self) -> String;

    /// Current session, if any.
    fn current_session(&self) -> Option<&Session>;

    fn add_message(&mut self, message: Message) -> SessionResult<()>;

    fn add_entity(&mut self, entity: Entity) -> SessionResult<String>;

    fn add_connection(&mut self, connection: Connection) -> SessionResult<()>;

    /// Record a friction point between entities. Returns the friction id.
    fn show_friction(&mut self, description: &str, entity_ids: Vec<String>)
        -> SessionResult<String>;

    fn apply_grease(&mut self, friction_id: &str, grease: &str) -> SessionResult<()>;

    fn trigger_breakthrough(&mut self, breakthrough: Breakthrough) -> SessionResult<()>;
}

/// In-memory [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: Option<Session>,
}

impl MemorySessionStore {
    /// Create a store with an open session.
    pub fn new() -> Self {
        let mut store = Self::default();
        store.start_session();
        store
    }

    fn session_mut(&mut self) -> SessionResult<&mut Session> {
        self.current.as_mut().ok_or(SessionError::NoActiveSession)
    }
}

impl SessionStore for MemorySessionStore {
    fn start_session(&mut self) -> String {
        let session = Session::new();
        let id = session.id.clone();
        info!(session_id = %id, "Session started");
        self.current = Some(session);
        id
    }

    fn current_session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    fn add_message(&mut self, message: Message) -> SessionResult<()> {
        let session = self.session_mut()?;
        debug!(role = ?message.role, len = message.content.len(), "Message added");
        session.messages.push(message);
        Ok(())
    }

    fn add_entity(&mut self, entity: Entity) -> SessionResult<String> {
        let session = self.session_mut()?;
        let id = entity.id.clone();
        debug!(entity_type = entity.entity_type.as_str(), label = %entity.label, "Entity added");
        session.entities.push(entity);
        Ok(id)
    }

    fn add_connection(&mut self, connection: Connection) -> SessionResult<()> {
        let session = self.session_mut()?;
        for id in [&connection.from, &connection.to] {
            if !session.entities.iter().any(|e| &e.id == id) {
                return Err(SessionError::EntityNotFound {
                    entity_id: id.clone(),
                });
            }
        }
        session.connections.push(connection);
        Ok(())
    }

    fn show_friction(
        &mut self,
        description: &str,
        entity_ids: Vec<String>,
    ) -> SessionResult<String> {
        let session = self.session_mut()?;
        let friction = FrictionPoint {
            id: Uuid::new_v4().to_string(),
            description: description.to_string(),
            entity_ids,
            grease: None,
        };
        let id = friction.id.clone();
        info!(friction_id = %id, "Friction shown");
        session.friction_points.push(friction);
        Ok(id)
    }

    fn apply_grease(&mut self, friction_id: &str, grease: &str) -> SessionResult<()> {
        let session = self.session_mut()?;
        let friction = session
            .friction_points
            .iter_mut()
            .find(|f| f.id == friction_id)
            .ok_or_else(|| SessionError::EntityNotFound {
                entity_id: friction_id.to_string(),
            })?;
        friction.grease = Some(grease.to_string());
        Ok(())
    }

    fn trigger_breakthrough(&mut self, breakthrough: Breakthrough) -> SessionResult<()> {
        let session = self.session_mut()?;
        info!(session_id = %session.id, "Breakthrough triggered");
        session.breakthroughs.push(breakthrough);
        Ok(())
    }
}
