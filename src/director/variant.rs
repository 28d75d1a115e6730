//! Animation variant selection for the breakthrough cinematic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::{Entity, EntityType};

/// Device rendering capability supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Mid,
    High,
}

impl QualityTier {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Mid => "mid",
            QualityTier::High => "high",
        }
    }

    /// Rough tier from a device class and GPU tier (0-3).
    pub fn detect(is_mobile: bool, gpu_tier: u8) -> Self {
        match (is_mobile, gpu_tier) {
            (_, 0) | (true, 1) => QualityTier::Low,
            (false, 1) | (true, 2) => QualityTier::Mid,
            (true, _) => QualityTier::Mid,
            (false, _) => QualityTier::High,
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "mid" | "medium" => Ok(QualityTier::Mid),
            "high" => Ok(QualityTier::High),
            _ => Err(format!("Unknown quality tier: {}", s)),
        }
    }
}

/// Base cinematic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sequence {
    Shatter,
    Bloom,
    Converge,
    Ignite,
    Unravel,
}

impl Sequence {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sequence::Shatter => "shatter",
            Sequence::Bloom => "bloom",
            Sequence::Converge => "converge",
            Sequence::Ignite => "ignite",
            Sequence::Unravel => "unravel",
        }
    }

    /// Sequence for a breakthrough-type hint, `None` if unrecognized.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.to_lowercase().as_str() {
            "rupture" | "shatter" => Some(Sequence::Shatter),
            "release" | "bloom" => Some(Sequence::Bloom),
            "clarity" | "converge" => Some(Sequence::Converge),
            "action" | "ignite" => Some(Sequence::Ignite),
            "reframe" | "unravel" => Some(Sequence::Unravel),
            _ => None,
        }
    }

    fn for_entity_type(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Problem | EntityType::Friction => Sequence::Shatter,
            EntityType::Emotion => Sequence::Bloom,
            EntityType::Value => Sequence::Converge,
            EntityType::Action => Sequence::Ignite,
            EntityType::Grease => Sequence::Unravel,
        }
    }
}

/// Concrete configuration the renderer plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationVariant {
    pub id: String,
    pub sequence: Sequence,
    pub palette: String,
    pub particle_count: u32,
    /// 0.0 disables bloom
    pub bloom_intensity: f64,
    pub camera_motion: bool,
    pub duration_ms: u64,
}

/// Inputs to variant selection.
#[derive(Debug, Clone, Default)]
pub struct VariantRequest {
    pub entities: Vec<Entity>,
    pub breakthrough_type: Option<String>,
    pub quality_tier: Option<QualityTier>,
    pub reduced_motion: bool,
    pub safe_mode: bool,
}

/// Why a variant could not be selected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VariantError {
    #[error("unknown breakthrough type '{0}'")]
    UnknownBreakthroughType(String),

    #[error("{0}")]
    Other(String),
}

/// Picks the cinematic for a breakthrough.
#[cfg_attr(test, mockall::automock)]
pub trait VariantSelector: Send + Sync {
    fn select(&self, request: &VariantRequest) -> Result<AnimationVariant, VariantError>;
}

/// Built-in selector: base sequence from the dominant entity type (or the
/// hint), palette from average valence, budget from tier and motion settings.
#[derive(Debug, Clone, Default)]
pub struct MutationSelector;

const BASE_DURATION_MS: u64 = 6000;
const REDUCED_DURATION_MS: u64 = 3000;

fn dominant_type(entities: &[Entity]) -> Option<EntityType> {
    let mut counts: HashMap<EntityType, usize> = HashMap::new();
    for entity in entities {
        *counts.entry(entity.entity_type).or_insert(0) += 1;
    }
    // First-seen wins ties so selection is deterministic
    entities
        .iter()
        .map(|e| e.entity_type)
        .fold(None, |best: Option<EntityType>, t| match best {
            Some(b) if counts[&b] >= counts[&t] => Some(b),
            _ => Some(t),
        })
}

fn palette_for(entities: &[Entity]) -> &'static str {
    if entities.is_empty() {
        return "tide";
    }
    let average = entities.iter().map(|e| e.valence).sum::<f64>() / entities.len() as f64;
    if average < -0.3 {
        "ember"
    } else if average > 0.3 {
        "dawn"
    } else {
        "tide"
    }
}

impl VariantSelector for MutationSelector {
    fn select(&self, request: &VariantRequest) -> Result<AnimationVariant, VariantError> {
        let sequence = match request.breakthrough_type.as_deref() {
            Some(hint) => Sequence::from_hint(hint)
                .ok_or_else(|| VariantError::UnknownBreakthroughType(hint.to_string()))?,
            None => dominant_type(&request.entities)
                .map(Sequence::for_entity_type)
                .unwrap_or(Sequence::Converge),
        };

        let tier = if request.safe_mode {
            QualityTier::Low
        } else {
            request.quality_tier.unwrap_or(QualityTier::Mid)
        };

        let (mut particle_count, bloom_intensity) = match tier {
            QualityTier::Low => (400, 0.0),
            QualityTier::Mid => (1500, 0.6),
            QualityTier::High => (4000, 1.0),
        };
        if request.reduced_motion {
            particle_count /= 4;
        }

        let palette = palette_for(&request.entities);

        Ok(AnimationVariant {
            id: format!("{}-{}-{}", sequence.as_str(), palette, tier.as_str()),
            sequence,
            palette: palette.to_string(),
            particle_count,
            bloom_intensity,
            camera_motion: !request.reduced_motion,
            duration_ms: if request.reduced_motion {
                REDUCED_DURATION_MS
            } else {
                BASE_DURATION_MS
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_type: EntityType, valence: f64) -> Entity {
        Entity::new(entity_type, "x", valence)
    }

    #[test]
    fn test_dominant_entity_type_picks_sequence() {
        let request = VariantRequest {
            entities: vec![
                entity(EntityType::Emotion, -0.8),
                entity(EntityType::Emotion, -0.6),
                entity(EntityType::Value, 0.2),
            ],
            quality_tier: Some(QualityTier::High),
            ..Default::default()
        };
        let variant = MutationSelector.select(&request).unwrap();
        assert_eq!(variant.sequence, Sequence::Bloom);
        assert_eq!(variant.palette, "ember");
        assert_eq!(variant.particle_count, 4000);
        assert_eq!(variant.id, "bloom-ember-high");
    }

    #[test]
    fn test_hint_overrides_entities() {
        let request = VariantRequest {
            entities: vec![entity(EntityType::Emotion, 0.5)],
            breakthrough_type: Some("reframe".to_string()),
            ..Default::default()
        };
        assert_eq!(
            MutationSelector.select(&request).unwrap().sequence,
            Sequence::Unravel
        );
    }

    #[test]
    fn test_unknown_hint_is_an_error() {
        let request = VariantRequest {
            breakthrough_type: Some("teleport".to_string()),
            ..Default::default()
        };
        assert_eq!(
            MutationSelector.select(&request),
            Err(VariantError::UnknownBreakthroughType("teleport".to_string()))
        );
    }

    #[test]
    fn test_no_entities_defaults_to_converge() {
        let variant = MutationSelector.select(&VariantRequest::default()).unwrap();
        assert_eq!(variant.sequence, Sequence::Converge);
        assert_eq!(variant.palette, "tide");
    }

    #[test]
    fn test_safe_mode_and_reduced_motion_shrink_budget() {
        let request = VariantRequest {
            quality_tier: Some(QualityTier::High),
            safe_mode: true,
            reduced_motion: true,
            ..Default::default()
        };
        let variant = MutationSelector.select(&request).unwrap();
        assert_eq!(variant.particle_count, 100);
        assert_eq!(variant.bloom_intensity, 0.0);
        assert!(!variant.camera_motion);
        assert_eq!(variant.duration_ms, 3000);
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let entities = vec![
            entity(EntityType::Action, 0.0),
            entity(EntityType::Problem, 0.0),
        ];
        assert_eq!(dominant_type(&entities), Some(EntityType::Action));
    }

    #[test]
    fn test_tier_detection() {
        assert_eq!(QualityTier::detect(true, 1), QualityTier::Low);
        assert_eq!(QualityTier::detect(false, 0), QualityTier::Low);
        assert_eq!(QualityTier::detect(true, 3), QualityTier::Mid);
        assert_eq!(QualityTier::detect(false, 3), QualityTier::High);
        assert_eq!("medium".parse::<QualityTier>().unwrap(), QualityTier::Mid);
    }
}
