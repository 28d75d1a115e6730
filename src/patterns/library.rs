//! Question template catalog grouped by rhetorical category.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Rhetorical category of a question template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Direct,
    Reflection,
    Excavation,
    Contrast,
    Embodied,
    Hypothetical,
    Challenge,
    Completion,
    Permission,
    Temporal,
    Stakes,
    Binary,
    Reframe,
    Curiosity,
    Silence,
}

impl QuestionCategory {
    /// Every category, in catalog order.
    pub const ALL: [QuestionCategory; 15] = [
        QuestionCategory::Direct,
        QuestionCategory::Reflection,
        QuestionCategory::Excavation,
        QuestionCategory::Contrast,
        QuestionCategory::Embodied,
        QuestionCategory::Hypothetical,
        QuestionCategory::Challenge,
        QuestionCategory::Completion,
        QuestionCategory::Permission,
        QuestionCategory::Temporal,
        QuestionCategory::Stakes,
        QuestionCategory::Binary,
        QuestionCategory::Reframe,
        QuestionCategory::Curiosity,
        QuestionCategory::Silence,
    ];

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Direct => "direct",
            QuestionCategory::Reflection => "reflection",
            QuestionCategory::Excavation => "excavation",
            QuestionCategory::Contrast => "contrast",
            QuestionCategory::Embodied => "embodied",
            QuestionCategory::Hypothetical => "hypothetical",
            QuestionCategory::Challenge => "challenge",
            QuestionCategory::Completion => "completion",
            QuestionCategory::Permission => "permission",
            QuestionCategory::Temporal => "temporal",
            QuestionCategory::Stakes => "stakes",
            QuestionCategory::Binary => "binary",
            QuestionCategory::Reframe => "reframe",
            QuestionCategory::Curiosity => "curiosity",
            QuestionCategory::Silence => "silence",
        }
    }

    /// Template strings for this category. Placeholders are filled downstream.
    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            QuestionCategory::Direct => &[
                "What's the real issue with {specific}?",
                "Which part of {specific} bothers you most?",
                "Where does {specific} hit hardest?",
            ],
            QuestionCategory::Reflection => &[
                "You said \"{quote}\". What sits under that?",
                "When you say \"{quote}\", what do you mean?",
                "Hearing \"{quote}\", what feels most true?",
            ],
            QuestionCategory::Excavation => &[
                "When did {specific} first start feeling this way?",
                "What's underneath {specific}?",
                "Whose voice is behind {specific}?",
            ],
            QuestionCategory::Contrast => &[
                "How is {specific} different from {other}?",
                "What would {other} give you that {specific} doesn't?",
                "Which matters more right now, {specific} or {other}?",
            ],
            QuestionCategory::Embodied => &[
                "Where do you feel {specific} in your body?",
                "What does your gut say about {specific}?",
                "How does your chest feel when {specific} comes up?",
            ],
            QuestionCategory::Hypothetical => &[
                "If {specific} vanished tomorrow, what would you do?",
                "Imagine {specific} is solved. What changed?",
                "If nobody was watching, how would you handle {specific}?",
            ],
            QuestionCategory::Challenge => &[
                "Is {specific} really the problem?",
                "What are you avoiding by focusing on {specific}?",
                "Who benefits from {specific} staying stuck?",
            ],
            QuestionCategory::Completion => &[
                "Finish this: I'd move forward if {specific}...",
                "Complete it: the thing I won't admit about {specific} is...",
                "Fill the blank: {specific} would be easy if...",
            ],
            QuestionCategory::Permission => &[
                "What would you do if you had permission to {specific}?",
                "Who needs to say yes before you {specific}?",
                "What if {specific} is allowed to be messy?",
            ],
            QuestionCategory::Temporal => &[
                "How will {specific} look a year from now?",
                "What did {specific} look like before it got hard?",
                "Which moment made {specific} urgent?",
            ],
            QuestionCategory::Stakes => &[
                "What's at risk if {specific} stays the same?",
                "What do you lose by choosing {specific}?",
                "What's the cost of waiting on {specific}?",
            ],
            QuestionCategory::Binary => &[
                "{specific} or {other}: pick one, right now.",
                "Yes or no: is {specific} worth it?",
                "Keep {specific} or let it go?",
            ],
            QuestionCategory::Reframe => &[
                "What if {specific} is protecting you from something?",
                "What if {specific} is a signal, not a flaw?",
                "How would a friend describe {specific}?",
            ],
            QuestionCategory::Curiosity => &[
                "Tell me more about {specific}.",
                "What's interesting about {specific} to you?",
                "What keeps pulling you back to {specific}?",
            ],
            QuestionCategory::Silence => &[
                "Take a breath. What comes up about {specific}?",
                "Sit with {specific} for a second. What surfaces?",
                "Pause. What's the quietest thought about {specific}?",
            ],
        }
    }
}

impl std::fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown question category: {}", s))
    }
}

/// Conversation depth used to pick allowed question categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStage {
    Surface,
    Exploring,
    Friction,
    Desire,
    Blocker,
    Breakthrough,
}

impl PatternStage {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternStage::Surface => "surface",
            PatternStage::Exploring => "exploring",
            PatternStage::Friction => "friction",
            PatternStage::Desire => "desire",
            PatternStage::Blocker => "blocker",
            PatternStage::Breakthrough => "breakthrough",
        }
    }
}

impl From<Stage> for PatternStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Friction => PatternStage::Friction,
            Stage::Desire => PatternStage::Desire,
            Stage::Blocker => PatternStage::Blocker,
            Stage::Breakthrough => PatternStage::Breakthrough,
        }
    }
}

/// Stage to allowed categories, most preferred first.
pub const STAGE_PATTERNS: &[(PatternStage, &[QuestionCategory])] = &[
    (
        PatternStage::Surface,
        &[
            QuestionCategory::Direct,
            QuestionCategory::Reflection,
            QuestionCategory::Curiosity,
        ],
    ),
    (
        PatternStage::Exploring,
        &[
            QuestionCategory::Excavation,
            QuestionCategory::Embodied,
            QuestionCategory::Temporal,
            QuestionCategory::Curiosity,
        ],
    ),
    (
        PatternStage::Friction,
        &[
            QuestionCategory::Contrast,
            QuestionCategory::Binary,
            QuestionCategory::Stakes,
            QuestionCategory::Excavation,
        ],
    ),
    (
        PatternStage::Desire,
        &[
            QuestionCategory::Hypothetical,
            QuestionCategory::Completion,
            QuestionCategory::Permission,
            QuestionCategory::Reflection,
        ],
    ),
    (
        PatternStage::Blocker,
        &[
            QuestionCategory::Challenge,
            QuestionCategory::Reframe,
            QuestionCategory::Stakes,
            QuestionCategory::Silence,
        ],
    ),
    (
        PatternStage::Breakthrough,
        &[
            QuestionCategory::Reframe,
            QuestionCategory::Completion,
            QuestionCategory::Silence,
        ],
    ),
];

/// Full category list configured for a stage.
pub fn stage_categories(stage: PatternStage) -> &'static [QuestionCategory] {
    STAGE_PATTERNS
        .iter()
        .find(|(s, _)| *s == stage)
        .map(|(_, categories)| *categories)
        .unwrap_or(&[])
}

/// Stage categories minus the ones already used.
///
/// Falls back to the full stage list when everything has been used, so the
/// caller always has at least one option.
pub fn get_available_patterns(
    stage: PatternStage,
    used: &[QuestionCategory],
) -> Vec<QuestionCategory> {
    let all = stage_categories(stage);
    let available: Vec<_> = all.iter().copied().filter(|c| !used.contains(c)).collect();

    if available.is_empty() {
        all.to_vec()
    } else {
        available
    }
}
