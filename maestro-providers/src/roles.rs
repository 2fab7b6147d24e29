//! Agent roles and the model classes they resolve to (spec §4.2).

use std::str::FromStr;

/// The agent roles the Model Dispatcher routes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Planning,
    Research,
    Writing,
    SimplifiedWriting,
    Reflection,
    Messenger,
    NoteAssignment,
    QueryPreparation,
    QueryStrategy,
    Verifier,
    Default,
}

impl AgentRole {
    /// Map a role to the model class it dispatches through, per spec §4.2's
    /// "role -> model class -> concrete model/provider" chain.
    pub fn model_class(self) -> ModelClass {
        match self {
            Self::Planning | Self::Writing | Self::Reflection => ModelClass::Intelligent,
            Self::Research
            | Self::SimplifiedWriting
            | Self::Messenger
            | Self::NoteAssignment
            | Self::QueryPreparation
            | Self::QueryStrategy => ModelClass::Fast,
            Self::Verifier => ModelClass::Verifier,
            Self::Default => ModelClass::Mid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Research => "research",
            Self::Writing => "writing",
            Self::SimplifiedWriting => "simplified_writing",
            Self::Reflection => "reflection",
            Self::Messenger => "messenger",
            Self::NoteAssignment => "note_assignment",
            Self::QueryPreparation => "query_preparation",
            Self::QueryStrategy => "query_strategy",
            Self::Verifier => "verifier",
            Self::Default => "default",
        }
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "planning" => Self::Planning,
            "research" => Self::Research,
            "writing" => Self::Writing,
            "simplified_writing" => Self::SimplifiedWriting,
            "reflection" => Self::Reflection,
            "messenger" => Self::Messenger,
            "note_assignment" => Self::NoteAssignment,
            "query_preparation" => Self::QueryPreparation,
            "query_strategy" => Self::QueryStrategy,
            "verifier" => Self::Verifier,
            "default" => Self::Default,
            other => return Err(format!("unknown agent role: {other}")),
        })
    }
}

/// The four model tiers a role ultimately resolves to a concrete model
/// through (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelClass {
    Fast,
    Mid,
    Intelligent,
    Verifier,
}

impl ModelClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Mid => "mid",
            Self::Intelligent => "intelligent",
            Self::Verifier => "verifier",
        }
    }
}

/// Which provider a concrete model is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenRouter,
    Local,
    Custom,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Local => "local",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "openrouter" => Self::OpenRouter,
            "local" => Self::Local,
            "custom" => Self::Custom,
            other => return Err(format!("unknown provider: {other}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_and_writing_map_to_intelligent() {
        assert_eq!(AgentRole::Planning.model_class(), ModelClass::Intelligent);
        assert_eq!(AgentRole::Writing.model_class(), ModelClass::Intelligent);
        assert_eq!(AgentRole::Reflection.model_class(), ModelClass::Intelligent);
    }

    #[test]
    fn research_and_note_assignment_map_to_fast() {
        assert_eq!(AgentRole::Research.model_class(), ModelClass::Fast);
        assert_eq!(AgentRole::NoteAssignment.model_class(), ModelClass::Fast);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            AgentRole::Planning,
            AgentRole::Research,
            AgentRole::Writing,
            AgentRole::Verifier,
            AgentRole::Default,
        ] {
            assert_eq!(role.as_str().parse::<AgentRole>().unwrap(), role);
        }
    }
}
