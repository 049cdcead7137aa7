//! Model capability types shared by the router and the gateway (spec §3 "Model
//! capability" / "Routing rule").

use std::cmp::Ordering;
use std::str::FromStr;

/// Discrete capability tier, ordered `fast < low < medium < high < ultra` (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Fast,
    Low,
    Medium,
    High,
    Ultra,
}

impl Level {
    /// `fast=1 < low=2 < medium=3 < high=4 < ultra=5` (spec §3).
    pub fn priority(self) -> u8 {
        match self {
            Level::Fast => 1,
            Level::Low => 2,
            Level::Medium => 3,
            Level::High => 4,
            Level::Ultra => 5,
        }
    }

    pub const ALL: [Level; 5] = [
        Level::Fast,
        Level::Low,
        Level::Medium,
        Level::High,
        Level::Ultra,
    ];

    /// Maps a clamped `[0,100]` complexity score to a level via the non-overlapping
    /// bands of spec §4.3 step 4: `fast=[0,20) low=[20,40) medium=[40,60)
    /// high=[60,80) ultra=[80,100]`.
    pub fn from_complexity(score: i32) -> Level {
        let score = score.clamp(0, 100);
        match score {
            0..=19 => Level::Fast,
            20..=39 => Level::Low,
            40..=59 => Level::Medium,
            60..=79 => Level::High,
            _ => Level::Ultra,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Fast => "fast",
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
            Level::Ultra => "ultra",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Level::Fast),
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            "ultra" => Ok(Level::Ultra),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generation parameters a capability level (or a model) may override; merged over
/// global defaults at iteration time (spec §4.2 step 2).
#[derive(Clone, Copy, Debug, Default)]
pub struct GenerationParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
}

impl GenerationParams {
    /// Merges `self` over `defaults`: any field set in `self` wins.
    pub fn merged_over(&self, defaults: &GenerationParams) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
            top_k: self.top_k.or(defaults.top_k),
            top_p: self.top_p.or(defaults.top_p),
            frequency_penalty: self.frequency_penalty.or(defaults.frequency_penalty),
        }
    }
}

/// One registered model's capability row (spec §3).
#[derive(Clone, Debug)]
pub struct ModelCapability {
    pub id: String,
    pub provider: String,
    pub level: Level,
    pub vision: bool,
    pub think: bool,
    pub tool: bool,
    pub params: GenerationParams,
}

impl ModelCapability {
    /// Fully-qualified `"<provider>/<id>"` key (spec §3, §6).
    pub fn key(&self) -> String {
        format!("{}/{}", self.provider, self.id)
    }
}

/// Splits a fully-qualified model key into `(provider, id)`.
///
/// Model ids may themselves contain `/`, so the provider is taken up to the first
/// `/` and everything after is the id (spec §6 "model ids may contain `/`").
pub fn split_model_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_boundaries() {
        assert_eq!(Level::from_complexity(19), Level::Fast);
        assert_eq!(Level::from_complexity(20), Level::Low);
        assert_eq!(Level::from_complexity(59), Level::Medium);
        assert_eq!(Level::from_complexity(60), Level::High);
        assert_eq!(Level::from_complexity(79), Level::High);
        assert_eq!(Level::from_complexity(80), Level::Ultra);
        assert_eq!(Level::from_complexity(100), Level::Ultra);
    }

    #[test]
    fn level_ordering() {
        assert!(Level::Fast < Level::Low);
        assert!(Level::Ultra > Level::High);
    }

    #[test]
    fn split_model_key_keeps_slashes_in_id() {
        assert_eq!(
            split_model_key("openrouter/anthropic/claude-3"),
            Some(("openrouter", "anthropic/claude-3"))
        );
    }
}
