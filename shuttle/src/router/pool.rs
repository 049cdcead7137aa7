//! `ModelPool` — the capability-tagged registry of models the router chooses from.
//!
//! Stable order is provider insertion order, then model insertion order within a
//! provider (spec §4.3 "Selection within a level"); a `Vec` preserves that for free.

use crate::model::{Level, ModelCapability};

#[derive(Default)]
pub struct ModelPool {
    models: Vec<ModelCapability>,
}

impl ModelPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: ModelCapability) {
        self.models.push(capability);
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelCapability> {
        self.models.iter()
    }

    pub fn any_vision(&self) -> bool {
        self.models.iter().any(|m| m.vision)
    }

    /// Models at exactly `level` passing the optional capability filters, in
    /// stable registration order.
    pub fn at_level(&self, level: Level, require_vision: bool, require_tool: bool) -> Vec<&ModelCapability> {
        self.models
            .iter()
            .filter(|m| m.level == level)
            .filter(|m| !require_vision || m.vision)
            .filter(|m| !require_tool || m.tool)
            .collect()
    }

    /// All models passing the optional capability filters, regardless of level.
    pub fn filtered(&self, require_vision: bool, require_tool: bool) -> Vec<&ModelCapability> {
        self.models
            .iter()
            .filter(|m| !require_vision || m.vision)
            .filter(|m| !require_tool || m.tool)
            .collect()
    }

    /// Selects the candidate at `level` (first in stable order), or — if none
    /// qualify — the nearest-level fallback per spec §4.3 "Selection within a
    /// level": prefer `diff >= 0` (equal/higher) when `max`, else `diff <= 0`
    /// (equal/lower); among the preferred subset pick the smallest `|diff|`; if
    /// the preferred subset is empty, pick the global extreme (highest for `max`,
    /// lowest otherwise).
    pub fn select(
        &self,
        level: Level,
        require_vision: bool,
        require_tool: bool,
        max: bool,
    ) -> Option<&ModelCapability> {
        let at_level = self.at_level(level, require_vision, require_tool);
        if let Some(first) = at_level.first() {
            return Some(first);
        }

        let all = self.filtered(require_vision, require_tool);
        if all.is_empty() {
            return None;
        }

        let target_priority = level.priority() as i32;
        let preferred: Vec<&ModelCapability> = all
            .iter()
            .copied()
            .filter(|m| {
                let diff = m.level.priority() as i32 - target_priority;
                if max {
                    diff >= 0
                } else {
                    diff <= 0
                }
            })
            .collect();

        if !preferred.is_empty() {
            return preferred
                .into_iter()
                .min_by_key(|m| (m.level.priority() as i32 - target_priority).abs());
        }

        // Nothing on the preferred side: fall back to the global extreme.
        if max {
            all.into_iter().max_by_key(|m| m.level.priority())
        } else {
            all.into_iter().min_by_key(|m| m.level.priority())
        }
    }

    /// Vision-capable models whose level is nearest `target`, ties broken by
    /// higher level when `max`, lower otherwise (spec §4.3 step 1).
    pub fn select_vision_nearest(&self, target: Level, max: bool) -> Option<&ModelCapability> {
        let vision_models: Vec<&ModelCapability> = self.models.iter().filter(|m| m.vision).collect();
        if vision_models.is_empty() {
            return None;
        }
        let target_priority = target.priority() as i32;
        vision_models.into_iter().min_by(|a, b| {
            let da = (a.level.priority() as i32 - target_priority).abs();
            let db = (b.level.priority() as i32 - target_priority).abs();
            match da.cmp(&db) {
                std::cmp::Ordering::Equal => {
                    // Tie: prefer higher level when max, lower otherwise.
                    if max {
                        b.level.cmp(&a.level)
                    } else {
                        a.level.cmp(&b.level)
                    }
                }
                other => other,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationParams;

    fn cap(id: &str, provider: &str, level: Level, vision: bool, tool: bool) -> ModelCapability {
        ModelCapability {
            id: id.into(),
            provider: provider.into(),
            level,
            vision,
            think: false,
            tool,
            params: GenerationParams::default(),
        }
    }

    #[test]
    fn max_true_with_no_ultra_returns_highest() {
        let mut pool = ModelPool::new();
        pool.register(cap("a", "p", Level::Fast, false, true));
        pool.register(cap("b", "p", Level::High, false, true));
        let chosen = pool.select(Level::Ultra, false, false, true).unwrap();
        assert_eq!(chosen.id, "b");
    }

    #[test]
    fn max_false_with_no_candidate_at_or_below_target_returns_lowest() {
        let mut pool = ModelPool::new();
        pool.register(cap("a", "p", Level::High, false, true));
        pool.register(cap("b", "p", Level::Ultra, false, true));
        let chosen = pool.select(Level::Fast, false, false, false).unwrap();
        assert_eq!(chosen.id, "a");
    }

    #[test]
    fn exact_level_match_wins_over_fallback() {
        let mut pool = ModelPool::new();
        pool.register(cap("a", "p", Level::Medium, false, true));
        let chosen = pool.select(Level::Medium, false, false, false).unwrap();
        assert_eq!(chosen.id, "a");
    }
}
