//! Routing rules and the complexity scorer (spec §4.3 steps 3–5).

use crate::model::Level;

/// `{keywords[], minLength?, maxLength?, level, priority}` (spec §3).
#[derive(Clone, Debug)]
pub struct RoutingRule {
    pub keywords: Vec<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub level: Level,
    pub priority: i32,
}

impl RoutingRule {
    fn matches(&self, content: &str, len: usize) -> bool {
        if let Some(min) = self.min_length {
            if len < min {
                return false;
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return false;
            }
        }
        if self.keywords.is_empty() {
            return true;
        }
        let lower = content.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
    }
}

/// Scoring weights for the complexity heuristic (spec §6 `routing.*`).
#[derive(Clone, Copy, Debug)]
pub struct RoutingWeights {
    pub base_score: i32,
    pub length_weight: i32,
    pub code_block_score: i32,
    pub tool_call_score: i32,
    pub multi_turn_score: i32,
}

impl Default for RoutingWeights {
    fn default() -> Self {
        Self {
            base_score: 10,
            length_weight: 3,
            code_block_score: 35,
            tool_call_score: 15,
            multi_turn_score: 2,
        }
    }
}

/// Bilingual keyword set flagging requests that likely need a tool call (spec
/// §4.3 step 5). Curated, not exhaustive — false negatives degrade gracefully
/// to a model without `tool=true`, which still has a chance to answer in text.
const TOOL_NEED_KEYWORDS: &[&str] = &[
    "run", "execute", "shell", "command", "install", "download", "search the web",
    "fetch", "read the file", "write to", "list files", "ls ", "curl", "http://",
    "https://", "browse",
    "执行", "运行", "安装", "下载", "搜索", "查找文件", "读取文件", "写入文件", "列出文件", "抓取", "爬取",
];

/// Sorts `rules` by descending priority and returns the level of the first rule
/// whose keywords intersect `content` (case-insensitive) and whose length
/// bounds are satisfied (spec §4.3 step 3).
pub fn first_matching_rule_level(rules: &[RoutingRule], content: &str) -> Option<Level> {
    let len = content.chars().count();
    let mut ordered: Vec<&RoutingRule> = rules.iter().collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
    ordered.iter().find(|r| r.matches(content, len)).map(|r| r.level)
}

/// Complexity score in `[0,100]` (spec §4.3 step 4).
pub fn complexity_score(content: &str, num_turns: usize, weights: RoutingWeights) -> i32 {
    let len = content.chars().count() as i32;
    let mut score = weights.base_score;
    score += ((len / 100) * weights.length_weight).min(20);
    if content.contains('`') {
        score += weights.code_block_score;
    }
    if needs_tool(content) {
        score += weights.tool_call_score;
    }
    score += ((num_turns as i32) * weights.multi_turn_score).min(10);
    score.clamp(0, 100)
}

/// Whether `content` plausibly requires a tool call (spec §4.3 step 5).
pub fn needs_tool(content: &str) -> bool {
    let lower = content.to_lowercase();
    TOOL_NEED_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_priority_breaks_ties() {
        let rules = vec![
            RoutingRule {
                keywords: vec!["refactor".into()],
                min_length: None,
                max_length: None,
                level: Level::Low,
                priority: 1,
            },
            RoutingRule {
                keywords: vec!["refactor".into()],
                min_length: None,
                max_length: None,
                level: Level::High,
                priority: 10,
            },
        ];
        assert_eq!(first_matching_rule_level(&rules, "please refactor this"), Some(Level::High));
    }

    #[test]
    fn code_block_and_length_push_score_up() {
        let weights = RoutingWeights::default();
        let long_code = format!("```\n{}\n```", "x".repeat(800));
        let score = complexity_score(&long_code, 0, weights);
        assert!(score >= 60, "score was {score}");
    }

    #[test]
    fn short_plain_message_scores_low() {
        let score = complexity_score("你好", 0, RoutingWeights::default());
        assert!(score < 20, "score was {score}");
    }
}
