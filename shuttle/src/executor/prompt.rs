//! System-prompt assembly (spec §4.2 "Assembly"): identity/skills block plus the
//! ReAct system prompt templated with the current tool catalog, injected at
//! iteration 0 of the loop.

use crate::tools::ToolSpec;

/// The injected system-prompt parts the host process supplies per turn: the base
/// identity/behavior prompt, skills that are always inlined in full, and summaries
/// of the rest of the skill catalog for progressive disclosure (spec §4.2 "Inputs").
#[derive(Clone, Debug, Default)]
pub struct SystemPromptParts {
    pub base: String,
    pub always_skills: Vec<String>,
    pub skill_catalog: Vec<String>,
}

impl SystemPromptParts {
    /// Renders `(1) system block = base prompt + always-skills + skill catalog`
    /// (spec §4.2 Assembly step 1).
    pub fn render(&self) -> String {
        let mut out = self.base.clone();
        for skill in &self.always_skills {
            out.push_str("\n\n");
            out.push_str(skill);
        }
        if !self.skill_catalog.is_empty() {
            out.push_str("\n\nAvailable skills (invoke by name when relevant):\n");
            for summary in &self.skill_catalog {
                out.push_str("- ");
                out.push_str(summary);
                out.push('\n');
            }
        }
        out
    }
}

const REACT_TEMPLATE: &str = "Respond with a single JSON object of the form \
{\"thought\": <your reasoning>, \"action\": <tool name or \"finish\">, \"action_input\": <input for the action>}. \
Use \"finish\" once you have the final answer; action_input is then the answer itself. \
Do not call any tool not listed below.\n\nAvailable tools:\n";

/// Renders the ReAct system prompt templated with the current tool catalog
/// (spec §4.2 Assembly: "injected at iteration 0 of the loop").
pub fn react_system_prompt(tools: &[ToolSpec]) -> String {
    let mut out = String::from(REACT_TEMPLATE);
    for tool in tools {
        out.push_str("- ");
        out.push_str(&tool.name);
        if let Some(desc) = &tool.description {
            out.push_str(": ");
            out.push_str(desc);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_base_then_always_skills_then_catalog() {
        let parts = SystemPromptParts {
            base: "You are an assistant.".to_string(),
            always_skills: vec!["Skill A full text.".to_string()],
            skill_catalog: vec!["skill-b: does b things".to_string()],
        };
        let rendered = parts.render();
        assert!(rendered.starts_with("You are an assistant."));
        assert!(rendered.contains("Skill A full text."));
        assert!(rendered.contains("skill-b: does b things"));
    }

    #[test]
    fn react_prompt_lists_tool_names() {
        let tools = vec![ToolSpec {
            name: "shell_exec".to_string(),
            description: Some("run a command".to_string()),
            input_schema: serde_json::json!({}),
        }];
        let rendered = react_system_prompt(&tools);
        assert!(rendered.contains("shell_exec: run a command"));
        assert!(rendered.contains("\"action\""));
    }
}
