//! Prompt text for the translation oracle

use crate::types::Context;

/// System message for property-name requests
pub const PROPERTY_SYSTEM_PROMPT: &str =
    "You are a professional Hong Kong real-estate translation expert.";

/// System message for free-text translation
pub const TEXT_SYSTEM_PROMPT: &str = "You are a professional translator. Translate Chinese text \
to English while preserving the meaning, style, and any placeholder tokens (like @@PRO1@@, \
@@LOC1@@ etc.) exactly as they appear.";

/// Rendered when the caller supplied no context
const NO_CONTEXT: &str = "none";

/// Render context entries as `- key: value` lines
pub fn render_context(context: Option<&Context>) -> String {
    let lines: Vec<String> = context
        .map(|ctx| {
            ctx.iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => format!("- {}: {}", key, s),
                    other => format!("- {}: {}", key, other),
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        lines.join("\n")
    }
}

/// Prompt used when the oracle can search the web
pub fn live_search_prompt(name: &str, context: Option<&Context>) -> String {
    format!(
        r#"Use live search to find the official English name of the Hong Kong property "{name}".

Search priorities:
1. The developer's official website or government records
2. Established property agencies (Midland, Centaline, 28Hse)
3. Consistency of the name across authoritative sources

Context:
{context}

Reply with JSON only, in this shape:
{{
  "search_summary": {{
    "official_found": true or false,
    "sources_considered": ["source 1", "source 2"],
    "confidence": 0.0-1.0,
    "search_quality": "high" | "medium" | "low"
  }},
  "translation": {{
    "english": "English name",
    "method": "live_search_official" | "live_search_professional",
    "reason": "basis for the translation and its sources"
  }}
}}

Prefer official or authoritative sources. When sources disagree, choose the most
authoritative one. When no official name exists, propose a professional name that
follows Hong Kong property naming conventions."#,
        name = name,
        context = render_context(context),
    )
}

/// Prompt used when the oracle answers from its own knowledge
pub fn knowledge_prompt(name: &str, context: Option<&Context>) -> String {
    format!(
        r#"Using your own knowledge:

1. Decide whether the Hong Kong property "{name}" has a known official English name.
2. If it does, give that name.
3. If it does not, propose a professional name following Hong Kong property naming conventions.
4. Reply with JSON only, in this shape:

{{
  "search_summary": {{
    "official_found": true or false,
    "sources_considered": ["knowledge_base"],
    "confidence": 0.0-1.0
  }},
  "translation": {{
    "english": "Example Name",
    "method": "knowledge_base" | "professional",
    "reason": "short explanation"
  }}
}}

Context:
{context}"#,
        name = name,
        context = render_context(context),
    )
}

/// User message for free-text translation
pub fn text_translation_prompt(text: &str) -> String {
    format!(
        "Please translate this Chinese text to English, keeping any placeholder tokens unchanged: {}",
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_context() {
        let mut ctx = Context::new();
        ctx.insert("developer".to_string(), json!("新鴻基地產"));
        ctx.insert("units".to_string(), json!(1200));

        let rendered = render_context(Some(&ctx));
        assert!(rendered.contains("- developer: 新鴻基地產"));
        assert!(rendered.contains("- units: 1200"));
    }

    #[test]
    fn test_render_empty_context() {
        assert_eq!(render_context(None), "none");
        assert_eq!(render_context(Some(&Context::new())), "none");
    }

    #[test]
    fn test_prompts_embed_name_and_schema() {
        let live = live_search_prompt("慧安園", None);
        assert!(live.contains("\"慧安園\""));
        assert!(live.contains("\"search_summary\""));
        assert!(live.contains("live_search_official"));

        let knowledge = knowledge_prompt("慧安園", None);
        assert!(knowledge.contains("\"慧安園\""));
        assert!(knowledge.contains("knowledge_base"));
        assert!(!knowledge.contains("live_search"));
    }

    #[test]
    fn test_text_prompt_keeps_placeholders() {
        let prompt = text_translation_prompt("@@PRO1@@位於@@LOC1@@");
        assert!(prompt.ends_with("@@PRO1@@位於@@LOC1@@"));
        assert!(TEXT_SYSTEM_PROMPT.contains("@@PRO1@@"));
    }
}
