//! Prompt templates for response analysis.
//!
//! The live prompts come from the prompt store. The defaults here are used to
//! seed a fresh store and in tests.

use crate::types::Prompt;

/// Default system prompt.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a competitive-intelligence analyst.
You read answers produced by AI assistants and report, as strict JSON, how a
specific company is represented in them. Only report what the answer states.
Never wrap the JSON in prose."#;

/// Default user prompt template.
pub const ANALYSIS_USER_PROMPT: &str = r#"Analyse the AI answer below for the company "{company_name}".

Known competitors (one per line):
{competitors}

Answer:
"""
{response_text}
"""

Output JSON:
{
    "companyMentioned": true | false,
    "mentionedCompanies": ["every company named in the answer, in order of appearance"],
    "rankList": "the ranked list as written in the answer, or null if the answer does not rank",
    "rankingPosition": 1-based integer position of {company_name} in that list, or null,
    "sentimentScore": number between -1 and 1 describing tone toward {company_name}, or null,
    "solutionAnalysis": {"hasFeature": "YES" | "NO" | "N/A"} or null
}

Rules:
- rankingPosition must be an integer or null, never a string
- If {company_name} is not mentioned, companyMentioned is false and rankingPosition is null"#;

/// Placeholder for the raw answer text.
pub const RESPONSE_TEXT_PLACEHOLDER: &str = "{response_text}";

/// Placeholder for the analysed company's name.
pub const COMPANY_NAME_PLACEHOLDER: &str = "{company_name}";

/// Placeholder for the newline-joined competitor list.
pub const COMPETITORS_PLACEHOLDER: &str = "{competitors}";

/// Fill the user template.
///
/// Substitution is single-pass over the template, so placeholder text inside
/// the response itself is left alone.
pub fn format_user_prompt(
    template: &str,
    response_text: &str,
    company_name: &str,
    competitors: &[String],
) -> String {
    let competitors_text = competitors.join("\n");
    let placeholders = [
        (RESPONSE_TEXT_PLACEHOLDER, response_text),
        (COMPANY_NAME_PLACEHOLDER, company_name),
        (COMPETITORS_PLACEHOLDER, competitors_text.as_str()),
    ];

    let mut out = String::with_capacity(template.len() + response_text.len());
    let mut rest = template;

    'outer: while !rest.is_empty() {
        for (placeholder, value) in &placeholders {
            if let Some(tail) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Default prompt pair under the given names, for seeding a store.
pub fn default_prompts(system_name: &str, user_name: &str) -> Vec<Prompt> {
    vec![
        Prompt::new(system_name, ANALYSIS_SYSTEM_PROMPT),
        Prompt::new(user_name, ANALYSIS_USER_PROMPT),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_user_prompt_fills_all_placeholders() {
        let prompt = format_user_prompt(
            ANALYSIS_USER_PROMPT,
            "Top CRMs: 1. Beta 2. Acme",
            "Acme",
            &["Beta".to_string(), "Gamma".to_string()],
        );

        assert!(prompt.contains("Top CRMs: 1. Beta 2. Acme"));
        assert!(prompt.contains("\"Acme\""));
        assert!(prompt.contains("Beta\nGamma"));
        assert!(!prompt.contains(RESPONSE_TEXT_PLACEHOLDER));
        assert!(!prompt.contains(COMPANY_NAME_PLACEHOLDER));
        assert!(!prompt.contains(COMPETITORS_PLACEHOLDER));
    }

    #[test]
    fn test_placeholders_in_response_are_not_expanded() {
        let prompt = format_user_prompt(
            "[{response_text}] for {company_name}",
            "literal {company_name} here",
            "Acme",
            &[],
        );
        assert_eq!(prompt, "[literal {company_name} here] for Acme");
    }

    #[test]
    fn test_empty_competitors() {
        let prompt = format_user_prompt("<{competitors}>", "", "Acme", &[]);
        assert_eq!(prompt, "<>");
    }

    #[test]
    fn test_unicode_passthrough() {
        let prompt = format_user_prompt("é{company_name}ü", "", "Açme", &[]);
        assert_eq!(prompt, "éAçmeü");
    }

    #[test]
    fn test_default_prompts() {
        let prompts = default_prompts("s", "u");
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| p.is_active));
        assert!(prompts[1].content.contains(RESPONSE_TEXT_PLACEHOLDER));
    }
}
