//! Prompt builders for the AI tools.
//!
//! Each builder turns tool arguments into a [`PromptPlan`]: the conversation
//! to send and whether web-search grounding is enabled. Builders validate
//! their inputs; blank required fields are `InvalidParams`.

use crate::llm::{ConversationHistory, LlmError, LlmResult, Message, ToolSet};

/// What to send for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlan {
    pub history: ConversationHistory,
    pub web_search: bool,
}

impl PromptPlan {
    fn single(prompt: String, web_search: bool) -> Self {
        Self {
            history: vec![Message::user(prompt)],
            web_search,
        }
    }

    /// Tools to attach to the request.
    pub fn tools(&self) -> ToolSet {
        if self.web_search {
            ToolSet::web_search()
        } else {
            ToolSet::none()
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> LlmResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LlmError::InvalidParams(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

/// Answer a question using web search results.
pub fn answer_query_websearch(query: &str) -> LlmResult<PromptPlan> {
    let query = required("query", query)?;
    Ok(PromptPlan::single(
        format!(
            "Answer the following question using current information from a web search. \
             Be accurate and concise, and say so when sources disagree.\n\nQuestion: {query}"
        ),
        true,
    ))
}

/// Answer a question from the model's own knowledge.
pub fn answer_query_direct(query: &str) -> LlmResult<PromptPlan> {
    let query = required("query", query)?;
    Ok(PromptPlan::single(
        format!(
            "Answer the following question from your own knowledge. \
             If you are unsure, say so rather than guessing.\n\nQuestion: {query}"
        ),
        false,
    ))
}

/// Explain a topic grounded in its official documentation.
pub fn explain_topic_with_docs(topic: &str, query: &str) -> LlmResult<PromptPlan> {
    let topic = required("topic", topic)?;
    let query = required("query", query)?;
    Ok(PromptPlan::single(
        format!(
            "You are an expert on {topic}. Search the official {topic} documentation and \
             answer the question below. Base the explanation on the documentation, cite the \
             relevant pages, and include short examples where they help.\n\nQuestion: {query}"
        ),
        true,
    ))
}

/// Code snippets only, taken from official documentation.
pub fn get_doc_snippets(topic: &str, query: &str) -> LlmResult<PromptPlan> {
    let topic = required("topic", topic)?;
    let query = required("query", query)?;
    Ok(PromptPlan::single(
        format!(
            "Search the official {topic} documentation and return only code snippets that \
             address the request below. Use fenced code blocks with a language tag. Do not \
             add explanations outside brief comments inside the code.\n\nRequest: {query}"
        ),
        true,
    ))
}

/// Coding standards for a technology stack.
pub fn generate_project_guidelines(tech_stack: &[String]) -> LlmResult<PromptPlan> {
    let stack: Vec<&str> = tech_stack
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if stack.is_empty() {
        return Err(LlmError::InvalidParams("tech_stack must not be empty".into()));
    }
    let stack = stack.join(", ");
    Ok(PromptPlan::single(
        format!(
            "Using current official documentation and widely adopted style guides, write \
             project guidelines in Markdown for a codebase built with: {stack}.\n\n\
             Cover project structure, naming conventions, formatting, error handling, \
             testing, security practices and performance considerations. Where the \
             technologies interact, give guidance for the integration points."
        ),
        true,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websearch_flags() {
        assert!(answer_query_websearch("q").unwrap().web_search);
        assert!(!answer_query_direct("q").unwrap().web_search);
        assert!(explain_topic_with_docs("Rust", "q").unwrap().web_search);
        assert!(get_doc_snippets("Rust", "q").unwrap().web_search);
        assert!(generate_project_guidelines(&["Rust".into()]).unwrap().web_search);
    }

    #[test]
    fn test_single_user_message() {
        let plan = explain_topic_with_docs("tokio", "How do I spawn a task?").unwrap();
        assert_eq!(plan.history.len(), 1);
        let text = plan.history[0].text();
        assert!(text.contains("tokio"));
        assert!(text.contains("How do I spawn a task?"));
        assert_eq!(plan.tools().count(), 1);
    }

    #[test]
    fn test_direct_plan_has_no_tools() {
        let plan = answer_query_direct("What is 2+2?").unwrap();
        assert!(plan.tools().is_empty());
    }

    #[test]
    fn test_blank_inputs_rejected() {
        assert!(matches!(answer_query_websearch("  "), Err(LlmError::InvalidParams(_))));
        assert!(matches!(answer_query_direct(""), Err(LlmError::InvalidParams(_))));
        assert!(matches!(explain_topic_with_docs("", "q"), Err(LlmError::InvalidParams(_))));
        assert!(matches!(get_doc_snippets("Rust", "\n"), Err(LlmError::InvalidParams(_))));
        assert!(matches!(generate_project_guidelines(&[]), Err(LlmError::InvalidParams(_))));
        assert!(matches!(
            generate_project_guidelines(&[" ".into()]),
            Err(LlmError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_guidelines_join_stack() {
        let plan =
            generate_project_guidelines(&["Rust".into(), " tokio ".into(), "axum".into()]).unwrap();
        assert!(plan.history[0].text().contains("Rust, tokio, axum"));
    }
}
