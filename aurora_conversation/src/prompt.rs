//! Flattening history into a single completion prompt.
//!
//! ```text
//! Here is our previous conversation:
//! User: Hello
//! Assistant: Hi there
//!
//! User: How are you?
//!
//! Assistant:
//! ```

use aurora_core::{PromptTemplate, Turn};

/// Render `history` followed by `new_message`.
///
/// An empty history yields `new_message` unchanged, with no framing.
#[must_use]
pub fn render_prompt<'a, I>(template: &PromptTemplate, history: I, new_message: &str) -> String
where
    I: IntoIterator<Item = &'a Turn>,
{
    let mut history = history.into_iter().peekable();
    if history.peek().is_none() {
        return new_message.to_string();
    }

    let mut prompt = String::new();
    prompt.push_str(&template.history_intro);
    prompt.push('\n');

    for turn in history {
        push_line(&mut prompt, template.label(turn.role), &turn.text);
    }

    prompt.push('\n');
    push_line(&mut prompt, &template.user_label, new_message);
    prompt.push('\n');
    prompt.push_str(&template.assistant_label);
    prompt.push(':');

    prompt
}

fn push_line(prompt: &mut String, label: &str, text: &str) {
    prompt.push_str(label);
    prompt.push_str(": ");
    prompt.push_str(text);
    prompt.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_is_raw_message() {
        let template = PromptTemplate::default();
        assert_eq!(render_prompt(&template, std::iter::empty(), "Hi"), "Hi");
        assert_eq!(render_prompt(&template, std::iter::empty(), ""), "");
    }

    #[test]
    fn test_full_layout() {
        let template = PromptTemplate::default();
        let history = [Turn::user("Hello"), Turn::assistant("Hi there")];

        let prompt = render_prompt(&template, &history, "How are you?");

        assert_eq!(
            prompt,
            "Here is our previous conversation:\n\
             User: Hello\n\
             Assistant: Hi there\n\
             \n\
             User: How are you?\n\
             \n\
             Assistant:"
        );
    }

    #[test]
    fn test_custom_labels() {
        let template = PromptTemplate {
            history_intro: "Context:".to_string(),
            user_label: "Customer".to_string(),
            assistant_label: "FinanceBot".to_string(),
        };
        let history = [Turn::user("Rates?")];

        let prompt = render_prompt(&template, &history, "And fees?");

        assert!(prompt.starts_with("Context:\nCustomer: Rates?\n"));
        assert!(prompt.ends_with("Customer: And fees?\n\nFinanceBot:"));
    }
}
