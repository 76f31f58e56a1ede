//! Prompt templates for the council flow

use crate::anonymize::Label;
use crate::deliberation::value_objects::{ModelResponse, PeerEvaluation};
use crate::ranking::{AggregateRanking, FINAL_RANKING_MARKER};

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// User prompt for the Stage-1 answer round
    pub fn answer_prompt(question: &str, include_confidence: bool) -> String {
        if !include_confidence {
            return question.to_string();
        }
        format!(
            r#"{}

After your response, please rate your confidence in your answer on a scale of 1-10 (where 1 is very uncertain and 10 is extremely confident). Format it as:
CONFIDENCE: X/10"#,
            question
        )
    }

    /// System prompt for the peer ranking round
    pub fn ranking_system() -> &'static str {
        r#"You are a critical reviewer evaluating anonymized answers from other experts.
Judge each answer only on its content: accuracy, completeness, clarity and usefulness.
Be fair but thorough, and always finish with the ranking in the exact format requested."#
    }

    /// User prompt for the peer ranking round
    ///
    /// Takes labels and answer texts only; model identities never reach
    /// reviewers.
    pub fn ranking_prompt(question: &str, responses: &[(Label, &str)]) -> String {
        let responses_text = responses
            .iter()
            .map(|(label, text)| format!("{}:\n{}", label.display_name(), text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let example: Vec<String> = responses
            .iter()
            .rev()
            .enumerate()
            .map(|(i, (label, _))| format!("{}. {}", i + 1, label.display_name()))
            .collect();

        format!(
            r#"You are evaluating different responses to the following question:

Question: {question}

Here are the responses from different models (anonymized):

{responses_text}

Your task:
1. First, evaluate each response individually. For each response, explain what it does well and what it does poorly.
2. Then, at the very end of your response, provide a final ranking.

IMPORTANT: Your final ranking MUST be formatted EXACTLY as follows:
- Start with the line "{marker}:" (all caps, with colon)
- Then list the responses from best to worst as a numbered list
- Each line should be: number, period, space, then ONLY the response label (e.g., "1. Response A")
- Do not add any other text or explanations in the ranking section

Example of the ranking section:

{marker}:
{example}

Now provide your evaluation and ranking:"#,
            marker = FINAL_RANKING_MARKER,
            example = example.join("\n"),
        )
    }

    /// System prompt for the chairman
    pub fn chairman_system() -> &'static str {
        r#"You are the Chairman of an LLM Council.
Your task is to:
1. Weigh the individual answers and the peer rankings
2. Note significant disagreements and decide which positions are better supported
3. Synthesize the best elements into a single, comprehensive final answer

Be balanced and objective. Give weight to well-reasoned arguments regardless of source."#
    }

    /// User prompt for the chairman synthesis
    ///
    /// Unlike the ranking prompt, this one reveals which model wrote each
    /// answer. `labels` pairs each response with its anonymized label so that
    /// the reviewers' text can be followed.
    pub fn chairman_prompt(
        question: &str,
        responses: &[(Option<&Label>, &ModelResponse)],
        evaluations: &[PeerEvaluation],
        aggregate: &[AggregateRanking],
    ) -> String {
        let stage1_text = responses
            .iter()
            .map(|(label, response)| match label {
                Some(label) => format!(
                    "Model: {} ({})\nResponse: {}",
                    response.model,
                    label.display_name(),
                    response.text
                ),
                None => format!("Model: {}\nResponse: {}", response.model, response.text),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut prompt = format!(
            r#"You are the Chairman of an LLM Council. Multiple AI models have provided responses to a user's question, and then ranked each other's responses.

Original Question: {question}

STAGE 1 - Individual Responses:
{stage1_text}
"#
        );

        if !evaluations.is_empty() {
            let stage2_text = evaluations
                .iter()
                .map(|e| format!("Model: {}\nRanking: {}", e.reviewer, e.raw_text))
                .collect::<Vec<_>>()
                .join("\n\n");
            prompt.push_str(&format!("\nSTAGE 2 - Peer Rankings:\n{}\n", stage2_text));
        }

        if !aggregate.is_empty() {
            prompt.push_str("\nAGGREGATE RANKINGS (consensus view):\n");
            for (i, entry) in aggregate.iter().enumerate() {
                let standing = match (entry.score, entry.average_rank) {
                    (Some(score), _) => format!("score: {:.2}", score),
                    (None, Some(avg)) => format!("average rank: {:.2}", avg),
                    (None, None) => "no votes".to_string(),
                };
                prompt.push_str(&format!(
                    "{}. {} ({})\n",
                    i + 1,
                    entry.model.short_name(),
                    standing
                ));
            }
        }

        prompt.push_str(
            r#"
Your task as Chairman is to synthesize all of this information into a single, comprehensive, accurate answer to the user's original question. Consider:
- The individual responses and their insights
- The peer rankings and what they reveal about response quality
- Any patterns of agreement or disagreement

Provide a clear, well-reasoned final answer that represents the council's collective wisdom:"#,
        );

        prompt
    }

    /// Prompt for the short conversation title
    pub fn title_prompt(question: &str) -> String {
        format!(
            r#"Generate a very short title (3-5 words maximum) that summarizes the following question.
The title should be concise and descriptive. Do not use quotes or punctuation in the title.

Question: {}

Title:"#,
            question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ModelId;
    use std::time::Duration;

    #[test]
    fn test_answer_prompt_confidence_suffix() {
        let with = PromptTemplate::answer_prompt("What is Rust?", true);
        assert!(with.starts_with("What is Rust?"));
        assert!(with.ends_with("CONFIDENCE: X/10"));

        let without = PromptTemplate::answer_prompt("What is Rust?", false);
        assert_eq!(without, "What is Rust?");
    }

    #[test]
    fn test_ranking_prompt_is_anonymous() {
        let a = Label::from_index(0);
        let b = Label::from_index(1);
        let prompt = PromptTemplate::ranking_prompt(
            "What is Rust?",
            &[(a, "A systems language."), (b, "A fungus.")],
        );
        assert!(prompt.contains("Response A:\nA systems language."));
        assert!(prompt.contains("Response B:\nA fungus."));
        assert!(prompt.contains("FINAL RANKING:"));
        assert!(prompt.contains("1. Response B\n2. Response A"));
    }

    #[test]
    fn test_chairman_prompt_reveals_identities() {
        let response = ModelResponse::new("openai/o1", "Answer text", Duration::from_secs(1));
        let label = Label::from_index(0);
        let eval = PeerEvaluation::new(
            "x-ai/grok-3-beta",
            "FINAL RANKING:\n1. Response A",
            vec![label.clone()],
        );
        let aggregate = vec![AggregateRanking {
            label: label.clone(),
            model: ModelId::new("openai/o1"),
            average_rank: Some(1.0),
            vote_count: 1,
            score: None,
        }];

        let prompt = PromptTemplate::chairman_prompt(
            "What is Rust?",
            &[(Some(&label), &response)],
            &[eval],
            &aggregate,
        );
        assert!(prompt.contains("Original Question: What is Rust?"));
        assert!(prompt.contains("Model: openai/o1 (Response A)"));
        assert!(prompt.contains("STAGE 2 - Peer Rankings:\nModel: x-ai/grok-3-beta"));
        assert!(prompt.contains("1. o1 (average rank: 1.00)"));
    }

    #[test]
    fn test_chairman_prompt_without_evaluations() {
        let response = ModelResponse::new("openai/o1", "Only answer", Duration::from_secs(1));
        let prompt = PromptTemplate::chairman_prompt("Q?", &[(None, &response)], &[], &[]);
        assert!(prompt.contains("Model: openai/o1\nResponse: Only answer"));
        assert!(!prompt.contains("STAGE 2"));
        assert!(!prompt.contains("AGGREGATE RANKINGS"));
    }

    #[test]
    fn test_title_prompt_contains_question() {
        let prompt = PromptTemplate::title_prompt("How do tides work?");
        assert!(prompt.contains("Question: How do tides work?"));
        assert!(prompt.ends_with("Title:"));
    }
}
