//! Question intent classification.
//!
//! The classifier prompts the language model for exactly one label and
//! never fails the turn: backend errors and unparseable replies both
//! degrade to [`Intent::GeneralQuery`], the most conservative path that
//! still retrieves context. Only an explicit `unknown` label routes the
//! turn to clarification.

use std::sync::Arc;

use crate::llm::LanguageModel;
use crate::stores::Exchange;

/// Closed set of question intents; routing matches on this exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    GeneralQuery,
    CodeQuery,
    FollowUpQuestion,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::GeneralQuery => "general_query",
            Intent::CodeQuery => "code_query",
            Intent::FollowUpQuestion => "follow_up_question",
            Intent::Unknown => "unknown",
        }
    }

    /// Case-insensitive match on the trimmed label; anything else is None.
    fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "general_query" => Some(Intent::GeneralQuery),
            "code_query" => Some(Intent::CodeQuery),
            "follow_up_question" => Some(Intent::FollowUpQuestion),
            "unknown" => Some(Intent::Unknown),
            _ => None,
        }
    }
}

/// How many recent exchanges the classification prompt includes.
const HISTORY_WINDOW: usize = 3;

#[derive(Clone)]
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Labels the question. Infallible: degraded outcomes are still labels.
    pub async fn classify(&self, question: &str, history: &[Exchange]) -> Intent {
        let prompt = classification_prompt(question, history);
        match self.model.generate(&prompt).await {
            Ok(reply) => match Intent::parse(&reply) {
                Some(intent) => intent,
                None => {
                    tracing::warn!(reply, "unparseable intent label, using general_query");
                    Intent::GeneralQuery
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "intent classification failed, using general_query");
                Intent::GeneralQuery
            }
        }
    }
}

fn classification_prompt(question: &str, history: &[Exchange]) -> String {
    let mut prompt = String::from(
        "Classify the user's question into exactly one of these categories:\n\
         - general_query: a question about the documentation's concepts or usage\n\
         - code_query: a request for code, examples, or API signatures\n\
         - follow_up_question: a question referring back to an earlier answer\n\
         - unknown: not a question about the documentation at all\n\n\
         Respond with only the category name, nothing else.\n\n",
    );

    let recent = history.iter().rev().take(HISTORY_WINDOW).rev();
    for exchange in recent {
        prompt.push_str(&format!(
            "User: {}\nAssistant: {}\n",
            exchange.question, exchange.answer
        ));
    }

    prompt.push_str(&format!("\nQuestion: {question}\nCategory:"));
    prompt
}
