//! Local advisor heuristic.
//!
//! Answers free-text questions without any network access by matching the
//! lower-cased question against a short, ordered list of rules. The first
//! rule that produces an answer wins; the last rule always does.

use crate::content::{ContentStore, DrugClass, PatientCase};
use crate::grading::Feedback;

/// Everything a rule may look at.
struct Query<'a> {
    question: String,
    store: &'a ContentStore,
    case: &'a PatientCase,
    choice: Option<&'a str>,
    feedback: Option<&'a Feedback>,
}

impl Query<'_> {
    fn mentions(&self, needle: &str) -> bool {
        self.question.contains(needle)
    }

    fn chosen_drug(&self) -> Option<&DrugClass> {
        self.choice.and_then(|id| self.store.drug(id))
    }
}

type Rule = fn(&Query<'_>) -> Option<String>;

const RULES: [Rule; 5] = [
    best_alternative,
    named_drug,
    side_effects,
    current_feedback,
    suggestions,
];

/// Answers `question` about `case` using only local data. Never fails and
/// never returns an empty string.
pub fn answer_locally(
    question: &str,
    store: &ContentStore,
    case: &PatientCase,
    choice: Option<&str>,
    feedback: Option<&Feedback>,
) -> String {
    let query = Query {
        question: question.to_lowercase(),
        store,
        case,
        choice,
        feedback,
    };
    RULES
        .iter()
        .find_map(|rule| rule(&query))
        .unwrap_or_else(|| suggestion_text().to_string())
}

fn best_alternative(query: &Query<'_>) -> Option<String> {
    if !(query.mentions("best") || query.mentions("recommend")) {
        return None;
    }
    let answer = match query.store.drug(&query.case.best_alternative) {
        Some(drug) => format!(
            "The best option for this case is {}. {}",
            drug.name, query.case.teaching_point
        ),
        None => "I cannot identify the best alternative for this case from the drug catalog."
            .to_string(),
    };
    Some(answer)
}

fn named_drug(query: &Query<'_>) -> Option<String> {
    query
        .store
        .drugs()
        .iter()
        .find(|drug| {
            [&drug.name, &drug.id].into_iter().any(|needle| {
                let needle = needle.trim().to_lowercase();
                !needle.is_empty() && query.mentions(&needle)
            })
        })
        .map(|drug| {
            format!(
                "{}. Benefits: {}. Risks: {}.",
                drug.name,
                drug.benefits.join("; "),
                drug.risks.join("; ")
            )
        })
}

fn side_effects(query: &Query<'_>) -> Option<String> {
    if !(query.mentions("side effect") || query.mentions("risk")) {
        return None;
    }
    let answer = match (query.choice, query.chosen_drug()) {
        (Some(_), Some(drug)) => format!("Key risks of {}: {}.", drug.name, drug.risks.join("; ")),
        (Some(id), None) => format!("I cannot find '{id}' in the drug catalog."),
        (None, _) => {
            "Choose a drug class first, then ask me about its side effects.".to_string()
        }
    };
    Some(answer)
}

fn current_feedback(query: &Query<'_>) -> Option<String> {
    let (choice, feedback) = (query.choice?, query.feedback?);
    let name = query
        .chosen_drug()
        .map(|drug| drug.name.as_str())
        .unwrap_or(choice);
    Some(format!("You chose {}: {}", name, feedback.headline))
}

fn suggestions(_query: &Query<'_>) -> Option<String> {
    Some(suggestion_text().to_string())
}

fn suggestion_text() -> &'static str {
    "Try asking \"What is the best option for this patient?\" or \"What are the risks of metformin?\""
}
