//! The learner-session controller: state machine, transcript and advisor
//! routing for one connection, without any I/O.

use super::{advisor::AdvisorJob, advisor::AdvisorReply, protocol::ServerMessage};
use serde_json::{Value, json};
use std::sync::Arc;
use t2dm_sim_core::{
    ChatEntry, ChatRole, ChatTranscript, ContentStore, GatewayError, LookupError, Mode,
    PatientCase, Session, SessionError,
    advisor::{answer_locally, remote::validate_question},
    session::ChoiceOutcome,
};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Result of a learner question.
#[derive(Debug)]
pub enum AskOutcome {
    /// Answered locally; both entries are already in the transcript.
    Answered { question: ChatEntry, answer: ChatEntry },
    /// The question is in the transcript; the answer comes from `job`.
    Deferred { question: ChatEntry, job: AdvisorJob },
}

pub struct SessionDriver {
    store: Arc<ContentStore>,
    case_id: String,
    session: Session,
    transcript: ChatTranscript,
}

impl SessionDriver {
    /// Opens a session on `case_id`, or on the default case.
    pub fn new(store: Arc<ContentStore>, case_id: Option<&str>) -> Result<Self, LookupError> {
        let case_id = match case_id {
            Some(id) => store.require_case(id)?.id.clone(),
            None => store.default_case().id.clone(),
        };
        Ok(Self {
            store,
            case_id,
            session: Session::new(),
            transcript: ChatTranscript::new(),
        })
    }

    pub fn case(&self) -> Result<&PatientCase, LookupError> {
        self.store.require_case(&self.case_id)
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn session_update(&self) -> Result<ServerMessage, DriverError> {
        let session = self.session.snapshot(&self.store, self.case()?)?;
        Ok(ServerMessage::SessionUpdate { session })
    }

    pub fn set_mode(&mut self, mode: Mode) {
        info!(from = %self.session.mode(), to = %mode, "Mode changed");
        self.session.set_mode(mode);
    }

    /// Selects `drug_id`; unknown ids are refused before the session changes.
    pub fn choose(&mut self, drug_id: &str) -> Result<ChoiceOutcome, DriverError> {
        self.store.require_drug(drug_id)?;
        let outcome = self.session.choose(drug_id)?;
        info!(drug_id, mode = %self.session.mode(), ?outcome, "Choice recorded");
        Ok(outcome)
    }

    pub fn reset_attempt(&mut self) -> Result<(), DriverError> {
        self.session.reset_attempt()?;
        debug!("Attempt reset");
        Ok(())
    }

    pub fn is_breather_active(&self) -> bool {
        self.session.is_breather_active()
    }

    pub fn tick(&mut self) -> u32 {
        self.session.tick()
    }

    /// Records a question and answers it locally, or prepares a remote job.
    pub fn ask(&mut self, question: &str, remote: bool) -> Result<AskOutcome, DriverError> {
        let question = validate_question(question)?;
        let case = self.case()?.clone();
        let question_entry = self.transcript.push(ChatRole::User, question).clone();

        if remote {
            let job = AdvisorJob {
                generation: self.session.generation(),
                question: question.to_string(),
                context: self.advisor_context(&case)?,
            };
            return Ok(AskOutcome::Deferred {
                question: question_entry,
                job,
            });
        }

        let choice = self.session.selected_choice();
        let feedback = match choice {
            Some(_) => Some(self.session.feedback(&self.store, &case)?),
            None => None,
        };
        let answer = answer_locally(question, &self.store, &case, choice, feedback.as_ref());
        let answer_entry = self.transcript.push(ChatRole::Advisor, answer).clone();
        Ok(AskOutcome::Answered {
            question: question_entry,
            answer: answer_entry,
        })
    }

    /// Appends a remote reply, unless the attempt it belongs to was superseded.
    pub fn accept_reply(&mut self, reply: AdvisorReply) -> Option<ChatEntry> {
        if reply.generation != self.session.generation() {
            warn!(
                reply_generation = reply.generation,
                current_generation = self.session.generation(),
                "Discarding stale advisor reply"
            );
            return None;
        }
        let text = match reply.result {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, detail = ?err.detail(), "Remote advisor failed");
                err.user_message()
            }
        };
        Some(self.transcript.push(ChatRole::Advisor, text).clone())
    }

    /// Snapshot of the case and current attempt sent along with remote questions.
    fn advisor_context(&self, case: &PatientCase) -> Result<Value, DriverError> {
        let choice = self.session.selected_choice();
        let selected_drug = choice
            .and_then(|id| self.store.drug(id))
            .map(|drug| drug.name.clone());
        let feedback = match choice {
            Some(_) => Some(self.session.feedback(&self.store, case)?),
            None => None,
        };
        Ok(json!({
            "case": {
                "title": case.title,
                "summary": case.summary,
                "teachingPoint": case.teaching_point,
            },
            "mode": self.session.mode(),
            "selectedChoice": choice,
            "selectedDrug": selected_drug,
            "feedback": feedback,
            "drugClasses": self.store.drugs().iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        }))
    }
}
