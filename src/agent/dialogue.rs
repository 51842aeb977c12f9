//! Slot filling across turns
//!
//! An instructor lookup needs two slots, the professor (subject) and the
//! university (qualifier). When a turn supplies only part of that, the known
//! slots and the question are kept as pending and the user is asked for the
//! rest. Later turns only fill empty pending slots. As soon as both slots are
//! known the request is handed out and the pending state is emptied in the
//! same call.

use tracing::debug;

/// Question used when the user only named a professor
pub const DEFAULT_QUESTION: &str = "What are the overall ratings and student feedback?";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSlots {
    pub subject: Option<String>,
    pub qualifier: Option<String>,
    pub question: Option<String>,
}

impl PendingSlots {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.qualifier.is_none() && self.question.is_none()
    }
}

/// Observable state between turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    Empty,
    /// A question is pending but neither slot is known
    AwaitingBoth,
    /// Subject known, qualifier missing
    PartialSubject,
    /// Qualifier known, subject missing
    PartialQualifier,
}

/// A request with every slot filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub subject: String,
    pub qualifier: String,
    pub question: String,
}

/// Result of feeding one turn's slots to the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    Dispatch(ResolvedRequest),
    NeedBoth,
    NeedQualifier { subject: String },
    NeedSubject { qualifier: String },
}

impl SlotOutcome {
    /// Clarifying question for the user, `None` for a dispatch
    pub fn clarification(&self) -> Option<String> {
        match self {
            SlotOutcome::Dispatch(_) => None,
            SlotOutcome::NeedBoth => Some(
                "I'd be happy to help with professor information! To find the right person I need:\n\
                 1. The professor's full name\n\
                 2. The university they teach at\n\n\
                 For example: \"Professor Richard Sutton at University of Alberta\""
                    .to_string(),
            ),
            SlotOutcome::NeedQualifier { subject } => Some(format!(
                "I'd be happy to look up Professor {subject}! Which university do they teach at?\n\n\
                 For example: \"University of Alberta\" or \"Stanford University\""
            )),
            SlotOutcome::NeedSubject { qualifier } => Some(format!(
                "Which professor at {qualifier} would you like to know about? \
                 Please give their full name.\n\n\
                 For example: \"Richard Sutton\""
            )),
        }
    }
}

#[derive(Debug, Default)]
pub struct DialogueManager {
    pending: PendingSlots,
}

impl DialogueManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &PendingSlots {
        &self.pending
    }

    pub fn phase(&self) -> DialoguePhase {
        match (&self.pending.subject, &self.pending.qualifier) {
            (Some(_), None) => DialoguePhase::PartialSubject,
            (None, Some(_)) => DialoguePhase::PartialQualifier,
            (None, None) if self.pending.question.is_some() => DialoguePhase::AwaitingBoth,
            _ => DialoguePhase::Empty,
        }
    }

    pub fn reset(&mut self) {
        self.pending = PendingSlots::default();
    }

    /// Merge this turn's slots with what is pending and decide what happens next
    pub fn advance(
        &mut self,
        subject: Option<&str>,
        qualifier: Option<&str>,
        question: Option<&str>,
    ) -> SlotOutcome {
        let subject = non_blank(subject);
        let qualifier = non_blank(qualifier);
        let question = non_blank(question);

        let (subject, qualifier, question) = if self.pending.question.is_some() {
            // Continuing an earlier request: pending slots win over new ones
            let pending = std::mem::take(&mut self.pending);
            (
                pending.subject.or(subject),
                pending.qualifier.or(qualifier),
                pending.question.or(question),
            )
        } else {
            (subject, qualifier, question)
        };

        let question = question.unwrap_or_else(|| DEFAULT_QUESTION.to_string());

        let outcome = match (subject, qualifier) {
            (Some(subject), Some(qualifier)) => {
                self.pending = PendingSlots::default();
                SlotOutcome::Dispatch(ResolvedRequest {
                    subject,
                    qualifier,
                    question,
                })
            }
            (Some(subject), None) => {
                self.pending = PendingSlots {
                    subject: Some(subject.clone()),
                    qualifier: None,
                    question: Some(question),
                };
                SlotOutcome::NeedQualifier { subject }
            }
            (None, Some(qualifier)) => {
                self.pending = PendingSlots {
                    subject: None,
                    qualifier: Some(qualifier.clone()),
                    question: Some(question),
                };
                SlotOutcome::NeedSubject { qualifier }
            }
            (None, None) => {
                self.pending = PendingSlots {
                    subject: None,
                    qualifier: None,
                    question: Some(question),
                };
                SlotOutcome::NeedBoth
            }
        };

        debug!(phase = ?self.phase(), dispatch = matches!(outcome, SlotOutcome::Dispatch(_)), "Slot filling step");
        outcome
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
