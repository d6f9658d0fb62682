use chrono::{DateTime, Local};
use std::time::Duration;
use crate::analysis::Attachment;
use crate::config::MissingFilePolicy;
use crate::conversation::{ChatMessage, ConversationState, RequestId};
use crate::notify::{Notification, NotificationKind};

pub const FILE_SELECTED_TEXT: &str = "Resume uploaded successfully!";
pub const BUSY_TEXT: &str = "Still analyzing the previous submission, please wait";
pub const FILE_REQUIRED_TEXT: &str = "Attach a resume (PDF) before submitting";

/// The not-yet-submitted input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Draft {
    pub fn new(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            text: text.into(),
            attachment,
        }
    }
}

/// One analysis round trip the caller has to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub id: RequestId,
    pub job_description: String,
    pub resume: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Submit(Draft),
    FileSelected(Attachment),
    AnalysisFinished {
        request: RequestId,
        outcome: Result<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload(UploadRequest),
    Notify(Notification),
    ClearDraft,
    ScrollToLatest,
}

/// Drives the submit/upload lifecycle. `handle` only updates the
/// conversation and returns effects; the caller performs the I/O.
#[derive(Debug)]
pub struct Controller {
    missing_file: MissingFilePolicy,
    toast_duration: Duration,
    next_request: RequestId,
}

impl Controller {
    pub fn new(missing_file: MissingFilePolicy, toast_duration: Duration) -> Self {
        Self {
            missing_file,
            toast_duration,
            next_request: 1,
        }
    }

    pub fn toast_duration(&self) -> Duration {
        self.toast_duration
    }

    pub fn handle(
        &mut self,
        state: &mut ConversationState,
        event: Event,
        now: DateTime<Local>,
    ) -> Vec<Effect> {
        match event {
            Event::Submit(draft) => self.submit(state, draft, now),
            Event::FileSelected(_) => vec![self.notice(NotificationKind::Success, FILE_SELECTED_TEXT)],
            Event::AnalysisFinished { request, outcome } => finish(state, request, outcome, now),
        }
    }

    fn submit(&mut self, state: &mut ConversationState, draft: Draft, now: DateTime<Local>) -> Vec<Effect> {
        let job_description = draft.text.trim();
        if job_description.is_empty() {
            return Vec::new();
        }

        // One request at a time; the draft stays so nothing typed is lost
        if state.is_submitting() {
            tracing::debug!("submission rejected while a request is outstanding");
            return vec![self.notice(NotificationKind::Warning, BUSY_TEXT)];
        }

        if draft.attachment.is_none() && self.missing_file == MissingFilePolicy::RequireFile {
            return vec![self.notice(NotificationKind::Warning, FILE_REQUIRED_TEXT)];
        }

        state.append(ChatMessage::user(job_description, now));

        let send = draft.attachment.is_some() || self.missing_file == MissingFilePolicy::TextOnly;
        if !send {
            // No resume and nothing to wait for
            state.set_submitting(false);
            return vec![Effect::ClearDraft, Effect::ScrollToLatest];
        }

        let id = self.next_request;
        self.next_request += 1;
        state.begin_request(id);

        vec![
            Effect::Upload(UploadRequest {
                id,
                job_description: job_description.to_string(),
                resume: draft.attachment,
            }),
            Effect::ClearDraft,
            Effect::ScrollToLatest,
        ]
    }

    fn notice(&self, kind: NotificationKind, text: &str) -> Effect {
        Effect::Notify(Notification::new(kind, text, self.toast_duration))
    }
}

fn finish(
    state: &mut ConversationState,
    request: RequestId,
    outcome: Result<String, String>,
    now: DateTime<Local>,
) -> Vec<Effect> {
    if state.in_flight() != Some(request) {
        tracing::debug!(request, "ignoring result for a request that is no longer outstanding");
        return Vec::new();
    }

    let content = match outcome {
        Ok(analysis) => analysis,
        Err(message) if message.trim().is_empty() => crate::analysis::FALLBACK_ERROR.to_string(),
        Err(message) => message,
    };

    state.append(ChatMessage::assistant(content, now));
    state.set_submitting(false);
    vec![Effect::ScrollToLatest]
}
