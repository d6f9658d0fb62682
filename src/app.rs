use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use chrono::Local;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use crate::analysis::{AnalysisService, Attachment};
use crate::config::Config;
use crate::controller::{Controller, Draft, Effect, Event, UploadRequest};
use crate::conversation::{ConversationState, RequestId};
use crate::notify::{NotificationKind, Notifier, ToastCenter};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Typing the job description
    Editing,
    /// Typing the path of a resume to attach
    FilePrompt,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub conversation: ConversationState,
    pub controller: Controller,

    // Draft
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub attachment: Option<Attachment>,

    // File prompt
    pub file_input: String,
    pub file_cursor: usize,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area, set during render
    pub chat_width: u16,  // Inner width of chat area, set during render
    pub follow_tail: bool,

    pub toasts: ToastCenter,
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub endpoint: String,

    service: Arc<dyn AnalysisService>,
    events: mpsc::UnboundedSender<AppEvent>,
    request_task: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(
        config: &Config,
        service: Arc<dyn AnalysisService>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            conversation: ConversationState::new(),
            controller: Controller::new(config.missing_file_policy, config.toast_duration()),

            input: String::new(),
            cursor: 0,
            attachment: None,

            file_input: String::new(),
            file_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,

            toasts: ToastCenter::new(),
            animation_frame: 0,
            endpoint: config.endpoint.clone(),

            service,
            events,
            request_task: None,
        }
    }

    /// Submit the current draft
    pub fn submit(&mut self) {
        let draft = Draft::new(self.input.clone(), self.attachment.clone());
        self.dispatch(Event::Submit(draft));
    }

    /// Attach the file typed into the file prompt. Returns false when the
    /// path does not point at a file, leaving the prompt open.
    pub fn attach_from_prompt(&mut self) -> bool {
        let raw = self.file_input.trim();
        if raw.is_empty() {
            return false;
        }
        let path = expand_home(raw);

        if !path.is_file() {
            let text = format!("File not found: {}", path.display());
            self.toasts.notify(NotificationKind::Error, &text, self.controller.toast_duration());
            return false;
        }

        let attachment = Attachment::new(path);
        info!(file = %attachment.path.display(), "resume attached");
        self.attachment = Some(attachment.clone());
        self.file_input.clear();
        self.file_cursor = 0;
        self.input_mode = InputMode::Editing;
        self.dispatch(Event::FileSelected(attachment));
        true
    }

    pub fn detach_file(&mut self) {
        if self.attachment.take().is_some() {
            info!("resume detached");
        }
    }

    pub fn on_analysis_finished(&mut self, request: RequestId, outcome: Result<String, String>) {
        self.dispatch(Event::AnalysisFinished { request, outcome });
        if !self.conversation.is_submitting() {
            self.request_task = None;
        }
    }

    fn dispatch(&mut self, event: Event) {
        let effects = self.controller.handle(&mut self.conversation, event, Local::now());
        self.apply(effects);
    }

    /// Carry out what the controller asked for
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload(request) => self.start_upload(request),
                Effect::Notify(n) => self.toasts.notify(n.kind, &n.text, n.duration),
                Effect::ClearDraft => {
                    self.input.clear();
                    self.cursor = 0;
                }
                Effect::ScrollToLatest => self.follow_tail = true,
            }
        }
    }

    fn start_upload(&mut self, request: UploadRequest) {
        let service = Arc::clone(&self.service);
        let events = self.events.clone();

        info!(
            request = request.id,
            with_file = request.resume.is_some(),
            "starting analysis"
        );

        self.request_task = Some(tokio::spawn(async move {
            let outcome = service
                .analyze(&request.job_description, request.resume.as_ref())
                .await
                .map_err(|e| {
                    warn!(request = request.id, error = ?e, "analysis failed");
                    e.user_message()
                });
            let _ = events.send(AppEvent::AnalysisFinished {
                request: request.id,
                outcome,
            });
        }));
    }

    /// Abort any outstanding request so nothing lands after teardown
    pub fn shutdown(&mut self) {
        if let Some(task) = self.request_task.take() {
            task.abort();
            info!("outstanding analysis request aborted");
        }
    }

    pub fn tick(&mut self) {
        if self.conversation.is_submitting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.toasts.prune(Instant::now());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Clamp the scroll offset to the rendered content, pinning it to the
    /// newest turn while following the tail
    pub fn sync_scroll(&mut self, content_height: u16) {
        let max_scroll = content_height.saturating_sub(self.chat_height);
        if self.follow_tail || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_tail = true;
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;
    use crate::config::MissingFilePolicy;
    use crate::conversation::ChatRole;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeService {
        reply: Result<String, String>,
        delay: Duration,
    }

    #[async_trait]
    impl AnalysisService for FakeService {
        async fn analyze(
            &self,
            _job_description: &str,
            _resume: Option<&Attachment>,
        ) -> Result<String, AnalysisError> {
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(AnalysisError::Service)
        }
    }

    fn app_with(
        reply: Result<String, String>,
        delay: Duration,
        policy: MissingFilePolicy,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config {
            missing_file_policy: policy,
            ..Config::default()
        };
        let app = App::new(&config, Arc::new(FakeService { reply, delay }), tx);
        (app, rx)
    }

    fn attach_temp_resume(app: &mut App, dir: &tempfile::TempDir) {
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, "%PDF-1.4").unwrap();
        app.input_mode = InputMode::FilePrompt;
        app.file_input = path.display().to_string();
        assert!(app.attach_from_prompt());
    }

    async fn finish_next(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        match rx.recv().await {
            Some(AppEvent::AnalysisFinished { request, outcome }) => {
                app.on_analysis_finished(request, outcome)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = app_with(Ok("X".to_string()), Duration::ZERO, MissingFilePolicy::NoReply);
        attach_temp_resume(&mut app, &dir);
        assert_eq!(app.toasts.visible().len(), 1);
        assert_eq!(app.toasts.visible()[0].text, "Resume uploaded successfully!");

        app.input = "Senior backend engineer, 5 years Go".to_string();
        app.cursor = app.input.chars().count();
        app.follow_tail = false;
        app.submit();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.conversation.is_submitting());
        assert!(app.follow_tail);

        finish_next(&mut app, &mut rx).await;

        let roles: Vec<ChatRole> = app.conversation.all().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(app.conversation.all()[1].content, "X");
        assert!(!app.conversation.is_submitting());
        // The resume stays attached for the next job description
        assert!(app.attachment.is_some());
    }

    #[tokio::test]
    async fn test_failure_is_shown_as_turn() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = app_with(
            Err("connection refused".to_string()),
            Duration::ZERO,
            MissingFilePolicy::NoReply,
        );
        attach_temp_resume(&mut app, &dir);

        app.input = "Go developer".to_string();
        app.submit();
        finish_next(&mut app, &mut rx).await;

        assert_eq!(app.conversation.len(), 2);
        assert_eq!(app.conversation.all()[1].content, "connection refused");
        assert!(app.input.is_empty());
    }

    #[tokio::test]
    async fn test_no_file_sends_nothing() {
        let (mut app, mut rx) = app_with(Ok("X".to_string()), Duration::ZERO, MissingFilePolicy::NoReply);

        app.input = "Go developer".to_string();
        app.submit();

        assert_eq!(app.conversation.len(), 1);
        assert!(!app.conversation.is_submitting());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_busy_submit_keeps_draft() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = app_with(Ok("X".to_string()), Duration::from_secs(30), MissingFilePolicy::NoReply);
        attach_temp_resume(&mut app, &dir);

        app.input = "first".to_string();
        app.submit();
        app.input = "second".to_string();
        app.submit();

        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.input, "second");
        assert!(app
            .toasts
            .visible()
            .iter()
            .any(|t| t.kind == NotificationKind::Warning));
        app.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_aborts_request() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = app_with(Ok("late".to_string()), Duration::from_millis(100), MissingFilePolicy::NoReply);
        attach_temp_resume(&mut app, &dir);

        app.input = "Go developer".to_string();
        app.submit();
        app.shutdown();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(app.conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_path_keeps_prompt_open() {
        let (mut app, _rx) = app_with(Ok("X".to_string()), Duration::ZERO, MissingFilePolicy::NoReply);
        app.input_mode = InputMode::FilePrompt;
        app.file_input = "/no/such/resume.pdf".to_string();

        assert!(!app.attach_from_prompt());
        assert_eq!(app.input_mode, InputMode::FilePrompt);
        assert!(app.attachment.is_none());
        assert_eq!(app.toasts.visible()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_scroll_follows_tail_until_user_scrolls() {
        let (mut app, _rx) = app_with(Ok("X".to_string()), Duration::ZERO, MissingFilePolicy::NoReply);
        app.chat_height = 10;

        app.sync_scroll(25);
        assert_eq!(app.chat_scroll, 15);

        app.scroll_up(5);
        app.sync_scroll(30);
        assert_eq!(app.chat_scroll, 10);
        assert!(!app.follow_tail);

        app.scroll_down(50);
        app.sync_scroll(30);
        assert_eq!(app.chat_scroll, 20);
        assert!(app.follow_tail);
    }
}
