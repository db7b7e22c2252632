//! The event loop: one `mpsc` channel of `SessionEvent`s from `kestrel-agent-session`, one channel
//! of `TerminalEvent`s from `kestrel-terminal`, `select!`-ed against a redraw tick. Overlay-first
//! input dispatch, then the keymap's reserved actions, then an extension-registered shortcut, then
//! the focused component.

use std::io::Write as _;
use std::time::{Duration, Instant};

use kestrel_agent_core::AgentEvent;
use kestrel_agent_session::{CompactionOutcome, CompactionReason, FacadeHandle, SessionEvent};
use kestrel_components::editor::EditorEvent;
use kestrel_components::{Editor, Loader, Theme};
use kestrel_config::Settings;
use kestrel_extensions::{Command as _, Shortcut as _};
use kestrel_keys::{decode, KeyId, Modifiers};
use kestrel_protocol::tool::SteeringMode;
use kestrel_render::Component as _;
use kestrel_render::Renderer;
use kestrel_terminal::{TerminalDriver, TerminalEvent};
use tokio::sync::mpsc;

use crate::commands::{parse_builtin, split_command, BuiltinCommand};
use crate::error::{Result, TuiError};
use crate::keymap::{Action, Keymap};
use crate::overlays::{Overlay, OverlayOutcome};
use crate::transcript::render_messages;

/// A double `ctrl+c` within this window exits.
const DOUBLE_INTERRUPT_WINDOW: Duration = Duration::from_millis(500);

pub struct App {
    facade: FacadeHandle,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
    driver: Option<TerminalDriver>,
    terminal_events: mpsc::UnboundedReceiver<TerminalEvent>,
    renderer: Renderer,
    keymap: Keymap,
    editor: Editor,
    loader: Loader,
    theme: Theme,
    overlay: Option<Overlay>,
    steering_mode: SteeringMode,
    columns: u16,
    rows: u16,
    kitty_keyboard: bool,
    busy: bool,
    status: Option<String>,
    last_interrupt: Option<Instant>,
    /// Output from `!!`-prefixed commands, which never enter the session's
    /// LLM-visible context and so never show up in `facade.messages()`.
    excluded_bash_echo: Vec<String>,
    should_exit: bool,
}

impl App {
    pub async fn run(facade: FacadeHandle, session_events: mpsc::UnboundedReceiver<SessionEvent>, settings: &Settings) -> Result<()> {
        let (terminal_tx, terminal_rx) = mpsc::unbounded_channel();
        let driver = TerminalDriver::start(terminal_tx, false)?;
        let (columns, rows) = crossterm::terminal::size().map_err(TuiError::Size)?;
        let theme = Theme::default();

        let mut app = App {
            facade,
            session_events,
            kitty_keyboard: driver.kitty_keyboard,
            driver: Some(driver),
            terminal_events: terminal_rx,
            renderer: Renderer::new(rows),
            keymap: Keymap::new(),
            editor: Editor::new(theme.clone()).with_placeholder("Type a message, /command, or !shell"),
            loader: Loader::new("Working", theme.clone()),
            theme,
            overlay: None,
            steering_mode: settings.steering_mode,
            columns,
            rows,
            busy: false,
            status: None,
            last_interrupt: None,
            excluded_bash_echo: Vec::new(),
            should_exit: false,
        };

        app.redraw()?;
        let mut tick = tokio::time::interval(kestrel_components::loader::TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(event) = app.terminal_events.recv() => {
                    app.handle_terminal_event(event).await?;
                }
                Some(event) = app.session_events.recv() => {
                    app.handle_session_event(event).await?;
                }
                _ = tick.tick() => {
                    if app.busy {
                        app.loader.tick();
                    }
                    app.redraw()?;
                }
            }
            if app.should_exit {
                break;
            }
        }

        if let Some(driver) = app.driver.take() {
            driver.suspend();
        }
        Ok(())
    }

    async fn handle_terminal_event(&mut self, event: TerminalEvent) -> Result<()> {
        match event {
            TerminalEvent::Resize { columns, rows } => {
                self.columns = columns;
                self.rows = rows;
                self.renderer.resize_viewport(rows);
                self.renderer.invalidate();
                self.redraw()?;
            }
            TerminalEvent::Paste(text) => {
                self.editor.insert_str(&text);
                self.redraw()?;
            }
            TerminalEvent::Key(raw) => {
                if let Some(key) = decode(raw, self.kitty_keyboard) {
                    self.handle_key(key).await?;
                    self.redraw()?;
                }
            }
        }
        Ok(())
    }

    async fn handle_key(&mut self, key: kestrel_keys::KeyEvent) -> Result<()> {
        if key.id.as_str() != "ctrl+c" {
            self.last_interrupt = None;
        }

        if let Some(overlay) = self.overlay.as_mut() {
            if let Some(outcome) = overlay.handle_key(&key) {
                self.overlay = None;
                self.apply_overlay_outcome(outcome).await?;
            }
            return Ok(());
        }

        match self.keymap.resolve(&key.id) {
            Some(Action::InterruptOrExit) => self.handle_interrupt().await,
            Some(Action::ExitIfEmpty) => {
                if self.editor.is_empty() {
                    self.should_exit = true;
                }
            }
            Some(Action::Suspend) => {
                // Job-control suspend is left to the shell; nothing to do
                // at the TUI layer beyond not swallowing the keystroke.
            }
            Some(Action::CommandPalette) => self.open_command_palette().await,
            Some(Action::SessionBrowser) => self.open_session_browser().await,
            Some(Action::ModelPicker) => self.open_model_picker().await,
            Some(Action::FullRedraw) => self.renderer.invalidate(),
            Some(Action::NewSession) => self.new_session(),
            Some(Action::ToggleTreeOverview) => self.open_tree_overview().await,
            Some(Action::ToggleHelp) => self.overlay = Some(Overlay::help(self.theme.clone())),
            Some(Action::CycleSteeringMode) => self.cycle_steering_mode(),
            Some(Action::InsertNewline) => {
                let newline = kestrel_keys::KeyEvent { id: KeyId::build(Modifiers { shift: false, ctrl: true, alt: false }, "j"), kind: key.kind };
                self.editor.handle_key(&newline);
            }
            Some(Action::Cancel) => {}
            Some(Action::Submit) => {
                if let Some(EditorEvent::Submit(text)) = self.editor.handle_key(&key) {
                    self.handle_submit(text).await?;
                }
            }
            None => {
                let shortcut = self.facade.0.lock().await.extensions().shortcut(&key.id).cloned();
                if let Some(shortcut) = shortcut {
                    shortcut.run(&self.facade).await;
                } else if let Some(EditorEvent::Submit(text)) = self.editor.handle_key(&key) {
                    self.handle_submit(text).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_interrupt(&mut self) {
        let now = Instant::now();
        let is_double = self.last_interrupt.map(|previous| now.duration_since(previous) <= DOUBLE_INTERRUPT_WINDOW).unwrap_or(false);
        if is_double {
            self.should_exit = true;
            return;
        }
        self.last_interrupt = Some(now);

        let session = self.facade.0.lock().await;
        if session.is_running() {
            session.abort();
            self.status = Some("interrupting...".to_string());
        }
    }

    fn cycle_steering_mode(&mut self) {
        self.steering_mode = match self.steering_mode {
            SteeringMode::Steer => SteeringMode::FollowUp,
            SteeringMode::FollowUp => SteeringMode::NextTurn,
            SteeringMode::NextTurn => SteeringMode::Steer,
        };
        self.status = Some(format!("steering mode: {:?}", self.steering_mode));
    }

    async fn open_command_palette(&mut self) {
        let mut names = vec!["model".to_string(), "sessions".to_string(), "help".to_string(), "new".to_string(), "tree".to_string(), "compact".to_string()];
        let session = self.facade.0.lock().await;
        names.extend(session.extensions().command_names().into_iter().map(str::to_string));
        drop(session);
        self.overlay = Some(Overlay::command_palette(names, self.theme.clone()));
    }

    async fn open_model_picker(&mut self) {
        // A full catalog fetch is `kestrel-cli`'s job at startup; the
        // picker always offers at least the session's current model so it
        // is never shown empty.
        let current = self.facade.0.lock().await.model().clone();
        self.overlay = Some(Overlay::model_picker(vec![current], self.theme.clone()));
    }

    async fn open_session_browser(&mut self) {
        self.overlay = Some(Overlay::session_browser(Vec::new(), self.theme.clone()));
    }

    async fn open_tree_overview(&mut self) {
        let overview = self.facade.0.lock().await.tree_overview().await;
        match overview {
            Ok(overview) => self.overlay = Some(Overlay::text(overview, self.theme.clone())),
            Err(error) => self.status = Some(format!("tree overview failed: {error}")),
        }
    }

    fn new_session(&mut self) {
        self.status = Some("use /new <path> to start a session at a specific path".to_string());
    }

    async fn apply_overlay_outcome(&mut self, outcome: OverlayOutcome) -> Result<()> {
        match outcome {
            OverlayOutcome::Cancelled => {}
            OverlayOutcome::CommandChosen(name) => self.run_builtin_or_extension(&name, "").await?,
            OverlayOutcome::ModelChosen(model) => self.facade.0.lock().await.set_model(model),
            OverlayOutcome::SessionChosen(path) => {
                let result = self.facade.0.lock().await.switch_session(path).await;
                if let Err(error) = result {
                    self.status = Some(format!("switch session failed: {error}"));
                }
            }
        }
        Ok(())
    }

    async fn handle_submit(&mut self, text: String) -> Result<()> {
        if let Some(rest) = text.strip_prefix('/') {
            let (name, args) = split_command(rest);
            let name = name.to_string();
            let args = args.to_string();
            self.run_builtin_or_extension(&name, &args).await?;
        } else if let Some(command) = text.strip_prefix("!!") {
            self.run_shell(command.to_string(), true).await;
        } else if let Some(command) = text.strip_prefix('!') {
            self.run_shell(command.to_string(), false).await;
        } else {
            let result = self.facade.0.lock().await.send_user_message(text, self.steering_mode).await;
            if let Err(error) = result {
                self.status = Some(format!("send failed: {error}"));
            }
        }
        Ok(())
    }

    async fn run_builtin_or_extension(&mut self, name: &str, args: &str) -> Result<()> {
        match parse_builtin(name) {
            Some(BuiltinCommand::Model) => self.open_model_picker().await,
            Some(BuiltinCommand::Sessions) => self.open_session_browser().await,
            Some(BuiltinCommand::Help) => self.overlay = Some(Overlay::help(self.theme.clone())),
            Some(BuiltinCommand::New) => self.new_session(),
            Some(BuiltinCommand::Tree) => self.open_tree_overview().await,
            Some(BuiltinCommand::Compact) => {
                let instructions = if args.is_empty() { None } else { Some(args.to_string()) };
                let result = self.facade.0.lock().await.compact(instructions).await;
                if let Err(error) = result {
                    self.status = Some(format!("compact failed: {error}"));
                }
            }
            None => {
                let command = self.facade.0.lock().await.extensions().command(name).cloned();
                match command {
                    Some(command) => command.run(args, &self.facade).await,
                    None => self.status = Some(format!("unknown command: /{name}")),
                }
            }
        }
        Ok(())
    }

    async fn run_shell(&mut self, command: String, exclude_from_context: bool) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = rx.recv().await {
                lines.push(line);
            }
            lines
        });

        let exit_code = self.facade.0.lock().await.execute_bash(command.clone(), exclude_from_context, tx).await;
        let lines = reader.await.unwrap_or_default();

        match exit_code {
            Ok(code) => {
                if exclude_from_context {
                    self.excluded_bash_echo.push(format!("$ {command}"));
                    self.excluded_bash_echo.extend(lines);
                    if code != 0 {
                        self.excluded_bash_echo.push(format!("exit {code}"));
                    }
                }
            }
            Err(error) => self.status = Some(format!("shell command failed: {error}")),
        }
    }

    async fn handle_session_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Agent(AgentEvent::AgentStart) => {
                self.busy = true;
                self.loader.set_label("Working");
            }
            SessionEvent::Agent(AgentEvent::AgentEnd { .. }) => {
                self.busy = false;
                self.status = None;
            }
            SessionEvent::Agent(AgentEvent::ToolExecutionStart { name, .. }) => {
                self.loader.set_label(format!("Running {name}"));
            }
            SessionEvent::Agent(_) => {}
            SessionEvent::AutoCompactionStart { reason } => {
                let label = match reason {
                    CompactionReason::Proactive => "auto-compacting (approaching context limit)",
                    CompactionReason::Reactive => "auto-compacting (retrying after context overflow)",
                };
                self.status = Some(label.to_string());
            }
            SessionEvent::AutoCompactionEnd { outcome } => {
                self.status = match outcome {
                    CompactionOutcome::Result => None,
                    CompactionOutcome::Aborted => Some("auto-compaction aborted".to_string()),
                    CompactionOutcome::WillRetry => Some("auto-compaction finished, retrying turn".to_string()),
                };
            }
            SessionEvent::AutoRetryStart { attempt, max_attempts, delay_ms } => {
                self.status = Some(format!("retrying turn (attempt {attempt}/{max_attempts}, waiting {delay_ms}ms)"));
            }
            SessionEvent::AutoRetryEnd { success, final_error } => {
                self.status = if success { None } else { Some(format!("turn failed: {}", final_error.unwrap_or_else(|| "unknown error".to_string()))) };
            }
        }
        self.redraw()?;
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let messages = self.facade.0.try_lock().map(|session| session.messages().to_vec()).unwrap_or_default();
        let mut lines = render_messages(&messages, &self.theme, self.columns);
        lines.extend(self.excluded_bash_echo.iter().cloned());

        if self.busy {
            lines.extend(self.loader.render(self.columns));
        }
        if let Some(status) = &self.status {
            lines.push(self.theme.paint(&[self.theme.warning], status));
        }

        let overlay_row = lines.len() as u16;
        lines.extend(self.editor.render(self.columns));

        if let Some(overlay) = &self.overlay {
            let width = self.columns.saturating_sub(4);
            let overlay_lines = overlay.render(width);
            let mut stack = kestrel_render::OverlayStack::new();
            stack.push(kestrel_render::OverlayEntry { component: Box::new(StaticLines(overlay_lines)), row: overlay_row, col: 2, width, saved_focus: None });
            lines = stack.composite(lines, self.columns);
        }

        let pass = self.renderer.render(lines, self.columns)?;
        if !pass.output.is_empty() {
            let mut stdout = std::io::stdout();
            stdout.write_all(pass.output.as_bytes()).map_err(TuiError::Size)?;
            stdout.flush().map_err(TuiError::Size)?;
        }
        Ok(())
    }
}

struct StaticLines(Vec<String>);

impl kestrel_render::Component for StaticLines {
    fn render(&self, _width: u16) -> Vec<String> {
        self.0.clone()
    }
}
