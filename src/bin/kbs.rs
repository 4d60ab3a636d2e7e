use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use kbstage::api::ApiClient;
use kbstage::app::{build_runtime, TuiMode};
use kbstage::config::Config;
use kbstage::logging;
use kbstage::runtime::context::RuntimeContext;
use kbstage::runtime::frontend::{FrontendAdapter, UserInputEvent};
use kbstage::runtime::mode::RuntimeMode;
use kbstage::terminal::TerminalSession;
use kbstage::ui::render::render_workspace;
use std::sync::Arc;
use std::time::Duration;

const INPUT_POLL: Duration = Duration::from_millis(16);

struct TuiFrontend {
    session: TerminalSession,
    quit: bool,
}

impl TuiFrontend {
    fn new() -> Result<Self> {
        Ok(Self {
            session: TerminalSession::enter()?,
            quit: false,
        })
    }
}

fn map_key(key: KeyEvent) -> Option<UserInputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(UserInputEvent::Interrupt)
        }
        _ => Some(UserInputEvent::Key(key)),
    }
}

impl FrontendAdapter<TuiMode> for TuiFrontend {
    fn poll_user_input(&mut self, mode: &TuiMode) -> Option<UserInputEvent> {
        if mode.quit_requested() {
            self.quit = true;
            return None;
        }
        let Ok(has_event) = event::poll(INPUT_POLL) else {
            self.quit = true;
            return None;
        };
        if !has_event {
            return None;
        }
        match event::read() {
            Ok(Event::Key(key)) => map_key(key),
            Ok(Event::Paste(text)) => Some(UserInputEvent::Paste(text)),
            Ok(_) => None,
            Err(error) => {
                tracing::error!(error = %error, "terminal input failed");
                self.quit = true;
                None
            }
        }
    }

    fn render(&mut self, mode: &TuiMode, ctx: &RuntimeContext) {
        let view = mode.view(ctx);
        if let Err(error) = self
            .session
            .terminal()
            .draw(|frame| render_workspace(frame, &view))
        {
            tracing::error!(error = %error, "draw failed");
            self.quit = true;
        }
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    let log_target = logging::init(&config)?;
    tracing::info!(api_url = %config.api_url, ?log_target, "starting kbs");

    let client = ApiClient::new(&config)?;
    let (mut runtime, mut ctx) = build_runtime(config, Arc::new(client));
    let mut frontend = TuiFrontend::new()?;
    runtime.run(&mut frontend, &mut ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_c_maps_to_interrupt() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(key), Some(UserInputEvent::Interrupt));
    }

    #[test]
    fn key_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
        key.kind = KeyEventKind::Press;
        assert_eq!(map_key(key), Some(UserInputEvent::Key(key)));
    }
}
