use super::context::RuntimeContext;
use super::mode::RuntimeMode;
use crossterm::event::KeyEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInputEvent {
    Key(KeyEvent),
    Paste(String),
    Interrupt,
}

pub trait FrontendAdapter<M: RuntimeMode> {
    fn poll_user_input(&mut self, mode: &M) -> Option<UserInputEvent>;
    fn render(&mut self, mode: &M, ctx: &RuntimeContext);
    fn should_quit(&self) -> bool;
}
