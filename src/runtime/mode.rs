use super::context::RuntimeContext;
use super::event::AppEvent;
use super::frontend::UserInputEvent;

pub trait RuntimeMode {
    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext);
    fn on_app_event(&mut self, event: AppEvent, ctx: &mut RuntimeContext);
    fn quit_requested(&self) -> bool;
}
