use super::context::RuntimeContext;
use super::event::AppEvent;
use super::frontend::FrontendAdapter;
use super::mode::RuntimeMode;
use anyhow::Result;
use tokio::sync::mpsc;

pub struct Runtime<M: RuntimeMode> {
    pub mode: M,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl<M: RuntimeMode> Runtime<M> {
    pub fn new(mode: M, events_rx: mpsc::UnboundedReceiver<AppEvent>) -> Self {
        Self { mode, events_rx }
    }

    /// Applies every background result already queued. Returns how many ran.
    pub fn drain_events(&mut self, ctx: &mut RuntimeContext) -> usize {
        let mut applied = 0usize;
        while let Ok(event) = self.events_rx.try_recv() {
            self.mode.on_app_event(event, ctx);
            applied += 1;
        }
        if applied > 0 {
            ctx.controller.sync_polling(&ctx.workspace);
        }
        applied
    }

    /// Waits for the next background result and applies it.
    pub async fn process_next_event(&mut self, ctx: &mut RuntimeContext) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.mode.on_app_event(event, ctx);
                ctx.controller.sync_polling(&ctx.workspace);
                true
            }
            None => false,
        }
    }

    pub async fn run<F: FrontendAdapter<M>>(
        &mut self,
        frontend: &mut F,
        ctx: &mut RuntimeContext,
    ) -> Result<()> {
        ctx.start();
        loop {
            self.drain_events(ctx);
            frontend.render(&self.mode, ctx);
            if frontend.should_quit() || self.mode.quit_requested() {
                break;
            }
            if let Some(input) = frontend.poll_user_input(&self.mode) {
                self.mode.on_frontend_event(input, ctx);
            }
            tokio::task::yield_now().await;
        }
        ctx.controller.shutdown();
        Ok(())
    }
}
