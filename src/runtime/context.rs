use super::controller::SubmissionController;
use crate::config::Config;
use crate::state::Workspace;

/// Everything a mode callback may read or mutate during one loop tick.
pub struct RuntimeContext {
    pub workspace: Workspace,
    pub controller: SubmissionController,
    pub config: Config,
}

impl RuntimeContext {
    pub fn new(workspace: Workspace, controller: SubmissionController, config: Config) -> Self {
        Self {
            workspace,
            controller,
            config,
        }
    }

    /// Kicks off the startup loads: the note list and earlier submissions.
    pub fn start(&self) {
        self.controller.load_notes();
        self.controller.load_submitted();
    }
}
