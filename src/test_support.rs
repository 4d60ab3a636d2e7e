use crate::state::Note;
use tokio::sync::Mutex as AsyncMutex;

/// Process-wide lock for tests that mutate environment variables.
/// Use `.blocking_lock()` in sync tests and `.lock().await` in async tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

pub fn note(path: &str, title: &str, topic: &str, content: &str) -> Note {
    Note {
        path: path.to_string(),
        title: title.to_string(),
        topic: topic.to_string(),
        content: content.to_string(),
    }
}

/// Small knowledge base shared by workspace and controller tests.
pub fn sample_notes() -> Vec<Note> {
    vec![
        note("faq.md", "FAQ", "General", "# FAQ\n"),
        note(
            "deploy.md",
            "Deploying",
            "Engineering",
            "# Deploying\n\nRun the pipeline.\n",
        ),
        note("oncall.md", "On-call", "Engineering", "# On-call\n\nA\nB\n"),
    ]
}
