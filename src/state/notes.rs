use crate::types::NoteRecord;
use std::collections::BTreeMap;

pub const DEFAULT_TOPIC: &str = "General";
/// Topic for a locally created note that has not been staged.
pub const DRAFT_TOPIC: &str = "Draft";
/// Topic for a new note that has a staged change.
pub const PENDING_TOPIC: &str = "Pending";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub path: String,
    pub title: String,
    pub topic: String,
    pub content: String,
}

impl From<NoteRecord> for Note {
    fn from(record: NoteRecord) -> Self {
        let title = if record.title.trim().is_empty() {
            extract_title(&record.content, &record.path)
        } else {
            record.title
        };
        let topic = if record.topic.trim().is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            record.topic
        };
        Self {
            path: record.path,
            title,
            topic,
            content: record.content,
        }
    }
}

/// Base notes as last fetched from the backend, keyed by path.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: BTreeMap<String, Note>,
    loaded: bool,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, notes: impl IntoIterator<Item = Note>) {
        self.notes = notes
            .into_iter()
            .map(|note| (note.path.clone(), note))
            .collect();
        self.loaded = true;
    }

    /// First load failed: show an empty knowledge base instead of a spinner.
    pub fn mark_loaded_empty(&mut self) {
        if !self.loaded {
            self.notes.clear();
            self.loaded = true;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, path: &str) -> Option<&Note> {
        self.notes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.notes.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Resolves a `[[wiki link]]` target: exact path, path without `.md`, then
    /// title, the last two compared case-insensitively.
    pub fn resolve_link(&self, target: &str) -> Option<&Note> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        if let Some(note) = self.notes.get(target) {
            return Some(note);
        }
        if let Some(note) = self.notes.get(&format!("{target}.md")) {
            return Some(note);
        }

        let wanted = target.to_lowercase();
        let wanted_stem = wanted.strip_suffix(".md").unwrap_or(&wanted);
        self.notes
            .values()
            .find(|note| {
                let path = note.path.to_lowercase();
                path.strip_suffix(".md").unwrap_or(&path) == wanted_stem
            })
            .or_else(|| {
                self.notes
                    .values()
                    .find(|note| note.title.to_lowercase() == wanted)
            })
    }
}

/// Title from the first `# ` heading, else a humanised file name.
pub fn extract_title(content: &str, path: &str) -> String {
    if let Some(heading) = content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|heading| !heading.is_empty())
    {
        return heading.to_string();
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Kebab-case file name for a note title, e.g. `Release Process!` -> `release-process.md`.
pub fn slug_path(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("untitled-note");
    }
    format!("{slug}.md")
}
