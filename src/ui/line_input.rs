use std::io;
use std::path::MAIN_SEPARATOR;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MAX_SCANNED_ENTRIES: usize = 1000;
const MAX_CANDIDATES: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Submit,
    Cancel,
}

/// Single-line editor used for written answers and the question paper path.
/// Path fields complete file names on Tab.
#[derive(Clone, Debug, Default)]
pub struct LineInput {
    text: String,
    /// Cursor position as a char index.
    cursor: usize,
    completion: Option<PathCompletion>,
}

#[derive(Clone, Debug, Default)]
struct PathCompletion {
    candidates: Vec<String>,
    selected: Option<usize>,
    /// Set when the directory could not be listed.
    failed: bool,
}

impl LineInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
            completion: None,
        }
    }

    /// A field that completes file system paths on Tab and BackTab.
    pub fn path(text: &str) -> Self {
        Self {
            completion: Some(PathCompletion::default()),
            ..Self::new(text)
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn set_value(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
        self.reset_completion();
    }

    pub fn completion_failed(&self) -> bool {
        self.completion.as_ref().is_some_and(|c| c.failed)
    }

    /// (before cursor, char under cursor, after cursor). The middle part is
    /// `None` when the cursor sits past the last char.
    pub fn render_parts(&self) -> (&str, Option<char>, &str) {
        let at = self.byte_at(self.cursor);
        let mut rest = self.text[at..].chars();
        match rest.next() {
            Some(ch) => (&self.text[..at], Some(ch), rest.as_str()),
            None => (&self.text, None, ""),
        }
    }

    pub fn handle(&mut self, key: KeyEvent) -> InputResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return InputResult::Cancel,
            KeyCode::Enter => return InputResult::Submit,
            KeyCode::Tab => {
                self.complete(true);
                return InputResult::Continue;
            }
            KeyCode::BackTab => {
                self.complete(false);
                return InputResult::Continue;
            }
            _ => {}
        }

        self.reset_completion();
        let len = self.text.chars().count();
        match key.code {
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.remove_at(self.cursor);
            }
            KeyCode::Delete if self.cursor < len => self.remove_at(self.cursor),
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = len,
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char('w') if ctrl => self.delete_word_back(),
            KeyCode::Char(ch) if !ctrl => {
                let at = self.byte_at(self.cursor);
                self.text.insert(at, ch);
                self.cursor += 1;
            }
            _ => {}
        }
        InputResult::Continue
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(b, _)| b)
    }

    fn remove_at(&mut self, char_idx: usize) {
        let at = self.byte_at(char_idx);
        if at < self.text.len() {
            self.text.remove(at);
        }
    }

    /// Skip whitespace, then the word before it.
    fn delete_word_back(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut pos = self.cursor;
        while pos > 0 && chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && !chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        let (start, end) = (self.byte_at(pos), self.byte_at(self.cursor));
        self.text.replace_range(start..end, "");
        self.cursor = pos;
    }

    fn reset_completion(&mut self) {
        if let Some(completion) = self.completion.as_mut() {
            *completion = PathCompletion::default();
        }
    }

    fn complete(&mut self, forward: bool) {
        if self.cursor < self.text.chars().count() {
            return;
        }
        let Some(completion) = self.completion.as_mut() else {
            return;
        };

        let next = match completion.selected {
            None => {
                let (candidates, failed) = match list_candidates(&self.text) {
                    Ok(candidates) => (candidates, false),
                    Err(_) => (Vec::new(), true),
                };
                completion.candidates = candidates;
                completion.failed = failed;
                if completion.candidates.is_empty() {
                    return;
                }
                0
            }
            Some(current) => {
                let count = completion.candidates.len();
                if forward {
                    (current + 1) % count
                } else {
                    (current + count - 1) % count
                }
            }
        };
        completion.selected = Some(next);
        self.text = completion.candidates[next].clone();
        self.cursor = self.text.chars().count();
    }
}

/// Split `seed` at its last separator and list matching directory entries.
fn list_candidates(seed: &str) -> io::Result<Vec<String>> {
    let split = seed.rfind(['/', '\\']).map_or(0, |pos| pos + 1);
    let (dir, partial) = seed.split_at(split);

    let listed_dir = match dir.strip_prefix('~') {
        Some(rest) => match dirs::home_dir() {
            Some(home) => format!("{}{rest}", home.display()),
            None => dir.to_string(),
        },
        None if dir.is_empty() => ".".to_string(),
        None => dir.to_string(),
    };

    let entries = std::fs::read_dir(listed_dir)?.map(|entry| {
        entry.map(|e| {
            let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
            (e.file_name().to_string_lossy().into_owned(), is_dir)
        })
    });
    filter_candidates(entries, dir, partial)
}

/// Directories first, then files, each alphabetical. Hidden entries only
/// match a partial name that starts with a dot.
fn filter_candidates(
    entries: impl Iterator<Item = io::Result<(String, bool)>>,
    dir: &str,
    partial: &str,
) -> io::Result<Vec<String>> {
    let show_hidden = partial.starts_with('.');
    let mut found: Vec<(bool, String)> = Vec::new();

    for entry in entries.take(MAX_SCANNED_ENTRIES) {
        let (name, is_dir) = entry?;
        if (!show_hidden && name.starts_with('.')) || !name.starts_with(partial) {
            continue;
        }
        let full = if is_dir {
            format!("{dir}{name}{MAIN_SEPARATOR}")
        } else {
            format!("{dir}{name}")
        };
        found.push((is_dir, full));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    found.truncate(MAX_CANDIDATES);
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_str(input: &mut LineInput, s: &str) {
        for ch in s.chars() {
            input.handle(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn typing_inserts_at_cursor() {
        let mut input = LineInput::new("");
        type_str(&mut input, "mitosis");
        input.handle(key(KeyCode::Home));
        type_str(&mut input, "a ");
        assert_eq!(input.value(), "a mitosis");
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn backspace_and_delete_handle_multibyte_chars() {
        let mut input = LineInput::new("µm²");
        input.handle(key(KeyCode::Backspace));
        assert_eq!(input.value(), "µm");
        input.handle(key(KeyCode::Home));
        input.handle(key(KeyCode::Delete));
        assert_eq!(input.value(), "m");
        input.handle(key(KeyCode::End));
        input.handle(key(KeyCode::Delete));
        assert_eq!(input.value(), "m");
    }

    #[test]
    fn cursor_movement_is_clamped() {
        let mut input = LineInput::new("ab");
        input.handle(key(KeyCode::Right));
        assert_eq!(input.cursor, 2);
        input.handle(ctrl('a'));
        input.handle(key(KeyCode::Left));
        assert_eq!(input.cursor, 0);
        input.handle(ctrl('e'));
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn ctrl_w_deletes_previous_word() {
        let mut input = LineInput::new("cell wall  ");
        input.handle(ctrl('w'));
        assert_eq!(input.value(), "cell ");
        input.handle(ctrl('u'));
        assert!(input.is_blank());
    }

    #[test]
    fn render_parts_split_around_cursor() {
        let mut input = LineInput::new("abc");
        assert_eq!(input.render_parts(), ("abc", None, ""));
        input.handle(key(KeyCode::Left));
        input.handle(key(KeyCode::Left));
        assert_eq!(input.render_parts(), ("a", Some('b'), "c"));
    }

    #[test]
    fn enter_submits_and_esc_cancels() {
        let mut input = LineInput::new("x");
        assert_eq!(input.handle(key(KeyCode::Enter)), InputResult::Submit);
        assert_eq!(input.handle(key(KeyCode::Esc)), InputResult::Cancel);
    }

    #[test]
    fn plain_field_ignores_tab() {
        let mut input = LineInput::new("/");
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "/");
        assert!(!input.completion_failed());
    }

    #[test]
    fn path_field_cycles_candidates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("paper-2023.pdf"), "").unwrap();
        std::fs::write(dir.path().join("paper-2024.pdf"), "").unwrap();
        std::fs::create_dir(dir.path().join("papers")).unwrap();
        let seed = format!("{}/pap", dir.path().display());

        let mut input = LineInput::path(&seed);
        input.handle(key(KeyCode::Tab));
        assert!(input.value().ends_with(&format!("papers{MAIN_SEPARATOR}")));
        input.handle(key(KeyCode::Tab));
        assert!(input.value().ends_with("paper-2023.pdf"));
        input.handle(key(KeyCode::BackTab));
        assert!(input.value().ends_with(&format!("papers{MAIN_SEPARATOR}")));

        input.handle(key(KeyCode::Char('x')));
        input.handle(key(KeyCode::Tab));
        assert!(input.value().ends_with("x"), "new seed has no matches");
    }

    #[test]
    fn path_field_reports_unreadable_dir() {
        let mut input = LineInput::path("/nonexistent_examprep_dir/");
        input.handle(key(KeyCode::Tab));
        assert!(input.completion_failed());
        input.handle(key(KeyCode::Left));
        assert!(!input.completion_failed());
    }

    #[test]
    fn filter_hides_dotfiles_unless_asked() {
        let entries = || {
            vec![
                Ok((".cache".to_string(), true)),
                Ok(("notes.txt".to_string(), false)),
                Ok(("archive".to_string(), true)),
            ]
            .into_iter()
        };
        let visible = filter_candidates(entries(), "d/", "").unwrap();
        assert_eq!(
            visible,
            [format!("d/archive{MAIN_SEPARATOR}"), "d/notes.txt".to_string()]
        );
        let hidden = filter_candidates(entries(), "d/", ".").unwrap();
        assert_eq!(hidden, [format!("d/.cache{MAIN_SEPARATOR}")]);
    }

    #[test]
    fn filter_propagates_entry_errors_and_caps_results() {
        let failing = vec![
            Ok(("a".to_string(), false)),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        ];
        assert!(filter_candidates(failing.into_iter(), "", "").is_err());

        let many = (0..300).map(|i| Ok((format!("f{i:03}"), false)));
        assert_eq!(filter_candidates(many, "", "").unwrap().len(), MAX_CANDIDATES);
    }
}
