use std::{
    collections::VecDeque,
    io,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use dialoguer::{theme::ColorfulTheme, Input};
use schoolsync_storage_json::FileDialog;

/// Terminal stand-in for the native file chooser.
///
/// Paths given on the command line are queued and answer the next prompt.
/// Otherwise the user is asked, and an empty answer dismisses the dialog.
/// Without a terminal every unanswered prompt counts as dismissed.
#[derive(Debug, Default)]
pub struct PromptDialog {
    interactive: bool,
    queued: Mutex<VecDeque<PathBuf>>,
}

impl PromptDialog {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            queued: Mutex::default(),
        }
    }

    pub fn queue(&self, path: impl Into<PathBuf>) {
        self.queue_slot().push_back(path.into());
    }

    pub fn clear(&self) {
        self.queue_slot().clear();
    }

    fn queue_slot(&self) -> MutexGuard<'_, VecDeque<PathBuf>> {
        self.queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, prompt: &str, initial: &str) -> io::Result<Option<PathBuf>> {
        if let Some(path) = self.queue_slot().pop_front() {
            return Ok(Some(path));
        }
        if !self.interactive {
            return Ok(None);
        }
        let theme = ColorfulTheme::default();
        let text = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(trimmed)))
        }
    }
}

impl FileDialog for PromptDialog {
    fn pick_save_path(&self, suggested_name: &str) -> io::Result<Option<PathBuf>> {
        self.answer("Save backup as (empty to cancel)", suggested_name)
    }

    fn pick_open_path(&self) -> io::Result<Option<PathBuf>> {
        self.answer("Backup file to restore (empty to cancel)", "")
    }
}
