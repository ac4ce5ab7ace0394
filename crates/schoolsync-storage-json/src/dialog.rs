use std::{collections::VecDeque, io, path::PathBuf, sync::Mutex};

/// Native file chooser offered by the desktop shell.
///
/// `Ok(None)` means the user dismissed the dialog.
pub trait FileDialog: Send + Sync {
    fn pick_save_path(&self, suggested_name: &str) -> io::Result<Option<PathBuf>>;
    fn pick_open_path(&self) -> io::Result<Option<PathBuf>>;
}

/// Dialog that replays pre-recorded answers, used for scripted and headless runs.
///
/// Once the queue is drained every further prompt is treated as dismissed.
#[derive(Debug, Default)]
pub struct ScriptedDialog {
    answers: Mutex<VecDeque<Option<PathBuf>>>,
}

impl ScriptedDialog {
    pub fn new(answers: impl IntoIterator<Item = Option<PathBuf>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }

    pub fn answering(path: impl Into<PathBuf>) -> Self {
        Self::new([Some(path.into())])
    }

    pub fn dismissing() -> Self {
        Self::default()
    }

    fn next(&self) -> Option<PathBuf> {
        self.answers
            .lock()
            .map(|mut queue| queue.pop_front().flatten())
            .unwrap_or(None)
    }
}

impl FileDialog for ScriptedDialog {
    fn pick_save_path(&self, _suggested_name: &str) -> io::Result<Option<PathBuf>> {
        Ok(self.next())
    }

    fn pick_open_path(&self) -> io::Result<Option<PathBuf>> {
        Ok(self.next())
    }
}
