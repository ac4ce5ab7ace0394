use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use schoolsync_config::ConfigManager;
use schoolsync_core::{BackendKind, Clock};
use schoolsync_storage_json::FilesystemBackend;
use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::{
    cli::{
        commands,
        output::{self, TerminalNotifier},
        prompt::PromptDialog,
        registry::{CommandEntry, CommandRegistry},
    },
    AppError, AppServices, BackupContext, CliError, CommandError, ReloadHandle,
};

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

/// Set by a successful restore; the shell rebuilds its session on the next turn.
#[derive(Debug, Default)]
pub struct ReloadFlag(AtomicBool);

impl ReloadFlag {
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl ReloadHandle for ReloadFlag {
    fn request_reload(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Services and backup context for one load of the application state.
pub struct Session {
    pub config_manager: ConfigManager,
    pub backend_kind: BackendKind,
    pub filesystem: Option<FilesystemBackend>,
    pub clock: Arc<dyn Clock>,
    pub backup: BackupContext,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub runtime: Runtime,
    pub dialog: Arc<PromptDialog>,
    pub session: Session,
    reload: Arc<ReloadFlag>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode, interactive_prompts: bool) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let runtime = Builder::new_multi_thread().enable_all().build()?;
        let dialog = Arc::new(PromptDialog::new(interactive_prompts));
        let reload = Arc::new(ReloadFlag::default());
        let session = open_session(&runtime, &dialog, &reload)?;

        Ok(Self {
            mode,
            registry,
            runtime,
            dialog,
            session,
            reload,
            running: true,
        })
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.handler(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        let result = handler(self, args);
        self.dialog.clear();
        let control = match result {
            Ok(()) => LoopControl::Continue,
            Err(CommandError::ExitRequested) => LoopControl::Exit,
            Err(err) => return Err(err),
        };
        if self.reload.take() {
            self.reload_session()?;
        }
        Ok(control)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        if let Some(best) = self.registry.suggest(input) {
            output::info(format!("Suggestion: `{best}`?"));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        output::error(err);
    }

    /// Drops every piece of in-memory state and loads it again from disk and
    /// the remote store.
    fn reload_session(&mut self) -> Result<(), AppError> {
        self.session.backup.shutdown();
        self.session = open_session(&self.runtime, &self.dialog, &self.reload)?;
        info!("session reloaded after restore");
        output::info("Application state reloaded.");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.session.backup.shutdown();
    }
}

fn open_session(
    runtime: &Runtime,
    dialog: &Arc<PromptDialog>,
    reload: &Arc<ReloadFlag>,
) -> Result<Session, AppError> {
    let config_manager = ConfigManager::new()?;
    let services = AppServices::from_environment(config_manager, dialog.clone())?;
    let interval = services.auto_save_interval();
    let AppServices {
        config_manager,
        service,
        backend_kind,
        filesystem,
        clock,
        ..
    } = services;

    let backup = BackupContext::new(
        service,
        config_manager.clone(),
        Arc::clone(&clock),
        Arc::new(TerminalNotifier),
        reload.clone(),
        interval,
    );
    runtime.block_on(backup.start());

    Ok(Session {
        config_manager,
        backend_kind,
        filesystem,
        clock,
        backup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_flag_is_consumed_once() {
        let flag = ReloadFlag::default();
        assert!(!flag.take());
        flag.request_reload();
        assert!(flag.take());
        assert!(!flag.take());
    }
}
