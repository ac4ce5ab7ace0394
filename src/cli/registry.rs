use std::collections::HashMap;

use crate::cli::shell_context::{CommandResult, ShellContext};

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
        }
    }
}

/// Commands in registration order, looked up by lower-case name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandEntry>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) {
        let name = entry.name;
        if self.commands.insert(name, entry).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn list(&self) -> Vec<&CommandEntry> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn handler(&self, name: &str) -> Option<CommandHandler> {
        self.commands.get(name).map(|entry| entry.handler)
    }

    /// Closest registered name within three edits of `input`.
    pub fn suggest(&self, input: &str) -> Option<&'static str> {
        let input = input.to_ascii_lowercase();
        self.names()
            .map(|name| (strsim::levenshtein(name, &input), name))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ShellContext, _: &[&str]) -> CommandResult {
        Ok(())
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(CommandEntry::new("save", "", "save", noop));
        registry.register(CommandEntry::new("restore", "", "restore", noop));
        registry.register(CommandEntry::new("sync", "", "sync", noop));
        registry
    }

    #[test]
    fn keeps_registration_order() {
        let names: Vec<_> = registry().names().collect();
        assert_eq!(names, ["save", "restore", "sync"]);
    }

    #[test]
    fn duplicate_registration_replaces_entry_once() {
        let mut registry = registry();
        registry.register(CommandEntry::new("save", "again", "save", noop));
        assert_eq!(registry.list().len(), 3);
        assert_eq!(registry.get("save").map(|e| e.description), Some("again"));
    }

    #[test]
    fn suggests_close_names_only() {
        let registry = registry();
        assert_eq!(registry.suggest("restroe"), Some("restore"));
        assert_eq!(registry.suggest("SYNK"), Some("sync"));
        assert_eq!(registry.suggest("completely-different"), None);
    }
}
