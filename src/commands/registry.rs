//! Command registry
//!
//! Built once at startup, read-only afterwards. The registry owns the full
//! command table; nothing registers after construction, so concurrent
//! lookups need no synchronization beyond the shared reference.

use super::{admin, key, search, Command};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all available commands, keyed by lower-cased name.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry holding every built-in command
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        registry.register(Arc::new(admin::PingCommand));
        registry.register(Arc::new(admin::FlushDbCommand));

        registry.register(Arc::new(key::DelCommand));
        registry.register(Arc::new(key::ExistsCommand));
        registry.register(Arc::new(key::TypeCommand));
        registry.register(Arc::new(key::RenameCommand));
        registry.register(Arc::new(key::RenameNxCommand));

        registry.register(Arc::new(search::KeysCommand));

        registry
    }

    /// Register a command. A later registration for the same name wins.
    fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_lowercase(), command);
    }

    /// Look up a command by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_lowercase()).cloned()
    }

    /// All registered command names
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
