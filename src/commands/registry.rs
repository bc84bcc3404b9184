//! Command handler registry
//!
//! - **Version**: 1.1.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 1.1.0: Build the full registry from `create_all_handlers`; sorted name listing
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::SlashCommandHandler;
use super::handlers::create_all_handlers;

/// Command name to handler lookup
///
/// A handler that declares several names is stored once per name, sharing
/// the same `Arc`.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn SlashCommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in command
    pub fn with_all_handlers() -> Self {
        let mut registry = Self::new();
        for handler in create_all_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Add `handler` under each of its names; a later registration wins a name clash
    pub fn register(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered names (not distinct handlers)
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names in alphabetical order
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::CommandContext;
    use crate::commands::handler::CommandInvocation;
    use crate::transport::Reply;
    use anyhow::Result;
    use async_trait::async_trait;

    struct NamedHandler(&'static [&'static str]);

    #[async_trait]
    impl SlashCommandHandler for NamedHandler {
        fn command_names(&self) -> &'static [&'static str] {
            self.0
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            invocation: &CommandInvocation,
        ) -> Result<Vec<Reply>> {
            Ok(vec![Reply::text(invocation.name.clone())])
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("stats").is_none());
    }

    #[test]
    fn test_handler_shared_across_names() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(NamedHandler(&["topic", "closetopic", "forward"])));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.command_names(), vec!["closetopic", "forward", "topic"]);
        let a = registry.get("topic").unwrap();
        let b = registry.get("forward").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!registry.contains("topics"));
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = CommandRegistry::new();
        let first: Arc<dyn SlashCommandHandler> = Arc::new(NamedHandler(&["stats"]));
        let second: Arc<dyn SlashCommandHandler> = Arc::new(NamedHandler(&["stats", "month"]));
        registry.register(Arc::clone(&first));
        registry.register(Arc::clone(&second));

        assert_eq!(registry.len(), 2);
        assert!(Arc::ptr_eq(&registry.get("stats").unwrap(), &second));
    }

    #[test]
    fn test_registry_with_all_handlers() {
        let registry = CommandRegistry::with_all_handlers();
        assert_eq!(
            registry.command_names(),
            vec![
                "closetopic", "forward", "help", "month", "newtopic", "report", "reset", "start",
                "stats", "stop", "topic", "topics",
            ]
        );
    }
}
