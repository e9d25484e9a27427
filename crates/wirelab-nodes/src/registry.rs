//! Explicit node kind registry.

use std::collections::HashMap;
use std::sync::Arc;

use wirelab_common::{LabError, LabResult};
use wirelab_types::NodeConfig;

use crate::{kinds, NodeRef};

/// Constructor producing a node implementation from a resolved config.
pub type NodeInitializer = Arc<dyn Fn(NodeConfig) -> NodeRef + Send + Sync>;

/// Maps kind names to node constructors and default credentials.
///
/// Built once at process start and passed by reference to the resolver;
/// write-once, read-many, no runtime locking needed.
#[derive(Default)]
pub struct NodeRegistry {
    kinds: HashMap<String, NodeInitializer>,
    credentials: HashMap<String, (String, String)>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with all built-in kinds registered.
    pub fn with_default_kinds() -> Self {
        let mut reg = Self::new();
        kinds::register_defaults(&mut reg).expect("built-in kind names collide");
        reg
    }

    /// Registers a constructor under one or more kind names.
    ///
    /// Registering a name twice is a fatal configuration error, surfaced
    /// at process start rather than at resolution time.
    pub fn register<F>(&mut self, names: &[&str], init: F) -> LabResult<()>
    where
        F: Fn(NodeConfig) -> NodeRef + Send + Sync + 'static,
    {
        let init: NodeInitializer = Arc::new(init);
        for name in names {
            if self.kinds.contains_key(*name) {
                return Err(LabError::DuplicateKind {
                    kind: name.to_string(),
                });
            }
            self.kinds.insert(name.to_string(), Arc::clone(&init));
        }
        Ok(())
    }

    /// Registers default credentials for one or more kind names.
    pub fn register_credentials(
        &mut self,
        names: &[&str],
        user: &str,
        password: &str,
    ) -> LabResult<()> {
        for name in names {
            if self.credentials.contains_key(*name) {
                return Err(LabError::DuplicateKind {
                    kind: name.to_string(),
                });
            }
            self.credentials
                .insert(name.to_string(), (user.to_string(), password.to_string()));
        }
        Ok(())
    }

    /// Returns the default `(user, password)` for a kind, if registered.
    pub fn credentials_for(&self, kind: &str) -> Option<(&str, &str)> {
        self.credentials
            .get(kind)
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Returns all registered kind names, sorted.
    pub fn kind_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.kinds.keys().cloned().collect();
        names.sort();
        names
    }

    /// Constructs a node for the given config, resolving its kind.
    ///
    /// Unknown kinds fail with an error enumerating every registered kind.
    pub fn new_node(&self, config: NodeConfig) -> LabResult<NodeRef> {
        match self.kinds.get(&config.kind) {
            Some(init) => Ok(init(config)),
            None => Err(LabError::UnknownKind {
                node: config.short_name,
                kind: config.kind,
                registered: self.kind_names(),
            }),
        }
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.kind_names())
            .finish()
    }
}
