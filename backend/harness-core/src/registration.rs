//! Pushing project, library and module state to the worker.

use crate::channel::TestClient;
use crate::error::{HarnessError, RegistrationError};

use common::ErrorLocation;
use models::{
    LibrarySet, LibrarySetId, LocalStyleHolder, ModuleDescriptor, ModuleId, ProjectDescriptor,
};

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use log::{debug, info};
use tokio::io::AsyncWrite;

/// Finds the source files of a module that declare local style rules.
pub trait StyleHolderCollector: Send + Sync {
    fn collect(&self, module: &ModuleDescriptor) -> Vec<LocalStyleHolder>;
}

/// State a session registers before running any document.
#[derive(Clone)]
pub struct SessionSetup {
    project: ProjectDescriptor,
    library_set: LibrarySet,
    modules: Vec<ModuleDescriptor>,
    style_holders: Option<Arc<dyn StyleHolderCollector>>,
}

impl SessionSetup {
    pub fn new(project: ProjectDescriptor, library_set: LibrarySet) -> Self {
        Self {
            project,
            library_set,
            modules: Vec::new(),
            style_holders: None,
        }
    }

    pub fn with_module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    /// Defer module registration until local style holders are collected.
    pub fn with_local_style_holders(mut self, collector: Arc<dyn StyleHolderCollector>) -> Self {
        self.style_holders = Some(collector);
        self
    }

    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    pub fn library_set(&self) -> &LibrarySet {
        &self.library_set
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn requires_local_style_holders(&self) -> bool {
        self.style_holders.is_some()
    }
}

/// Modules of a session, by name, and whether they reached the worker yet.
pub struct ModuleRegistry {
    library_sets: Vec<LibrarySetId>,
    registered: HashMap<String, ModuleId>,
    deferred: HashMap<String, ModuleDescriptor>,
    style_holders: Option<Arc<dyn StyleHolderCollector>>,
}

impl ModuleRegistry {
    /// Id of `name`, registering it first if it was deferred.
    ///
    /// A deferred module is registered with the local style holders the
    /// collector finds for it, in a change of its own.
    pub async fn resolve<W: AsyncWrite + Unpin>(
        &mut self,
        client: &mut TestClient<W>,
        name: &str,
    ) -> Result<ModuleId, HarnessError> {
        if let Some(id) = self.registered.get(name) {
            return Ok(*id);
        }

        let Some(module) = self.deferred.get(name) else {
            return Err(RegistrationError::UnknownModule {
                message: format!("Module {name} is not part of this session"),
                location: ErrorLocation::from(Location::caller()),
            }
            .into());
        };

        let holders = self
            .style_holders
            .as_ref()
            .map(|collector| collector.collect(module))
            .unwrap_or_default();
        debug!(
            "Collected {} local style holders for module {name}",
            holders.len()
        );

        let module = module.clone().with_local_style_holders(holders);
        let id = client.register_module(&module, &self.library_sets).await?;

        self.deferred.remove(name);
        self.registered.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn registered(&self, name: &str) -> Option<ModuleId> {
        self.registered.get(name).copied()
    }

    pub fn is_deferred(&self, name: &str) -> bool {
        self.deferred.contains_key(name)
    }
}

/// Open the project, register the library set, then register every module
/// unless registration is deferred for style holder collection.
pub async fn register_state<W: AsyncWrite + Unpin>(
    client: &mut TestClient<W>,
    setup: &SessionSetup,
) -> Result<ModuleRegistry, HarnessError> {
    client.open_project(&setup.project).await?;
    client.register_library_set(&setup.library_set).await?;

    let mut registry = ModuleRegistry {
        library_sets: vec![setup.library_set.id().clone()],
        registered: HashMap::new(),
        deferred: HashMap::new(),
        style_holders: setup.style_holders.clone(),
    };

    for module in &setup.modules {
        if setup.requires_local_style_holders() {
            registry
                .deferred
                .insert(module.name().to_string(), module.clone());
            continue;
        }

        let id = client
            .register_module(module, &registry.library_sets)
            .await?;
        registry.registered.insert(module.name().to_string(), id);
    }

    info!(
        "Registered project {} with {} libraries, {} modules ({} deferred)",
        setup.project.name(),
        setup.library_set.libraries().len(),
        registry.registered.len(),
        registry.deferred.len()
    );
    Ok(registry)
}
