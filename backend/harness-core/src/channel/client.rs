//! Outbound half of the session channel.
//!
//! Every command is one frame carrying its own string-table change. The
//! client also owns the registration order: project first, then the
//! session's single library set, then modules naming only sets that were
//! already sent. A call that would break the order is rejected before a
//! byte is written.

use crate::codec::{
    ClientMethod, MessageBody, StringRegistry, StringTable, TestTarget, encode_frame,
};
use crate::error::{HarnessError, ProtocolError, RegistrationError};

use common::ErrorLocation;
use models::{
    DocumentUnit, LibrarySet, LibrarySetId, ModuleDescriptor, ModuleId, ProjectDescriptor,
};

use std::collections::HashMap;
use std::io::Error as IoError;
use std::panic::Location;

use log::{debug, trace};
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub struct TestClient<W> {
    writer: W,
    strings: StringRegistry,
    project: Option<ProjectDescriptor>,
    library_set: Option<LibrarySetId>,
    modules: HashMap<ModuleId, ModuleDescriptor>,
    next_module_id: i32,
}

impl<W: AsyncWrite + Unpin> TestClient<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            strings: StringRegistry::new(),
            project: None,
            library_set: None,
            modules: HashMap::new(),
            next_module_id: 0,
        }
    }

    pub async fn open_project(&mut self, project: &ProjectDescriptor) -> Result<(), HarnessError> {
        if let Some(open) = &self.project {
            return Err(order_error(format!(
                "Project {} is already open, cannot open {}",
                open.name(),
                project.name()
            )));
        }

        self.send(ClientMethod::OpenProject, |table, body| {
            body.write_ref(table.intern(project.name()))
                .write_ref(table.intern(project.location_hash()));
            Ok(())
        })
        .await?;

        debug!("Opened project {}", project.name());
        self.project = Some(project.clone());
        Ok(())
    }

    /// Register the session's library set. Only one set is accepted.
    pub async fn register_library_set(&mut self, set: &LibrarySet) -> Result<(), HarnessError> {
        if self.project.is_none() {
            return Err(order_error(format!(
                "Library set {} registered before a project was opened",
                set.id()
            )));
        }
        if let Some(registered) = &self.library_set {
            return Err(order_error(format!(
                "Library set {registered} is already registered, cannot register {}",
                set.id()
            )));
        }

        self.send(ClientMethod::RegisterLibrarySet, |table, body| {
            body.write_ref(table.intern(set.id().as_str()))
                .write_u8(set.policy().wire_code())
                .write_len(set.libraries().len())?;
            for library in set.libraries() {
                body.write_ref(table.intern(library.name()))
                    .write_ref(table.intern(library.path()))
                    .write_u32(library.position())
                    .write_bool(library.is_user_library());
            }
            Ok(())
        })
        .await?;

        debug!(
            "Registered library set {} ({} libraries)",
            set.id(),
            set.libraries().len()
        );
        self.library_set = Some(set.id().clone());
        Ok(())
    }

    /// Register a module against already-registered library sets and return
    /// the id the worker will know it by.
    pub async fn register_module(
        &mut self,
        module: &ModuleDescriptor,
        library_sets: &[LibrarySetId],
    ) -> Result<ModuleId, HarnessError> {
        if self.project.is_none() {
            return Err(order_error(format!(
                "Module {} registered before a project was opened",
                module.name()
            )));
        }
        if let Some(unknown) = library_sets
            .iter()
            .find(|id| self.library_set.as_ref() != Some(*id))
        {
            return Err(order_error(format!(
                "Module {} references library set {unknown} before it was registered",
                module.name()
            )));
        }

        let id = ModuleId::new(self.next_module_id);
        self.send(ClientMethod::RegisterModule, |table, body| {
            body.write_i32(id.value())
                .write_ref(table.intern(module.name()))
                .write_len(library_sets.len())?;
            for set in library_sets {
                body.write_ref(table.intern(set.as_str()));
            }
            body.write_len(module.local_style_holders().len())?;
            for holder in module.local_style_holders() {
                body.write_ref(table.intern(&holder.path))
                    .write_len(holder.style_names.len())?;
                for style in &holder.style_names {
                    body.write_ref(table.intern(style));
                }
            }
            Ok(())
        })
        .await?;

        debug!("Registered module {} as {id}", module.name());
        self.next_module_id += 1;
        self.modules.insert(id, module.clone());
        Ok(id)
    }

    pub async fn open_document(
        &mut self,
        module: ModuleId,
        document: &DocumentUnit,
    ) -> Result<(), HarnessError> {
        self.require_module(module)?;

        self.send(ClientMethod::OpenDocument, |table, body| {
            body.write_i32(module.value())
                .write_ref(table.intern(document.file_name()))
                .write_bytes(document.content())?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub async fn test(&mut self, document: &str, target: &TestTarget) -> Result<(), HarnessError> {
        self.send(ClientMethod::Test, |table, body| {
            body.write_ref(table.intern(document));
            match target {
                TestTarget::Group(group) => {
                    body.write_u8(TestTarget::GROUP_KIND)
                        .write_ref(table.intern(group));
                }
                TestTarget::Variant(variant) => {
                    body.write_u8(TestTarget::VARIANT_KIND).write_i32(*variant);
                }
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub async fn close_project(&mut self) -> Result<(), HarnessError> {
        let Some(project) = self.project.take() else {
            return Err(order_error("No project is open".to_string()));
        };

        let sent = self
            .send(ClientMethod::CloseProject, |table, body| {
                body.write_ref(table.intern(project.location_hash()));
                Ok(())
            })
            .await;

        if let Err(e) = sent {
            self.project = Some(project);
            return Err(e.into());
        }

        debug!("Closed project {}", project.name());
        Ok(())
    }

    /// Flush and shut down the write half.
    pub async fn shutdown(&mut self) -> Result<(), IoError> {
        self.writer.flush().await?;
        self.writer.shutdown().await
    }

    #[track_caller]
    fn require_module(&self, module: ModuleId) -> Result<(), RegistrationError> {
        if self.modules.contains_key(&module) {
            Ok(())
        } else {
            Err(RegistrationError::UnknownModule {
                message: format!("Module {module} was never registered"),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    /// Encode one frame in a fresh change and write it. The change is only
    /// committed once the frame is flushed.
    async fn send<F>(&mut self, method: ClientMethod, build: F) -> Result<(), ProtocolError>
    where
        F: FnOnce(&mut StringTable<'_>, &mut MessageBody) -> Result<(), ProtocolError>,
    {
        let mut table = self.strings.start_change();
        let mut body = MessageBody::new();
        build(&mut table, &mut body)?;

        let frame = encode_frame(method, &table, &body)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;

        trace!(
            "Sent {method:?}: {} bytes, {} new strings",
            frame.len(),
            table.added().len()
        );
        table.commit();
        Ok(())
    }
}

impl<W> TestClient<W> {
    /// Descriptor registered under `id`.
    pub fn module(&self, id: ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(&id)
    }

    pub fn strings(&self) -> &StringRegistry {
        &self.strings
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[track_caller]
fn order_error(message: String) -> HarnessError {
    RegistrationError::Order {
        message,
        location: ErrorLocation::from(Location::caller()),
    }
    .into()
}
