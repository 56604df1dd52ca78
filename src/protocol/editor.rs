//! # Record Editor
//!
//! Partial updates for one record. A [`RecordEditor`] owns a record, keeps a
//! dirty flag per field, and ships only the dirty fields as a patch: a
//! struct on the wire whose present fields are the changed ones.
//!
//! Edits can be grouped. `start_editing` / `stop_editing` nest, and the
//! patch is only reported ready when the outermost group closes with
//! something dirty.
//!
//! Patches use a copy of the descriptor in which every field is optional,
//! so a required field that did not change is never sent with its default
//! and cannot clobber the peer's value.

use std::sync::Arc;
use tracing::debug;

use crate::core::schema::StructDescriptor;
use crate::core::value::{Record, Value};
use crate::error::{CodecError, Result};
use crate::protocol::codec::StructCodec;
use crate::protocol::port::{ProtocolReader, ProtocolWriter};

#[derive(Debug, Clone)]
pub struct RecordEditor {
    state: Record,
    patch_descriptor: Arc<StructDescriptor>,
    dirty: Vec<bool>,
    group: usize,
}

impl RecordEditor {
    /// Edit `record`, starting clean
    pub fn new(record: Record) -> Result<Self> {
        let descriptor = record.descriptor();
        let patch_descriptor = StructDescriptor::new(
            descriptor.name(),
            descriptor.fields().iter().map(|f| f.to_optional()).collect(),
        )?;
        let dirty = vec![false; descriptor.len()];
        Ok(Self {
            state: record,
            patch_descriptor,
            dirty,
            group: 0,
        })
    }

    pub fn state(&self) -> &Record {
        &self.state
    }

    pub fn into_record(self) -> Record {
        self.state
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.state
            .descriptor()
            .field_by_name(name)
            .map(|(index, _)| index)
            .ok_or_else(|| CodecError::UnknownField(format!("{}.{name}", self.state.name())))
    }

    /// Set a field and mark it dirty
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.index_of(name)?;
        self.state.set(name, value)?;
        self.dirty[index] = true;
        Ok(())
    }

    /// Mark a field dirty without changing it, e.g. after mutating it
    /// through [`Record::get_mut`] on [`RecordEditor::state_mut`].
    pub fn mark_dirty(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.dirty[index] = true;
        Ok(())
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|flag| *flag = true);
    }

    /// Mutable access to the record. Changes made here are not tracked.
    pub fn state_mut(&mut self) -> &mut Record {
        &mut self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|flag| *flag)
    }

    pub fn is_field_dirty(&self, name: &str) -> Result<bool> {
        Ok(self.dirty[self.index_of(name)?])
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().filter(|flag| **flag).count()
    }

    /// Forget every pending change
    pub fn clean(&mut self) {
        self.dirty.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn start_editing(&mut self) {
        self.group += 1;
    }

    /// Close one editing group. Returns true when this closed the
    /// outermost group and a patch is pending.
    pub fn stop_editing(&mut self) -> bool {
        self.group = self.group.saturating_sub(1);
        self.group == 0 && self.is_dirty()
    }

    pub fn is_editing(&self) -> bool {
        self.group > 0
    }

    /// The dirty fields, each with its current value, as a record of the
    /// patch descriptor.
    pub fn patch(&self) -> Result<Record> {
        let mut patch = Record::new(Arc::clone(&self.patch_descriptor));
        for ((field, value, _), dirty) in self.state.iter_all().zip(&self.dirty) {
            if *dirty {
                patch.set(field.name(), value.clone())?;
            }
        }
        Ok(patch)
    }

    /// Copy every present field of `patch` into the state and mark it dirty.
    /// Returns the number of fields applied.
    pub fn apply(&mut self, patch: &Record) -> Result<usize> {
        if patch.name() != self.state.name() {
            return Err(CodecError::InvalidSchema(format!(
                "patch for {} applied to {}",
                patch.name(),
                self.state.name()
            )));
        }
        let mut applied = 0;
        for (field, value) in patch.iter_set() {
            let (index, _) = self
                .state
                .descriptor()
                .field_by_id(field.id())
                .ok_or_else(|| {
                    CodecError::UnknownField(format!("{}#{}", self.state.name(), field.id()))
                })?;
            self.state.set_by_id(field.id(), value.clone())?;
            self.dirty[index] = true;
            applied += 1;
        }
        Ok(applied)
    }

    /// Write the pending patch and mark the editor clean
    pub async fn write_patch<W>(&mut self, codec: &StructCodec, port: &mut W) -> Result<()>
    where
        W: ProtocolWriter + ?Sized,
    {
        let patch = self.patch()?;
        codec.write(port, &patch).await?;
        debug!(record = self.state.name(), fields = self.dirty_count(), "Patch written");
        self.clean();
        Ok(())
    }

    /// Read one patch and apply it. Fields unknown to this side are skipped
    /// by the codec like any other unknown field.
    pub async fn read_patch<R>(&mut self, codec: &StructCodec, port: &mut R) -> Result<usize>
    where
        R: ProtocolReader + ?Sized,
    {
        let patch = codec.read(port, &self.patch_descriptor).await?;
        let applied = self.apply(&patch)?;
        debug!(record = self.state.name(), fields = applied, "Patch applied");
        Ok(applied)
    }
}
