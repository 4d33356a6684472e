use crate::{
    buffer::state::RecordContext, encoder::Encoder, error::ValidationError, storage::Storage,
};

#[derive(Debug, Default)]
pub(crate) struct BeginDebugLabel {
    label: String,
}

impl BeginDebugLabel {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        label: &str,
    ) -> Result<(), ValidationError> {
        self.label.clear();
        self.label.push_str(label);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.push_label(&self.label);
    }
}

#[derive(Debug, Default)]
pub(crate) struct EndDebugLabel;

impl EndDebugLabel {
    pub(crate) fn set_content(&mut self, _ctx: &mut RecordContext<'_>) -> Result<(), ValidationError> {
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.pop_label();
    }
}

#[derive(Debug, Default)]
pub(crate) struct InsertDebugLabel {
    label: String,
}

impl InsertDebugLabel {
    pub(crate) fn set_content(
        &mut self,
        _ctx: &mut RecordContext<'_>,
        label: &str,
    ) -> Result<(), ValidationError> {
        self.label.clear();
        self.label.push_str(label);
        Ok(())
    }

    pub(crate) fn encode(&self, encoder: &mut Encoder<'_>, _storage: &Storage) {
        encoder.native.insert_debug_signpost(&self.label);
    }
}
