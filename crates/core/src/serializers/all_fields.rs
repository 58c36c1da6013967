//! Every declared attribute of a type becomes an explicit field, so
//! `{type: shape, name: diamond, color: black}` needs no `fields` bucket.

use std::sync::Arc;

use crate::blackboard::{Blackboard, SerializerGroup, SlotKey};
use crate::context::{ReadContext, WriteContext};
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::registry::TypeHandle;
use crate::serializers::{handle_in_progress, ExplicitField, Serializer, Step};

const FIELDS_ADDED: SlotKey<()> = SlotKey::new("all-fields-explicit");

#[derive(Debug, Clone, Copy, Default)]
pub struct AllFieldsExplicit;

impl AllFieldsExplicit {
    fn add_fields(&self, blackboard: &mut Blackboard) -> Step {
        if blackboard.contains(FIELDS_ADDED) {
            return Step::NoOp;
        }
        let Some(handle) = handle_in_progress(blackboard).cloned() else {
            return Step::NoOp;
        };
        blackboard.insert(FIELDS_ADDED, ());
        let fields = explicit_fields(&handle);
        if fields.is_empty() {
            return Step::NoOp;
        }
        blackboard
            .serializers_mut()
            .add_all(SerializerGroup::InstantiatedType, fields);
        Step::Progressed
    }
}

fn explicit_fields(handle: &TypeHandle) -> Vec<Arc<dyn Serializer>> {
    handle
        .attributes()
        .iter()
        .map(|a| Arc::new(ExplicitField::new(a.name.as_str())) as Arc<dyn Serializer>)
        .collect()
}

impl Serializer for AllFieldsExplicit {
    fn name(&self) -> &str {
        "all-fields-explicit"
    }

    fn read(
        &self,
        _ctx: &mut ReadContext,
        _converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        Ok(self.add_fields(blackboard))
    }

    fn write(
        &self,
        _ctx: &mut WriteContext<'_>,
        _converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        Ok(self.add_fields(blackboard))
    }

    fn document(&self, type_name: &str, converter: &Converter<'_>) -> Option<String> {
        let handle = converter.registry().resolve_type(type_name)?;
        let names: Vec<String> = handle
            .attributes()
            .iter()
            .map(|a| format!("`{}`", a.name))
            .collect();
        Some(format!("Every field may be given as a top-level key: {}.", names.join(", ")))
    }
}
