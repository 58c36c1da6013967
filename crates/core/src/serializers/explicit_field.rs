//! Explicit fields: a field whose document key, aliases, constraint and
//! default are configured.
//!
//! Several explicit-field serializers may describe the same field, one per
//! type in a hierarchy. They pool their settings on the blackboard in an
//! extra `preparing-explicit-fields` phase, most specific first, each
//! setting only what is still unset. Aliases accumulate unless a more
//! specific type switched inheritance off. The pooled record then drives
//! matching in the second `manipulating` phase. Defaults are applied in
//! `handling-fields`, so a value under the fields bucket still wins.
//!
//! Key matching uses name mangling (`shapeWSize_Name` matches
//! `shape-w-size-name`) and accepts the field name itself as an alias. A
//! strict field accepts only its exact key name and aliases.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::blackboard::{Blackboard, SlotKey};
use crate::context::{child_path, ContextCore, ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::document::DocumentNode;
use crate::error::{ConvertError, ConvertErrorKind};
use crate::mangle::keys_match;
use crate::serializers::{
    handle_in_progress, has_field_target, store_field, Serializer, Step, FIELDS_TO_WRITE,
};

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldConstraint {
    Required,
}

/// One alias or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aliases {
    One(String),
    Many(Vec<String>),
}

impl Aliases {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Aliases::One(a) => vec![a],
            Aliases::Many(v) => v,
        }
    }
}

/// Document form of an explicit-field configuration, e.g.
/// `{fieldName: name, keyName: shape-name, alias: my-name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExplicitFieldSpec {
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<Aliases>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases_inherited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases_strict: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<FieldConstraint>,
    /// A document literal, read through the engine with the field's
    /// declared type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DocumentNode>,
}

// ──────────────────────────────────────────────
// Pooled records
// ──────────────────────────────────────────────

/// Settings pooled from every explicit-field serializer of one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRecord {
    pub key_name: Option<String>,
    pub aliases: Vec<String>,
    pub aliases_inherited: Option<bool>,
    pub aliases_strict: Option<bool>,
    pub constraint: Option<FieldConstraint>,
    /// Default from the most specific serializer that declares one.
    pub default_value: Option<DocumentNode>,
    pub done: bool,
}

impl FieldRecord {
    pub fn is_strict(&self) -> bool {
        self.aliases_strict == Some(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExplicitFieldRecords {
    fields: IndexMap<String, FieldRecord>,
}

impl ExplicitFieldRecords {
    pub fn get(&self, field: &str) -> Option<&FieldRecord> {
        self.fields.get(field)
    }

    pub fn entry(&mut self, field: &str) -> &mut FieldRecord {
        self.fields.entry(field.to_string()).or_default()
    }

    pub fn is_done(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|r| r.done)
    }

    pub fn set_done(&mut self, field: &str) {
        self.entry(field).done = true;
    }

    /// Required fields never marked done, in declaration order.
    pub fn unmet_required(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, r)| r.constraint == Some(FieldConstraint::Required) && !r.done)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub const EXPLICIT_FIELDS: SlotKey<ExplicitFieldRecords> = SlotKey::new("explicit-fields");

// ──────────────────────────────────────────────
// Serializer
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitField {
    name: String,
    field_name: String,
    key_name: Option<String>,
    aliases: Vec<String>,
    aliases_inherited: Option<bool>,
    aliases_strict: Option<bool>,
    constraint: Option<FieldConstraint>,
    default_value: Option<DocumentNode>,
}

impl ExplicitField {
    pub fn new(field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        ExplicitField {
            name: format!("explicit-field:{}", field_name),
            field_name,
            key_name: None,
            aliases: Vec::new(),
            aliases_inherited: None,
            aliases_strict: None,
            constraint: None,
            default_value: None,
        }
    }

    pub fn key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases_inherited(mut self, inherited: bool) -> Self {
        self.aliases_inherited = Some(inherited);
        self
    }

    pub fn aliases_strict(mut self, strict: bool) -> Self {
        self.aliases_strict = Some(strict);
        self
    }

    pub fn required(mut self) -> Self {
        self.constraint = Some(FieldConstraint::Required);
        self
    }

    pub fn default_value(mut self, literal: impl Into<DocumentNode>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Pool this serializer's settings into the shared record.
    fn prepare(&self, blackboard: &mut Blackboard) {
        blackboard.update(EXPLICIT_FIELDS, ExplicitFieldRecords::default, |records| {
            let record = records.entry(&self.field_name);
            if record.key_name.is_none() {
                record.key_name = self.key_name.clone();
            }
            if record.aliases_inherited != Some(false) {
                for alias in &self.aliases {
                    if !record.aliases.contains(alias) {
                        record.aliases.push(alias.clone());
                    }
                }
            }
            if record.aliases_inherited.is_none() {
                record.aliases_inherited = self.aliases_inherited;
            }
            if record.aliases_strict.is_none() {
                record.aliases_strict = self.aliases_strict;
            }
            if record.constraint.is_none() {
                record.constraint = self.constraint;
            }
            if record.default_value.is_none() {
                record.default_value = self.default_value.clone();
            }
        });
    }

    /// First `manipulating` pass: queue the preparing phase and a second
    /// `manipulating` pass. Returns `None` once that has happened.
    fn schedule_preparation<C: ConversionContext>(&self, ctx: &mut C) -> Option<Step> {
        if ctx.phases().seen(&Phase::PREPARING_EXPLICIT_FIELDS) {
            return None;
        }
        let phases = ctx.phases_mut();
        phases.insert_all_after_current([Phase::PREPARING_EXPLICIT_FIELDS, Phase::MANIPULATING]);
        phases.advance();
        Some(Step::Progressed)
    }

    fn record<'b>(&self, blackboard: &'b Blackboard) -> Option<&'b FieldRecord> {
        blackboard.get(EXPLICIT_FIELDS)?.get(&self.field_name)
    }

    fn mark_done(&self, blackboard: &mut Blackboard) {
        blackboard.update(EXPLICIT_FIELDS, ExplicitFieldRecords::default, |records| {
            records.set_done(&self.field_name)
        });
    }

    /// `handling-fields`: fall back to the pooled default, unless the field
    /// is still waiting in the fields bucket.
    fn apply_default(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        let Some(record) = self.record(blackboard) else {
            return Ok(Step::NoOp);
        };
        if record.done {
            return Ok(Step::NoOp);
        }
        let Some(literal) = record.default_value.clone() else {
            return Ok(Step::NoOp);
        };
        let in_bucket = ctx
            .mapping()
            .and_then(|m| m.get(&converter.config().fields_key))
            .and_then(DocumentNode::as_mapping)
            .is_some_and(|fields| fields.contains_key(&self.field_name));
        if in_bucket {
            return Ok(Step::NoOp);
        }
        let key_name = record.key_name.clone().unwrap_or_else(|| self.field_name.clone());
        let declared = handle_in_progress(blackboard)
            .and_then(|h| h.field_type(&self.field_name))
            .map(str::to_string);
        let path = child_path(ctx.path(), &key_name);
        let value = converter.read_at(literal, declared.as_deref(), path)?;
        store_field(ctx, blackboard, &self.field_name, value)?;
        self.mark_done(blackboard);
        Ok(Step::Progressed)
    }

    /// Mapping keys that name this field under the pooled record.
    fn matching_keys(&self, record: &FieldRecord, ctx: &ReadContext) -> Vec<String> {
        let Some(mapping) = ctx.mapping() else {
            return Vec::new();
        };
        let key_name = record.key_name.as_deref().unwrap_or(&self.field_name);
        let strict = record.is_strict();
        let mut candidates: Vec<&str> = vec![key_name];
        candidates.extend(record.aliases.iter().map(String::as_str));
        if !strict {
            candidates.push(&self.field_name);
        }
        mapping
            .keys()
            .filter(|key| {
                candidates.iter().any(|c| {
                    if strict {
                        key.as_str() == *c
                    } else {
                        keys_match(key, c)
                    }
                })
            })
            .cloned()
            .collect()
    }
}

impl From<ExplicitFieldSpec> for ExplicitField {
    fn from(spec: ExplicitFieldSpec) -> Self {
        let mut field = ExplicitField::new(spec.field_name);
        field.key_name = spec.key_name;
        field.aliases = spec.alias.map(Aliases::into_vec).unwrap_or_default();
        field.aliases_inherited = spec.aliases_inherited;
        field.aliases_strict = spec.aliases_strict;
        field.constraint = spec.constraint;
        field.default_value = spec.default_value;
        field
    }
}

impl Serializer for ExplicitField {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if ctx.is_phase(&Phase::PREPARING_EXPLICIT_FIELDS) {
            self.prepare(blackboard);
            return Ok(Step::NoOp);
        }
        if !has_field_target(ctx, blackboard) {
            return Ok(Step::NoOp);
        }
        if ctx.is_phase(&Phase::HANDLING_FIELDS) {
            return self.apply_default(ctx, converter, blackboard);
        }
        if !ctx.is_phase(&Phase::MANIPULATING) {
            return Ok(Step::NoOp);
        }
        if let Some(step) = self.schedule_preparation(ctx) {
            return Ok(step);
        }

        let Some(record) = self.record(blackboard) else {
            return Ok(Step::NoOp);
        };
        if record.done {
            return Ok(Step::NoOp);
        }
        let declared = handle_in_progress(blackboard)
            .and_then(|h| h.field_type(&self.field_name))
            .map(str::to_string);

        let keys = self.matching_keys(record, ctx);
        match keys.len() {
            0 => return Ok(Step::NoOp),
            1 => {
                let key = &keys[0];
                let node = ctx.take_key(key).unwrap_or_default();
                let path = child_path(ctx.path(), key);
                let value = converter.read_at(node, declared.as_deref(), path)?;
                store_field(ctx, blackboard, &self.field_name, value)?;
            }
            _ => {
                let values = keys
                    .iter()
                    .map(|k| {
                        ctx.mapping()
                            .and_then(|m| m.get(k))
                            .map(DocumentNode::to_string)
                            .unwrap_or_default()
                    })
                    .collect();
                return Err(ConvertError::new(
                    ctx.path(),
                    ConvertErrorKind::AmbiguousKeys {
                        field: self.field_name.clone(),
                        keys,
                        values,
                    },
                ));
            }
        }
        self.mark_done(blackboard);
        Ok(Step::Progressed)
    }

    fn write(
        &self,
        ctx: &mut WriteContext<'_>,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if ctx.is_phase(&Phase::PREPARING_EXPLICIT_FIELDS) {
            self.prepare(blackboard);
            return Ok(Step::NoOp);
        }
        if !ctx.is_phase(&Phase::MANIPULATING) || !blackboard.contains(FIELDS_TO_WRITE) {
            return Ok(Step::NoOp);
        }
        if let Some(step) = self.schedule_preparation(ctx) {
            return Ok(step);
        }

        let Some(record) = self.record(blackboard).cloned() else {
            return Ok(Step::NoOp);
        };
        if record.done {
            return Ok(Step::NoOp);
        }
        self.mark_done(blackboard);

        let Some(fields) = blackboard.get_mut(FIELDS_TO_WRITE) else {
            return Ok(Step::NoOp);
        };
        let Some(value) = fields.remaining.shift_remove(&self.field_name) else {
            return Ok(Step::NoOp);
        };
        let declared = fields.handle.field_type(&self.field_name).map(str::to_string);
        let key_name = record.key_name.unwrap_or_else(|| self.field_name.clone());
        let path = child_path(ctx.path(), &key_name);

        if let Some(literal) = record.default_value {
            let default = converter.read_at(literal, declared.as_deref(), path.clone())?;
            if default == value {
                return Ok(Step::Progressed);
            }
        }

        let node = converter.write_at(&value, declared.as_deref(), path)?;
        match ctx.output_mapping_mut() {
            Some(output) => {
                output.insert(key_name, node);
                Ok(Step::Progressed)
            }
            None => Err(ConvertError::invalid(
                ctx.path(),
                format!("cannot write field '{}' outside a mapping", self.field_name),
            )),
        }
    }

    fn document(&self, _type_name: &str, _converter: &Converter<'_>) -> Option<String> {
        let mut out = format!("`{}`", self.key_name.as_deref().unwrap_or(&self.field_name));
        if self.key_name.is_some() {
            let _ = write!(out, " (field `{}`)", self.field_name);
        }
        if !self.aliases.is_empty() {
            let aliases: Vec<String> = self.aliases.iter().map(|a| format!("`{}`", a)).collect();
            let _ = write!(out, "; aliases {}", aliases.join(", "));
        }
        if self.aliases_strict == Some(true) {
            out.push_str("; exact keys only");
        }
        if self.constraint == Some(FieldConstraint::Required) {
            out.push_str("; required");
        }
        if let Some(default) = &self.default_value {
            let _ = write!(out, "; default {}", default);
        }
        Some(out)
    }

    fn check_completion(&self, core: &ContextCore, blackboard: &Blackboard) -> Result<(), ConvertError> {
        let Some(records) = blackboard.get(EXPLICIT_FIELDS) else {
            return Ok(());
        };
        let unmet = records.unmet_required();
        if unmet.is_empty() {
            return Ok(());
        }
        Err(ConvertError::new(
            core.path.clone(),
            ConvertErrorKind::MissingRequired { fields: unmet },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_accepts_one_or_many_aliases() {
        let one: ExplicitFieldSpec =
            serde_json::from_value(serde_json::json!({"fieldName": "name", "alias": "my-name"})).unwrap();
        assert_eq!(one.alias, Some(Aliases::One("my-name".into())));
        let many: ExplicitFieldSpec = serde_yaml::from_str(
            "{ fieldName: name, alias: [a, b], constraint: required, defaultValue: { type: string, value: bob } }",
        )
        .unwrap();
        let field = ExplicitField::from(many);
        assert_eq!(field.aliases, vec!["a", "b"]);
        assert_eq!(field.constraint, Some(FieldConstraint::Required));
        assert!(field.default_value.is_some());
    }

    #[test]
    fn unknown_spec_keys_rejected() {
        let err = serde_json::from_value::<ExplicitFieldSpec>(serde_json::json!({"fieldName": "n", "aliass": "x"}));
        assert!(err.is_err());
    }

    #[test]
    fn prepare_sets_only_unset_values() {
        let mut bb = Blackboard::new();
        ExplicitField::new("name")
            .key_name("shape-w-size-name")
            .alias("new-name")
            .aliases_inherited(false)
            .prepare(&mut bb);
        ExplicitField::new("name")
            .key_name("shape-name")
            .alias("my-name")
            .required()
            .prepare(&mut bb);
        let record = bb.get(EXPLICIT_FIELDS).unwrap().get("name").unwrap();
        assert_eq!(record.key_name.as_deref(), Some("shape-w-size-name"));
        assert_eq!(record.aliases, vec!["new-name"]);
        assert_eq!(record.constraint, Some(FieldConstraint::Required));
    }

    #[test]
    fn unmet_required_lists_all() {
        let mut records = ExplicitFieldRecords::default();
        records.entry("name").constraint = Some(FieldConstraint::Required);
        records.entry("color").constraint = Some(FieldConstraint::Required);
        records.entry("size");
        records.set_done("color");
        assert_eq!(records.unmet_required(), vec!["name"]);
    }

    #[test]
    fn documents_its_configuration() {
        let doc = ExplicitField::new("name")
            .key_name("shape-name")
            .alias("my-name")
            .required()
            .document("shape", &dummy_converter());
        assert_eq!(
            doc.as_deref(),
            Some("`shape-name` (field `name`); aliases `my-name`; required")
        );
    }

    fn dummy_converter() -> Converter<'static> {
        use crate::config::YomlConfig;
        use crate::registry::InMemoryTypeRegistry;
        use std::sync::{Arc, OnceLock};
        static REGISTRY: OnceLock<InMemoryTypeRegistry> = OnceLock::new();
        static CONFIG: OnceLock<YomlConfig> = OnceLock::new();
        static BUILTINS: OnceLock<Vec<Arc<dyn Serializer>>> = OnceLock::new();
        let config = CONFIG.get_or_init(YomlConfig::default);
        Converter::new(
            REGISTRY.get_or_init(InMemoryTypeRegistry::new),
            config,
            BUILTINS.get_or_init(|| crate::serializers::builtins(config)),
        )
    }
}
