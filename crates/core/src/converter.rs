//! The conversion loop.
//!
//! For one node in one direction the converter runs the applicable
//! serializers phase by phase:
//!
//! 1. Serializers are scanned in order: instantiated-type serializers,
//!    expected-type serializers, then builtins.
//! 2. `Progressed` restarts the scan from the top in the current phase.
//! 3. A scan where every serializer answers `NoOp` advances the phase.
//! 4. `Done` ends the conversion. The rest of that scan still runs so a
//!    second `Done` can be reported as ambiguous.
//! 5. Every serializer's completion check runs, then (read only) leftover
//!    mapping keys are rejected.
//!
//! Nested values are converted by a fresh call with its own context and
//! blackboard. There is no iteration cap; see [`crate::serializers`].

use std::sync::Arc;

use crate::blackboard::{Blackboard, SerializerGroup};
use crate::config::YomlConfig;
use crate::construction::ConstructionInstruction;
use crate::context::{ConversionContext, ReadContext, WriteContext};
use crate::document::{DocumentNode, Mapping};
use crate::error::{ConvertError, ConvertErrorKind};
use crate::generics::parse_generic_type;
use crate::registry::TypeRegistry;
use crate::serializers::{is_builtin_type, Serializer, Step};
use crate::value::Value;

/// Handle passed to serializers for nested conversions.
#[derive(Clone, Copy)]
pub struct Converter<'a> {
    registry: &'a dyn TypeRegistry,
    config: &'a YomlConfig,
    builtins: &'a [Arc<dyn Serializer>],
}

impl<'a> Converter<'a> {
    pub fn new(
        registry: &'a dyn TypeRegistry,
        config: &'a YomlConfig,
        builtins: &'a [Arc<dyn Serializer>],
    ) -> Self {
        Converter {
            registry,
            config,
            builtins,
        }
    }

    pub fn registry(&self) -> &'a dyn TypeRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a YomlConfig {
        self.config
    }

    pub fn builtins(&self) -> &'a [Arc<dyn Serializer>] {
        self.builtins
    }

    // ── Read ─────────────────────────────────────

    pub fn read(&self, node: DocumentNode, expected: Option<&str>) -> Result<Value, ConvertError> {
        self.read_at(node, expected, String::new())
    }

    /// Read a node at a structural path.
    pub fn read_at(
        &self,
        node: DocumentNode,
        expected: Option<&str>,
        path: impl Into<String>,
    ) -> Result<Value, ConvertError> {
        let path = path.into();
        if node.is_null() {
            return Ok(Value::Null);
        }
        if let Some(t) = expected {
            check_type_name(t, &path)?;
        }
        if let Some(t) = node.get(&self.config.type_key).and_then(DocumentNode::as_str) {
            check_type_name(t, &path)?;
        }
        tracing::debug!(path = %path, expected = ?expected, "read");
        let ctx = ReadContext::new(node, expected, path);
        let blackboard = self.seed(expected);
        self.run_read(ctx, blackboard)
    }

    /// Read a registry type defined by a document: `document` is read as
    /// `parent`, with the serializers of `defined` applying.
    pub fn read_definition(
        &self,
        document: Mapping,
        parent: &str,
        defined: &str,
        path: &str,
        outer: Option<ConstructionInstruction>,
    ) -> Result<Value, ConvertError> {
        check_type_name(parent, path)?;
        tracing::debug!(path = %path, parent, defined, "read definition");
        let mut ctx = ReadContext::new(DocumentNode::Mapping(document), Some(parent), path);
        ctx.outer_instruction = outer;
        let blackboard = self.seed(Some(defined));
        self.run_read(ctx, blackboard)
    }

    fn run_read(
        &self,
        mut ctx: ReadContext,
        mut blackboard: Blackboard,
    ) -> Result<Value, ConvertError> {
        self.drive(&mut ctx, &mut blackboard, |s, ctx, conv, bb| s.read(ctx, conv, bb))?;

        let Some(value) = ctx.value.take() else {
            return Err(self.unconverted(&ctx));
        };

        if let Some(rest) = ctx.mapping().filter(|m| !m.is_empty()) {
            let keys: Vec<String> = rest.keys().cloned().collect();
            let remaining = DocumentNode::Mapping(rest.clone()).to_string();
            if self.config.reject_unconsumed_keys {
                return Err(ConvertError::new(
                    ctx.core.path.clone(),
                    ConvertErrorKind::UnconsumedKeys { keys, remaining },
                ));
            }
            tracing::warn!(path = %ctx.core.path, ?keys, "dropping unconsumed keys");
        }
        Ok(value)
    }

    fn unconverted(&self, ctx: &ReadContext) -> ConvertError {
        let named = ctx
            .string_entry(&self.config.type_key)
            .or_else(|| ctx.expected_type());
        let kind = match named {
            Some(t) if !is_builtin_type(t) && self.registry.resolve_type(t).is_none() => {
                ConvertErrorKind::UnresolvedType {
                    type_name: t.to_string(),
                }
            }
            _ => {
                let found = ctx.node().map(DocumentNode::kind_name).unwrap_or("document");
                let what = match ctx.expected_type() {
                    Some(t) => format!("{} as '{}'", found, t),
                    None => found.to_string(),
                };
                ConvertErrorKind::Incomplete { what }
            }
        };
        ConvertError::new(ctx.core.path.clone(), kind)
    }

    // ── Write ────────────────────────────────────

    pub fn write(&self, value: &Value, expected: Option<&str>) -> Result<DocumentNode, ConvertError> {
        self.write_at(value, expected, String::new())
    }

    /// Write a value at a structural path.
    pub fn write_at(
        &self,
        value: &Value,
        expected: Option<&str>,
        path: impl Into<String>,
    ) -> Result<DocumentNode, ConvertError> {
        let path = path.into();
        if value.is_null() {
            return Ok(DocumentNode::Null);
        }
        if let Some(t) = expected {
            check_type_name(t, &path)?;
        }
        tracing::debug!(path = %path, expected = ?expected, "write");
        let mut ctx = WriteContext::new(value, expected, path);
        let mut blackboard = self.seed(expected);
        self.drive(&mut ctx, &mut blackboard, |s, ctx, conv, bb| s.write(ctx, conv, bb))?;

        match ctx.output.take() {
            Some(output) => Ok(output),
            None => {
                let type_name = self.registry.type_name_of(value);
                let kind = if value.as_object().is_some()
                    && self.registry.resolve_type(&type_name).is_none()
                {
                    ConvertErrorKind::UnresolvedType { type_name }
                } else {
                    ConvertErrorKind::Incomplete {
                        what: format!("value of type '{}'", type_name),
                    }
                };
                Err(ConvertError::new(ctx.core.path.clone(), kind))
            }
        }
    }

    // ── Loop ─────────────────────────────────────

    fn seed(&self, type_name: Option<&str>) -> Blackboard {
        let mut blackboard = Blackboard::new();
        let set = blackboard.serializers_mut();
        if let Some(t) = type_name.filter(|t| !is_builtin_type(t)) {
            set.add_all(SerializerGroup::ExpectedType, self.registry.serializers_for(t));
        }
        set.add_all(SerializerGroup::Builtin, self.builtins.iter().cloned());
        blackboard
    }

    fn drive<C, F>(&self, ctx: &mut C, blackboard: &mut Blackboard, invoke: F) -> Result<(), ConvertError>
    where
        C: ConversionContext,
        F: Fn(&dyn Serializer, &mut C, &Converter<'_>, &mut Blackboard) -> Result<Step, ConvertError>,
    {
        while !ctx.phases().is_exhausted() {
            let mut index = 0;
            let mut completed_by: Option<String> = None;

            while let Some((id, serializer)) = blackboard.serializers().get(index) {
                index += 1;
                ctx.core_mut().current_serializer = Some(id);
                let step = invoke(serializer.as_ref(), ctx, self, blackboard)?;
                tracing::trace!(
                    path = %ctx.path(),
                    phase = %current_phase(ctx),
                    serializer = serializer.name(),
                    ?step,
                    "serializer step"
                );

                if let Some(first) = &completed_by {
                    if step == Step::Done {
                        return Err(ConvertError::new(
                            ctx.path(),
                            ConvertErrorKind::AmbiguousCompletion {
                                first: first.clone(),
                                second: serializer.name().to_string(),
                            },
                        ));
                    }
                    continue;
                }
                match step {
                    Step::Done => completed_by = Some(serializer.name().to_string()),
                    Step::Progressed => index = 0,
                    Step::NoOp => {}
                }
            }

            if let Some(by) = completed_by {
                tracing::debug!(path = %ctx.path(), serializer = %by, "conversion complete");
                break;
            }
            ctx.phases_mut().advance();
            tracing::debug!(path = %ctx.path(), phase = %current_phase(ctx), "phase advanced");
        }

        ctx.core_mut().current_serializer = None;
        for index in 0..blackboard.serializers().len() {
            if let Some((id, serializer)) = blackboard.serializers().get(index) {
                ctx.core_mut().current_serializer = Some(id);
                serializer.check_completion(ctx.core(), blackboard)?;
            }
        }
        ctx.core_mut().current_serializer = None;
        Ok(())
    }
}

fn current_phase<C: ConversionContext>(ctx: &C) -> &str {
    ctx.phases().current().map(|p| p.as_str()).unwrap_or("finished")
}

fn check_type_name(name: &str, path: &str) -> Result<(), ConvertError> {
    parse_generic_type(name).map(|_| ()).map_err(|e| {
        ConvertError::new(
            path,
            ConvertErrorKind::MalformedType {
                type_name: name.to_string(),
                reason: e.to_string(),
            },
        )
    })
}
