//! Per-direction conversion state: phases, paths and the node or value
//! being converted.

use std::borrow::Cow;
use std::fmt;

use crate::blackboard::SerializerId;
use crate::construction::ConstructionInstruction;
use crate::document::{DocumentNode, Mapping};
use crate::value::Value;

// ──────────────────────────────────────────────
// Phases
// ──────────────────────────────────────────────

/// A named stage of the conversion protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phase(Cow<'static, str>);

impl Phase {
    pub const HANDLING_TYPE: Phase = Phase(Cow::Borrowed("handling-type"));
    pub const MANIPULATING: Phase = Phase(Cow::Borrowed("manipulating"));
    pub const HANDLING_FIELDS: Phase = Phase(Cow::Borrowed("handling-fields"));
    pub const PREPARING_EXPLICIT_FIELDS: Phase = Phase(Cow::Borrowed("preparing-explicit-fields"));
    pub const HANDLING_TYPE_DEFERRED: Phase =
        Phase(Cow::Borrowed("handling-type-deferred-after-config"));

    /// A phase private to some serializer protocol.
    pub fn custom(name: impl Into<String>) -> Self {
        Phase(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered phases with a cursor. Phases can be inserted after the cursor
/// while a conversion runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseQueue {
    phases: Vec<Phase>,
    cursor: usize,
}

impl PhaseQueue {
    pub fn new(phases: Vec<Phase>) -> Self {
        PhaseQueue { phases, cursor: 0 }
    }

    /// `handling-type`, `manipulating`, `handling-fields`.
    pub fn standard() -> Self {
        PhaseQueue::new(vec![
            Phase::HANDLING_TYPE,
            Phase::MANIPULATING,
            Phase::HANDLING_FIELDS,
        ])
    }

    pub fn current(&self) -> Option<&Phase> {
        self.phases.get(self.cursor)
    }

    pub fn is_phase(&self, phase: &Phase) -> bool {
        self.current() == Some(phase)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.phases.len()
    }

    /// Insert `phase` immediately after the current one.
    pub fn insert_after_current(&mut self, phase: Phase) {
        let at = (self.cursor + 1).min(self.phases.len());
        self.phases.insert(at, phase);
    }

    /// Insert several phases after the current one, keeping their order.
    pub fn insert_all_after_current(&mut self, phases: impl IntoIterator<Item = Phase>) {
        let mut at = (self.cursor + 1).min(self.phases.len());
        for phase in phases {
            self.phases.insert(at, phase);
            at += 1;
        }
    }

    /// Move to the next phase and return it.
    pub fn advance(&mut self) -> Option<&Phase> {
        if self.cursor < self.phases.len() {
            self.cursor += 1;
        }
        self.current()
    }

    /// True if `phase` is current or was already passed.
    pub fn seen(&self, phase: &Phase) -> bool {
        self.phases
            .iter()
            .take(self.cursor + 1)
            .any(|p| p == phase)
    }

    /// True if `phase` is queued after the current one.
    pub fn will_do(&self, phase: &Phase) -> bool {
        self.phases.iter().skip(self.cursor + 1).any(|p| p == phase)
    }

    pub fn remaining(&self) -> &[Phase] {
        let from = (self.cursor + 1).min(self.phases.len());
        &self.phases[from..]
    }
}

// ──────────────────────────────────────────────
// Paths
// ──────────────────────────────────────────────

/// `parent.key`, or just `key` at the root.
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// `parent[index]`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

// ──────────────────────────────────────────────
// Contexts
// ──────────────────────────────────────────────

/// State shared by both directions.
#[derive(Debug, Clone)]
pub struct ContextCore {
    pub path: String,
    pub expected_type: Option<String>,
    pub phases: PhaseQueue,
    /// The serializer currently being invoked.
    pub current_serializer: Option<SerializerId>,
}

impl ContextCore {
    pub fn new(path: impl Into<String>, expected_type: Option<&str>) -> Self {
        ContextCore {
            path: path.into(),
            expected_type: expected_type.map(str::to_string),
            phases: PhaseQueue::standard(),
            current_serializer: None,
        }
    }
}

pub trait ConversionContext {
    fn core(&self) -> &ContextCore;
    fn core_mut(&mut self) -> &mut ContextCore;

    fn path(&self) -> &str {
        &self.core().path
    }

    fn expected_type(&self) -> Option<&str> {
        self.core().expected_type.as_deref()
    }

    fn phases(&self) -> &PhaseQueue {
        &self.core().phases
    }

    fn phases_mut(&mut self) -> &mut PhaseQueue {
        &mut self.core_mut().phases
    }

    fn is_phase(&self, phase: &Phase) -> bool {
        self.core().phases.is_phase(phase)
    }

    fn current_serializer(&self) -> Option<SerializerId> {
        self.core().current_serializer
    }
}

/// Read direction: a document node in, a value out.
///
/// `node` holds what is left of the document; serializers remove the
/// mapping entries they consume.
#[derive(Debug)]
pub struct ReadContext {
    pub core: ContextCore,
    pub node: Option<DocumentNode>,
    pub value: Option<Value>,
    /// Construction wrapping a nested read of a type definition.
    pub outer_instruction: Option<ConstructionInstruction>,
}

impl ReadContext {
    pub fn new(node: DocumentNode, expected_type: Option<&str>, path: impl Into<String>) -> Self {
        ReadContext {
            core: ContextCore::new(path, expected_type),
            node: Some(node),
            value: None,
            outer_instruction: None,
        }
    }

    pub fn node(&self) -> Option<&DocumentNode> {
        self.node.as_ref()
    }

    pub fn mapping(&self) -> Option<&Mapping> {
        self.node.as_ref().and_then(DocumentNode::as_mapping)
    }

    pub fn mapping_mut(&mut self) -> Option<&mut Mapping> {
        self.node.as_mut().and_then(DocumentNode::as_mapping_mut)
    }

    /// Consume one mapping entry.
    pub fn take_key(&mut self, key: &str) -> Option<DocumentNode> {
        self.mapping_mut().and_then(|m| m.shift_remove(key))
    }

    pub fn take_node(&mut self) -> Option<DocumentNode> {
        self.node.take()
    }

    /// The string under `key`, if the node is a mapping holding one.
    pub fn string_entry(&self, key: &str) -> Option<&str> {
        self.mapping()
            .and_then(|m| m.get(key))
            .and_then(DocumentNode::as_str)
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl ConversionContext for ReadContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ContextCore {
        &mut self.core
    }
}

/// Write direction: a value in, a document node out.
#[derive(Debug)]
pub struct WriteContext<'v> {
    pub core: ContextCore,
    pub value: &'v Value,
    pub output: Option<DocumentNode>,
}

impl<'v> WriteContext<'v> {
    pub fn new(value: &'v Value, expected_type: Option<&str>, path: impl Into<String>) -> Self {
        WriteContext {
            core: ContextCore::new(path, expected_type),
            value,
            output: None,
        }
    }

    pub fn output_mapping_mut(&mut self) -> Option<&mut Mapping> {
        self.output.as_mut().and_then(DocumentNode::as_mapping_mut)
    }
}

impl ConversionContext for WriteContext<'_> {
    fn core(&self) -> &ContextCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ContextCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_phase_is_visited_next() {
        let mut q = PhaseQueue::standard();
        assert!(q.is_phase(&Phase::HANDLING_TYPE));
        q.insert_after_current(Phase::custom("extra"));
        assert_eq!(q.advance(), Some(&Phase::custom("extra")));
        assert_eq!(q.advance(), Some(&Phase::MANIPULATING));
    }

    #[test]
    fn insert_all_keeps_order() {
        let mut q = PhaseQueue::standard();
        q.advance();
        q.insert_all_after_current([Phase::PREPARING_EXPLICIT_FIELDS, Phase::MANIPULATING]);
        assert_eq!(
            q.remaining(),
            &[
                Phase::PREPARING_EXPLICIT_FIELDS,
                Phase::MANIPULATING,
                Phase::HANDLING_FIELDS
            ]
        );
    }

    #[test]
    fn seen_and_will_do() {
        let mut q = PhaseQueue::standard();
        assert!(q.seen(&Phase::HANDLING_TYPE));
        assert!(!q.seen(&Phase::MANIPULATING));
        assert!(q.will_do(&Phase::HANDLING_FIELDS));
        q.advance();
        q.advance();
        assert!(q.seen(&Phase::MANIPULATING));
        assert!(!q.will_do(&Phase::HANDLING_FIELDS));
        assert!(q.advance().is_none());
        assert!(q.is_exhausted());
        assert!(q.advance().is_none());
    }

    #[test]
    fn paths_nest() {
        assert_eq!(child_path("", "shape"), "shape");
        assert_eq!(child_path("shape", "fields"), "shape.fields");
        assert_eq!(index_path("items", 2), "items[2]");
    }

    #[test]
    fn take_key_consumes_entry() {
        let node: DocumentNode = serde_json::json!({"type": "shape", "name": "x"}).into();
        let mut ctx = ReadContext::new(node, None, "");
        assert_eq!(ctx.string_entry("type"), Some("shape"));
        assert_eq!(ctx.take_key("type"), Some(DocumentNode::from("shape")));
        assert_eq!(ctx.mapping().map(|m| m.len()), Some(1));
    }
}
