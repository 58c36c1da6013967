//! Per-conversion scratch store.
//!
//! Serializers coordinate through typed slots rather than by knowing each
//! other's types. A slot is addressed by a [`SlotKey`]: a name chosen by the
//! serializer author plus the slot's Rust type, so two slots only collide if
//! both the name and the type agree.
//!
//! Slot names in use by the builtin serializers:
//!
//! | name                          | owner                         |
//! |-------------------------------|-------------------------------|
//! | `type-under-construction`     | registry instantiators (read) |
//! | `fields-to-write`             | registry instantiators (write)|
//! | `explicit-fields`             | explicit-field serializers    |
//! | `all-fields-explicit`         | all-fields-explicit           |
//! | `fields-bucket`               | fields bucket                 |
//!
//! The blackboard also holds the applicable serializer set.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::serializers::Serializer;

// ──────────────────────────────────────────────
// Slots
// ──────────────────────────────────────────────

/// Typed key for a blackboard slot.
pub struct SlotKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotKey<T> {
    pub const fn new(name: &'static str) -> Self {
        SlotKey {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for SlotKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlotKey<T> {}

impl<T> fmt::Debug for SlotKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotKey({})", self.name)
    }
}

// ──────────────────────────────────────────────
// Serializer set
// ──────────────────────────────────────────────

/// Stable identity of a serializer within one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializerId(usize);

/// Where a serializer came from. Iteration visits groups in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializerGroup {
    /// Serializers of the type being instantiated, added during conversion.
    InstantiatedType,
    /// Serializers of the expected type, present from the start.
    ExpectedType,
    /// Engine builtins.
    Builtin,
}

#[derive(Debug, Default)]
pub struct SerializerSet {
    instantiated: Vec<(SerializerId, Arc<dyn Serializer>)>,
    expected: Vec<(SerializerId, Arc<dyn Serializer>)>,
    builtin: Vec<(SerializerId, Arc<dyn Serializer>)>,
    next_id: usize,
}

impl SerializerSet {
    /// Add a serializer unless the same instance is already present.
    pub fn add(&mut self, group: SerializerGroup, serializer: Arc<dyn Serializer>) -> bool {
        if self.iter().any(|(_, s)| Arc::ptr_eq(s, &serializer)) {
            return false;
        }
        let id = SerializerId(self.next_id);
        self.next_id += 1;
        let target = match group {
            SerializerGroup::InstantiatedType => &mut self.instantiated,
            SerializerGroup::ExpectedType => &mut self.expected,
            SerializerGroup::Builtin => &mut self.builtin,
        };
        target.push((id, serializer));
        true
    }

    pub fn add_all(
        &mut self,
        group: SerializerGroup,
        serializers: impl IntoIterator<Item = Arc<dyn Serializer>>,
    ) -> usize {
        serializers
            .into_iter()
            .filter(|s| self.add(group, Arc::clone(s)))
            .count()
    }

    pub fn len(&self) -> usize {
        self.instantiated.len() + self.expected.len() + self.builtin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The serializer at `index` in iteration order.
    pub fn get(&self, index: usize) -> Option<(SerializerId, Arc<dyn Serializer>)> {
        self.iter()
            .nth(index)
            .map(|(id, s)| (id, Arc::clone(s)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SerializerId, &Arc<dyn Serializer>)> {
        self.instantiated
            .iter()
            .chain(&self.expected)
            .chain(&self.builtin)
            .map(|(id, s)| (*id, s))
    }
}

// ──────────────────────────────────────────────
// Blackboard
// ──────────────────────────────────────────────

#[derive(Default)]
pub struct Blackboard {
    slots: HashMap<(&'static str, TypeId), Box<dyn Any>>,
    serializers: SerializerSet,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: 'static>(&self, key: SlotKey<T>) -> Option<&T> {
        self.slots
            .get(&(key.name, TypeId::of::<T>()))
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self, key: SlotKey<T>) -> Option<&mut T> {
        self.slots
            .get_mut(&(key.name, TypeId::of::<T>()))
            .and_then(|b| b.downcast_mut::<T>())
    }

    /// Apply `f` to a slot, creating it with `init` first if absent.
    pub fn update<T: 'static, R>(
        &mut self,
        key: SlotKey<T>,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut slot = self.remove(key).unwrap_or_else(init);
        let out = f(&mut slot);
        self.insert(key, slot);
        out
    }

    pub fn insert<T: 'static>(&mut self, key: SlotKey<T>, value: T) -> Option<T> {
        self.slots
            .insert((key.name, TypeId::of::<T>()), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn remove<T: 'static>(&mut self, key: SlotKey<T>) -> Option<T> {
        self.slots
            .remove(&(key.name, TypeId::of::<T>()))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn contains<T: 'static>(&self, key: SlotKey<T>) -> bool {
        self.slots.contains_key(&(key.name, TypeId::of::<T>()))
    }

    pub fn serializers(&self) -> &SerializerSet {
        &self.serializers
    }

    pub fn serializers_mut(&mut self) -> &mut SerializerSet {
        &mut self.serializers
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots: Vec<&str> = self.slots.keys().map(|(name, _)| *name).collect();
        slots.sort_unstable();
        f.debug_struct("Blackboard")
            .field("slots", &slots)
            .field("serializers", &self.serializers.len())
            .finish()
    }
}
