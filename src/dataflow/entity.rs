//! Analysis entities: abstract identities for storage locations.
//!
//! An [`AnalysisEntity`] names a trackable storage location (a local, a
//! parameter, a field, an array element slot) independently of its syntactic
//! occurrences. Entities are the keys of the sparse entity-value maps the
//! engine threads through the graph.
//!
//! Entities are created once per unique storage location per analysis run by
//! the [`EntityInterner`] owned by the analysis context: two lookups that
//! denote the same location under the aliasing model yield the same
//! [`EntityId`].

use std::{collections::HashMap, fmt};

/// A strongly-typed identifier for an interned [`AnalysisEntity`].
///
/// Entity IDs are dense indices assigned by the [`EntityInterner`]; they are
/// only meaningful within the run that interned them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    /// Creates a new `EntityId` from a raw value.
    ///
    /// Primarily intended for internal use and testing; normal usage obtains
    /// ids from [`EntityInterner::intern`].
    #[must_use]
    #[inline]
    pub const fn new(value: u32) -> Self {
        EntityId(value)
    }

    /// Returns this id as a dense index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// The kind of storage location an entity stands for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
pub enum EntityKind {
    /// A local variable of the analyzed body.
    Local,
    /// A parameter of the analyzed body.
    Parameter,
    /// A field reached through a parent entity.
    Field,
    /// The collapsed element slot of an array reached through a parent entity.
    ArrayElement,
}

impl EntityKind {
    /// Returns `true` for locations reached through a parent reference.
    ///
    /// Heap-reached locations are the ones an opaque call can mutate behind
    /// the analysis's back, and the ones subject to weak updates when the
    /// parent reference may point to several locations.
    #[must_use]
    pub const fn is_heap_reached(&self) -> bool {
        matches!(self, Self::Field | Self::ArrayElement)
    }
}

/// An abstract identity for a storage location, independent of syntax.
///
/// Two entities are equal exactly when they denote the same storage location
/// under the analysis's aliasing model: same kind, same name, same parent
/// chain. Entities are immutable once interned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisEntity {
    /// The interned id of this entity.
    id: EntityId,
    /// The kind of storage location.
    kind: EntityKind,
    /// The location's name within its parent scope.
    name: String,
    /// The parent entity for fields and array element slots.
    parent: Option<EntityId>,
}

impl AnalysisEntity {
    /// Returns the interned id of this entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the kind of storage location.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the location's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent entity id for fields and array element slots.
    #[must_use]
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }
}

impl fmt::Display for AnalysisEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "{}:{}.{}", self.id, parent, self.name),
            None => write!(f, "{}:{}", self.id, self.name),
        }
    }
}

/// Key uniquely describing a storage location prior to interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    kind: EntityKind,
    name: String,
    parent: Option<EntityId>,
}

/// Interner assigning stable, deduplicated ids to analysis entities.
///
/// Owned by the analysis context; one interner per run. Sharing one interner
/// across a pipeline of analyses over the same graph (copy analysis feeding
/// value content, for instance) guarantees that both runs agree on entity
/// ids, which is what makes one analysis's result consultable by the next.
///
/// # Examples
///
/// ```rust
/// use flowscope::dataflow::{EntityInterner, EntityKind};
///
/// let mut interner = EntityInterner::new();
/// let x = interner.intern(EntityKind::Local, "x", None);
/// let same = interner.intern(EntityKind::Local, "x", None);
/// let other = interner.intern(EntityKind::Parameter, "x", None);
///
/// assert_eq!(x, same);
/// assert_ne!(x, other);
/// ```
#[derive(Debug, Default)]
pub struct EntityInterner {
    /// Interned entities, indexed by [`EntityId`].
    entities: Vec<AnalysisEntity>,
    /// Deduplication index.
    index: HashMap<EntityKey, EntityId>,
}

impl EntityInterner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a storage location, returning its stable id.
    ///
    /// Repeated calls with the same (kind, name, parent) triple return the
    /// same id without creating a duplicate entity.
    pub fn intern(&mut self, kind: EntityKind, name: &str, parent: Option<EntityId>) -> EntityId {
        let key = EntityKey {
            kind,
            name: name.to_string(),
            parent,
        };
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let id = EntityId::new(self.entities.len() as u32);
        self.entities.push(AnalysisEntity {
            id,
            kind,
            name: key.name.clone(),
            parent,
        });
        self.index.insert(key, id);
        id
    }

    /// Looks up a previously interned location without creating it.
    #[must_use]
    pub fn lookup(&self, kind: EntityKind, name: &str, parent: Option<EntityId>) -> Option<EntityId> {
        let key = EntityKey {
            kind,
            name: name.to_string(),
            parent,
        };
        self.index.get(&key).copied()
    }

    /// Returns the entity with the given id, or `None` if never interned.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&AnalysisEntity> {
        self.entities.get(id.index())
    }

    /// Iterates all interned entities in interning order.
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisEntity> {
        self.entities.iter()
    }

    /// Returns the ids of all entities of heap-reached kinds.
    ///
    /// These are the locations an opaque call may mutate; pessimistic call
    /// handling resets them to the domain default.
    pub fn heap_reached(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .filter(|entity| entity.kind().is_heap_reached())
            .map(AnalysisEntity::id)
    }

    /// Returns the number of interned entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
