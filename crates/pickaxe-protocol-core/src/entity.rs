use crate::error::{ProtocolError, ProtocolResult};
use std::collections::HashMap;
use std::fmt;

/// One row of a version's entity type table. Abstract types have no id.
/// Parents must be listed before their children.
#[derive(Debug, Clone, Copy)]
pub struct EntityTypeDef {
    pub name: &'static str,
    pub id: Option<i32>,
    pub parent: Option<&'static str>,
}

pub const fn entity(name: &'static str, id: i32, parent: Option<&'static str>) -> EntityTypeDef {
    EntityTypeDef {
        name,
        id: Some(id),
        parent,
    }
}

pub const fn abstract_entity(name: &'static str, parent: Option<&'static str>) -> EntityTypeDef {
    EntityTypeDef {
        name,
        id: None,
        parent,
    }
}

#[derive(Debug)]
struct Node {
    name: &'static str,
    id: Option<i32>,
    parent: Option<usize>,
}

/// The entity types of one protocol version, forming a forest through
/// explicit parent links.
#[derive(Debug)]
pub struct EntityTypeTable {
    version: &'static str,
    nodes: Vec<Node>,
    by_id: HashMap<i32, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl EntityTypeTable {
    pub fn new(version: &'static str, defs: &[EntityTypeDef]) -> ProtocolResult<Self> {
        let mut nodes: Vec<Node> = Vec::with_capacity(defs.len());
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for def in defs {
            let parent = match def.parent {
                Some(parent) => Some(*by_name.get(parent).ok_or_else(|| {
                    ProtocolError::configuration(
                        version,
                        format!("entity type {} names unknown parent {}", def.name, parent),
                    )
                })?),
                None => None,
            };
            let index = nodes.len();
            if by_name.insert(def.name, index).is_some() {
                return Err(ProtocolError::configuration(version, format!("entity type {} listed twice", def.name)));
            }
            if let Some(id) = def.id {
                if let Some(other) = by_id.insert(id, index) {
                    return Err(ProtocolError::configuration(
                        version,
                        format!("entity types {} and {} share id {}", nodes[other].name, def.name, id),
                    ));
                }
            }
            nodes.push(Node {
                name: def.name,
                id: def.id,
                parent,
            });
        }
        Ok(Self {
            version,
            nodes,
            by_id,
            by_name,
        })
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Unknown ids (modded entities, for instance) are not an error.
    pub fn by_id(&self, id: i32) -> Option<EntityTypeRef<'_>> {
        self.by_id.get(&id).map(|&index| EntityTypeRef { table: self, index })
    }

    pub fn by_name(&self, name: &str) -> Option<EntityTypeRef<'_>> {
        self.by_name.get(name).map(|&index| EntityTypeRef { table: self, index })
    }

    /// Every concrete (id-carrying) type.
    pub fn concrete(&self) -> impl Iterator<Item = EntityTypeRef<'_>> {
        (0..self.nodes.len())
            .filter(|&index| self.nodes[index].id.is_some())
            .map(move |index| EntityTypeRef { table: self, index })
    }
}

/// A node in an [`EntityTypeTable`].
#[derive(Clone, Copy)]
pub struct EntityTypeRef<'a> {
    table: &'a EntityTypeTable,
    index: usize,
}

impl<'a> EntityTypeRef<'a> {
    pub fn name(&self) -> &'static str {
        self.table.nodes[self.index].name
    }

    pub fn id(&self) -> Option<i32> {
        self.table.nodes[self.index].id
    }

    pub fn parent(&self) -> Option<EntityTypeRef<'a>> {
        self.table.nodes[self.index]
            .parent
            .map(|index| EntityTypeRef { table: self.table, index })
    }

    /// True if `ancestor` is this type or is reachable through parent links.
    pub fn is_or_has_parent(&self, ancestor: EntityTypeRef<'_>) -> bool {
        if !std::ptr::eq(self.table, ancestor.table) {
            return false;
        }
        let mut current = Some(self.index);
        while let Some(index) = current {
            if index == ancestor.index {
                return true;
            }
            current = self.table.nodes[index].parent;
        }
        false
    }
}

impl PartialEq for EntityTypeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.index == other.index
    }
}

impl Eq for EntityTypeRef<'_> {}

impl fmt::Debug for EntityTypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}({})", self.name(), id),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Old-version entity type id -> new-version id, matched by name.
#[derive(Debug)]
pub struct EntityTypeMapper {
    new_types: EntityTypeTable,
    ids: HashMap<i32, i32>,
}

impl EntityTypeMapper {
    /// Every concrete old type must exist in the new table.
    pub fn map_types(translator: &'static str, old_types: &EntityTypeTable, new_types: EntityTypeTable) -> ProtocolResult<Self> {
        let mut ids = HashMap::new();
        let mut missing = Vec::new();
        for old in old_types.concrete() {
            let Some(old_id) = old.id() else {
                continue;
            };
            match new_types.by_name(old.name()).and_then(|new| new.id()) {
                Some(new_id) => {
                    ids.insert(old_id, new_id);
                }
                None => missing.push(old.name()),
            }
        }
        if !missing.is_empty() {
            return Err(ProtocolError::configuration(
                translator,
                format!(
                    "entity types missing from {}: {}",
                    new_types.version(),
                    missing.join(", ")
                ),
            ));
        }
        Ok(Self { new_types, ids })
    }

    /// The new id, or `old` unchanged when it is not a known type.
    pub fn new_type_id(&self, old: i32) -> i32 {
        self.ids.get(&old).copied().unwrap_or(old)
    }

    /// Look up a new-version id.
    pub fn type_from_id(&self, id: i32) -> Option<EntityTypeRef<'_>> {
        self.new_types.by_id(id)
    }

    pub fn new_types(&self) -> &EntityTypeTable {
        &self.new_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &[EntityTypeDef] = &[
        abstract_entity("entity", None),
        abstract_entity("living", Some("entity")),
        abstract_entity("monster", Some("living")),
        entity("zombie", 3, Some("monster")),
        entity("boat", 1, Some("entity")),
    ];

    #[test]
    fn test_is_or_has_parent() {
        let table = EntityTypeTable::new("test", DEFS).unwrap();
        let zombie = table.by_name("zombie").unwrap();
        let living = table.by_name("living").unwrap();
        let entity = table.by_name("entity").unwrap();

        assert!(zombie.is_or_has_parent(zombie));
        assert!(zombie.is_or_has_parent(entity));
        assert!(!entity.is_or_has_parent(zombie));
        assert!(!table.by_name("boat").unwrap().is_or_has_parent(living));
        assert_eq!(zombie.parent().unwrap().name(), "monster");
    }

    #[test]
    fn test_unknown_id_is_absent() {
        let table = EntityTypeTable::new("test", DEFS).unwrap();
        assert!(table.by_id(99).is_none());
        assert_eq!(table.by_id(3).unwrap().name(), "zombie");
    }

    #[test]
    fn test_shared_id_names_both_types() {
        let defs = [entity("zombie", 3, None), entity("husk", 3, None)];
        let message = match EntityTypeTable::new("test", &defs) {
            Err(e) => e.to_string(),
            Ok(_) => panic!("duplicate ids accepted"),
        };
        assert!(message.contains("zombie") && message.contains("husk"), "{}", message);
    }

    #[test]
    fn test_parent_must_come_first() {
        let defs = [entity("zombie", 3, Some("monster")), abstract_entity("monster", None)];
        assert!(matches!(
            EntityTypeTable::new("test", &defs),
            Err(ProtocolError::Configuration { .. })
        ));
    }

    #[test]
    fn test_map_types_by_name() {
        let old = EntityTypeTable::new("old", DEFS).unwrap();
        let new = EntityTypeTable::new(
            "new",
            &[
                abstract_entity("entity", None),
                entity("boat", 1, Some("entity")),
                entity("piglin_brute", 2, Some("entity")),
                entity("zombie", 4, Some("entity")),
            ],
        )
        .unwrap();
        let mapper = EntityTypeMapper::map_types("test", &old, new).unwrap();
        assert_eq!(mapper.new_type_id(3), 4);
        assert_eq!(mapper.new_type_id(1), 1);
        assert_eq!(mapper.new_type_id(50), 50);
        assert_eq!(mapper.type_from_id(4).unwrap().name(), "zombie");
    }

    #[test]
    fn test_missing_counterpart_fails_construction() {
        let old = EntityTypeTable::new("old", DEFS).unwrap();
        let new = EntityTypeTable::new("new", &[entity("zombie", 0, None)]).unwrap();
        let err = EntityTypeMapper::map_types("test", &old, new).unwrap_err();
        assert!(err.to_string().contains("boat"));
    }
}
