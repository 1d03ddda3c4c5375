//! Object and structure type storage.
//!
//! Names are matched ignoring ASCII case, as script identifiers are; the
//! registered spelling is kept for display.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use scriptlink_core::{
    ObjectType, STRUCTURE_TAG_SEPARATOR, StructField, StructType, TypeDescriptor, VmTypeId,
};

use crate::error::RegistryError;

/// Types known to a [`MemoryVm`](crate::MemoryVm).
#[derive(Debug, Default)]
pub struct TypeTable {
    by_id: FxHashMap<VmTypeId, Arc<ObjectType>>,
    by_name: FxHashMap<String, Arc<ObjectType>>,
    structures: FxHashMap<String, Arc<StructType>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_by_id(&self, type_id: VmTypeId) -> Option<&Arc<ObjectType>> {
        self.by_id.get(&type_id)
    }

    pub fn object_by_name(&self, name: &str) -> Option<&Arc<ObjectType>> {
        self.by_name.get(&name.to_ascii_lowercase())
    }

    /// Structure registered under `Owner#Struct`.
    pub fn structure(&self, tag: &str) -> Option<&Arc<StructType>> {
        self.structures.get(&tag.to_ascii_lowercase())
    }

    pub fn object_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    /// Register an object type. `parent` must already be registered.
    pub fn register_object(
        &mut self,
        name: &str,
        type_id: Option<VmTypeId>,
        parent: Option<&str>,
    ) -> Result<Arc<ObjectType>, RegistryError> {
        let key = name.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(RegistryError::DuplicateTypeName(name.to_owned()));
        }
        if let Some(existing) = type_id.and_then(|id| self.by_id.get(&id)) {
            return Err(RegistryError::DuplicateTypeId {
                id: type_id.map_or(0, VmTypeId::get),
                existing: existing.name().to_string(),
            });
        }
        let parent = match parent {
            Some(parent_name) => Some(Arc::clone(self.object_by_name(parent_name).ok_or_else(
                || RegistryError::UnknownParent {
                    name: name.to_owned(),
                    parent: parent_name.to_owned(),
                },
            )?)),
            None => None,
        };

        let class = Arc::new(ObjectType::new(name, type_id, parent));
        if let Some(id) = type_id {
            self.by_id.insert(id, Arc::clone(&class));
        }
        self.by_name.insert(key, Arc::clone(&class));
        Ok(class)
    }

    /// Register the structure `owner#name`. Field types are spelled the way
    /// scripts spell them (see [`TypeTable::parse_type`]).
    pub fn register_structure(
        &mut self,
        owner: &str,
        name: &str,
        fields: &[(String, String)],
    ) -> Result<Arc<StructType>, RegistryError> {
        let valid = |part: &str| !part.is_empty() && !part.contains(STRUCTURE_TAG_SEPARATOR);
        if !valid(owner) || !valid(name) {
            return Err(RegistryError::InvalidStructureName(format!(
                "{owner}{STRUCTURE_TAG_SEPARATOR}{name}"
            )));
        }
        let tag = format!("{owner}{STRUCTURE_TAG_SEPARATOR}{name}");
        let key = tag.to_ascii_lowercase();
        if self.structures.contains_key(&key) {
            return Err(RegistryError::DuplicateStructure(tag));
        }

        let fields = fields
            .iter()
            .map(|(field, ty)| {
                self.parse_type(ty)
                    .map(|desc| StructField::new(field.as_str(), desc))
                    .ok_or_else(|| RegistryError::UnknownFieldType {
                        structure: tag.clone(),
                        field: field.clone(),
                        ty: ty.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let structure = Arc::new(StructType::new(tag.as_str(), fields));
        self.structures.insert(key, Arc::clone(&structure));
        Ok(structure)
    }

    /// Resolve a script type spelling: `Int`, `Float`, `Bool`, `String`,
    /// `Var`, an object name, or a structure tag, optionally suffixed `[]`.
    pub fn parse_type(&self, spelled: &str) -> Option<TypeDescriptor> {
        let spelled = spelled.trim();
        if let Some(element) = spelled.strip_suffix("[]") {
            return self.parse_type(element)?.array_of();
        }
        let desc = match spelled.to_ascii_lowercase().as_str() {
            "int" => TypeDescriptor::int(),
            "float" => TypeDescriptor::float(),
            "bool" => TypeDescriptor::bool(),
            "string" => TypeDescriptor::string(),
            "var" => TypeDescriptor::var(),
            _ if spelled.contains(STRUCTURE_TAG_SEPARATOR) => {
                TypeDescriptor::structure(Arc::clone(self.structure(spelled)?))
            }
            _ => TypeDescriptor::object(Arc::clone(self.object_by_name(spelled)?)),
        };
        Some(desc)
    }
}
