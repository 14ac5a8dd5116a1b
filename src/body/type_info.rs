//! Type descriptors used for codec selection.

use std::any::{type_name, TypeId};
use std::fmt;

/// Describes the logical type of a body value: a raw type plus its
/// generic arguments, e.g. `Streamed<User>`.
///
/// Codecs inspect it to decide whether they apply. It carries no value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    params: Vec<TypeInfo>,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            params: Vec::new(),
        }
    }

    /// Attach generic arguments, in declaration order.
    pub fn with_params(mut self, params: Vec<TypeInfo>) -> Self {
        self.params = params;
        self
    }

    /// Whether the raw type is `T`, ignoring generic arguments.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    pub fn first_param(&self) -> Option<&TypeInfo> {
        self.params.first()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if !self.params.is_empty() {
            f.write_str("<")?;
            for (idx, param) in self.params.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{param}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({self})")
    }
}
