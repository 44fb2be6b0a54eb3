use std::collections::{BTreeMap, HashMap};

/// Values an expression can read while it is evaluated.
///
/// Booleans are passed as `0`/`1`.
pub trait FieldContext {
    /// The current value of the field called `name`, if the context has one.
    fn field_value(&self, name: &str) -> Option<i64>;

    /// Whether the object being read derives from the block type `type_name`.
    fn is_derived_type(&self, _type_name: &str) -> Option<bool> {
        None
    }
}

/// The empty context: every name is unbound.
impl FieldContext for () {
    fn field_value(&self, _name: &str) -> Option<i64> {
        None
    }
}

impl FieldContext for HashMap<String, i64> {
    fn field_value(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

impl FieldContext for BTreeMap<String, i64> {
    fn field_value(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

impl<T: FieldContext + ?Sized> FieldContext for &T {
    fn field_value(&self, name: &str) -> Option<i64> {
        (**self).field_value(name)
    }

    fn is_derived_type(&self, type_name: &str) -> Option<bool> {
        (**self).is_derived_type(type_name)
    }
}

/// Anything stored in a `Registry`.
pub trait Named {
    fn name(&self) -> &str;
}
