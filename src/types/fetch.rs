use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{Row, SqlValue};

/// Blanket helper letting a boxed [`RowTarget`] be turned back into its concrete type.
pub trait AsAny {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AsAny for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// An object that fetched columns can be assigned into.
pub trait RowTarget: AsAny + Send {
    fn assign(&mut self, column: &str, value: SqlValue);
}

impl dyn RowTarget {
    /// Recovers the concrete type of an object built by [`FetchMode::AsClass`].
    pub fn downcast<T: RowTarget + 'static>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

impl RowTarget for Row {
    fn assign(&mut self, column: &str, value: SqlValue) {
        self.set(column, value);
    }
}

/// An existing object shared with the caller, populated on every fetch.
pub type SharedTarget = Arc<Mutex<dyn RowTarget>>;

type Constructor = dyn Fn(&[SqlValue]) -> Box<dyn RowTarget> + Send + Sync;

/// Describes how to instantiate a fresh object for every fetched row.
#[derive(Clone)]
pub struct RowFactory {
    type_name: String,
    ctor_args: Vec<SqlValue>,
    build: Arc<Constructor>,
}

impl RowFactory {
    pub fn new<F>(type_name: impl Into<String>, ctor_args: Vec<SqlValue>, build: F) -> Self
    where
        F: Fn(&[SqlValue]) -> Box<dyn RowTarget> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            ctor_args,
            build: Arc::new(build),
        }
    }

    /// Factory for a type constructed through `Default`.
    pub fn of<T: RowTarget + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<T>(), Vec::new(), |_| {
            Box::new(T::default())
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn ctor_args(&self) -> &[SqlValue] {
        &self.ctor_args
    }

    pub(crate) fn instantiate(&self) -> Box<dyn RowTarget> {
        (self.build)(&self.ctor_args)
    }
}

impl fmt::Debug for RowFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowFactory")
            .field("type_name", &self.type_name)
            .field("ctor_args", &self.ctor_args)
            .finish_non_exhaustive()
    }
}

/// Shape of the records returned by `ResultSet::fetch`.
/// Resolved once per result set.
#[derive(Clone, Default)]
pub enum FetchMode {
    /// A plain [`Row`].
    #[default]
    Structured,
    /// Columns are assigned into a caller-supplied object.
    IntoExisting(SharedTarget),
    /// A new object is instantiated per row, then populated.
    AsClass(RowFactory),
}

impl fmt::Debug for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Structured => f.write_str("Structured"),
            FetchMode::IntoExisting(_) => f.write_str("IntoExisting(..)"),
            FetchMode::AsClass(factory) => f.debug_tuple("AsClass").field(factory).finish(),
        }
    }
}

/// A fetched record, shaped by the result set's [`FetchMode`].
pub enum Fetched {
    Row(Row),
    /// The shared target has been updated with the row's columns.
    Into(SharedTarget),
    Object(Box<dyn RowTarget>),
}

impl Fetched {
    pub fn into_row(self) -> Option<Row> {
        match self {
            Fetched::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn into_object<T: RowTarget + 'static>(self) -> Option<Box<T>> {
        match self {
            Fetched::Object(obj) => obj.downcast::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fetched::Row(row) => f.debug_tuple("Row").field(row).finish(),
            Fetched::Into(_) => f.write_str("Into(..)"),
            Fetched::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Post-fetch hook transforming a row before it is returned.
pub type Modifier = Box<dyn Fn(&mut Row) + Send>;
