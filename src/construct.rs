//! Semantic tree construction
//!
//! [`construct`] turns a syntax tree into typed domain values. For each
//! node, depth-first, the values built from its children are collected into
//! a per-label map, and a user callback is invoked with the node's label
//! and an [`Accessor`] over that map. The callback returns the node's own
//! value (or `None` to contribute nothing), which propagates upward.
//!
//! Values are the tagged any-type [`Value`]: strings, ordered sequences,
//! or user objects behind `Rc<dyn Any>`. The accessor's typed getters
//! coerce on access: a single value auto-promotes to a one-element sequence
//! when a sequence is requested, and nested sequences flatten.
//!
//! Errors accumulate in the accessor; after the callback returns, a check
//! aggregates them — including, under
//! [`AccessorOptions::error_on_unused_child`], an error for every child
//! value the callback never asked for — into one consolidated report.

use crate::node::Node;
use hashbrown::{HashMap, HashSet};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A polymorphic value produced during semantic construction.
#[derive(Clone)]
pub enum Value {
    /// A string value.
    Str(String),
    /// An ordered sequence of values.
    Seq(Vec<Value>),
    /// A user object.
    Obj(Rc<dyn Any>),
}

impl Value {
    /// Wraps a user object.
    pub fn obj<T: 'static>(value: T) -> Value {
        Value::Obj(Rc::new(value))
    }

    /// Wraps a string.
    pub fn str(value: impl Into<String>) -> Value {
        Value::Str(value.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Obj(_) => "object",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Seq(items) => f.debug_list().entries(items).finish(),
            Value::Obj(_) => write!(f, "Obj(..)"),
        }
    }
}

/// Behavior switches for the accessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessorOptions {
    /// Report children whose values were never queried by the callback.
    pub error_on_unused_child: bool,
}

/// An error produced during semantic construction.
#[derive(Debug, Clone)]
pub enum ConstructError {
    /// A requested child value does not exist.
    Missing {
        /// Label of the node under construction.
        node: String,
        /// The requested child label.
        name: String,
        /// What the caller asked for.
        want: &'static str,
    },
    /// A child value exists but has the wrong shape or type.
    TypeMismatch {
        /// Label of the node under construction.
        node: String,
        /// The requested child label.
        name: String,
        /// What the caller asked for.
        want: &'static str,
        /// What was found instead.
        got: &'static str,
    },
    /// A child value was never queried under `error_on_unused_child`.
    UnusedChild(String),
    /// An index-based child access was out of bounds.
    OutOfBounds {
        /// The requested index.
        want: usize,
        /// The number of children present.
        have: usize,
    },
    /// Several errors, consolidated per node.
    Multiple(Vec<ConstructError>),
    /// An error wrapped with the label and text form of the node it
    /// occurred in.
    In {
        /// Label of the failing node.
        label: String,
        /// Text form of the failing node.
        tree: String,
        /// The underlying error.
        source: Box<ConstructError>,
    },
    /// A callback-specific error.
    Custom(String),
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructError::Missing { node, name, want } => {
                write!(f, "in {} expected {} as {}, got none", node, name, want)
            }
            ConstructError::TypeMismatch {
                node,
                name,
                want,
                got,
            } => write!(f, "in {} expected {} as {}, got {}", node, name, want, got),
            ConstructError::UnusedChild(name) => {
                write!(f, "child {} was not used during conversion", name)
            }
            ConstructError::OutOfBounds { want, have } => write!(
                f,
                "child access out of bounds: want [{}], got {} children",
                want, have
            ),
            ConstructError::Multiple(errors) => {
                writeln!(f, "multiple errors:")?;
                for err in errors {
                    writeln!(f, "{}", err)?;
                }
                Ok(())
            }
            ConstructError::In {
                label,
                tree,
                source,
            } => write!(
                f,
                "error constructing {}: {}\nTree: {}",
                label, source, tree
            ),
            ConstructError::Custom(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ConstructError {}

/// The view given to the construction callback: the node being converted
/// plus typed access to the values its children produced.
pub struct Accessor<'a, 'i> {
    node: &'a Node<'i>,
    children: HashMap<String, Vec<Value>>,
    accessed: HashSet<String>,
    errors: Vec<ConstructError>,
    options: AccessorOptions,
}

impl<'a, 'i> Accessor<'a, 'i> {
    /// The syntax-tree node currently being converted.
    pub fn node(&self) -> &'a Node<'i> {
        self.node
    }

    /// The raw value (or sequence of values) a child label produced.
    pub fn get(&mut self, name: &str) -> Result<Value, ConstructError> {
        self.accessed.insert(name.to_string());
        match self.children.get(name) {
            Some(values) if values.len() == 1 => Ok(values[0].clone()),
            Some(values) => Ok(Value::Seq(values.clone())),
            None => Err(self.missing(name, "value")),
        }
    }

    /// The string value a child label produced.
    pub fn get_string(&mut self, name: &str) -> Result<String, ConstructError> {
        self.accessed.insert(name.to_string());
        match self.children.get(name) {
            None => Err(self.missing(name, "string")),
            Some(values) => match values.as_slice() {
                [Value::Str(s)] => Ok(s.clone()),
                [other] => Err(self.mismatch(name, "string", other.kind())),
                _ => Err(self.mismatch(name, "string", "sequence")),
            },
        }
    }

    /// Like [`get_string`](Accessor::get_string), but records the error and
    /// returns an empty string.
    pub fn string(&mut self, name: &str) -> String {
        match self.get_string(name) {
            Ok(s) => s,
            Err(err) => {
                self.errors.push(err);
                String::new()
            }
        }
    }

    /// The object of type `T` a child label produced.
    pub fn get_obj<T: 'static>(&mut self, name: &str) -> Result<Rc<T>, ConstructError> {
        self.accessed.insert(name.to_string());
        let want = std::any::type_name::<T>();
        match self.children.get(name) {
            None => Err(self.missing(name, want)),
            Some(values) => match values.as_slice() {
                [Value::Obj(obj)] => obj
                    .clone()
                    .downcast::<T>()
                    .map_err(|_| self.mismatch(name, want, "object")),
                [other] => Err(self.mismatch(name, want, other.kind())),
                _ => Err(self.mismatch(name, want, "sequence")),
            },
        }
    }

    /// Like [`get_obj`](Accessor::get_obj), but records the error and
    /// returns a default value.
    pub fn obj<T: 'static + Default>(&mut self, name: &str) -> Rc<T> {
        match self.get_obj(name) {
            Ok(value) => value,
            Err(err) => {
                self.errors.push(err);
                Rc::new(T::default())
            }
        }
    }

    /// Every object of type `T` a child label produced. A missing child
    /// yields an empty sequence; a single value yields one element; nested
    /// sequences flatten.
    pub fn get_seq<T: 'static>(&mut self, name: &str) -> Result<Vec<Rc<T>>, ConstructError> {
        self.accessed.insert(name.to_string());
        let want = std::any::type_name::<T>();
        let values = match self.children.get(name) {
            None => return Ok(Vec::new()),
            Some(values) => values.clone(),
        };
        let mut out = Vec::with_capacity(values.len());
        for value in &values {
            self.flatten_into(value, name, want, &mut out)?;
        }
        Ok(out)
    }

    /// Like [`get_seq`](Accessor::get_seq), but records the error and
    /// returns an empty sequence.
    pub fn seq<T: 'static>(&mut self, name: &str) -> Vec<Rc<T>> {
        match self.get_seq(name) {
            Ok(values) => values,
            Err(err) => {
                self.errors.push(err);
                Vec::new()
            }
        }
    }

    /// Every string a child label produced, with the same promotion rules
    /// as [`get_seq`](Accessor::get_seq).
    pub fn get_strings(&mut self, name: &str) -> Result<Vec<String>, ConstructError> {
        self.accessed.insert(name.to_string());
        let values = match self.children.get(name) {
            None => return Ok(Vec::new()),
            Some(values) => values.clone(),
        };
        let mut out = Vec::with_capacity(values.len());
        for value in &values {
            self.flatten_strings_into(value, name, &mut out)?;
        }
        Ok(out)
    }

    /// The label of the i-th raw child in the syntax tree. Out-of-bounds
    /// access records an error and returns an empty label.
    pub fn child(&mut self, i: usize) -> &'a str {
        match self.node.children.get(i) {
            Some(ch) => &ch.label,
            None => {
                self.errors.push(ConstructError::OutOfBounds {
                    want: i,
                    have: self.node.children.len(),
                });
                ""
            }
        }
    }

    /// The first raw child node with the given label, if any.
    pub fn get_child(&self, label: &str) -> Option<&'a Node<'i>> {
        self.node.child(label)
    }

    fn flatten_into<T: 'static>(
        &self,
        value: &Value,
        name: &str,
        want: &'static str,
        out: &mut Vec<Rc<T>>,
    ) -> Result<(), ConstructError> {
        match value {
            Value::Obj(obj) => {
                let item = obj
                    .clone()
                    .downcast::<T>()
                    .map_err(|_| self.mismatch(name, want, "object"))?;
                out.push(item);
                Ok(())
            }
            Value::Seq(items) => {
                for item in items {
                    self.flatten_into(item, name, want, out)?;
                }
                Ok(())
            }
            Value::Str(_) => Err(self.mismatch(name, want, "string")),
        }
    }

    fn flatten_strings_into(
        &self,
        value: &Value,
        name: &str,
        out: &mut Vec<String>,
    ) -> Result<(), ConstructError> {
        match value {
            Value::Str(s) => {
                out.push(s.clone());
                Ok(())
            }
            Value::Seq(items) => {
                for item in items {
                    self.flatten_strings_into(item, name, out)?;
                }
                Ok(())
            }
            Value::Obj(_) => Err(self.mismatch(name, "string", "object")),
        }
    }

    fn missing(&self, name: &str, want: &'static str) -> ConstructError {
        ConstructError::Missing {
            node: self.node.label.clone(),
            name: name.to_string(),
            want,
        }
    }

    fn mismatch(&self, name: &str, want: &'static str, got: &'static str) -> ConstructError {
        ConstructError::TypeMismatch {
            node: self.node.label.clone(),
            name: name.to_string(),
            want,
            got,
        }
    }

    fn check(&mut self) -> Result<(), ConstructError> {
        if self.options.error_on_unused_child {
            let mut unused: Vec<String> = self
                .children
                .keys()
                .filter(|k| !self.accessed.contains(*k))
                .cloned()
                .collect();
            unused.sort();
            for name in unused {
                self.errors.push(ConstructError::UnusedChild(name));
            }
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConstructError::Multiple(std::mem::take(&mut self.errors)))
        }
    }
}

/// Builds a typed value from a syntax tree, depth-first. Children are
/// converted first; their values, keyed by label, are exposed to the
/// callback through an [`Accessor`]. A `None` from the callback skips the
/// node. Errors abort construction and carry the offending node's label
/// and text form.
pub fn construct<'i, F>(
    node: &Node<'i>,
    callback: &mut F,
    options: AccessorOptions,
) -> Result<Option<Value>, ConstructError>
where
    F: for<'a> FnMut(&str, &mut Accessor<'a, 'i>) -> Result<Option<Value>, ConstructError>,
{
    let mut ca = Accessor {
        node,
        children: HashMap::new(),
        accessed: HashSet::new(),
        errors: Vec::new(),
        options,
    };
    for ch in &node.children {
        let Some(value) = construct(ch, callback, options)? else {
            continue;
        };
        ca.children.entry(ch.label.clone()).or_default().push(value);
    }
    let value = callback(&node.label, &mut ca).map_err(|err| wrap(node, err))?;
    ca.check().map_err(|err| wrap(node, err))?;
    Ok(value)
}

fn wrap(node: &Node<'_>, err: ConstructError) -> ConstructError {
    match err {
        wrapped @ ConstructError::In { .. } => wrapped,
        other => ConstructError::In {
            label: node.label.clone(),
            tree: node.to_string(),
            source: Box::new(other),
        },
    }
}
