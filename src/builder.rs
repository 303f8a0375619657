// ABOUTME: Token visitor that assembles decoded tokens into a Value tree.
// ABOUTME: Open containers live on an explicit stack, so depth never recurses.

use crate::error::{Error, Result};
use crate::value::Value;
use crate::visitor::TokenVisitor;

/// Cap on capacity reserved from a header's declared count.
const PREALLOC_CHILDREN: usize = 1024;

/// A container whose children are still arriving.
#[derive(Debug)]
enum Partial {
    Array(Vec<Value>),
    Map {
        entries: Vec<(Value, Value)>,
        key: Option<Value>,
    },
}

impl Partial {
    fn into_value(self) -> Result<Value> {
        match self {
            Partial::Array(items) => Ok(Value::Array(items)),
            Partial::Map { key: Some(_), .. } => Err(Error::IncompleteContainer),
            Partial::Map { entries, key: None } => Ok(Value::Map(entries)),
        }
    }
}

/// Accumulates one complete [`Value`] from a stream of visitor calls.
///
/// Scalars attach to the innermost open container (as an element, a map key,
/// or the value for the pending key). `close_container` folds the innermost
/// container into its parent.
#[derive(Debug, Default)]
pub struct ValueBuilder {
    open: Vec<Partial>,
    result: Option<Value>,
}

impl ValueBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a complete top-level value has been built.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.open.is_empty() && self.result.is_some()
    }

    /// Take the finished value.
    pub fn finish(self) -> Result<Value> {
        if !self.open.is_empty() {
            return Err(Error::IncompleteContainer);
        }
        self.result.ok_or(Error::IncompleteInput)
    }

    fn attach(&mut self, value: Value) -> Result<()> {
        match self.open.last_mut() {
            None => {
                if self.result.is_some() {
                    return Err(Error::StackMismatch);
                }
                self.result = Some(value);
            }
            Some(Partial::Array(items)) => items.push(value),
            Some(Partial::Map { entries, key }) => match key.take() {
                Some(k) => entries.push((k, value)),
                None => *key = Some(value),
            },
        }
        Ok(())
    }
}

impl TokenVisitor for ValueBuilder {
    fn accept_nil(&mut self) -> Result<()> {
        self.attach(Value::Nil)
    }

    fn accept_bool(&mut self, value: bool) -> Result<()> {
        self.attach(Value::Bool(value))
    }

    fn accept_int(&mut self, value: i64) -> Result<()> {
        self.attach(Value::Int(value))
    }

    fn accept_uint(&mut self, value: u64) -> Result<()> {
        self.attach(Value::UInt(value))
    }

    fn accept_f32(&mut self, value: f32) -> Result<()> {
        self.attach(Value::Float32(value))
    }

    fn accept_f64(&mut self, value: f64) -> Result<()> {
        self.attach(Value::Float64(value))
    }

    fn accept_raw(&mut self, value: &[u8]) -> Result<()> {
        self.attach(Value::Raw(value.to_vec()))
    }

    fn accept_array(&mut self, count: u32) -> Result<()> {
        let cap = (count as usize).min(PREALLOC_CHILDREN);
        self.open.push(Partial::Array(Vec::with_capacity(cap)));
        Ok(())
    }

    fn accept_map(&mut self, pair_count: u32) -> Result<()> {
        let cap = (pair_count as usize).min(PREALLOC_CHILDREN);
        self.open.push(Partial::Map {
            entries: Vec::with_capacity(cap),
            key: None,
        });
        Ok(())
    }

    fn accept_empty_array(&mut self) -> Result<()> {
        self.attach(Value::Array(Vec::new()))
    }

    fn accept_empty_map(&mut self) -> Result<()> {
        self.attach(Value::Map(Vec::new()))
    }

    fn close_container(&mut self) -> Result<()> {
        let partial = self.open.pop().ok_or(Error::StackMismatch)?;
        let value = partial.into_value()?;
        self.attach(value)
    }
}
