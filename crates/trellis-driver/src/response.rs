//! Lazily formatted query responses

use crate::error::DriverResult;
use crate::format::{ResponseFormatter, SetResult, Shape};
use crate::record::Record;
use serde_json::Value;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Raw payload of one read or write, plus the formatter of the driver that
/// produced it.
///
/// Each shape is computed on first request and cached, including failures.
pub struct Response {
    raw: Value,
    formatter: Arc<dyn ResponseFormatter>,
    set: OnceCell<DriverResult<SetResult>>,
    tree: OnceCell<DriverResult<Vec<Record>>>,
    path: OnceCell<DriverResult<Vec<Vec<Record>>>>,
    scalar: OnceCell<DriverResult<Value>>,
}

impl Response {
    pub fn new(raw: Value, formatter: Arc<dyn ResponseFormatter>) -> Self {
        Self {
            raw,
            formatter,
            set: OnceCell::new(),
            tree: OnceCell::new(),
            path: OnceCell::new(),
            scalar: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Heuristic classification of the raw payload
    pub fn shape(&self) -> Shape {
        self.formatter.classify(&self.raw)
    }

    pub fn as_set(&self) -> DriverResult<&SetResult> {
        cached(&self.set, || self.formatter.to_set(&self.raw))
    }

    pub fn as_tree(&self) -> DriverResult<&[Record]> {
        cached(&self.tree, || self.formatter.to_tree(&self.raw)).map(Vec::as_slice)
    }

    pub fn as_path(&self) -> DriverResult<&[Vec<Record>]> {
        cached(&self.path, || self.formatter.to_path(&self.raw)).map(Vec::as_slice)
    }

    pub fn as_scalar(&self) -> DriverResult<&Value> {
        cached(&self.scalar, || self.formatter.to_scalar(&self.raw))
    }
}

fn cached<T>(
    cell: &OnceCell<DriverResult<T>>,
    init: impl FnOnce() -> DriverResult<T>,
) -> DriverResult<&T> {
    cell.get_or_init(init).as_ref().map_err(Clone::clone)
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("formatter", &self.formatter.name())
            .field("raw", &self.raw)
            .finish()
    }
}
