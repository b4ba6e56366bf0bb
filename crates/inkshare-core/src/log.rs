//! The authoritative operation log.
//!
//! Insertion order is the global chronological order and the undo order.
//! Only the most recent operation is ever removed, so the id index stays
//! valid without reshuffling.

use std::collections::HashMap;

use tracing::debug;

use crate::session::SessionId;
use crate::types::{Point, StrokeError, StrokeId, StrokeOperation};

/// Result of trying to extend a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// The point was appended.
    Applied,
    /// Unknown, undone, ended, or owned by another session.
    Stale,
    /// The stroke already holds the maximum number of points.
    Capped,
}

#[derive(Debug)]
pub struct OperationLog {
    ops: Vec<StrokeOperation>,
    /// Stroke id -> position in `ops`.
    index: HashMap<StrokeId, usize>,
    /// Strokes still accepting points, keyed to their author.
    open: HashMap<StrokeId, SessionId>,
    max_points_per_stroke: usize,
    max_operations: usize,
}

impl OperationLog {
    pub fn new(max_points_per_stroke: usize, max_operations: usize) -> Self {
        Self {
            ops: Vec::new(),
            index: HashMap::new(),
            open: HashMap::new(),
            max_points_per_stroke: max_points_per_stroke.max(1),
            max_operations,
        }
    }

    /// Append a new stroke, opening it for extension by `author`.
    ///
    /// Points beyond the per-stroke cap are dropped.
    pub fn append(
        &mut self,
        mut op: StrokeOperation,
        author: &str,
    ) -> Result<&StrokeOperation, StrokeError> {
        op.validate()?;
        if self.index.contains_key(&op.id) {
            return Err(StrokeError::DuplicateId(op.id));
        }
        if self.ops.len() >= self.max_operations {
            return Err(StrokeError::LogFull(self.max_operations));
        }
        if op.points.len() > self.max_points_per_stroke {
            debug!(stroke_id = %op.id, points = op.points.len(), "Truncating oversized stroke");
            op.points.truncate(self.max_points_per_stroke);
        }

        self.open.insert(op.id.clone(), author.to_string());
        self.push(op);
        Ok(&self.ops[self.ops.len() - 1])
    }

    /// Append `point` to the open stroke `id` owned by `author`.
    pub fn extend(&mut self, id: &str, point: Point, author: &str) -> ExtendOutcome {
        if self.open.get(id).map(String::as_str) != Some(author) {
            return ExtendOutcome::Stale;
        }
        let Some(op) = self.index.get(id).and_then(|&i| self.ops.get_mut(i)) else {
            return ExtendOutcome::Stale;
        };
        if op.points.len() >= self.max_points_per_stroke {
            return ExtendOutcome::Capped;
        }
        op.points.push(point);
        ExtendOutcome::Applied
    }

    /// Freeze stroke `id` against further extension. Returns false when the
    /// stroke was not open for `author`.
    pub fn end(&mut self, id: &str, author: &str) -> bool {
        if self.open.get(id).map(String::as_str) == Some(author) {
            self.open.remove(id);
            true
        } else {
            false
        }
    }

    /// Freeze every stroke `author` still has open. Returns how many were closed.
    pub fn close_author(&mut self, author: &str) -> usize {
        let before = self.open.len();
        self.open.retain(|_, owner| owner != author);
        before - self.open.len()
    }

    /// Pop the most recently appended operation.
    pub fn remove_last(&mut self) -> Option<StrokeOperation> {
        let op = self.ops.pop()?;
        self.index.remove(&op.id);
        self.open.remove(&op.id);
        Some(op)
    }

    /// Push a previously removed operation back. It stays frozen.
    pub fn reappend(&mut self, op: StrokeOperation) {
        self.push(op);
    }

    /// The full ordered log, as sent to a newly joined client.
    pub fn snapshot(&self) -> Vec<StrokeOperation> {
        self.ops.clone()
    }

    pub fn operations(&self) -> &[StrokeOperation] {
        &self.ops
    }

    pub fn get(&self, id: &str) -> Option<&StrokeOperation> {
        self.index.get(id).and_then(|&i| self.ops.get(i))
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(&mut self, op: StrokeOperation) {
        self.index.insert(op.id.clone(), self.ops.len());
        self.ops.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(id: &str, points: &[(f64, f64)]) -> StrokeOperation {
        StrokeOperation {
            id: id.into(),
            color: "#000".into(),
            width: 3.0,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    #[test]
    fn test_append_and_extend() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();

        assert_eq!(log.extend("s1", Point::new(5.0, 5.0), "alice"), ExtendOutcome::Applied);
        assert_eq!(log.get("s1").unwrap().points.len(), 2);
    }

    #[test]
    fn test_extend_unknown_is_noop() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();

        assert_eq!(log.extend("nope", Point::new(1.0, 1.0), "alice"), ExtendOutcome::Stale);
        assert_eq!(log.snapshot(), vec![stroke("s1", &[(0.0, 0.0)])]);
    }

    #[test]
    fn test_extend_by_other_session_is_noop() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();

        assert_eq!(log.extend("s1", Point::new(1.0, 1.0), "bob"), ExtendOutcome::Stale);
        assert_eq!(log.get("s1").unwrap().points.len(), 1);
    }

    #[test]
    fn test_end_freezes_stroke() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();

        assert!(!log.end("s1", "bob"));
        assert!(log.end("s1", "alice"));
        assert!(!log.is_open("s1"));
        assert_eq!(log.extend("s1", Point::new(1.0, 1.0), "alice"), ExtendOutcome::Stale);
    }

    #[test]
    fn test_point_cap() {
        let mut log = OperationLog::new(3, 100);
        log.append(stroke("s1", &[(0.0, 0.0), (1.0, 1.0)]), "alice").unwrap();

        assert_eq!(log.extend("s1", Point::new(2.0, 2.0), "alice"), ExtendOutcome::Applied);
        assert_eq!(log.extend("s1", Point::new(3.0, 3.0), "alice"), ExtendOutcome::Capped);
        assert_eq!(log.get("s1").unwrap().points.len(), 3);

        let long = stroke("s2", &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(log.append(long, "alice").unwrap().points.len(), 3);
    }

    #[test]
    fn test_duplicate_live_id_rejected() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();

        let err = log.append(stroke("s1", &[(9.0, 9.0)]), "bob").unwrap_err();
        assert_eq!(err, StrokeError::DuplicateId("s1".into()));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_log_full() {
        let mut log = OperationLog::new(100, 1);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();
        assert_eq!(
            log.append(stroke("s2", &[(0.0, 0.0)]), "alice").unwrap_err(),
            StrokeError::LogFull(1)
        );
    }

    #[test]
    fn test_remove_last_closes_and_frees_id() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("s1", &[(0.0, 0.0)]), "alice").unwrap();
        log.append(stroke("s2", &[(1.0, 1.0)]), "bob").unwrap();

        let removed = log.remove_last().unwrap();
        assert_eq!(removed.id, "s2");
        assert!(!log.is_open("s2"));
        assert_eq!(log.extend("s2", Point::new(2.0, 2.0), "bob"), ExtendOutcome::Stale);

        log.reappend(removed);
        assert_eq!(log.operations().last().unwrap().id, "s2");
        assert!(!log.is_open("s2"));
    }

    #[test]
    fn test_remove_last_on_empty() {
        let mut log = OperationLog::new(100, 100);
        assert!(log.remove_last().is_none());
    }

    #[test]
    fn test_close_author() {
        let mut log = OperationLog::new(100, 100);
        log.append(stroke("a1", &[(0.0, 0.0)]), "alice").unwrap();
        log.append(stroke("a2", &[(0.0, 0.0)]), "alice").unwrap();
        log.append(stroke("b1", &[(0.0, 0.0)]), "bob").unwrap();

        assert_eq!(log.close_author("alice"), 2);
        assert!(log.is_open("b1"));
        assert_eq!(log.len(), 3);
    }
}
