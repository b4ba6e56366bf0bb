//! Global undo/redo over the operation log.
//!
//! Undo and redo act on the shared history, not on the caller's own strokes:
//! any session can undo whatever was drawn last.

use std::collections::VecDeque;

use crate::log::OperationLog;
use crate::types::{StrokeError, StrokeId, StrokeOperation};

#[derive(Debug)]
pub struct History {
    log: OperationLog,
    redo: VecDeque<StrokeOperation>,
    max_redo_depth: usize,
}

impl History {
    pub fn new(log: OperationLog, max_redo_depth: usize) -> Self {
        Self {
            log,
            redo: VecDeque::new(),
            max_redo_depth,
        }
    }

    /// Start a new stroke. A successful start discards the redo stack.
    pub fn start(
        &mut self,
        op: StrokeOperation,
        author: &str,
    ) -> Result<&StrokeOperation, StrokeError> {
        let op = self.log.append(op, author)?;
        self.redo.clear();
        Ok(op)
    }

    /// Move the most recent operation onto the redo stack and return its id.
    pub fn undo(&mut self) -> Option<StrokeId> {
        let op = self.log.remove_last()?;
        let id = op.id.clone();
        self.redo.push_back(op);
        if self.redo.len() > self.max_redo_depth {
            self.redo.pop_front();
        }
        Some(id)
    }

    /// Restore the most recently undone operation.
    pub fn redo(&mut self) -> Option<StrokeOperation> {
        let op = self.redo.pop_back()?;
        self.log.reappend(op.clone());
        Some(op)
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut OperationLog {
        &mut self.log
    }

    /// Undone operations, oldest first.
    pub fn redo_stack(&self) -> &VecDeque<StrokeOperation> {
        &self.redo
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
