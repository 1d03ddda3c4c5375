//! Argument access for native calls.
//!
//! A native function never sees the VM's stack directly; it is handed a
//! [`StackFrame`] and reads its arguments through the frame's parent [`Stack`].

use std::fmt;

use crate::variable::Variable;

/// Identifies the VM stack (script thread) a call runs on.
pub type StackId = u32;

/// VM-owned storage backing stack frames.
pub trait Stack {
    /// Page holding `frame`'s variables.
    fn page_for_frame(&self, frame: &StackFrame<'_>) -> u32;

    /// Copy of the `index`th argument of `frame` on `page`.
    fn frame_variable(&self, frame: &StackFrame<'_>, index: u32, page: u32) -> Option<Variable>;
}

/// One call's view of its arguments.
#[derive(Clone, Copy)]
pub struct StackFrame<'s> {
    /// Number of arguments the caller pushed.
    pub size: u32,
    /// Position of the first argument within the parent stack.
    pub offset: u32,
    /// The stack this frame lives on; `None` for a frame the VM failed to
    /// attach.
    pub parent: Option<&'s dyn Stack>,
}

impl<'s> StackFrame<'s> {
    pub fn new(parent: &'s dyn Stack, offset: u32, size: u32) -> Self {
        Self {
            size,
            offset,
            parent: Some(parent),
        }
    }

    /// A frame with no backing stack.
    pub fn detached(size: u32) -> Self {
        Self {
            size,
            offset: 0,
            parent: None,
        }
    }

    /// Read the `index`th argument. `None` past the end of the frame or when
    /// detached.
    pub fn argument(&self, index: u32) -> Option<Variable> {
        if index >= self.size {
            return None;
        }
        let stack = self.parent?;
        let page = stack.page_for_frame(self);
        stack.frame_variable(self, index, page)
    }
}

impl fmt::Debug for StackFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackFrame")
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("attached", &self.parent.is_some())
            .finish()
    }
}

/// A single-page stack over a contiguous list of variables.
#[derive(Debug, Default, Clone)]
pub struct SliceStack {
    values: Vec<Variable>,
}

impl SliceStack {
    pub fn new(values: Vec<Variable>) -> Self {
        Self { values }
    }

    /// A frame spanning every value on the stack.
    pub fn frame(&self) -> StackFrame<'_> {
        let size = u32::try_from(self.values.len()).unwrap_or(u32::MAX);
        StackFrame::new(self, 0, size)
    }
}

impl Stack for SliceStack {
    fn page_for_frame(&self, _frame: &StackFrame<'_>) -> u32 {
        0
    }

    fn frame_variable(&self, frame: &StackFrame<'_>, index: u32, _page: u32) -> Option<Variable> {
        let slot = frame.offset.checked_add(index)? as usize;
        self.values.get(slot).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_reads_arguments() {
        let stack = SliceStack::new(vec![Variable::Int(1), Variable::Bool(true)]);
        let frame = stack.frame();
        assert_eq!(frame.size, 2);
        assert_eq!(frame.argument(0), Some(Variable::Int(1)));
        assert_eq!(frame.argument(1), Some(Variable::Bool(true)));
        assert_eq!(frame.argument(2), None);
    }

    #[test]
    fn offset_frame() {
        let stack = SliceStack::new(vec![Variable::Int(1), Variable::Int(2), Variable::Int(3)]);
        let frame = StackFrame::new(&stack, 1, 2);
        assert_eq!(frame.argument(0), Some(Variable::Int(2)));
        assert_eq!(frame.argument(1), Some(Variable::Int(3)));
    }

    #[test]
    fn detached_frame_has_no_arguments() {
        let frame = StackFrame::detached(3);
        assert_eq!(frame.argument(0), None);
    }
}
