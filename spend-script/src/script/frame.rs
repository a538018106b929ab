// spend-script/src/script/frame.rs

use std::rc::Rc;

use crate::error::ScriptError;
use crate::script::opcode::ParsedOpcode;

/// State of one level of nested conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondTag {
    /// The branch is executing.
    True,
    /// The branch is not executing; OP_ELSE will switch it on.
    False,
    /// Opened inside a non-executing branch; never executes.
    Skip,
}

/// One in-flight script: its instructions, program counter and its own
/// conditional tracker.
#[derive(Debug, Clone)]
pub struct StackFrame {
    script: Rc<[ParsedOpcode]>,
    pc: usize,
    pub(crate) cond_stack: Vec<CondTag>,
}

impl StackFrame {
    pub fn new(script: Vec<ParsedOpcode>) -> Self {
        StackFrame { script: script.into(), pc: 0, cond_stack: Vec::new() }
    }

    pub fn script(&self) -> &Rc<[ParsedOpcode]> {
        &self.script
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn step(&mut self) {
        self.pc += 1;
    }

    pub fn done(&self) -> bool {
        self.pc >= self.script.len()
    }

    /// Whether code at the current position runs: true outside any
    /// conditional, otherwise decided by the innermost tag.
    pub fn is_branch_executing(&self) -> bool {
        match self.cond_stack.last() {
            None => true,
            Some(tag) => *tag == CondTag::True,
        }
    }

    pub fn disasm(&self, idx: usize) -> String {
        match self.script.get(idx) {
            Some(pop) => pop.disasm(),
            None => String::new(),
        }
    }
}

/// The call stack of active scripts. Frames live in one vector indexed by
/// depth; the last is the one being stepped.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStack {
    frames: Vec<StackFrame>,
}

impl ExecutionStack {
    pub fn new() -> Self {
        ExecutionStack { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn reset(&mut self) {
        self.frames.clear();
    }

    pub fn peek(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    pub fn frame_mut(&mut self, idx: usize) -> Option<&mut StackFrame> {
        self.frames.get_mut(idx)
    }

    /// Frames innermost first.
    pub fn frames(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames.iter().rev()
    }

    /// Index of the current frame and its program counter.
    pub fn cur_pc(&self) -> Result<(usize, usize), ScriptError> {
        let frame = self.peek().ok_or(ScriptError::ScriptUnfinished)?;
        if frame.done() {
            return Err(ScriptError::ScriptUnfinished);
        }
        Ok((self.frames.len() - 1, frame.pc()))
    }

    /// Pops every finished frame off the top. Returns true once the stack is
    /// empty. A frame that ends inside an open conditional is an error.
    pub fn unwind(&mut self) -> Result<bool, ScriptError> {
        while let Some(frame) = self.frames.last() {
            if !frame.done() {
                return Ok(false);
            }
            if !frame.cond_stack.is_empty() {
                return Err(ScriptError::UnbalancedConditional);
            }
            self.frames.pop();
        }
        Ok(true)
    }

    /// Disassembly of the instruction at `pc` in frame `frame_idx`, prefixed
    /// by its position.
    pub fn disasm(&self, frame_idx: usize, pc: usize) -> String {
        match self.frames.get(frame_idx) {
            Some(frame) => format!("{:02x}:{:04x}: {}", frame_idx, pc, frame.disasm(pc)),
            None => String::new(),
        }
    }
}
