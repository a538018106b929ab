// spend-script/src/script/script_engine.rs

use std::fmt;
use std::rc::Rc;

use log::{debug, trace};
use spend_types::{Block, SigHashType, SigHasher, TxData};

use crate::constants::{
    DEFAULT_SCRIPT_NUM_LEN, KNOWN_SCRIPT_VERSIONS, MAX_EXECUTION_STACK_DEPTH, MAX_OPS_PER_SCRIPT,
    MAX_PROGRAM_BYTE_LENGTH, MAX_SCRIPT_ELEMENT_SIZE, MAX_STACK_SIZE,
};
use crate::error::ScriptError;
use crate::flags::ScriptFlags;
use crate::script::frame::{ExecutionStack, StackFrame};
use crate::script::opcode::{parse_script, parse_script_version, pushed_data, Opcode, ParsedOpcode};
use crate::script::script_num::make_script_num;
use crate::script::stack::Stack;

mod ops;

/// Formats a trace message only when a logger actually writes it.
struct LogClosure<F>(F);

impl<F: Fn() -> String> fmt::Display for LogClosure<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&(self.0)())
    }
}

/// What a script is validated against.
#[derive(Debug, Clone, Copy)]
pub enum ScriptContext<'a> {
    /// Spending an input of this transaction.
    Transaction(&'a TxData),
    /// Signing this block with the previous block's consensus program.
    Block(&'a Block),
    /// No transaction or block; signature checks always fail.
    Standalone,
}

/// The virtual machine that executes scripts.
///
/// One engine validates every input of one transaction: call
/// [`prepare`](Engine::prepare) then [`execute`](Engine::execute) for each
/// input in turn. Reservations made by OP_RESERVEOUTPUT persist across those
/// calls for the life of the engine.
pub struct Engine<'a> {
    script_version: Vec<u8>,
    script_version_val: i64,
    estack: ExecutionStack,
    dstack: Stack,
    astack: Stack,
    tx: Option<&'a TxData>,
    block: Option<&'a Block>,
    sig_hasher: Option<SigHasher<'a>>,
    tx_idx: usize,
    num_ops: usize,
    flags: ScriptFlags,
    // Seeded from the outputs once and never reset by prepare().
    available: Vec<u64>,
}

impl<'a> Engine<'a> {
    pub fn new(context: ScriptContext<'a>, flags: ScriptFlags) -> Result<Self, ScriptError> {
        let (tx, block) = match context {
            ScriptContext::Transaction(tx) => (Some(tx), None),
            ScriptContext::Block(block) => (None, Some(block)),
            ScriptContext::Standalone => (None, None),
        };

        let sig_hasher = match tx {
            Some(tx) => Some(SigHasher::new(tx)?),
            None => None,
        };
        let available = tx
            .map(|tx| tx.outputs.iter().map(|output| output.amount).collect())
            .unwrap_or_default();

        Ok(Engine {
            script_version: Vec::new(),
            script_version_val: 0,
            estack: ExecutionStack::new(),
            dstack: Stack::new(),
            astack: Stack::new(),
            tx,
            block,
            sig_hasher,
            tx_idx: 0,
            num_ops: 0,
            flags,
            available,
        })
    }

    /// Allocates an engine that can execute scripts for every input of `tx`.
    ///
    /// ```ignore
    /// let mut engine = Engine::new_reusable(&tx, flags)?;
    /// for (i, input) in tx.inputs.iter().enumerate() {
    ///     engine.prepare(&control_program, &input.input_witness, i)?;
    ///     engine.execute()?;
    /// }
    /// ```
    ///
    /// Every call to `execute` must be preceded by a call to `prepare`,
    /// including the first.
    pub fn new_reusable(tx: &'a TxData, flags: ScriptFlags) -> Result<Self, ScriptError> {
        Engine::new(ScriptContext::Transaction(tx), flags)
    }

    /// Returns an engine prepared to run `script` against input `input_index`
    /// of `tx`, with that input's witness as arguments.
    pub fn new_for_input(
        script: &[u8],
        tx: &'a TxData,
        input_index: usize,
        flags: ScriptFlags,
    ) -> Result<Self, ScriptError> {
        let mut vm = Engine::new_reusable(tx, flags)?;
        let input = tx.inputs.get(input_index).ok_or(ScriptError::InvalidIndex(input_index))?;
        vm.prepare(script, &input.input_witness, input_index)?;
        Ok(vm)
    }

    /// Returns an engine prepared to run `script` (the previous block's
    /// consensus program) with the data pushed by `block`'s signature script
    /// as arguments.
    pub fn new_for_block(script: &[u8], block: &'a Block, flags: ScriptFlags) -> Result<Self, ScriptError> {
        let mut vm = Engine::new(ScriptContext::Block(block), flags)?;
        let args = pushed_data(&block.signature_script)?;
        vm.prepare(script, &args, 0)?;
        Ok(vm)
    }

    /// Readies the engine to run `script` for input `input_index`, with
    /// `args` pushed in order so the last ends on top.
    ///
    /// Everything except the reservation table is reset.
    #[tracing::instrument(level = "trace", skip(self, script, args), fields(script_len = script.len()))]
    pub fn prepare(&mut self, script: &[u8], args: &[Vec<u8>], input_index: usize) -> Result<(), ScriptError> {
        // The provided transaction input index must refer to a valid input.
        if let Some(tx) = self.tx {
            if input_index >= tx.inputs.len() {
                return Err(ScriptError::InvalidIndex(input_index));
            }
        }
        self.tx_idx = input_index;

        self.dstack.reset();
        self.astack.reset();
        self.estack.reset();
        self.script_version.clear();
        self.script_version_val = 0;
        self.num_ops = 0;

        for arg in args {
            self.dstack.push_byte_array(arg.clone());
        }

        if script.len() > MAX_PROGRAM_BYTE_LENGTH {
            return Err(ScriptError::ScriptTooLong(script.len()));
        }
        let parsed = parse_script(script)?;

        self.script_version = parse_script_version(&parsed);
        // An undecodable version is version 0.
        self.script_version_val = make_script_num(&self.script_version, DEFAULT_SCRIPT_NUM_LEN).unwrap_or(0);

        self.push_script(parsed);
        Ok(())
    }

    /// Runs the prepared script to completion and checks its result.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn execute(&mut self) -> Result<(), ScriptError> {
        // Unknown versions are anyone-can-spend.
        if !KNOWN_SCRIPT_VERSIONS.contains(&self.script_version_val) {
            debug!("script version {} unknown, skipping execution", self.script_version_val);
            return Ok(());
        }

        let mut done = false;
        while !done {
            trace!(
                "{}",
                LogClosure(|| match self.disasm_pc() {
                    Ok(dis) => {
                        let execflag = if self.is_branch_executing() { "" } else { "!" };
                        format!("{}stepping {}", execflag, dis)
                    }
                    Err(err) => format!("stepping ({})", err),
                })
            );

            done = self.step()?;

            trace!(
                "{}",
                LogClosure(|| {
                    let mut out = String::new();
                    if !self.dstack.is_empty() {
                        out.push_str(&format!("Stack:\n{}", self.dstack));
                    }
                    if !self.astack.is_empty() {
                        out.push_str(&format!("AltStack:\n{}", self.astack));
                    }
                    out
                })
            );
        }

        self.check_error_condition(true)
    }

    /// Executes the next instruction and advances the program counter,
    /// unwinding finished frames. Returns true once every frame has finished.
    ///
    /// An error drops every frame, so the engine must be prepared again
    /// before it can run anything.
    pub fn step(&mut self) -> Result<bool, ScriptError> {
        let result = self.step_frame();
        if result.is_err() {
            self.estack.reset();
        }
        result
    }

    fn step_frame(&mut self) -> Result<bool, ScriptError> {
        // An empty script leaves a finished frame with nothing to run.
        if self.estack.peek().map_or(false, StackFrame::done) {
            return self.estack.unwind();
        }

        let (frame_idx, pc) = self.estack.cur_pc()?;
        let script = match self.estack.peek() {
            Some(frame) => Rc::clone(frame.script()),
            None => return Err(ScriptError::ScriptUnfinished),
        };
        let pop = &script[pc];

        self.execute_opcode(pop)?;

        // The number of elements in the combination of the data and alt stacks
        // must not exceed the maximum number of stack elements allowed.
        if self.dstack.depth() + self.astack.depth() > MAX_STACK_SIZE {
            return Err(ScriptError::StackOverflow);
        }
        if self.estack.depth() > MAX_EXECUTION_STACK_DEPTH {
            return Err(ScriptError::StackOverflow);
        }

        // Advance the frame that issued the instruction, which is not the top
        // one if it just pushed a predicate.
        if let Some(frame) = self.estack.frame_mut(frame_idx) {
            frame.step();
        }
        self.estack.unwind()
    }

    // Legality and cost checks run for every instruction, including those in
    // a branch that is not executing.
    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), ScriptError> {
        if pop.is_disabled(self.script_version_val, self.block.is_some()) {
            return Err(ScriptError::OpcodeDisabled(pop.opcode.to_string()));
        }

        if pop.is_always_illegal() {
            return Err(ScriptError::ReservedOpcode(pop.opcode.to_string()));
        }

        // OP_RESERVED sits below OP_16 and is costed as a push.
        if pop.opcode.value() > Opcode::Op16.value() {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(ScriptError::TooManyOperations);
            }
        } else if pop.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ElementTooBig(pop.data.len()));
        }

        if !self.is_branch_executing() && !pop.is_conditional() {
            return Ok(());
        }

        self.dispatch(pop)
    }

    /// Whether the current frame's innermost conditional is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.estack.peek().map_or(true, StackFrame::is_branch_executing)
    }

    /// Pushes a new frame for `script` without touching the data stack; this
    /// is how a script invokes another as a predicate.
    pub fn push_script(&mut self, script: Vec<ParsedOpcode>) {
        self.estack.push(StackFrame::new(script));
    }

    /// Succeeds if every frame has finished and the top of the data stack is
    /// true. The element is popped.
    ///
    /// `final_script` is accepted for callers that apply extra rules to the
    /// last script of a spend; it does not change the outcome here.
    pub fn check_error_condition(&mut self, _final_script: bool) -> Result<(), ScriptError> {
        if !self.estack.is_empty() {
            return Err(ScriptError::ScriptUnfinished);
        }
        if self.dstack.depth() < 1 {
            return Err(ScriptError::EmptyStack);
        }

        if !self.dstack.pop_bool()? {
            trace!("{}", LogClosure(|| format!("script failed, remaining stack:\n{}", self.dstack)));
            return Err(ScriptError::ScriptFailed);
        }
        Ok(())
    }

    /// Disassembly of the instruction the next `step` will run.
    pub fn disasm_pc(&self) -> Result<String, ScriptError> {
        let (frame_idx, pc) = self.estack.cur_pc()?;
        Ok(self.estack.disasm(frame_idx, pc))
    }

    /// Disassembly of every instruction in every active frame, innermost
    /// frame first, one per line.
    pub fn disasm_script(&self) -> String {
        let mut out = String::new();
        let depth = self.estack.depth();
        for (i, frame) in self.estack.frames().enumerate() {
            for idx in 0..frame.script().len() {
                out.push_str(&self.estack.disasm(depth - i - 1, idx));
                out.push('\n');
            }
        }
        out
    }

    /// Rejects hash types outside the defined set when strict encoding is
    /// required.
    pub fn check_hash_type_encoding(&self, hash_type: SigHashType) -> Result<(), ScriptError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }

        let base = hash_type.base();
        if base.0 < SigHashType::ALL.0 || base.0 > SigHashType::SINGLE.0 {
            return Err(ScriptError::InvalidHashType(hash_type.0));
        }
        Ok(())
    }

    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Contents of the data stack, bottom to top.
    pub fn get_stack(&self) -> Vec<Vec<u8>> {
        self.dstack.as_slice().to_vec()
    }

    /// Replaces the data stack; the last item becomes the top.
    pub fn set_stack(&mut self, data: Vec<Vec<u8>>) {
        self.dstack.set(data);
    }

    /// Contents of the alt stack, bottom to top.
    pub fn get_alt_stack(&self) -> Vec<Vec<u8>> {
        self.astack.as_slice().to_vec()
    }

    /// Replaces the alt stack; the last item becomes the top.
    pub fn set_alt_stack(&mut self, data: Vec<Vec<u8>>) {
        self.astack.set(data);
    }

    /// Unreserved amount of each transaction output.
    pub fn available_amounts(&self) -> &[u64] {
        &self.available
    }

    pub fn script_version(&self) -> &[u8] {
        &self.script_version
    }

    pub fn ops_executed(&self) -> usize {
        self.num_ops
    }

    pub fn input_index(&self) -> usize {
        self.tx_idx
    }

    pub fn execution_depth(&self) -> usize {
        self.estack.depth()
    }
}
