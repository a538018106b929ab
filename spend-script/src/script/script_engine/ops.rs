// spend-script/src/script/script_engine/ops.rs

use ed25519_dalek::{PublicKey as DalekPublicKey, Signature, Verifier};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use spend_types::{AssetId, SigHashType};

use super::Engine;
use crate::constants::{
    AMOUNT_SCRIPT_NUM_LEN, MAX_OPS_PER_SCRIPT, MAX_PROGRAM_BYTE_LENGTH, MAX_PUBKEYS_PER_MULTISIG,
    MAX_SCRIPT_ELEMENT_SIZE,
};
use crate::error::ScriptError;
use crate::flags::ScriptFlags;
use crate::script::frame::CondTag;
use crate::script::opcode::{parse_script, Opcode, ParsedOpcode};

const ED25519_SIGNATURE_LEN: usize = 64;
const ED25519_PUBKEY_LEN: usize = 32;

impl<'a> Engine<'a> {
    pub(super) fn dispatch(&mut self, pop: &ParsedOpcode) -> Result<(), ScriptError> {
        if let Some(value) = pop.push_value() {
            self.dstack.push_byte_array(value);
            return Ok(());
        }

        match pop.opcode {
            Opcode::OpNop | Opcode::OpCodeSeparator => Ok(()),
            Opcode::OpNop1
            | Opcode::OpNop2
            | Opcode::OpNop3
            | Opcode::OpNop4
            | Opcode::OpNop5
            | Opcode::OpNop6
            | Opcode::OpNop7
            | Opcode::OpNop8
            | Opcode::OpNop9
            | Opcode::OpNop10 => self.op_upgradable_nop(pop.opcode),

            Opcode::OpIf => self.op_if(false),
            Opcode::OpNotIf => self.op_if(true),
            Opcode::OpElse => self.op_else(),
            Opcode::OpEndIf => self.op_endif(),
            Opcode::OpVerify => self.op_verify(),
            Opcode::OpReturn => Err(ScriptError::EarlyReturn),

            Opcode::OpToAltStack => {
                let item = self.dstack.pop_byte_array()?;
                self.astack.push_byte_array(item);
                Ok(())
            }
            Opcode::OpFromAltStack => {
                let item = self.astack.pop_byte_array().map_err(|_| ScriptError::AltStackUnderflow)?;
                self.dstack.push_byte_array(item);
                Ok(())
            }
            Opcode::Op2Drop => self.dstack.drop_n(2),
            Opcode::Op2Dup => self.dstack.dup_n(2),
            Opcode::Op3Dup => self.dstack.dup_n(3),
            Opcode::Op2Over => self.dstack.over_n(2),
            Opcode::Op2Rot => self.dstack.rot_n(2),
            Opcode::Op2Swap => self.dstack.swap_n(2),
            Opcode::OpIfDup => {
                if self.dstack.peek_bool(0)? {
                    self.dstack.dup_n(1)?;
                }
                Ok(())
            }
            Opcode::OpDepth => {
                let depth = self.dstack.depth() as i64;
                self.dstack.push_int(depth);
                Ok(())
            }
            Opcode::OpDrop => self.dstack.drop_n(1),
            Opcode::OpDup => self.dstack.dup_n(1),
            Opcode::OpNip => self.dstack.nip(),
            Opcode::OpOver => self.dstack.over_n(1),
            Opcode::OpPick => {
                let n = self.pop_stack_index()?;
                self.dstack.pick_n(n)
            }
            Opcode::OpRoll => {
                let n = self.pop_stack_index()?;
                self.dstack.roll_n(n)
            }
            Opcode::OpRot => self.dstack.rot_n(1),
            Opcode::OpSwap => self.dstack.swap_n(1),
            Opcode::OpTuck => self.dstack.tuck(),
            Opcode::OpSize => {
                let len = self.dstack.peek_byte_array(0)?.len() as i64;
                self.dstack.push_int(len);
                Ok(())
            }

            Opcode::OpCat => self.op_cat(),
            Opcode::OpSubStr => self.op_substr(),
            Opcode::OpLeft => self.op_left(),
            Opcode::OpRight => self.op_right(),

            Opcode::OpEqual => {
                let equal = self.pop_equal()?;
                self.dstack.push_bool(equal);
                Ok(())
            }
            Opcode::OpEqualVerify => {
                if !self.pop_equal()? {
                    return Err(ScriptError::EqualVerifyFailed);
                }
                Ok(())
            }

            Opcode::Op1Add => self.unary_num(|n| n + 1),
            Opcode::Op1Sub => self.unary_num(|n| n - 1),
            Opcode::OpNegate => self.unary_num(|n| -n),
            Opcode::OpAbs => self.unary_num(i64::abs),
            Opcode::OpNot => self.unary_num(|n| (n == 0) as i64),
            Opcode::Op0NotEqual => self.unary_num(|n| (n != 0) as i64),

            Opcode::OpAdd => self.binary_num(|a, b| a + b),
            Opcode::OpSub => self.binary_num(|a, b| a - b),
            Opcode::OpBoolAnd => self.binary_num(|a, b| (a != 0 && b != 0) as i64),
            Opcode::OpBoolOr => self.binary_num(|a, b| (a != 0 || b != 0) as i64),
            Opcode::OpNumEqual => self.binary_num(|a, b| (a == b) as i64),
            Opcode::OpNumEqualVerify => {
                self.binary_num(|a, b| (a == b) as i64)?;
                if !self.dstack.pop_bool()? {
                    return Err(ScriptError::NumEqualVerifyFailed);
                }
                Ok(())
            }
            Opcode::OpNumNotEqual => self.binary_num(|a, b| (a != b) as i64),
            Opcode::OpLessThan => self.binary_num(|a, b| (a < b) as i64),
            Opcode::OpGreaterThan => self.binary_num(|a, b| (a > b) as i64),
            Opcode::OpLessThanOrEqual => self.binary_num(|a, b| (a <= b) as i64),
            Opcode::OpGreaterThanOrEqual => self.binary_num(|a, b| (a >= b) as i64),
            Opcode::OpMin => self.binary_num(i64::min),
            Opcode::OpMax => self.binary_num(i64::max),
            Opcode::OpWithin => {
                let max = self.dstack.pop_int()?;
                let min = self.dstack.pop_int()?;
                let x = self.dstack.pop_int()?;
                self.dstack.push_bool(min <= x && x < max);
                Ok(())
            }

            Opcode::OpRipemd160 => self.hash_top(|data| Ripemd160::digest(data).to_vec()),
            Opcode::OpSha1 => self.hash_top(|data| Sha1::digest(data).to_vec()),
            Opcode::OpSha256 => self.hash_top(|data| Sha256::digest(data).to_vec()),
            Opcode::OpHash160 => self.hash_top(|data| Ripemd160::digest(Sha256::digest(data)).to_vec()),
            Opcode::OpHash256 => self.hash_top(|data| Sha256::digest(Sha256::digest(data)).to_vec()),

            Opcode::OpCheckSig => {
                let ok = self.op_checksig()?;
                self.dstack.push_bool(ok);
                Ok(())
            }
            Opcode::OpCheckSigVerify => {
                if !self.op_checksig()? {
                    return Err(ScriptError::CheckSigVerifyFailed);
                }
                Ok(())
            }
            Opcode::OpCheckMultiSig => {
                let ok = self.op_checkmultisig()?;
                self.dstack.push_bool(ok);
                Ok(())
            }
            Opcode::OpCheckMultiSigVerify => {
                if !self.op_checkmultisig()? {
                    return Err(ScriptError::CheckMultiSigVerifyFailed);
                }
                Ok(())
            }

            Opcode::OpCheckPredicate => self.op_checkpredicate(),
            Opcode::OpReserveOutput => self.op_reserveoutput(),

            Opcode::OpReserved
            | Opcode::OpVer
            | Opcode::OpVerIf
            | Opcode::OpVerNotIf
            | Opcode::OpReserved1
            | Opcode::OpReserved2 => Err(ScriptError::ReservedOpcode(pop.opcode.to_string())),

            Opcode::OpInvert
            | Opcode::OpAnd
            | Opcode::OpOr
            | Opcode::OpXor
            | Opcode::Op2Mul
            | Opcode::Op2Div
            | Opcode::OpMul
            | Opcode::OpDiv
            | Opcode::OpMod
            | Opcode::OpLShift
            | Opcode::OpRShift => Err(ScriptError::OpcodeDisabled(pop.opcode.to_string())),

            // Pushes were handled above.
            Opcode::Op0
            | Opcode::OpPushBytes(_)
            | Opcode::OpPushData1
            | Opcode::OpPushData2
            | Opcode::OpPushData4
            | Opcode::Op1Negate
            | Opcode::Op1
            | Opcode::Op2
            | Opcode::Op3
            | Opcode::Op4
            | Opcode::Op5
            | Opcode::Op6
            | Opcode::Op7
            | Opcode::Op8
            | Opcode::Op9
            | Opcode::Op10
            | Opcode::Op11
            | Opcode::Op12
            | Opcode::Op13
            | Opcode::Op14
            | Opcode::Op15
            | Opcode::Op16
            | Opcode::OpUnknown(_) => Err(ScriptError::InvalidOpcode(pop.opcode.to_string())),
        }
    }

    // OP_NOP1 - OP_NOP10
    fn op_upgradable_nop(&self, opcode: Opcode) -> Result<(), ScriptError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(ScriptError::DiscourageUpgradableNops(opcode.to_string()));
        }
        Ok(())
    }

    fn cond_stack_mut(&mut self) -> Result<&mut Vec<CondTag>, ScriptError> {
        self.estack
            .peek_mut()
            .map(|frame| &mut frame.cond_stack)
            .ok_or(ScriptError::ScriptUnfinished)
    }

    // OP_IF / OP_NOTIF
    fn op_if(&mut self, negate: bool) -> Result<(), ScriptError> {
        let tag = if self.is_branch_executing() {
            if self.dstack.pop_bool()? != negate {
                CondTag::True
            } else {
                CondTag::False
            }
        } else {
            CondTag::Skip
        };
        self.cond_stack_mut()?.push(tag);
        Ok(())
    }

    // OP_ELSE
    fn op_else(&mut self) -> Result<(), ScriptError> {
        let tag = self.cond_stack_mut()?.last_mut().ok_or(ScriptError::UnbalancedConditional)?;
        *tag = match *tag {
            CondTag::True => CondTag::False,
            CondTag::False => CondTag::True,
            CondTag::Skip => CondTag::Skip,
        };
        Ok(())
    }

    // OP_ENDIF
    fn op_endif(&mut self) -> Result<(), ScriptError> {
        self.cond_stack_mut()?.pop().ok_or(ScriptError::UnbalancedConditional)?;
        Ok(())
    }

    // OP_VERIFY
    fn op_verify(&mut self) -> Result<(), ScriptError> {
        if !self.dstack.pop_bool()? {
            return Err(ScriptError::VerifyFailed);
        }
        Ok(())
    }

    fn pop_stack_index(&mut self) -> Result<usize, ScriptError> {
        let n = self.dstack.pop_int()?;
        if n < 0 || n as usize >= self.dstack.depth() {
            return Err(ScriptError::InvalidStackIndex(n));
        }
        Ok(n as usize)
    }

    fn pop_equal(&mut self) -> Result<bool, ScriptError> {
        let a = self.dstack.pop_byte_array()?;
        let b = self.dstack.pop_byte_array()?;
        Ok(a == b)
    }

    fn unary_num(&mut self, f: impl Fn(i64) -> i64) -> Result<(), ScriptError> {
        let n = self.dstack.pop_int()?;
        self.dstack.push_int(f(n));
        Ok(())
    }

    // Operands are at most four bytes, so i64 arithmetic cannot overflow.
    fn binary_num(&mut self, f: impl Fn(i64, i64) -> i64) -> Result<(), ScriptError> {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        self.dstack.push_int(f(a, b));
        Ok(())
    }

    fn hash_top(&mut self, f: impl Fn(&[u8]) -> Vec<u8>) -> Result<(), ScriptError> {
        let data = self.dstack.pop_byte_array()?;
        self.dstack.push_byte_array(f(&data));
        Ok(())
    }

    fn push_spliced(&mut self, data: Vec<u8>) -> Result<(), ScriptError> {
        if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::ElementTooBig(data.len()));
        }
        self.dstack.push_byte_array(data);
        Ok(())
    }

    // OP_CAT
    fn op_cat(&mut self) -> Result<(), ScriptError> {
        let b = self.dstack.pop_byte_array()?;
        let mut a = self.dstack.pop_byte_array()?;
        a.extend_from_slice(&b);
        self.push_spliced(a)
    }

    // OP_SUBSTR
    fn op_substr(&mut self) -> Result<(), ScriptError> {
        let size = self.dstack.pop_int()?;
        let offset = self.dstack.pop_int()?;
        let data = self.dstack.pop_byte_array()?;
        if size < 0 || offset < 0 {
            return Err(ScriptError::InvalidSpliceRange);
        }
        let (offset, size) = (offset as usize, size as usize);
        let end = offset.checked_add(size).filter(|end| *end <= data.len());
        let end = end.ok_or(ScriptError::InvalidSpliceRange)?;
        self.push_spliced(data[offset..end].to_vec())
    }

    // OP_LEFT
    fn op_left(&mut self) -> Result<(), ScriptError> {
        let size = self.pop_splice_size()?;
        let data = self.dstack.pop_byte_array()?;
        if size > data.len() {
            return Err(ScriptError::InvalidSpliceRange);
        }
        self.push_spliced(data[..size].to_vec())
    }

    // OP_RIGHT
    fn op_right(&mut self) -> Result<(), ScriptError> {
        let size = self.pop_splice_size()?;
        let data = self.dstack.pop_byte_array()?;
        if size > data.len() {
            return Err(ScriptError::InvalidSpliceRange);
        }
        self.push_spliced(data[data.len() - size..].to_vec())
    }

    fn pop_splice_size(&mut self) -> Result<usize, ScriptError> {
        let size = self.dstack.pop_int()?;
        if size < 0 {
            return Err(ScriptError::InvalidSpliceRange);
        }
        Ok(size as usize)
    }

    /// Checks one signature against one public key. An empty signature is a
    /// valid encoding that never verifies.
    fn check_sig(&self, full_sig: &[u8], pubkey: &[u8]) -> Result<bool, ScriptError> {
        let (hash_type, sig) = match full_sig.split_last() {
            Some((hash_type, sig)) => (SigHashType(*hash_type), sig),
            None => return Ok(false),
        };

        self.check_hash_type_encoding(hash_type)?;
        if (self.has_flag(ScriptFlags::VERIFY_DER_SIGNATURES) || self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING))
            && sig.len() != ED25519_SIGNATURE_LEN
        {
            return Err(ScriptError::InvalidSignatureEncoding);
        }
        let public_key = DalekPublicKey::from_bytes(pubkey);
        if self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING)
            && (pubkey.len() != ED25519_PUBKEY_LEN || public_key.is_err())
        {
            return Err(ScriptError::InvalidPubKeyEncoding);
        }

        let public_key = match public_key {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };
        let signature = match Signature::try_from(sig) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        let message = match (&self.sig_hasher, self.block) {
            (Some(hasher), _) => hasher.hash(self.tx_idx, hash_type)?,
            (None, Some(block)) => block.hash_for_sig()?,
            (None, None) => return Ok(false),
        };

        let verified = if self.has_flag(ScriptFlags::VERIFY_LOW_S) {
            public_key.verify_strict(&message, &signature).is_ok()
        } else {
            public_key.verify(&message, &signature).is_ok()
        };
        Ok(verified)
    }

    // OP_CHECKSIG
    fn op_checksig(&mut self) -> Result<bool, ScriptError> {
        let pubkey = self.dstack.pop_byte_array()?;
        let sig = self.dstack.pop_byte_array()?;
        self.check_sig(&sig, &pubkey)
    }

    // OP_CHECKMULTISIG
    //
    // Stack: <dummy> <sig 1> ... <sig m> <m> <key 1> ... <key n> <n>.
    // Signatures must appear in the same order as the keys they match.
    fn op_checkmultisig(&mut self) -> Result<bool, ScriptError> {
        let num_keys = self.dstack.pop_int()?;
        if num_keys < 0 || num_keys as usize > MAX_PUBKEYS_PER_MULTISIG {
            return Err(ScriptError::InvalidPubKeyCount(num_keys));
        }
        self.num_ops += num_keys as usize;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(ScriptError::TooManyOperations);
        }
        let mut pubkeys = Vec::with_capacity(num_keys as usize);
        for _ in 0..num_keys {
            pubkeys.push(self.dstack.pop_byte_array()?);
        }
        pubkeys.reverse();

        let num_sigs = self.dstack.pop_int()?;
        if num_sigs < 0 || num_sigs > num_keys {
            return Err(ScriptError::InvalidSignatureCount(num_sigs));
        }
        let mut sigs = Vec::with_capacity(num_sigs as usize);
        for _ in 0..num_sigs {
            sigs.push(self.dstack.pop_byte_array()?);
        }
        sigs.reverse();

        let dummy = self.dstack.pop_byte_array()?;
        if self.has_flag(ScriptFlags::STRICT_MULTISIG) && !dummy.is_empty() {
            return Err(ScriptError::SigNullDummy);
        }

        let (mut sig_idx, mut key_idx) = (0, 0);
        while sig_idx < sigs.len() {
            if sigs.len() - sig_idx > pubkeys.len() - key_idx {
                return Ok(false);
            }
            if self.check_sig(&sigs[sig_idx], &pubkeys[key_idx])? {
                sig_idx += 1;
            }
            key_idx += 1;
        }
        Ok(true)
    }

    // OP_CHECKPREDICATE
    fn op_checkpredicate(&mut self) -> Result<(), ScriptError> {
        let predicate = self.dstack.pop_byte_array()?;
        if predicate.len() > MAX_PROGRAM_BYTE_LENGTH {
            return Err(ScriptError::ScriptTooLong(predicate.len()));
        }
        let parsed = parse_script(&predicate)?;
        self.push_script(parsed);
        Ok(())
    }

    // OP_RESERVEOUTPUT
    //
    // Stack: <amount> <asset id> <program>.
    fn op_reserveoutput(&mut self) -> Result<(), ScriptError> {
        let program = self.dstack.pop_byte_array()?;
        let asset_id = self.dstack.pop_byte_array()?;
        let amount = self.dstack.pop_int_len(AMOUNT_SCRIPT_NUM_LEN)?;

        let reserved = match (self.tx, AssetId::try_from(asset_id.as_slice())) {
            (Some(tx), Ok(asset_id)) if amount >= 0 => {
                let amount = amount as u64;
                let found = tx.outputs.iter().zip(self.available.iter()).position(|(output, available)| {
                    output.asset_id == asset_id && output.control_program == program && *available >= amount
                });
                match found {
                    Some(idx) => {
                        self.available[idx] -= amount;
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };

        self.dstack.push_bool(reserved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ScriptError;
    use crate::flags::ScriptFlags;
    use crate::script::builder::ScriptBuilder;
    use crate::script::opcode::Opcode;
    use crate::script::script_engine::{Engine, ScriptContext};

    // Helper function to run a standalone script and return the final stack
    fn run(script: &[u8]) -> Result<Vec<Vec<u8>>, ScriptError> {
        let mut vm = Engine::new(ScriptContext::Standalone, ScriptFlags::empty())?;
        vm.prepare(script, &[], 0)?;
        while !vm.step()? {}
        Ok(vm.get_stack())
    }

    fn ops(list: &[Opcode]) -> ScriptBuilder {
        list.iter().fold(ScriptBuilder::new(), |b, op| b.add_op(*op))
    }

    #[test]
    fn test_if_else_endif() {
        let script = ScriptBuilder::new()
            .add_int64(0)
            .add_op(Opcode::OpIf)
            .add_int64(2)
            .add_op(Opcode::OpElse)
            .add_int64(3)
            .add_op(Opcode::OpEndIf)
            .script();
        assert_eq!(run(&script).unwrap(), vec![vec![3]]);

        let script = ScriptBuilder::new()
            .add_int64(0)
            .add_op(Opcode::OpNotIf)
            .add_int64(2)
            .add_op(Opcode::OpElse)
            .add_int64(3)
            .add_op(Opcode::OpEndIf)
            .script();
        assert_eq!(run(&script).unwrap(), vec![vec![2]]);
    }

    #[test]
    fn test_nested_if_inside_false_branch_is_skipped() {
        // The inner IF must not pop: nothing is left for it to pop.
        let script = ScriptBuilder::new()
            .add_int64(0)
            .add_op(Opcode::OpIf)
            .add_op(Opcode::OpIf)
            .add_int64(5)
            .add_op(Opcode::OpElse)
            .add_int64(6)
            .add_op(Opcode::OpEndIf)
            .add_op(Opcode::OpEndIf)
            .add_int64(7)
            .script();
        assert_eq!(run(&script).unwrap(), vec![vec![7]]);
    }

    #[test]
    fn test_unbalanced_conditionals() {
        assert_eq!(run(&ops(&[Opcode::OpElse]).script()), Err(ScriptError::UnbalancedConditional));
        assert_eq!(run(&ops(&[Opcode::OpEndIf]).script()), Err(ScriptError::UnbalancedConditional));
        let open = ScriptBuilder::new().add_int64(1).add_op(Opcode::OpIf).script();
        assert_eq!(run(&open), Err(ScriptError::UnbalancedConditional));
    }

    #[test]
    fn test_stack_ops() {
        let script = ScriptBuilder::new()
            .add_int64(1)
            .add_int64(2)
            .add_int64(3)
            .add_op(Opcode::OpRot)
            .add_op(Opcode::OpToAltStack)
            .add_op(Opcode::OpDepth)
            .add_op(Opcode::OpFromAltStack)
            .script();
        assert_eq!(run(&script).unwrap(), vec![vec![2], vec![3], vec![2], vec![1]]);

        let script = ScriptBuilder::new().add_int64(9).add_int64(8).add_int64(1).add_op(Opcode::OpPick).script();
        assert_eq!(run(&script).unwrap(), vec![vec![9], vec![8], vec![9]]);

        let script = ScriptBuilder::new().add_int64(9).add_int64(1).add_op(Opcode::OpPick).script();
        assert_eq!(run(&script), Err(ScriptError::InvalidStackIndex(1)));

        assert_eq!(run(&ops(&[Opcode::OpFromAltStack]).script()), Err(ScriptError::AltStackUnderflow));
        assert_eq!(run(&ops(&[Opcode::OpDup]).script()), Err(ScriptError::StackUnderflow));
    }

    #[test]
    fn test_arithmetic() {
        let script = ScriptBuilder::new().add_int64(7).add_int64(5).add_op(Opcode::OpSub).script();
        assert_eq!(run(&script).unwrap(), vec![vec![2]]);

        let script = ScriptBuilder::new()
            .add_int64(3)
            .add_int64(2)
            .add_int64(4)
            .add_op(Opcode::OpWithin)
            .script();
        assert_eq!(run(&script).unwrap(), vec![vec![1]]);

        let script = ScriptBuilder::new().add_int64(-5).add_op(Opcode::OpAbs).add_op(Opcode::OpNegate).script();
        assert_eq!(run(&script).unwrap(), vec![vec![0x85]]);

        let script = ScriptBuilder::new()
            .add_data(&[0x01, 0x00, 0x00, 0x00, 0x00])
            .add_op(Opcode::Op1Add)
            .script();
        assert_eq!(run(&script), Err(ScriptError::NumberTooBig(5)));

        let script = ScriptBuilder::new().add_int64(2).add_int64(3).add_op(Opcode::OpNumEqualVerify).script();
        assert_eq!(run(&script), Err(ScriptError::NumEqualVerifyFailed));
    }

    #[test]
    fn test_hashes() {
        let script = ScriptBuilder::new().add_data(b"abc").add_op(Opcode::OpSha256).script();
        assert_eq!(
            hex::encode(&run(&script).unwrap()[0]),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let script = ScriptBuilder::new().add_data(b"abc").add_op(Opcode::OpSha1).script();
        assert_eq!(hex::encode(&run(&script).unwrap()[0]), "a9993e364706816aba3e25717850c26c9cd0d89d");

        let script = ScriptBuilder::new().add_data(b"abc").add_op(Opcode::OpRipemd160).script();
        assert_eq!(hex::encode(&run(&script).unwrap()[0]), "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc");

        let script = ScriptBuilder::new().add_data(b"").add_op(Opcode::OpHash160).add_op(Opcode::OpSize).script();
        assert_eq!(run(&script).unwrap()[1], vec![20]);
    }

    #[test]
    fn test_splice_ops() {
        let v2 = || ScriptBuilder::new().add_int64(2).add_op(Opcode::OpDrop);

        let script = v2().add_data(b"ab").add_data(b"cd").add_op(Opcode::OpCat).script();
        assert_eq!(run(&script).unwrap(), vec![b"abcd".to_vec()]);

        let script = v2().add_data(b"hello").add_int64(1).add_int64(3).add_op(Opcode::OpSubStr).script();
        assert_eq!(run(&script).unwrap(), vec![b"ell".to_vec()]);

        let script = v2().add_data(b"hello").add_int64(2).add_op(Opcode::OpRight).script();
        assert_eq!(run(&script).unwrap(), vec![b"lo".to_vec()]);

        let script = v2().add_data(b"hello").add_int64(6).add_op(Opcode::OpLeft).script();
        assert_eq!(run(&script), Err(ScriptError::InvalidSpliceRange));

        let big = vec![0u8; 300];
        let script = v2().add_data(&big).add_data(&big).add_op(Opcode::OpCat).script();
        assert_eq!(run(&script), Err(ScriptError::ElementTooBig(600)));
    }

    #[test]
    fn test_splice_disabled_before_version_two() {
        let script = ScriptBuilder::new().add_data(b"ab").add_data(b"cd").add_op(Opcode::OpCat).script();
        assert_eq!(run(&script), Err(ScriptError::OpcodeDisabled("OP_CAT".to_string())));
    }

    #[test]
    fn test_reserved_and_unknown_opcodes() {
        assert_eq!(run(&[0x50]), Err(ScriptError::ReservedOpcode("OP_RESERVED".to_string())));
        assert_eq!(run(&[0x62]), Err(ScriptError::ReservedOpcode("OP_VER".to_string())));
        assert_eq!(run(&[0xfe]), Err(ScriptError::InvalidOpcode("OP_UNKNOWN254".to_string())));
        // Not executed, so they do no harm.
        assert_eq!(run(&[0x00, 0x63, 0x50, 0xfe, 0x68, 0x51]).unwrap(), vec![vec![1]]);
    }

    #[test]
    fn test_upgradable_nops() {
        assert_eq!(run(&[0xb0, 0x51]).unwrap(), vec![vec![1]]);

        let mut vm = Engine::new(ScriptContext::Standalone, ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS).unwrap();
        vm.prepare(&[0xb0, 0x51], &[], 0).unwrap();
        assert_eq!(vm.step(), Err(ScriptError::DiscourageUpgradableNops("OP_NOP1".to_string())));
    }

    #[test]
    fn test_checksig_without_context_is_false() {
        let script = ScriptBuilder::new()
            .add_data(&[0u8; 65])
            .add_data(&[0u8; 32])
            .add_op(Opcode::OpCheckSig)
            .script();
        assert_eq!(run(&script).unwrap(), vec![Vec::<u8>::new()]);

        let script = ScriptBuilder::new().add_data(&[]).add_data(&[1u8; 32]).add_op(Opcode::OpCheckSig).script();
        assert_eq!(run(&script).unwrap(), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_checkmultisig_counts_keys_as_operations() {
        let mut b = ScriptBuilder::new();
        for _ in 0..10 {
            b = b.add_int64(0).add_int64(0).add_int64(0).add_op(Opcode::OpCheckMultiSig).add_op(Opcode::OpDrop);
        }
        // Twenty operations so far, then a 20-key multisig pushes the count past the limit.
        b = b.add_int64(0).add_int64(0);
        for _ in 0..20 {
            b = b.add_data(&[2u8; 32]);
        }
        b = b.add_int64(20);
        for _ in 0..180 {
            b = b.add_op(Opcode::OpNop);
        }
        let script = b.add_op(Opcode::OpCheckMultiSig).script();
        assert_eq!(run(&script), Err(ScriptError::TooManyOperations));
    }

    #[test]
    fn test_checkmultisig_counts() {
        let script = ScriptBuilder::new().add_int64(0).add_int64(0).add_int64(21).add_op(Opcode::OpCheckMultiSig).script();
        assert_eq!(run(&script), Err(ScriptError::InvalidPubKeyCount(21)));

        let script = ScriptBuilder::new()
            .add_int64(0)
            .add_int64(2)
            .add_data(&[1u8; 32])
            .add_int64(1)
            .add_op(Opcode::OpCheckMultiSig)
            .script();
        assert_eq!(run(&script), Err(ScriptError::InvalidSignatureCount(2)));

        let script = ScriptBuilder::new().add_int64(1).add_int64(0).add_int64(0).add_op(Opcode::OpCheckMultiSig).script();
        assert_eq!(run(&script).unwrap(), vec![vec![1]]);

        let mut vm = Engine::new(ScriptContext::Standalone, ScriptFlags::STRICT_MULTISIG).unwrap();
        vm.prepare(&script, &[], 0).unwrap();
        assert_eq!(vm.execute(), Err(ScriptError::SigNullDummy));
    }
}
