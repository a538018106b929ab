// spend-script/src/script/builder.rs

use crate::script::opcode::Opcode;
use crate::script::script_num::script_num_bytes;

/// Assembles script bytes using the smallest encoding for every push.
///
/// ```ignore
/// let program = ScriptBuilder::new()
///     .add_data(&pubkey)
///     .add_op(Opcode::OpCheckSig)
///     .script();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        ScriptBuilder { script: Vec::new() }
    }

    pub fn add_op(mut self, opcode: Opcode) -> Self {
        self.script.push(opcode.value());
        self
    }

    /// Pushes `data`, preferring a small-integer opcode when one pushes the
    /// same bytes.
    pub fn add_data(mut self, data: &[u8]) -> Self {
        match data {
            [] => self.script.push(Opcode::Op0.value()),
            [n @ 1..=16] => self.script.push(Opcode::Op1.value() + n - 1),
            [0x81] => self.script.push(Opcode::Op1Negate.value()),
            _ => {
                let len = data.len();
                if len <= 0x4b {
                    self.script.push(len as u8);
                } else if len <= u8::MAX as usize {
                    self.script.push(Opcode::OpPushData1.value());
                    self.script.push(len as u8);
                } else if len <= u16::MAX as usize {
                    self.script.push(Opcode::OpPushData2.value());
                    self.script.extend_from_slice(&(len as u16).to_le_bytes());
                } else {
                    self.script.push(Opcode::OpPushData4.value());
                    self.script.extend_from_slice(&(len as u32).to_le_bytes());
                }
                self.script.extend_from_slice(data);
            }
        }
        self
    }

    pub fn add_int64(self, n: i64) -> Self {
        match Opcode::from_small_int(n) {
            Some(op) => self.add_op(op),
            None => self.add_data(&script_num_bytes(n)),
        }
    }

    pub fn script(&self) -> Vec<u8> {
        self.script.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pushes() {
        assert_eq!(ScriptBuilder::new().add_data(&[]).script(), vec![0x00]);
        assert_eq!(ScriptBuilder::new().add_data(&[0x05]).script(), vec![0x55]);
        assert_eq!(ScriptBuilder::new().add_data(&[0x81]).script(), vec![0x4f]);
        assert_eq!(ScriptBuilder::new().add_data(&[0x11]).script(), vec![0x01, 0x11]);

        let script = ScriptBuilder::new().add_data(&[0xaa; 76]).script();
        assert_eq!(&script[..2], &[0x4c, 76]);
        assert_eq!(script.len(), 78);

        let script = ScriptBuilder::new().add_data(&[0xaa; 300]).script();
        assert_eq!(&script[..3], &[0x4d, 0x2c, 0x01]);
    }

    #[test]
    fn test_add_int64() {
        let script = ScriptBuilder::new()
            .add_int64(0)
            .add_int64(-1)
            .add_int64(16)
            .add_int64(17)
            .add_int64(-2)
            .script();
        assert_eq!(script, vec![0x00, 0x4f, 0x60, 0x01, 0x11, 0x01, 0x82]);
    }
}
