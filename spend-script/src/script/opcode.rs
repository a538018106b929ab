// spend-script/src/script/opcode.rs

use std::fmt;

use crate::error::ScriptError;
use crate::script::script_num::script_num_bytes;

macro_rules! opcodes {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// Every instruction byte the engine understands.
        ///
        /// Direct pushes of 1 to 75 bytes share `OpPushBytes`; bytes with no
        /// assigned meaning decode to `OpUnknown` and fail only when executed.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
            OpPushBytes(u8),
            OpUnknown(u8),
        }

        impl Opcode {
            pub fn value(self) -> u8 {
                match self {
                    $(Opcode::$variant => $value,)*
                    Opcode::OpPushBytes(b) | Opcode::OpUnknown(b) => b,
                }
            }
        }

        impl From<u8> for Opcode {
            fn from(byte: u8) -> Self {
                match byte {
                    $($value => Opcode::$variant,)*
                    0x01..=0x4b => Opcode::OpPushBytes(byte),
                    _ => Opcode::OpUnknown(byte),
                }
            }
        }

        impl fmt::Display for Opcode {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Opcode::$variant => f.write_str($name),)*
                    Opcode::OpPushBytes(b) => write!(f, "OP_DATA_{}", b),
                    Opcode::OpUnknown(b) => write!(f, "OP_UNKNOWN{}", b),
                }
            }
        }
    };
}

opcodes! {
    Op0 = 0x00 => "OP_0",
    OpPushData1 = 0x4c => "OP_PUSHDATA1",
    OpPushData2 = 0x4d => "OP_PUSHDATA2",
    OpPushData4 = 0x4e => "OP_PUSHDATA4",
    Op1Negate = 0x4f => "OP_1NEGATE",
    OpReserved = 0x50 => "OP_RESERVED",
    Op1 = 0x51 => "OP_1",
    Op2 = 0x52 => "OP_2",
    Op3 = 0x53 => "OP_3",
    Op4 = 0x54 => "OP_4",
    Op5 = 0x55 => "OP_5",
    Op6 = 0x56 => "OP_6",
    Op7 = 0x57 => "OP_7",
    Op8 = 0x58 => "OP_8",
    Op9 = 0x59 => "OP_9",
    Op10 = 0x5a => "OP_10",
    Op11 = 0x5b => "OP_11",
    Op12 = 0x5c => "OP_12",
    Op13 = 0x5d => "OP_13",
    Op14 = 0x5e => "OP_14",
    Op15 = 0x5f => "OP_15",
    Op16 = 0x60 => "OP_16",
    OpNop = 0x61 => "OP_NOP",
    OpVer = 0x62 => "OP_VER",
    OpIf = 0x63 => "OP_IF",
    OpNotIf = 0x64 => "OP_NOTIF",
    OpVerIf = 0x65 => "OP_VERIF",
    OpVerNotIf = 0x66 => "OP_VERNOTIF",
    OpElse = 0x67 => "OP_ELSE",
    OpEndIf = 0x68 => "OP_ENDIF",
    OpVerify = 0x69 => "OP_VERIFY",
    OpReturn = 0x6a => "OP_RETURN",
    OpToAltStack = 0x6b => "OP_TOALTSTACK",
    OpFromAltStack = 0x6c => "OP_FROMALTSTACK",
    Op2Drop = 0x6d => "OP_2DROP",
    Op2Dup = 0x6e => "OP_2DUP",
    Op3Dup = 0x6f => "OP_3DUP",
    Op2Over = 0x70 => "OP_2OVER",
    Op2Rot = 0x71 => "OP_2ROT",
    Op2Swap = 0x72 => "OP_2SWAP",
    OpIfDup = 0x73 => "OP_IFDUP",
    OpDepth = 0x74 => "OP_DEPTH",
    OpDrop = 0x75 => "OP_DROP",
    OpDup = 0x76 => "OP_DUP",
    OpNip = 0x77 => "OP_NIP",
    OpOver = 0x78 => "OP_OVER",
    OpPick = 0x79 => "OP_PICK",
    OpRoll = 0x7a => "OP_ROLL",
    OpRot = 0x7b => "OP_ROT",
    OpSwap = 0x7c => "OP_SWAP",
    OpTuck = 0x7d => "OP_TUCK",
    OpCat = 0x7e => "OP_CAT",
    OpSubStr = 0x7f => "OP_SUBSTR",
    OpLeft = 0x80 => "OP_LEFT",
    OpRight = 0x81 => "OP_RIGHT",
    OpSize = 0x82 => "OP_SIZE",
    OpInvert = 0x83 => "OP_INVERT",
    OpAnd = 0x84 => "OP_AND",
    OpOr = 0x85 => "OP_OR",
    OpXor = 0x86 => "OP_XOR",
    OpEqual = 0x87 => "OP_EQUAL",
    OpEqualVerify = 0x88 => "OP_EQUALVERIFY",
    OpReserved1 = 0x89 => "OP_RESERVED1",
    OpReserved2 = 0x8a => "OP_RESERVED2",
    Op1Add = 0x8b => "OP_1ADD",
    Op1Sub = 0x8c => "OP_1SUB",
    Op2Mul = 0x8d => "OP_2MUL",
    Op2Div = 0x8e => "OP_2DIV",
    OpNegate = 0x8f => "OP_NEGATE",
    OpAbs = 0x90 => "OP_ABS",
    OpNot = 0x91 => "OP_NOT",
    Op0NotEqual = 0x92 => "OP_0NOTEQUAL",
    OpAdd = 0x93 => "OP_ADD",
    OpSub = 0x94 => "OP_SUB",
    OpMul = 0x95 => "OP_MUL",
    OpDiv = 0x96 => "OP_DIV",
    OpMod = 0x97 => "OP_MOD",
    OpLShift = 0x98 => "OP_LSHIFT",
    OpRShift = 0x99 => "OP_RSHIFT",
    OpBoolAnd = 0x9a => "OP_BOOLAND",
    OpBoolOr = 0x9b => "OP_BOOLOR",
    OpNumEqual = 0x9c => "OP_NUMEQUAL",
    OpNumEqualVerify = 0x9d => "OP_NUMEQUALVERIFY",
    OpNumNotEqual = 0x9e => "OP_NUMNOTEQUAL",
    OpLessThan = 0x9f => "OP_LESSTHAN",
    OpGreaterThan = 0xa0 => "OP_GREATERTHAN",
    OpLessThanOrEqual = 0xa1 => "OP_LESSTHANOREQUAL",
    OpGreaterThanOrEqual = 0xa2 => "OP_GREATERTHANOREQUAL",
    OpMin = 0xa3 => "OP_MIN",
    OpMax = 0xa4 => "OP_MAX",
    OpWithin = 0xa5 => "OP_WITHIN",
    OpRipemd160 = 0xa6 => "OP_RIPEMD160",
    OpSha1 = 0xa7 => "OP_SHA1",
    OpSha256 = 0xa8 => "OP_SHA256",
    OpHash160 = 0xa9 => "OP_HASH160",
    OpHash256 = 0xaa => "OP_HASH256",
    OpCodeSeparator = 0xab => "OP_CODESEPARATOR",
    OpCheckSig = 0xac => "OP_CHECKSIG",
    OpCheckSigVerify = 0xad => "OP_CHECKSIGVERIFY",
    OpCheckMultiSig = 0xae => "OP_CHECKMULTISIG",
    OpCheckMultiSigVerify = 0xaf => "OP_CHECKMULTISIGVERIFY",
    OpNop1 = 0xb0 => "OP_NOP1",
    OpNop2 = 0xb1 => "OP_NOP2",
    OpNop3 = 0xb2 => "OP_NOP3",
    OpNop4 = 0xb3 => "OP_NOP4",
    OpNop5 = 0xb4 => "OP_NOP5",
    OpNop6 = 0xb5 => "OP_NOP6",
    OpNop7 = 0xb6 => "OP_NOP7",
    OpNop8 = 0xb7 => "OP_NOP8",
    OpNop9 = 0xb8 => "OP_NOP9",
    OpNop10 = 0xb9 => "OP_NOP10",
    OpCheckPredicate = 0xc0 => "OP_CHECKPREDICATE",
    OpReserveOutput = 0xc1 => "OP_RESERVEOUTPUT",
}

impl Opcode {
    /// Whether this opcode may not appear in a script of `version`, or in a
    /// block-context script. Checked even inside non-executing branches.
    pub fn is_disabled(self, version: i64, is_block_context: bool) -> bool {
        match self {
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
            | Opcode::OpRShift => true,
            Opcode::OpCat | Opcode::OpSubStr | Opcode::OpLeft | Opcode::OpRight => version < 2,
            Opcode::OpCheckPredicate => version < 1,
            // Reservations only make sense against a transaction's outputs.
            Opcode::OpReserveOutput => version < 1 || is_block_context,
            _ => false,
        }
    }

    /// Opcodes that fail wherever they appear, executed or not.
    pub fn is_always_illegal(self) -> bool {
        matches!(self, Opcode::OpVerIf | Opcode::OpVerNotIf)
    }

    /// Branch-control opcodes run even inside a non-executing branch so
    /// nesting stays tracked.
    pub fn is_conditional(self) -> bool {
        matches!(self, Opcode::OpIf | Opcode::OpNotIf | Opcode::OpElse | Opcode::OpEndIf)
    }

    /// Whether executing this opcode only pushes a value. OP_RESERVED sits in
    /// the push range but is not a push.
    pub fn is_push(self) -> bool {
        self.value() <= Opcode::Op16.value() && self != Opcode::OpReserved
    }

    /// The value pushed by OP_0, OP_1NEGATE and OP_1 through OP_16.
    pub fn small_int(self) -> Option<i64> {
        match self {
            Opcode::Op0 => Some(0),
            Opcode::Op1Negate => Some(-1),
            op if (Opcode::Op1.value()..=Opcode::Op16.value()).contains(&op.value()) => {
                Some((op.value() - Opcode::Op1.value() + 1) as i64)
            }
            _ => None,
        }
    }

    /// The opcode pushing `n`, for -1 and 0 through 16.
    pub fn from_small_int(n: i64) -> Option<Opcode> {
        match n {
            -1 => Some(Opcode::Op1Negate),
            0 => Some(Opcode::Op0),
            1..=16 => Some(Opcode::from(Opcode::Op1.value() + (n as u8) - 1)),
            _ => None,
        }
    }
}

/// One instruction of a parsed script together with its pushed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpcode {
    pub opcode: Opcode,
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn new(opcode: Opcode, data: Vec<u8>) -> Self {
        ParsedOpcode { opcode, data }
    }

    pub fn is_disabled(&self, version: i64, is_block_context: bool) -> bool {
        self.opcode.is_disabled(version, is_block_context)
    }

    pub fn is_always_illegal(&self) -> bool {
        self.opcode.is_always_illegal()
    }

    pub fn is_conditional(&self) -> bool {
        self.opcode.is_conditional()
    }

    /// The bytes this instruction leaves on the stack when it is a push.
    pub fn push_value(&self) -> Option<Vec<u8>> {
        if !self.opcode.is_push() {
            return None;
        }
        match self.opcode.small_int() {
            Some(n) => Some(script_num_bytes(n)),
            None => Some(self.data.clone()),
        }
    }

    /// One-line disassembly: pushed data as hex, small integers as numbers,
    /// anything else by name.
    pub fn disasm(&self) -> String {
        match self.opcode {
            Opcode::OpPushBytes(_) | Opcode::OpPushData1 | Opcode::OpPushData2 | Opcode::OpPushData4 => {
                hex::encode(&self.data)
            }
            op => match op.small_int() {
                Some(n) => n.to_string(),
                None => op.to_string(),
            },
        }
    }
}

impl fmt::Display for ParsedOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disasm())
    }
}

// Read a little-endian length prefix of `width` bytes at `*ip`.
fn read_push_len(script: &[u8], ip: &mut usize, width: usize, start: usize) -> Result<usize, ScriptError> {
    let end = ip.checked_add(width).filter(|end| *end <= script.len());
    let end = end.ok_or(ScriptError::MalformedPush(start))?;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(&script[*ip..end]);
    *ip = end;
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Splits raw script bytes into instructions.
pub fn parse_script(script: &[u8]) -> Result<Vec<ParsedOpcode>, ScriptError> {
    let mut ops = Vec::new();
    let mut ip = 0;
    while ip < script.len() {
        let start = ip;
        let opcode = Opcode::from(script[ip]);
        ip += 1;

        let len = match opcode {
            Opcode::OpPushBytes(n) => n as usize,
            Opcode::OpPushData1 => read_push_len(script, &mut ip, 1, start)?,
            Opcode::OpPushData2 => read_push_len(script, &mut ip, 2, start)?,
            Opcode::OpPushData4 => read_push_len(script, &mut ip, 4, start)?,
            _ => 0,
        };

        let end = ip
            .checked_add(len)
            .filter(|end| *end <= script.len())
            .ok_or(ScriptError::MalformedPush(start))?;
        ops.push(ParsedOpcode::new(opcode, script[ip..end].to_vec()));
        ip = end;
    }
    Ok(ops)
}

/// Returns the version prefix of a parsed script: the value pushed by a
/// leading push that is immediately dropped. Scripts without the prefix are
/// version 0 and yield an empty vector.
pub fn parse_script_version(ops: &[ParsedOpcode]) -> Vec<u8> {
    match ops {
        [version, drop, ..] if drop.opcode == Opcode::OpDrop => version.push_value().unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Returns the data pushed by a push-only script.
pub fn pushed_data(script: &[u8]) -> Result<Vec<Vec<u8>>, ScriptError> {
    let ops = parse_script(script)?;
    if !is_push_only(&ops) {
        return Err(ScriptError::NotPushOnly);
    }
    Ok(ops.iter().filter_map(ParsedOpcode::push_value).collect())
}

/// Whether every instruction in `script` is a push.
pub fn is_push_only(ops: &[ParsedOpcode]) -> bool {
    ops.iter().all(|pop| pop.opcode.is_push())
}

/// Renders a script as a single line of space-separated instructions.
pub fn disasm_script(script: &[u8]) -> Result<String, ScriptError> {
    let ops = parse_script(script)?;
    Ok(ops.iter().map(ParsedOpcode::disasm).collect::<Vec<_>>().join(" "))
}
