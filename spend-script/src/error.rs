// spend-script/src/error.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every way script validation can fail.
///
/// Errors are values, never panics: scripts are attacker-controlled and
/// independent validators must agree on the exact variant returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ScriptError {
    // Structural / parse
    #[error("script of {0} bytes exceeds the maximum program length")]
    ScriptTooLong(usize),
    #[error("push at offset {0} runs past the end of the script")]
    MalformedPush(usize),
    #[error("script is not push-only")]
    NotPushOnly,

    // Policy / legality
    #[error("attempt to execute disabled opcode {0}")]
    OpcodeDisabled(String),
    #[error("attempt to execute reserved opcode {0}")]
    ReservedOpcode(String),
    #[error("attempt to execute invalid opcode {0}")]
    InvalidOpcode(String),
    #[error("exceeded max operation limit")]
    TooManyOperations,
    #[error("element size {0} exceeds max allowed size")]
    ElementTooBig(usize),
    #[error("upgradable NOP {0} is discouraged")]
    DiscourageUpgradableNops(String),
    #[error("invalid hash type 0x{0:x}")]
    InvalidHashType(u8),
    #[error("signature is not canonically encoded")]
    InvalidSignatureEncoding,
    #[error("public key is not canonically encoded")]
    InvalidPubKeyEncoding,
    #[error("multisig dummy argument is not empty")]
    SigNullDummy,

    // Resource exhaustion
    #[error("combined stack size exceeds the maximum, or execution stack too deep")]
    StackOverflow,

    // Stack manipulation
    #[error("attempt to read from an empty or too shallow stack")]
    StackUnderflow,
    #[error("attempt to read from an empty or too shallow alt stack")]
    AltStackUnderflow,
    #[error("index {0} is out of range for the stack")]
    InvalidStackIndex(i64),
    #[error("numeric value encoded as {0} bytes exceeds the maximum length")]
    NumberTooBig(usize),
    #[error("invalid range for splice operation")]
    InvalidSpliceRange,
    #[error("invalid public key count {0} for multisig")]
    InvalidPubKeyCount(i64),
    #[error("invalid signature count {0} for multisig")]
    InvalidSignatureCount(i64),

    // Control flow
    #[error("unbalanced conditional")]
    UnbalancedConditional,
    #[error("OP_VERIFY failed")]
    VerifyFailed,
    #[error("OP_EQUALVERIFY failed")]
    EqualVerifyFailed,
    #[error("OP_NUMEQUALVERIFY failed")]
    NumEqualVerifyFailed,
    #[error("OP_CHECKSIGVERIFY failed")]
    CheckSigVerifyFailed,
    #[error("OP_CHECKMULTISIGVERIFY failed")]
    CheckMultiSigVerifyFailed,
    #[error("script returned early")]
    EarlyReturn,

    // Completion
    #[error("stack empty at end of execution")]
    EmptyStack,
    #[error("script ran, but verification failed")]
    ScriptFailed,
    #[error("error check when script unfinished")]
    ScriptUnfinished,

    // Caller misuse
    #[error("invalid input index {0}")]
    InvalidIndex(usize),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<Box<bincode::ErrorKind>> for ScriptError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ScriptError::Serialization(err.to_string())
    }
}
