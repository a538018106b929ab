// spend-script/src/constants.rs

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;

/// Maximum combined depth of the data and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of bytes pushable to the stack in one element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum number of frames on the execution stack.
pub const MAX_EXECUTION_STACK_DEPTH: usize = 10;

/// Maximum number of public keys accepted by OP_CHECKMULTISIG.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Default maximum byte length of a numeric stack operand.
pub const DEFAULT_SCRIPT_NUM_LEN: usize = 4;

/// Maximum byte length of an amount operand (OP_RESERVEOUTPUT).
pub const AMOUNT_SCRIPT_NUM_LEN: usize = 8;

/// Script versions that execute. Anything else succeeds unconditionally.
pub const KNOWN_SCRIPT_VERSIONS: std::ops::RangeInclusive<i64> = 0..=2;

pub use spend_types::MAX_PROGRAM_BYTE_LENGTH;
