// spend-script/src/lib.rs
//! `spend-script` is the virtual machine that decides whether a transaction
//! input may be spent or a block may be signed.
//!
//! A control program runs against arguments taken from the spending input's
//! witness (or the block's signature script). Execution is deterministic:
//! every validator must reach the same verdict and the same [`ScriptError`].
//!
//! # Modules
//!
//! - `script`: the [`Engine`], its opcode table, parser and stacks.
//! - `flags`: policy flags fixed when an engine is built.
//! - `constants`: resource ceilings.
//! - `error`: the typed failure returned by every engine operation.
//!
//! # Usage
//!
//! ```rust
//! use spend_script::{Engine, ScriptContext, ScriptFlags};
//!
//! fn main() -> Result<(), spend_script::ScriptError> {
//!     let mut vm = Engine::new(ScriptContext::Standalone, ScriptFlags::STANDARD)?;
//!     // 2 3 OP_ADD 5 OP_EQUAL
//!     vm.prepare(&[0x52, 0x53, 0x93, 0x55, 0x87], &[], 0)?;
//!     vm.execute()
//! }
//! ```

pub mod constants;
pub mod error;
pub mod flags;
pub mod script;

pub use error::ScriptError;
pub use flags::ScriptFlags;
pub use script::{Engine, ScriptBuilder, ScriptContext};
