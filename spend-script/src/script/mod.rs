// spend-script/src/script/mod.rs

pub mod builder;
pub mod frame;
pub mod opcode;
pub mod script_engine;
pub mod script_num;
pub mod stack;

pub use builder::ScriptBuilder;
pub use opcode::{disasm_script, is_push_only, parse_script, pushed_data, Opcode, ParsedOpcode};
pub use script_engine::{Engine, ScriptContext};
