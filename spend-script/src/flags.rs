// spend-script/src/flags.rs

use bitflags::bitflags;

bitflags! {
    /// Policy flags fixed for the lifetime of an [`Engine`](crate::Engine).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScriptFlags: u32 {
        /// The extra item consumed by OP_CHECKMULTISIG must be empty.
        const STRICT_MULTISIG = 1 << 0;

        /// NOP1 through NOP10 are reserved for future soft-forks and fail
        /// when executed. Policy only, never applied to blocks.
        const DISCOURAGE_UPGRADABLE_NOPS = 1 << 1;

        /// Signatures must be exactly 64 bytes plus a hash-type byte.
        const VERIFY_DER_SIGNATURES = 1 << 2;

        /// Signatures must be canonical and non-malleable; verification uses
        /// strict ed25519 rules.
        const VERIFY_LOW_S = 1 << 3;

        /// Signature scripts must contain only pushed data.
        const VERIFY_SIG_PUSH_ONLY = 1 << 4;

        /// Hash types, signatures and public keys must be strictly encoded.
        const VERIFY_STRICT_ENCODING = 1 << 5;
    }
}

impl ScriptFlags {
    /// Flags applied to transactions relayed by standard nodes.
    pub const STANDARD: ScriptFlags = ScriptFlags::STRICT_MULTISIG
        .union(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS)
        .union(ScriptFlags::VERIFY_DER_SIGNATURES)
        .union(ScriptFlags::VERIFY_LOW_S)
        .union(ScriptFlags::VERIFY_SIG_PUSH_ONLY)
        .union(ScriptFlags::VERIFY_STRICT_ENCODING);
}
