// spend-types/src/lib.rs
//! Transaction and block data consumed by the spend-script engine.
//!
//! These types are read-only context for script validation: the engine looks up
//! input witnesses and output amounts here, and signature-check opcodes hash
//! them through [`SigHasher`].

use serde::{Deserialize, Serialize};

pub mod sighash;

pub use sighash::{SigHashType, SigHasher};

pub type Hash = [u8; 32];
pub type AssetId = [u8; 32];

/// Maximum length in bytes of a control program or signature script.
pub const MAX_PROGRAM_BYTE_LENGTH: usize = 10_000;

/// Represents a reference to a specific transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction ID (hash) of the transaction containing the output.
    pub txid: Hash,
    /// The index of the output within that transaction.
    pub vout: u32,
}

/// Represents a transaction input, referencing a previous transaction's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// The `OutPoint` referencing the output being spent.
    pub previous_output: OutPoint,
    /// Asset of the output being spent.
    pub asset_id: AssetId,
    /// Amount of the output being spent.
    pub amount: u64,
    /// Arguments pushed onto the data stack before the control program runs.
    pub input_witness: Vec<Vec<u8>>,
}

/// Represents a transaction output, specifying an amount and a control program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub asset_id: AssetId,
    pub amount: u64,
    /// The program that must succeed for this output to be spent.
    pub control_program: Vec<u8>,
}

impl TxOutput {
    pub fn new(asset_id: AssetId, amount: u64, control_program: Vec<u8>) -> Self {
        TxOutput { asset_id, amount, control_program }
    }
}

/// The signed contents of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxData {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u64,
}

impl TxData {
    /// Returns the transaction ID, the BLAKE3 hash of the canonical encoding.
    pub fn hash(&self) -> Result<Hash, bincode::Error> {
        let mut hasher = blake3::Hasher::new();
        bincode::serialize_into(&mut hasher, self)?;
        Ok(*hasher.finalize().as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub height: u64,
    pub previous_block_hash: Hash,
    pub timestamp_ms: u64,
    pub transactions_merkle_root: Hash,
    /// Program the next block's signature script must satisfy.
    pub consensus_program: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Push-only script whose pushed data are the arguments to the previous
    /// block's consensus program.
    pub signature_script: Vec<u8>,
    pub transactions: Vec<TxData>,
}

impl Block {
    /// Returns the digest signed by block signers.
    ///
    /// Only the header is committed to, since the signature script carries
    /// the signatures themselves.
    pub fn hash_for_sig(&self) -> Result<Hash, bincode::Error> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"spend-block-sig");
        bincode::serialize_into(&mut hasher, &self.header)?;
        Ok(*hasher.finalize().as_bytes())
    }
}
