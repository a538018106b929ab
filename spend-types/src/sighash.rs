// spend-types/src/sighash.rs
//! Signature hashing for transaction inputs.

use serde::{Deserialize, Serialize};

use crate::{Hash, TxData};

/// The trailing byte of a signature, selecting what the signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigHashType(pub u8);

impl SigHashType {
    /// Sign all the outputs.
    pub const ALL: SigHashType = SigHashType(0x01);
    /// Sign none of the outputs.
    pub const NONE: SigHashType = SigHashType(0x02);
    /// Sign only the output with the same index as the input.
    pub const SINGLE: SigHashType = SigHashType(0x03);
    /// Sign only the current input; other inputs may be added freely.
    pub const ANYONE_CAN_PAY: SigHashType = SigHashType(0x80);

    /// The hash type with the anyone-can-pay bit masked off.
    pub fn base(self) -> SigHashType {
        SigHashType(self.0 & !Self::ANYONE_CAN_PAY.0)
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONE_CAN_PAY.0 != 0
    }
}

impl From<u8> for SigHashType {
    fn from(byte: u8) -> Self {
        SigHashType(byte)
    }
}

/// Per-transaction signature hash context.
///
/// Built once per transaction so the input and output digests are computed a
/// single time no matter how many inputs or signatures are checked.
#[derive(Debug, Clone)]
pub struct SigHasher<'a> {
    tx: &'a TxData,
    inputs_hash: Hash,
    outputs_hash: Hash,
}

const SIGHASH_DOMAIN: &[u8] = b"spend-sighash";

impl<'a> SigHasher<'a> {
    pub fn new(tx: &'a TxData) -> Result<Self, bincode::Error> {
        // Witnesses hold the signatures, so they cannot be signed.
        let mut inputs = blake3::Hasher::new();
        for input in &tx.inputs {
            bincode::serialize_into(&mut inputs, &(&input.previous_output, &input.asset_id, input.amount))?;
        }
        let mut outputs = blake3::Hasher::new();
        bincode::serialize_into(&mut outputs, &tx.outputs)?;
        Ok(SigHasher {
            tx,
            inputs_hash: *inputs.finalize().as_bytes(),
            outputs_hash: *outputs.finalize().as_bytes(),
        })
    }

    /// Computes the digest a signature over input `input_index` with
    /// `hash_type` must cover.
    ///
    /// Unknown base types commit to no outputs, the same as `NONE`; rejecting
    /// them is a policy decision left to the caller.
    pub fn hash(&self, input_index: usize, hash_type: SigHashType) -> Result<Hash, bincode::Error> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(SIGHASH_DOMAIN);
        hasher.update(&self.tx.version.to_le_bytes());
        hasher.update(&self.tx.lock_time.to_le_bytes());

        if hash_type.anyone_can_pay() {
            hasher.update(&[0u8; 32]);
        } else {
            hasher.update(&self.inputs_hash);
        }

        hasher.update(&(input_index as u64).to_le_bytes());
        if let Some(input) = self.tx.inputs.get(input_index) {
            hasher.update(&input.previous_output.txid);
            hasher.update(&input.previous_output.vout.to_le_bytes());
            hasher.update(&input.asset_id);
            hasher.update(&input.amount.to_le_bytes());
        }

        match hash_type.base() {
            SigHashType::ALL => {
                hasher.update(&self.outputs_hash);
            }
            SigHashType::SINGLE => match self.tx.outputs.get(input_index) {
                Some(output) => {
                    let mut single = blake3::Hasher::new();
                    bincode::serialize_into(&mut single, output)?;
                    hasher.update(single.finalize().as_bytes());
                }
                None => {
                    hasher.update(&[0u8; 32]);
                }
            },
            _ => {
                hasher.update(&[0u8; 32]);
            }
        }

        hasher.update(&[hash_type.0]);
        Ok(*hasher.finalize().as_bytes())
    }
}
