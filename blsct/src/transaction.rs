//! Transactions, their components, and their canonical encoding.
//!
//! Hashes are SHA-256 over the canonical encoding. A transaction's hash excludes its aggregate
//! signature, so signatures can be combined after the fact without changing what was signed.

use crate::{common::BLSCT_MARKER, keys::PublicKey, range_proof::RangeProof, Error};
use blsct_primitives::{
    codec::{Encode, EncodeSize, Error as CodecError, FixedSize, Read, ReadExt, Write},
    group::G1,
    hash, Digest, Signature,
};
use bytes::{Buf, BufMut};

/// Pushes true. Marks confidential outputs as spendable by their one-time key.
pub const OP_TRUE: u8 = 0x51;

/// Marks an output as unspendable (fees and data).
pub const OP_RETURN: u8 = 0x6a;

/// Pushes the next `len` bytes, with `len` in the following byte.
pub const OP_PUSHDATA1: u8 = 0x4c;

/// Pushes the next `len` bytes, with `len` in the following two bytes (little-endian).
pub const OP_PUSHDATA2: u8 = 0x4d;

/// Maximum encoded script length.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum number of inputs or outputs in one transaction.
pub const MAX_COMPONENTS: usize = 1 << 16;

/// Transaction version before the confidential marker is applied.
pub const TX_VERSION: u32 = 2;

/// Identifies an asset class (and, for non-fungible tokens, an item within it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId {
    pub token: Digest,
    pub subid: u64,
}

impl TokenId {
    pub fn new(token: Digest, subid: u64) -> Self {
        Self { token, subid }
    }
}

impl Default for TokenId {
    /// The native token.
    fn default() -> Self {
        Self {
            token: Digest::default(),
            subid: u64::MAX,
        }
    }
}

impl Write for TokenId {
    fn write(&self, buf: &mut impl BufMut) {
        self.token.write(buf);
        self.subid.write(buf);
    }
}

impl Read for TokenId {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let token = Digest::read(buf)?;
        let subid = u64::read(buf)?;
        Ok(Self { token, subid })
    }
}

impl FixedSize for TokenId {
    const SIZE: usize = Digest::SIZE + u64::SIZE;
}

/// An output locking script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Script of confidential outputs.
    pub fn op_true() -> Self {
        Self(vec![OP_TRUE])
    }

    /// Script of fee outputs.
    pub fn op_return() -> Self {
        Self(vec![OP_RETURN])
    }

    /// Appends a data push of `data`.
    pub fn push_data(&mut self, data: &[u8]) -> Result<(), Error> {
        match data.len() {
            len if len < OP_PUSHDATA1 as usize => self.0.push(len as u8),
            len if len <= u8::MAX as usize => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(len as u8);
            }
            len if len <= u16::MAX as usize => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
            }
            _ => return Err(Error::OutOfRange),
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Returns whether no input can ever spend an output with this script.
    pub fn is_unspendable(&self) -> bool {
        self.0.first() == Some(&OP_RETURN) || self.0.len() > MAX_SCRIPT_SIZE
    }

    /// Returns whether this is exactly the fee script.
    pub fn is_fee(&self) -> bool {
        self.0 == [OP_RETURN]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Write for Script {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.write(buf);
    }
}

impl EncodeSize for Script {
    fn encode_size(&self) -> usize {
        self.0.encode_size()
    }
}

impl Read for Script {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Vec::<u8>::read_cfg(buf, &(MAX_SCRIPT_SIZE, ())).map(Self)
    }
}

/// A reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    pub hash: Digest,
    pub n: u32,
}

impl OutPoint {
    pub fn new(hash: Digest, n: u32) -> Self {
        Self { hash, n }
    }

    /// The outpoint referenced by the input of a coinbase transaction.
    pub fn null() -> Self {
        Self {
            hash: Digest::default(),
            n: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

impl Write for OutPoint {
    fn write(&self, buf: &mut impl BufMut) {
        self.hash.write(buf);
        self.n.write(buf);
    }
}

impl Read for OutPoint {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let hash = Digest::read(buf)?;
        let n = u32::read(buf)?;
        Ok(Self { hash, n })
    }
}

impl FixedSize for OutPoint {
    const SIZE: usize = Digest::SIZE + u32::SIZE;
}

/// A spent output reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Script::default(),
            sequence: u32::MAX,
        }
    }

    /// The message signed by the owner of the spent output.
    pub fn hash(&self) -> Digest {
        hash(&self.encode())
    }
}

impl Write for TxIn {
    fn write(&self, buf: &mut impl BufMut) {
        self.prevout.write(buf);
        self.script_sig.write(buf);
        self.sequence.write(buf);
    }
}

impl EncodeSize for TxIn {
    fn encode_size(&self) -> usize {
        OutPoint::SIZE + self.script_sig.encode_size() + u32::SIZE
    }
}

impl Read for TxIn {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let prevout = OutPoint::read(buf)?;
        let script_sig = Script::read(buf)?;
        let sequence = u32::read(buf)?;
        Ok(Self {
            prevout,
            script_sig,
            sequence,
        })
    }
}

/// Confidential fields of an output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsctData {
    /// `r*G`, the key that signs the output hash.
    pub ephemeral_key: PublicKey,
    /// `r*D`, from which the recipient recomputes the shared nonce.
    pub blinding_key: PublicKey,
    /// One-time key that must sign any input spending this output.
    pub spending_key: PublicKey,
    pub view_tag: u16,
    pub range_proof: RangeProof,
}

impl BlsctData {
    /// Returns the value commitment, if the proof carries exactly one.
    pub fn commitment(&self) -> Option<G1> {
        match self.range_proof.commitments() {
            [v] => Some(*v),
            _ => None,
        }
    }
}

impl Write for BlsctData {
    fn write(&self, buf: &mut impl BufMut) {
        self.ephemeral_key.write(buf);
        self.blinding_key.write(buf);
        self.spending_key.write(buf);
        self.view_tag.write(buf);
        self.range_proof.write(buf);
    }
}

impl EncodeSize for BlsctData {
    fn encode_size(&self) -> usize {
        3 * PublicKey::SIZE + u16::SIZE + self.range_proof.encode_size()
    }
}

impl Read for BlsctData {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let ephemeral_key = PublicKey::read(buf)?;
        let blinding_key = PublicKey::read(buf)?;
        let spending_key = PublicKey::read(buf)?;
        let view_tag = u16::read(buf)?;
        let range_proof = RangeProof::read(buf)?;
        Ok(Self {
            ephemeral_key,
            blinding_key,
            spending_key,
            view_tag,
            range_proof,
        })
    }
}

/// A transaction output, either confidential (with [BlsctData] and a zero value) or plain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub blsct_data: Option<BlsctData>,
    pub script_pubkey: Script,
    pub value: u64,
    pub token_id: TokenId,
}

impl TxOut {
    /// A plain, unspendable output paying `value` as fee.
    pub fn fee(value: u64, token_id: TokenId) -> Self {
        Self {
            blsct_data: None,
            script_pubkey: Script::op_return(),
            value,
            token_id,
        }
    }

    pub fn is_blsct(&self) -> bool {
        self.blsct_data.is_some()
    }

    /// Returns whether this is a plain output paying a fee.
    pub fn is_fee(&self) -> bool {
        !self.is_blsct() && self.script_pubkey.is_fee()
    }

    /// The message signed by the output's ephemeral key.
    pub fn hash(&self) -> Digest {
        hash(&self.encode())
    }
}

impl Write for TxOut {
    fn write(&self, buf: &mut impl BufMut) {
        self.blsct_data.write(buf);
        self.script_pubkey.write(buf);
        self.value.write(buf);
        self.token_id.write(buf);
    }
}

impl EncodeSize for TxOut {
    fn encode_size(&self) -> usize {
        self.blsct_data.encode_size()
            + self.script_pubkey.encode_size()
            + u64::SIZE
            + TokenId::SIZE
    }
}

impl Read for TxOut {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let blsct_data = Option::<BlsctData>::read(buf)?;
        let script_pubkey = Script::read(buf)?;
        let value = u64::read(buf)?;
        let token_id = TokenId::read(buf)?;
        Ok(Self {
            blsct_data,
            script_pubkey,
            value,
            token_id,
        })
    }
}

/// A transaction with one aggregate signature covering every input, output, and the balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub signature: Signature,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            signature: Signature::zero(),
        }
    }
}

impl Transaction {
    /// Hash of everything but the signature.
    pub fn hash(&self) -> Digest {
        let mut buf = Vec::with_capacity(self.encode_size());
        self.write_unsigned(&mut buf);
        hash(&buf)
    }

    /// Returns whether the transaction mints new coins rather than spending existing ones.
    pub fn is_coinbase(&self) -> bool {
        match self.inputs.as_slice() {
            [] => true,
            [input] => input.prevout.is_null(),
            _ => false,
        }
    }

    /// Returns whether the version carries the confidential marker.
    pub fn is_blsct(&self) -> bool {
        self.version & BLSCT_MARKER != 0
    }

    fn write_unsigned(&self, buf: &mut impl BufMut) {
        self.version.write(buf);
        self.inputs.write(buf);
        self.outputs.write(buf);
    }
}

impl Write for Transaction {
    fn write(&self, buf: &mut impl BufMut) {
        self.write_unsigned(buf);
        self.signature.write(buf);
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        u32::SIZE + self.inputs.encode_size() + self.outputs.encode_size() + Signature::SIZE
    }
}

impl Read for Transaction {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let version = u32::read(buf)?;
        let inputs = Vec::<TxIn>::read_cfg(buf, &(MAX_COMPONENTS, ()))?;
        let outputs = Vec::<TxOut>::read_cfg(buf, &(MAX_COMPONENTS, ()))?;
        let signature = Signature::read(buf)?;
        Ok(Self {
            version,
            inputs,
            outputs,
            signature,
        })
    }
}
