//! Domain-separated typed-data hashing and secp256k1 signer recovery.
//!
//! Digests follow the EIP-712 layout so that signatures produced by any
//! compatible wallet library (`signTypedData`) verify here unchanged:
//!
//! ```text
//! digest = keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)
//! structHash = keccak256(typeHash ‖ word(field_0) ‖ … ‖ word(field_n))
//! ```
//!
//! Only flat structs of `address` and `uintN` fields are supported, which is
//! all the ledger's action schemas use.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::error::{CodecError, ForestError};

pub const SIGNATURE_LEN: usize = 65;

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub fn keccak256(bytes: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(bytes.as_ref()).into()
}

/// Big-endian, left-padded ABI word for any unsigned integer up to 128 bits.
pub fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolType {
    Address,
    Uint(u16),
}

impl fmt::Display for SolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolType::Address => f.write_str("address"),
            SolType::Uint(bits) => write!(f, "uint{bits}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: SolType,
}

impl Field {
    pub const fn new(name: &'static str, ty: SolType) -> Self {
        Self { name, ty }
    }
}

/// A struct that can be signed as typed data. The schema is part of the
/// digest, so two payloads with the same values but different field names,
/// types or order never share a signature.
pub trait TypedPayload {
    const PRIMARY_TYPE: &'static str;
    const FIELDS: &'static [Field];

    /// One 32-byte word per entry of `FIELDS`, in order.
    fn encode_data(&self) -> Vec<[u8; 32]>;

    fn type_string() -> String {
        let fields = Self::FIELDS
            .iter()
            .map(|field| format!("{} {}", field.ty, field.name))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", Self::PRIMARY_TYPE, fields)
    }

    fn type_hash() -> [u8; 32] {
        keccak256(Self::type_string())
    }

    fn struct_hash(&self) -> [u8; 32] {
        let words = self.encode_data();
        debug_assert_eq!(words.len(), Self::FIELDS.len());
        let mut hasher = Keccak256::new();
        hasher.update(Self::type_hash());
        for word in &words {
            hasher.update(word);
        }
        hasher.finalize().into()
    }
}

/// Binds signatures to one deployed instance on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn separator(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(keccak256(DOMAIN_TYPE));
        hasher.update(keccak256(self.name.as_bytes()));
        hasher.update(keccak256(self.version.as_bytes()));
        hasher.update(uint_word(u128::from(self.chain_id)));
        hasher.update(self.verifying_contract.to_word());
        hasher.finalize().into()
    }

    pub fn digest<P: TypedPayload>(&self, payload: &P) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(b"\x19\x01");
        hasher.update(self.separator());
        hasher.update(payload.struct_hash());
        hasher.finalize().into()
    }
}

/// Raw `r ‖ s ‖ v` bytes as submitted by a caller. Length is not checked
/// here; a malformed blob is a verification failure, not a decode failure.
#[derive(Clone, PartialEq, Eq)]
pub struct RawSignature(pub Vec<u8>);

impl RawSignature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_LEN]> for RawSignature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSignature({self})")
    }
}

impl Serialize for RawSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RawSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let body = raw
            .strip_prefix("0x")
            .ok_or_else(|| de::Error::custom(CodecError::MissingPrefix(raw.clone())))?;
        hex::decode(body).map(Self).map_err(de::Error::custom)
    }
}

/// Parse a 32-byte secp256k1 secret, with or without `0x`.
pub fn signing_key_from_hex(raw: &str) -> Result<SigningKey, CodecError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(body)?;
    if bytes.len() != 32 {
        return Err(CodecError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    SigningKey::from_slice(&bytes).map_err(|_| CodecError::InvalidKey)
}

pub fn key_address(key: &SigningKey) -> Address {
    Address::from_verifying_key(key.verifying_key())
}

/// Sign `payload` under `domain`. Always produces a low-`s` signature with
/// `v ∈ {27, 28}`.
pub fn sign<P: TypedPayload>(
    domain: &Domain,
    payload: &P,
    key: &SigningKey,
) -> Result<[u8; SIGNATURE_LEN], CodecError> {
    let digest = domain.digest(payload);
    let (mut signature, mut recovery_id) = key.sign_prehash_recoverable(&digest)?;
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }
    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte() + 27;
    Ok(out)
}

/// Recover the address that produced `signature` over `payload`.
pub fn recover<P: TypedPayload>(
    domain: &Domain,
    payload: &P,
    signature: &[u8],
) -> Result<Address, ForestError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(ForestError::InvalidSignature);
    }
    let parsed =
        Signature::from_slice(&signature[..64]).map_err(|_| ForestError::InvalidSignature)?;
    // high-s signatures are malleable duplicates of a low-s one
    if parsed.normalize_s().is_some() {
        return Err(ForestError::InvalidSignature);
    }
    let v = match signature[64] {
        v @ (27 | 28) => v - 27,
        v @ (0 | 1) => v,
        _ => return Err(ForestError::InvalidSignature),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(ForestError::InvalidSignature)?;
    let digest = domain.digest(payload);
    let key = VerifyingKey::recover_from_prehash(&digest, &parsed, recovery_id)
        .map_err(|_| ForestError::InvalidSignature)?;
    Ok(Address::from_verifying_key(&key))
}

/// Recover and require the result to be `expected`.
pub fn verify<P: TypedPayload>(
    domain: &Domain,
    payload: &P,
    signature: &[u8],
    expected: Address,
) -> Result<Address, ForestError> {
    let recovered = recover(domain, payload, signature)?;
    if recovered != expected {
        return Err(ForestError::InvalidSignature);
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    struct Ping {
        from: Address,
        nonce: u64,
    }

    impl TypedPayload for Ping {
        const PRIMARY_TYPE: &'static str = "Ping";
        const FIELDS: &'static [Field] = &[
            Field::new("from", SolType::Address),
            Field::new("nonce", SolType::Uint(64)),
        ];

        fn encode_data(&self) -> Vec<[u8; 32]> {
            vec![self.from.to_word(), uint_word(u128::from(self.nonce))]
        }
    }

    struct PingRenamed {
        from: Address,
        nonce: u64,
    }

    impl TypedPayload for PingRenamed {
        const PRIMARY_TYPE: &'static str = "Ping";
        const FIELDS: &'static [Field] = &[
            Field::new("sender", SolType::Address),
            Field::new("nonce", SolType::Uint(64)),
        ];

        fn encode_data(&self) -> Vec<[u8; 32]> {
            vec![self.from.to_word(), uint_word(u128::from(self.nonce))]
        }
    }

    fn domain() -> Domain {
        Domain {
            name: "www.mintchain.io".to_string(),
            version: "1".to_string(),
            chain_id: 31337,
            verifying_contract: Address([0x11; 20]),
        }
    }

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn ether_mail_domain_separator() {
        let domain = Domain {
            name: "Ether Mail".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            verifying_contract: "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC".parse().unwrap(),
        };
        assert_eq!(
            hex::encode(domain.separator()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
    }

    #[test]
    fn type_string_lists_fields_in_order() {
        assert_eq!(Ping::type_string(), "Ping(address from,uint64 nonce)");
    }

    #[test]
    fn known_key_maps_to_known_address() {
        let key = signing_key_from_hex(HARDHAT_KEY).unwrap();
        assert_eq!(
            key_address(&key).to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn sign_then_recover() {
        let key = signing_key_from_hex(HARDHAT_KEY).unwrap();
        let payload = Ping { from: Address([7; 20]), nonce: 3 };
        let signature = sign(&domain(), &payload, &key).unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);
        let recovered = verify(&domain(), &payload, &signature, key_address(&key)).unwrap();
        assert_eq!(recovered, key_address(&key));

        let mut zero_based = signature;
        zero_based[64] -= 27;
        assert_eq!(recover(&domain(), &payload, &zero_based).unwrap(), key_address(&key));
    }

    #[test]
    fn renamed_schema_does_not_verify() {
        let key = signing_key_from_hex(HARDHAT_KEY).unwrap();
        let renamed = PingRenamed { from: Address([7; 20]), nonce: 3 };
        let signature = sign(&domain(), &renamed, &key).unwrap();
        let payload = Ping { from: Address([7; 20]), nonce: 3 };
        assert_eq!(
            verify(&domain(), &payload, &signature, key_address(&key)),
            Err(ForestError::InvalidSignature)
        );
    }

    #[test]
    fn other_domain_does_not_verify() {
        let key = signing_key_from_hex(HARDHAT_KEY).unwrap();
        let payload = Ping { from: Address([7; 20]), nonce: 3 };
        let signature = sign(&domain(), &payload, &key).unwrap();
        let mut other_chain = domain();
        other_chain.chain_id = 185;
        assert_eq!(
            verify(&other_chain, &payload, &signature, key_address(&key)),
            Err(ForestError::InvalidSignature)
        );
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let key = signing_key_from_hex(HARDHAT_KEY).unwrap();
        let payload = Ping { from: Address([7; 20]), nonce: 3 };
        let signature = sign(&domain(), &payload, &key).unwrap();

        assert_eq!(
            recover(&domain(), &payload, &signature[..64]),
            Err(ForestError::InvalidSignature)
        );
        let mut bad_v = signature;
        bad_v[64] = 29;
        assert_eq!(recover(&domain(), &payload, &bad_v), Err(ForestError::InvalidSignature));
        assert_eq!(
            recover(&domain(), &payload, &[0u8; SIGNATURE_LEN]),
            Err(ForestError::InvalidSignature)
        );
    }

    #[test]
    fn high_s_is_rejected() {
        let key = signing_key_from_hex(HARDHAT_KEY).unwrap();
        let payload = Ping { from: Address([7; 20]), nonce: 3 };
        let signature = sign(&domain(), &payload, &key).unwrap();
        let low = Signature::from_slice(&signature[..64]).unwrap();
        let high = Signature::from_scalars(low.r(), -low.s()).unwrap();
        let mut malleated = signature;
        malleated[..64].copy_from_slice(&high.to_bytes());
        malleated[64] = if signature[64] == 27 { 28 } else { 27 };
        assert_eq!(
            recover(&domain(), &payload, &malleated),
            Err(ForestError::InvalidSignature)
        );
    }

    #[test]
    fn raw_signature_json_is_prefixed_hex() {
        let raw = RawSignature(vec![0xde, 0xad]);
        let json = serde_json::to_string(&raw).unwrap();
        assert_eq!(json, "\"0xdead\"");
        let back: RawSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, raw);
        assert!(serde_json::from_str::<RawSignature>("\"dead\"").is_err());
    }
}
