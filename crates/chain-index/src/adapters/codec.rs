//! Value codec.
//!
//! Every row is stored as its bincode encoding.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::CodecError;

/// Default row codec using bincode.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(value).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }

    pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(data).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_with::{serde_as, Bytes};
    use shared_types::{Hash, EMPTY_BLOOM};

    use crate::domain::entities::Receipt;

    #[test]
    fn test_receipt_roundtrip() {
        let receipt = Receipt {
            transaction_hash: [1; 32],
            block_header_hash: [2; 32],
            state_root: [3; 32],
            gas_used: 21_000,
            bloom: EMPTY_BLOOM,
        };
        let bytes = BincodeCodec::encode(&receipt).unwrap();
        assert_eq!(BincodeCodec::decode::<Receipt>(&bytes).unwrap(), receipt);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = BincodeCodec::decode::<Receipt>(&[0xFF, 0x01]).unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[serde_as]
    #[derive(Serialize)]
    struct LooseReceipt {
        transaction_hash: Hash,
        block_header_hash: Hash,
        state_root: Hash,
        gas_used: u64,
        #[serde_as(as = "Bytes")]
        bloom: Vec<u8>,
    }

    #[test]
    fn test_short_bloom_does_not_decode() {
        let loose = LooseReceipt {
            transaction_hash: [1; 32],
            block_header_hash: [2; 32],
            state_root: [3; 32],
            gas_used: 21_000,
            bloom: vec![0xFF; 8],
        };
        let bytes = BincodeCodec::encode(&loose).unwrap();
        assert!(BincodeCodec::decode::<Receipt>(&bytes).is_err());
    }
}
