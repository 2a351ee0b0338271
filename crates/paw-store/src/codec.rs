//! # Typed Store Access
//!
//! Bincode codec helpers shared by every module engine. All persisted
//! entities go through these two functions, so encoding is uniform and a
//! decode failure always surfaces as a corrupt-value error naming the key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::Module;

use crate::domain::multistore::MultiStore;
use crate::domain::StoreError;

/// Read and decode an entity.
pub fn get_typed<T: DeserializeOwned>(
    store: &MultiStore,
    module: Module,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    match store.get(module, key)? {
        None => Ok(None),
        Some(bytes) => bincode::deserialize(&bytes)
            .map(Some)
            .map_err(|e| StoreError::CorruptValue {
                key: key.to_vec(),
                reason: e.to_string(),
            }),
    }
}

/// Encode and write an entity.
pub fn put_typed<T: Serialize>(
    store: &mut MultiStore,
    module: Module,
    key: Vec<u8>,
    value: &T,
) -> Result<(), StoreError> {
    let bytes =
        bincode::serialize(value).map_err(|e| StoreError::Backend(format!("encode: {e}")))?;
    store.set(module, key, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u64,
        label: String,
    }

    #[test]
    fn test_typed_round_trip() {
        let mut s = MultiStore::in_memory();
        let key = vec![Module::Dex.namespace(), 0x01, 7];
        let v = Sample {
            id: 7,
            label: "pool".into(),
        };
        put_typed(&mut s, Module::Dex, key.clone(), &v).unwrap();
        let got: Option<Sample> = get_typed(&s, Module::Dex, &key).unwrap();
        assert_eq!(got, Some(v));
    }

    #[test]
    fn test_corrupt_value_reports_key() {
        let mut s = MultiStore::in_memory();
        let key = vec![Module::Dex.namespace(), 0x02];
        s.set(Module::Dex, key.clone(), vec![0xFF]).unwrap();
        let got: Result<Option<Sample>, _> = get_typed(&s, Module::Dex, &key);
        assert!(matches!(got, Err(StoreError::CorruptValue { .. })));
    }
}
