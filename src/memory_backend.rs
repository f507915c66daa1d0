use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::store::Backend;

/// An in-memory reference backend, useful for tests and fixtures. Not part
/// of the core contract (§1 names it as an external collaborator); any
/// implementation of [`Backend`] is acceptable.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.lock().unwrap().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}
