//! Engine-level configuration set through UCI options.

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub syzygy_path: Option<String>,
}

pub const DEFAULT_HASH_MB: usize = 16;
pub const DEFAULT_THREADS: usize = 1;

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
            threads: DEFAULT_THREADS,
            syzygy_path: None,
        }
    }
}
