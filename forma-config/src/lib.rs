use std::{path::PathBuf, sync::Arc};

use envconfig::Envconfig;
use lazy_static::lazy_static;
use object_store::local::LocalFileSystem;

#[derive(Debug, Envconfig)]
pub struct Config {
    #[envconfig(from = "FORMA_LOG_LEVEL", default = "info")]
    pub log_level: String,
    /// Upper bound on the element count of a decoded primitive array.
    #[envconfig(from = "FORMA_MAX_ARRAY_LENGTH", default = "67108864")]
    pub max_array_length: usize,
    /// Upper bound on string byte lengths and list sizes inside structured records.
    #[envconfig(from = "FORMA_MAX_CONTAINER_LENGTH", default = "67108864")]
    pub max_container_length: usize,
    #[envconfig(from = "FORMA_MAX_NESTING_DEPTH", default = "64")]
    pub max_nesting_depth: usize,
    /// Wire protocol used for structured records: `verbose` or `compact`.
    #[envconfig(from = "FORMA_RECORD_PROTOCOL", default = "verbose")]
    pub record_protocol: String,
    /// Largest input file, in bytes, read whole during ingest.
    #[envconfig(from = "FORMA_MAX_WHOLE_FILE_SIZE", default = "268435456")]
    pub max_whole_file_size: usize,
}

impl Config {
    pub fn init() -> Config {
        Config::init_from_env().expect("Failed to load config")
    }
}

lazy_static! {
    pub static ref CONFIG: Config = Config::init();
    pub static ref DATA_DIR: PathBuf = PathBuf::from("./data/");
    pub static ref OBJECT_STORE_LOCAL_FS: Arc<LocalFileSystem> = {
        Arc::new(LocalFileSystem::new_with_prefix(DATA_DIR.clone())
            .expect("Failed to create local file system. Is the data dir set correctly?"))
    };

    /// The path to the pails directory
    pub static ref PAILS_DIR_PATH: PathBuf = DATA_DIR.join("pails/");
    /// The prefix for the pails directory for object store paths
    pub static ref PAILS_DIR_PREFIX: object_store::path::Path =
        object_store::path::Path::from("pails");

    /// The path to the ingest staging directory
    pub static ref INGEST_DIR_PATH: PathBuf = DATA_DIR.join("ingest");
    /// The prefix for the ingest staging directory for object store paths
    pub static ref INGEST_DIR_PREFIX: object_store::path::Path =
        object_store::path::Path::from("ingest");
}
