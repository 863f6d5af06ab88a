// TODO units for the ones below

pub const REPORT_HEADER_NUM_FILES: &str = "Files synced";
pub const REPORT_HEADER_DATA_READ: &str = "Data read";
pub const REPORT_HEADER_DATA_WRITTEN: &str = "Data stored";
pub const REPORT_HEADER_THROUGHPUT: &str = "Throughput";
pub const REPORT_HEADER_DURATION: &str = "Duration";

pub const DEFAULT_BUFFER_SIZE: usize = 1 << 14; // buffer size in bytes
pub const DEFAULT_PERM_BITS: u32 = 0o600; // permission bits of files created by helixsync
pub const DEFAULT_SALT: [u8; 512] = [0u8; 512];
pub const DEFAULT_REHASH_OUTPUT_LEN: usize = 512;

pub const DEFAULT_ZSTD_LEVEL: u8 = 3; // same as the `zstd` executable
pub const DEFAULT_ZSTD_LEVEL_STR: &str = "3"; // same as the `zstd` executable

/// Number of bytes of random salt generated for a fresh `KeyDerivSpec`.
pub const DEFAULT_SALT_LEN: usize = 32;

/// Default number of seconds `init` tunes key derivation parameters to take.
pub const DEFAULT_TIME_TO_HASH: u16 = 3;

pub const DEFAULT_SCRYPT_LOG_N: u8 = 15;
pub const DEFAULT_SCRYPT_R: u32 = 8;
pub const DEFAULT_SCRYPT_P: u32 = 1;
pub const DEFAULT_SCRYPT_OUTPUT_LEN: usize = 64;

/// Name of the reserved header file at the root of the encrypted directory.
pub const ENCR_HEADER_FNAME: &str = ".helix.hx";

/// Name of the reserved subdirectory at the root of the decrypted directory.
pub const DECR_RESERVED_DIRNAME: &str = ".helix";

/// Name of the file under `DECR_RESERVED_DIRNAME` holding the pair's `DirectoryId`.
pub const DECR_ID_FNAME: &str = "id";

/// Name of the sync log file under `DECR_RESERVED_DIRNAME`.
pub const SYNC_LOG_FNAME: &str = "log";

/// Minimum millisecond gap the executor enforces between successive encrypted-side writes of
/// the same logical file, so filesystem mtime quantization never masks a real update.
pub const MIN_MTIME_ADVANCE_MS: u128 = 1000;

/// Extension appended to every file on the encrypted side.
pub const ENCR_FILE_SUFFIX: &str = "hx";

const_assert!(0 < DEFAULT_ZSTD_LEVEL && DEFAULT_ZSTD_LEVEL <= 23);
const_assert!(DEFAULT_BUFFER_SIZE == 16384);
const_assert!(DEFAULT_SALT_LEN >= 16);
const_assert!(DEFAULT_SCRYPT_OUTPUT_LEN >= 32);
