use std::path::PathBuf;
use structopt::StructOpt;

/// `helixsync` keeps a plaintext directory and an individually-encrypted, name-obfuscated mirror
/// of it in sync.
///
/// See the help-page for each subcommand, for example `helixsync sync --help`.
#[derive(Clone, Debug, StructOpt)]
#[structopt(name = "helixsync")]
pub enum Opts {
    /// Initialize a fresh decrypted/encrypted directory pair.
    Init {
        /// The plaintext directory.
        #[structopt(parse(from_os_str))]
        decr_dir: PathBuf,

        /// The directory that will hold the individually-encrypted mirror.
        #[structopt(parse(from_os_str))]
        encr_dir: PathBuf,

        /// Key derivation algorithm to use; supported options are `scrypt`, `pbkdf2`.
        #[structopt(long, default_value = "scrypt")]
        key_deriv_alg: String,

        /// Number of seconds the key derivation process should take on this machine; ignored if
        /// `--key-deriv-by-params` is given.
        #[structopt(long, default_value = "3")]
        key_deriv_time: u16,

        /// Use explicit key-derivation parameters instead of approximating them from
        /// `--key-deriv-time`.
        #[structopt(long)]
        key_deriv_by_params: bool,

        /// Number of iterations for `pbkdf2`; ignored unless `--key-deriv-by-params` is given.
        #[structopt(long = "pbkdf2-num-iter")]
        pbkdf2_num_iter: Option<u32>,

        /// `log_2(n)` parameter for `scrypt`; ignored unless `--key-deriv-by-params` is given.
        #[structopt(long)]
        scrypt_log_n: Option<u8>,

        /// `r` parameter for `scrypt`; ignored unless `--key-deriv-by-params` is given.
        #[structopt(long)]
        scrypt_r: Option<u32>,

        /// `p` parameter for `scrypt`; ignored unless `--key-deriv-by-params` is given.
        #[structopt(long)]
        scrypt_p: Option<u32>,
    },

    /// Reconcile a previously initialized pair, applying whatever changes are found.
    Sync {
        /// The plaintext directory.
        #[structopt(parse(from_os_str))]
        decr_dir: PathBuf,

        /// The directory holding the individually-encrypted mirror.
        #[structopt(parse(from_os_str))]
        encr_dir: PathBuf,

        /// Classify and print changes without applying any of them.
        #[structopt(long)]
        dry_run: bool,

        /// Print each change as it's classified/applied.
        #[structopt(short, long)]
        verbose: bool,
    },

    /// Classify pending changes without applying them; shorthand for `sync --dry-run`.
    Status {
        /// The plaintext directory.
        #[structopt(parse(from_os_str))]
        decr_dir: PathBuf,

        /// The directory holding the individually-encrypted mirror.
        #[structopt(parse(from_os_str))]
        encr_dir: PathBuf,
    },
}
