#[macro_use]
extern crate static_assertions;

// dependency free
mod primitives;
mod secure_vec;

#[macro_use]
mod prelude;

#[macro_use]
mod fs_util;
#[macro_use]
mod hasher;
#[macro_use]
mod rand_util;

#[macro_use]
mod util;

mod specs;

#[macro_use]
mod encoder;
#[allow(dead_code)] // because most functions in this mod are only used in tests
mod test_util;

mod codec;
mod nameenc;
mod overlay;
mod presync;
mod sorter;
mod synclog;
mod executor;
mod repo;

mod clargs;

#[cfg(test)]
mod tests_e2e;

use crate::{
    clargs::Opts,
    executor::SyncResult,
    fs_util::*,
    prelude::*,
    presync::{DisplayEntryType, DisplayOperation, PreSync},
    repo::DirectoryPair,
    secure_vec::*,
    specs::prelude::*,
};
use std::{convert::TryFrom, fmt, path::Path, time::Duration};
use structopt::StructOpt;

macro_rules! color {
    ( $color:ident, $fmt_str:literal $( , $arg:expr )* ) => {
        ansi_term::Colour::$color.paint(format!($fmt_str $( , $arg )*))
    }
}

assert_cfg!(unix, "Only Unix systems are supported for now");

fn main() {
    let opts = Opts::from_args();

    match run(&opts) {
        Ok(report) => eprintln!("\n{}", report),
        Err(err) => {
            eprintln!("{}", color!(Red, "helixsync: ERROR {}", err));
            std::process::exit(err.exit_code());
        }
    }
}

/// Prompts for a passphrase on stderr and hashes it once with SHA-512, producing the
/// `InitialKey` that `DirectoryPair::init`/`open` derive their real key from. Confirms by
/// re-prompting when `confirm` is set, which `init` needs and `sync`/`status` don't.
fn get_password(confirm: bool) -> HelixResult<InitialKey> {
    let get = |disp| match rpassword::prompt_password_stderr(disp) {
        Ok(pw) => Ok(sha512!(&pw.into())),
        Err(err) => helix_err!(Other, format!("Problem reading the password: {}", err)),
    };
    let initial = get("Enter your password: ")?;

    if confirm {
        let confirmed = get("Confirm your password: ")?;
        if initial != confirmed {
            return helix_err!(PasswordConfirmationFail);
        }
    }

    Ok(InitialKey(initial))
}

fn key_deriv_spec_ext_from_init_opts(
    key_deriv_alg: &str,
    key_deriv_time: u16,
    key_deriv_by_params: bool,
    pbkdf2_num_iter: Option<u32>,
    scrypt_log_n: Option<u8>,
    scrypt_r: Option<u32>,
    scrypt_p: Option<u32>,
) -> HelixResult<KeyDerivSpecExt> {
    Ok(match key_deriv_alg {
        "pbkdf2" => KeyDerivSpecExt::Pbkdf2 {
            alg_opt: Some(Pbkdf2Algorithm::HmacSha512),
            num_iter_opt: match key_deriv_by_params {
                true => Some(pbkdf2_num_iter.unwrap_or(crate::hasher::PBKDF2_NUM_ITER_DEFAULT)),
                false => None,
            },
            time_opt: match key_deriv_by_params {
                true => None,
                false => Some(key_deriv_time),
            },
        },
        "scrypt" => KeyDerivSpecExt::Scrypt {
            log_n_opt: match key_deriv_by_params {
                true => Some(scrypt_log_n.unwrap_or(DEFAULT_SCRYPT_LOG_N)),
                false => None,
            },
            r_opt: match key_deriv_by_params {
                true => Some(scrypt_r.unwrap_or(DEFAULT_SCRYPT_R)),
                false => None,
            },
            p_opt: match key_deriv_by_params {
                true => Some(scrypt_p.unwrap_or(DEFAULT_SCRYPT_P)),
                false => None,
            },
            time_opt: match key_deriv_by_params {
                true => None,
                false => Some(key_deriv_time),
            },
            output_len_opt: None,
        },
        other => return helix_err!(Other, format!("unsupported key derivation algorithm {:?}", other)),
    })
}

/// Tally of a `sync`/`status` run: counts plus a coarse throughput report scaled to the
/// granularity the reconciliation engine actually tracks.
#[derive(Clone, Debug, Default)]
struct SyncReport {
    num_added: usize,
    num_changed: usize,
    num_removed: usize,
    num_purged: usize,
    num_errors: usize,
    bytes: u64,
    duration: Duration,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! pretty {
            ( $header:expr, $value:expr ) => {
                write!(f, "{:>32} {:>7}\n", format!("{}:", $header), $value)
            };
            ( $header:expr, $value:expr, $base_unit:literal ) => {{
                let (adj_value, unit) = crate::hasher::adjust_value($value, $base_unit);
                write!(f, "{:>32} {:>7} {}\n", format!("{}:", $header), adj_value, unit)
            }};
        }
        pretty!(REPORT_HEADER_NUM_FILES, self.num_added + self.num_changed, "files")?;
        pretty!("Removed", self.num_removed)?;
        pretty!("Purged", self.num_purged)?;
        pretty!(REPORT_HEADER_DATA_WRITTEN, self.bytes as f64, "B")?;
        pretty!("Errors", self.num_errors)?;
        pretty!(REPORT_HEADER_DURATION, format!("{:.3?}", self.duration))
    }
}

fn print_presync(presync: &PreSync) {
    let label = match presync.display_operation {
        DisplayOperation::Add => color!(Green, "+"),
        DisplayOperation::Change => color!(Yellow, "~"),
        DisplayOperation::Remove => color!(Red, "-"),
        DisplayOperation::Purge => color!(Red, "x"),
        DisplayOperation::Error => color!(Red, "!"),
        DisplayOperation::None => color!(White, " "),
    };
    let kind = match presync.display_entry_type {
        DisplayEntryType::File => "file",
        DisplayEntryType::Directory => "dir ",
        DisplayEntryType::Removed => "gone",
        DisplayEntryType::Purged => "gone",
    };
    eprintln!("{} {} {:?}", label, kind, presync.decr_file_name.as_deref().unwrap_or_else(|| Path::new("?")));
}

fn open_pair(decr_dir: &Path, encr_dir: &Path) -> HelixResult<DirectoryPair> {
    let init_key = get_password(false)?;
    DirectoryPair::open(decr_dir, encr_dir, init_key)
}

fn run(opts: &Opts) -> HelixResult<SyncReport> {
    match opts {
        Opts::Init {
            decr_dir,
            encr_dir,
            key_deriv_alg,
            key_deriv_time,
            key_deriv_by_params,
            pbkdf2_num_iter,
            scrypt_log_n,
            scrypt_r,
            scrypt_p,
        } => {
            let init_key = get_password(true)?;
            let key_deriv_spec_ext = key_deriv_spec_ext_from_init_opts(
                key_deriv_alg,
                *key_deriv_time,
                *key_deriv_by_params,
                *pbkdf2_num_iter,
                *scrypt_log_n,
                *scrypt_r,
                *scrypt_p,
            )?;
            let (_pair, duration) = time!(DirectoryPair::init(decr_dir, encr_dir, init_key, key_deriv_spec_ext)?);
            Ok(SyncReport {
                duration,
                ..Default::default()
            })
        }

        Opts::Status { decr_dir, encr_dir } => {
            let mut pair = open_pair(decr_dir, encr_dir)?;
            let (changes, duration) = time!(pair.find_changes()?);
            for presync in &changes {
                print_presync(presync);
            }
            Ok(tally(&changes, &[], duration))
        }

        Opts::Sync {
            decr_dir,
            encr_dir,
            dry_run,
            verbose,
        } => {
            let mut pair = open_pair(decr_dir, encr_dir)?;
            let (changes, find_duration) = time!(pair.find_changes()?);

            if *dry_run {
                for presync in &changes {
                    print_presync(presync);
                }
                return Ok(tally(&changes, &[], find_duration));
            }

            let mut results = Vec::with_capacity(changes.len());
            let (_, apply_duration) = time!({
                for presync in &changes {
                    if *verbose {
                        print_presync(presync);
                    }
                    results.push(pair.try_sync(presync));
                }
            });

            Ok(tally(&changes, &results, find_duration + apply_duration))
        }
    }
}

fn tally(changes: &[PreSync], results: &[SyncResult], duration: Duration) -> SyncReport {
    let mut report = SyncReport {
        duration,
        ..Default::default()
    };

    for (i, presync) in changes.iter().enumerate() {
        let failed = results.get(i).map(|r| matches!(r, SyncResult::Failure(_))).unwrap_or(false);
        if failed {
            report.num_errors += 1;
            continue;
        }
        match presync.display_operation {
            DisplayOperation::Add => {
                report.num_added += 1;
                report.bytes += presync.display_file_length;
            }
            DisplayOperation::Change => {
                report.num_changed += 1;
                report.bytes += presync.display_file_length;
            }
            DisplayOperation::Remove => report.num_removed += 1,
            DisplayOperation::Purge => report.num_purged += 1,
            DisplayOperation::Error | DisplayOperation::None => {}
        }
    }

    report
}
