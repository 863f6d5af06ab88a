pub use HelixErr::*;

use std::{
    fmt::{self, Display, Formatter},
    io,
    path::PathBuf,
};

///
pub type HelixResult<T> = Result<T, HelixErr>;

/// Enum used to classify every error `helixsync` can raise.
///
/// Each variant results in a unique exit code, which can be used for testing.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum HelixErr {
    AuthenticationFail,                  // HMAC verification failed while decrypting a blob
    CaseOnlyConflict(PathBuf),            // decrypted path exists already, differing only in case
    CyclicDependency,                     // dependency sorter could not drain its ready set
    DestinationExists(PathBuf),           // move_file target already present
    DirectoryIdMismatch,                  // decrypted and encrypted headers disagree on DirectoryId
    DirectoryNotEmpty(PathBuf),           // non-recursive delete_directory on a non-empty dir
    HashSpecConflict,                     // key-derivation params given both by time and explicitly
    HeaderDecryptFailed(String),          // could not recover an EncrHeader from a ciphertext blob
    NameRoundTripMismatch(PathBuf),       // header's re-encoded name doesn't match the ciphertext filename
    NotInitialized(PathBuf),              // directory is missing the reserved header/marker
    Other(String),                        // anything else
    PasswordConfirmationFail,             // the two passphrase prompts didn't match
    PathOutsideRoot(PathBuf),             // path supplied to the overlay escapes its root
    SerdeFailed,                          // (de)serialization of a log entry/header failed
    UnclassifiedEntry(PathBuf),           // sync_mode/display_operation resolved to Unknown/Error
}

///
impl HelixErr {
    /// Assign a unique exit code to each variant, mostly for testing purposes.
    ///
    /// DO NOT RELY ON THE EXACT NUMBERS, AS THEY MAY CHANGE IN THE FUTURE
    pub fn exit_code(&self) -> i32 {
        match self {
            AuthenticationFail => 32,
            CaseOnlyConflict(_) => 33,
            CyclicDependency => 34,
            DestinationExists(_) => 35,
            DirectoryIdMismatch => 36,
            DirectoryNotEmpty(_) => 37,
            HashSpecConflict => 38,
            HeaderDecryptFailed(_) => 39,
            NameRoundTripMismatch(_) => 40,
            NotInitialized(_) => 41,
            Other(_) => 42,
            PasswordConfirmationFail => 43,
            PathOutsideRoot(_) => 44,
            SerdeFailed => 45,
            UnclassifiedEntry(_) => 46,
        }
    }
}

///
impl Display for HelixErr {
    ///
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        macro_rules! w {
            ( $( $arg:expr ),+ ) => {
                write!(f, $( $arg ),+)
            };
        }
        match self {
            AuthenticationFail => w!("Authentication failed; the derived key is likely wrong."),
            CaseOnlyConflict(pbuf) => w!("{:?} already exists under a different case.", pbuf),
            CyclicDependency => w!("Dependency sorter detected a cycle; this is a bug."),
            DestinationExists(pbuf) => w!("Cannot move onto {:?} because it already exists.", pbuf),
            DirectoryIdMismatch => w!("The decrypted and encrypted directories do not belong to the same pair."),
            DirectoryNotEmpty(pbuf) => w!("Cannot non-recursively delete {:?} because it is not empty.", pbuf),
            HashSpecConflict => w!("Cannot specify the strength of the key derivation with both params and time."),
            HeaderDecryptFailed(message) => w!("Could not decrypt header: {}", message),
            NameRoundTripMismatch(pbuf) => w!("Header's re-encoded name does not match ciphertext filename {:?}.", pbuf),
            NotInitialized(pbuf) => w!("{:?} is not an initialized helixsync directory.", pbuf),
            Other(desc) => w!("{}", desc),
            PasswordConfirmationFail => w!("Could not confirm passphrase."),
            PathOutsideRoot(pbuf) => w!("{:?} is outside of the directory root.", pbuf),
            SerdeFailed => w!("(De)serialization failed."),
            UnclassifiedEntry(pbuf) => w!("Could not classify {:?}; encrypted side is missing but the log is not a tombstone.", pbuf),
        }
    }
}

///
macro_rules! helix_err {
    ( $variant:ident ) => {
        Err(HelixErr::$variant)
    };
    ( $variant:ident, $( $field:expr ),* ) => {
        Err(HelixErr::$variant($( $field ),*))
    };
}

/// TODO wait till try impl becomes stable
macro_rules! helix_unwrap_opt {
    ( $result:expr ) => {
        match $result {
            Some(x) => x,
            None => Err(HelixErr::Other(format!("unwrapping a none")))?,
        }
    };
}

/// `impl std::error::Error -> HelixErr`
impl<E> From<E> for HelixErr
where
    E: std::error::Error,
{
    #[inline]
    fn from(err: E) -> Self {
        HelixErr::Other(format!("{}", err))
    }
}

/// `HelixErr -> std::io::Error`
impl From<HelixErr> for io::Error {
    ///
    #[inline]
    fn from(err: HelixErr) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("{}", err))
    }
}
