use crate::util::*;
use std::{
    io::{self, Read, Write},
    str::from_utf8,
};

/// This trait helps make the encoding logic more functional.
///
/// Since `CryptEncoder` itself implements the `Read` trait, any struct that
/// impls the `Read` trait can be wrapped by in an arbitrarily many layers
/// of `CryptEncoder`s. The goal is to string together encoders much like
/// function compopsition.
///
/// For example encrypting the compressed content of a file may look something like
/// `EncryptorAES::wrap(Compressor::wrap(some_file))`.
pub trait CryptEncoder<R>: Read
where
    R: Read,
{
    /// unwrap one layer, handing back the reader this encoder was built from. `None` for encoders
    /// that don't own a single inner `R` (e.g. ones built over a composed `Read` expression).
    fn get_inner(self) -> Option<R>
    where
        Self: Sized,
    {
        None
    }

    /// like `get_inner`, but without consuming `self`.
    fn get_inner_ref(&self) -> Option<&R> {
        None
    }

    /// read all content to `target`
    fn read_all_to<W>(&mut self, target: &mut W) -> io::Result<usize>
    where
        W: Write,
    {
        // temp buffer to hold data
        let mut buffer = [0u8; BUFFER_SIZE];
        let mut count = 0;

        Ok(loop {
            // keep reading self to buffer until self is empty
            match self.read(&mut buffer[..])? {
                0 => {
                    // means we are done reading
                    target.flush()?;
                    break count;
                }
                bytes_read => {
                    let data = &buffer[0..bytes_read];
                    target.write_all(data)?;
                    count += bytes_read
                }
            }
        })
    }

    /// return the content as a vector
    fn as_vec(&mut self) -> io::Result<Vec<u8>> {
        let mut result = Vec::new();
        self.read_all_to(&mut result)?;
        Ok(result)
    }

    /// return the content as a string
    fn as_string(&mut self) -> io::Result<String> {
        let as_vec = self.as_vec()?;
        from_utf8(&as_vec).map(String::from).map_err(io_err)
    }
}

/// Compose multiple CryptEncoders, just like function composing.
///
/// # Parameters
///
/// 1. `root`: initial data to be encoded, which implements `std::io::Read`
/// 1. `crypt_encoder`: name of the struct to use, which implements `crate::encoder::crypt_encoder`
/// 1.
///
/// # Examples
///
/// ```
/// #[macro_use]
/// extern crate cryptor;
///
/// let data: Vec<u8> = (0..64).collect();                  // data to encode
/// let key_hash: &[u8] = hash("some password".as_bytes()); // hash of the passphrase
/// let init_vec: &[u8] = &[0; 16]                          // initialization vector for the encryption
///
/// // nested encoder which encrypts data, then encodes it using base64
/// let ciphertext = compose_encoders!(
///     data,
///     EncryptorAES => (&key_hash, Some(&init_vec)),
///     TextEncoder => &data_encoding::BASE64
/// )
/// .unwrap()
/// .as_string()
/// .unwrap();
/// ```
macro_rules! compose_encoders {
    ( $root:expr, $( $crypt_encoder:ident => $meta:expr ),* ) => {{
        let cryptor = Ok($root);
        $(
            let cryptor = match cryptor {
                Ok(c) => $crypt_encoder::new(c, $meta),
                Err(err) => Err(err),
            };
        )*
        cryptor
    }};
}
