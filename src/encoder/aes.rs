use crate::{encoder::crypt_encoder::*, util::*};
use openssl::symm::{Cipher, Crypter, Mode};
use std::io::{self, BufReader, Error, ErrorKind, Read};

const INITIALIZATION_VECTOR: [u8; 16] = [0; 16];

/// create `EncryptorAES` and `DecryptorAES`
/// using macro because they differ only by the struct name and the openssl::symm::Mode that is used
macro_rules! aes {
    // `$struct_name` => EncryptorAES | DecryptorAES | ..
    // `$crypter_mode` => MODE::Encrypt | MODE::Decrypt
    ( $struct_name:ident, $crypter_mode:expr ) => {
        pub struct $struct_name<R>
        where
            R: Read,
        {
            block_size: usize, // used by `openssl::symm::Crypter`
            encoder: Crypter,  // what does the actual work
            source: BufReader<R>,
        }

        impl<R> $struct_name<R>
        where
            R: Read,
        {
            /// `wrap` just calls this method
            ///
            /// # Parameters
            ///
            /// - `source`: some struct that impls `std::io::Read` that this struct wraps around
            pub fn new(source: R, hash_seed_opt: (&[u8], Option<&[u8]>)) -> io::Result<Self> {
                let (key_hash, seed_opt) = hash_seed_opt;
                assert!(32 <= key_hash.len());
                let seed = seed_opt.unwrap_or(&INITIALIZATION_VECTOR);
                assert!(16 <= seed.len());
                let cipher = Cipher::aes_256_cfb128();

                Ok(Self {
                    block_size: cipher.block_size(), // see `fn read` in `impl Read` for why this is needed
                    source: BufReader::with_capacity(BUFFER_SIZE, source),
                    encoder: Crypter::new(
                        cipher,
                        $crypter_mode, // one of openssl::symm::Mode
                        &key_hash[..32],
                        Some(&seed[..16]),
                    )
                    .map_err(|err| err!("{}", err))?,
                })
            }
        }

        impl<R> Read for $struct_name<R>
        where
            R: Read,
        {
            fn read(&mut self, target: &mut [u8]) -> io::Result<usize> {
                // panics if `output.len() < input.len() + block_size`
                // meaning the following must hold:
                //   output.len()              >= input.len() + block_size
                //   output.len() - block_size >= input.len()
                //
                // NOTE when target.len() - self.block_size == 0, input size is set to 1
                // still don't understand the implications of target.len() being 1
                debug_assert!(0 < target.len());
                let input_size = std::cmp::max(1, target.len() - self.block_size);
                if input_size == 1 {
                    assert_eq!(1, self.block_size);
                }

                // assume that 4096 bytes always produce > 0 number of ciphertext bytes
                assert!(input_size > 0);
                let mut buffer = [0u8; BUFFER_SIZE];
                match self.source.read(&mut buffer) {
                    Ok(bytes_read) => match self.encoder.update(&buffer[..bytes_read], target).map_err(io_err)? {
                        // if 0, assume that we are done so finalize the encoder
                        0 => self.encoder.finalize(&mut target[..]).map_err(io_err),
                        bytes_read => Ok(bytes_read),
                    },
                    Err(err) => panic!("{:?}", err),
                }
            }
        }

        impl<R> CryptEncoder<R> for $struct_name<R> where R: Read {}
    };
}

aes!(EncryptorAES, Mode::Encrypt);

aes!(DecryptorAES, Mode::Decrypt);
