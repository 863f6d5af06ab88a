pub mod authenticator_spec;
pub mod cipher_spec;
pub mod compressor_spec;
pub mod key_deriv_spec;
pub mod key_deriv_spec_ext;
pub mod rehash_spec;

pub mod prelude;
