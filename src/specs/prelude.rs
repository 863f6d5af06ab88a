pub use crate::specs::{
    authenticator_spec::*, cipher_spec::*, compressor_spec::*, key_deriv_spec::*, key_deriv_spec_ext::*, rehash_spec::*,
};
