use secstr::SecVec;
use serde::{
    de::{self, Deserializer, SeqAccess, Visitor},
    ser::{SerializeTupleStruct, Serializer},
    Deserialize, Serialize,
};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

/// The most commonly used concrete form.
pub type SecureBytes = SecureVec<u8>;

/// New-types
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DerivedKey(pub CryptoSecureBytes);
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InitialKey(pub CryptoSecureBytes);
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RehashedKey(pub CryptoSecureBytes);
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CryptoSecureBytes(pub SecureBytes);

impl CryptoSecureBytes {
    ///
    pub fn unsecure(&self) -> &[u8] {
        self.0.unsecure()
    }
}

///
/// # Comparison using `==`
///
/// `SecureVec` is a wrapper around `SecVec`, therefore comparing two instances of `SecureVec`
/// using `==` is a done in constant time, meaning TODO
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecureVec<T>(SecVec<T>)
where
    T: Copy + Eq + Hash;

///
impl<T> SecureVec<T>
where
    T: Copy + Eq + Hash,
{
    ///
    pub fn new(vec: Vec<T>) -> Self {
        Self(SecVec::new(vec))
    }

    ///
    pub fn unsecure(&self) -> &[T] {
        self.0.unsecure()
    }
}

///
impl<T> Hash for SecureVec<T>
where
    T: Copy + Eq + Hash,
{
    ///
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unsecure().hash(state);
    }
}

///
impl<T> FromIterator<T> for SecureVec<T>
where
    T: Copy + Eq + Hash,
{
    ///
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}

///
impl Serialize for SecureBytes {
    ///
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_tuple_struct("SecureVec", 1)?;
        s.serialize_field(&self.0.unsecure().to_vec())?;
        s.end()
    }
}

///
impl<'de> de::Deserialize<'de> for SecureBytes {
    ///
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SecureVecVisitor;

        impl<'de> Visitor<'de> for SecureVecVisitor {
            type Value = SecureBytes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("struct Duration")
            }

            fn visit_seq<V>(self, mut seq: V) -> Result<SecureBytes, V::Error>
            where
                V: SeqAccess<'de>,
            {
                let deserialized: Vec<u8> = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(0, &self))?;
                Ok(SecureVec(SecVec::new(deserialized.to_vec())))
            }
        }

        const FIELDS: &'static [&'static str] = &["0"];
        deserializer.deserialize_struct("SecureVec", FIELDS, SecureVecVisitor)
    }
}

///
impl<T> From<&[T]> for SecureVec<T>
where
    T: Copy + Eq + Hash,
{
    ///
    fn from(vec: &[T]) -> SecureVec<T> {
        vec.to_vec().into()
    }
}
///
impl<T> From<Vec<T>> for SecureVec<T>
where
    T: Copy + Eq + Hash,
{
    ///
    fn from(vec: Vec<T>) -> SecureVec<T> {
        SecureVec::new(vec)
    }
}
///
impl From<String> for SecureBytes {
    ///
    fn from(string: String) -> SecureBytes {
        string.as_bytes().into()
    }
}
///
impl From<&str> for SecureBytes {
    ///
    fn from(string: &str) -> SecureBytes {
        string.as_bytes().into()
    }
}
