use crate::{formats::Format, AssetError};

/// File format defintion for a byte buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct Bin;

impl Format for Bin {
    type Output = Vec<u8>;

    fn parse(&self, bytes: &[u8]) -> Result<Self::Output, AssetError> {
        Ok(bytes.to_vec())
    }
}
