use crate::{formats::Format, AssetError};

/// File format defintion for a UTF-8 text file
#[derive(Debug, Clone, Copy, Default)]
pub struct Txt;

impl Format for Txt {
    type Output = String;

    fn parse(&self, bytes: &[u8]) -> Result<String, AssetError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| AssetError::Format {
            format: "Txt",
            reason: e.to_string(),
        })
    }
}
