use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};
use sha2::Sha256;

use super::{FunctionRegistry, arg_string};
use crate::error::{Error, ErrorCode};
use crate::value::Value;

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_fn("digest", 2, Some(3), |_, args| {
        let data = arg_string(args, 0);
        let algorithm = arg_string(args, 1);
        let encoding = if args.len() > 2 { arg_string(args, 2) } else { "base64".to_string() };
        digest(data.as_bytes(), &algorithm, &encoding).map(Value::String)
    });
}

pub(crate) fn digest(data: &[u8], algorithm: &str, encoding: &str) -> Result<String, Error> {
    let hash: Vec<u8> = match algorithm {
        "SHA-1" => Sha1::digest(data).to_vec(),
        "SHA-256" => Sha256::digest(data).to_vec(),
        other => {
            return Err(Error::from_code(
                ErrorCode::FOER0000,
                format!("unsupported digest algorithm {other:?}"),
            ));
        }
    };
    match encoding {
        "base64" => Ok(STANDARD.encode(hash)),
        "hex" => Ok(hex::encode(hash)),
        other => Err(Error::from_code(ErrorCode::FOER0000, format!("unsupported digest encoding {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::digest;

    #[test]
    fn sha1_hex_and_base64() {
        assert_eq!(digest(b"abc", "SHA-1", "hex").unwrap(), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(digest(b"abc", "SHA-1", "base64").unwrap(), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
    }

    #[test]
    fn unsupported_algorithm_fails() {
        assert!(digest(b"abc", "MD5", "hex").is_err());
        assert!(digest(b"abc", "SHA-1", "base32").is_err());
    }
}
