use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine};

use super::GltfLoaderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    Unsupported(String),
    BadDataUri,
    BadPercentEncoding(String),
}

impl Display for SchemeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SchemeError::Unsupported(scheme) => write!(f, "Unsupported scheme: {}", scheme),
            SchemeError::BadDataUri => write!(f, "Bad data URI"),
            SchemeError::BadPercentEncoding(path) => {
                write!(f, "Bad percent encoding in path: {}", path)
            }
        }
    }
}

impl Error for SchemeError {}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Scheme<'a> {
    // Data uri with optional mime type
    Data(Option<&'a str>, Vec<u8>),
    // Relative path
    Relative(&'a str),
    // Absolute path
    Absolute(&'a str),
}

fn strip_prefix_ignore_case<'a>(uri: &'a str, prefix: &str) -> Option<&'a str> {
    let head = uri.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&uri[prefix.len()..])
    } else {
        None
    }
}

impl<'a> TryFrom<&'a str> for Scheme<'a> {
    type Error = SchemeError;

    fn try_from(uri: &'a str) -> Result<Self, Self::Error> {
        if let Some(content) = strip_prefix_ignore_case(uri, "data:") {
            // Data URI: rfc2397
            let Some((param, value)) = content.split_once(',') else {
                return Err(SchemeError::BadDataUri);
            };
            if let Some((mime, encoding)) = param.split_once(';') {
                if !encoding.eq_ignore_ascii_case("base64") {
                    return Err(SchemeError::BadDataUri);
                }
                let data = STANDARD
                    .decode(value)
                    .map_err(|_| SchemeError::BadDataUri)?;
                let mime = (!mime.is_empty()).then_some(mime);
                Ok(Scheme::Data(mime, data))
            } else {
                // Plain data URI, percent-encoding is not decoded
                Ok(Scheme::Data(None, Vec::from(value.as_bytes())))
            }
        } else if let Some(path) = strip_prefix_ignore_case(uri, "file://") {
            Ok(Scheme::Absolute(path))
        } else if let Some(path) = strip_prefix_ignore_case(uri, "file:") {
            Ok(Scheme::Absolute(path))
        } else if let Some((scheme, _)) = uri.split_once(':') {
            Err(SchemeError::Unsupported(scheme.to_string()))
        } else {
            Ok(Scheme::Relative(uri))
        }
    }
}

fn decode_path(path: &str) -> Result<Cow<'_, str>, SchemeError> {
    urlencoding::decode(path).map_err(|_| SchemeError::BadPercentEncoding(path.to_string()))
}

impl Scheme<'_> {
    /// Read the referenced bytes. Relative paths are joined onto `base`, and
    /// fail with [`GltfLoaderError::ExternalReference`] when there is no base.
    pub(crate) fn load(self, uri: &str, base: Option<&Path>) -> Result<Vec<u8>, GltfLoaderError> {
        let path: PathBuf = match self {
            Scheme::Data(_, data) => return Ok(data),
            Scheme::Relative(path) => match base {
                Some(base) => base.join(&*decode_path(path)?),
                None => return Err(GltfLoaderError::ExternalReference(uri.to_string())),
            },
            Scheme::Absolute(path) => PathBuf::from(&*decode_path(path)?),
        };
        fs::read(&path).map_err(|error| GltfLoaderError::Io(path, error))
    }
}

#[cfg(test)]
mod test {
    use std::{fs, process};

    use super::{Scheme, SchemeError};

    #[test]
    fn test_base64_data_uri() {
        let scheme = Scheme::try_from("data:application/octet-stream;base64,AAEC").unwrap();
        assert_eq!(
            scheme,
            Scheme::Data(Some("application/octet-stream"), vec![0, 1, 2])
        );
    }

    #[test]
    fn test_plain_data_uri() {
        let scheme = Scheme::try_from("data:,abc").unwrap();
        assert_eq!(scheme, Scheme::Data(None, b"abc".to_vec()));
    }

    #[test]
    fn test_bad_data_uri() {
        assert_eq!(
            Scheme::try_from("data:application/octet-stream;base64"),
            Err(SchemeError::BadDataUri)
        );
        assert_eq!(
            Scheme::try_from("data:text/plain;charset=utf-8,abc"),
            Err(SchemeError::BadDataUri)
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            Scheme::try_from("buffers/rig.bin").unwrap(),
            Scheme::Relative("buffers/rig.bin")
        );
        assert_eq!(
            Scheme::try_from("file:///tmp/rig.bin").unwrap(),
            Scheme::Absolute("/tmp/rig.bin")
        );
        assert_eq!(
            Scheme::try_from("FILE:/tmp/rig.bin").unwrap(),
            Scheme::Absolute("/tmp/rig.bin")
        );
    }

    #[test]
    fn test_unsupported_scheme() {
        assert_eq!(
            Scheme::try_from("https://example.com/rig.bin"),
            Err(SchemeError::Unsupported(String::from("https")))
        );
    }

    #[test]
    fn test_percent_encoded_path() {
        let dir = std::env::temp_dir().join(format!("rig-asset-scheme-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("my rig.bin"), [1u8, 2, 3, 4]).unwrap();

        let uri = "my%20rig.bin";
        let data = Scheme::try_from(uri).unwrap().load(uri, Some(&dir)).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4]);

        let uri = "bad%FF.bin";
        assert!(Scheme::try_from(uri).unwrap().load(uri, Some(&dir)).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_relative_without_base() {
        let scheme = Scheme::try_from("rig.bin").unwrap();
        assert!(scheme.load("rig.bin", None).is_err());
    }
}
