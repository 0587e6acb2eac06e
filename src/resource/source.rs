//! Source descriptors: classify a uri as file, remote, base64 or inline text.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::SourceError;
use crate::types::Edges;

const FILE_URI_ABS_PREFIX: &str = "file:///";
const FILE_URI_REL_PREFIX: &str = "file://resource/";

/// 1: mime type, 3: charset, 4: base64/utf8 marker.
const DATA_URI_PATTERN: &str = r"(?i)^data:([\w/+*-]+)?(?:;(charset=(\w+))|;(base64|utf8))?,";
const URL_PATTERN: &str = r"^(?:\w+:)?//([^\s.]+\.\S{2}|localhost[:?\d]*)\S*$";

/// User-facing source: a uri plus optional alias and nine-slice insets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceSpec {
    pub uri: String,
    pub alias: Option<String>,
    pub cap_insets: Option<Edges>,
}

impl SourceSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_cap_insets(mut self, insets: Edges) -> Self {
        self.cap_insets = Some(insets);
        self
    }

    /// Resource key: alias if present, otherwise the uri.
    pub fn id(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.uri)
    }
}

impl From<&str> for SourceSpec {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for SourceSpec {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    File,
    Remote,
    Base64,
    Utf8,
}

impl SourceType {
    fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Remote => "remote",
            Self::Base64 => "base64",
            Self::Utf8 => "utf8",
        }
    }
}

/// Which non-file source types a resource kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePolicy {
    pub allow_remote: bool,
    pub allow_base64: bool,
    pub allow_utf8: bool,
}

impl SourcePolicy {
    pub const IMAGE: Self = Self {
        allow_remote: true,
        allow_base64: true,
        allow_utf8: true,
    };
    pub const AUDIO: Self = Self {
        allow_remote: false,
        allow_base64: false,
        allow_utf8: false,
    };

    fn allows(self, kind: SourceType) -> bool {
        match kind {
            SourceType::File => true,
            SourceType::Remote => self.allow_remote,
            SourceType::Base64 => self.allow_base64,
            SourceType::Utf8 => self.allow_utf8,
        }
    }
}

/// Normalized source.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// File path, url or the full data uri.
    pub uri: String,
    /// Key the resource is registered under.
    pub alias: String,
    pub kind: SourceType,
    /// Data section of a data uri, percent-decoded for utf8.
    pub data: Option<String>,
    pub mime_type: Option<String>,
    pub cap_insets: Option<Edges>,
}

impl Source {
    pub fn path(&self) -> &Path {
        Path::new(&self.uri)
    }
}

/// Resolve and classify a source.
pub fn to_source(
    spec: &SourceSpec,
    base_path: &Path,
    policy: SourcePolicy,
) -> Result<Source, SourceError> {
    let uri = spec.uri.as_str();
    if uri.is_empty() {
        return Err(SourceError::MissingUri);
    }

    let mut data = None;
    let mut mime_type = None;

    let (resolved, kind) = if Path::new(uri).is_absolute() {
        (uri.to_string(), SourceType::File)
    } else if let Some(rest) = uri.strip_prefix(FILE_URI_REL_PREFIX) {
        (join(base_path, rest), SourceType::File)
    } else if let Some(rest) = uri.strip_prefix(FILE_URI_ABS_PREFIX) {
        (format!("/{rest}"), SourceType::File)
    } else if uri.starts_with("data:") {
        let parsed = parse_data_uri(uri)?;
        data = Some(parsed.data);
        mime_type = parsed.mime_type;
        (uri.to_string(), parsed.kind)
    } else if is_url(uri) {
        (uri.to_string(), SourceType::Remote)
    } else {
        (join(base_path, uri), SourceType::File)
    };

    if !policy.allows(kind) {
        return Err(SourceError::NotAllowed {
            kind: kind.name(),
            uri: uri.to_string(),
        });
    }

    Ok(Source {
        uri: resolved,
        alias: spec.alias.clone().unwrap_or_else(|| uri.to_string()),
        kind,
        data,
        mime_type,
        cap_insets: spec.cap_insets,
    })
}

fn join(base: &Path, rest: &str) -> String {
    if base.as_os_str().is_empty() {
        rest.to_string()
    } else {
        let joined: PathBuf = base.join(rest);
        joined.to_string_lossy().into_owned()
    }
}

fn cached(cell: &'static OnceLock<Result<Regex, regex::Error>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern)).as_ref().ok()
}

fn is_url(uri: &str) -> bool {
    static URL: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    cached(&URL, URL_PATTERN).is_some_and(|re| re.is_match(uri))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub kind: SourceType,
    pub data: String,
    pub mime_type: Option<String>,
}

/// Parse `data:[mime][;charset=utf8|;base64|;utf8],data`.
pub fn parse_data_uri(uri: &str) -> Result<DataUri, SourceError> {
    static DATA_URI: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    let caps = cached(&DATA_URI, DATA_URI_PATTERN)
        .and_then(|re| re.captures(uri))
        .ok_or_else(|| SourceError::MalformedDataUri(uri.to_string()))?;

    let kind = match caps.get(4) {
        Some(m) if m.as_str().eq_ignore_ascii_case("base64") => SourceType::Base64,
        Some(_) => SourceType::Utf8,
        None => {
            if let Some(charset) = caps.get(3) {
                if !charset.as_str().eq_ignore_ascii_case("utf8") {
                    return Err(SourceError::InvalidCharset(charset.as_str().to_string()));
                }
            }
            SourceType::Utf8
        }
    };

    let raw = uri.split_once(',').map_or("", |(_, data)| data);
    if raw.is_empty() {
        return Err(SourceError::EmptyData);
    }

    let data = match kind {
        SourceType::Utf8 => match percent_decode_str(raw).decode_utf8() {
            Ok(Cow::Borrowed(s)) => s.to_string(),
            Ok(Cow::Owned(s)) => s,
            Err(_) => return Err(SourceError::MalformedDataUri(uri.to_string())),
        },
        _ => raw.to_string(),
    };

    Ok(DataUri {
        kind,
        data,
        mime_type: caps.get(1).map(|m| m.as_str().to_string()),
    })
}
