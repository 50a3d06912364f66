use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, UrlError};
use crate::path::UrlPath;

/// Secondary scheme identifier layered on top of a normal transport url,
/// marking an address that is interpreted by ilastik-specific logic rather
/// than fetched as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualTag {
    Precomputed,
    N5,
    Deepzoom,
}

impl VirtualTag {
    pub const ALL: [VirtualTag; 3] = [VirtualTag::Precomputed, VirtualTag::N5, VirtualTag::Deepzoom];

    pub fn as_str(&self) -> &'static str {
        match self {
            VirtualTag::Precomputed => "precomputed",
            VirtualTag::N5 => "n5",
            VirtualTag::Deepzoom => "deepzoom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl fmt::Display for VirtualTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport protocol of the underlying url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Http,
    Https,
    Ws,
    Wss,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Https => "https",
            Transport::Ws => "ws",
            Transport::Wss => "wss",
        }
    }

    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Transport::Http),
            "https" => Some(Transport::Https),
            "ws" => Some(Transport::Ws),
            "wss" => Some(Transport::Wss),
            _ => None,
        }
    }

    /// True for the transports a plain data fetch can use.
    pub fn is_http(&self) -> bool {
        matches!(self, Transport::Http | Transport::Https)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured url value with an optional nested virtual-protocol tag.
///
/// A `Url` is immutable; [`Url::updated_with`] returns a modified copy.
/// Three renderings are computed on demand:
///
/// - [`Url::schemeless`]: `transport://host[:port]/path[?query][#fragment]`
/// - [`Url::single_tag`]: `tag+` followed by the schemeless rendering, still
///   a single valid absolute url
/// - [`Url::double_protocol`]: `tag://` followed by the schemeless
///   rendering, for contexts where the tag must behave as its own scheme
///
/// Without a tag all three coincide. Equality is field equality, which is
/// the same thing as equality of the double-protocol rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    tag: Option<VirtualTag>,
    transport: Transport,
    hostname: String,
    port: Option<u16>,
    path: UrlPath,
    query: BTreeMap<String, String>,
    fragment: Option<String>,
}

/// Partial update for [`Url::updated_with`].
///
/// Each field uses presence-checking semantics: `None` means "keep the
/// current value". For the legitimately-optional url fields (tag, port,
/// fragment) the inner option distinguishes "set to this" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UrlUpdate {
    pub tag: Option<Option<VirtualTag>>,
    pub transport: Option<Transport>,
    pub hostname: Option<String>,
    pub port: Option<Option<u16>>,
    pub path: Option<UrlPath>,
    pub query: Option<BTreeMap<String, String>>,
    pub fragment: Option<Option<String>>,
}

impl Url {
    pub fn new(transport: Transport, hostname: impl Into<String>, port: Option<u16>, path: UrlPath) -> Self {
        Url {
            tag: None,
            transport,
            hostname: hostname.into(),
            port,
            path,
            query: BTreeMap::new(),
            fragment: None,
        }
    }

    /// Parse any of the three renderings with a single grammar:
    /// optional `tag+` or `tag://` prefix, then a mandatory absolute
    /// transport url. Fails with [`UrlError::InvalidUrl`] when the
    /// mandatory parts do not match.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut tag = None;
        let mut rest = raw;
        for candidate in VirtualTag::ALL {
            if let Some(stripped) = rest.strip_prefix(candidate.as_str()) {
                if let Some(after) = stripped.strip_prefix('+') {
                    tag = Some(candidate);
                    rest = after;
                    break;
                }
                if let Some(after) = stripped.strip_prefix("://") {
                    tag = Some(candidate);
                    rest = after;
                    break;
                }
            }
        }

        let parsed = url::Url::parse(rest).map_err(|e| UrlError::invalid_url(raw, e.to_string()))?;

        let transport = Transport::from_scheme(parsed.scheme())
            .ok_or_else(|| UrlError::invalid_url(raw, format!("unknown transport '{}'", parsed.scheme())))?;
        let hostname = parsed
            .host_str()
            .ok_or_else(|| UrlError::invalid_url(raw, "missing hostname"))?
            .to_string();

        let query = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Url {
            tag,
            transport,
            hostname,
            port: parsed.port(),
            path: UrlPath::parse(parsed.path()),
            query,
            fragment: parsed.fragment().map(str::to_string),
        })
    }

    pub fn tag(&self) -> Option<VirtualTag> {
        self.tag
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &UrlPath {
        &self.path
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// `transport://host[:port]/path[?query][#fragment]`, tag omitted.
    pub fn schemeless(&self) -> String {
        let mut out = format!("{}://{}", self.transport, self.hostname);
        if let Some(port) = self.port {
            out.push_str(&format!(":{}", port));
        }
        out.push_str(&self.path.raw());
        if !self.query.is_empty() {
            // Query fields are stored decoded; rendering must re-encode
            // them or reserved characters in values would corrupt the
            // query on the next parse.
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &self.query {
                serializer.append_pair(key, value);
            }
            out.push('?');
            out.push_str(&serializer.finish());
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }

    /// `tag+` prefix on the schemeless rendering; schemeless when untagged.
    pub fn single_tag(&self) -> String {
        match self.tag {
            Some(tag) => format!("{}+{}", tag, self.schemeless()),
            None => self.schemeless(),
        }
    }

    /// `tag://` prefix on the schemeless rendering; schemeless when
    /// untagged. This is the canonical rendering: equality of two urls is
    /// equality of their double-protocol strings.
    pub fn double_protocol(&self) -> String {
        match self.tag {
            Some(tag) => format!("{}://{}", tag, self.schemeless()),
            None => self.schemeless(),
        }
    }

    /// Merge explicitly-present fields of `update` over this url.
    pub fn updated_with(&self, update: UrlUpdate) -> Url {
        Url {
            tag: update.tag.unwrap_or(self.tag),
            transport: update.transport.unwrap_or(self.transport),
            hostname: update.hostname.unwrap_or_else(|| self.hostname.clone()),
            port: update.port.unwrap_or(self.port),
            path: update.path.unwrap_or_else(|| self.path.clone()),
            query: update.query.unwrap_or_else(|| self.query.clone()),
            fragment: update.fragment.unwrap_or_else(|| self.fragment.clone()),
        }
    }

    /// Apply `tag`, failing with [`UrlError::TagConflict`] if a different
    /// tag is already present. Idempotent.
    pub fn ensure_virtual_tag(&self, tag: VirtualTag) -> Result<Url> {
        match self.tag {
            Some(existing) if existing != tag => Err(UrlError::TagConflict {
                existing,
                requested: tag,
            }),
            _ => Ok(self.updated_with(UrlUpdate {
                tag: Some(Some(tag)),
                ..UrlUpdate::default()
            })),
        }
    }

    pub fn join_path(&self, sub: &str) -> Url {
        self.updated_with(UrlUpdate {
            path: Some(self.path.join(sub)),
            ..UrlUpdate::default()
        })
    }

    pub fn parent(&self) -> Url {
        self.updated_with(UrlUpdate {
            path: Some(self.path.parent()),
            ..UrlUpdate::default()
        })
    }

    pub fn root(&self) -> Url {
        self.updated_with(UrlUpdate {
            path: Some(UrlPath::root()),
            ..UrlUpdate::default()
        })
    }

    pub fn with_query_param(&self, key: impl Into<String>, value: impl Into<String>) -> Url {
        let mut query = self.query.clone();
        query.insert(key.into(), value.into());
        self.updated_with(UrlUpdate {
            query: Some(query),
            ..UrlUpdate::default()
        })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.double_protocol())
    }
}
