//! OAI-PMH request arguments and their per-verb validation.
//!
//! A [`HarvestRequest`] holds the raw arguments exactly as the transport
//! delivered them. [`HarvestRequest::validate`] checks the verb and the
//! argument combination it allows before anything touches the engine.

use std::fmt;
use std::str::FromStr;

use crate::error::{OaiError, Result};

/// The six OAI-PMH verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Describe the repository.
    Identify,
    /// List the metadata formats available (optionally for one record).
    ListMetadataFormats,
    /// List the set structure.
    ListSets,
    /// Fetch one record.
    GetRecord,
    /// List record headers.
    ListIdentifiers,
    /// List full records.
    ListRecords,
}

impl Verb {
    /// The verb as it appears on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Identify => "Identify",
            Verb::ListMetadataFormats => "ListMetadataFormats",
            Verb::ListSets => "ListSets",
            Verb::GetRecord => "GetRecord",
            Verb::ListIdentifiers => "ListIdentifiers",
            Verb::ListRecords => "ListRecords",
        }
    }

    fn allowed(self) -> &'static [Argument] {
        use Argument::{From, Identifier, MetadataPrefix, ResumptionToken, Set, Until};
        match self {
            Verb::Identify => &[],
            Verb::ListMetadataFormats => &[Identifier],
            Verb::ListSets => &[ResumptionToken],
            Verb::GetRecord => &[Identifier, MetadataPrefix],
            Verb::ListIdentifiers | Verb::ListRecords => {
                &[MetadataPrefix, From, Until, Set, ResumptionToken]
            },
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = OaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Identify" => Ok(Verb::Identify),
            "ListMetadataFormats" => Ok(Verb::ListMetadataFormats),
            "ListSets" => Ok(Verb::ListSets),
            "GetRecord" => Ok(Verb::GetRecord),
            "ListIdentifiers" => Ok(Verb::ListIdentifiers),
            "ListRecords" => Ok(Verb::ListRecords),
            other => Err(OaiError::BadVerb(format!("illegal verb '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Argument {
    Identifier,
    MetadataPrefix,
    From,
    Until,
    Set,
    ResumptionToken,
}

impl Argument {
    fn name(self) -> &'static str {
        match self {
            Argument::Identifier => "identifier",
            Argument::MetadataPrefix => "metadataPrefix",
            Argument::From => "from",
            Argument::Until => "until",
            Argument::Set => "set",
            Argument::ResumptionToken => "resumptionToken",
        }
    }
}

/// Raw arguments of one OAI-PMH request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestRequest {
    /// `verb`
    pub verb: Option<String>,
    /// `identifier`
    pub identifier: Option<String>,
    /// `metadataPrefix`
    pub metadata_prefix: Option<String>,
    /// `from`
    pub from: Option<String>,
    /// `until`
    pub until: Option<String>,
    /// `set`
    pub set: Option<String>,
    /// `resumptionToken`
    pub resumption_token: Option<String>,
    repeated: Vec<String>,
    unknown: Vec<String>,
}

impl HarvestRequest {
    /// A request for `verb` with no other arguments.
    #[must_use]
    pub fn new(verb: &str) -> Self {
        HarvestRequest {
            verb: Some(verb.to_string()),
            ..HarvestRequest::default()
        }
    }

    /// Build a request from decoded query-string pairs.
    ///
    /// Repeated and unrecognized arguments are remembered so validation can
    /// reject them.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = HarvestRequest::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let slot = match key {
                "verb" => &mut request.verb,
                "identifier" => &mut request.identifier,
                "metadataPrefix" => &mut request.metadata_prefix,
                "from" => &mut request.from,
                "until" => &mut request.until,
                "set" => &mut request.set,
                "resumptionToken" => &mut request.resumption_token,
                other => {
                    request.unknown.push(other.to_string());
                    continue;
                },
            };
            if slot.is_some() {
                request.repeated.push(key.to_string());
            } else {
                *slot = Some(value.into());
            }
        }
        request
    }

    /// Set `identifier`.
    #[must_use]
    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    /// Set `metadataPrefix`.
    #[must_use]
    pub fn with_metadata_prefix(mut self, prefix: &str) -> Self {
        self.metadata_prefix = Some(prefix.to_string());
        self
    }

    /// Set `from`.
    #[must_use]
    pub fn with_from(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    /// Set `until`.
    #[must_use]
    pub fn with_until(mut self, until: &str) -> Self {
        self.until = Some(until.to_string());
        self
    }

    /// Set `set`.
    #[must_use]
    pub fn with_set(mut self, set: &str) -> Self {
        self.set = Some(set.to_string());
        self
    }

    /// Set `resumptionToken`.
    #[must_use]
    pub fn with_resumption_token(mut self, token: &str) -> Self {
        self.resumption_token = Some(token.to_string());
        self
    }

    /// Arguments present on the request, in canonical order, for echoing.
    #[must_use]
    pub fn arguments(&self) -> Vec<(&'static str, &str)> {
        [
            ("verb", &self.verb),
            ("identifier", &self.identifier),
            ("metadataPrefix", &self.metadata_prefix),
            ("from", &self.from),
            ("until", &self.until),
            ("set", &self.set),
            ("resumptionToken", &self.resumption_token),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// Check the verb and its argument combination.
    ///
    /// # Errors
    ///
    /// - [`OaiError::BadVerb`] if the verb is missing, repeated or illegal
    /// - [`OaiError::BadArgument`] for unknown, repeated, illegal or missing
    ///   arguments, or a resumption token combined with other arguments
    pub fn validate(&self) -> Result<Verb> {
        if self.repeated.iter().any(|k| k == "verb") {
            return Err(OaiError::BadVerb("verb argument is repeated".into()));
        }
        let verb: Verb = self
            .verb
            .as_deref()
            .ok_or_else(|| OaiError::BadVerb("missing verb argument".into()))?
            .parse()?;

        if let Some(name) = self.repeated.first() {
            return Err(OaiError::BadArgument(format!("argument '{name}' is repeated")));
        }
        if let Some(name) = self.unknown.first() {
            return Err(OaiError::BadArgument(format!("illegal argument '{name}'")));
        }

        let present = self.present();
        let allowed = verb.allowed();
        if let Some(arg) = present.iter().find(|arg| !allowed.contains(arg)) {
            return Err(OaiError::BadArgument(format!(
                "'{}' is not allowed for {verb}",
                arg.name()
            )));
        }

        match verb {
            Verb::GetRecord => {
                self.require(Argument::Identifier)?;
                self.require(Argument::MetadataPrefix)?;
            },
            Verb::ListIdentifiers | Verb::ListRecords => {
                if self.resumption_token.is_some() {
                    if present.len() > 1 {
                        return Err(OaiError::BadArgument(
                            "resumptionToken is an exclusive argument".into(),
                        ));
                    }
                } else {
                    self.require(Argument::MetadataPrefix)?;
                }
            },
            Verb::Identify | Verb::ListMetadataFormats | Verb::ListSets => {},
        }
        Ok(verb)
    }

    fn present(&self) -> Vec<Argument> {
        [
            (Argument::Identifier, &self.identifier),
            (Argument::MetadataPrefix, &self.metadata_prefix),
            (Argument::From, &self.from),
            (Argument::Until, &self.until),
            (Argument::Set, &self.set),
            (Argument::ResumptionToken, &self.resumption_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_some())
        .map(|(arg, _)| arg)
        .collect()
    }

    fn require(&self, arg: Argument) -> Result<()> {
        if self.present().contains(&arg) {
            Ok(())
        } else {
            Err(OaiError::BadArgument(format!(
                "missing required argument '{}'",
                arg.name()
            )))
        }
    }
}
