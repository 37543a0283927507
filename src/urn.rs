use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{error::UrnError, Name};

const MODULE_SEPARATOR: char = ':';
const FRAGMENT_SEPARATOR: char = '#';

/// Identifier of a resource
///
/// Written as `module:resource` or `module:resource#fragment`. Segments compare with
/// [`Name`] semantics, so `Engine:Quad` and `engine:quad` are the same urn, but the original
/// spelling is what gets printed back.
///
/// # Example
/// ```
/// # use tomb_assets::ResourceUrn;
/// let urn: ResourceUrn = "core:shaders#vertex".parse().unwrap();
/// assert_eq!(urn.module().as_str(), "core");
/// assert_eq!(urn.to_string(), "core:shaders#vertex");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceUrn {
    module: Name,
    resource: Name,
    fragment: Option<Name>,
}

impl ResourceUrn {
    pub fn new(module: impl Into<Name>, resource: impl Into<Name>) -> Result<Self, UrnError> {
        let module = module.into();
        let resource = resource.into();
        let display = format!("{module}{MODULE_SEPARATOR}{resource}");
        check_segment(&display, &module, EMPTY_MODULE)?;
        check_segment(&display, &resource, EMPTY_RESOURCE)?;
        Ok(Self {
            module,
            resource,
            fragment: None,
        })
    }

    /// This urn with its fragment replaced by `fragment`
    pub fn with_fragment(&self, fragment: impl Into<Name>) -> Result<Self, UrnError> {
        let fragment = fragment.into();
        check_segment(&format!("{self}#{fragment}"), &fragment, EMPTY_FRAGMENT)?;
        Ok(Self {
            fragment: Some(fragment),
            ..self.clone()
        })
    }

    pub fn module(&self) -> &Name {
        &self.module
    }

    pub fn resource(&self) -> &Name {
        &self.resource
    }

    pub fn fragment(&self) -> Option<&Name> {
        self.fragment.as_ref()
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment.is_some()
    }

    /// The urn of the resource that owns this fragment, or a copy of self when there is none
    pub fn root_urn(&self) -> ResourceUrn {
        Self {
            fragment: None,
            ..self.clone()
        }
    }
}

const EMPTY_MODULE: &str = "empty module segment";
const EMPTY_RESOURCE: &str = "empty resource segment";
const EMPTY_FRAGMENT: &str = "empty fragment segment";

fn check_segment(input: &str, segment: &Name, if_empty: &'static str) -> Result<(), UrnError> {
    let reason = if segment.is_empty() {
        if_empty
    } else if segment
        .as_str()
        .contains([MODULE_SEPARATOR, FRAGMENT_SEPARATOR])
    {
        "separator inside a segment"
    } else if segment.as_str().trim() != segment.as_str() {
        "surrounding whitespace"
    } else {
        return Ok(());
    };
    Err(UrnError {
        input: input.to_string(),
        reason,
    })
}

/// Split `resource[#fragment]`, rejecting a second `#`
fn split_fragment<'a>(
    input: &str,
    rest: &'a str,
) -> Result<(&'a str, Option<&'a str>), UrnError> {
    match rest.split_once(FRAGMENT_SEPARATOR) {
        Some((_, fragment)) if fragment.contains(FRAGMENT_SEPARATOR) => Err(UrnError {
            input: input.to_string(),
            reason: "more than one '#' separator",
        }),
        Some((resource, fragment)) => Ok((resource, Some(fragment))),
        None => Ok((rest, None)),
    }
}

impl FromStr for ResourceUrn {
    type Err = UrnError;

    fn from_str(input: &str) -> Result<Self, UrnError> {
        let malformed = |reason| UrnError {
            input: input.to_string(),
            reason,
        };

        let (module, rest) = input
            .split_once(MODULE_SEPARATOR)
            .ok_or_else(|| malformed("missing ':' separator"))?;
        if rest.contains(MODULE_SEPARATOR) {
            return Err(malformed("more than one ':' separator"));
        }
        let (resource, fragment) = split_fragment(input, rest)?;

        let module = Name::new(module);
        let resource = Name::new(resource);
        let fragment = fragment.map(Name::new);
        check_segment(input, &module, EMPTY_MODULE)?;
        check_segment(input, &resource, EMPTY_RESOURCE)?;
        if let Some(fragment) = &fragment {
            check_segment(input, fragment, EMPTY_FRAGMENT)?;
        }

        Ok(Self {
            module,
            resource,
            fragment,
        })
    }
}

impl TryFrom<&str> for ResourceUrn {
    type Error = UrnError;

    fn try_from(urn: &str) -> Result<Self, UrnError> {
        urn.parse()
    }
}

impl TryFrom<String> for ResourceUrn {
    type Error = UrnError;

    fn try_from(value: String) -> Result<Self, UrnError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&String> for ResourceUrn {
    type Error = UrnError;

    fn try_from(value: &String) -> Result<Self, UrnError> {
        Self::try_from(value.as_str())
    }
}

impl Display for ResourceUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fragment {
            Some(fragment) => write!(f, "{}:{}#{}", self.module, self.resource, fragment),
            None => write!(f, "{}:{}", self.module, self.resource),
        }
    }
}

impl Serialize for ResourceUrn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceUrn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A reference to a resource as a caller may write it
///
/// Either a full urn, or a bare `resource[#fragment]` that still has to be matched against
/// the urns that are known in some module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Urn(ResourceUrn),
    Bare {
        resource: Name,
        fragment: Option<Name>,
    },
}

impl ResourceRef {
    /// Whether a bare reference names `urn`. A full urn only matches itself.
    pub fn matches(&self, urn: &ResourceUrn) -> bool {
        match self {
            ResourceRef::Urn(own) => own == urn,
            ResourceRef::Bare { resource, fragment } => {
                urn.resource() == resource && urn.fragment() == fragment.as_ref()
            }
        }
    }
}

impl FromStr for ResourceRef {
    type Err = UrnError;

    fn from_str(input: &str) -> Result<Self, UrnError> {
        if input.contains(MODULE_SEPARATOR) {
            return input.parse().map(ResourceRef::Urn);
        }

        let (resource, fragment) = split_fragment(input, input)?;
        let resource = Name::new(resource);
        let fragment = fragment.map(Name::new);
        check_segment(input, &resource, EMPTY_RESOURCE)?;
        if let Some(fragment) = &fragment {
            check_segment(input, fragment, EMPTY_FRAGMENT)?;
        }
        Ok(ResourceRef::Bare { resource, fragment })
    }
}

impl From<ResourceUrn> for ResourceRef {
    fn from(urn: ResourceUrn) -> Self {
        ResourceRef::Urn(urn)
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Urn(urn) => Display::fmt(urn, f),
            ResourceRef::Bare {
                resource,
                fragment: Some(fragment),
            } => write!(f, "{resource}#{fragment}"),
            ResourceRef::Bare { resource, .. } => Display::fmt(resource, f),
        }
    }
}
