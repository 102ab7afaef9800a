use chrono::{NaiveTime, Weekday};
use derive_more::From;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    record::{discriminator, Document, Model, Record},
    Error, Result,
};

/// A representation of one or more spaces where ads can be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AdUnit {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub include_descendants: bool,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
}

impl Default for AdUnit {
    fn default() -> Self {
        AdUnit {
            id: None,
            parent_id: None,
            name: None,
            include_descendants: true,
            external_id: None,
            external_name: None,
        }
    }
}

/// An optional grouping of ad units that makes them easier to target at once.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Placement {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    /// Ids of the grouped ad units.
    pub adunits: Option<Vec<String>>,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Geography {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    /// Kind of location, e.g. `COUNTRY` or `CITY`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
}

/// Browser, device, carrier and similar targets.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Technology {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TechnologyType>,
    pub version: Option<String>,
}

/// Families of [`Technology`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum TechnologyType {
    BandwidthGroup,
    Browser,
    BrowserLanguage,
    DeviceCapability,
    DeviceCategory,
    DeviceManufacturer,
    MobileCarrier,
    MobileDevice,
    MobileDeviceSubmodel,
    OperatingSystem,
    OperatingSystemVersion,
}

/// A recurring weekly time window.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DayPart {
    pub day_of_week: Option<Weekday>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct UserDomain {
    pub domain: Option<String>,
}

/// Publisher-defined key/value target.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Custom {
    pub id: Option<String>,
    pub id_key: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
    pub descriptive_name: Option<String>,
    pub node_key: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct VideoContent {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct VideoPosition {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub external_name: Option<String>,
}

impl Model for AdUnit {
    const TYPE_NAME: &'static str = "AdUnit";
}
impl Model for Placement {
    const TYPE_NAME: &'static str = "Placement";
}
impl Model for Geography {
    const TYPE_NAME: &'static str = "Geography";
}
impl Model for Technology {
    const TYPE_NAME: &'static str = "Technology";
}
impl Model for DayPart {
    const TYPE_NAME: &'static str = "DayPart";
}
impl Model for UserDomain {
    const TYPE_NAME: &'static str = "UserDomain";
}
impl Model for Custom {
    const TYPE_NAME: &'static str = "Custom";
}
impl Model for VideoContent {
    const TYPE_NAME: &'static str = "VideoContent";
}
impl Model for VideoPosition {
    const TYPE_NAME: &'static str = "VideoPosition";
}

/// A record that points at its parent by id.
pub trait Hierarchical {
    /// Unique id within a collection.
    fn id(&self) -> Option<&str>;

    /// Id of the parent record. An empty string means "no parent".
    fn parent_id(&self) -> Option<&str>;
}

macro_rules! hierarchical {
    ($($ty:ty),*) => {
        $(
            impl Hierarchical for $ty {
                fn id(&self) -> Option<&str> {
                    self.id.as_deref()
                }

                fn parent_id(&self) -> Option<&str> {
                    self.parent_id.as_deref().filter(|id| !id.is_empty())
                }
            }
        )*
    };
}

hierarchical!(AdUnit, Placement, Geography, Technology, Custom, VideoContent, VideoPosition);

/// One concrete thing that can be included in or excluded from targeting.
///
/// Equality is attribute-wise within the same variant.
#[derive(Debug, Clone, PartialEq, Eq, From)]
#[allow(missing_docs)]
pub enum Target {
    AdUnit(AdUnit),
    Placement(Placement),
    Geography(Geography),
    Technology(Technology),
    DayPart(DayPart),
    UserDomain(UserDomain),
    Custom(Custom),
    VideoContent(VideoContent),
    VideoPosition(VideoPosition),
}

/// Reconstruction entry points for every [`Target`] variant, keyed by discriminator.
///
/// New variants are supported by adding a row here.
pub const TARGET_TYPES: &[(&str, fn(&Document) -> Result<Target>)] = &[
    (AdUnit::TYPE_NAME, reconstruct::<AdUnit>),
    (Placement::TYPE_NAME, reconstruct::<Placement>),
    (Geography::TYPE_NAME, reconstruct::<Geography>),
    (Technology::TYPE_NAME, reconstruct::<Technology>),
    (DayPart::TYPE_NAME, reconstruct::<DayPart>),
    (UserDomain::TYPE_NAME, reconstruct::<UserDomain>),
    (Custom::TYPE_NAME, reconstruct::<Custom>),
    (VideoContent::TYPE_NAME, reconstruct::<VideoContent>),
    (VideoPosition::TYPE_NAME, reconstruct::<VideoPosition>),
];

fn reconstruct<T: Model + Into<Target>>(doc: &Document) -> Result<Target> {
    T::from_doc(doc).map(Into::into)
}

impl Target {
    /// Return `true` if `type_name` is a registered target discriminator.
    pub fn is_registered(type_name: &str) -> bool {
        TARGET_TYPES.iter().any(|(name, _)| *name == type_name)
    }
}

impl Record for Target {
    fn type_name(&self) -> &'static str {
        match self {
            Target::AdUnit(t) => t.type_name(),
            Target::Placement(t) => t.type_name(),
            Target::Geography(t) => t.type_name(),
            Target::Technology(t) => t.type_name(),
            Target::DayPart(t) => t.type_name(),
            Target::UserDomain(t) => t.type_name(),
            Target::Custom(t) => t.type_name(),
            Target::VideoContent(t) => t.type_name(),
            Target::VideoPosition(t) => t.type_name(),
        }
    }

    fn to_doc(&self) -> Document {
        match self {
            Target::AdUnit(t) => t.to_doc(),
            Target::Placement(t) => t.to_doc(),
            Target::Geography(t) => t.to_doc(),
            Target::Technology(t) => t.to_doc(),
            Target::DayPart(t) => t.to_doc(),
            Target::UserDomain(t) => t.to_doc(),
            Target::Custom(t) => t.to_doc(),
            Target::VideoContent(t) => t.to_doc(),
            Target::VideoPosition(t) => t.to_doc(),
        }
    }

    fn from_doc(doc: &Document) -> Result<Self> {
        let type_name = discriminator(doc).ok_or(Error::MissingDiscriminator)?;
        let Some((_, from_doc)) = TARGET_TYPES.iter().find(|(name, _)| *name == type_name) else {
            log::warn!(target: "adtargeting", type_name; "document names an unknown target type");
            return Err(Error::UnknownType(type_name.to_owned()));
        };
        from_doc(doc)
    }
}

impl Hierarchical for Target {
    fn id(&self) -> Option<&str> {
        match self {
            Target::AdUnit(t) => t.id(),
            Target::Placement(t) => t.id(),
            Target::Geography(t) => t.id(),
            Target::Technology(t) => t.id(),
            Target::Custom(t) => t.id(),
            Target::VideoContent(t) => t.id(),
            Target::VideoPosition(t) => t.id(),
            Target::DayPart(_) | Target::UserDomain(_) => None,
        }
    }

    fn parent_id(&self) -> Option<&str> {
        match self {
            Target::AdUnit(t) => t.parent_id(),
            Target::Placement(t) => t.parent_id(),
            Target::Geography(t) => t.parent_id(),
            Target::Technology(t) => t.parent_id(),
            Target::Custom(t) => t.parent_id(),
            Target::VideoContent(t) => t.parent_id(),
            Target::VideoPosition(t) => t.parent_id(),
            Target::DayPart(_) | Target::UserDomain(_) => None,
        }
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_doc().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = Document::deserialize(deserializer)?;
        Target::from_doc(&doc).map_err(serde::de::Error::custom)
    }
}
