//! Film Channels

use crate::pbrt::*;
use bitflags::bitflags;

bitflags! {
    /// Stores combination of flags for the film channel kinds.
    pub struct FilmChannels: u32 {
        const RADIANCE_PER_PIXEL_NORMALIZED = 1 << 0;
        const RADIANCE_PER_SCREEN_NORMALIZED = 1 << 1;
        const ALPHA = 1 << 2;
        const IMAGEPIPELINE = 1 << 3;
        const DEPTH = 1 << 4;
        const POSITION = 1 << 5;
        const GEOMETRY_NORMAL = 1 << 6;
        const SHADING_NORMAL = 1 << 7;
        const MATERIAL_ID = 1 << 8;
        const DIRECT_DIFFUSE = 1 << 9;
        const DIRECT_GLOSSY = 1 << 10;
        const EMISSION = 1 << 11;
        const INDIRECT_DIFFUSE = 1 << 12;
        const INDIRECT_GLOSSY = 1 << 13;
        const INDIRECT_SPECULAR = 1 << 14;
        const MATERIAL_ID_MASK = 1 << 15;
        const DIRECT_SHADOW_MASK = 1 << 16;
        const INDIRECT_SHADOW_MASK = 1 << 17;
        const UV = 1 << 18;
        const RAYCOUNT = 1 << 19;
        const BY_MATERIAL_ID = 1 << 20;
        const IRRADIANCE = 1 << 21;
        const OBJECT_ID = 1 << 22;
        const OBJECT_ID_MASK = 1 << 23;
        const BY_OBJECT_ID = 1 << 24;
        const SAMPLECOUNT = 1 << 25;
        const CONVERGENCE = 1 << 26;
        const MATERIAL_ID_COLOR = 1 << 27;
        const ALBEDO = 1 << 28;
        const AVG_SHADING_NORMAL = 1 << 29;
    }
}

impl FilmChannels {
    /// Returns the policy for a single channel kind.
    ///
    /// Panics if `self` is not exactly one channel kind.
    pub fn policy(&self) -> &'static ChannelPolicy {
        assert!(
            self.bits().count_ones() == 1,
            "policy() requires a single channel kind, got {:?}",
            self
        );
        &CHANNEL_POLICIES[self.bits().trailing_zeros() as usize]
    }

    /// Returns the channel name used in configuration and logs.
    pub fn name(&self) -> &'static str {
        self.policy().name
    }

    /// Returns the channel kind matching a configuration name (case insensitive).
    ///
    /// * `name` - Channel name, e.g. "DEPTH".
    pub fn from_name(name: &str) -> Result<Self, String> {
        CHANNEL_POLICIES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.kind)
            .ok_or_else(|| format!("Unknown film channel type '{name}'"))
    }

    /// Returns each single channel kind set in `self`, lowest bit first.
    pub fn kinds(&self) -> impl Iterator<Item = FilmChannels> + '_ {
        CHANNEL_POLICIES.iter().map(|p| p.kind).filter(|k| self.contains(*k))
    }

    /// Returns true if any kind in `self` has the given role.
    ///
    /// * `role` - The role.
    pub fn has_role(&self, role: ChannelRole) -> bool {
        self.kinds().any(|k| k.policy().role == role)
    }
}

/// Pixel component type of a channel buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentType {
    Float,
    UInt,
}

/// Which list decides how many buffers a channel kind owns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Multiplicity {
    /// Exactly one buffer.
    Single,

    /// One buffer per radiance group.
    PerRadianceGroup,

    /// One buffer per image pipeline.
    PerImagePipeline,

    /// One buffer per material ID mask.
    PerMaskMaterialId,

    /// One buffer per by-material ID.
    PerByMaterialId,

    /// One buffer per object ID mask.
    PerMaskObjectId,

    /// One buffer per by-object ID.
    PerByObjectId,
}

/// Value used to fill a channel buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelFill {
    /// All components zero.
    Zero,

    /// Float components +inf (nothing written yet for min-reduction channels).
    Infinity,

    /// Integer components `u32::MAX` (ID unset).
    MaxId,
}

impl ChannelFill {
    /// Returns the fill as a float component.
    pub fn as_float(&self) -> Float {
        match self {
            Self::Zero => 0.0,
            Self::Infinity => INFINITY,
            Self::MaxId => u32::MAX as Float,
        }
    }

    /// Returns the fill as an integer component.
    pub fn as_uint(&self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::Infinity | Self::MaxId => u32::MAX,
        }
    }
}

/// Role of a channel kind. Colour channels are always accumulated, composing
/// channels only when the film has at least one and data channels only when
/// it has at least one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelRole {
    Color,
    Composing,
    Data,
    Output,
}

/// Source of the ID compared by mask and by-ID channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdSource {
    Material,
    Object,
}

/// How a sample result is routed into the channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleRoute {
    /// Weighted add of each finite radiance group.
    RadiancePerPixel,

    /// `value * weight` add of each finite radiance group.
    RadiancePerScreen,

    /// Weighted add of the sample field.
    Weighted,

    /// Add `(match ? weight : 0, weight)` for each configured ID.
    IdMask(IdSource),

    /// Weighted add of merged radiance when the ID matches, black otherwise.
    ById(IdSource),

    /// Min-reduction that gates the depth gated channels.
    DepthMin,

    /// Overwrite when the depth test passed.
    DepthGated,

    /// Plain add of the sample field.
    Add,

    /// Plain add of 1.
    Count,

    /// Not written by sample accumulation.
    None,
}

/// How a channel kind is combined by `Film::add_film()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// Add the raw components.
    Add,

    /// Replace when the source is nearer, or unconditionally without depth.
    ReplaceByDepth,

    /// Add the raw components of the buffers with equal IDs.
    AddById,

    /// Take the minimum; runs after every other kind.
    Min,

    /// Not merged.
    Skip,
}

/// Static description of a channel kind.
#[derive(Copy, Clone, Debug)]
pub struct ChannelPolicy {
    /// The channel kind.
    pub kind: FilmChannels,

    /// Channel name.
    pub name: &'static str,

    /// Total components per pixel including weight components.
    pub channels: usize,

    /// Number of trailing weight components.
    pub weight_channels: usize,

    /// Pixel component type.
    pub component: ComponentType,

    /// Number of buffers.
    pub multiplicity: Multiplicity,

    /// Fill used when buffers are allocated.
    pub init_fill: ChannelFill,

    /// Fill used by `Film::clear()`; `None` when the channel survives a clear.
    pub clear_fill: Option<ChannelFill>,

    /// Channel role.
    pub role: ChannelRole,

    /// Sample route.
    pub route: SampleRoute,

    /// Merge policy.
    pub merge: MergePolicy,
}

macro_rules! policy {
    ($kind: ident, $shape: expr, $component: ident, $multiplicity: ident, $init: ident, $clear: expr,
     $role: ident, $route: expr, $merge: ident) => {
        ChannelPolicy {
            kind: FilmChannels::$kind,
            name: stringify!($kind),
            channels: $shape.0,
            weight_channels: $shape.1,
            component: ComponentType::$component,
            multiplicity: Multiplicity::$multiplicity,
            init_fill: ChannelFill::$init,
            clear_fill: $clear,
            role: ChannelRole::$role,
            route: $route,
            merge: MergePolicy::$merge,
        }
    };
}

const ZERO: Option<ChannelFill> = Some(ChannelFill::Zero);
const INF: Option<ChannelFill> = Some(ChannelFill::Infinity);
const MAX_ID: Option<ChannelFill> = Some(ChannelFill::MaxId);

/// Per kind policy table indexed by bit position.
#[rustfmt::skip]
pub static CHANNEL_POLICIES: [ChannelPolicy; 30] = [
    policy!(RADIANCE_PER_PIXEL_NORMALIZED, (4, 1), Float, PerRadianceGroup, Zero, ZERO, Color, SampleRoute::RadiancePerPixel, Add),
    policy!(RADIANCE_PER_SCREEN_NORMALIZED, (3, 0), Float, PerRadianceGroup, Zero, ZERO, Color, SampleRoute::RadiancePerScreen, Add),
    policy!(ALPHA, (2, 1), Float, Single, Zero, ZERO, Color, SampleRoute::Weighted, Add),
    policy!(IMAGEPIPELINE, (3, 0), Float, PerImagePipeline, Zero, ZERO, Output, SampleRoute::None, Skip),
    policy!(DEPTH, (1, 0), Float, Single, Infinity, INF, Data, SampleRoute::DepthMin, Min),
    policy!(POSITION, (3, 0), Float, Single, Infinity, INF, Data, SampleRoute::DepthGated, ReplaceByDepth),
    policy!(GEOMETRY_NORMAL, (3, 0), Float, Single, Zero, INF, Data, SampleRoute::DepthGated, ReplaceByDepth),
    policy!(SHADING_NORMAL, (3, 0), Float, Single, Zero, INF, Data, SampleRoute::DepthGated, ReplaceByDepth),
    policy!(MATERIAL_ID, (1, 0), UInt, Single, MaxId, MAX_ID, Data, SampleRoute::DepthGated, ReplaceByDepth),
    policy!(DIRECT_DIFFUSE, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(DIRECT_GLOSSY, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(EMISSION, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(INDIRECT_DIFFUSE, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(INDIRECT_GLOSSY, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(INDIRECT_SPECULAR, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(MATERIAL_ID_MASK, (2, 1), Float, PerMaskMaterialId, Zero, ZERO, Composing, SampleRoute::IdMask(IdSource::Material), AddById),
    policy!(DIRECT_SHADOW_MASK, (2, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(INDIRECT_SHADOW_MASK, (2, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(UV, (2, 0), Float, Single, Infinity, ZERO, Data, SampleRoute::DepthGated, ReplaceByDepth),
    policy!(RAYCOUNT, (1, 0), Float, Single, Zero, ZERO, Data, SampleRoute::Add, Add),
    policy!(BY_MATERIAL_ID, (4, 1), Float, PerByMaterialId, Zero, ZERO, Composing, SampleRoute::ById(IdSource::Material), AddById),
    policy!(IRRADIANCE, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(OBJECT_ID, (1, 0), UInt, Single, MaxId, MAX_ID, Data, SampleRoute::DepthGated, ReplaceByDepth),
    policy!(OBJECT_ID_MASK, (2, 1), Float, PerMaskObjectId, Zero, ZERO, Composing, SampleRoute::IdMask(IdSource::Object), AddById),
    policy!(BY_OBJECT_ID, (4, 1), Float, PerByObjectId, Zero, ZERO, Composing, SampleRoute::ById(IdSource::Object), AddById),
    policy!(SAMPLECOUNT, (1, 0), UInt, Single, Zero, ZERO, Data, SampleRoute::Count, Add),
    policy!(CONVERGENCE, (1, 0), Float, Single, Infinity, None, Data, SampleRoute::None, Skip),
    policy!(MATERIAL_ID_COLOR, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(ALBEDO, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
    policy!(AVG_SHADING_NORMAL, (4, 1), Float, Single, Zero, ZERO, Composing, SampleRoute::Weighted, Add),
];

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
