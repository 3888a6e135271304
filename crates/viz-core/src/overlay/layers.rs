use crate::constants::LAYER_OPACITY_FLOORS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Body,
    Veins,
    Brain,
    Heart,
}

// Substrings that identify a layer in source mesh names (English, French and
// Latin anatomy vocabularies).
const BODY_PATTERNS: &[&str] = &[
    "skin", "peau", "body", "corps", "integument", "epiderm", "dermis", "cutaneous",
];
const VEINS_PATTERNS: &[&str] = &[
    "vein", "veine", "artery", "artère", "artere", "vessel", "vaisseau", "circulat", "blood",
    "sang", "aorta", "aorte", "vascular",
];
const BRAIN_PATTERNS: &[&str] = &[
    "brain", "cerveau", "cerebr", "encephal", "cortex", "cerebellum", "cervelet", "neural",
];
const HEART_PATTERNS: &[&str] = &[
    "heart", "coeur", "cœur", "cardiac", "cardiaque", "ventricle", "ventricul", "atrium",
    "auricle",
];

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Body, Layer::Veins, Layer::Brain, Layer::Heart];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Mesh name used in the exported pose containers.
    pub fn mesh_name(self) -> &'static str {
        match self {
            Layer::Body => "Body",
            Layer::Veins => "Veins",
            Layer::Brain => "Brain",
            Layer::Heart => "Heart",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Body => "body",
            Layer::Veins => "veins",
            Layer::Brain => "brain",
            Layer::Heart => "heart",
        }
    }

    /// Minimum opacity so the figure stays faintly visible in silence.
    #[inline]
    pub fn opacity_floor(self) -> f32 {
        LAYER_OPACITY_FLOORS[self.index()]
    }

    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            Layer::Body => BODY_PATTERNS,
            Layer::Veins => VEINS_PATTERNS,
            Layer::Brain => BRAIN_PATTERNS,
            Layer::Heart => HEART_PATTERNS,
        }
    }

    /// Layer a mesh name belongs to: exact name first, then the first layer
    /// whose patterns occur in the name. Heart and brain are checked before
    /// body so that e.g. "cardiac_body" is not taken for skin.
    pub fn classify(mesh_name: &str) -> Option<Layer> {
        if let Some(l) = Layer::ALL
            .into_iter()
            .find(|l| l.mesh_name().eq_ignore_ascii_case(mesh_name))
        {
            return Some(l);
        }
        let lower = mesh_name.to_lowercase();
        [Layer::Heart, Layer::Brain, Layer::Veins, Layer::Body]
            .into_iter()
            .find(|l| l.patterns().iter().any(|p| lower.contains(p)))
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layer::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown layer: {s}"))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pose {
    #[default]
    Open,
    Closed,
}

impl Pose {
    pub const ALL: [Pose; 2] = [Pose::Open, Pose::Closed];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Pose::Open => "open",
            Pose::Closed => "closed",
        }
    }

    /// File name of the exported container for this pose.
    pub fn file_name(self) -> String {
        format!("pose-{}.glb", self.name())
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pose::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pose: {s}"))
    }
}
