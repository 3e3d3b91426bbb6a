mod canonicalize;
mod config;
mod embed;
mod error;
mod features;
mod unit;

pub use canonicalize::{
    Canonicalizer, CommandStandardizer, FragmentStandardizer, StandardizeOptions,
    StandardizeRequest, Standardizer,
};

pub use embed::{ConformerGenerator, EmbedOptions, ForcefieldEmbedder, ForcefieldKind, GeometryEmbedder};

pub use features::{
    CoulombMatrix, CoulombOptions, MolecularWeight, MorganFingerprint, MorganOptions,
};

pub use config::{CollaboratorAccess, UnitConfig};
pub use unit::{Output, OutputKind, Rank, TransformUnit, UnitKind};

pub use error::Error;
