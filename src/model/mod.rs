pub mod features;
pub mod flags;
pub mod profile;
pub mod role;
pub mod triple;

pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureBatch, FeatureVector};
pub use profile::EnsembleProfile;
pub use role::ModelRole;
pub use triple::QuantileTriple;
