//! Wardrobe Schema - wearable entity metadata
//!
//! Entity types, the category default tables, legacy id resolution, the
//! metadata builder, and the validator the builder checks its output with.

pub mod defaults;
mod entity;
mod metadata;
mod urn;
mod validation;

pub use entity::{ContentEntry, I18n, ResolvedRepresentation, WearableData, WearableEntity};
pub use metadata::{
    MetadataBuilder, MetadataInputs, MetadataSettings, BASE_WEARABLE_TAG, EXCLUSIVE_TAG,
};
pub use urn::{DecentralandResolver, LegacyFixups, ResolvedUrn, UrnResolver};
pub use validation::{EntityValidator, WearableSchemaValidator};
