//! Validation of assembled wearable entities

use crate::defaults::{is_hideable, is_wearable_category, LOCALES, RARITIES};
use crate::entity::WearableEntity;
use wardrobe_core::{Result, ValidationIssue, WardrobeError};

/// Checks an entity against a schema, reporting every issue found
pub trait EntityValidator: Send + Sync {
    fn validate(&self, entity: &WearableEntity) -> Vec<ValidationIssue>;

    /// `Ok` when there are no issues, otherwise all of them in one error
    fn check(&self, entity: &WearableEntity) -> Result<()> {
        let issues = self.validate(entity);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(WardrobeError::Validation(issues))
        }
    }
}

/// The wearable schema. Content ids are well-formed by construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct WearableSchemaValidator;

impl EntityValidator for WearableSchemaValidator {
    fn validate(&self, entity: &WearableEntity) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !entity.id.starts_with("urn:decentraland:") {
            issues.push(ValidationIssue::new("/id", "must be a urn:decentraland: URN"));
        }
        if entity.name.trim().is_empty() {
            issues.push(ValidationIssue::new("/name", "must not be empty"));
        }
        if let Some(rarity) = &entity.rarity {
            if !RARITIES.contains(&rarity.as_str()) {
                issues.push(ValidationIssue::new(
                    "/rarity",
                    format!("'{}' is not one of {}", rarity, RARITIES.join(", ")),
                ));
            }
        }

        if entity.i18n.is_empty() {
            issues.push(ValidationIssue::new("/i18n", "must contain at least one translation"));
        }
        for (i, entry) in entity.i18n.iter().enumerate() {
            if !LOCALES.contains(&entry.code.as_str()) {
                issues.push(ValidationIssue::new(
                    format!("/i18n/{}/code", i),
                    format!("'{}' is not one of {}", entry.code, LOCALES.join(", ")),
                ));
            }
        }

        let data = &entity.data;
        if !is_wearable_category(&data.category) {
            issues.push(ValidationIssue::new(
                "/data/category",
                format!("'{}' is not a wearable category", data.category),
            ));
        }
        if data.tags.is_empty() {
            issues.push(ValidationIssue::new("/data/tags", "must contain at least one tag"));
        }
        check_categories(&mut issues, "/data/replaces", &data.replaces, is_wearable_category);
        check_categories(&mut issues, "/data/hides", &data.hides, is_hideable);
        check_categories(
            &mut issues,
            "/data/removesDefaultHiding",
            &data.removes_default_hiding,
            is_hideable,
        );

        if data.representations.is_empty() {
            issues.push(ValidationIssue::new(
                "/data/representations",
                "must contain at least one representation",
            ));
        }
        for (i, rep) in data.representations.iter().enumerate() {
            let base = format!("/data/representations/{}", i);
            if rep.body_shapes.is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{}/bodyShapes", base),
                    "must contain at least one body shape",
                ));
            }
            if rep.contents.is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{}/contents", base),
                    "must contain at least one file",
                ));
            }
            if rep.content(&rep.main_file).is_none() {
                issues.push(ValidationIssue::new(
                    format!("{}/mainFile", base),
                    format!("'{}' is not among the representation contents", rep.main_file),
                ));
            }
            check_categories(
                &mut issues,
                &format!("{}/overrideReplaces", base),
                &rep.override_replaces,
                is_wearable_category,
            );
            check_categories(
                &mut issues,
                &format!("{}/overrideHides", base),
                &rep.override_hides,
                is_hideable,
            );
        }

        issues
    }
}

fn check_categories(
    issues: &mut Vec<ValidationIssue>,
    path: &str,
    values: &[String],
    allowed: fn(&str) -> bool,
) {
    for (i, value) in values.iter().enumerate() {
        if !allowed(value) {
            issues.push(ValidationIssue::new(
                format!("{}/{}", path, i),
                format!("'{}' is not a valid category", value),
            ));
        }
    }
}
