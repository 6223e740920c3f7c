//! Category tables and fixed vocabularies

/// Categories a wearable may declare
pub const WEARABLE_CATEGORIES: &[&str] = &[
    "eyebrows",
    "eyes",
    "facial_hair",
    "hair",
    "mouth",
    "upper_body",
    "lower_body",
    "feet",
    "earring",
    "eyewear",
    "hat",
    "helmet",
    "mask",
    "tiara",
    "top_head",
    "body_shape",
    "skin",
    "hands_wear",
];

/// Body parts that can be hidden without being wearable categories
pub const BODY_PARTS: &[&str] = &["head", "hands"];

pub const LOCALES: &[&str] = &["en", "es", "fr", "ja", "zh", "ko"];

pub const RARITIES: &[&str] = &[
    "unique",
    "mythic",
    "exotic",
    "legendary",
    "epic",
    "rare",
    "uncommon",
    "common",
];

pub const BODY_SHAPE_FEMALE: &str = "urn:decentraland:off-chain:base-avatars:BaseFemale";
pub const BODY_SHAPE_MALE: &str = "urn:decentraland:off-chain:base-avatars:BaseMale";

/// Categories a wearable of `category` replaces when its manifest is silent
pub fn default_replaces(category: &str) -> Vec<String> {
    let list: &[&str] = match category {
        "mask" => &["eyewear", "tiara", "hat", "helmet"],
        "eyewear" => &["mask", "helmet"],
        "tiara" => &["mask", "hat", "helmet"],
        "hat" => &["mask", "tiara", "helmet", "top_head"],
        "top_head" => &["hat", "helmet"],
        "helmet" => &["mask", "tiara", "hat", "top_head", "eyewear"],
        _ => &[],
    };
    to_owned(list)
}

/// Categories a wearable of `category` hides when its manifest is silent
pub fn default_hides(category: &str) -> Vec<String> {
    let list: &[&str] = match category {
        "mask" => &["earring", "facial_hair"],
        "hat" => &["hair"],
        "helmet" => &["eyewear", "earring", "hair", "facial_hair", "head"],
        _ => &[],
    };
    to_owned(list)
}

/// Map a free-text body shape hint to its canonical id
pub fn body_shape_for(hint: &str) -> &'static str {
    if hint.to_lowercase().contains("female") {
        BODY_SHAPE_FEMALE
    } else {
        BODY_SHAPE_MALE
    }
}

pub fn is_wearable_category(value: &str) -> bool {
    WEARABLE_CATEGORIES.contains(&value)
}

/// Whether `value` may appear in a `hides` list
pub fn is_hideable(value: &str) -> bool {
    is_wearable_category(value) || BODY_PARTS.contains(&value)
}

fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hat_defaults() {
        assert_eq!(default_replaces("hat"), vec!["mask", "tiara", "helmet", "top_head"]);
        assert_eq!(default_hides("hat"), vec!["hair"]);
    }

    #[test]
    fn test_unlisted_category_has_no_defaults() {
        assert!(default_replaces("feet").is_empty());
        assert!(default_hides("hair").is_empty());
        assert!(default_replaces("hair").is_empty());
    }

    #[test]
    fn test_default_tables_only_name_hideable_values() {
        for category in WEARABLE_CATEGORIES {
            assert!(default_replaces(category).iter().all(|c| is_wearable_category(c)));
            assert!(default_hides(category).iter().all(|c| is_hideable(c)));
        }
    }

    #[test]
    fn test_body_shape_classifier() {
        assert_eq!(body_shape_for("Female"), BODY_SHAPE_FEMALE);
        assert_eq!(body_shape_for("BaseFEMALE"), BODY_SHAPE_FEMALE);
        assert_eq!(body_shape_for("Male"), BODY_SHAPE_MALE);
        assert_eq!(body_shape_for("anything"), BODY_SHAPE_MALE);
    }
}
