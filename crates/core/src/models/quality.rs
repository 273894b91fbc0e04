//! Quality profile: configuration, not a persisted entity.
//!
//! The catalog stores only the profile's name (`Content::quality_profile`);
//! the name->id mapping lives in `crate::config::Config` and is looked up
//! at the facade boundary when translating to/from the external schema's
//! numeric `qualityProfileId`.

use serde::{Deserialize, Serialize};

/// One entry of the name<->id map the facade's `/qualityprofile`
/// introspection endpoint renders, with an optional display rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i32,
    pub name: String,
    pub display_name: String,
}

impl QualityProfile {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        let name = name.into();
        let display_name = rename_for_display(&name);
        Self {
            id,
            name,
            display_name,
        }
    }
}

/// Small rename table to display-friendly names.
fn rename_for_display(name: &str) -> String {
    match name {
        "HD-1080p" => "HD - 1080p".to_string(),
        "Ultra-HD" => "Ultra-HD - 4K".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_known_profiles() {
        assert_eq!(QualityProfile::new(1, "HD-1080p").display_name, "HD - 1080p");
        assert_eq!(QualityProfile::new(2, "SD").display_name, "SD");
    }
}
