use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

/// A named boolean feature toggle with optional targeting overrides.
///
/// Field names are serialized verbatim (`Name`, `Enabled`, `TargetUsers`, `TargetRegions`), which
/// is the format of the persisted snapshot and of the flag listing.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Flag {
    /// Unique registry key. Never empty.
    #[serde(default)]
    pub name: String,
    /// Decision used when no targeting override matches.
    #[serde(default)]
    pub enabled: bool,
    /// Users for whom the flag is always enabled.
    ///
    /// Missing and `null` both mean "no targeting".
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub target_users: Vec<String>,
    /// Regions for which the flag is always enabled.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub target_regions: Vec<String>,
}

impl Flag {
    /// Create a flag with no targeting overrides.
    ///
    /// ```
    /// # use flagpole::Flag;
    /// let flag = Flag::new("beta-dashboard", true)
    ///     .target_users(["123"])
    ///     .target_regions(["us"]);
    /// assert_eq!(flag.target_users, vec!["123".to_owned()]);
    /// ```
    pub fn new(name: impl Into<String>, enabled: bool) -> Flag {
        Flag {
            name: name.into(),
            enabled,
            target_users: Vec::new(),
            target_regions: Vec::new(),
        }
    }

    /// Replace the list of targeted users.
    pub fn target_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the list of targeted regions.
    pub fn target_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn targets_user(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.target_users.iter().any(|u| u == user_id)
    }

    pub(crate) fn targets_region(&self, region: &str) -> bool {
        !region.is_empty() && self.target_regions.iter().any(|r| r == region)
    }
}

#[cfg(test)]
mod tests {
    use super::Flag;

    #[test]
    fn serializes_with_snapshot_field_names() {
        let flag = Flag::new("new-homepage", false)
            .target_users(["123"])
            .target_regions(["us"]);

        let json = serde_json::to_value(&flag).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "Name": "new-homepage",
                "Enabled": false,
                "TargetUsers": ["123"],
                "TargetRegions": ["us"],
            })
        );
    }

    #[test]
    fn null_or_missing_targets_mean_no_targeting() {
        let flag: Flag = serde_json::from_str(
            r#"{"Name": "beta-dashboard", "Enabled": true, "TargetUsers": null}"#,
        )
        .unwrap();

        assert_eq!(flag, Flag::new("beta-dashboard", true));
    }

    #[test]
    fn empty_identifiers_never_match() {
        let flag = Flag::new("f", false).target_users([""]).target_regions([""]);

        assert!(!flag.targets_user(""));
        assert!(!flag.targets_region(""));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let flag = Flag::new("f", false).target_regions(["us"]);

        assert!(flag.targets_region("us"));
        assert!(!flag.targets_region("US"));
    }
}
