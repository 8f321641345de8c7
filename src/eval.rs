use std::fmt;

use serde::{Serialize, Serializer};

use crate::{Flag, Registry};

/// Result of evaluating a flag for a request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Whether the flag is on for the context.
    pub enabled: bool,
    /// Which rule produced the decision.
    pub reason: Reason,
}

impl Evaluation {
    /// Flatten an optional evaluation into `(enabled, reason, found)`.
    ///
    /// A missing flag yields `(false, "", false)`.
    pub fn into_parts(evaluation: Option<Evaluation>) -> (bool, &'static str, bool) {
        match evaluation {
            Some(Evaluation { enabled, reason }) => (enabled, reason.as_str(), true),
            None => (false, "", false),
        }
    }
}

/// The rule that decided an [`Evaluation`].
///
/// The text of each reason is part of the public contract and is what gets serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// The user id is listed in the flag's targeted users.
    UserTargeted,
    /// The region is listed in the flag's targeted regions.
    RegionTargeted,
    /// No override matched; the flag's global setting applies.
    GlobalSetting,
}

impl Reason {
    /// Human-readable explanation of the decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::UserTargeted => "User explicitly targeted",
            Reason::RegionTargeted => "Region explicitly targeted",
            Reason::GlobalSetting => "Global flag setting",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Registry {
    /// Evaluate flag `flag_name` for the given user and region.
    ///
    /// Returns `None` if the flag does not exist. Empty `user_id` or `region` never match a
    /// targeting override.
    pub fn evaluate(&self, flag_name: &str, user_id: &str, region: &str) -> Option<Evaluation> {
        let Some(flag) = self.get(flag_name) else {
            log::trace!(target: "flagpole", flag_name; "evaluated a missing flag");
            return None;
        };

        let evaluation = flag.eval(user_id, region);

        log::trace!(target: "flagpole",
                    flag_name,
                    user_id,
                    region,
                    enabled = evaluation.enabled,
                    reason:display = evaluation.reason;
                    "evaluated a flag");

        Some(evaluation)
    }
}

impl Flag {
    /// Apply the targeting rules of this flag, first match wins:
    ///
    /// 1. `user_id` is a targeted user: enabled.
    /// 2. `region` is a targeted region: enabled.
    /// 3. Otherwise the global `enabled` setting.
    ///
    /// Overrides only ever force a flag on.
    pub fn eval(&self, user_id: &str, region: &str) -> Evaluation {
        if self.targets_user(user_id) {
            Evaluation {
                enabled: true,
                reason: Reason::UserTargeted,
            }
        } else if self.targets_region(region) {
            Evaluation {
                enabled: true,
                reason: Reason::RegionTargeted,
            }
        } else {
            Evaluation {
                enabled: self.enabled,
                reason: Reason::GlobalSetting,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Evaluation, Reason};
    use crate::{Flag, Registry};

    fn parts(registry: &Registry, flag: &str, user: &str, region: &str) -> (bool, &'static str, bool) {
        Evaluation::into_parts(registry.evaluate(flag, user, region))
    }

    #[test]
    fn new_homepage_scenario() {
        let registry = Registry::with_defaults();

        assert_eq!(
            parts(&registry, "new-homepage", "123", ""),
            (true, "User explicitly targeted", true)
        );
        assert_eq!(
            parts(&registry, "new-homepage", "999", "us"),
            (true, "Region explicitly targeted", true)
        );
        assert_eq!(
            parts(&registry, "new-homepage", "999", "uk"),
            (false, "Global flag setting", true)
        );
    }

    #[test]
    fn beta_dashboard_scenario() {
        let registry = Registry::with_defaults();

        assert_eq!(
            parts(&registry, "beta-dashboard", "anyone", "anywhere"),
            (true, "Global flag setting", true)
        );
    }

    #[test]
    fn unknown_flag_is_not_found() {
        let registry = Registry::with_defaults();

        assert_eq!(registry.evaluate("unknown", "123", "us"), None);
        assert_eq!(parts(&registry, "unknown", "123", "us"), (false, "", false));
    }

    #[test]
    fn user_target_wins_regardless_of_global_setting() {
        for enabled in [false, true] {
            let flag = Flag::new("f", enabled)
                .target_users(["u"])
                .target_regions(["r"]);

            for region in ["", "r", "elsewhere"] {
                assert_eq!(
                    flag.eval("u", region),
                    Evaluation {
                        enabled: true,
                        reason: Reason::UserTargeted,
                    }
                );
            }
        }
    }

    #[test]
    fn region_target_applies_when_user_does_not_match() {
        let flag = Flag::new("f", false).target_regions(["eu", "ca"]);

        for user in ["", "someone"] {
            assert_eq!(
                flag.eval(user, "ca"),
                Evaluation {
                    enabled: true,
                    reason: Reason::RegionTargeted,
                }
            );
        }
    }

    #[test]
    fn falls_back_to_global_setting() {
        let off = Flag::new("off", false).target_users(["u"]).target_regions(["r"]);
        let on = Flag::new("on", true);

        assert_eq!(
            off.eval("other", "elsewhere"),
            Evaluation {
                enabled: false,
                reason: Reason::GlobalSetting,
            }
        );
        assert_eq!(
            on.eval("", ""),
            Evaluation {
                enabled: true,
                reason: Reason::GlobalSetting,
            }
        );
    }

    #[test]
    fn empty_context_does_not_match_empty_targets() {
        let flag = Flag::new("f", false).target_users([""]).target_regions([""]);

        assert_eq!(flag.eval("", "").reason, Reason::GlobalSetting);
    }

    #[test]
    fn reason_serializes_as_text() {
        let evaluation = Evaluation {
            enabled: true,
            reason: Reason::RegionTargeted,
        };

        assert_eq!(
            serde_json::to_value(evaluation).unwrap(),
            serde_json::json!({"enabled": true, "reason": "Region explicitly targeted"})
        );
    }
}
