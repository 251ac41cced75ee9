//! Web ACL rule declarations for the CDN.
//!
//! Rules are tagged variants with explicit priorities rather than a bag of
//! JSON blobs, so the ladder can be validated before it is rendered: every
//! priority must be unique, and [`rule_ladder`] derives the stage-specific
//! shape from [`StagePolicy`] knobs instead of matching on stage names.

use crate::config::StagePolicy;
use crate::errors::SynthError;
use serde_json::json;
use std::collections::HashMap;

/// Response body key for the blocked admin sign-in page.
pub const DISABLE_ACTION_BODY_KEY: &str = "disable-action";

/// HTML served when the admin sign-in block fires.
pub const DISABLE_ACTION_BODY: &str = "<div>error: access denied</div>";

/// A single WAFv2 rule, one variant per statement shape the ACL uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WafRule {
    /// An AWS-managed rule group in count-nothing (override none) mode.
    ManagedRuleGroup {
        name: String,
        priority: u32,
        group: &'static str,
        excluded_rules: Vec<&'static str>,
        /// Targeted bot-control inspection with machine learning.
        bot_control: bool,
    },
    /// Allows requests whose Host header and URI path both match.
    HostPathAllow {
        name: String,
        priority: u32,
        host_equals: String,
        path_contains: &'static str,
    },
    /// Blocks requests whose URI path matches, serving a custom 403 body.
    PathBlock {
        name: String,
        priority: u32,
        path_contains: &'static str,
        response_body_key: &'static str,
    },
}

impl WafRule {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ManagedRuleGroup { name, .. }
            | Self::HostPathAllow { name, .. }
            | Self::PathBlock { name, .. } => name,
        }
    }

    #[must_use]
    pub const fn priority(&self) -> u32 {
        match self {
            Self::ManagedRuleGroup { priority, .. }
            | Self::HostPathAllow { priority, .. }
            | Self::PathBlock { priority, .. } => *priority,
        }
    }

    /// A lowercased byte-match statement on the URI path.
    fn path_statement(path_contains: &str) -> serde_json::Value {
        json!({
            "ByteMatchStatement": {
                "SearchString": path_contains,
                "FieldToMatch": {"UriPath": {}},
                "TextTransformations": [{"Priority": 0, "Type": "LOWERCASE"}],
                "PositionalConstraint": "CONTAINS",
            }
        })
    }

    /// A lowercased exact match on the Host header.
    fn host_statement(host_equals: &str) -> serde_json::Value {
        json!({
            "ByteMatchStatement": {
                "SearchString": host_equals,
                "FieldToMatch": {"SingleHeader": {"Name": "host"}},
                "TextTransformations": [{"Priority": 0, "Type": "LOWERCASE"}],
                "PositionalConstraint": "EXACTLY",
            }
        })
    }

    fn visibility(metric_name: &str) -> serde_json::Value {
        json!({
            "CloudWatchMetricsEnabled": true,
            "SampledRequestsEnabled": true,
            "MetricName": metric_name,
        })
    }

    /// Renders the rule into the WebACL `Rules` entry shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::ManagedRuleGroup {
                name,
                priority,
                group,
                excluded_rules,
                bot_control,
            } => {
                let mut statement = json!({
                    "VendorName": "AWS",
                    "Name": group,
                });
                if !excluded_rules.is_empty() {
                    statement["ExcludedRules"] = excluded_rules
                        .iter()
                        .map(|rule| json!({"Name": rule}))
                        .collect();
                }
                if *bot_control {
                    statement["ManagedRuleGroupConfigs"] = json!([{
                        "AWSManagedRulesBotControlRuleSet": {
                            "InspectionLevel": "TARGETED",
                            "EnableMachineLearning": true,
                        }
                    }]);
                }
                json!({
                    "Name": name,
                    "Priority": priority,
                    "Statement": {"ManagedRuleGroupStatement": statement},
                    "OverrideAction": {"None": {}},
                    "VisibilityConfig": Self::visibility(name),
                })
            }
            Self::HostPathAllow {
                name,
                priority,
                host_equals,
                path_contains,
            } => json!({
                "Name": name,
                "Priority": priority,
                "Statement": {
                    "AndStatement": {
                        "Statements": [
                            Self::host_statement(host_equals),
                            Self::path_statement(path_contains),
                        ]
                    }
                },
                "Action": {"Allow": {}},
                "VisibilityConfig": Self::visibility(name),
            }),
            Self::PathBlock {
                name,
                priority,
                path_contains,
                response_body_key,
            } => json!({
                "Name": name,
                "Priority": priority,
                "Statement": Self::path_statement(path_contains),
                "Action": {
                    "Block": {
                        "CustomResponse": {
                            "ResponseCode": 403,
                            "CustomResponseBodyKey": response_body_key,
                        }
                    }
                },
                "VisibilityConfig": Self::visibility(name),
            }),
        }
    }
}

/// Rejects ladders where two rules claim the same priority.
pub fn validate_priorities(rules: &[WafRule]) -> Result<(), SynthError> {
    let mut seen: HashMap<u32, &str> = HashMap::new();
    for rule in rules {
        if let Some(first) = seen.insert(rule.priority(), rule.name()) {
            return Err(SynthError::DuplicateRulePriority {
                priority: rule.priority(),
                first: first.to_string(),
                second: rule.name().to_string(),
            });
        }
    }
    Ok(())
}

/// The full rule ladder protecting the distribution.
///
/// Priorities 1-5 are AWS-managed groups, 6 allows admin sign-in through the
/// origin hostname, 7 is bot control except where the policy pins a public
/// host that must keep admin access, and 8 blocks admin sign-in for everyone
/// else.
#[must_use]
pub fn rule_ladder(prefix: &str, policy: &StagePolicy) -> Vec<WafRule> {
    let managed = |priority: u32, group: &'static str, excluded: Vec<&'static str>| {
        WafRule::ManagedRuleGroup {
            name: format!("{prefix}-{group}"),
            priority,
            group,
            excluded_rules: excluded,
            bot_control: false,
        }
    };

    let mut rules = vec![
        managed(
            1,
            "AWSManagedRulesCommonRuleSet",
            vec![
                "CrossSiteScripting_BODY",
                "SizeRestrictions_BODY",
                "GenericRFI_BODY",
            ],
        ),
        managed(2, "AWSManagedRulesKnownBadInputsRuleSet", vec![]),
        managed(3, "AWSManagedRulesAmazonIpReputationList", vec![]),
        managed(4, "AWSManagedRulesLinuxRuleSet", vec![]),
        managed(5, "AWSManagedRulesSQLiRuleSet", vec!["SQLi_BODY"]),
        WafRule::HostPathAllow {
            name: format!("{prefix}-AllowSystemLogin"),
            priority: 6,
            host_equals: format!("{prefix}-alb-origin"),
            path_contains: "system/admins/sign_in",
        },
    ];

    if let Some(host) = policy.waf_host_allow {
        rules.push(WafRule::HostPathAllow {
            name: "production-AllowSystemLogin".to_string(),
            priority: 7,
            host_equals: host.to_string(),
            path_contains: "system/admins/sign_in",
        });
    } else {
        rules.push(WafRule::ManagedRuleGroup {
            name: format!("{prefix}-BlockAllBots"),
            priority: 7,
            group: "AWSManagedRulesBotControlRuleSet",
            excluded_rules: vec![],
            bot_control: true,
        });
    }

    rules.push(WafRule::PathBlock {
        name: format!("{prefix}-SystemLoginBlock"),
        priority: 8,
        path_contains: "system/admins/sign_in",
        response_body_key: DISABLE_ACTION_BODY_KEY,
    });
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;

    fn ladder(stage: Stage) -> Vec<WafRule> {
        rule_ladder(&format!("{stage}-decidim"), &stage.policy())
    }

    #[test]
    fn test_ladder_priorities_are_contiguous_and_unique() {
        for stage in Stage::ALL {
            let rules = ladder(stage);
            validate_priorities(&rules).unwrap();
            let priorities: Vec<u32> = rules.iter().map(WafRule::priority).collect();
            assert_eq!(priorities, vec![1, 2, 3, 4, 5, 6, 7, 8], "{stage}");
        }
    }

    #[test]
    fn test_host_allow_substitutes_bot_control() {
        let rules = ladder(Stage::PrdV0292);
        match &rules[6] {
            WafRule::HostPathAllow { host_equals, name, .. } => {
                assert_eq!(host_equals, "production.diycities.jp");
                assert_eq!(name, "production-AllowSystemLogin");
            }
            other => panic!("expected host allow at priority 7, got {other:?}"),
        }

        let rules = ladder(Stage::Staging);
        match &rules[6] {
            WafRule::ManagedRuleGroup { group, bot_control, .. } => {
                assert_eq!(*group, "AWSManagedRulesBotControlRuleSet");
                assert!(bot_control);
            }
            other => panic!("expected bot control at priority 7, got {other:?}"),
        }
    }

    #[test]
    fn test_common_rule_set_excludes_body_inspections() {
        let rules = ladder(Stage::Dev);
        let rendered = rules[0].to_json();
        let excluded = rendered["Statement"]["ManagedRuleGroupStatement"]["ExcludedRules"]
            .as_array()
            .unwrap();
        let names: Vec<&str> = excluded.iter().filter_map(|e| e["Name"].as_str()).collect();
        assert_eq!(
            names,
            vec!["CrossSiteScripting_BODY", "SizeRestrictions_BODY", "GenericRFI_BODY"]
        );
        // Groups without exclusions omit the key entirely.
        assert!(rules[1].to_json()["Statement"]["ManagedRuleGroupStatement"]
            .get("ExcludedRules")
            .is_none());
    }

    #[test]
    fn test_system_login_block_serves_custom_response() {
        let rules = ladder(Stage::Staging);
        let block = rules.last().unwrap().to_json();
        assert_eq!(
            block["Action"]["Block"]["CustomResponse"]["CustomResponseBodyKey"],
            DISABLE_ACTION_BODY_KEY
        );
        assert_eq!(block["Action"]["Block"]["CustomResponse"]["ResponseCode"], 403);
        assert_eq!(
            block["Statement"]["ByteMatchStatement"]["PositionalConstraint"],
            "CONTAINS"
        );
    }

    #[test]
    fn test_duplicate_priorities_are_rejected() {
        let rules = vec![
            WafRule::PathBlock {
                name: "a".to_string(),
                priority: 3,
                path_contains: "x",
                response_body_key: DISABLE_ACTION_BODY_KEY,
            },
            WafRule::PathBlock {
                name: "b".to_string(),
                priority: 3,
                path_contains: "y",
                response_body_key: DISABLE_ACTION_BODY_KEY,
            },
        ];
        let err = validate_priorities(&rules).unwrap_err();
        assert!(matches!(
            err,
            SynthError::DuplicateRulePriority { priority: 3, .. }
        ));
    }
}
