use std::net::IpAddr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum IndicatorKind {
    /// IPv4 or IPv6 network address
    IpAddress,
    /// DNS name
    DomainName,
    /// 12-digit AWS account identifier
    AwsAccountId,
    /// AWS resource name (`arn:partition:service:region:account:resource`)
    AwsArn,
    /// EC2 instance identifier (`i-` + hex)
    AwsInstanceId,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::IpAddress,
        IndicatorKind::DomainName,
        IndicatorKind::AwsAccountId,
        IndicatorKind::AwsArn,
        IndicatorKind::AwsInstanceId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::IpAddress => "ip_address",
            IndicatorKind::DomainName => "domain_name",
            IndicatorKind::AwsAccountId => "aws_account_id",
            IndicatorKind::AwsArn => "aws_arn",
            IndicatorKind::AwsInstanceId => "aws_instance_id",
        }
    }

    /// Name of the result field holding every value of this kind.
    pub fn field_name(&self) -> &'static str {
        match self {
            IndicatorKind::IpAddress => "p_any_ip_addresses",
            IndicatorKind::DomainName => "p_any_domain_names",
            IndicatorKind::AwsAccountId => "p_any_aws_account_ids",
            IndicatorKind::AwsArn => "p_any_aws_arns",
            IndicatorKind::AwsInstanceId => "p_any_aws_instance_ids",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.field_name() == name)
    }

    /// Structural check applied to statically tagged values.
    ///
    /// Schema tags assert the semantic kind, but network-address fields are
    /// free text (AWS reports service DNS names in `sourceIPAddress`), so
    /// addresses are still shape-checked before they are accepted.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            IndicatorKind::IpAddress => value.parse::<IpAddr>().is_ok(),
            _ => !value.is_empty(),
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
