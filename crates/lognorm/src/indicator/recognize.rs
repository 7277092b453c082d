use std::net::IpAddr;

use super::{IndicatorKind, IndicatorSet};

/// Recognizes indicator values in free-form strings.
///
/// Implementations must be total and side-effect free: a value that does not
/// match contributes nothing. A recognizer may contribute more than one kind.
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &'static str;
    fn recognize(&self, value: &str, out: &mut IndicatorSet);
}

/// The ordered set of recognizers offered every embedded string leaf.
pub struct Recognizers {
    recognizers: Vec<Box<dyn Recognizer>>,
}

impl Recognizers {
    pub fn empty() -> Self {
        Self {
            recognizers: Vec::new(),
        }
    }

    /// Network addresses, account IDs, ARNs and instance IDs.
    pub fn builtin() -> Self {
        Self::empty()
            .with(IpRecognizer)
            .with(AccountIdRecognizer)
            .with(ArnRecognizer)
            .with(InstanceIdRecognizer)
    }

    pub fn with(mut self, recognizer: impl Recognizer + 'static) -> Self {
        self.recognizers.push(Box::new(recognizer));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    #[inline]
    pub fn recognize(&self, value: &str, out: &mut IndicatorSet) {
        for recognizer in &self.recognizers {
            recognizer.recognize(value, out);
        }
    }
}

impl Default for Recognizers {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Recognizers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

pub struct IpRecognizer;

impl Recognizer for IpRecognizer {
    fn name(&self) -> &'static str {
        "ip_address"
    }

    fn recognize(&self, value: &str, out: &mut IndicatorSet) {
        if value.parse::<IpAddr>().is_ok() {
            out.insert(IndicatorKind::IpAddress, value);
        }
    }
}

pub struct AccountIdRecognizer;

impl Recognizer for AccountIdRecognizer {
    fn name(&self) -> &'static str {
        "aws_account_id"
    }

    fn recognize(&self, value: &str, out: &mut IndicatorSet) {
        if is_account_id(value) {
            out.insert(IndicatorKind::AwsAccountId, value);
        }
    }
}

/// Matches `arn:partition:service:region:account:resource`. The resource
/// segment may itself contain colons. A 12-digit account segment is also
/// contributed as an account ID.
pub struct ArnRecognizer;

const PARTITIONS: &[&str] = &[
    "aws",
    "aws-cn",
    "aws-us-gov",
    "aws-iso",
    "aws-iso-b",
    "aws-iso-e",
    "aws-iso-f",
];

impl Recognizer for ArnRecognizer {
    fn name(&self) -> &'static str {
        "aws_arn"
    }

    fn recognize(&self, value: &str, out: &mut IndicatorSet) {
        if let Some(account) = parse_arn(value) {
            out.insert(IndicatorKind::AwsArn, value);
            if is_account_id(account) {
                out.insert(IndicatorKind::AwsAccountId, account);
            }
        }
    }
}

pub struct InstanceIdRecognizer;

impl Recognizer for InstanceIdRecognizer {
    fn name(&self) -> &'static str {
        "aws_instance_id"
    }

    fn recognize(&self, value: &str, out: &mut IndicatorSet) {
        let Some(hex) = value.strip_prefix("i-") else {
            return;
        };
        if matches!(hex.len(), 8 | 17)
            && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            out.insert(IndicatorKind::AwsInstanceId, value);
        }
    }
}

fn is_account_id(value: &str) -> bool {
    value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Returns the account segment of a well-formed ARN.
fn parse_arn(value: &str) -> Option<&str> {
    let mut parts = value.splitn(6, ':');
    if parts.next()? != "arn" {
        return None;
    }
    let partition = parts.next()?;
    let service = parts.next()?;
    let region = parts.next()?;
    let account = parts.next()?;
    let resource = parts.next()?;

    if !PARTITIONS.contains(&partition) {
        return None;
    }
    if service.is_empty()
        || !service
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return None;
    }
    if !region.is_empty() && !is_region(region) {
        return None;
    }
    if !(account.is_empty() || account == "aws" || is_account_id(account)) {
        return None;
    }
    if resource.is_empty() {
        return None;
    }
    Some(account)
}

/// `us-east-1`, `us-gov-west-1`, `ap-southeast-2`, ...
fn is_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    let (first, rest) = (parts[0], &parts[1..]);
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return false,
    };
    first.len() == 2
        && first.bytes().all(|b| b.is_ascii_lowercase())
        && middle
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_lowercase()))
        && !last.is_empty()
        && last.bytes().all(|b| b.is_ascii_digit())
}
