//! AWS CloudTrail: all events of a delivery arrive as one JSON document with
//! the individual records in an array under `Records`.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

use crate::field::{NullBool, NullRaw, NullString, NullTime, Nullable};
use crate::indicator::IndicatorKind;
use crate::parser::traits::*;
use crate::parser::ResultBuilder;
use crate::schema::{FieldRef, FieldSpec, Rule, Schema, Schematic};

pub const LOG_TYPE: &str = "AWS.CloudTrail";

const ENVELOPE_KEY: &str = "Records";

/// One entry of `Records[*]`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrail {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub additional_event_data: NullRaw,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub api_version: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub aws_region: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub error_code: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub error_message: NullString,
    #[serde(rename = "eventID", default, skip_serializing_if = "Nullable::is_absent")]
    pub event_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub event_name: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub event_source: NullString,
    #[serde(
        default,
        skip_serializing_if = "Nullable::is_absent",
        with = "crate::field::time::rfc3339"
    )]
    pub event_time: NullTime,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub event_type: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub event_version: NullString,
    #[serde(
        default,
        skip_serializing_if = "Nullable::is_absent",
        with = "crate::field::nullable::text_bool"
    )]
    pub management_event: NullBool,
    #[serde(
        default,
        skip_serializing_if = "Nullable::is_absent",
        with = "crate::field::nullable::text_bool"
    )]
    pub read_only: NullBool,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub recipient_account_id: NullString,
    #[serde(rename = "requestID", default, skip_serializing_if = "Nullable::is_absent")]
    pub request_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub request_parameters: NullRaw,
    #[serde(
        default,
        skip_serializing_if = "Nullable::is_absent",
        deserialize_with = "crate::field::nullable::null_items_as_default"
    )]
    pub resources: Nullable<Vec<CloudTrailResource>>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub response_elements: NullRaw,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub service_event_details: NullRaw,
    #[serde(rename = "sharedEventID", default, skip_serializing_if = "Nullable::is_absent")]
    pub shared_event_id: NullString,
    #[serde(rename = "sourceIPAddress", default, skip_serializing_if = "Nullable::is_absent")]
    pub source_ip_address: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub user_agent: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub user_identity: Nullable<Box<CloudTrailUserIdentity>>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub vpc_endpoint_id: NullString,
}

/// An AWS resource touched by the call.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailResource {
    #[serde(
        rename = "ARN",
        alias = "arn",
        default,
        skip_serializing_if = "Nullable::is_absent"
    )]
    pub arn: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub account_id: NullString,
    #[serde(rename = "type", default, skip_serializing_if = "Nullable::is_absent")]
    pub resource_type: NullString,
}

/// The IAM identity that made the request.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailUserIdentity {
    #[serde(rename = "type", default, skip_serializing_if = "Nullable::is_absent")]
    pub identity_type: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub principal_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub arn: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub account_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub access_key_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub user_name: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub session_context: Nullable<Box<CloudTrailSessionContext>>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub invoked_by: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub identity_provider: NullString,
}

/// Present when the request was made with temporary credentials.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailSessionContext {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub attributes: Nullable<Box<SessionContextAttributes>>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub session_issuer: Nullable<Box<SessionContextSessionIssuer>>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub web_id_federation_data: Nullable<Box<WebIdFederationData>>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContextAttributes {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub mfa_authenticated: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub creation_date: NullString,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContextSessionIssuer {
    #[serde(rename = "type", default, skip_serializing_if = "Nullable::is_absent")]
    pub issuer_type: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub principal_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub arn: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub account_id: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub user_name: NullString,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebIdFederationData {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub federated_provider: NullString,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub attributes: NullRaw,
}

impl Schematic for CloudTrail {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<CloudTrail>> = LazyLock::new(|| {
            type Spec = FieldSpec<CloudTrail>;
            Schema::new(LOG_TYPE)
                .field(Spec::new("additionalEventData", |e| {
                    FieldRef::Raw(&e.additional_event_data)
                }))
                .field(Spec::new("apiVersion", |e| FieldRef::String(&e.api_version)))
                .field(Spec::new("awsRegion", |e| FieldRef::String(&e.aws_region)).required())
                .field(Spec::new("errorCode", |e| FieldRef::String(&e.error_code)))
                .field(Spec::new("errorMessage", |e| FieldRef::String(&e.error_message)))
                .field(Spec::new("eventID", |e| FieldRef::String(&e.event_id)).required())
                .field(Spec::new("eventName", |e| FieldRef::String(&e.event_name)).required())
                .field(Spec::new("eventSource", |e| FieldRef::String(&e.event_source)).required())
                .field(
                    Spec::new("eventTime", |e| FieldRef::Time(&e.event_time))
                        .required()
                        .event_time(),
                )
                .field(Spec::new("eventType", |e| FieldRef::String(&e.event_type)).required())
                .field(Spec::new("eventVersion", |e| FieldRef::String(&e.event_version)).required())
                .field(Spec::new("managementEvent", |e| FieldRef::Bool(&e.management_event)))
                .field(Spec::new("readOnly", |e| FieldRef::Bool(&e.read_only)))
                .field(
                    Spec::new("recipientAccountId", |e| FieldRef::String(&e.recipient_account_id))
                        .rule(Rule::Len(12))
                        .rule(Rule::Numeric)
                        .indicator(IndicatorKind::AwsAccountId),
                )
                .field(Spec::new("requestID", |e| FieldRef::String(&e.request_id)))
                .field(Spec::new("requestParameters", |e| FieldRef::Raw(&e.request_parameters)))
                .field(Spec::new("resources", |e| FieldRef::list(&e.resources)))
                .field(Spec::new("responseElements", |e| FieldRef::Raw(&e.response_elements)))
                .field(Spec::new("serviceEventDetails", |e| {
                    FieldRef::Raw(&e.service_event_details)
                }))
                .field(Spec::new("sharedEventID", |e| FieldRef::String(&e.shared_event_id)))
                .field(
                    Spec::new("sourceIPAddress", |e| FieldRef::String(&e.source_ip_address))
                        .required()
                        .indicator(IndicatorKind::IpAddress),
                )
                .field(Spec::new("userAgent", |e| FieldRef::String(&e.user_agent)))
                .field(Spec::new("userIdentity", |e| FieldRef::nested(&e.user_identity)).required())
                .field(Spec::new("vpcEndpointId", |e| FieldRef::String(&e.vpc_endpoint_id)))
        });
        &SCHEMA
    }
}

impl Schematic for CloudTrailResource {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<CloudTrailResource>> = LazyLock::new(|| {
            type Spec = FieldSpec<CloudTrailResource>;
            Schema::new("CloudTrailResource")
                .field(
                    Spec::new("ARN", |e| FieldRef::String(&e.arn))
                        .indicator(IndicatorKind::AwsArn),
                )
                .field(
                    Spec::new("accountId", |e| FieldRef::String(&e.account_id))
                        .indicator(IndicatorKind::AwsAccountId),
                )
                .field(Spec::new("type", |e| FieldRef::String(&e.resource_type)))
        });
        &SCHEMA
    }
}

impl Schematic for CloudTrailUserIdentity {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<CloudTrailUserIdentity>> = LazyLock::new(|| {
            type Spec = FieldSpec<CloudTrailUserIdentity>;
            Schema::new("CloudTrailUserIdentity")
                .field(Spec::new("type", |e| FieldRef::String(&e.identity_type)))
                .field(Spec::new("principalId", |e| FieldRef::String(&e.principal_id)))
                .field(
                    Spec::new("arn", |e| FieldRef::String(&e.arn))
                        .indicator(IndicatorKind::AwsArn),
                )
                .field(
                    Spec::new("accountId", |e| FieldRef::String(&e.account_id))
                        .indicator(IndicatorKind::AwsAccountId),
                )
                .field(Spec::new("accessKeyId", |e| FieldRef::String(&e.access_key_id)))
                .field(Spec::new("userName", |e| FieldRef::String(&e.user_name)))
                .field(Spec::new("sessionContext", |e| FieldRef::nested(&e.session_context)))
                .field(Spec::new("invokedBy", |e| FieldRef::String(&e.invoked_by)))
                .field(Spec::new("identityProvider", |e| FieldRef::String(&e.identity_provider)))
        });
        &SCHEMA
    }
}

impl Schematic for CloudTrailSessionContext {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<CloudTrailSessionContext>> = LazyLock::new(|| {
            type Spec = FieldSpec<CloudTrailSessionContext>;
            Schema::new("CloudTrailSessionContext")
                .field(Spec::new("attributes", |e| FieldRef::nested(&e.attributes)))
                .field(Spec::new("sessionIssuer", |e| FieldRef::nested(&e.session_issuer)))
                .field(Spec::new("webIdFederationData", |e| {
                    FieldRef::nested(&e.web_id_federation_data)
                }))
        });
        &SCHEMA
    }
}

impl Schematic for SessionContextAttributes {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<SessionContextAttributes>> = LazyLock::new(|| {
            type Spec = FieldSpec<SessionContextAttributes>;
            Schema::new("SessionContextAttributes")
                .field(Spec::new("mfaAuthenticated", |e| FieldRef::String(&e.mfa_authenticated)))
                .field(Spec::new("creationDate", |e| FieldRef::String(&e.creation_date)))
        });
        &SCHEMA
    }
}

impl Schematic for SessionContextSessionIssuer {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<SessionContextSessionIssuer>> = LazyLock::new(|| {
            type Spec = FieldSpec<SessionContextSessionIssuer>;
            Schema::new("SessionContextSessionIssuer")
                .field(Spec::new("type", |e| FieldRef::String(&e.issuer_type)))
                .field(Spec::new("principalId", |e| FieldRef::String(&e.principal_id)))
                .field(
                    Spec::new("arn", |e| FieldRef::String(&e.arn))
                        .indicator(IndicatorKind::AwsArn),
                )
                .field(
                    Spec::new("accountId", |e| FieldRef::String(&e.account_id))
                        .indicator(IndicatorKind::AwsAccountId),
                )
                .field(Spec::new("userName", |e| FieldRef::String(&e.user_name)))
        });
        &SCHEMA
    }
}

impl Schematic for WebIdFederationData {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<WebIdFederationData>> = LazyLock::new(|| {
            type Spec = FieldSpec<WebIdFederationData>;
            Schema::new("WebIdFederationData")
                .field(Spec::new("federatedProvider", |e| FieldRef::String(&e.federated_provider)))
                .field(Spec::new("attributes", |e| FieldRef::Raw(&e.attributes)))
        });
        &SCHEMA
    }
}

/// Only the envelope key is decoded eagerly; records stay raw until their
/// turn so a failure can name its position.
#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "Records", borrow, default)]
    records: Nullable<Vec<&'a RawValue>>,
}

/// CloudTrail parser
pub struct CloudTrailParser {
    builder: ResultBuilder,
}

impl CloudTrailParser {
    pub fn new() -> Self {
        Self {
            builder: ResultBuilder::new(),
        }
    }

    pub fn with_builder(builder: ResultBuilder) -> Self {
        Self { builder }
    }
}

impl Default for CloudTrailParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser for CloudTrailParser {
    fn parse(&self, raw: &str) -> Result<Vec<NormalizedRecord>, ParseError> {
        // Quick reject: the envelope must be an object
        if !raw.trim_start().starts_with('{') {
            return Err(ParseError::InvalidFormat(
                "CloudTrail log is not a JSON object".to_string(),
            ));
        }

        let envelope: Envelope<'_> = serde_json::from_str(raw).map_err(ParseError::InvalidJson)?;
        let records = match envelope.records {
            Nullable::Value(records) => records,
            Nullable::Null => return Ok(Vec::new()),
            Nullable::Absent => return Err(ParseError::MissingEnvelope(ENVELOPE_KEY)),
        };

        let mut results = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let event: CloudTrail = serde_json::from_str(record.get())
                .map_err(|source| ParseError::Decode { index, source })?;
            let result = self
                .builder
                .build(LOG_TYPE, &event)
                .map_err(|e| ParseError::from_build(index, e))?;
            debug!(record = index, row_id = result.row_id(), "Built CloudTrail result");
            results.push(result);
        }
        Ok(results)
    }

    fn log_type(&self) -> &str {
        LOG_TYPE
    }
}
