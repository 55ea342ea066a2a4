// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Kind Taxonomy
//!
//! Tagged-variant vocabulary for every resource a stack can declare.
//! Providers are dispatched on the kind, and cross-cutting behavior is
//! selected through the capability set {Taggable, Connectable, Grantable}
//! instead of a type hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    // Compute
    /// Serverless function
    Function,

    // API
    /// REST API
    RestApi,
    /// Method on a REST API resource path
    ApiMethod,
    /// API key
    ApiKey,
    /// Usage plan with throttle and quota
    UsagePlan,
    /// Custom domain name for an API
    DomainName,
    /// Mapping of a custom domain onto an API stage
    BasePathMapping,

    // DNS / certificates
    /// TLS certificate
    Certificate,
    /// DNS hosted zone
    HostedZone,
    /// DNS record set
    RecordSet,

    // Data
    /// Cache cluster
    CacheCluster,
    /// Cache subnet group
    CacheSubnetGroup,
    /// Relational database instance
    DatabaseInstance,
    /// Stored secret
    Secret,

    // Network
    /// Virtual private cloud
    Vpc,
    /// VPC endpoint
    VpcEndpoint,
    /// Security group
    SecurityGroup,
    /// Ingress rule on a security group
    SecurityGroupIngress,

    // Identity
    /// IAM role
    Role,
    /// Inline IAM policy
    Policy,
    /// Resource-based invoke permission
    Permission,

    // Messaging
    /// Notification topic
    Topic,

    // Security / observability
    /// Web application firewall ACL
    WebAcl,
    /// Association of a web ACL with a stage
    WebAclAssociation,
    /// Log group
    LogGroup,
}

/// Cross-cutting capability a resource kind may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Accepts stack tags
    Taggable,
    /// Sits behind a security group and accepts ingress wiring
    Connectable,
    /// Can be the target of a least-privilege grant
    Grantable,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taggable => "taggable",
            Self::Connectable => "connectable",
            Self::Grantable => "grantable",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of access a grant gives a principal over a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Publish,
    Subscribe,
    Invoke,
    Read,
    Write,
    Connect,
}

impl ResourceKind {
    /// All kinds, in declaration order of the enum
    pub const ALL: [ResourceKind; 25] = [
        Self::Function,
        Self::RestApi,
        Self::ApiMethod,
        Self::ApiKey,
        Self::UsagePlan,
        Self::DomainName,
        Self::BasePathMapping,
        Self::Certificate,
        Self::HostedZone,
        Self::RecordSet,
        Self::CacheCluster,
        Self::CacheSubnetGroup,
        Self::DatabaseInstance,
        Self::Secret,
        Self::Vpc,
        Self::VpcEndpoint,
        Self::SecurityGroup,
        Self::SecurityGroupIngress,
        Self::Role,
        Self::Policy,
        Self::Permission,
        Self::Topic,
        Self::WebAcl,
        Self::WebAclAssociation,
        Self::LogGroup,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::RestApi => "rest-api",
            Self::ApiMethod => "api-method",
            Self::ApiKey => "api-key",
            Self::UsagePlan => "usage-plan",
            Self::DomainName => "domain-name",
            Self::BasePathMapping => "base-path-mapping",
            Self::Certificate => "certificate",
            Self::HostedZone => "hosted-zone",
            Self::RecordSet => "record-set",
            Self::CacheCluster => "cache-cluster",
            Self::CacheSubnetGroup => "cache-subnet-group",
            Self::DatabaseInstance => "database-instance",
            Self::Secret => "secret",
            Self::Vpc => "vpc",
            Self::VpcEndpoint => "vpc-endpoint",
            Self::SecurityGroup => "security-group",
            Self::SecurityGroupIngress => "security-group-ingress",
            Self::Role => "role",
            Self::Policy => "policy",
            Self::Permission => "permission",
            Self::Topic => "topic",
            Self::WebAcl => "web-acl",
            Self::WebAclAssociation => "web-acl-association",
            Self::LogGroup => "log-group",
        }
    }

    /// Parse from the canonical string representation
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Service namespace used in ARNs and IAM actions
    pub fn service(&self) -> &'static str {
        match self {
            Self::Function | Self::Permission => "lambda",
            Self::RestApi
            | Self::ApiMethod
            | Self::ApiKey
            | Self::UsagePlan
            | Self::DomainName
            | Self::BasePathMapping => "apigateway",
            Self::Certificate => "acm",
            Self::HostedZone | Self::RecordSet => "route53",
            Self::CacheCluster | Self::CacheSubnetGroup => "elasticache",
            Self::DatabaseInstance => "rds",
            Self::Secret => "secretsmanager",
            Self::Vpc | Self::VpcEndpoint | Self::SecurityGroup | Self::SecurityGroupIngress => {
                "ec2"
            }
            Self::Role | Self::Policy => "iam",
            Self::Topic => "sns",
            Self::WebAcl | Self::WebAclAssociation => "wafv2",
            Self::LogGroup => "logs",
        }
    }

    /// Capabilities supported by this kind
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;

        match self {
            Self::Function => &[Taggable, Connectable, Grantable],
            Self::CacheCluster | Self::VpcEndpoint | Self::SecurityGroup => {
                &[Taggable, Connectable]
            }
            Self::DatabaseInstance => &[Taggable, Connectable, Grantable],
            Self::RestApi | Self::Topic | Self::Secret | Self::LogGroup => &[Taggable, Grantable],
            Self::ApiKey
            | Self::UsagePlan
            | Self::DomainName
            | Self::Certificate
            | Self::HostedZone
            | Self::CacheSubnetGroup
            | Self::Vpc
            | Self::Role
            | Self::WebAcl => &[Taggable],
            Self::ApiMethod
            | Self::BasePathMapping
            | Self::RecordSet
            | Self::SecurityGroupIngress
            | Self::Policy
            | Self::Permission
            | Self::WebAclAssociation => &[],
        }
    }

    /// Check whether this kind supports a capability
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Least-privilege action set for an access kind on this resource kind
    ///
    /// Returns `None` when the combination is not meaningful, e.g. publishing
    /// to a function.
    pub fn grant_actions(&self, access: Access) -> Option<&'static [&'static str]> {
        match (self, access) {
            (Self::Topic, Access::Publish) => Some(&["sns:Publish"]),
            (Self::Topic, Access::Subscribe) => Some(&["sns:Subscribe", "sns:GetTopicAttributes"]),
            (Self::Function, Access::Invoke) => Some(&["lambda:InvokeFunction"]),
            (Self::RestApi, Access::Invoke) => Some(&["execute-api:Invoke"]),
            (Self::Secret, Access::Read) => {
                Some(&["secretsmanager:GetSecretValue", "secretsmanager:DescribeSecret"])
            }
            (Self::DatabaseInstance, Access::Connect) => Some(&["rds-db:connect"]),
            (Self::LogGroup, Access::Write) => Some(&[
                "logs:CreateLogGroup",
                "logs:CreateLogStream",
                "logs:PutLogEvents",
            ]),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
