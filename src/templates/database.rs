// Copyright (c) 2025 - Cowboy AI, Inc.
//! Database and Cache Template
//!
//! # Topology
//!
//! ```text
//! DataVpc ──┬── CacheSecurityGroup ──> CacheIngressFromVpc
//!           │           └──> CacheCluster
//!           ├── DatabaseSecurityGroup ──┐
//!           │                           ├──> Database
//!           └── DatabaseSecret ─────────┘
//! ```
//!
//! The cache accepts its port from the whole VPC range. The database sits in
//! the private subnets, is never publicly reachable and takes its master
//! credentials from a generated secret.

use serde_json::json;

use super::props;
use crate::config::SynthesizerConfig;
use crate::domain::{attr, PropertyValue, ResourceKind};
use crate::errors::StackResult;
use crate::stack::Stack;

/// Inputs for [`database_stack`]
#[derive(Debug, Clone)]
pub struct DatabaseProps {
    pub vpc_cidr: String,
    pub cache_node_type: String,
    pub cache_port: u16,
    pub engine: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub database_port: u16,
    pub monitoring_interval_secs: u32,
}

impl Default for DatabaseProps {
    fn default() -> Self {
        Self {
            vpc_cidr: "10.0.0.0/16".to_string(),
            cache_node_type: "cache.t2.micro".to_string(),
            cache_port: 6379,
            engine: "postgres".to_string(),
            instance_class: "db.t2.micro".to_string(),
            allocated_storage: 20,
            database_port: 5432,
            monitoring_interval_secs: 60,
        }
    }
}

/// Declare the database and cache stack
pub fn database_stack(p: &DatabaseProps, config: &SynthesizerConfig) -> StackResult<Stack> {
    let env = config.environment.as_str();
    let project = config.project.as_str();
    let mut stack = Stack::new(format!("{}-{}-data", env, project));

    let vpc = stack.declare(
        ResourceKind::Vpc,
        "DataVpc",
        props([
            ("CidrBlock", p.vpc_cidr.clone().into()),
            ("MaxAzs", json!(2).into()),
            (
                "SubnetConfiguration",
                json!([
                    {"CidrMask": 24, "Name": "Public", "SubnetType": "PUBLIC"},
                    {"CidrMask": 24, "Name": "Private", "SubnetType": "PRIVATE_WITH_EGRESS"}
                ])
                .into(),
            ),
        ]),
    )?;

    let cache_group = stack.declare(
        ResourceKind::SecurityGroup,
        "CacheSecurityGroup",
        props([
            ("GroupName", format!("{env}-{project}-cache").into()),
            ("GroupDescription", "Security group for the cache cluster".into()),
            ("VpcId", vpc.physical_id()),
        ]),
    )?;

    stack.declare(
        ResourceKind::SecurityGroupIngress,
        "CacheIngressFromVpc",
        props([
            ("GroupId", cache_group.output(attr::SECURITY_GROUP_ID)),
            ("CidrIp", p.vpc_cidr.clone().into()),
            ("IpProtocol", "tcp".into()),
            ("FromPort", json!(p.cache_port).into()),
            ("ToPort", json!(p.cache_port).into()),
            ("Description", "Allow inbound from VPC".into()),
        ]),
    )?;

    stack.declare(
        ResourceKind::CacheCluster,
        "CacheCluster",
        props([
            ("ClusterName", format!("{env}-{project}-cache").into()),
            ("CacheNodeType", p.cache_node_type.clone().into()),
            ("Engine", "redis".into()),
            ("NumCacheNodes", json!(1).into()),
            ("Port", json!(p.cache_port).into()),
            (
                "VpcSecurityGroupIds",
                PropertyValue::List(vec![cache_group.output(attr::SECURITY_GROUP_ID)]),
            ),
        ]),
    )?;

    let db_group = stack.declare(
        ResourceKind::SecurityGroup,
        "DatabaseSecurityGroup",
        props([
            ("GroupName", format!("{env}-{project}-database").into()),
            ("GroupDescription", "Security group for the database".into()),
            ("VpcId", vpc.physical_id()),
        ]),
    )?;

    let secret = stack.declare(
        ResourceKind::Secret,
        "DatabaseSecret",
        props([
            ("Name", format!("{env}/{project}/database").into()),
            ("Description", "Master credentials for the database".into()),
            (
                "GenerateSecretString",
                json!({
                    "SecretStringTemplate": "{\"username\":\"postgres\"}",
                    "GenerateStringKey": "password",
                    "ExcludePunctuation": true,
                    "PasswordLength": 32
                })
                .into(),
            ),
        ]),
    )?;

    stack.declare(
        ResourceKind::DatabaseInstance,
        "Database",
        props([
            ("DBInstanceIdentifier", format!("{env}-{project}-db").into()),
            ("Engine", p.engine.clone().into()),
            ("DBInstanceClass", p.instance_class.clone().into()),
            ("AllocatedStorage", json!(p.allocated_storage).into()),
            ("Port", json!(p.database_port).into()),
            ("SubnetIds", vpc.output("PrivateSubnetIds")),
            (
                "VPCSecurityGroups",
                PropertyValue::List(vec![db_group.output(attr::SECURITY_GROUP_ID)]),
            ),
            ("MasterUserSecret", secret.arn()),
            ("AllowMajorVersionUpgrade", true.into()),
            ("AutoMinorVersionUpgrade", true.into()),
            ("StorageEncrypted", true.into()),
            ("MonitoringInterval", json!(p.monitoring_interval_secs).into()),
            ("EnablePerformanceInsights", true.into()),
            ("PubliclyAccessible", false.into()),
            ("DeletionPolicy", "Delete".into()),
        ]),
    )?;

    stack.add_output("DatabaseEndpoint", "Database", attr::ENDPOINT)?;
    stack.add_output("DatabaseSecretArn", "DatabaseSecret", attr::ARN)?;
    stack.add_output("CacheEndpoint", "CacheCluster", attr::ENDPOINT)?;

    Ok(stack)
}
