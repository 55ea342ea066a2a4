// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Cluster Template
//!
//! A cache cluster inside a dedicated VPC. Application workloads reach the
//! cluster through an explicit security-group ingress rule on the cache port.

use serde_json::json;

use super::props;
use crate::config::SynthesizerConfig;
use crate::domain::{attr, PropertyValue, ResourceKind};
use crate::errors::StackResult;
use crate::stack::Stack;

/// Inputs for [`cache_stack`]
#[derive(Debug, Clone)]
pub struct CacheProps {
    pub cluster_name: String,
    pub node_type: String,
    pub engine: String,
    pub port: u16,
    pub node_count: u32,
}

impl Default for CacheProps {
    fn default() -> Self {
        Self {
            cluster_name: "my-cache-cluster".to_string(),
            node_type: "cache.t2.micro".to_string(),
            engine: "redis".to_string(),
            port: 6379,
            node_count: 1,
        }
    }
}

/// Declare the cache stack
pub fn cache_stack(p: &CacheProps, config: &SynthesizerConfig) -> StackResult<Stack> {
    let env = config.environment.as_str();
    let project = config.project.as_str();
    let mut stack = Stack::new(format!("{}-{}-cache", env, project));

    let vpc = stack.declare(
        ResourceKind::Vpc,
        "CacheVpc",
        props([
            ("CidrBlock", "10.0.0.0/16".into()),
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
        ResourceKind::SecurityGroup,
        "AppSecurityGroup",
        props([
            ("GroupName", format!("{env}-{project}-app").into()),
            ("GroupDescription", "Workloads allowed to reach the cache".into()),
            ("VpcId", vpc.physical_id()),
        ]),
    )?;

    stack.connect("AppSecurityGroup", "CacheSecurityGroup", p.port)?;

    let subnet_group_name = format!("{env}-{project}-cache-subnets");
    let subnet_group = stack.declare(
        ResourceKind::CacheSubnetGroup,
        "CacheSubnetGroup",
        props([
            ("CacheSubnetGroupName", subnet_group_name.clone().into()),
            ("Description", "Subnet group for the cache cluster".into()),
            ("SubnetIds", vpc.output("PrivateSubnetIds")),
        ]),
    )?;

    let cluster = stack.declare(
        ResourceKind::CacheCluster,
        "CacheCluster",
        props([
            ("ClusterName", p.cluster_name.clone().into()),
            ("CacheNodeType", p.node_type.clone().into()),
            ("Engine", p.engine.clone().into()),
            ("NumCacheNodes", json!(p.node_count).into()),
            ("Port", json!(p.port).into()),
            (
                "VpcSecurityGroupIds",
                PropertyValue::List(vec![cache_group.output(attr::SECURITY_GROUP_ID)]),
            ),
            // subnet group is referenced by name, so the ordering is explicit
            ("CacheSubnetGroupName", subnet_group_name.into()),
        ]),
    )?;
    stack.depends_on(cluster.id().as_str(), subnet_group.id().as_str())?;

    stack.add_output("CacheEndpoint", "CacheCluster", attr::ENDPOINT)?;
    stack.add_output("AppSecurityGroupId", "AppSecurityGroup", attr::SECURITY_GROUP_ID)?;

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraph;

    #[test]
    fn test_cluster_orders_after_subnet_group_and_ingress_after_groups() {
        let stack = cache_stack(&CacheProps::default(), &SynthesizerConfig::default()).unwrap();
        let graph = DependencyGraph::build(stack.resources()).unwrap();
        let pos = |id: &str| graph.position(&id.try_into().unwrap()).unwrap();

        assert!(pos("CacheSubnetGroup") < pos("CacheCluster"));
        assert!(pos("CacheSecurityGroup") < pos("CacheSecurityGroupFromAppSecurityGroupIngress"));
        assert!(pos("AppSecurityGroup") < pos("CacheSecurityGroupFromAppSecurityGroupIngress"));
        assert_eq!(graph.len(), 6);
    }
}
