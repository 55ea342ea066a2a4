// Copyright (c) 2025 - Cowboy AI, Inc.
//! REST API Template
//!
//! # Topology
//!
//! ```text
//! FunctionRole ──> SaveFunction <── DeadLetterTopic
//!                       │
//!                 Api ──┼── SaveMethod (POST /save, key required)
//!                  │    └── InvokePermission
//!                  ├── OptionsMethod (CORS mock)
//!                  ├── ApiKey ──> UsagePlan
//!                  └── ApiDomainName ──> BasePathMapping
//!                            └──> ApiAliasRecord
//! ```
//!
//! Production stacks additionally get a web ACL that blocks everything but
//! the allow-listed address ranges, associated with the API's stage.

use serde_json::json;

use super::{map, props};
use crate::config::{DeadLetterScope, SynthesizerConfig};
use crate::domain::{attr, Access, GrantScope, PropertyValue, ResourceKind};
use crate::errors::StackResult;
use crate::stack::Stack;

/// Deployment stage the API, usage plan and mappings point at
pub const STAGE: &str = "prod";

/// Inputs for [`rest_api_stack`]
#[derive(Debug, Clone)]
pub struct RestApiProps {
    /// Site domain, used for CORS origin and resource naming
    pub domain_name: String,
    /// Bucket holding the function's code archive
    pub code_bucket: String,
    /// Pre-issued certificate for the API domain
    pub certificate_arn: String,
    /// Hosted zone receiving the alias record
    pub hosted_zone_id: String,
    /// Custom domain of the API
    pub api_domain_name: String,
    /// Attach the web ACL
    pub is_production: bool,
    /// Address ranges allowed through the web ACL
    pub allowed_ip_ranges: Vec<String>,
}

impl RestApiProps {
    fn archive_bucket(&self) -> String {
        format!("{}-archive", self.domain_name)
    }
}

/// Declare the REST API stack
pub fn rest_api_stack(p: &RestApiProps, config: &SynthesizerConfig) -> StackResult<Stack> {
    let env = config.environment.as_str();
    let project = config.project.as_str();
    let mut stack = Stack::new(format!("{}-{}-api", env, project));

    let role = stack.declare(
        ResourceKind::Role,
        "FunctionRole",
        props([
            ("RoleName", format!("{env}{project}LambdaFunctionRole").into()),
            (
                "Description",
                format!("{env}{} Lambda Function Role", p.domain_name).into(),
            ),
            (
                "AssumeRolePolicyDocument",
                json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": {"Service": "lambda.amazonaws.com"},
                        "Action": "sts:AssumeRole"
                    }]
                })
                .into(),
            ),
        ]),
    )?;

    let topic = stack.declare(
        ResourceKind::Topic,
        "DeadLetterTopic",
        props([
            ("TopicName", format!("{env}-{project}-dead-letter-topic").into()),
            ("DisplayName", format!("{env}{project}DeadLetterTopic").into()),
        ]),
    )?;

    let function = stack.declare(
        ResourceKind::Function,
        "SaveFunction",
        props([
            ("FunctionName", format!("{env}-lambda-save-resources").into()),
            (
                "Description",
                format!("{env} Lambda Function to Save the Resources").into(),
            ),
            ("Runtime", "provided.al2".into()),
            ("Handler", "bootstrap".into()),
            (
                "Code",
                map([
                    ("S3Bucket", p.code_bucket.clone().into()),
                    ("S3Key", "sample-code/golang-sample.zip".into()),
                ]),
            ),
            ("MemorySize", json!(512).into()),
            ("Timeout", json!(10).into()),
            ("MaximumRetryAttempts", json!(0).into()),
            ("Role", role.arn()),
            (
                "Environment",
                map([(
                    "Variables",
                    map([("S3_BUCKET_NAME", p.archive_bucket().into())]),
                )]),
            ),
            ("DeadLetterConfig", map([("TargetArn", topic.arn())])),
        ]),
    )?;

    match config.dead_letter_scope {
        DeadLetterScope::PerTopic => {
            stack.grant(role.id().as_str(), topic.id().as_str(), Access::Publish)?
        }
        DeadLetterScope::AccountTopics => stack.grant_with(
            role.id().as_str(),
            topic.id().as_str(),
            ["sns:Publish"],
            GrantScope::Pattern("arn:aws:sns:{Region}:{AccountId}:*".into()),
        )?,
    }

    let log_actions = ResourceKind::LogGroup
        .grant_actions(Access::Write)
        .unwrap_or_default();
    stack.grant_with(
        role.id().as_str(),
        function.id().as_str(),
        log_actions.iter().copied(),
        GrantScope::Pattern(
            "arn:aws:logs:{Region}:{AccountId}:log-group:/aws/lambda/{Name}:*".into(),
        ),
    )?;

    let web_acl = if p.is_production {
        Some(declare_web_acl(&mut stack, p)?)
    } else {
        None
    };

    let api = stack.declare(
        ResourceKind::RestApi,
        "Api",
        props([
            ("Name", p.api_domain_name.clone().into()),
            (
                "Description",
                format!(
                    "{} API Gateway for the {env} environment",
                    p.api_domain_name
                )
                .into(),
            ),
        ]),
    )?;
    if let Some(acl) = &web_acl {
        stack.depends_on(api.id().as_str(), acl)?;
    }

    stack.declare(
        ResourceKind::ApiMethod,
        "SaveMethod",
        props([
            ("RestApiId", api.physical_id()),
            ("ParentId", api.output(attr::ROOT_RESOURCE_ID)),
            ("PathPart", "save".into()),
            ("HttpMethod", "POST".into()),
            ("ApiKeyRequired", true.into()),
            (
                "Integration",
                map([
                    ("Type", "AWS_PROXY".into()),
                    ("IntegrationHttpMethod", "POST".into()),
                    (
                        "Uri",
                        PropertyValue::concat(vec![
                            format!(
                                "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/",
                                config.region
                            )
                            .into(),
                            function.arn(),
                            "/invocations".into(),
                        ]),
                    ),
                ]),
            ),
        ]),
    )?;

    stack.declare(
        ResourceKind::ApiMethod,
        "OptionsMethod",
        props([
            ("RestApiId", api.physical_id()),
            ("ParentId", api.output(attr::ROOT_RESOURCE_ID)),
            ("PathPart", "save".into()),
            ("HttpMethod", "OPTIONS".into()),
            ("Integration", cors_mock_integration(&p.domain_name).into()),
        ]),
    )?;

    stack.declare(
        ResourceKind::Permission,
        "InvokePermission",
        props([
            ("Action", "lambda:InvokeFunction".into()),
            ("FunctionName", function.arn()),
            ("Principal", "apigateway.amazonaws.com".into()),
            ("SourceArn", api.output(attr::EXECUTE_API_ARN)),
        ]),
    )?;

    let api_key = stack.declare(
        ResourceKind::ApiKey,
        "ApiKey",
        props([
            ("Name", format!("{}ApiKey", p.domain_name).into()),
            (
                "Description",
                format!("{} API Key for My API", p.domain_name).into(),
            ),
            ("Enabled", true.into()),
        ]),
    )?;
    stack.depends_on(api_key.id().as_str(), api.id().as_str())?;

    stack.declare(
        ResourceKind::UsagePlan,
        "UsagePlan",
        props([
            ("UsagePlanName", format!("{}UsagePlan", p.domain_name).into()),
            (
                "Description",
                format!("{} Usage plan for My API", p.domain_name).into(),
            ),
            (
                "Throttle",
                json!({"RateLimit": 2000, "BurstLimit": 1000}).into(),
            ),
            ("Quota", json!({"Limit": 100000, "Period": "MONTH"}).into()),
            (
                "ApiStages",
                PropertyValue::List(vec![map([
                    ("ApiId", api.physical_id()),
                    ("Stage", STAGE.into()),
                ])]),
            ),
            ("ApiKeys", PropertyValue::List(vec![api_key.physical_id()])),
        ]),
    )?;

    let domain = stack.declare(
        ResourceKind::DomainName,
        "ApiDomainName",
        props([
            ("DomainName", p.api_domain_name.clone().into()),
            ("CertificateArn", p.certificate_arn.clone().into()),
            ("EndpointConfiguration", json!({"Types": ["EDGE"]}).into()),
        ]),
    )?;

    stack.declare(
        ResourceKind::BasePathMapping,
        "BasePathMapping",
        props([
            ("DomainName", domain.output(attr::NAME)),
            ("RestApiId", api.physical_id()),
            ("Stage", STAGE.into()),
        ]),
    )?;

    stack.declare(
        ResourceKind::RecordSet,
        "ApiAliasRecord",
        props([
            ("HostedZoneId", p.hosted_zone_id.clone().into()),
            ("Name", p.api_domain_name.clone().into()),
            ("Type", "A".into()),
            (
                "AliasTarget",
                map([
                    ("DNSName", domain.output(attr::DISTRIBUTION_DOMAIN_NAME)),
                    ("HostedZoneId", domain.output(attr::DISTRIBUTION_HOSTED_ZONE_ID)),
                ]),
            ),
            (
                "Comment",
                format!("API Gateway alias record for {}", p.domain_name).into(),
            ),
        ]),
    )?;

    if let Some(acl) = &web_acl {
        let acl = stack.handle(acl)?;
        stack.declare(
            ResourceKind::WebAclAssociation,
            "WebAclAssociation",
            props([
                ("WebAclArn", acl.arn()),
                (
                    "ResourceArn",
                    PropertyValue::concat(vec![
                        format!("arn:aws:apigateway:{}::/restapis/", config.region).into(),
                        api.physical_id(),
                        format!("/stages/{}", STAGE).into(),
                    ]),
                ),
            ]),
        )?;
    }

    for id in ["SaveFunction", "Api", "FunctionRole"] {
        stack.tag_resource(id, "site", p.api_domain_name.clone())?;
    }

    stack.add_output("ApiUrl", "Api", "Url")?;
    stack.add_output("FunctionArn", "SaveFunction", attr::ARN)?;
    stack.add_output("DeadLetterTopicArn", "DeadLetterTopic", attr::ARN)?;
    stack.add_output("ApiKeyId", "ApiKey", attr::ID)?;
    stack.add_output("AliasTarget", "ApiDomainName", attr::DISTRIBUTION_DOMAIN_NAME)?;

    Ok(stack)
}

/// Declare the production web ACL, returning its logical id
fn declare_web_acl(stack: &mut Stack, p: &RestApiProps) -> StackResult<&'static str> {
    let (v4, v6): (Vec<&String>, Vec<&String>) =
        p.allowed_ip_ranges.iter().partition(|r| !r.contains(':'));

    let rule = |name: &str, priority: u32, addresses: &[&String], version: &str| {
        json!({
            "Name": name,
            "Priority": priority,
            "Action": {"Allow": {}},
            "Statement": {"IPSet": {"Addresses": addresses, "IPAddressVersion": version}},
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": name
            }
        })
    };

    stack.declare(
        ResourceKind::WebAcl,
        "WebAcl",
        props([
            ("Name", format!("{}WebAcl", p.domain_name.replace('.', "-")).into()),
            (
                "Description",
                format!("API ACL for the {} API Gateway", p.domain_name).into(),
            ),
            ("DefaultAction", json!({"Block": {}}).into()),
            ("Scope", "REGIONAL".into()),
            (
                "VisibilityConfig",
                json!({
                    "CloudWatchMetricsEnabled": true,
                    "MetricName": "WebAclMetrics",
                    "SampledRequestsEnabled": true
                })
                .into(),
            ),
            (
                "Rules",
                json!([
                    rule("AllowFromIPv4", 1, &v4[..], "IPV4"),
                    rule("AllowFromIPv6", 2, &v6[..], "IPV6"),
                ])
                .into(),
            ),
        ]),
    )?;
    Ok("WebAcl")
}

fn cors_mock_integration(domain_name: &str) -> serde_json::Value {
    json!({
        "Type": "MOCK",
        "PassthroughBehavior": "WHEN_NO_MATCH",
        "RequestTemplates": {"application/json": "{\"statusCode\": 200}"},
        "IntegrationResponses": [{
            "StatusCode": "200",
            "ResponseParameters": {
                "method.response.header.Access-Control-Allow-Headers":
                    "'Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token'",
                "method.response.header.Access-Control-Allow-Methods": "'GET,POST,OPTIONS'",
                "method.response.header.Access-Control-Allow-Origin":
                    format!("'https://{}'", domain_name)
            }
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraph;

    fn sample_props(is_production: bool) -> RestApiProps {
        RestApiProps {
            domain_name: "example.com".into(),
            code_bucket: "example-code".into(),
            certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/abc".into(),
            hosted_zone_id: "Z123EXAMPLE".into(),
            api_domain_name: "api.example.com".into(),
            is_production,
            allowed_ip_ranges: vec!["192.0.2.0/24".into(), "2001:db8::/32".into()],
        }
    }

    #[test]
    fn test_declares_expected_resources() {
        let stack = rest_api_stack(&sample_props(false), &SynthesizerConfig::default()).unwrap();
        let ids: Vec<_> = stack.resources().map(|r| r.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "FunctionRole",
                "DeadLetterTopic",
                "SaveFunction",
                "Api",
                "SaveMethod",
                "OptionsMethod",
                "InvokePermission",
                "ApiKey",
                "UsagePlan",
                "ApiDomainName",
                "BasePathMapping",
                "ApiAliasRecord",
            ]
        );
        assert_eq!(stack.grants().len(), 2);
    }

    #[test]
    fn test_production_adds_web_acl_before_api() {
        let stack = rest_api_stack(&sample_props(true), &SynthesizerConfig::default()).unwrap();
        let graph = DependencyGraph::build(stack.resources()).unwrap();

        let acl = graph.position(&"WebAcl".try_into().unwrap()).unwrap();
        let api = graph.position(&"Api".try_into().unwrap()).unwrap();
        let assoc = graph.position(&"WebAclAssociation".try_into().unwrap()).unwrap();
        assert!(acl < api);
        assert!(api < assoc);
    }

    #[test]
    fn test_account_topics_scope_uses_pattern() {
        let config = SynthesizerConfig {
            dead_letter_scope: DeadLetterScope::AccountTopics,
            ..SynthesizerConfig::default()
        };
        let stack = rest_api_stack(&sample_props(false), &config).unwrap();
        let publish = stack
            .grants()
            .iter()
            .find(|g| g.actions.contains("sns:Publish"))
            .unwrap();
        assert_eq!(
            publish.scope,
            GrantScope::Pattern("arn:aws:sns:{Region}:{AccountId}:*".into())
        );
    }
}
