// Copyright (c) 2025 - Cowboy AI, Inc.
//! VPC Endpoint Template
//!
//! A function in private subnets that reaches DynamoDB, Secrets Manager and
//! SNS through VPC endpoints instead of the internet, next to a database in
//! the isolated subnets whose credentials the function may read.
//!
//! # Topology
//!
//! ```text
//! EndpointVpc ──┬── DynamoDbEndpoint        (gateway)
//!               ├── EndpointSecurityGroup ──┬── SecretsManagerEndpoint
//!               │                           └── SnsEndpoint
//!               ├── Database <── DatabaseSecret
//!               └── FunctionSecurityGroup ──> Function <── FunctionRole
//!
//! Function ──443──> SecretsManagerEndpoint, SnsEndpoint
//! FunctionRole ──read──> DatabaseSecret
//! ```

use serde_json::json;

use super::{map, props};
use crate::config::SynthesizerConfig;
use crate::domain::{attr, Access, PropertyValue, ResourceHandle, ResourceKind};
use crate::errors::StackResult;
use crate::stack::Stack;

const HTTPS_PORT: u16 = 443;

/// Inputs for [`vpc_endpoint_stack`]
#[derive(Debug, Clone)]
pub struct VpcEndpointProps {
    pub vpc_cidr: String,
    pub code_bucket: String,
    pub code_key: String,
    pub runtime: String,
    pub handler: String,
}

impl Default for VpcEndpointProps {
    fn default() -> Self {
        Self {
            vpc_cidr: "10.1.0.0/16".to_string(),
            code_bucket: "example-code".to_string(),
            code_key: "lambda/handler.zip".to_string(),
            runtime: "nodejs20.x".to_string(),
            handler: "index.handler".to_string(),
        }
    }
}

/// Endpoint policy allowing `actions` for any principal inside the VPC
fn endpoint_policy(actions: &[&str]) -> PropertyValue {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": "*",
            "Action": actions,
            "Resource": "*"
        }]
    })
    .into()
}

fn interface_endpoint(
    stack: &mut Stack,
    id: &str,
    service: &str,
    vpc: &ResourceHandle,
    group: &ResourceHandle,
    config: &SynthesizerConfig,
) -> StackResult<ResourceHandle> {
    stack.declare(
        ResourceKind::VpcEndpoint,
        id,
        props([
            ("VpcEndpointType", "Interface".into()),
            (
                "ServiceName",
                format!("com.amazonaws.{}.{}", config.region, service).into(),
            ),
            ("VpcId", vpc.physical_id()),
            ("SubnetIds", vpc.output("PrivateSubnetIds")),
            (
                "SecurityGroupIds",
                PropertyValue::List(vec![group.output(attr::SECURITY_GROUP_ID)]),
            ),
            ("PrivateDnsEnabled", true.into()),
        ]),
    )
}

/// Declare the VPC endpoint stack
pub fn vpc_endpoint_stack(p: &VpcEndpointProps, config: &SynthesizerConfig) -> StackResult<Stack> {
    let env = config.environment.as_str();
    let project = config.project.as_str();
    let mut stack = Stack::new(format!("{}-{}-endpoints", env, project));

    let vpc = stack.declare(
        ResourceKind::Vpc,
        "EndpointVpc",
        props([
            ("CidrBlock", p.vpc_cidr.clone().into()),
            ("MaxAzs", json!(2).into()),
            (
                "SubnetConfiguration",
                json!([
                    {"CidrMask": 24, "Name": "Public", "SubnetType": "PUBLIC"},
                    {"CidrMask": 24, "Name": "Private", "SubnetType": "PRIVATE_WITH_EGRESS"},
                    {"CidrMask": 24, "Name": "Isolated", "SubnetType": "PRIVATE_ISOLATED"}
                ])
                .into(),
            ),
        ]),
    )?;

    stack.declare(
        ResourceKind::VpcEndpoint,
        "DynamoDbEndpoint",
        props([
            ("VpcEndpointType", "Gateway".into()),
            (
                "ServiceName",
                format!("com.amazonaws.{}.dynamodb", config.region).into(),
            ),
            ("VpcId", vpc.physical_id()),
            (
                "PolicyDocument",
                endpoint_policy(&["dynamodb:DescribeTable", "dynamodb:ListTables"]),
            ),
        ]),
    )?;

    let endpoint_group = stack.declare(
        ResourceKind::SecurityGroup,
        "EndpointSecurityGroup",
        props([
            ("GroupName", format!("{env}-{project}-endpoints").into()),
            ("GroupDescription", "Interface endpoints".into()),
            ("VpcId", vpc.physical_id()),
        ]),
    )?;

    let secrets_endpoint = interface_endpoint(
        &mut stack,
        "SecretsManagerEndpoint",
        "secretsmanager",
        &vpc,
        &endpoint_group,
        config,
    )?;
    stack.set_property(
        secrets_endpoint.id().as_str(),
        "PolicyDocument",
        endpoint_policy(&["secretsmanager:GetSecretValue"]),
    )?;
    let sns_endpoint =
        interface_endpoint(&mut stack, "SnsEndpoint", "sns", &vpc, &endpoint_group, config)?;

    let secret = stack.declare(
        ResourceKind::Secret,
        "DatabaseSecret",
        props([
            ("Name", format!("{env}/{project}/endpoint-database").into()),
            (
                "GenerateSecretString",
                json!({
                    "SecretStringTemplate": "{\"username\":\"postgres\"}",
                    "GenerateStringKey": "password",
                    "ExcludePunctuation": true
                })
                .into(),
            ),
        ]),
    )?;

    stack.declare(
        ResourceKind::DatabaseInstance,
        "Database",
        props([
            ("DBInstanceIdentifier", format!("{env}-{project}-endpoint-db").into()),
            ("Engine", "postgres".into()),
            ("DBInstanceClass", "db.t2.micro".into()),
            ("AllocatedStorage", json!(20).into()),
            ("SubnetIds", vpc.output("PrivateSubnetIds")),
            ("MasterUserSecret", secret.arn()),
            ("StorageEncrypted", true.into()),
            ("EnablePerformanceInsights", true.into()),
            ("PubliclyAccessible", false.into()),
            ("DeletionPolicy", "Delete".into()),
        ]),
    )?;

    let role = stack.declare(
        ResourceKind::Role,
        "FunctionRole",
        props([
            ("RoleName", format!("{env}{project}EndpointFunctionRole").into()),
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
            (
                "ManagedPolicyArns",
                json!([
                    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole",
                    "arn:aws:iam::aws:policy/service-role/AWSLambdaVPCAccessExecutionRole"
                ])
                .into(),
            ),
        ]),
    )?;

    let function_group = stack.declare(
        ResourceKind::SecurityGroup,
        "FunctionSecurityGroup",
        props([
            ("GroupName", format!("{env}-{project}-endpoint-function").into()),
            ("GroupDescription", "Endpoint function".into()),
            ("VpcId", vpc.physical_id()),
        ]),
    )?;

    let function = stack.declare(
        ResourceKind::Function,
        "Function",
        props([
            ("FunctionName", format!("{env}-{project}-endpoint-function").into()),
            ("Runtime", p.runtime.clone().into()),
            ("Handler", p.handler.clone().into()),
            (
                "Code",
                map([
                    ("S3Bucket", p.code_bucket.clone().into()),
                    ("S3Key", p.code_key.clone().into()),
                ]),
            ),
            ("Role", role.arn()),
            (
                "VpcConfig",
                map([
                    ("SubnetIds", vpc.output("PrivateSubnetIds")),
                    (
                        "SecurityGroupIds",
                        PropertyValue::List(vec![function_group.output(attr::SECURITY_GROUP_ID)]),
                    ),
                ]),
            ),
            (
                "Environment",
                map([("Variables", map([("DATABASE_SECRET_ARN", secret.arn())]))]),
            ),
        ]),
    )?;

    for endpoint in [&secrets_endpoint, &sns_endpoint] {
        stack.connect(function.id().as_str(), endpoint.id().as_str(), HTTPS_PORT)?;
    }
    stack.grant(role.id().as_str(), secret.id().as_str(), Access::Read)?;

    stack.add_output("FunctionArn", "Function", attr::ARN)?;
    stack.add_output("DatabaseEndpoint", "Database", attr::ENDPOINT)?;
    stack.add_output("SecretsManagerEndpointId", "SecretsManagerEndpoint", attr::ID)?;

    Ok(stack)
}
