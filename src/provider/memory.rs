// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Provider
//!
//! Deterministic provider that fabricates plausible outputs (ARNs, physical
//! ids, endpoints) without calling any cloud API. Creating a resource that
//! already exists returns the recorded outputs unchanged, so re-synthesis is
//! a no-op.
//!
//! Two logical ids never share a physical resource: a create that would
//! land on a name already owned by another logical id is rejected.
//!
//! Failures, throttling and latency can be injected per logical id, which
//! makes it the provider of choice for tests and dry runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CreateRequest, Outputs, Provider, ProviderError};
use crate::domain::{attr, Capability, LogicalId, ResourceKind};

/// Property names consulted, in order, for a resource's physical name
const NAME_PROPERTIES: &[&str] = &[
    "Name",
    "FunctionName",
    "TopicName",
    "RoleName",
    "PolicyName",
    "RestApiName",
    "DomainName",
    "ClusterName",
    "GroupName",
    "DBInstanceIdentifier",
    "CacheSubnetGroupName",
];

#[derive(Debug, Default)]
struct MemoryState {
    /// Live resources keyed by kind and physical id
    resources: BTreeMap<(ResourceKind, String), Outputs>,
    /// Kind and physical id per logical id
    physical_ids: HashMap<LogicalId, (ResourceKind, String)>,
    /// Remaining throttled responses per logical id
    throttles: HashMap<LogicalId, u32>,
    /// Logical ids in the order creation calls reached the provider
    create_calls: Vec<LogicalId>,
    /// Physical ids in the order they were deleted
    delete_calls: Vec<String>,
}

/// Deterministic in-memory provider
#[derive(Debug)]
pub struct InMemoryProvider {
    region: String,
    account_id: String,
    failures: HashMap<LogicalId, ProviderError>,
    delays: HashMap<LogicalId, Duration>,
    delete_failures: HashSet<String>,
    state: Mutex<MemoryState>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new("us-east-1", "123456789012")
    }
}

impl InMemoryProvider {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            delete_failures: HashSet::new(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Fail every creation attempt for `id` with `error`
    pub fn failing(mut self, id: &str, error: ProviderError) -> Self {
        if let Ok(id) = LogicalId::new(id) {
            self.failures.insert(id, error);
        }
        self
    }

    /// Answer the first `times` creation attempts for `id` with `Throttled`
    pub fn throttled(mut self, id: &str, times: u32) -> Self {
        if let Ok(id) = LogicalId::new(id) {
            self.state.get_mut().throttles.insert(id, times);
        }
        self
    }

    /// Delay every creation attempt for `id`
    pub fn delayed(mut self, id: &str, delay: Duration) -> Self {
        if let Ok(id) = LogicalId::new(id) {
            self.delays.insert(id, delay);
        }
        self
    }

    /// Reject deletion of a physical id
    pub fn failing_delete(mut self, physical_id: impl Into<String>) -> Self {
        self.delete_failures.insert(physical_id.into());
        self
    }

    /// Logical ids in the order creation calls were received
    pub async fn create_calls(&self) -> Vec<LogicalId> {
        self.state.lock().await.create_calls.clone()
    }

    /// Physical ids in the order they were deleted
    pub async fn delete_calls(&self) -> Vec<String> {
        self.state.lock().await.delete_calls.clone()
    }

    /// Number of live resources
    pub async fn live_count(&self) -> usize {
        self.state.lock().await.resources.len()
    }

    fn physical_name(request: &CreateRequest<'_>) -> String {
        NAME_PROPERTIES
            .iter()
            .find_map(|key| request.properties.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| request.id.as_str().to_lowercase())
    }

    fn outputs_for(&self, kind: ResourceKind, name: &str) -> (String, Outputs) {
        let region = &self.region;
        let account = &self.account_id;
        let hash = short_hash(&format!("{}/{}", kind, name));

        let mut outputs = Outputs::new();
        let physical_id = match kind {
            ResourceKind::Function => {
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:lambda:{region}:{account}:function:{name}"),
                );
                name.to_string()
            }
            ResourceKind::Topic => {
                outputs.insert(attr::ARN.into(), format!("arn:aws:sns:{region}:{account}:{name}"));
                format!("arn:aws:sns:{region}:{account}:{name}")
            }
            ResourceKind::Role => {
                outputs.insert(attr::ARN.into(), format!("arn:aws:iam::{account}:role/{name}"));
                name.to_string()
            }
            ResourceKind::Policy => {
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:iam::{account}:policy/{name}"),
                );
                name.to_string()
            }
            ResourceKind::RestApi => {
                let api_id = format!("api{}", hash);
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:apigateway:{region}::/restapis/{api_id}"),
                );
                outputs.insert(
                    attr::EXECUTE_API_ARN.into(),
                    format!("arn:aws:execute-api:{region}:{account}:{api_id}/*/*/*"),
                );
                outputs.insert(attr::ROOT_RESOURCE_ID.into(), format!("root{}", hash));
                outputs.insert(
                    "Url".into(),
                    format!("https://{api_id}.execute-api.{region}.amazonaws.com/prod/"),
                );
                api_id
            }
            ResourceKind::DomainName => {
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:apigateway:{region}::/domainnames/{name}"),
                );
                outputs.insert(
                    attr::DISTRIBUTION_DOMAIN_NAME.into(),
                    format!("d-{}.cloudfront.net", hash),
                );
                outputs.insert(
                    attr::DISTRIBUTION_HOSTED_ZONE_ID.into(),
                    "Z2FDTNDATAQYW2".into(),
                );
                name.to_string()
            }
            ResourceKind::ApiKey => {
                outputs.insert(attr::VALUE.into(), format!("key{}{}", hash, hash));
                format!("key{}", hash)
            }
            ResourceKind::SecurityGroup => {
                let group_id = format!("sg-{}", hash);
                outputs.insert(attr::SECURITY_GROUP_ID.into(), group_id.clone());
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:ec2:{region}:{account}:security-group/{group_id}"),
                );
                group_id
            }
            ResourceKind::Vpc => {
                let vpc_id = format!("vpc-{}", hash);
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:ec2:{region}:{account}:vpc/{vpc_id}"),
                );
                outputs.insert("PrivateSubnetIds".into(), format!("subnet-{}a,subnet-{}b", hash, hash));
                vpc_id
            }
            ResourceKind::CacheCluster => {
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:elasticache:{region}:{account}:cluster:{name}"),
                );
                outputs.insert(
                    attr::ENDPOINT.into(),
                    format!("{name}.{hash}.cache.amazonaws.com"),
                );
                name.to_string()
            }
            ResourceKind::DatabaseInstance => {
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:rds:{region}:{account}:db:{name}"),
                );
                outputs.insert(
                    attr::ENDPOINT.into(),
                    format!("{name}.{hash}.{region}.rds.amazonaws.com"),
                );
                name.to_string()
            }
            ResourceKind::Secret => {
                let arn = format!(
                    "arn:aws:secretsmanager:{region}:{account}:secret:{name}-{}",
                    &hash[..6]
                );
                outputs.insert(attr::ARN.into(), arn.clone());
                arn
            }
            ResourceKind::HostedZone => {
                outputs.insert(
                    "NameServers".into(),
                    format!("ns-{h}-1.awsdns.com,ns-{h}-2.awsdns.net", h = &hash[..4]),
                );
                format!("Z{}", hash.to_uppercase())
            }
            ResourceKind::VpcEndpoint => {
                let endpoint_id = format!("vpce-{}", hash);
                outputs.insert(
                    attr::ARN.into(),
                    format!("arn:aws:ec2:{region}:{account}:vpc-endpoint/{endpoint_id}"),
                );
                outputs.insert(
                    "DnsEntries".into(),
                    format!("{endpoint_id}.{region}.vpce.amazonaws.com"),
                );
                endpoint_id
            }
            ResourceKind::RecordSet => name.to_string(),
            other => {
                outputs.insert(
                    attr::ARN.into(),
                    format!(
                        "arn:aws:{}:{region}:{account}:{}/{name}",
                        other.service(),
                        other.as_str()
                    ),
                );
                format!("{}-{}", other.as_str(), hash)
            }
        };

        if kind.supports(Capability::Connectable) {
            outputs
                .entry(attr::SECURITY_GROUP_ID.into())
                .or_insert_with(|| format!("sg-{}", hash));
        }
        outputs.insert(attr::ID.into(), physical_id.clone());
        outputs.insert(attr::NAME.into(), name.to_string());
        (physical_id, outputs)
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn create(&self, request: &CreateRequest<'_>) -> Result<Outputs, ProviderError> {
        if let Some(delay) = self.delays.get(request.id) {
            tokio::time::sleep(*delay).await;
        }

        let mut state = self.state.lock().await;
        state.create_calls.push(request.id.clone());

        if let Some(error) = self.failures.get(request.id) {
            return Err(error.clone());
        }

        if let Some(remaining) = state.throttles.get_mut(request.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ProviderError::Throttled(format!(
                    "rate exceeded creating {}",
                    request.id
                )));
            }
        }

        if let Some(existing) = state
            .physical_ids
            .get(request.id)
            .and_then(|key| state.resources.get(key))
        {
            debug!(resource = %request.id, "Resource exists, create is a no-op");
            return Ok(existing.clone());
        }

        let name = Self::physical_name(request);
        let (mut physical_id, mut outputs) = self.outputs_for(request.kind, &name);
        if let Some(set) = request.properties.get("SetIdentifier").and_then(Value::as_str) {
            physical_id = format!("{physical_id}#{set}");
            outputs.insert(attr::ID.into(), physical_id.clone());
        }

        let key = (request.kind, physical_id);
        if state.resources.contains_key(&key) {
            let owner = state
                .physical_ids
                .iter()
                .find(|(_, live)| **live == key)
                .map(|(owner, _)| owner.to_string())
                .unwrap_or_default();
            return Err(ProviderError::Rejected(format!(
                "{} {} already exists and belongs to {}",
                request.kind, key.1, owner
            )));
        }
        state.resources.insert(key.clone(), outputs.clone());
        state.physical_ids.insert(request.id.clone(), key);

        Ok(outputs)
    }

    async fn delete(&self, kind: ResourceKind, physical_id: &str) -> Result<(), ProviderError> {
        if self.delete_failures.contains(physical_id) {
            return Err(ProviderError::Rejected(format!(
                "{} {} is still in use",
                kind, physical_id
            )));
        }

        let mut state = self.state.lock().await;
        let key = (kind, physical_id.to_string());
        if state.resources.remove(&key).is_none() {
            return Err(ProviderError::NotFound(physical_id.to_string()));
        }
        state.physical_ids.retain(|_, live| *live != key);
        state.delete_calls.push(physical_id.to_string());
        Ok(())
    }
}

/// FNV-1a, truncated to 8 hex digits
fn short_hash(input: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{:08x}", hash)
}
