// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Synthesis Demo
//!
//! Declares a template (the REST API by default), synthesizes it against the
//! in-memory provider and prints the resulting artifact as JSON on stdout.
//!
//! Run with: cargo run --bin stack-synth
//!
//! Environment:
//! 1. STACK_CONFIG - path to a JSON synthesizer configuration (optional)
//! 2. STACK_TEMPLATE - api, cache, data, routing or endpoints (default: api)
//! 3. API_DOMAIN - custom API domain (default: api.example.com)
//! 4. STACK_PRODUCTION - set to attach the web ACL
//! 5. STACK_TEARDOWN - set to delete everything after printing

use anyhow::{Context, Result};
use cim_stack::{
    provider::{InMemoryProvider, ProviderRegistry},
    templates::{
        cache_stack, database_stack, rest_api_stack, routing_stack, vpc_endpoint_stack,
        CacheProps, DatabaseProps, GeoLocation, GeoRecord, RestApiProps, RoutingProps,
        VpcEndpointProps, WeightedRecord,
    },
    Stack, StackError, StackResult, Synthesizer, SynthesizerConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

fn load_config() -> Result<SynthesizerConfig> {
    match std::env::var("STACK_CONFIG") {
        Ok(path) => SynthesizerConfig::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        Err(_) => Ok(SynthesizerConfig::default()),
    }
}

fn api_props() -> RestApiProps {
    let api_domain_name =
        std::env::var("API_DOMAIN").unwrap_or_else(|_| "api.example.com".to_string());
    let domain_name = api_domain_name
        .split_once('.')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_else(|| api_domain_name.clone());

    RestApiProps {
        code_bucket: format!("{}-code", domain_name.replace('.', "-")),
        certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/example".to_string(),
        hosted_zone_id: "Z0000000EXAMPLE".to_string(),
        is_production: std::env::var("STACK_PRODUCTION").is_ok(),
        allowed_ip_ranges: vec!["192.0.2.0/24".to_string(), "198.51.100.0/24".to_string()],
        domain_name,
        api_domain_name,
    }
}

fn routing_props() -> RoutingProps {
    let weighted = |set: &str| WeightedRecord {
        set_identifier: set.to_string(),
        weight: 50,
        target: "example.com".to_string(),
    };
    let geo = |set: &str, location: GeoLocation, address: &str| GeoRecord {
        set_identifier: set.to_string(),
        location,
        addresses: vec![address.to_string()],
    };

    RoutingProps {
        zone_name: "example.com".to_string(),
        record_name: "sub.example.com".to_string(),
        ttl: 300,
        weighted: vec![weighted("blue"), weighted("green")],
        geolocation: vec![
            geo("europe", GeoLocation::Continent("EU".into()), "1.2.3.0"),
            geo("germany", GeoLocation::Country("DE".into()), "1.2.3.1"),
            geo("fallback", GeoLocation::Default, "1.2.3.3"),
        ],
        issue_certificate: true,
    }
}

fn declare_stack(template: &str, config: &SynthesizerConfig) -> Result<Stack> {
    let stack: StackResult<Stack> = match template {
        "api" => rest_api_stack(&api_props(), config),
        "cache" => cache_stack(&CacheProps::default(), config),
        "data" => database_stack(&DatabaseProps::default(), config),
        "routing" => routing_stack(&routing_props(), config),
        "endpoints" => vpc_endpoint_stack(&VpcEndpointProps::default(), config),
        other => anyhow::bail!("Unknown template '{}'", other),
    };
    stack.with_context(|| format!("Failed to declare the {} stack", template))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    info!(
        project = %config.project,
        environment = %config.environment,
        region = %config.region,
        "Configuration loaded"
    );

    let template = std::env::var("STACK_TEMPLATE").unwrap_or_else(|_| "api".to_string());
    let mut stack = declare_stack(&template, &config)?;

    let provider = Arc::new(InMemoryProvider::new(
        config.region.clone(),
        config.account_id.clone(),
    ));
    let synthesizer = Synthesizer::new(config, ProviderRegistry::single(provider))
        .context("Invalid synthesizer configuration")?;

    let cancel = synthesizer.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling synthesis");
            cancel.cancel();
        }
    });

    let artifact = match synthesizer.synthesize(&mut stack).await {
        Ok(artifact) => artifact,
        Err(StackError::Synthesis(incomplete)) => {
            for (id, error) in &incomplete.failed {
                warn!(resource = %id, error = %error, "Resource failed");
            }
            println!("{}", incomplete.report.to_json()?);
            anyhow::bail!("{}", incomplete);
        }
        Err(err) => return Err(err).context("Synthesis failed"),
    };

    println!("{}", artifact.to_json()?);

    if std::env::var("STACK_TEARDOWN").is_ok() {
        let report = synthesizer.teardown(&artifact).await?;
        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Teardown complete"
        );
    }

    Ok(())
}
