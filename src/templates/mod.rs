// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Templates
//!
//! Ready-made declarations for common topologies. Templates only declare;
//! nothing is created until the returned [`Stack`](crate::stack::Stack) is
//! synthesized.
//!
//! - [`rest_api`] - function behind a REST API with key, usage plan, custom
//!   domain and DNS alias
//! - [`cache`] - cache cluster in its own VPC reachable from an app security group
//! - [`database`] - database with generated credentials next to a cache cluster
//! - [`routing`] - hosted zone with weighted and geolocation record sets
//! - [`vpc_endpoint`] - private function reaching AWS services through endpoints

pub mod cache;
pub mod database;
pub mod rest_api;
pub mod routing;
pub mod vpc_endpoint;

pub use cache::{cache_stack, CacheProps};
pub use database::{database_stack, DatabaseProps};
pub use rest_api::{rest_api_stack, RestApiProps};
pub use routing::{routing_stack, GeoLocation, GeoRecord, RoutingProps, WeightedRecord};
pub use vpc_endpoint::{vpc_endpoint_stack, VpcEndpointProps};

use indexmap::IndexMap;

use crate::domain::{Properties, PropertyValue};

/// Build a property map from `(name, value)` pairs
pub(crate) fn props<const N: usize>(pairs: [(&str, PropertyValue); N]) -> Properties {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Build a nested map value from `(key, value)` pairs
pub(crate) fn map<const N: usize>(pairs: [(&str, PropertyValue); N]) -> PropertyValue {
    PropertyValue::Map(
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect::<IndexMap<_, _>>(),
    )
}
