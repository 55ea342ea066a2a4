// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of graph construction and the materialization lifecycle.

mod graph_ordering;
mod lifecycle;
