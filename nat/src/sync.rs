// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Locks used by the shared stores. Shuttle's versions replace the standard ones when the
//! `shuttle` feature is enabled, so that tests can explore thread interleavings.

#[cfg(not(feature = "shuttle"))]
pub(crate) use std::sync::{Mutex, RwLock};

#[cfg(feature = "shuttle")]
pub(crate) use shuttle::sync::{Mutex, RwLock};
