// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secret storage.
//!
//! The bootstrap functions read and write secrets through the
//! [`SecretStore`] trait. [`AwsSecretStore`] talks to Secrets Manager;
//! [`InMemorySecretStore`] is used in tests.

#[cfg(feature = "aws")]
mod aws;
mod memory;
mod traits;

#[cfg(feature = "aws")]
pub use aws::AwsSecretStore;
pub use memory::InMemorySecretStore;
pub use traits::*;
