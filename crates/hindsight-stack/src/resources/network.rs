// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Isolated network with a public/private subnet split.

use serde::Serialize;

use super::ResourceId;

/// Subnet placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    /// Routable from the internet (load balancers, NAT gateway).
    Public,
    /// No inbound internet route; outbound through the shared NAT gateway.
    PrivateWithEgress,
}

/// A named group of subnets, one per availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetGroup {
    /// Group name.
    pub name: String,
    /// Placement of every subnet in the group.
    pub kind: SubnetKind,
}

/// The stack's network.
#[derive(Debug, Clone, Serialize)]
pub struct Network {
    /// Resource identifier.
    pub id: ResourceId,
    /// Availability zones spanned.
    pub max_availability_zones: u8,
    /// NAT gateways; one shared gateway keeps cost down.
    pub nat_gateways: u8,
    /// Subnet groups.
    pub subnets: Vec<SubnetGroup>,
}

impl Network {
    /// Two zones, one NAT gateway, a public and a private-with-egress group.
    pub fn standard(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            max_availability_zones: 2,
            nat_gateways: 1,
            subnets: vec![
                SubnetGroup {
                    name: "Public".to_string(),
                    kind: SubnetKind::Public,
                },
                SubnetGroup {
                    name: "Private".to_string(),
                    kind: SubnetKind::PrivateWithEgress,
                },
            ],
        }
    }

    /// Whether the network has a subnet group of the given kind.
    pub fn has_subnets(&self, kind: SubnetKind) -> bool {
        self.subnets.iter().any(|group| group.kind == kind)
    }
}
