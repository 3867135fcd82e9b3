//! Hardware views: chassis inventory, virtual-chassis membership and storage.

use super::Decode;
use crate::xml::{find, list, number, text};
use roxmltree::Node;
use serde::Serialize;

/// Nesting levels of inventory modules, outermost first
const MODULE_LEVELS: [&str; 4] = [
    "chassis-module",
    "chassis-sub-module",
    "chassis-sub-sub-module",
    "chassis-sub-sub-sub-module",
];

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardwareInventory {
    pub chassis: Vec<Chassis>,
}

/// One chassis, e.g. one member of a virtual chassis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Chassis {
    pub name: String,
    pub serial_number: String,
    pub description: String,
    pub modules: Vec<Module>,
}

/// A module at any depth (FPC, PIC, MIC, transceiver, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub version: String,
    pub part_number: String,
    pub serial_number: String,
    pub description: String,
    pub clei_code: String,
    pub model_number: String,
    pub sub_modules: Vec<Module>,
}

impl Module {
    fn decode(node: Node<'_, '_>, depth: usize) -> Self {
        let sub_modules = match MODULE_LEVELS.get(depth + 1) {
            Some(level) => list(node, level, |n| Module::decode(n, depth + 1)),
            None => Vec::new(),
        };
        Self {
            name: text(node, "name"),
            version: text(node, "version"),
            part_number: text(node, "part-number"),
            serial_number: text(node, "serial-number"),
            description: text(node, "description"),
            clei_code: text(node, "clei-code"),
            model_number: text(node, "model-number"),
            sub_modules,
        }
    }

    /// This module and everything below it, depth first.
    pub fn walk(&self) -> Vec<&Module> {
        let mut out = vec![self];
        for sub in &self.sub_modules {
            out.extend(sub.walk());
        }
        out
    }
}

impl Decode for HardwareInventory {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(inventory) = find(scope, "chassis-inventory") else {
            return Self::default();
        };
        Self {
            chassis: list(inventory, "chassis", |c| Chassis {
                name: text(c, "name"),
                serial_number: text(c, "serial-number"),
                description: text(c, "description"),
                modules: list(c, MODULE_LEVELS[0], |m| Module::decode(m, 0)),
            }),
        }
    }
}

// ============================================================================
// Virtual Chassis
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VirtualChassis {
    pub preprovisioned_id: String,
    pub preprovisioned_mode: String,
    pub members: Vec<VcMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VcMember {
    pub status: String,
    pub id: u32,
    pub fpc_slot: String,
    pub serial_number: String,
    pub model: String,
    pub priority: u32,
    pub mixed_mode: String,
    pub route_mode: String,
    pub role: String,
    pub neighbors: Vec<VcNeighbor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VcNeighbor {
    pub id: u32,
    pub interface: String,
}

impl Decode for VirtualChassis {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "virtual-chassis-information") else {
            return Self::default();
        };
        Self {
            preprovisioned_id: text(
                info,
                "preprovisioned-virtual-chassis-information>virtual-chassis-id",
            ),
            preprovisioned_mode: text(
                info,
                "preprovisioned-virtual-chassis-information>virtual-chassis-mode",
            ),
            members: list(info, "member-list>member", |m| VcMember {
                status: text(m, "member-status"),
                id: number(m, "member-id"),
                fpc_slot: text(m, "fpc-slot"),
                serial_number: text(m, "member-serial-number"),
                model: text(m, "member-model"),
                priority: number(m, "member-priority"),
                mixed_mode: text(m, "member-mixed-mode"),
                route_mode: text(m, "member-route-mode"),
                role: text(m, "member-role"),
                neighbors: list(m, "neighbor-list>neighbor", |n| VcNeighbor {
                    id: number(n, "neighbor-id"),
                    interface: text(n, "neighbor-interface"),
                }),
            }),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// File systems of one node or routing engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemStorage {
    pub file_systems: Vec<FileSystem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSystem {
    pub name: String,
    pub total_blocks: u64,
    pub used_blocks: u64,
    pub available_blocks: u64,
    pub used_percent: String,
    pub mounted_on: String,
}

impl Decode for SystemStorage {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "system-storage-information") else {
            return Self::default();
        };
        Self {
            file_systems: list(info, "filesystem", |f| FileSystem {
                name: text(f, "filesystem-name"),
                total_blocks: number(f, "total-blocks"),
                used_blocks: number(f, "used-blocks"),
                available_blocks: number(f, "available-blocks"),
                used_percent: text(f, "used-percent"),
                mounted_on: text(f, "mounted-on"),
            }),
        }
    }
}
