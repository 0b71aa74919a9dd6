/*
 * This module defines the mesh data model and the directed graph built from a scan.
 * Links point from the reported neighbor to the device whose table listed it.
 */

pub mod device;
pub mod edge;
pub mod network_graph;
pub mod node;
