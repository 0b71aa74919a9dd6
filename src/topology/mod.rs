/*!
Topology module

Collects neighbor and routing tables from the routing-capable devices of the mesh.

Structure:
- `source`: The async collaborator traits (`MeshTransport`, `DeviceRegistry`) and the
            table entry types they return.
- `collector`: `TopologyCollector`, which queries every eligible device with bounded
               concurrency and one retry per query.
- `replay`: A mesh replayed from a JSON snapshot, used by the CLI and the tests.

Re-exports:
- `MeshTransport`, `DeviceRegistry` and `TopologyCollector` for easy consumption by callers.
*/

pub mod collector;
pub mod replay;
pub mod source;

pub use collector::{TopologyCollector, TopologyScan};
pub use source::{DeviceRegistry, MeshTransport};
