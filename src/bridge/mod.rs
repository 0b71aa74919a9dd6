/*!
Bridge request surface.

- `request`: request parsing and the response envelope.
- `bus`: the publish side of the message bus.
- `handler`: ties the registry, collector, graph builder and renderers together.
*/

pub mod bus;
pub mod handler;
pub mod request;

pub use handler::{NetworkMapHandler, Topics};
