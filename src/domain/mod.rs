// Domain layer: entities, wire payloads and the ports the core talks through.

pub mod model;
pub mod ports;
