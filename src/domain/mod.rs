// Domain layer: table and pricing models plus the ports the pipelines depend on.

pub mod model;
pub mod ports;
