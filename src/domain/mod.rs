// Domain layer: core models and ports (interfaces).

pub mod figure;
pub mod model;
pub mod ports;
