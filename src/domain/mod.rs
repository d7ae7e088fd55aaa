// Domain layer: value types and ports (interfaces) shared by the batch runner,
// the survey adapters and the GalfitM invoker.

pub mod model;
pub mod ports;
