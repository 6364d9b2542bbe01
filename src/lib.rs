pub mod cli;
pub mod ctx;
pub mod dvh;
pub mod error;
pub mod io;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod stencil;
pub mod transform;
