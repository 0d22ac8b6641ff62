pub mod docker;
pub mod fake;
pub mod types;

pub use docker::DockerRuntime;
pub use fake::FakeRuntime;
pub use types::{ContainerRuntime, RuntimeError, RuntimeHandle, RuntimeSpec};
