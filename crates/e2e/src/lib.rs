pub mod stub;

pub use stub::{StubBackend, spawn};
