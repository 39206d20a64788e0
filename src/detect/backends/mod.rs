#[cfg(feature = "backend-opencv")]
pub mod opencv;
pub mod scripted;

#[cfg(feature = "backend-opencv")]
pub use self::opencv::{OpencvDetector, OpencvFactory};
pub use scripted::{ScriptedDetector, ScriptedFactory};
