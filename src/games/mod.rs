pub mod randomness;
pub mod round_engine;
pub mod session;
pub mod types;
pub mod vrf_engine;

pub use randomness::{OsEntropySource, RandomSource, ScriptedSource, SeededSource};
pub use round_engine::{crash_point_from_draw, verify_round, HouseEdge, RoundEngine};
pub use session::{GameSession, SessionSnapshot, SessionStats};
pub use types::*;
pub use vrf_engine::VrfRandomSource;
