mod scheduler;
mod shutdown;
pub mod silence;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::arbiter::MessageArbiter;
use crate::cognition::character::Character;
use crate::identity::MoodEngine;

pub use scheduler::Runtime;
pub use shutdown::ShutdownGuard;
pub use silence::SilenceBreaker;

/// Handles shared between the consumer loop and the operator console.
#[derive(Clone)]
pub struct Session {
    pub arbiter: Arc<MessageArbiter>,
    pub character: Arc<Mutex<Character>>,
    pub mood: Arc<MoodEngine>,
    pub silence: Arc<SilenceBreaker>,
}

impl Session {
    pub fn new(
        arbiter: Arc<MessageArbiter>,
        character: Character,
        mood: MoodEngine,
        silence: SilenceBreaker,
    ) -> Self {
        Self {
            arbiter,
            character: Arc::new(Mutex::new(character)),
            mood: Arc::new(mood),
            silence: Arc::new(silence),
        }
    }
}
