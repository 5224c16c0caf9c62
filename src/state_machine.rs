//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, Timer};
pub use state::{
    ChatContext, ChatFeatures, ConversationState, InteractionMode, JulieStyle, Message, Pacing,
    RequestKind, Speaker,
};
pub use transition::{transition, TransitionError, TransitionResult};
