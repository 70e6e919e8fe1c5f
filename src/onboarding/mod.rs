//! Onboarding system — the per-user conversational registration flow.
//!
//! A new member walks a fixed sequence of prompts: share contact, enter
//! email, enter full name, pick an intent. The collected record is written
//! to the contact store on the terminal transition and the session is
//! discarded.

pub mod flow;
pub mod prompts;
pub mod session;
pub mod state;

pub use flow::OnboardingFlow;
pub use session::{Collected, Session, SessionStore, spawn_idle_sweep};
pub use state::{Intent, OnboardingStep};
