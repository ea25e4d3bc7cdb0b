//! Rigid-body world seam
//!
//! The demolition core never talks to a physics engine directly; it goes
//! through the [`PhysicsWorld`] trait, which exposes exactly the collaborator
//! surface the gameplay needs: body creation, transform/velocity reads,
//! impulse application, dynamic-body iteration, and collision-enter events.
//! [`BallisticWorld`] is the built-in implementation used by tests and the
//! headless demo; a full engine slots in behind the same trait.

pub mod body;
pub mod world;

pub use body::{BodyDesc, BodyHandle, BodyKind};
pub use world::{BallisticWorld, ContactEvent, PhysicsWorld};
