// Platform API — the collaborator trait, its HTTP implementation, and the
// wire types both share.

pub mod client;
pub mod traits;
pub mod wire;
