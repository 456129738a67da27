mod session;

pub use session::{QueryOutput, Session};
