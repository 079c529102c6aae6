mod walk;

pub use walk::{WalkIter, Walker};
