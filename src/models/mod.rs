pub mod alert;
pub mod observation;

pub use alert::*;
pub use observation::*;
